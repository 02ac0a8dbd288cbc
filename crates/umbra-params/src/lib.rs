//! Shared parameter types for the Umbra renderers
//!
//! This crate contains every configuration section used by both the headless runner and
//! the interactive viewer, plus the uniform blocks the compute kernels read, so the two
//! front ends cannot drift apart.

use bytemuck::{Pod, Zeroable};

/// Which simulation the frame compositor drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RenderMode {
    /// Ray-marched CSG scene
    #[default]
    Scene,
    /// Ray-marched Mandelbulb, no scene graph
    Fractal,
    /// Agent simulation with a persistent trail field
    Slime,
}

/// Output surface configuration
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SurfaceConfig {
    pub size: [u32; 2],
    pub tile: u32,     // Dispatch tile edge, must match the kernels' workgroup size
}

/// Fixed look-at camera
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
}

/// Lighting shared by the scene and fractal kernels
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LightConfig {
    pub colour: [f32; 4],
    pub position: [f32; 3],
    pub ambient_strength: f32,
    pub specular_strength: f32,
    pub shadow_attenuation: f32, // Soft shadow hardness (k)
}

/// Sphere tracing parameters
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MarchConfig {
    pub render_distance: f32,
    pub minimum_threshold: f32,
    pub blend_strength: f32, // Default k for smooth unions without their own strength
    pub max_steps: u32,
}

/// Mandelbulb parameters for the fractal-only variant
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FractalConfig {
    pub power: f32,
    pub bailout: f32,
    pub iterations: u32,
    pub near_colour: [f32; 4],
    pub far_colour: [f32; 4],
    pub border_strength: f32,
    pub border_colour: [f32; 4],
    pub border_steps: u32,
}

/// Agent initialization policy
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum SpawnPolicy {
    /// Evenly spaced by angle on a ring around the field centre, facing outward
    Ring { radius: f32 },
    /// Uniform in a disc around the field centre, facing the centre
    Scattered { radius: f32 },
}

impl Default for SpawnPolicy {
    fn default() -> Self {
        SpawnPolicy::Ring { radius: 0.3 }
    }
}

impl SpawnPolicy {
    /// Largest radius that keeps every spawned agent inside the unit field
    pub const MAX_RADIUS: f32 = 0.5;

    pub fn radius(&self) -> f32 {
        match *self {
            SpawnPolicy::Ring { radius } | SpawnPolicy::Scattered { radius } => radius,
        }
    }

    /// Whether the policy places every agent inside the field
    pub fn fits_field(&self) -> bool {
        let radius = self.radius();
        radius.is_finite() && radius > 0.0 && radius <= Self::MAX_RADIUS
    }
}

/// Slime agent parameters
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SlimeConfig {
    pub agent_count: u32,
    pub spawn: SpawnPolicy,
    pub seed: u64,
    pub colour: [f32; 4],   // Deposited per tick at the agent's cell
    pub agent_speed: f32,   // Field widths per second
    pub turn_strength: f32, // Radians per second
    pub view_angle_deg: f32,
    pub view_distance: f32, // Normalized field units
}

/// Trail field evolution parameters
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrailConfig {
    pub blend_strength: f32,    // Rate of blending toward the 3x3 neighbourhood mean
    pub clean_up_strength: f32, // Linear decay per second
}

/// Capacity limits checked at construction time
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Limits {
    pub max_agents: u32,
    pub max_shapes: u32,
    pub max_objects: u32,
}

/// Complete render configuration
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderConfig {
    pub mode: RenderMode,
    pub surface: SurfaceConfig,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub march: MarchConfig,
    pub fractal: FractalConfig,
    pub slime: SlimeConfig,
    pub trail: TrailConfig,
    pub limits: Limits,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            size: [800, 600],
            tile: bindings::IMAGE_TILE,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 2.0, -6.0],
            target: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov_y_deg: 60.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            colour: [1.0, 1.0, 1.0, 1.0],
            position: [4.0, 8.0, -6.0],
            ambient_strength: 0.15,
            specular_strength: 0.5,
            shadow_attenuation: 16.0,
        }
    }
}

impl Default for MarchConfig {
    fn default() -> Self {
        Self {
            render_distance: 100.0,
            minimum_threshold: 0.001,
            blend_strength: 0.5,
            max_steps: 256,
        }
    }
}

impl Default for FractalConfig {
    fn default() -> Self {
        Self {
            power: 8.0,
            bailout: 2.0,
            iterations: 32,
            near_colour: [0.9, 0.6, 0.2, 1.0],
            far_colour: [0.2, 0.3, 0.8, 1.0],
            border_strength: 1.0,
            border_colour: [0.8, 0.9, 1.0, 1.0],
            border_steps: 40,
        }
    }
}

impl Default for SlimeConfig {
    fn default() -> Self {
        Self {
            agent_count: 20_000,
            spawn: SpawnPolicy::default(),
            seed: 1337,
            colour: [0.3, 0.9, 0.5, 1.0],
            agent_speed: 0.15,
            turn_strength: 12.0,
            view_angle_deg: 30.0,
            view_distance: 0.015,
        }
    }
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            blend_strength: 5.0,
            clean_up_strength: 0.3,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_agents: 1 << 20,
            max_shapes: 256,
            max_objects: 256,
        }
    }
}

impl RenderConfig {
    /// Check the value ranges the kernels rely on
    pub fn validate(&self) -> Result<(), String> {
        let [w, h] = self.surface.size;
        if w == 0 || h == 0 {
            return Err(format!("Surface size must be non-zero, got {}x{}", w, h));
        }
        if self.surface.tile != bindings::IMAGE_TILE {
            return Err(format!(
                "Tile size {} does not match the kernel workgroup edge {}",
                self.surface.tile,
                bindings::IMAGE_TILE
            ));
        }
        if self.march.minimum_threshold <= 0.0 {
            return Err("Minimum surface threshold must be positive".to_string());
        }
        if self.march.render_distance <= self.march.minimum_threshold {
            return Err("Render distance must exceed the minimum threshold".to_string());
        }
        if self.camera.near <= 0.0 || self.camera.far <= self.camera.near {
            return Err(format!(
                "Camera clip range is invalid: near={}, far={}",
                self.camera.near, self.camera.far
            ));
        }
        if self.trail.clean_up_strength < 0.0 || self.trail.blend_strength < 0.0 {
            return Err("Trail strengths must be non-negative".to_string());
        }
        if !self.slime.spawn.fits_field() {
            return Err(format!(
                "Spawn radius {} must lie in (0, {}]",
                self.slime.spawn.radius(),
                SpawnPolicy::MAX_RADIUS
            ));
        }
        Ok(())
    }
}

const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Uniform block for the scene ray-marching kernel
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SceneUniforms {
    pub camera_to_world: [[f32; 4]; 4],
    pub projection_inverse: [[f32; 4]; 4],
    pub light_colour: [f32; 4],
    pub light_position: [f32; 4], // w unused
    pub ambient_strength: f32,
    pub specular_strength: f32,
    pub shadow_attenuation: f32,
    pub render_distance: f32,
    pub minimum_threshold: f32,
    pub blend_strength: f32,
    pub object_count: u32,
    pub shape_count: u32,
    pub size: [u32; 2],
    pub max_steps: u32,
    pub _pad: u32,
}

/// Uniform block for the Mandelbulb kernel
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FractalUniforms {
    pub camera_to_world: [[f32; 4]; 4],
    pub projection_inverse: [[f32; 4]; 4],
    pub light_colour: [f32; 4],
    pub light_position: [f32; 4],
    pub near_colour: [f32; 4],
    pub far_colour: [f32; 4],
    pub border_colour: [f32; 4],
    pub ambient_strength: f32,
    pub specular_strength: f32,
    pub shadow_attenuation: f32,
    pub render_distance: f32,
    pub minimum_threshold: f32,
    pub power: f32,
    pub bailout: f32,
    pub border_strength: f32,
    pub iterations: u32,
    pub border_steps: u32,
    pub size: [u32; 2],
    pub max_steps: u32,
    pub _pad: [u32; 3],
}

/// Uniform block for the agent update kernel
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct AgentUniforms {
    pub colour: [f32; 4],
    pub agent_speed: f32,
    pub turn_strength: f32,
    pub view_angle: f32, // Radians
    pub view_distance: f32,
    pub delta_time: f32,
    pub agent_count: u32,
    pub size: [u32; 2],
    pub frame: u32,
    pub _pad: [u32; 3],
}

/// Uniform block for the trail evolution kernel
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TrailUniforms {
    pub blend_strength: f32,
    pub clean_up_strength: f32,
    pub delta_time: f32,
    pub _pad0: f32,
    pub size: [u32; 2],
    pub _pad1: [u32; 2],
}

fn extend(v: [f32; 3], w: f32) -> [f32; 4] {
    [v[0], v[1], v[2], w]
}

impl From<&RenderConfig> for SceneUniforms {
    fn from(config: &RenderConfig) -> Self {
        Self {
            camera_to_world: IDENTITY,
            projection_inverse: IDENTITY,
            light_colour: config.light.colour,
            light_position: extend(config.light.position, 1.0),
            ambient_strength: config.light.ambient_strength,
            specular_strength: config.light.specular_strength,
            shadow_attenuation: config.light.shadow_attenuation,
            render_distance: config.march.render_distance,
            minimum_threshold: config.march.minimum_threshold,
            blend_strength: config.march.blend_strength,
            object_count: 0,
            shape_count: 0,
            size: config.surface.size,
            max_steps: config.march.max_steps,
            _pad: 0,
        }
    }
}

impl From<&RenderConfig> for FractalUniforms {
    fn from(config: &RenderConfig) -> Self {
        Self {
            camera_to_world: IDENTITY,
            projection_inverse: IDENTITY,
            light_colour: config.light.colour,
            light_position: extend(config.light.position, 1.0),
            near_colour: config.fractal.near_colour,
            far_colour: config.fractal.far_colour,
            border_colour: config.fractal.border_colour,
            ambient_strength: config.light.ambient_strength,
            specular_strength: config.light.specular_strength,
            shadow_attenuation: config.light.shadow_attenuation,
            render_distance: config.march.render_distance,
            minimum_threshold: config.march.minimum_threshold,
            power: config.fractal.power,
            bailout: config.fractal.bailout,
            border_strength: config.fractal.border_strength,
            iterations: config.fractal.iterations,
            border_steps: config.fractal.border_steps,
            size: config.surface.size,
            max_steps: config.march.max_steps,
            _pad: [0; 3],
        }
    }
}

impl From<&RenderConfig> for AgentUniforms {
    fn from(config: &RenderConfig) -> Self {
        Self {
            colour: config.slime.colour,
            agent_speed: config.slime.agent_speed,
            turn_strength: config.slime.turn_strength,
            view_angle: config.slime.view_angle_deg.to_radians(),
            view_distance: config.slime.view_distance,
            delta_time: 0.0,
            agent_count: config.slime.agent_count,
            size: config.surface.size,
            frame: 0,
            _pad: [0; 3],
        }
    }
}

impl From<&RenderConfig> for TrailUniforms {
    fn from(config: &RenderConfig) -> Self {
        Self {
            blend_strength: config.trail.blend_strength,
            clean_up_strength: config.trail.clean_up_strength,
            delta_time: 0.0,
            _pad0: 0.0,
            size: config.surface.size,
            _pad1: [0; 2],
        }
    }
}

/// WGSL binding layout documentation and validation
///
/// This module documents the exact binding layouts shared by the CPU reference kernels
/// and the WGSL kernels so both evaluators read the same bytes.
pub mod bindings {
    use super::*;

    /// Edge of the square image tile each workgroup covers
    pub const IMAGE_TILE: u32 = 8;

    /// Agents handled per agent-update workgroup
    pub const AGENT_WORKGROUP: u32 = 64;

    /// Scene ray-marching bindings (group 0)
    ///
    /// ```wgsl
    /// @group(0) @binding(0) var<uniform> params: SceneUniforms;
    /// @group(0) @binding(1) var<storage, read> objects: array<Object>;
    /// @group(0) @binding(2) var<storage, read> shapes: array<Shape>;
    /// @group(0) @binding(3) var result: texture_storage_2d<rgba16float, write>;
    /// ```
    pub const RAY_MARCH_BINDINGS: &str = "RayMarch Group 0: SceneUniforms(uniform), Objects SSBO, Shapes SSBO, result(storage2D write)";

    /// Mandelbulb bindings (group 0)
    ///
    /// ```wgsl
    /// @group(0) @binding(0) var<uniform> params: FractalUniforms;
    /// @group(0) @binding(1) var result: texture_storage_2d<rgba16float, write>;
    /// ```
    pub const FRACTAL_BINDINGS: &str = "Fractal Group 0: FractalUniforms(uniform), result(storage2D write)";

    /// Agent update bindings (group 0)
    ///
    /// ```wgsl
    /// @group(0) @binding(0) var<uniform> params: AgentUniforms;
    /// @group(0) @binding(1) var<storage, read_write> agents: array<Agent>;
    /// @group(0) @binding(2) var<storage, read_write> trail: array<vec4<f32>>;
    /// ```
    pub const AGENT_BINDINGS: &str = "Agents Group 0: AgentUniforms(uniform), Agents SSBO(rw), Trail SSBO(rw)";

    /// Trail evolution bindings (group 0)
    ///
    /// ```wgsl
    /// @group(0) @binding(0) var<uniform> params: TrailUniforms;
    /// @group(0) @binding(1) var<storage, read> trail: array<vec4<f32>>;
    /// @group(0) @binding(2) var<storage, read_write> evolved: array<vec4<f32>>;
    /// @group(0) @binding(3) var result: texture_storage_2d<rgba16float, write>;
    /// ```
    pub const TRAIL_BINDINGS: &str = "Trail Group 0: TrailUniforms(uniform), Trail SSBO, scratch SSBO(rw), result(storage2D write)";

    /// Validate that a scene uniform block targets the given surface
    pub fn validate_scene_uniforms(params: &SceneUniforms, expected_size: [u32; 2]) -> Result<(), String> {
        if params.size != expected_size {
            return Err(format!("Size mismatch: expected {:?}, got {:?}", expected_size, params.size));
        }
        if params.minimum_threshold <= 0.0 {
            return Err(format!("Minimum threshold must be positive, got {}", params.minimum_threshold));
        }
        Ok(())
    }

    /// Validate that an agent uniform block matches the population and surface
    pub fn validate_agent_uniforms(
        params: &AgentUniforms,
        agent_count: u32,
        expected_size: [u32; 2],
    ) -> Result<(), String> {
        if params.agent_count != agent_count {
            Err(format!("Agent count mismatch: expected {}, got {}", agent_count, params.agent_count))
        } else if params.size != expected_size {
            Err(format!("Size mismatch: expected {:?}, got {:?}", expected_size, params.size))
        } else {
            Ok(())
        }
    }

    /// Log binding layout information for debugging
    pub fn log_binding_layouts() {
        log::info!("RayMarch Bindings: {}", RAY_MARCH_BINDINGS);
        log::info!("Fractal Bindings: {}", FRACTAL_BINDINGS);
        log::info!("Agent Bindings: {}", AGENT_BINDINGS);
        log::info!("Trail Bindings: {}", TRAIL_BINDINGS);
        log::info!("Image tile: {}, agent workgroup: {}", IMAGE_TILE, AGENT_WORKGROUP);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_blocks_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 208);
        assert_eq!(std::mem::size_of::<FractalUniforms>(), 272);
        assert_eq!(std::mem::size_of::<AgentUniforms>(), 64);
        assert_eq!(std::mem::size_of::<TrailUniforms>(), 32);
    }

    #[test]
    fn default_config_validates() {
        assert!(RenderConfig::default().validate().is_ok());
    }

    #[test]
    fn spawn_radius_must_keep_agents_in_the_field() {
        let mut config = RenderConfig::default();
        config.slime.spawn = SpawnPolicy::Ring { radius: 0.5 };
        assert!(config.validate().is_ok());

        for radius in [0.6, 0.0, -0.1, f32::NAN] {
            config.slime.spawn = SpawnPolicy::Scattered { radius };
            assert!(config.validate().is_err(), "radius {radius} accepted");
        }
    }

    #[test]
    fn view_angle_is_converted_to_radians() {
        let mut config = RenderConfig::default();
        config.slime.view_angle_deg = 90.0;
        let params = AgentUniforms::from(&config);
        assert!((params.view_angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!(bindings::validate_agent_uniforms(&params, config.slime.agent_count, config.surface.size).is_ok());
    }
}
