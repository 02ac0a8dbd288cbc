use wgpu::{BindGroupLayout, Device};

use crate::eval::Kernel;

/// Format of the back and front output images
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Centralized registry that owns all bind group layouts
///
/// Every kernel follows the same order: the uniform block at binding 0, its structured
/// buffers next, and the output storage texture last when it writes one.
pub struct Layouts {
    pub ray_march: BindGroupLayout,
    pub fractal: BindGroupLayout,
    pub agent_update: BindGroupLayout,
    pub trail_evolve: BindGroupLayout,
}

impl Layouts {
    /// Create all bind group layouts once
    pub fn new(device: &Device) -> Self {
        Self {
            ray_march: Self::create_ray_march_layout(device),
            fractal: Self::create_fractal_layout(device),
            agent_update: Self::create_agent_update_layout(device),
            trail_evolve: Self::create_trail_evolve_layout(device),
        }
    }

    pub fn get(&self, kernel: Kernel) -> &BindGroupLayout {
        match kernel {
            Kernel::RayMarch => &self.ray_march,
            Kernel::Fractal => &self.fractal,
            Kernel::AgentUpdate => &self.agent_update,
            Kernel::TrailEvolve => &self.trail_evolve,
        }
    }

    fn create_ray_march_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ray_march_bgl"),
            entries: &[
                // @binding(0) SceneUniforms
                uniform_entry(0),
                // @binding(1) objects
                storage_entry(1, true),
                // @binding(2) shapes
                storage_entry(2, true),
                // @binding(3) result
                output_entry(3),
            ],
        })
    }

    fn create_fractal_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fractal_bgl"),
            entries: &[
                // @binding(0) FractalUniforms
                uniform_entry(0),
                // @binding(1) result
                output_entry(1),
            ],
        })
    }

    fn create_agent_update_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("agent_update_bgl"),
            entries: &[
                // @binding(0) AgentUniforms
                uniform_entry(0),
                // @binding(1) agents (read_write)
                storage_entry(1, false),
                // @binding(2) trail (read_write, persistent)
                storage_entry(2, false),
            ],
        })
    }

    fn create_trail_evolve_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("trail_evolve_bgl"),
            entries: &[
                // @binding(0) TrailUniforms
                uniform_entry(0),
                // @binding(1) trail, read as the pre-step field
                storage_entry(1, true),
                // @binding(2) evolved scratch, copied back over the trail afterwards
                storage_entry(2, false),
                // @binding(3) result
                output_entry(3),
            ],
        })
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn output_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: OUTPUT_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
        count: None,
    }
}
