//! Per-frame protocol tying the scene and the simulation to the evaluator
//!
//! The caller owns the loop and its pacing; each call to
//! [`FrameCompositor::advance_frame`] produces at most one new front image.

use umbra_params::{bindings, FractalUniforms, RenderConfig, RenderMode, SceneUniforms};

use crate::camera::Camera;
use crate::error::{FrameError, SceneError};
use crate::eval::{dispatch_grid, Binding, DispatchRequest, Evaluator, Kernel, TransientScope};
use crate::scene::{flatten_into, FlatSceneBuffers, SceneRegistry};
use crate::sim::SimulationStepper;

/// Whether a frame replaced the front image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Rendered,
    /// A resource error skipped the frame; the previous front image stays on screen
    Retained,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub mode: RenderMode,
    pub status: FrameStatus,
    pub objects: u32,
    pub shapes: u32,
    pub agents: u32,
    pub elapsed: f32,
}

#[derive(Debug, Default, Clone, Copy)]
struct FrameCounts {
    objects: u32,
    shapes: u32,
    agents: u32,
}

/// Explicit frame context: configuration, the live scene and the simulation
pub struct FrameCompositor {
    config: RenderConfig,
    registry: SceneRegistry,
    stepper: Option<SimulationStepper>,
    flat: FlatSceneBuffers,
    frame: u64,
    retained: u64,
}

impl FrameCompositor {
    /// Validate the configuration, size the evaluator output and, in slime mode,
    /// spawn the simulation
    ///
    /// Capacity violations here are fatal to startup.
    pub fn new<E: Evaluator + ?Sized>(
        config: RenderConfig,
        registry: SceneRegistry,
        evaluator: &mut E,
    ) -> Result<Self, FrameError> {
        config.validate().map_err(FrameError::Config)?;
        check_capacity(&config, registry.len(), registry.shape_count())?;

        if evaluator.output_size() != config.surface.size {
            evaluator.resize_output(config.surface.size)?;
        }

        let stepper = match config.mode {
            RenderMode::Slime => Some(SimulationStepper::new(&config, evaluator)?),
            RenderMode::Scene | RenderMode::Fractal => None,
        };

        log::info!(
            "Frame compositor ready: {:?} mode, {}x{}, {} scene objects",
            config.mode,
            config.surface.size[0],
            config.surface.size[1],
            registry.len()
        );
        Ok(Self {
            config,
            registry,
            stepper,
            flat: FlatSceneBuffers::default(),
            frame: 0,
            retained: 0,
        })
    }

    /// Produce one frame
    ///
    /// On success the back image is presented. Resource errors skip the frame and keep
    /// the previous front image, reported as [`FrameStatus::Retained`]; any other
    /// error is returned.
    pub fn advance_frame<E: Evaluator + ?Sized>(&mut self, evaluator: &mut E, elapsed: f32) -> Result<FrameReport, FrameError> {
        self.frame += 1;

        let outcome = match self.config.mode {
            RenderMode::Scene => self.render_scene(evaluator),
            RenderMode::Fractal => self.render_fractal(evaluator),
            RenderMode::Slime => self.step_slime(evaluator, elapsed),
        }
        .and_then(|counts| {
            evaluator.present()?;
            Ok(counts)
        });

        let (status, counts) = match outcome {
            Ok(counts) => (FrameStatus::Rendered, counts),
            Err(err) if err.is_resource() => {
                self.retained += 1;
                log::warn!("Skipping frame {}: {}", self.frame, err);
                (FrameStatus::Retained, FrameCounts::default())
            }
            Err(err) => return Err(err),
        };

        Ok(FrameReport {
            frame: self.frame,
            mode: self.config.mode,
            status,
            objects: counts.objects,
            shapes: counts.shapes,
            agents: counts.agents,
            elapsed,
        })
    }

    fn render_scene<E: Evaluator + ?Sized>(&mut self, evaluator: &mut E) -> Result<FrameCounts, FrameError> {
        flatten_into(self.registry.nodes(), &mut self.flat)?;
        check_capacity(&self.config, self.flat.objects.len(), self.flat.shapes.len())?;

        let size = evaluator.output_size();
        let objects = self.flat.gpu_objects(self.config.march.blend_strength);
        let shapes = self.flat.gpu_shapes();

        let mut params = SceneUniforms::from(&self.config);
        (params.camera_to_world, params.projection_inverse) =
            Camera::from_config(&self.config.camera, Camera::aspect(size)).to_cols();
        params.object_count = objects.len() as u32;
        params.shape_count = shapes.len() as u32;
        params.size = size;
        bindings::validate_scene_uniforms(&params, size).map_err(FrameError::Config)?;

        let mut scope = TransientScope::new(evaluator);
        let objects_id = scope.upload("objects", &objects)?;
        let shapes_id = scope.upload("shapes", &shapes)?;
        let buffers = [(Binding::Objects, objects_id), (Binding::Shapes, shapes_id)];
        scope.dispatch(&DispatchRequest {
            kernel: Kernel::RayMarch,
            groups: dispatch_grid(size, self.config.surface.tile),
            uniforms: bytemuck::bytes_of(&params),
            buffers: &buffers,
        })?;

        log::debug!("Frame {}: {} objects, {} shapes", self.frame, objects.len(), shapes.len());
        Ok(FrameCounts {
            objects: params.object_count,
            shapes: params.shape_count,
            agents: 0,
        })
    }

    fn render_fractal<E: Evaluator + ?Sized>(&mut self, evaluator: &mut E) -> Result<FrameCounts, FrameError> {
        let size = evaluator.output_size();
        let mut params = FractalUniforms::from(&self.config);
        (params.camera_to_world, params.projection_inverse) =
            Camera::from_config(&self.config.camera, Camera::aspect(size)).to_cols();
        params.size = size;

        evaluator.dispatch(&DispatchRequest {
            kernel: Kernel::Fractal,
            groups: dispatch_grid(size, self.config.surface.tile),
            uniforms: bytemuck::bytes_of(&params),
            buffers: &[],
        })?;
        Ok(FrameCounts::default())
    }

    fn step_slime<E: Evaluator + ?Sized>(&mut self, evaluator: &mut E, elapsed: f32) -> Result<FrameCounts, FrameError> {
        let Some(stepper) = self.stepper.as_mut() else {
            return Err(FrameError::Config("slime mode without a simulation".to_string()));
        };
        stepper.apply_params(&self.config);
        let report = stepper.tick(evaluator, elapsed)?;
        Ok(FrameCounts {
            agents: report.agents,
            ..FrameCounts::default()
        })
    }

    /// Recreate the output surface; in slime mode the trail is cleared at the new size
    pub fn resize<E: Evaluator + ?Sized>(&mut self, evaluator: &mut E, size: [u32; 2]) -> Result<(), FrameError> {
        if size[0] == 0 || size[1] == 0 {
            return Err(FrameError::Config(format!("cannot resize to {}x{}", size[0], size[1])));
        }
        evaluator.resize_output(size)?;
        self.config.surface.size = size;
        if let Some(stepper) = self.stepper.as_mut() {
            stepper.resize(evaluator, size)?;
        }
        Ok(())
    }

    /// Respawn the simulation; other modes have no state to reset
    pub fn reset<E: Evaluator + ?Sized>(&mut self, evaluator: &mut E) -> Result<(), FrameError> {
        if let Some(stepper) = self.stepper.as_mut() {
            stepper.reset(&self.config, evaluator)?;
        }
        Ok(())
    }

    /// Release persistent evaluator resources
    pub fn teardown<E: Evaluator + ?Sized>(self, evaluator: &mut E) {
        if let Some(stepper) = self.stepper {
            stepper.teardown(evaluator);
        }
        log::info!("Frame compositor torn down after {} frames ({} retained)", self.frame, self.retained);
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Edit parameters between frames; surface size changes go through [`Self::resize`]
    pub fn config_mut(&mut self) -> &mut RenderConfig {
        &mut self.config
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SceneRegistry {
        &mut self.registry
    }

    pub fn stepper(&self) -> Option<&SimulationStepper> {
        self.stepper.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    pub fn retained_frames(&self) -> u64 {
        self.retained
    }
}

fn check_capacity(config: &RenderConfig, objects: usize, shapes: usize) -> Result<(), SceneError> {
    let limits = &config.limits;
    if objects > limits.max_objects as usize {
        return Err(SceneError::Capacity {
            what: "object",
            requested: objects,
            max: limits.max_objects as usize,
        });
    }
    if shapes > limits.max_shapes as usize {
        return Err(SceneError::Capacity {
            what: "shape",
            requested: shapes,
            max: limits.max_shapes as usize,
        });
    }
    Ok(())
}
