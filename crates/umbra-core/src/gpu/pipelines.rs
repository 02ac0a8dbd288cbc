use wgpu::{BindGroupLayout, ComputePipeline, Device};

use super::layouts::Layouts;
use crate::eval::Kernel;
use crate::shaders;

/// Compute pipelines, one per kernel
pub struct ComputePipelines {
    pub ray_march: ComputePipeline,
    pub fractal: ComputePipeline,
    pub agent_update: ComputePipeline,
    pub trail_evolve: ComputePipeline,
}

impl ComputePipelines {
    /// Create all compute pipelines against the shared layouts
    pub fn new(device: &Device, layouts: &Layouts) -> Self {
        Self {
            ray_march: Self::create_pipeline(device, Kernel::RayMarch, &layouts.ray_march),
            fractal: Self::create_pipeline(device, Kernel::Fractal, &layouts.fractal),
            agent_update: Self::create_pipeline(device, Kernel::AgentUpdate, &layouts.agent_update),
            trail_evolve: Self::create_pipeline(device, Kernel::TrailEvolve, &layouts.trail_evolve),
        }
    }

    pub fn get(&self, kernel: Kernel) -> &ComputePipeline {
        match kernel {
            Kernel::RayMarch => &self.ray_march,
            Kernel::Fractal => &self.fractal,
            Kernel::AgentUpdate => &self.agent_update,
            Kernel::TrailEvolve => &self.trail_evolve,
        }
    }

    fn create_pipeline(device: &Device, kernel: Kernel, bgl: &BindGroupLayout) -> ComputePipeline {
        let name = kernel.name();
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{}_shader", name)),
            source: wgpu::ShaderSource::Wgsl(shaders::source(kernel).into()),
        });

        let pl = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}_pl", name)),
            bind_group_layouts: &[bgl],
            push_constant_ranges: &[],
        });

        log::debug!("Compiling {} pipeline", name);
        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{}_pipeline", name)),
            layout: Some(&pl),
            module: &shader,
            entry_point: kernel.entry_point(),
        })
    }
}
