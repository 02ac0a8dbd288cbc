use std::collections::HashMap;

use super::device::GpuDevice;
use super::layouts::Layouts;
use super::pipelines::ComputePipelines;
use super::textures::OutputTextures;
use crate::error::EvalError;
use crate::eval::{check_buffer, Binding, BufferId, DispatchRequest, Evaluator, Kernel, OutputImage};

struct GpuBuffer {
    label: &'static str,
    size: u64,
    buffer: wgpu::Buffer,
}

/// Evaluator running the WGSL kernels through wgpu
pub struct GpuEvaluator {
    gpu: GpuDevice,
    layouts: Layouts,
    pipelines: ComputePipelines,
    output: OutputTextures,
    buffers: HashMap<BufferId, GpuBuffer>,
    scratch: Option<GpuBuffer>,
    next_id: u64,
}

impl GpuEvaluator {
    pub fn new(gpu: GpuDevice, size: [u32; 2]) -> Result<Self, EvalError> {
        if size[0] == 0 || size[1] == 0 {
            return Err(EvalError::Device(format!("cannot create a {}x{} output", size[0], size[1])));
        }
        let layouts = Layouts::new(&gpu.device);
        let pipelines = ComputePipelines::new(&gpu.device, &layouts);
        let output = OutputTextures::new(&gpu.device, size);
        umbra_params::bindings::log_binding_layouts();

        Ok(Self {
            gpu,
            layouts,
            pipelines,
            output,
            buffers: HashMap::new(),
            scratch: None,
            next_id: 1,
        })
    }

    /// Create a headless device and evaluator in one go
    pub fn headless(size: [u32; 2]) -> Result<Self, EvalError> {
        let gpu = pollster::block_on(GpuDevice::new())?;
        Self::new(gpu, size)
    }

    pub fn gpu(&self) -> &GpuDevice {
        &self.gpu
    }

    /// View of the front image for display
    pub fn front_view(&self) -> &wgpu::TextureView {
        &self.output.front_sample
    }

    fn buffer(&self, id: BufferId) -> Result<&GpuBuffer, EvalError> {
        self.buffers.get(&id).ok_or(EvalError::UnknownBuffer(id.0))
    }

    fn bound(&self, request: &DispatchRequest, binding: Binding) -> Result<&GpuBuffer, EvalError> {
        self.buffer(request.buffer(binding)?)
    }

    /// Scratch store the trail kernel writes before it is copied back
    fn ensure_scratch(&mut self, size: u64) {
        if self.scratch.as_ref().map(|s| s.size) != Some(size) {
            let buffer = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("trail_scratch"),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            self.scratch = Some(GpuBuffer {
                label: "trail_scratch",
                size,
                buffer,
            });
        }
    }

    fn trail_bytes(&self) -> u64 {
        let [w, h] = self.output.size;
        w as u64 * h as u64 * std::mem::size_of::<[f32; 4]>() as u64
    }

    fn check_trail(&self, trail: &GpuBuffer) -> Result<(), EvalError> {
        let expected = self.trail_bytes();
        if trail.size != expected {
            return Err(EvalError::SizeMismatch {
                expected: expected as usize,
                actual: trail.size as usize,
            });
        }
        Ok(())
    }
}

fn entry(binding: u32, buffer: &wgpu::Buffer) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: buffer.as_entire_binding(),
    }
}

impl Evaluator for GpuEvaluator {
    fn output_size(&self) -> [u32; 2] {
        self.output.size
    }

    fn resize_output(&mut self, size: [u32; 2]) -> Result<(), EvalError> {
        if size[0] == 0 || size[1] == 0 {
            return Err(EvalError::Device(format!("cannot create a {}x{} output", size[0], size[1])));
        }
        self.output = OutputTextures::new(&self.gpu.device, size);
        self.scratch = None;
        log::info!("Output resized to {}x{}", size[0], size[1]);
        Ok(())
    }

    fn create_buffer(&mut self, label: &'static str, contents: &[u8], stride: usize) -> Result<BufferId, EvalError> {
        check_buffer(label, contents, stride)?;
        let buffer = self.gpu.create_storage_buffer(label, contents);
        let id = BufferId(self.next_id);
        self.next_id += 1;
        self.buffers.insert(
            id,
            GpuBuffer {
                label,
                size: contents.len() as u64,
                buffer,
            },
        );
        Ok(id)
    }

    fn read_buffer(&mut self, id: BufferId, out: &mut [u8]) -> Result<(), EvalError> {
        let source = self.buffer(id)?;
        if source.size as usize != out.len() {
            return Err(EvalError::SizeMismatch {
                expected: source.size as usize,
                actual: out.len(),
            });
        }
        let bytes = self.gpu.read_back(&source.buffer, source.size)?;
        out.copy_from_slice(&bytes[..out.len()]);
        Ok(())
    }

    fn release_buffer(&mut self, id: BufferId) {
        if let Some(released) = self.buffers.remove(&id) {
            released.buffer.destroy();
        }
    }

    fn dispatch(&mut self, request: &DispatchRequest) -> Result<(), EvalError> {
        request.validate()?;
        let kernel = request.kernel;
        if kernel == Kernel::TrailEvolve {
            let size = self.trail_bytes();
            self.ensure_scratch(size);
        }

        let uniforms = self.gpu.create_uniform_buffer(&format!("{}_uniforms", kernel.name()), request.uniforms);
        let output = &self.output.back_store;

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniforms.as_entire_binding(),
        }];
        let mut copy_back = None;
        match kernel {
            Kernel::RayMarch => {
                entries.push(entry(1, &self.bound(request, Binding::Objects)?.buffer));
                entries.push(entry(2, &self.bound(request, Binding::Shapes)?.buffer));
                entries.push(wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(output),
                });
            }
            Kernel::Fractal => {
                entries.push(wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(output),
                });
            }
            Kernel::AgentUpdate => {
                let trail = self.bound(request, Binding::Trail)?;
                self.check_trail(trail)?;
                entries.push(entry(1, &self.bound(request, Binding::Agents)?.buffer));
                entries.push(entry(2, &trail.buffer));
            }
            Kernel::TrailEvolve => {
                let trail = self.bound(request, Binding::Trail)?;
                self.check_trail(trail)?;
                let scratch = self
                    .scratch
                    .as_ref()
                    .ok_or_else(|| EvalError::Dispatch("trail scratch missing".to_string()))?;
                entries.push(entry(1, &trail.buffer));
                entries.push(entry(2, &scratch.buffer));
                entries.push(wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(output),
                });
                copy_back = Some((&scratch.buffer, &trail.buffer, scratch.size));
            }
        }

        let pipeline = self.pipelines.get(kernel);
        let layout = self.layouts.get(kernel);
        let label = kernel.name();
        self.gpu.scoped_submit(label, |encoder| {
            let bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &entries,
            });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(label),
                    timestamp_writes: None,
                });
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                let [x, y, z] = request.groups;
                pass.dispatch_workgroups(x, y, z);
            }
            if let Some((scratch, trail, size)) = copy_back {
                encoder.copy_buffer_to_buffer(scratch, 0, trail, 0, size);
            }
        })?;

        log::debug!(
            "Dispatched {} over {:?} groups ({} buffers)",
            label,
            request.groups,
            request.buffers.len()
        );
        Ok(())
    }

    fn present(&mut self) -> Result<(), EvalError> {
        let output = &self.output;
        self.gpu.scoped_submit("present", |encoder| output.present(encoder))
    }

    fn read_output(&mut self) -> Result<OutputImage, EvalError> {
        let pixels = self.output.download_front(&self.gpu)?;
        Ok(OutputImage {
            size: self.output.size,
            pixels,
        })
    }
}

impl Drop for GpuEvaluator {
    fn drop(&mut self) {
        if !self.buffers.is_empty() {
            let labels: Vec<&str> = self.buffers.values().map(|b| b.label).collect();
            log::warn!("Dropping evaluator with {} live buffers: {:?}", labels.len(), labels);
        }
    }
}
