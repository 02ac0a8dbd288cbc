//! Deterministic CPU reference evaluator
//!
//! Runs the same four kernels as the WGSL path, one invocation at a time in a fixed
//! order, so tests can assert on exact results.

mod fractal;
mod raymarch;
mod slime;

use std::collections::BTreeMap;

use bytemuck::Pod;
use umbra_params::{AgentUniforms, FractalUniforms, SceneUniforms, TrailUniforms};

use super::{check_buffer, Binding, BufferId, DispatchRequest, Evaluator, Kernel, OutputImage};
use crate::error::EvalError;
use crate::scene::{GpuObject, GpuShape};
use crate::sim::Agent;

struct CpuBuffer {
    label: &'static str,
    stride: usize,
    bytes: Vec<u8>,
}

impl CpuBuffer {
    fn decode<T: Pod>(&self) -> Vec<T> {
        let size = std::mem::size_of::<T>();
        self.bytes.chunks_exact(size).map(bytemuck::pod_read_unaligned).collect()
    }

    fn encode<T: Pod>(&mut self, items: &[T]) {
        self.bytes.copy_from_slice(bytemuck::cast_slice(items));
    }

    fn check_stride<T>(&self, kernel: Kernel) -> Result<(), EvalError> {
        let size = std::mem::size_of::<T>();
        if self.stride != size {
            return Err(EvalError::Dispatch(format!(
                "{} expects {}-byte elements in `{}`, buffer stride is {}",
                kernel.name(),
                size,
                self.label,
                self.stride
            )));
        }
        Ok(())
    }
}

/// Reference evaluator backed by host memory
pub struct CpuEvaluator {
    size: [u32; 2],
    buffers: BTreeMap<BufferId, CpuBuffer>,
    next_id: u64,
    back: Vec<[f32; 4]>,
    front: Vec<[f32; 4]>,
    dispatches: u64,
}

impl CpuEvaluator {
    pub fn new(size: [u32; 2]) -> Self {
        let texels = (size[0] * size[1]) as usize;
        Self {
            size,
            buffers: BTreeMap::new(),
            next_id: 1,
            back: vec![[0.0; 4]; texels],
            front: vec![[0.0; 4]; texels],
            dispatches: 0,
        }
    }

    /// Number of buffers currently alive
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Successful dispatches since creation
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches
    }

    fn buffer(&self, id: BufferId) -> Result<&CpuBuffer, EvalError> {
        self.buffers.get(&id).ok_or(EvalError::UnknownBuffer(id.0))
    }

    fn buffer_mut(&mut self, id: BufferId) -> Result<&mut CpuBuffer, EvalError> {
        self.buffers.get_mut(&id).ok_or(EvalError::UnknownBuffer(id.0))
    }

    fn run(&mut self, request: &DispatchRequest) -> Result<(), EvalError> {
        match request.kernel {
            Kernel::RayMarch => {
                let params = request.uniforms::<SceneUniforms>()?;
                let objects = self.buffer(request.buffer(Binding::Objects)?)?;
                objects.check_stride::<GpuObject>(request.kernel)?;
                let shapes = self.buffer(request.buffer(Binding::Shapes)?)?;
                shapes.check_stride::<GpuShape>(request.kernel)?;
                let scene = raymarch::SceneView::new(&params, objects.decode(), shapes.decode());
                raymarch::render(&scene, self.size, &mut self.back);
            }
            Kernel::Fractal => {
                let params = request.uniforms::<FractalUniforms>()?;
                fractal::render(&params, self.size, &mut self.back);
            }
            Kernel::AgentUpdate => {
                let params = request.uniforms::<AgentUniforms>()?;
                let agents_id = request.buffer(Binding::Agents)?;
                let trail_id = request.buffer(Binding::Trail)?;

                let agents_buffer = self.buffer(agents_id)?;
                agents_buffer.check_stride::<Agent>(request.kernel)?;
                let mut agents = agents_buffer.decode();
                let trail_buffer = self.buffer(trail_id)?;
                trail_buffer.check_stride::<[f32; 4]>(request.kernel)?;
                let mut trail = trail_buffer.decode();
                slime::check_field(&trail, self.size)?;

                slime::update_agents(&params, &mut agents, &mut trail, self.size);

                self.buffer_mut(agents_id)?.encode(&agents);
                self.buffer_mut(trail_id)?.encode(&trail);
            }
            Kernel::TrailEvolve => {
                let params = request.uniforms::<TrailUniforms>()?;
                let trail_id = request.buffer(Binding::Trail)?;
                let trail_buffer = self.buffer(trail_id)?;
                trail_buffer.check_stride::<[f32; 4]>(request.kernel)?;
                let mut trail = trail_buffer.decode();
                slime::check_field(&trail, self.size)?;

                slime::evolve_trail(&params, &mut trail, self.size);
                self.back.copy_from_slice(&trail);

                self.buffer_mut(trail_id)?.encode(&trail);
            }
        }
        Ok(())
    }
}

impl Evaluator for CpuEvaluator {
    fn output_size(&self) -> [u32; 2] {
        self.size
    }

    fn resize_output(&mut self, size: [u32; 2]) -> Result<(), EvalError> {
        if size[0] == 0 || size[1] == 0 {
            return Err(EvalError::Device(format!("cannot create a {}x{} output", size[0], size[1])));
        }
        let texels = (size[0] * size[1]) as usize;
        self.size = size;
        self.back = vec![[0.0; 4]; texels];
        self.front = vec![[0.0; 4]; texels];
        Ok(())
    }

    fn create_buffer(&mut self, label: &'static str, contents: &[u8], stride: usize) -> Result<BufferId, EvalError> {
        check_buffer(label, contents, stride)?;
        let id = BufferId(self.next_id);
        self.next_id += 1;
        self.buffers.insert(
            id,
            CpuBuffer {
                label,
                stride,
                bytes: contents.to_vec(),
            },
        );
        Ok(id)
    }

    fn read_buffer(&mut self, id: BufferId, out: &mut [u8]) -> Result<(), EvalError> {
        let buffer = self.buffer(id)?;
        if buffer.bytes.len() != out.len() {
            return Err(EvalError::SizeMismatch {
                expected: buffer.bytes.len(),
                actual: out.len(),
            });
        }
        out.copy_from_slice(&buffer.bytes);
        Ok(())
    }

    fn release_buffer(&mut self, id: BufferId) {
        self.buffers.remove(&id);
    }

    fn dispatch(&mut self, request: &DispatchRequest) -> Result<(), EvalError> {
        request.validate()?;
        self.run(request)?;
        self.dispatches += 1;
        Ok(())
    }

    fn present(&mut self) -> Result<(), EvalError> {
        self.front.copy_from_slice(&self.back);
        Ok(())
    }

    fn read_output(&mut self) -> Result<OutputImage, EvalError> {
        Ok(OutputImage {
            size: self.size,
            pixels: self.front.clone(),
        })
    }
}
