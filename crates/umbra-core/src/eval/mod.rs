//! Contract between the host-side state managers and a parallel evaluator
//!
//! The host never touches kernel arithmetic. It uploads structured buffers, names which
//! binding slot each one fills, hands over a uniform block and a workgroup grid, and
//! reads results back synchronously. Two evaluators implement the contract: the CPU
//! reference in [`cpu`] and the wgpu one in [`crate::gpu`].

pub mod cpu;

use std::ops::{Deref, DerefMut};

use bytemuck::Pod;
use umbra_params::{bindings, AgentUniforms, FractalUniforms, SceneUniforms, TrailUniforms};

use crate::error::EvalError;

pub use cpu::CpuEvaluator;

/// Opaque handle to a buffer living inside an evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Compute kernels every evaluator provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    RayMarch,
    Fractal,
    AgentUpdate,
    TrailEvolve,
}

impl Kernel {
    pub const ALL: [Kernel; 4] = [Kernel::RayMarch, Kernel::Fractal, Kernel::AgentUpdate, Kernel::TrailEvolve];

    pub fn name(self) -> &'static str {
        match self {
            Kernel::RayMarch => "ray_march",
            Kernel::Fractal => "fractal",
            Kernel::AgentUpdate => "agent_update",
            Kernel::TrailEvolve => "trail_evolve",
        }
    }

    pub fn entry_point(self) -> &'static str {
        "main"
    }

    /// Workgroup shape declared by the WGSL kernel
    pub fn workgroup(self) -> [u32; 3] {
        match self {
            Kernel::AgentUpdate => [bindings::AGENT_WORKGROUP, 1, 1],
            _ => [bindings::IMAGE_TILE, bindings::IMAGE_TILE, 1],
        }
    }

    /// Size in bytes of the uniform block bound at slot 0
    pub fn uniform_size(self) -> usize {
        match self {
            Kernel::RayMarch => std::mem::size_of::<SceneUniforms>(),
            Kernel::Fractal => std::mem::size_of::<FractalUniforms>(),
            Kernel::AgentUpdate => std::mem::size_of::<AgentUniforms>(),
            Kernel::TrailEvolve => std::mem::size_of::<TrailUniforms>(),
        }
    }

    /// Structured buffers the kernel reads or writes, in binding order
    pub fn bindings(self) -> &'static [Binding] {
        match self {
            Kernel::RayMarch => &[Binding::Objects, Binding::Shapes],
            Kernel::Fractal => &[],
            Kernel::AgentUpdate => &[Binding::Agents, Binding::Trail],
            Kernel::TrailEvolve => &[Binding::Trail],
        }
    }
}

/// Named structured-buffer slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Objects,
    Shapes,
    Agents,
    Trail,
}

impl Binding {
    pub fn name(self) -> &'static str {
        match self {
            Binding::Objects => "objects",
            Binding::Shapes => "shapes",
            Binding::Agents => "agents",
            Binding::Trail => "trail",
        }
    }
}

/// One kernel invocation
#[derive(Debug, Clone, Copy)]
pub struct DispatchRequest<'a> {
    pub kernel: Kernel,
    pub groups: [u32; 3],
    pub uniforms: &'a [u8],
    pub buffers: &'a [(Binding, BufferId)],
}

impl<'a> DispatchRequest<'a> {
    pub fn buffer(&self, binding: Binding) -> Result<BufferId, EvalError> {
        self.buffers
            .iter()
            .find(|(b, _)| *b == binding)
            .map(|(_, id)| *id)
            .ok_or(EvalError::MissingBinding {
                kernel: self.kernel.name(),
                binding: binding.name(),
            })
    }

    /// Checks shared by every evaluator before any work is recorded
    pub fn validate(&self) -> Result<(), EvalError> {
        let expected = self.kernel.uniform_size();
        if self.uniforms.len() != expected {
            return Err(EvalError::UniformSize {
                kernel: self.kernel.name(),
                expected,
                actual: self.uniforms.len(),
            });
        }
        for binding in self.kernel.bindings() {
            self.buffer(*binding)?;
        }
        Ok(())
    }

    /// Decode the uniform block; call after [`DispatchRequest::validate`]
    pub fn uniforms<T: Pod>(&self) -> Result<T, EvalError> {
        let expected = std::mem::size_of::<T>();
        if self.uniforms.len() != expected {
            return Err(EvalError::UniformSize {
                kernel: self.kernel.name(),
                expected,
                actual: self.uniforms.len(),
            });
        }
        Ok(bytemuck::pod_read_unaligned(self.uniforms))
    }
}

/// Host copy of the evaluator's front image, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct OutputImage {
    pub size: [u32; 2],
    pub pixels: Vec<[f32; 4]>,
}

impl OutputImage {
    pub fn new(size: [u32; 2]) -> Self {
        Self {
            size,
            pixels: vec![[0.0; 4]; (size[0] * size[1]) as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        self.pixels[(y * self.size[0] + x) as usize]
    }

    /// Clamp to [0, 1] and quantize for PNG output
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| p.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect()
    }

    pub fn mean_luminance(&self) -> f32 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        let total: f32 = self
            .pixels
            .iter()
            .map(|p| 0.2126 * p[0] + 0.7152 * p[1] + 0.0722 * p[2])
            .sum();
        total / self.pixels.len() as f32
    }
}

/// The parallel evaluator the host drives
///
/// All calls are synchronous. A failed call leaves previously created buffers and the
/// front image untouched.
pub trait Evaluator {
    fn output_size(&self) -> [u32; 2];

    /// Recreate the back and front images; their contents are cleared
    fn resize_output(&mut self, size: [u32; 2]) -> Result<(), EvalError>;

    /// Create a structured buffer initialized from `contents`
    fn create_buffer(&mut self, label: &'static str, contents: &[u8], stride: usize) -> Result<BufferId, EvalError>;

    /// Copy a buffer's current contents into `out`, blocking until available
    fn read_buffer(&mut self, id: BufferId, out: &mut [u8]) -> Result<(), EvalError>;

    /// Release a buffer; unknown ids are ignored
    fn release_buffer(&mut self, id: BufferId);

    fn dispatch(&mut self, request: &DispatchRequest) -> Result<(), EvalError>;

    /// Copy the back image to the front image
    fn present(&mut self) -> Result<(), EvalError>;

    fn read_output(&mut self) -> Result<OutputImage, EvalError>;
}

/// Check a buffer upload before it reaches the evaluator
pub fn check_buffer(label: &'static str, contents: &[u8], stride: usize) -> Result<usize, EvalError> {
    if contents.is_empty() {
        return Err(EvalError::EmptyBuffer(label));
    }
    if stride == 0 || contents.len() % stride != 0 {
        return Err(EvalError::StrideMismatch {
            label,
            len: contents.len(),
            stride,
        });
    }
    Ok(contents.len() / stride)
}

/// Workgroup grid covering `size` in square tiles, rounding partial tiles up
pub fn dispatch_grid(size: [u32; 2], tile: u32) -> [u32; 3] {
    let tile = tile.max(1);
    [size[0].div_ceil(tile), size[1].div_ceil(tile), 1]
}

/// Workgroups needed for `count` invocations in a 1D kernel
pub fn linear_grid(count: u32, workgroup: u32) -> [u32; 3] {
    [count.div_ceil(workgroup.max(1)), 1, 1]
}

/// Upload a typed slice through an evaluator
pub fn upload<E, T>(evaluator: &mut E, label: &'static str, data: &[T]) -> Result<BufferId, EvalError>
where
    E: Evaluator + ?Sized,
    T: Pod,
{
    evaluator.create_buffer(label, bytemuck::cast_slice(data), std::mem::size_of::<T>())
}

/// Read a buffer back into a typed slice
pub fn download<E, T>(evaluator: &mut E, id: BufferId, out: &mut [T]) -> Result<(), EvalError>
where
    E: Evaluator + ?Sized,
    T: Pod,
{
    evaluator.read_buffer(id, bytemuck::cast_slice_mut(out))
}

/// Scope guard for per-dispatch buffers
///
/// Every buffer created through the scope is released when it drops, on success and
/// error paths alike.
pub struct TransientScope<'e, E: Evaluator + ?Sized> {
    evaluator: &'e mut E,
    buffers: Vec<BufferId>,
}

impl<'e, E: Evaluator + ?Sized> TransientScope<'e, E> {
    pub fn new(evaluator: &'e mut E) -> Self {
        Self {
            evaluator,
            buffers: Vec::new(),
        }
    }

    /// Upload `data` as a transient buffer
    ///
    /// An empty slice is uploaded as one zeroed element so no binding is ever
    /// zero-sized; callers keep their element counts at zero.
    pub fn upload<T: Pod>(&mut self, label: &'static str, data: &[T]) -> Result<BufferId, EvalError> {
        let sentinel = [T::zeroed()];
        let data = if data.is_empty() { &sentinel[..] } else { data };
        let id = upload(&mut *self.evaluator, label, data)?;
        self.buffers.push(id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl<E: Evaluator + ?Sized> Deref for TransientScope<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.evaluator
    }
}

impl<E: Evaluator + ?Sized> DerefMut for TransientScope<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.evaluator
    }
}

impl<E: Evaluator + ?Sized> Drop for TransientScope<'_, E> {
    fn drop(&mut self) {
        for id in self.buffers.drain(..) {
            self.evaluator.release_buffer(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_tiles_round_up() {
        assert_eq!(dispatch_grid([800, 600], 8), [100, 75, 1]);
        assert_eq!(dispatch_grid([801, 601], 8), [101, 76, 1]);
        assert_eq!(dispatch_grid([1, 1], 8), [1, 1, 1]);
        assert_eq!(linear_grid(65, 64), [2, 1, 1]);
    }

    #[test]
    fn buffer_checks() {
        assert_eq!(check_buffer("x", &[], 4), Err(EvalError::EmptyBuffer("x")));
        assert!(matches!(check_buffer("x", &[0; 6], 4), Err(EvalError::StrideMismatch { .. })));
        assert_eq!(check_buffer("x", &[0; 8], 4), Ok(2));
    }

    #[test]
    fn request_reports_missing_binding() {
        let uniforms = [0u8; std::mem::size_of::<TrailUniforms>()];
        let request = DispatchRequest {
            kernel: Kernel::TrailEvolve,
            groups: [1, 1, 1],
            uniforms: &uniforms,
            buffers: &[],
        };
        assert_eq!(
            request.validate(),
            Err(EvalError::MissingBinding {
                kernel: "trail_evolve",
                binding: "trail",
            })
        );
    }
}
