use umbra_params::{bindings, TrailUniforms};

use crate::error::EvalError;
use crate::eval::{dispatch_grid, download, upload, Binding, BufferId, DispatchRequest, Evaluator, Kernel};

/// Trail texel: accumulated colour, alpha unused by the kernels
pub type Texel = [f32; 4];

/// Field statistics for metrics collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrailStats {
    pub total_energy: f32,
    pub max_energy: f32,
    pub covered: u32, // Texels with any energy
}

/// Persistent trail store living inside the evaluator
///
/// The host only keeps the handle and size; the texels themselves never leave the
/// evaluator except through [`TrailField::read`].
#[derive(Debug)]
pub struct TrailField {
    handle: BufferId,
    size: [u32; 2],
}

impl TrailField {
    /// Allocate a cleared store the size of the output surface
    pub fn create<E: Evaluator + ?Sized>(evaluator: &mut E, size: [u32; 2]) -> Result<Self, EvalError> {
        let texels = vec![[0.0f32; 4]; (size[0] * size[1]) as usize];
        Self::from_texels(evaluator, size, &texels)
    }

    /// Allocate a store initialized from host texels
    pub fn from_texels<E: Evaluator + ?Sized>(
        evaluator: &mut E,
        size: [u32; 2],
        texels: &[Texel],
    ) -> Result<Self, EvalError> {
        let expected = (size[0] * size[1]) as usize;
        if texels.len() != expected {
            return Err(EvalError::SizeMismatch {
                expected: expected * std::mem::size_of::<Texel>(),
                actual: std::mem::size_of_val(texels),
            });
        }
        let handle = upload(evaluator, "trail", texels)?;
        log::debug!("Created trail field {}x{}", size[0], size[1]);
        Ok(Self { handle, size })
    }

    pub fn handle(&self) -> BufferId {
        self.handle
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Evolve the store in place and write its colour to the back image
    pub fn evolve<E: Evaluator + ?Sized>(&self, evaluator: &mut E, params: &TrailUniforms) -> Result<(), EvalError> {
        let buffers = [(Binding::Trail, self.handle)];
        evaluator.dispatch(&DispatchRequest {
            kernel: Kernel::TrailEvolve,
            groups: dispatch_grid(self.size, bindings::IMAGE_TILE),
            uniforms: bytemuck::bytes_of(params),
            buffers: &buffers,
        })
    }

    /// Synchronous read-back for statistics and snapshots
    pub fn read<E: Evaluator + ?Sized>(&self, evaluator: &mut E) -> Result<Vec<Texel>, EvalError> {
        let mut texels = vec![[0.0f32; 4]; (self.size[0] * self.size[1]) as usize];
        download(evaluator, self.handle, &mut texels)?;
        Ok(texels)
    }

    pub fn release<E: Evaluator + ?Sized>(self, evaluator: &mut E) {
        evaluator.release_buffer(self.handle);
    }
}

/// Energy of one texel: the sum of its colour channels
pub fn texel_energy(texel: &Texel) -> f32 {
    texel[0] + texel[1] + texel[2]
}

pub fn total_energy(texels: &[Texel]) -> f32 {
    texels.iter().map(texel_energy).sum()
}

pub fn trail_stats(texels: &[Texel]) -> TrailStats {
    texels.iter().fold(TrailStats::default(), |mut stats, texel| {
        let energy = texel_energy(texel);
        stats.total_energy += energy;
        stats.max_energy = stats.max_energy.max(energy);
        if energy > 0.0 {
            stats.covered += 1;
        }
        stats
    })
}
