//! Umbra Core Engine
//!
//! CSG scene flattening, the slime agent simulation and the frame protocol that feeds
//! both to a parallel evaluator.

pub mod camera;
pub mod config;
pub mod error;
pub mod eval;
pub mod frame;
pub mod gpu;
pub mod scene;
pub mod shaders;
pub mod sim;

// Re-export main types
pub use camera::Camera;
pub use config::{ConfigError, RunConfig};
pub use error::*;
pub use eval::{Binding, BufferId, CpuEvaluator, DispatchRequest, Evaluator, Kernel, OutputImage};
pub use frame::*;
pub use gpu::GpuEvaluator;
pub use scene::*;
pub use sim::*;

// Re-export params from umbra-params
pub use umbra_params::*;
