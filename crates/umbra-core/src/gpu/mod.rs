pub mod device;
pub mod evaluator;
pub mod layouts;
pub mod pipelines;
pub mod textures;

pub use device::*;
pub use evaluator::*;
pub use layouts::*;
pub use pipelines::*;
pub use textures::*;
