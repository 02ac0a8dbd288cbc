pub mod agents;
pub mod stepper;
pub mod trail;

pub use agents::*;
pub use stepper::*;
pub use trail::*;
