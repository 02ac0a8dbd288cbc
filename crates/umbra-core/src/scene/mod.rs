pub mod description;
pub mod flatten;
pub mod node;
pub mod registry;
pub mod shape;

pub use description::*;
pub use flatten::*;
pub use node::*;
pub use registry::*;
pub use shape::*;
