pub mod composite;
pub mod job;
pub mod pipeline;
pub mod placement;

pub use composite::*;
pub use job::*;
pub use pipeline::*;
pub use placement::*;
