pub mod bounds;
pub mod extent;
pub mod geometry;
pub mod ids;
pub mod math;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use extent::*;
pub use geometry::*;
pub use ids::*;
