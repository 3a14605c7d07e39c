pub mod frame;
pub mod raster;

pub use frame::*;
pub use raster::*;
