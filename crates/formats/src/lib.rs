pub mod geojson;
pub mod load;
pub mod table;

pub use geojson::*;
pub use load::*;
pub use table::*;
