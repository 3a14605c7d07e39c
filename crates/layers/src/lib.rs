pub mod catalog;
pub mod choropleth;
pub mod classify;
pub mod labels;
pub mod layer;
pub mod legend;
pub mod manager;
pub mod symbology;

pub use catalog::*;
pub use choropleth::*;
pub use classify::*;
pub use labels::*;
pub use layer::*;
pub use legend::*;
pub use manager::*;
pub use symbology::*;
