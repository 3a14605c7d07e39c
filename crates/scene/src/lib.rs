pub mod drag;
pub mod element;
pub mod picking;
pub mod scalebar;
pub mod surface;
pub mod viewport;

pub use drag::*;
pub use element::*;
pub use picking::*;
pub use scalebar::*;
pub use surface::*;
pub use viewport::*;
