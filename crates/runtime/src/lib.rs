pub mod event_bus;
pub mod handlers;
pub mod metrics;

pub use event_bus::*;
pub use handlers::*;
pub use metrics::*;
