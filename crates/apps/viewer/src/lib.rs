pub mod app;
pub mod config;
pub mod input;
pub mod session;

pub use app::*;
pub use config::*;
pub use input::*;
pub use session::*;
