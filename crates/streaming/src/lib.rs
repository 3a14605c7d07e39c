pub mod http;
pub mod refresher;
pub mod request;
pub mod source;
pub mod store;
pub mod tiles;

pub use http::*;
pub use refresher::*;
pub use request::*;
pub use source::*;
pub use store::*;
pub use tiles::*;
