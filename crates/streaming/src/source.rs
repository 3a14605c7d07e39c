use std::future::Future;
use std::pin::Pin;

use foundation::Extent;
use image::RgbaImage;
use thiserror::Error;

/// Boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BasemapError {
    #[error("tile request {url} failed: {message}")]
    Http { url: String, message: String },
    #[error("tile {url} could not be decoded: {message}")]
    Decode { url: String, message: String },
    #[error("requested extent is empty")]
    EmptyExtent,
    #[error("basemap task ended before completing")]
    Cancelled,
}

/// Imagery covering `extent`, north-up, top-left pixel at (xmin, ymax).
#[derive(Debug, Clone, PartialEq)]
pub struct BasemapImage {
    pub extent: Extent,
    pub image: RgbaImage,
}

/// Anything that can produce background imagery for an extent.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait BasemapSource: Send + Sync {
    /// Imagery covering at least `extent`, at roughly `width_px` across.
    fn fetch(&self, extent: Extent, width_px: u32) -> BoxFuture<'_, Result<BasemapImage, BasemapError>>;
}
