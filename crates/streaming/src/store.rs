use tracing::{info, warn};

use crate::refresher::Completion;
use crate::request::Request;
use crate::source::BasemapImage;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StoreUpdate {
    /// New imagery replaced whatever was shown.
    Applied(Request),
    /// The fetch failed; the previous imagery (if any) stays visible.
    KeptStale(Request),
}

/// The basemap imagery currently on screen.
///
/// Last writer wins: every successful completion replaces the imagery, even
/// one that arrives after a newer request's result. Failures never clear it.
#[derive(Debug, Default)]
pub struct BasemapStore {
    current: Option<(Request, BasemapImage)>,
    applied: u64,
}

impl BasemapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, completion: Completion) -> StoreUpdate {
        let Completion { request, result } = completion;
        match result {
            Ok(image) => {
                info!(?request, w = image.image.width(), h = image.image.height(), "basemap applied");
                self.current = Some((request, image));
                self.applied += 1;
                StoreUpdate::Applied(request)
            }
            Err(err) => {
                warn!(?request, %err, "basemap refresh failed, keeping previous imagery");
                StoreUpdate::KeptStale(request)
            }
        }
    }

    pub fn image(&self) -> Option<&BasemapImage> {
        self.current.as_ref().map(|(_, img)| img)
    }

    /// Request whose imagery is shown.
    pub fn shown(&self) -> Option<Request> {
        self.current.as_ref().map(|(r, _)| *r)
    }

    pub fn applied_count(&self) -> u64 {
        self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::{BasemapStore, StoreUpdate};
    use crate::refresher::Completion;
    use crate::request::Request;
    use crate::source::{BasemapError, BasemapImage};
    use foundation::Extent;
    use image::RgbaImage;

    fn ok(id: u64, xmin: f64) -> Completion {
        Completion {
            request: Request(id),
            result: Ok(BasemapImage {
                extent: Extent::new(xmin, 0.0, xmin + 1.0, 1.0),
                image: RgbaImage::new(1, 1),
            }),
        }
    }

    #[test]
    fn failure_keeps_previous_imagery() {
        let mut s = BasemapStore::new();
        assert_eq!(s.apply(ok(1, 0.0)), StoreUpdate::Applied(Request(1)));
        let failed = Completion {
            request: Request(2),
            result: Err(BasemapError::Cancelled),
        };
        assert_eq!(s.apply(failed), StoreUpdate::KeptStale(Request(2)));
        assert_eq!(s.shown(), Some(Request(1)));
        assert!(s.image().is_some());
    }

    #[test]
    fn late_result_still_wins() {
        let mut s = BasemapStore::new();
        s.apply(ok(2, 5.0));
        s.apply(ok(1, 0.0));
        assert_eq!(s.shown(), Some(Request(1)));
        assert_eq!(s.image().unwrap().extent.xmin, 0.0);
        assert_eq!(s.applied_count(), 2);
    }
}
