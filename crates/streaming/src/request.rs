/// Identifies one basemap refresh.
///
/// Small and copyable so completions can travel through channels and event
/// queues without allocation. Ids increase monotonically per refresher.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);
