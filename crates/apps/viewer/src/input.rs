use foundation::math::Vec2;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Pointer input in surface pixels (top-left origin).
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    Press { pointer: Vec2, button: PointerButton },
    Move { pointer: Vec2 },
    Release { pointer: Vec2, button: PointerButton },
    /// Positive `delta` scrolls away from the user (zoom in).
    Wheel { delta: f64 },
}

impl InputEvent {
    pub fn topic(&self) -> Topic {
        match self {
            InputEvent::Press { .. } => Topic::Press,
            InputEvent::Move { .. } => Topic::Move,
            InputEvent::Release { .. } => Topic::Release,
            InputEvent::Wheel { .. } => Topic::Wheel,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Topic {
    Press,
    Move,
    Release,
    Wheel,
}

/// Interaction handlers the session can subscribe to a topic.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Handler {
    /// Drag state machine for overlay elements; also routes move/release to
    /// whichever target is active.
    Elements,
    /// Drag-pan of the map extent.
    MapExtent,
    WheelZoom,
}
