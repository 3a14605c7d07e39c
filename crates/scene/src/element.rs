use foundation::ScreenRect;
use foundation::math::Vec2;

use crate::surface::ViewContext;

/// Stable handle for a registered overlay element.
///
/// Ids are allocated in registration order and never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Label,
    Image,
    Table,
    Legend,
}

impl ElementKind {
    /// Default stacking order; higher values are drawn (and hit) on top.
    pub fn default_z(self) -> i32 {
        match self {
            ElementKind::Label => 3,
            ElementKind::Table => 4,
            ElementKind::Legend => 5,
            ElementKind::Image => 6,
        }
    }
}

/// Where an element lives, in the coordinate space its kind is anchored to.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Position {
    /// Top-left corner in surface pixels (top-left origin).
    Screen(Vec2),
    /// Bottom-left corner as a fraction of the plot area, y growing upward.
    Normalized(Vec2),
    /// Centre of the element in projected map coordinates; follows the view.
    Map(Vec2),
}

/// Press state recorded while an element is being dragged.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DragSession {
    pub start_pointer: Vec2,
    pub start_position: Position,
}

/// Drag capability shared by every overlay kind.
///
/// Implementors decide how their box is found on screen (the hit region) and
/// how a screen-space pointer delta maps back into their own position space.
pub trait Draggable {
    fn screen_rect(&self, view: &ViewContext) -> ScreenRect;

    fn hit_test(&self, pointer: Vec2, view: &ViewContext) -> bool {
        self.screen_rect(view).contains(pointer)
    }

    /// Position reached by moving `start` by `delta` screen pixels.
    fn moved(&self, start: Position, delta: Vec2, view: &ViewContext) -> Position;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraggableElement {
    pub id: ElementId,
    pub kind: ElementKind,
    pub position: Position,
    /// Box size in surface pixels.
    pub size: Vec2,
    pub z: i32,
    pub visible: bool,
    pub session: Option<DragSession>,
}

impl DraggableElement {
    pub fn new(id: ElementId, kind: ElementKind, position: Position, size: Vec2) -> Self {
        Self {
            id,
            kind,
            position,
            size,
            z: kind.default_z(),
            visible: true,
            session: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }
}

impl Draggable for DraggableElement {
    fn screen_rect(&self, view: &ViewContext) -> ScreenRect {
        let plot = view.surface.plot;
        let origin = match self.position {
            Position::Screen(top_left) => top_left,
            Position::Normalized(f) => {
                let bottom = plot.y + plot.height * (1.0 - f.y);
                Vec2::new(plot.x + plot.width * f.x, bottom - self.size.y)
            }
            Position::Map(anchor) => {
                let s = view.transform().map_to_screen(anchor);
                Vec2::new(s.x - self.size.x / 2.0, s.y - self.size.y / 2.0)
            }
        };
        ScreenRect::from_origin_size(origin, self.size)
    }

    fn moved(&self, start: Position, delta: Vec2, view: &ViewContext) -> Position {
        match start {
            Position::Screen(p) => Position::Screen(p + delta),
            Position::Normalized(f) => {
                let plot = view.surface.plot;
                Position::Normalized(Vec2::new(
                    f.x + delta.x / plot.width,
                    f.y - delta.y / plot.height,
                ))
            }
            Position::Map(anchor) => {
                Position::Map(anchor + view.transform().screen_delta_to_map(delta))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Draggable, DraggableElement, ElementId, ElementKind, Position};
    use crate::surface::{SurfaceGeometry, ViewContext};
    use foundation::Extent;
    use foundation::math::Vec2;

    fn view() -> ViewContext {
        ViewContext::new(
            SurfaceGeometry::new(800.0, 600.0, 100.0),
            Extent::new(0.0, 0.0, 400.0, 300.0),
        )
    }

    #[test]
    fn normalized_box_sits_on_its_bottom_left() {
        let el = DraggableElement::new(
            ElementId(0),
            ElementKind::Table,
            Position::Normalized(Vec2::new(0.25, 0.5)),
            Vec2::new(100.0, 40.0),
        );
        let r = el.screen_rect(&view());
        assert_eq!((r.x, r.y), (200.0, 260.0));
        assert_eq!(r.bottom(), 300.0);
    }

    #[test]
    fn map_anchored_box_is_centred_on_anchor() {
        let el = DraggableElement::new(
            ElementId(0),
            ElementKind::Label,
            Position::Map(Vec2::new(200.0, 150.0)),
            Vec2::new(20.0, 10.0),
        );
        let r = el.screen_rect(&view());
        assert_eq!((r.x, r.y), (390.0, 295.0));
        assert!(el.hit_test(Vec2::new(400.0, 300.0), &view()));
        assert!(!el.hit_test(Vec2::new(400.0, 310.0), &view()));
    }

    #[test]
    fn delta_converts_into_each_space() {
        let v = view();
        let el = DraggableElement::new(
            ElementId(0),
            ElementKind::Image,
            Position::Screen(Vec2::new(10.0, 10.0)),
            Vec2::new(5.0, 5.0),
        );
        let d = Vec2::new(80.0, -60.0);
        assert_eq!(
            el.moved(Position::Screen(Vec2::new(10.0, 10.0)), d, &v),
            Position::Screen(Vec2::new(90.0, -50.0))
        );
        assert_eq!(
            el.moved(Position::Normalized(Vec2::new(0.1, 0.1)), d, &v),
            Position::Normalized(Vec2::new(0.2, 0.2))
        );
        assert_eq!(
            el.moved(Position::Map(Vec2::new(100.0, 100.0)), d, &v),
            Position::Map(Vec2::new(140.0, 130.0))
        );
    }
}
