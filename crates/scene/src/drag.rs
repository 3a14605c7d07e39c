use std::collections::BTreeMap;

use foundation::math::Vec2;

use crate::element::{
    DragSession, Draggable, DraggableElement, ElementId, ElementKind, Position,
};
use crate::picking::pick_point;
use crate::surface::ViewContext;
use crate::viewport::{SettledView, ViewportController};

/// What a pointer gesture is currently moving.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DragTarget {
    Element(ElementId),
    /// The virtual element standing for the whole map extent (drag-pan).
    MapExtent,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DragOutcome {
    /// Nothing was hit, nothing was active, or another drag owns the pointer.
    Ignored,
    Started(DragTarget),
    /// `delta` is the cumulative pointer offset since the press.
    Moved { target: DragTarget, delta: Vec2 },
    Released {
        target: DragTarget,
        settled: Option<SettledView>,
    },
}

impl DragOutcome {
    /// True for outcomes that changed what is on screen.
    pub fn needs_redraw(&self) -> bool {
        matches!(self, DragOutcome::Moved { .. } | DragOutcome::Released { .. })
    }
}

/// Pointer-drag state machine shared by every overlay element.
///
/// Each element is idle or active; a press starts a session only when it hits
/// the element and no other drag is in flight, so at most one target (an
/// element or the map extent) is active at any time.
#[derive(Debug, Default)]
pub struct DragController {
    elements: BTreeMap<ElementId, DraggableElement>,
    next_id: u32,
    active: Option<DragTarget>,
    map_press: Option<Vec2>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ElementKind, position: Position, size: Vec2) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements
            .insert(id, DraggableElement::new(id, kind, position, size));
        id
    }

    /// Removes an element, dropping its drag session if it had one.
    pub fn remove(&mut self, id: ElementId) -> Option<DraggableElement> {
        if self.active == Some(DragTarget::Element(id)) {
            self.active = None;
        }
        self.elements.remove(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<&DraggableElement> {
        self.elements.get(&id)
    }

    /// Elements in ascending id order.
    pub fn elements(&self) -> impl Iterator<Item = &DraggableElement> {
        self.elements.values()
    }

    pub fn active(&self) -> Option<DragTarget> {
        self.active
    }

    /// Returns `true` if visibility changed. Hiding an element that is being
    /// dragged ends its session.
    pub fn set_visible(&mut self, id: ElementId, visible: bool) -> bool {
        let Some(el) = self.elements.get_mut(&id) else {
            return false;
        };
        if el.visible == visible {
            return false;
        }
        el.visible = visible;
        if !visible && el.session.take().is_some() {
            self.active = None;
        }
        true
    }

    pub fn set_position(&mut self, id: ElementId, position: Position) -> bool {
        match self.elements.get_mut(&id) {
            Some(el) => {
                el.position = position;
                true
            }
            None => false,
        }
    }

    /// Idle -> Active for the topmost element under `pointer`.
    pub fn press(&mut self, pointer: Vec2, view: &ViewContext) -> DragOutcome {
        if self.active.is_some() {
            return DragOutcome::Ignored;
        }
        let Some(id) = pick_point(self.elements.values(), pointer, view) else {
            return DragOutcome::Ignored;
        };
        let Some(el) = self.elements.get_mut(&id) else {
            return DragOutcome::Ignored;
        };
        el.session = Some(DragSession {
            start_pointer: pointer,
            start_position: el.position,
        });
        let target = DragTarget::Element(id);
        self.active = Some(target);
        DragOutcome::Started(target)
    }

    /// Starts a drag-pan when the press lands inside the plot area.
    pub fn press_map(
        &mut self,
        pointer: Vec2,
        view: &ViewContext,
        viewport: &mut ViewportController,
    ) -> DragOutcome {
        if self.active.is_some() || !view.surface.plot.contains(pointer) {
            return DragOutcome::Ignored;
        }
        viewport.begin_pan(view.transform().map_per_pixel());
        self.map_press = Some(pointer);
        self.active = Some(DragTarget::MapExtent);
        DragOutcome::Started(DragTarget::MapExtent)
    }

    /// Active -> Active: moves the active target to press position + delta.
    pub fn motion(
        &mut self,
        pointer: Vec2,
        view: &ViewContext,
        viewport: &mut ViewportController,
    ) -> DragOutcome {
        match self.active {
            None => DragOutcome::Ignored,
            Some(DragTarget::MapExtent) => {
                let Some(start) = self.map_press else {
                    return DragOutcome::Ignored;
                };
                let delta = pointer - start;
                match viewport.pan(delta) {
                    Some(_) => DragOutcome::Moved {
                        target: DragTarget::MapExtent,
                        delta,
                    },
                    None => DragOutcome::Ignored,
                }
            }
            Some(target @ DragTarget::Element(id)) => {
                let Some(el) = self.elements.get_mut(&id) else {
                    return DragOutcome::Ignored;
                };
                let Some(session) = el.session else {
                    return DragOutcome::Ignored;
                };
                let delta = pointer - session.start_pointer;
                el.position = el.moved(session.start_position, delta, view);
                DragOutcome::Moved { target, delta }
            }
        }
    }

    /// Active -> Idle. Releasing the map extent settles the viewport.
    pub fn release(&mut self, viewport: &mut ViewportController) -> DragOutcome {
        let Some(target) = self.active.take() else {
            return DragOutcome::Ignored;
        };
        match target {
            DragTarget::Element(id) => {
                if let Some(el) = self.elements.get_mut(&id) {
                    el.session = None;
                }
                DragOutcome::Released {
                    target,
                    settled: None,
                }
            }
            DragTarget::MapExtent => {
                self.map_press = None;
                viewport.end_pan();
                DragOutcome::Released {
                    target,
                    settled: Some(viewport.settle()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DragController, DragOutcome, DragTarget};
    use crate::element::{ElementId, ElementKind, Position};
    use crate::surface::{SurfaceGeometry, ViewContext};
    use crate::viewport::ViewportController;
    use foundation::Extent;
    use foundation::math::Vec2;

    fn view() -> ViewContext {
        ViewContext::new(
            SurfaceGeometry::new(800.0, 600.0, 100.0),
            Extent::new(0.0, 0.0, 400.0, 300.0),
        )
    }

    fn setup() -> (DragController, ViewportController, ElementId, ElementId) {
        let mut dc = DragController::new();
        let image = dc.register(
            ElementKind::Image,
            Position::Screen(Vec2::new(10.0, 10.0)),
            Vec2::new(50.0, 50.0),
        );
        let table = dc.register(
            ElementKind::Table,
            Position::Normalized(Vec2::new(0.5, 0.5)),
            Vec2::new(100.0, 40.0),
        );
        (dc, ViewportController::new(view().extent), image, table)
    }

    fn screen_pos(dc: &DragController, id: ElementId) -> Position {
        dc.get(id).unwrap().position
    }

    #[test]
    fn press_outside_leaves_position_unchanged() {
        let (mut dc, mut vc, image, _) = setup();
        let v = view();
        assert_eq!(dc.press(Vec2::new(700.0, 20.0), &v), DragOutcome::Ignored);
        assert_eq!(dc.motion(Vec2::new(720.0, 50.0), &v, &mut vc), DragOutcome::Ignored);
        assert_eq!(dc.release(&mut vc), DragOutcome::Ignored);
        assert_eq!(screen_pos(&dc, image), Position::Screen(Vec2::new(10.0, 10.0)));
    }

    #[test]
    fn drag_moves_by_exact_delta() {
        let (mut dc, mut vc, image, _) = setup();
        let v = view();
        assert_eq!(
            dc.press(Vec2::new(20.0, 20.0), &v),
            DragOutcome::Started(DragTarget::Element(image))
        );
        dc.motion(Vec2::new(40.0, 25.0), &v, &mut vc);
        let out = dc.motion(Vec2::new(57.0, 13.0), &v, &mut vc);
        assert!(out.needs_redraw());
        assert!(matches!(dc.release(&mut vc), DragOutcome::Released { settled: None, .. }));
        assert_eq!(screen_pos(&dc, image), Position::Screen(Vec2::new(47.0, 3.0)));
        assert!(!dc.get(image).unwrap().is_dragging());
    }

    #[test]
    fn table_delta_is_stored_normalized() {
        let (mut dc, mut vc, _, table) = setup();
        let v = view();
        // Table box spans x 400..500, y 260..300.
        dc.press(Vec2::new(450.0, 280.0), &v);
        dc.motion(Vec2::new(530.0, 220.0), &v, &mut vc);
        dc.release(&mut vc);
        assert_eq!(screen_pos(&dc, table), Position::Normalized(Vec2::new(0.6, 0.6)));
    }

    #[test]
    fn map_release_settles_viewport() {
        let (mut dc, mut vc, _, _) = setup();
        let v = view();
        let before = vc.extent();
        assert_eq!(
            dc.press_map(Vec2::new(700.0, 500.0), &v, &mut vc),
            DragOutcome::Started(DragTarget::MapExtent)
        );
        // A second press while panning cannot grab an element.
        assert_eq!(dc.press(Vec2::new(20.0, 20.0), &v), DragOutcome::Ignored);
        dc.motion(Vec2::new(690.0, 520.0), &v, &mut vc);
        let DragOutcome::Released { settled: Some(s), .. } = dc.release(&mut vc) else {
            panic!("expected settled release");
        };
        assert_eq!(s.extent, vc.extent());
        assert_eq!(vc.extent().xmin, before.xmin + 5.0);
        assert_eq!(vc.extent().ymin, before.ymin + 10.0);
        assert!(!vc.is_panning());
    }

    #[test]
    fn hiding_active_element_ends_drag() {
        let (mut dc, mut vc, image, _) = setup();
        let v = view();
        dc.press(Vec2::new(20.0, 20.0), &v);
        assert!(dc.set_visible(image, false));
        assert_eq!(dc.active(), None);
        assert_eq!(dc.release(&mut vc), DragOutcome::Ignored);
    }

    #[test]
    fn at_most_one_session_under_any_interleaving() {
        let (mut dc, mut vc, _, _) = setup();
        dc.register(
            ElementKind::Label,
            Position::Map(Vec2::new(50.0, 250.0)),
            Vec2::new(30.0, 12.0),
        );
        let v = view();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..2_000 {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let x = ((seed >> 33) % 800) as f64;
            let y = ((seed >> 13) % 600) as f64;
            let p = Vec2::new(x, y);
            match seed >> 61 {
                0 | 1 => {
                    dc.press(p, &v);
                }
                2 => {
                    dc.press_map(p, &v, &mut vc);
                }
                3 | 4 | 5 => {
                    dc.motion(p, &v, &mut vc);
                }
                _ => {
                    dc.release(&mut vc);
                }
            }
            let sessions = dc.elements().filter(|e| e.is_dragging()).count()
                + usize::from(vc.is_panning());
            assert!(sessions <= 1);
            assert_eq!(sessions == 1, dc.active().is_some());
        }
    }
}
