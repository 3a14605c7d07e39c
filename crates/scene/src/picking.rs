use foundation::math::Vec2;

use crate::element::{Draggable, DraggableElement, ElementId};
use crate::surface::ViewContext;

/// Deterministic point picking over overlay elements.
///
/// Ordering contract:
/// - The element with the highest `z` whose box contains the point wins.
/// - If several share that `z`, the higher `ElementId` (registered later, drawn
///   later) wins.
///
/// Hidden elements are never hit.
pub fn pick_point<'a>(
    elements: impl IntoIterator<Item = &'a DraggableElement>,
    pointer: Vec2,
    view: &ViewContext,
) -> Option<ElementId> {
    elements
        .into_iter()
        .filter(|el| el.visible && el.hit_test(pointer, view))
        .max_by_key(|el| (el.z, el.id))
        .map(|el| el.id)
}
