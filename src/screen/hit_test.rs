use crate::device::channel::Point;
use crate::screen::screen_model::{Element, ScreenSnapshot};

/// Resolve a pixel coordinate to the element it falls on.
///
/// Box-form elements are tested in the relative frame, center+size elements
/// against their floored half-extents; see `Element::contains`.
/// The first element in registry order whose region contains the point wins.
/// There is no z-order or area tie-break: when regions overlap, the earlier
/// index is returned even if a later element is drawn on top of it.
pub fn locate(point: Point, elements: &[Element]) -> Option<&Element> {
    elements.iter().find(|el| el.contains(point))
}

/// `locate` against a snapshot's registry.
pub fn locate_in(snapshot: &ScreenSnapshot, point: Point) -> Option<&Element> {
    locate(point, snapshot.elements())
}
