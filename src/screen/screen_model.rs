use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};

use crate::device::channel::{CurrentApp, DeviceGeometry, Point};

/// Wire format of `timestamp` in snapshots.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Bounding box as fractions of screen width/height.
///
/// Only constructible through `new`, which rejects non-finite, out-of-range
/// and inverted boxes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "[f64; 4]")]
pub struct RelativeBox {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
}

impl RelativeBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Option<Self> {
        let coords = [x1, y1, x2, y2];
        if coords.iter().any(|c| !c.is_finite() || !(0.0..=1.0).contains(c)) {
            return None;
        }
        if x1 > x2 || y1 > y2 {
            return None;
        }
        Some(RelativeBox { x1, y1, x2, y2 })
    }

    pub fn x1(&self) -> f64 {
        self.x1
    }
    pub fn y1(&self) -> f64 {
        self.y1
    }
    pub fn x2(&self) -> f64 {
        self.x2
    }
    pub fn y2(&self) -> f64 {
        self.y2
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<RelativeBox> for [f64; 4] {
    fn from(b: RelativeBox) -> Self {
        b.to_array()
    }
}

/// Absolute pixel extent of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

/// Which detector format an element arrived in. Decides its hit-test predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryOrigin {
    /// `bbox` as fractions of the screen
    #[default]
    RelativeBox,
    /// Absolute `click_point` plus `size`
    CenterSize,
}

// ============================================================================
// Element
// ============================================================================

/// One addressable element of a snapshot.
///
/// `click_point` and `size` are derived from `relative_bbox` and the
/// snapshot geometry at construction and have no setters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    index: usize,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    relative_bbox: RelativeBox,
    interactive: bool,
    click_point: Point,
    size: Size,
    #[serde(skip)]
    origin: GeometryOrigin,
    #[serde(skip)]
    frame: (u32, u32),
}

impl Element {
    pub fn new(
        index: usize,
        kind: impl Into<String>,
        text: Option<String>,
        relative_bbox: RelativeBox,
        interactive: bool,
        geometry: &DeviceGeometry,
    ) -> Self {
        let w = f64::from(geometry.width);
        let h = f64::from(geometry.height);
        let b = relative_bbox;

        let click_point = Point::new(
            ((b.x1 + b.x2) / 2.0 * w).round() as i32,
            ((b.y1 + b.y2) / 2.0 * h).round() as i32,
        );
        let size = Size {
            w: ((b.x2 - b.x1) * w).round() as i32,
            h: ((b.y2 - b.y1) * h).round() as i32,
        };

        Element {
            index,
            kind: kind.into(),
            text,
            relative_bbox,
            interactive,
            click_point,
            size,
            origin: GeometryOrigin::RelativeBox,
            frame: (geometry.width, geometry.height),
        }
    }

    /// Mark the detector format this element was normalized from.
    pub fn with_origin(mut self, origin: GeometryOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn relative_bbox(&self) -> RelativeBox {
        self.relative_bbox
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    pub fn click_point(&self) -> Point {
        self.click_point
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn origin(&self) -> GeometryOrigin {
        self.origin
    }

    /// Inclusive containment, in the frame the detector described the element in.
    pub fn contains(&self, point: Point) -> bool {
        match self.origin {
            GeometryOrigin::RelativeBox => self.contains_relative(point),
            GeometryOrigin::CenterSize => self.contains_absolute(point),
        }
    }

    /// `x1 <= x/W <= x2` and `y1 <= y/H <= y2`, inclusive.
    ///
    /// The click point's own row and column always count as inside, so boxes
    /// thinner than a pixel still contain their rounded click point.
    pub fn contains_relative(&self, point: Point) -> bool {
        let (w, h) = self.frame;
        let b = &self.relative_bbox;

        axis_contains(point.x, w, b.x1, b.x2, self.click_point.x)
            && axis_contains(point.y, h, b.y1, b.y2, self.click_point.y)
    }

    /// Inclusive containment in absolute pixels, using floored half-extents
    /// around the click point.
    pub fn contains_absolute(&self, point: Point) -> bool {
        let half_w = self.size.w / 2;
        let half_h = self.size.h / 2;
        let c = self.click_point;

        (c.x - half_w..=c.x + half_w).contains(&point.x)
            && (c.y - half_h..=c.y + half_h).contains(&point.y)
    }
}

fn axis_contains(p: i32, extent: u32, lo: f64, hi: f64, anchor: i32) -> bool {
    if p == anchor {
        return true;
    }
    if extent == 0 {
        return false;
    }
    let rel = f64::from(p) / f64::from(extent);
    lo <= rel && rel <= hi
}

// ============================================================================
// Snapshot
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockState {
    pub locked: bool,
    pub was_off: bool,
}

/// Ordered elements plus their kind counts, as produced by normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementRegistry {
    pub(crate) elements: Vec<Element>,
    pub(crate) kind_histogram: BTreeMap<String, usize>,
}

impl ElementRegistry {
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn total_count(&self) -> usize {
        self.elements.len()
    }

    pub fn kind_histogram(&self) -> &BTreeMap<String, usize> {
        &self.kind_histogram
    }
}

/// One consistent capture of geometry, lock state and detected elements.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenSnapshot {
    geometry: DeviceGeometry,
    lock_state: LockState,
    current_app: CurrentApp,
    registry: ElementRegistry,
    captured_at: DateTime<Local>,
}

impl ScreenSnapshot {
    pub fn new(
        geometry: DeviceGeometry,
        lock_state: LockState,
        current_app: CurrentApp,
        registry: ElementRegistry,
        captured_at: DateTime<Local>,
    ) -> Self {
        ScreenSnapshot {
            geometry,
            lock_state,
            current_app,
            registry,
            captured_at,
        }
    }

    pub fn geometry(&self) -> &DeviceGeometry {
        &self.geometry
    }

    pub fn lock_state(&self) -> LockState {
        self.lock_state
    }

    pub fn current_app(&self) -> &CurrentApp {
        &self.current_app
    }

    pub fn elements(&self) -> &[Element] {
        self.registry.elements()
    }

    pub fn element(&self, index: usize) -> Option<&Element> {
        self.registry.elements().get(index)
    }

    pub fn total_count(&self) -> usize {
        self.registry.total_count()
    }

    pub fn kind_histogram(&self) -> &BTreeMap<String, usize> {
        self.registry.kind_histogram()
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    pub fn timestamp(&self) -> String {
        self.captured_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

#[derive(Serialize)]
struct DeviceInfoWire {
    width: u32,
    height: u32,
    rotation: u8,
    screen_on: bool,
    screen_was_off: bool,
    is_locked: bool,
}

#[derive(Serialize)]
struct SnapshotWire<'a> {
    device_info: DeviceInfoWire,
    current_app: &'a CurrentApp,
    elements: &'a [Element],
    total_elements: usize,
    element_types: &'a BTreeMap<String, usize>,
    timestamp: String,
}

/// Serializes to the `device_info` / `current_app` / `elements` shape outer
/// transports depend on.
impl Serialize for ScreenSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SnapshotWire {
            device_info: DeviceInfoWire {
                width: self.geometry.width,
                height: self.geometry.height,
                rotation: self.geometry.rotation,
                screen_on: self.geometry.power_on,
                screen_was_off: self.lock_state.was_off,
                is_locked: self.lock_state.locked,
            },
            current_app: &self.current_app,
            elements: self.elements(),
            total_elements: self.total_count(),
            element_types: self.kind_histogram(),
            timestamp: self.timestamp(),
        }
        .serialize(serializer)
    }
}

/// A snapshot together with the screenshot it was detected from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenCapture {
    pub image_path: PathBuf,
    /// Detector's annotated copy of the screenshot, when one was returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_image_path: Option<PathBuf>,
    pub screen_info: ScreenSnapshot,
}
