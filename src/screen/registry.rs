use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::device::channel::DeviceGeometry;
use crate::screen::screen_model::{Element, ElementRegistry, GeometryOrigin, RelativeBox};
use crate::vision::detector::{RawElement, RawGeometry};

/// Kind recorded for detector entries that carry none.
pub const UNKNOWN_KIND: &str = "unknown";

/// Normalize raw detector output into an ordered, addressable registry.
///
/// Detector order is preserved; it decides `index` and hit-test precedence.
/// Malformed entries are logged and skipped, and never abort the pass.
/// Indices are assigned after filtering, so they are always dense.
pub fn normalize(raw_elements: &[Value], geometry: &DeviceGeometry) -> ElementRegistry {
    let mut elements = Vec::with_capacity(raw_elements.len());
    let mut kind_histogram: BTreeMap<String, usize> = BTreeMap::new();

    for (raw_position, value) in raw_elements.iter().enumerate() {
        let raw: RawElement = match serde_json::from_value(value.clone()) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(raw_position, "Skipping unparseable detector element: {}", e);
                continue;
            }
        };

        let (relative_bbox, origin) = match resolve_box(&raw, geometry) {
            Ok(resolved) => resolved,
            Err(reason) => {
                warn!(raw_position, "Skipping detector element with bad geometry: {}", reason);
                continue;
            }
        };

        let kind = raw
            .kind
            .clone()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_KIND.to_string());

        *kind_histogram.entry(kind.clone()).or_insert(0) += 1;

        elements.push(
            Element::new(
                elements.len(),
                kind,
                raw.display_text(),
                relative_bbox,
                raw.interactive.unwrap_or(false),
                geometry,
            )
            .with_origin(origin),
        );
    }

    let skipped = raw_elements.len() - elements.len();
    if skipped > 0 {
        debug!(kept = elements.len(), skipped, "Normalized detector output");
    }

    ElementRegistry {
        elements,
        kind_histogram,
    }
}

/// Bring either raw geometry form into the canonical relative box.
fn resolve_box(
    raw: &RawElement,
    geometry: &DeviceGeometry,
) -> Result<(RelativeBox, GeometryOrigin), String> {
    match raw.geometry()? {
        RawGeometry::RelativeBox([x1, y1, x2, y2]) => RelativeBox::new(x1, y1, x2, y2)
            .map(|b| (b, GeometryOrigin::RelativeBox))
            .ok_or_else(|| format!("bbox [{}, {}, {}, {}] outside [0,1] or inverted", x1, y1, x2, y2)),

        RawGeometry::CenterSize {
            center,
            width,
            height,
        } => {
            if geometry.width == 0 || geometry.height == 0 {
                return Err("screen geometry is empty".to_string());
            }
            let w = f64::from(geometry.width);
            let h = f64::from(geometry.height);
            let half_w = f64::from(width) / 2.0;
            let half_h = f64::from(height) / 2.0;
            let cx = f64::from(center.x);
            let cy = f64::from(center.y);

            if cx < 0.0 || cy < 0.0 || cx > w || cy > h {
                return Err(format!("click_point {} is off screen", center));
            }

            // Elements hugging the screen edge may overhang it slightly
            let rel = |v: f64, extent: f64| (v / extent).clamp(0.0, 1.0);
            RelativeBox::new(
                rel(cx - half_w, w),
                rel(cy - half_h, h),
                rel(cx + half_w, w),
                rel(cy + half_h, h),
            )
            .map(|b| (b, GeometryOrigin::CenterSize))
            .ok_or_else(|| format!("click_point {} with size {}x{} is degenerate", center, width, height))
        }
    }
}
