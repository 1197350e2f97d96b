use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::device::channel::Point;
use crate::error::DetectorError;

/// Image-in, element-list-out detection service.
pub trait VisionDetector {
    fn parse(&self, image: &Path) -> Result<DetectorResponse, DetectorError>;

    /// Cheap liveness probe; never errors.
    fn is_available(&self) -> bool;
}

/// One detection pass as reported by the service.
///
/// `elements` stay untyped here so that a single bad entry cannot poison the
/// whole response; the registry builder validates them one by one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorResponse {
    pub elements: Vec<Value>,
    pub total: usize,
    pub kind_histogram: BTreeMap<String, usize>,
    pub labeled_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetectorPayload {
    elements: Vec<Value>,
    #[serde(default)]
    total_elements: Option<usize>,
    #[serde(default)]
    element_types: BTreeMap<String, usize>,
    #[serde(default)]
    labeled_image: Option<String>,
}

/// Parse a detector response body. Fails only when the envelope itself is
/// unusable (not JSON, no `elements` array).
pub fn parse_detector_payload(body: &str) -> Result<DetectorResponse, DetectorError> {
    let payload: DetectorPayload = serde_json::from_str(body)
        .map_err(|e| DetectorError::MalformedResponse(e.to_string()))?;

    Ok(DetectorResponse {
        total: payload.total_elements.unwrap_or(payload.elements.len()),
        elements: payload.elements,
        kind_histogram: payload.element_types,
        labeled_image: payload.labeled_image,
    })
}

// ============================================================================
// Raw element records
// ============================================================================

/// A detector element before normalization. Field names follow both the
/// current (`bbox`, `type`, `content`, `interactivity`) and the older
/// (`click_point`, `size`) detector formats.
#[derive(Debug, Clone, Deserialize)]
pub struct RawElement {
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "interactivity")]
    pub interactive: Option<bool>,
    #[serde(default, alias = "relative_bbox")]
    pub bbox: Option<Vec<Value>>,
    #[serde(default)]
    pub click_point: Option<Value>,
    #[serde(default)]
    pub size: Option<Value>,
}

/// Where a raw element says it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawGeometry {
    /// `[x1, y1, x2, y2]` as fractions of the screen
    RelativeBox([f64; 4]),
    /// Absolute centre plus absolute width/height
    CenterSize { center: Point, width: i32, height: i32 },
}

impl RawElement {
    /// Resolve which geometry form this element carries. A box wins when both
    /// are present.
    pub fn geometry(&self) -> Result<RawGeometry, String> {
        if let Some(bbox) = &self.bbox {
            if bbox.len() != 4 {
                return Err(format!("bbox has {} components, expected 4", bbox.len()));
            }
            let mut coords = [0.0; 4];
            for (slot, value) in coords.iter_mut().zip(bbox) {
                *slot = value
                    .as_f64()
                    .ok_or_else(|| format!("bbox component {} is not a number", value))?;
            }
            return Ok(RawGeometry::RelativeBox(coords));
        }

        match (&self.click_point, &self.size) {
            (Some(point), Some(size)) => {
                let (cx, cy) = pair(point, "x", "y").ok_or("click_point is not an x/y pair")?;
                let (w, h) = pair(size, "w", "h").ok_or("size is not a w/h pair")?;
                if w < 0.0 || h < 0.0 {
                    return Err(format!("negative size {}x{}", w, h));
                }
                Ok(RawGeometry::CenterSize {
                    center: Point::new(cx.round() as i32, cy.round() as i32),
                    width: w.round() as i32,
                    height: h.round() as i32,
                })
            }
            _ => Err("no bbox and no click_point/size pair".to_string()),
        }
    }

    /// Detector text, preferring `text` over `content`.
    pub fn display_text(&self) -> Option<String> {
        self.text
            .clone()
            .or_else(|| self.content.clone())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Accept `[a, b]` or `{"<ka>": a, "<kb>": b}`.
fn pair(value: &Value, ka: &str, kb: &str) -> Option<(f64, f64)> {
    match value {
        Value::Array(items) if items.len() == 2 => Some((items[0].as_f64()?, items[1].as_f64()?)),
        Value::Object(map) => Some((map.get(ka)?.as_f64()?, map.get(kb)?.as_f64()?)),
        _ => None,
    }
}
