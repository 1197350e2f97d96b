use sha1::{Digest, Sha1};

use crate::screen::screen_model::{Element, ScreenSnapshot};

/// Elements whose text contains `needle` (case-sensitive substring).
pub fn find_by_text<'s>(snapshot: &'s ScreenSnapshot, needle: &str) -> Vec<&'s Element> {
    snapshot
        .elements()
        .iter()
        .filter(|el| el.text().is_some_and(|t| t.contains(needle)))
        .collect()
}

/// Elements the detector flagged as responding to input.
pub fn interactive_elements(snapshot: &ScreenSnapshot) -> Vec<&Element> {
    snapshot.elements().iter().filter(|el| el.interactive()).collect()
}

/// Content hash of what the detector saw: kinds, boxes and texts in order.
/// Independent of capture time, lock state and foreground app.
pub fn screen_fingerprint(snapshot: &ScreenSnapshot) -> String {
    let mut hasher = Sha1::new();
    for el in snapshot.elements() {
        hasher.update(el.kind().as_bytes());
        for c in el.relative_bbox().to_array() {
            hasher.update(c.to_le_bytes());
        }
        hasher.update(el.text().unwrap_or("").as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}
