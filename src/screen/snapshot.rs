use std::path::{Path, PathBuf};

use base64::Engine as _;
use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::device::channel::DeviceChannel;
use crate::error::ControlError;
use crate::screen::lock::ScreenStateResolver;
use crate::screen::registry::normalize;
use crate::screen::screen_model::{ScreenCapture, ScreenSnapshot};
use crate::vision::detector::VisionDetector;

/// Produces one `ScreenCapture` per call: resolve lock state, screenshot,
/// detect, normalize. Nothing is cached between calls.
pub struct ScreenReader<'a> {
    resolver: ScreenStateResolver<'a>,
    detector: &'a dyn VisionDetector,
    screenshot_dir: &'a Path,
}

impl<'a> ScreenReader<'a> {
    pub fn new(
        resolver: ScreenStateResolver<'a>,
        detector: &'a dyn VisionDetector,
        screenshot_dir: &'a Path,
    ) -> Self {
        Self {
            resolver,
            detector,
            screenshot_dir,
        }
    }

    /// Take a fresh snapshot. A detector failure fails the whole capture; no
    /// partial snapshot is returned.
    pub fn capture(&self, device: &mut dyn DeviceChannel) -> Result<ScreenCapture, ControlError> {
        let resolved = self.resolver.resolve(device)?;

        let captured_at = Local::now();
        let image_path = screenshot_path(self.screenshot_dir, &captured_at);
        device.screenshot(&image_path)?;
        debug!(path = %image_path.display(), "Screenshot captured");

        let detection = self.detector.parse(&image_path)?;
        let registry = normalize(&detection.elements, &resolved.geometry);

        if detection.total != registry.total_count() {
            warn!(
                reported = detection.total,
                kept = registry.total_count(),
                "Detector element count differs from registry"
            );
        }
        let reported_kinds = &detection.kind_histogram;
        if !reported_kinds.is_empty() && reported_kinds != registry.kind_histogram() {
            warn!(
                reported = ?reported_kinds,
                kept = ?registry.kind_histogram(),
                "Detector element types differ from registry"
            );
        }

        let parsed_image_path = detection.labeled_image.as_deref().and_then(|encoded| {
            save_labeled_image(encoded, &labeled_path(self.screenshot_dir, &captured_at))
        });

        let snapshot = ScreenSnapshot::new(
            resolved.geometry,
            resolved.lock_state,
            resolved.current_app,
            registry,
            captured_at,
        );

        info!(
            elements = snapshot.total_count(),
            locked = snapshot.lock_state().locked,
            app = %snapshot.current_app().package,
            "Screen snapshot ready"
        );

        Ok(ScreenCapture {
            image_path,
            parsed_image_path,
            screen_info: snapshot,
        })
    }
}

/// Millisecond suffix keeps back-to-back before/after captures apart.
fn screenshot_path(dir: &Path, at: &DateTime<Local>) -> PathBuf {
    dir.join(format!("screen_{}.png", at.format("%Y%m%d_%H%M%S_%3f")))
}

fn labeled_path(dir: &Path, at: &DateTime<Local>) -> PathBuf {
    dir.join(format!("screen_labeled_{}.png", at.format("%Y%m%d_%H%M%S_%3f")))
}

/// Decode the detector's base64 annotated image and write it to `path`.
/// A bad payload or failed write loses only the annotated copy.
pub fn save_labeled_image(encoded: &str, path: &Path) -> Option<PathBuf> {
    let bytes = match base64::engine::general_purpose::STANDARD.decode(encoded.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Detector returned an undecodable labeled image: {}", e);
            return None;
        }
    };

    match std::fs::write(path, bytes) {
        Ok(()) => {
            debug!(path = %path.display(), "Labeled image saved");
            Some(path.to_path_buf())
        }
        Err(e) => {
            warn!(path = %path.display(), "Could not save labeled image: {}", e);
            None
        }
    }
}
