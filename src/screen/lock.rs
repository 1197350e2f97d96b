use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::device::channel::{CurrentApp, DeviceChannel, DeviceGeometry, Point, TextFilter};
use crate::device::settle::{SettleDelays, settle};
use crate::error::DeviceError;
use crate::screen::screen_model::LockState;

/// Lock-screen heuristic inputs.
///
/// Both lists are locale- and vendor-specific guesses, never complete. A lock
/// screen whose wording or package is not listed goes undetected, and an
/// ordinary screen that happens to show a listed phrase is treated as locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Substrings that mark a lock screen when found in any visible text
    pub keywords: Vec<String>,
    /// Foreground packages that mean the keyguard is showing
    pub system_packages: Vec<String>,
    /// Node class sampled for visible text; empty samples every node
    pub text_class: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            keywords: vec![
                "仅限紧急呼叫".into(),
                "滑动解锁".into(),
                "向上滑动解锁".into(),
                "Emergency calls only".into(),
                "Swipe up to unlock".into(),
            ],
            system_packages: vec![
                "com.android.systemui".into(),
                "com.miui.aod".into(),
                "com.android.keyguard".into(),
            ],
            text_class: "android.widget.TextView".into(),
        }
    }
}

impl LockConfig {
    /// First visible text containing a lock keyword.
    pub fn keyword_hit<'t>(&self, texts: &'t [String]) -> Option<&'t str> {
        texts
            .iter()
            .find(|text| self.keywords.iter().any(|k| !k.is_empty() && text.contains(k.as_str())))
            .map(String::as_str)
    }

    pub fn is_system_package(&self, package: &str) -> bool {
        self.system_packages.iter().any(|p| p == package)
    }

    pub fn text_filter(&self) -> TextFilter {
        if self.text_class.is_empty() {
            TextFilter::default()
        } else {
            TextFilter::class(self.text_class.clone())
        }
    }
}

/// Device state established before any detector call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScreen {
    /// Geometry as observed at the start of the cycle (pre-wake power state)
    pub geometry: DeviceGeometry,
    pub lock_state: LockState,
    pub current_app: CurrentApp,
}

// ============================================================================
// ScreenStateResolver
// ============================================================================

/// Wakes the device if needed and makes one attempt to get past a lock screen.
pub struct ScreenStateResolver<'a> {
    config: &'a LockConfig,
    delays: &'a SettleDelays,
}

impl<'a> ScreenStateResolver<'a> {
    pub fn new(config: &'a LockConfig, delays: &'a SettleDelays) -> Self {
        Self { config, delays }
    }

    /// Wake, detect the lock screen, attempt one unlock swipe, re-check.
    ///
    /// After a successful unlock the foreground app is read again, so
    /// `current_app` never names the keyguard of an unlocked snapshot.
    /// Device failures on geometry/app queries are fatal. A lock screen that
    /// survives the swipe is reported through `lock_state.locked`, not raised.
    pub fn resolve(&self, device: &mut dyn DeviceChannel) -> Result<ResolvedScreen, DeviceError> {
        let geometry = device.geometry()?;

        let was_off = !geometry.power_on;
        if was_off {
            info!("Screen is off, waking device");
            device.power_on()?;
            settle("wake", self.delays.wake_ms);
        }

        let mut current_app = device.foreground_app()?;
        debug!(package = %current_app.package, "Foreground app");

        let mut locked = match self.scan_keywords(device) {
            Some(text) => {
                info!(%text, "Lock-screen keyword detected");
                true
            }
            None => false,
        };

        if !locked && self.config.is_system_package(&current_app.package) {
            info!(package = %current_app.package, "System UI package in foreground, treating as locked");
            locked = true;
        }

        if locked {
            locked = self.attempt_unlock(device, &geometry);
            if !locked {
                // The keyguard is gone; report what is underneath it
                current_app = device.foreground_app()?;
                debug!(package = %current_app.package, "Foreground app after unlock");
            }
        }

        Ok(ResolvedScreen {
            geometry,
            lock_state: LockState { locked, was_off },
            current_app,
        })
    }

    /// One swipe up, then one re-check. Returns whether the device still looks locked.
    fn attempt_unlock(&self, device: &mut dyn DeviceChannel, geometry: &DeviceGeometry) -> bool {
        let (from, to) = unlock_swipe(geometry);
        info!(%from, %to, "Attempting unlock swipe");

        let swipe = device.swipe(from, to, Duration::from_millis(self.delays.unlock_swipe_ms));
        if let Err(e) = swipe {
            warn!("Unlock swipe failed: {}", e);
            return true;
        }
        settle("unlock", self.delays.unlock_ms);

        match self.scan_keywords(device) {
            Some(text) => {
                warn!(%text, "Still on lock screen after swipe");
                true
            }
            None => {
                info!("Unlocked");
                false
            }
        }
    }

    /// Sample visible text and look for a lock keyword. A failed sample counts
    /// as no match.
    fn scan_keywords(&self, device: &mut dyn DeviceChannel) -> Option<String> {
        let texts = match device.element_texts(&self.config.text_filter()) {
            Ok(texts) => texts,
            Err(e) => {
                warn!("Could not sample screen text for lock detection: {}", e);
                return None;
            }
        };
        debug!(sample = ?texts.iter().take(5).collect::<Vec<_>>(), "Screen text");

        self.config.keyword_hit(&texts).map(str::to_string)
    }
}

/// Vertical swipe from 90% to 10% of the height, centred horizontally.
pub fn unlock_swipe(geometry: &DeviceGeometry) -> (Point, Point) {
    let x = (geometry.width / 2) as i32;
    let h = f64::from(geometry.height);
    (
        Point::new(x, (h * 0.9).round() as i32),
        Point::new(x, (h * 0.1).round() as i32),
    )
}
