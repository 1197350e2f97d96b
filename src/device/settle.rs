use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed animation/settle waits, in milliseconds. Never adaptive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleDelays {
    pub wake_ms: u64,
    pub unlock_swipe_ms: u64,
    pub unlock_ms: u64,
    pub tap_ms: u64,
    pub swipe_ms: u64,
    pub text_ms: u64,
    pub text_char_ms: u64,
    pub back_ms: u64,
    pub home_ms: u64,
    pub long_click_ms: u64,
    pub double_click_ms: u64,
    pub launch_ms: u64,
    pub stop_ms: u64,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            wake_ms: 500,
            unlock_swipe_ms: 500,
            unlock_ms: 1000,
            tap_ms: 1000,
            swipe_ms: 1000,
            text_ms: 500,
            text_char_ms: 30,
            back_ms: 500,
            home_ms: 1000,
            long_click_ms: 500,
            double_click_ms: 500,
            launch_ms: 2000,
            stop_ms: 1000,
        }
    }
}

impl SettleDelays {
    /// All waits zeroed. Useful against scripted devices.
    pub fn none() -> Self {
        Self {
            wake_ms: 0,
            unlock_swipe_ms: 0,
            unlock_ms: 0,
            tap_ms: 0,
            swipe_ms: 0,
            text_ms: 0,
            text_char_ms: 0,
            back_ms: 0,
            home_ms: 0,
            long_click_ms: 0,
            double_click_ms: 0,
            launch_ms: 0,
            stop_ms: 0,
        }
    }
}

/// Block for `ms` milliseconds so the device UI can catch up.
pub fn settle(reason: &str, ms: u64) {
    if ms == 0 {
        return;
    }
    debug!(reason, ms, "Waiting for UI to settle");
    thread::sleep(Duration::from_millis(ms));
}
