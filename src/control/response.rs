use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::device::channel::{CurrentApp, Point};
use crate::error::ControlError;
use crate::screen::screen_model::{Element, ScreenCapture};

/// Uniform result of every action: `{success, data}` or `{success, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResponse {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Collapse an action outcome into the envelope. Nothing propagates past here.
    pub fn from_result<T: Serialize>(result: Result<T, ControlError>) -> Self {
        match result {
            Ok(data) => match serde_json::to_value(data) {
                Ok(value) => Self::success(value),
                Err(e) => Self::failure(format!("Failed to serialize action result: {}", e)),
            },
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

// ============================================================================
// Per-action payloads
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ClickData {
    pub clicked_position: Point,
    pub before_click: ScreenCapture,
    pub after_click: ScreenCapture,
    /// Hit test of `clicked_position` against the before snapshot
    pub clicked_element: Option<Element>,
    pub screen_changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwipeData {
    pub from: Point,
    pub to: Point,
    pub after_swipe: ScreenCapture,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputData {
    pub input_text: String,
    pub input_mode: &'static str,
    pub after_input: ScreenCapture,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyData {
    pub action: &'static str,
    pub after_action: ScreenCapture,
}

#[derive(Debug, Clone, Serialize)]
pub struct LongClickData {
    pub long_clicked_position: Point,
    pub duration: f64,
    pub after_long_click: ScreenCapture,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoubleClickData {
    pub double_clicked_position: Point,
    pub after_double_click: ScreenCapture,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaunchData {
    pub launched_app: String,
    pub current_app: CurrentApp,
    pub after_launch: ScreenCapture,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopData {
    pub stopped_app: String,
    pub current_app: CurrentApp,
    pub after_stop: ScreenCapture,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppListData {
    pub filter_type: &'static str,
    pub total_count: usize,
    pub apps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppSearchData {
    pub keyword: String,
    pub matched_count: usize,
    pub matched_apps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub sdk: Option<u32>,
    pub android_version: Option<String>,
    pub display_size: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppInfoData {
    pub current_app: CurrentApp,
    pub device_info: DeviceSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDevice {
    pub width: u32,
    pub height: u32,
    pub sdk: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthData {
    pub status: &'static str,
    pub device_connected: bool,
    pub detector_available: bool,
    pub device_info: HealthDevice,
}

#[derive(Debug, Clone, Serialize)]
pub struct FindTextData {
    pub text: String,
    pub matched_count: usize,
    pub matches: Vec<Element>,
    pub image_path: std::path::PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_image_path: Option<std::path::PathBuf>,
}
