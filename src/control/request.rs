use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// A tool-invocation payload: `{"action": "<name>", ...arguments}`.
///
/// Arguments the caller may omit are optional here and validated by the
/// controller, so a missing coordinate becomes an `InvalidInput` response
/// rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    /// Capture and return the current screen.
    ScreenInfo,
    /// Tap a coordinate, with before/after snapshots.
    Click { x: Option<i32>, y: Option<i32> },
    /// Swipe by direction or by explicit coordinates.
    Swipe {
        direction: Option<String>,
        start_x: Option<i32>,
        start_y: Option<i32>,
        end_x: Option<i32>,
        end_y: Option<i32>,
        /// Seconds
        #[serde(default = "default_swipe_secs")]
        duration: f64,
    },
    /// Type into the focused field.
    InputText {
        text: Option<String>,
        #[serde(default)]
        clear_before: bool,
        #[serde(default)]
        slowly: bool,
    },
    Back,
    Home,
    LongClick {
        x: Option<i32>,
        y: Option<i32>,
        /// Seconds
        #[serde(default = "default_long_click_secs")]
        duration: f64,
    },
    DoubleClick { x: Option<i32>, y: Option<i32> },
    LaunchApp { package_name: Option<String> },
    ForceStopApp { package_name: Option<String> },
    ListApps {
        #[serde(default = "default_filter")]
        filter_type: String,
    },
    SearchApp { keyword: Option<String> },
    AppInfo,
    Health,
    /// Capture and return elements whose text contains `text`.
    FindText { text: Option<String> },
}

fn default_swipe_secs() -> f64 {
    0.5
}
fn default_long_click_secs() -> f64 {
    1.0
}
fn default_filter() -> String {
    "all".to_string()
}

impl ActionRequest {
    /// Parse a JSON tool-invocation payload.
    pub fn from_json(payload: &str) -> Result<Self, ControlError> {
        serde_json::from_str(payload)
            .map_err(|e| ControlError::invalid_input(format!("Invalid action payload: {}", e)))
    }

    /// Snake-case action name, as used in the payload tag.
    pub fn name(&self) -> &'static str {
        match self {
            ActionRequest::ScreenInfo => "screen_info",
            ActionRequest::Click { .. } => "click",
            ActionRequest::Swipe { .. } => "swipe",
            ActionRequest::InputText { .. } => "input_text",
            ActionRequest::Back => "back",
            ActionRequest::Home => "home",
            ActionRequest::LongClick { .. } => "long_click",
            ActionRequest::DoubleClick { .. } => "double_click",
            ActionRequest::LaunchApp { .. } => "launch_app",
            ActionRequest::ForceStopApp { .. } => "force_stop_app",
            ActionRequest::ListApps { .. } => "list_apps",
            ActionRequest::SearchApp { .. } => "search_app",
            ActionRequest::AppInfo => "app_info",
            ActionRequest::Health => "health",
            ActionRequest::FindText { .. } => "find_text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl FromStr for SwipeDirection {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(SwipeDirection::Up),
            "down" => Ok(SwipeDirection::Down),
            "left" => Ok(SwipeDirection::Left),
            "right" => Ok(SwipeDirection::Right),
            other => Err(ControlError::invalid_input(format!("Invalid direction: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppFilter {
    All,
    Running,
    User,
}

impl AppFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            AppFilter::All => "all",
            AppFilter::Running => "running",
            AppFilter::User => "user",
        }
    }
}

impl FromStr for AppFilter {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(AppFilter::All),
            "running" => Ok(AppFilter::Running),
            "user" => Ok(AppFilter::User),
            other => Err(ControlError::invalid_input(format!("Invalid filter_type: {}", other))),
        }
    }
}
