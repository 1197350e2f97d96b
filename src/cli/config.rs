use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::control::apps::{AppAlias, default_aliases};
use crate::control::controller::ControlSettings;
use crate::device::settle::SettleDelays;
use crate::screen::lock::LockConfig;

pub const DEFAULT_CONFIG_PATH: &str = "android-screen-control.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "android-screen-control",
    version,
    about = "Android screen state, element detection and device control"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: android-screen-control.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// adb device serial
    #[arg(long, global = true)]
    pub serial: Option<String>,

    /// Detector service base URL
    #[arg(long, global = true)]
    pub detector_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture the screen and list detected elements
    Screen,

    /// Tap a coordinate
    Click {
        #[arg(long)]
        x: i32,
        #[arg(long)]
        y: i32,
    },

    /// Swipe by direction (up, down, left, right) or by coordinates
    Swipe {
        #[arg(long)]
        direction: Option<String>,
        #[arg(long)]
        start_x: Option<i32>,
        #[arg(long)]
        start_y: Option<i32>,
        #[arg(long)]
        end_x: Option<i32>,
        #[arg(long)]
        end_y: Option<i32>,
        /// Seconds
        #[arg(long, default_value_t = 0.5)]
        duration: f64,
    },

    /// Type text into the focused field
    Type {
        text: String,
        /// Clear the field first
        #[arg(long)]
        clear: bool,
        /// Type one character at a time
        #[arg(long)]
        slowly: bool,
    },

    /// Press the back key
    Back,

    /// Press the home key
    Home,

    /// Press and hold a coordinate
    LongClick {
        #[arg(long)]
        x: i32,
        #[arg(long)]
        y: i32,
        /// Seconds
        #[arg(long, default_value_t = 1.0)]
        duration: f64,
    },

    /// Tap a coordinate twice
    DoubleClick {
        #[arg(long)]
        x: i32,
        #[arg(long)]
        y: i32,
    },

    /// Launch an app by package name
    Launch { package: String },

    /// Force-stop an app by package name
    Stop { package: String },

    /// List packages: all, running or user
    ListApps {
        #[arg(long, default_value = "all")]
        filter: String,
    },

    /// Search installed packages by keyword or alias
    SearchApp { keyword: String },

    /// Foreground app and device properties
    AppInfo,

    /// Find on-screen elements whose text contains a string
    Find { text: String },

    /// Check device and detector reachability
    Health,

    /// Run a raw JSON action payload, e.g. '{"action":"click","x":1,"y":2}'
    Invoke {
        #[arg(long)]
        json: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `android-screen-control.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub delays: SettleDelays,
    #[serde(default)]
    pub apps: AppsConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_adb")]
    pub adb_path: String,
    pub serial: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb(),
            serial: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_detector_url")]
    pub url: String,

    #[serde(default = "default_thirty")]
    pub timeout_secs: u64,

    #[serde(default = "default_five")]
    pub health_timeout_secs: u64,

    #[serde(default)]
    pub return_labeled_image: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            url: default_detector_url(),
            timeout_secs: 30,
            health_timeout_secs: 5,
            return_labeled_image: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppsConfig {
    #[serde(default = "default_aliases")]
    pub aliases: Vec<AppAlias>,
}

impl Default for AppsConfig {
    fn default() -> Self {
        Self {
            aliases: default_aliases(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Where screenshots are written (default: system temp dir)
    pub screenshot_dir: Option<PathBuf>,
}

// Serde default helpers
fn default_adb() -> String { "adb".to_string() }
fn default_detector_url() -> String { "http://localhost:8000".to_string() }
fn default_thirty() -> u64 { 30 }
fn default_five() -> u64 { 5 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if the file is missing or
/// malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => parse_config(&content).unwrap_or_else(|e| {
            warn!(path = config_path, "Ignoring malformed config file: {}", e);
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

pub fn parse_config(content: &str) -> Result<AppConfig, serde_yaml::Error> {
    // An empty document deserializes as unit, not as an empty mapping.
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    serde_yaml::from_str(content)
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

impl AppConfig {
    /// Apply global CLI flags on top of the file.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(serial) = &cli.serial {
            self.device.serial = Some(serial.clone());
        }
        if let Some(url) = &cli.detector_url {
            self.detector.url = url.clone();
        }
        self
    }
}

pub fn build_control_settings(config: &AppConfig) -> ControlSettings {
    ControlSettings {
        lock: config.lock.clone(),
        delays: config.delays.clone(),
        aliases: config.apps.aliases.clone(),
        screenshot_dir: config
            .capture
            .screenshot_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir),
    }
}
