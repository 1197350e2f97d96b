use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// Absolute pixel coordinate on the device screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Display size as the device currently presents it (rotation applied).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceGeometry {
    pub width: u32,
    pub height: u32,
    /// Quarter turns from natural orientation, 0..=3
    pub rotation: u8,
    pub power_on: bool,
}

/// Foreground application identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentApp {
    pub package: String,
    pub activity: String,
}

/// Static device descriptors, all best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceProperties {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub sdk: Option<u32>,
    pub android_version: Option<String>,
}

/// Restricts which UI nodes `element_texts` samples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFilter {
    /// e.g. `android.widget.TextView`; `None` samples every node
    pub class_name: Option<String>,
}

impl TextFilter {
    pub fn class(name: impl Into<String>) -> Self {
        TextFilter {
            class_name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageScope {
    Installed,
    Running,
}

/// Hardware/system keys the channel can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyName {
    Back,
    Home,
    Enter,
    Menu,
    Recent,
    Delete,
    Power,
    Wakeup,
    VolumeUp,
    VolumeDown,
}

impl KeyName {
    /// Android keycode constant name understood by `input keyevent`.
    pub fn keycode(self) -> &'static str {
        match self {
            KeyName::Back => "KEYCODE_BACK",
            KeyName::Home => "KEYCODE_HOME",
            KeyName::Enter => "KEYCODE_ENTER",
            KeyName::Menu => "KEYCODE_MENU",
            KeyName::Recent => "KEYCODE_APP_SWITCH",
            KeyName::Delete => "KEYCODE_DEL",
            KeyName::Power => "KEYCODE_POWER",
            KeyName::Wakeup => "KEYCODE_WAKEUP",
            KeyName::VolumeUp => "KEYCODE_VOLUME_UP",
            KeyName::VolumeDown => "KEYCODE_VOLUME_DOWN",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeyName::Back => "back",
            KeyName::Home => "home",
            KeyName::Enter => "enter",
            KeyName::Menu => "menu",
            KeyName::Recent => "recent",
            KeyName::Delete => "delete",
            KeyName::Power => "power",
            KeyName::Wakeup => "wakeup",
            KeyName::VolumeUp => "volume_up",
            KeyName::VolumeDown => "volume_down",
        }
    }
}

impl FromStr for KeyName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "back" => Ok(KeyName::Back),
            "home" => Ok(KeyName::Home),
            "enter" => Ok(KeyName::Enter),
            "menu" => Ok(KeyName::Menu),
            "recent" | "app_switch" => Ok(KeyName::Recent),
            "delete" | "del" => Ok(KeyName::Delete),
            "power" => Ok(KeyName::Power),
            "wakeup" => Ok(KeyName::Wakeup),
            "volume_up" => Ok(KeyName::VolumeUp),
            "volume_down" => Ok(KeyName::VolumeDown),
            other => Err(format!("Unknown key: {}", other)),
        }
    }
}

// ============================================================================
// DeviceChannel trait: the remote device-control primitives
// ============================================================================

/// Raw device-control primitives. Implementations are pass-throughs: they
/// carry no lock, registry or hit-test logic of their own.
pub trait DeviceChannel {
    fn geometry(&mut self) -> Result<DeviceGeometry, DeviceError>;

    fn foreground_app(&mut self) -> Result<CurrentApp, DeviceError>;

    /// Write the current frame as PNG to `path`.
    fn screenshot(&mut self, path: &Path) -> Result<(), DeviceError>;

    fn tap(&mut self, point: Point) -> Result<(), DeviceError>;

    fn long_tap(&mut self, point: Point, duration: Duration) -> Result<(), DeviceError>;

    fn double_tap(&mut self, point: Point) -> Result<(), DeviceError>;

    fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> Result<(), DeviceError>;

    fn text_input(
        &mut self,
        text: &str,
        clear_first: bool,
        char_by_char: bool,
    ) -> Result<(), DeviceError>;

    fn key_event(&mut self, key: KeyName) -> Result<(), DeviceError>;

    fn power_on(&mut self) -> Result<(), DeviceError>;

    /// Visible textual node contents, used by the lock heuristic.
    fn element_texts(&mut self, filter: &TextFilter) -> Result<Vec<String>, DeviceError>;

    fn launch_app(&mut self, package: &str) -> Result<(), DeviceError>;

    fn stop_app(&mut self, package: &str) -> Result<(), DeviceError>;

    fn packages(&mut self, scope: PackageScope) -> Result<Vec<String>, DeviceError>;

    fn properties(&mut self) -> Result<DeviceProperties, DeviceError>;
}

/// Opens a channel to a device. Called once per `DeviceSession`.
pub trait Connector {
    fn connect(&self) -> Result<Box<dyn DeviceChannel>, DeviceError>;
}
