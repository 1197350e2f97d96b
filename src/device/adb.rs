use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::device::channel::{
    Connector, CurrentApp, DeviceChannel, DeviceGeometry, DeviceProperties, KeyName, PackageScope,
    Point, TextFilter,
};
use crate::error::DeviceError;

/// Backspaces sent when a text field must be cleared before typing.
const CLEAR_BACKSPACES: usize = 64;

/// Remote file `uiautomator dump` writes the view hierarchy to.
const UI_DUMP_PATH: &str = "/sdcard/window_dump.xml";

/// Window titles owned by System UI that carry no component name.
const SYSTEM_UI_WINDOWS: [&str; 4] = ["NotificationShade", "StatusBar", "Keyguard", "Bouncer"];

// ============================================================================
// Connector
// ============================================================================

/// Connects to a device through the `adb` binary.
#[derive(Debug, Clone)]
pub struct AdbConnector {
    pub adb_path: String,
    pub serial: Option<String>,
    pub char_delay_ms: u64,
}

impl Default for AdbConnector {
    fn default() -> Self {
        Self {
            adb_path: "adb".to_string(),
            serial: None,
            char_delay_ms: 30,
        }
    }
}

impl AdbConnector {
    pub fn new(adb_path: &str, serial: Option<&str>) -> Self {
        Self {
            adb_path: adb_path.to_string(),
            serial: serial.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn with_char_delay(mut self, ms: u64) -> Self {
        self.char_delay_ms = ms;
        self
    }
}

impl Connector for AdbConnector {
    fn connect(&self) -> Result<Box<dyn DeviceChannel>, DeviceError> {
        let device = AdbDevice {
            adb_path: self.adb_path.clone(),
            serial: self.serial.clone(),
            char_delay_ms: self.char_delay_ms,
        };

        let state = device.run(&["get-state"]).map_err(|e| match e {
            DeviceError::CommandFailed { stderr, .. } => DeviceError::Unavailable(stderr),
            other => other,
        })?;

        if state.trim() != "device" {
            return Err(DeviceError::Unavailable(format!(
                "adb reports device state '{}'",
                state.trim()
            )));
        }

        debug!(serial = ?self.serial, "adb device ready");
        Ok(Box::new(device))
    }
}

// ============================================================================
// Channel
// ============================================================================

/// A device reached through `adb` subprocess calls, one process per primitive.
#[derive(Debug, Clone)]
pub struct AdbDevice {
    adb_path: String,
    serial: Option<String>,
    char_delay_ms: u64,
}

impl AdbDevice {
    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.args(args);
        cmd
    }

    fn run_raw(&self, args: &[&str]) -> Result<Vec<u8>, DeviceError> {
        debug!(?args, "adb");
        let output = self
            .command(args)
            .output()
            .map_err(|e| DeviceError::Spawn {
                program: self.adb_path.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                command: format!("adb {}", args.join(" ")),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    fn run(&self, args: &[&str]) -> Result<String, DeviceError> {
        let stdout = self.run_raw(args)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn shell(&self, args: &[&str]) -> Result<String, DeviceError> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("shell");
        full.extend_from_slice(args);
        self.run(&full)
    }

    fn getprop(&self, name: &str) -> Result<Option<String>, DeviceError> {
        let value = self.shell(&["getprop", name])?;
        let value = value.trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    fn type_ascii(&self, text: &str) -> Result<(), DeviceError> {
        let escaped = escape_input_text(text);
        self.shell(&["input", "text", &escaped])?;
        Ok(())
    }

    /// `input text` cannot carry non-ASCII; those go through the ADBKeyBoard
    /// broadcast, which needs that IME installed and selected.
    fn type_broadcast(&self, text: &str) -> Result<(), DeviceError> {
        let quoted = format!("'{}'", text.replace('\'', r"'\''"));
        self.shell(&["am", "broadcast", "-a", "ADB_INPUT_TEXT", "--es", "msg", &quoted])?;
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<(), DeviceError> {
        if text.is_ascii() {
            self.type_ascii(text)
        } else {
            self.type_broadcast(text)
        }
    }
}

impl DeviceChannel for AdbDevice {
    fn geometry(&mut self) -> Result<DeviceGeometry, DeviceError> {
        let size_out = self.shell(&["wm", "size"])?;
        let (natural_w, natural_h) =
            parse_wm_size(&size_out).ok_or_else(|| DeviceError::UnexpectedOutput {
                command: "wm size".into(),
                detail: size_out.trim().to_string(),
            })?;

        let rotation = match parse_surface_orientation(&self.shell(&["dumpsys", "input"])?) {
            Some(r) => r,
            None => {
                debug!("SurfaceOrientation not reported, assuming 0");
                0
            }
        };

        let power_on = match parse_wakefulness(&self.shell(&["dumpsys", "power"])?) {
            Some(on) => on,
            None => {
                warn!("Could not read power state, assuming screen is on");
                true
            }
        };

        let (width, height) = if rotation % 2 == 1 {
            (natural_h, natural_w)
        } else {
            (natural_w, natural_h)
        };

        Ok(DeviceGeometry {
            width,
            height,
            rotation,
            power_on,
        })
    }

    fn foreground_app(&mut self) -> Result<CurrentApp, DeviceError> {
        let out = self.shell(&["dumpsys", "window"])?;
        parse_focused_app(&out).ok_or_else(|| DeviceError::UnexpectedOutput {
            command: "dumpsys window".into(),
            detail: "no focused window or app".into(),
        })
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), DeviceError> {
        let png = self.run_raw(&["exec-out", "screencap", "-p"])?;
        if png.is_empty() {
            return Err(DeviceError::UnexpectedOutput {
                command: "exec-out screencap -p".into(),
                detail: "empty image".into(),
            });
        }
        fs::write(path, png)?;
        Ok(())
    }

    fn tap(&mut self, point: Point) -> Result<(), DeviceError> {
        let (x, y) = (point.x.to_string(), point.y.to_string());
        self.shell(&["input", "tap", &x, &y])?;
        Ok(())
    }

    fn long_tap(&mut self, point: Point, duration: Duration) -> Result<(), DeviceError> {
        let (x, y) = (point.x.to_string(), point.y.to_string());
        let ms = duration.as_millis().to_string();
        self.shell(&["input", "swipe", &x, &y, &x, &y, &ms])?;
        Ok(())
    }

    fn double_tap(&mut self, point: Point) -> Result<(), DeviceError> {
        let (x, y) = (point.x.to_string(), point.y.to_string());
        // Both taps in one remote shell so the gap stays inside the double-tap window
        self.shell(&["input", "tap", &x, &y, "&&", "input", "tap", &x, &y])?;
        Ok(())
    }

    fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> Result<(), DeviceError> {
        let args = [
            from.x.to_string(),
            from.y.to_string(),
            to.x.to_string(),
            to.y.to_string(),
            duration.as_millis().to_string(),
        ];
        let mut full = vec!["input", "swipe"];
        full.extend(args.iter().map(String::as_str));
        self.shell(&full)?;
        Ok(())
    }

    fn text_input(
        &mut self,
        text: &str,
        clear_first: bool,
        char_by_char: bool,
    ) -> Result<(), DeviceError> {
        if clear_first {
            let mut keys = vec!["input", "keyevent", "KEYCODE_MOVE_END"];
            self.shell(&keys)?;
            keys.truncate(2);
            keys.extend(std::iter::repeat_n(KeyName::Delete.keycode(), CLEAR_BACKSPACES));
            self.shell(&keys)?;
        }

        if char_by_char {
            let mut buf = [0u8; 4];
            for ch in text.chars() {
                self.type_text(ch.encode_utf8(&mut buf))?;
                thread::sleep(Duration::from_millis(self.char_delay_ms));
            }
            Ok(())
        } else {
            self.type_text(text)
        }
    }

    fn key_event(&mut self, key: KeyName) -> Result<(), DeviceError> {
        self.shell(&["input", "keyevent", key.keycode()])?;
        Ok(())
    }

    fn power_on(&mut self) -> Result<(), DeviceError> {
        self.key_event(KeyName::Wakeup)
    }

    fn element_texts(&mut self, filter: &TextFilter) -> Result<Vec<String>, DeviceError> {
        self.shell(&["uiautomator", "dump", UI_DUMP_PATH])?;
        let xml = self.shell(&["cat", UI_DUMP_PATH])?;
        Ok(parse_ui_dump_texts(&xml, filter))
    }

    fn launch_app(&mut self, package: &str) -> Result<(), DeviceError> {
        let out = self.shell(&[
            "monkey",
            "-p",
            package,
            "-c",
            "android.intent.category.LAUNCHER",
            "1",
        ])?;
        if out.contains("monkey aborted") || out.contains("No activities found") {
            return Err(DeviceError::UnexpectedOutput {
                command: format!("monkey -p {}", package),
                detail: out.trim().to_string(),
            });
        }
        Ok(())
    }

    fn stop_app(&mut self, package: &str) -> Result<(), DeviceError> {
        self.shell(&["am", "force-stop", package])?;
        Ok(())
    }

    fn packages(&mut self, scope: PackageScope) -> Result<Vec<String>, DeviceError> {
        let installed = parse_package_list(&self.shell(&["pm", "list", "packages"])?);

        match scope {
            PackageScope::Installed => Ok(installed),
            PackageScope::Running => {
                let ps = self.shell(&["ps", "-A", "-o", "NAME"])?;
                let running: HashSet<&str> = ps
                    .lines()
                    .map(|l| l.trim().split(':').next().unwrap_or(""))
                    .filter(|n| !n.is_empty())
                    .collect();
                Ok(installed
                    .into_iter()
                    .filter(|p| running.contains(p.as_str()))
                    .collect())
            }
        }
    }

    fn properties(&mut self) -> Result<DeviceProperties, DeviceError> {
        Ok(DeviceProperties {
            brand: self.getprop("ro.product.brand")?,
            model: self.getprop("ro.product.model")?,
            sdk: self
                .getprop("ro.build.version.sdk")?
                .and_then(|s| s.parse().ok()),
            android_version: self.getprop("ro.build.version.release")?,
        })
    }
}

// ============================================================================
// Output parsers
// ============================================================================

/// Parse `wm size`. An override size wins over the physical size.
pub fn parse_wm_size(out: &str) -> Option<(u32, u32)> {
    let mut physical = None;
    let mut overridden = None;

    for line in out.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let Some((w, h)) = value.trim().split_once('x') else {
            continue;
        };
        let (Ok(w), Ok(h)) = (w.trim().parse::<u32>(), h.trim().parse::<u32>()) else {
            continue;
        };

        if label.contains("Override") {
            overridden = Some((w, h));
        } else if label.contains("Physical") {
            physical = Some((w, h));
        }
    }

    overridden.or(physical)
}

pub fn parse_surface_orientation(out: &str) -> Option<u8> {
    out.lines().find_map(|line| {
        let (_, value) = line.trim().split_once("SurfaceOrientation:")?;
        value.trim().parse::<u8>().ok().map(|r| r % 4)
    })
}

/// `mWakefulness=Awake` means the display is on; Asleep/Dozing mean off.
pub fn parse_wakefulness(out: &str) -> Option<bool> {
    for line in out.lines() {
        let line = line.trim();
        if let Some(state) = line.strip_prefix("mWakefulness=") {
            return Some(state.trim() == "Awake");
        }
        if let Some(state) = line.strip_prefix("Display Power: state=") {
            return Some(state.trim() == "ON");
        }
    }
    None
}

/// Extract the focused package/activity from `dumpsys window`.
///
/// Prefers `mCurrentFocus`; System UI windows without a component (lock
/// screen, notification shade) are reported as `com.android.systemui`.
/// Falls back to `mFocusedApp`.
pub fn parse_focused_app(out: &str) -> Option<CurrentApp> {
    let focus_line = out
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("mCurrentFocus=") && !l.ends_with("=null"));

    if let Some(line) = focus_line {
        if let Some(app) = component_in(line) {
            return Some(app);
        }
        if let Some(window) = SYSTEM_UI_WINDOWS.iter().find(|w| line.contains(*w)) {
            return Some(CurrentApp {
                package: "com.android.systemui".to_string(),
                activity: window.to_string(),
            });
        }
    }

    out.lines()
        .map(str::trim)
        .filter(|l| l.starts_with("mFocusedApp="))
        .find_map(component_in)
}

fn component_in(line: &str) -> Option<CurrentApp> {
    let token = line
        .split_whitespace()
        .find(|t| t.contains('/') && !t.starts_with("mCurrentFocus") && !t.starts_with("mFocusedApp"))?;
    let token = token.trim_end_matches('}');
    let (package, activity) = token.split_once('/')?;
    if package.is_empty() || activity.is_empty() {
        return None;
    }

    let activity = if activity.starts_with('.') {
        format!("{}{}", package, activity)
    } else {
        activity.to_string()
    };

    Some(CurrentApp {
        package: package.to_string(),
        activity,
    })
}

/// Collect non-empty `text` attributes from a `uiautomator dump` hierarchy.
pub fn parse_ui_dump_texts(xml: &str, filter: &TextFilter) -> Vec<String> {
    xml.split("<node ")
        .skip(1)
        .filter_map(|node| {
            // Only this node's own attributes, not its children
            let attrs = node.split('>').next().unwrap_or("");
            if let Some(wanted) = &filter.class_name {
                if xml_attribute(attrs, "class").as_deref() != Some(wanted.as_str()) {
                    return None;
                }
            }
            xml_attribute(attrs, "text").filter(|t| !t.is_empty())
        })
        .collect()
}

fn xml_attribute(attrs: &str, name: &str) -> Option<String> {
    let needle = format!(" {}=\"", name);
    let padded = format!(" {}", attrs);
    let start = padded.find(&needle)? + needle.len();
    let len = padded[start..].find('"')?;
    Some(unescape_xml(&padded[start..start + len]))
}

fn unescape_xml(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&#10;", "\n")
        .replace("&amp;", "&")
}

/// Parse `pm list packages` (`package:<name>` per line), sorted.
pub fn parse_package_list(out: &str) -> Vec<String> {
    let mut packages: Vec<String> = out
        .lines()
        .filter_map(|l| l.trim().strip_prefix("package:"))
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    packages.sort();
    packages.dedup();
    packages
}

/// Escape text for `input text`, which runs through the remote shell and
/// treats `%s` as a space.
pub fn escape_input_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        match ch {
            ' ' => escaped.push_str("%s"),
            c if c.is_ascii_alphanumeric() || "-_.,:/@+=".contains(c) => escaped.push(c),
            c => {
                escaped.push('\\');
                escaped.push(c);
            }
        }
    }
    escaped
}
