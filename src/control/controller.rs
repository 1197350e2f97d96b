use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::control::apps::{AppAlias, default_aliases, search_packages, user_packages};
use crate::control::request::{ActionRequest, AppFilter, SwipeDirection};
use crate::control::response::{
    ActionResponse, AppInfoData, AppListData, AppSearchData, ClickData, DeviceSummary,
    DoubleClickData, FindTextData, HealthData, HealthDevice, InputData, KeyData, LaunchData,
    LongClickData, StopData, SwipeData,
};
use crate::device::channel::{DeviceGeometry, KeyName, PackageScope, Point};
use crate::device::session::DeviceSession;
use crate::device::settle::{SettleDelays, settle};
use crate::error::ControlError;
use crate::screen::hit_test::locate_in;
use crate::screen::lock::{LockConfig, ScreenStateResolver};
use crate::screen::query::{find_by_text, screen_fingerprint};
use crate::screen::screen_model::ScreenCapture;
use crate::screen::snapshot::ScreenReader;
use crate::vision::detector::VisionDetector;

/// Everything the controller needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSettings {
    pub lock: LockConfig,
    pub delays: SettleDelays,
    pub aliases: Vec<AppAlias>,
    pub screenshot_dir: PathBuf,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            lock: LockConfig::default(),
            delays: SettleDelays::default(),
            aliases: default_aliases(),
            screenshot_dir: std::env::temp_dir(),
        }
    }
}

/// The action boundary: runs one action at a time against the session and
/// turns every outcome into an `ActionResponse`.
pub struct Controller {
    session: DeviceSession,
    detector: Box<dyn VisionDetector>,
    settings: ControlSettings,
}

impl Controller {
    pub fn new(
        session: DeviceSession,
        detector: Box<dyn VisionDetector>,
        settings: ControlSettings,
    ) -> Self {
        Self {
            session,
            detector,
            settings,
        }
    }

    pub fn settings(&self) -> &ControlSettings {
        &self.settings
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    /// Explicitly end the device session.
    pub fn close(&mut self) {
        self.session.close();
    }

    /// Run one request. Never panics on device or detector failure and never
    /// returns an error: failures come back as `success: false`.
    pub fn dispatch(&mut self, request: ActionRequest) -> ActionResponse {
        let name = request.name();
        info!(action = name, "Dispatching action");

        let response = match request {
            ActionRequest::ScreenInfo => ActionResponse::from_result(self.screen_info()),
            ActionRequest::Click { x, y } => {
                ActionResponse::from_result(require_point(x, y).and_then(|p| self.click(p)))
            }
            ActionRequest::Swipe {
                direction,
                start_x,
                start_y,
                end_x,
                end_y,
                duration,
            } => {
                let plan = SwipePlan::from_args(direction.as_deref(), start_x, start_y, end_x, end_y);
                ActionResponse::from_result(plan.and_then(|plan| self.swipe(plan, duration)))
            }
            ActionRequest::InputText {
                text,
                clear_before,
                slowly,
            } => ActionResponse::from_result(
                require(text, "text").and_then(|t| self.input_text(&t, clear_before, slowly)),
            ),
            ActionRequest::Back => ActionResponse::from_result(self.press(KeyName::Back)),
            ActionRequest::Home => ActionResponse::from_result(self.press(KeyName::Home)),
            ActionRequest::LongClick { x, y, duration } => ActionResponse::from_result(
                require_point(x, y).and_then(|p| self.long_click(p, duration)),
            ),
            ActionRequest::DoubleClick { x, y } => ActionResponse::from_result(
                require_point(x, y).and_then(|p| self.double_click(p)),
            ),
            ActionRequest::LaunchApp { package_name } => ActionResponse::from_result(
                require(package_name, "package_name").and_then(|p| self.launch_app(&p)),
            ),
            ActionRequest::ForceStopApp { package_name } => ActionResponse::from_result(
                require(package_name, "package_name").and_then(|p| self.force_stop_app(&p)),
            ),
            ActionRequest::ListApps { filter_type } => ActionResponse::from_result(
                filter_type.parse::<AppFilter>().and_then(|f| self.list_apps(f)),
            ),
            ActionRequest::SearchApp { keyword } => ActionResponse::from_result(
                require(keyword, "keyword").and_then(|k| self.search_app(&k)),
            ),
            ActionRequest::AppInfo => ActionResponse::from_result(self.app_info()),
            ActionRequest::Health => ActionResponse::from_result(self.health()),
            ActionRequest::FindText { text } => ActionResponse::from_result(
                require(text, "text").and_then(|t| self.find_text(&t)),
            ),
        };

        if let Some(err) = &response.error {
            warn!(action = name, "Action failed: {}", err);
        }
        response
    }

    // ------------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------------

    pub fn screen_info(&mut self) -> Result<ScreenCapture, ControlError> {
        let device = self.session.channel()?;
        let resolver = ScreenStateResolver::new(&self.settings.lock, &self.settings.delays);
        let reader = ScreenReader::new(resolver, self.detector.as_ref(), &self.settings.screenshot_dir);
        reader.capture(device)
    }

    fn geometry(&mut self) -> Result<DeviceGeometry, ControlError> {
        Ok(self.session.channel()?.geometry()?)
    }

    // ------------------------------------------------------------------------
    // Interactions
    // ------------------------------------------------------------------------

    pub fn click(&mut self, point: Point) -> Result<ClickData, ControlError> {
        let before = self.screen_info()?;
        let clicked_element = locate_in(&before.screen_info, point).cloned();
        match &clicked_element {
            Some(el) => info!(index = el.index(), kind = el.kind(), %point, "Click lands on element"),
            None => info!(%point, "Click lands on no detected element"),
        }

        self.session.channel()?.tap(point)?;
        settle("tap", self.settings.delays.tap_ms);

        let after = self.screen_info()?;
        let screen_changed = screen_fingerprint(&before.screen_info) != screen_fingerprint(&after.screen_info);

        Ok(ClickData {
            clicked_position: point,
            before_click: before,
            after_click: after,
            clicked_element,
            screen_changed,
        })
    }

    pub fn swipe(&mut self, plan: SwipePlan, duration_secs: f64) -> Result<SwipeData, ControlError> {
        let duration = seconds(duration_secs, "duration")?;
        let (from, to) = match plan {
            SwipePlan::Direction(direction) => direction_swipe(direction, &self.geometry()?),
            SwipePlan::Points { from, to } => (from, to),
        };

        self.session.channel()?.swipe(from, to, duration)?;
        settle("swipe", self.settings.delays.swipe_ms);

        Ok(SwipeData {
            from,
            to,
            after_swipe: self.screen_info()?,
        })
    }

    pub fn input_text(
        &mut self,
        text: &str,
        clear_before: bool,
        slowly: bool,
    ) -> Result<InputData, ControlError> {
        self.session.channel()?.text_input(text, clear_before, slowly)?;
        settle("text", self.settings.delays.text_ms);

        Ok(InputData {
            input_text: text.to_string(),
            input_mode: if slowly { "slowly" } else { "fast" },
            after_input: self.screen_info()?,
        })
    }

    pub fn press(&mut self, key: KeyName) -> Result<KeyData, ControlError> {
        self.session.channel()?.key_event(key)?;
        let wait = match key {
            KeyName::Home => self.settings.delays.home_ms,
            _ => self.settings.delays.back_ms,
        };
        settle(key.as_str(), wait);

        Ok(KeyData {
            action: key.as_str(),
            after_action: self.screen_info()?,
        })
    }

    pub fn long_click(&mut self, point: Point, duration_secs: f64) -> Result<LongClickData, ControlError> {
        let duration = seconds(duration_secs, "duration")?;
        self.session.channel()?.long_tap(point, duration)?;
        settle("long_click", self.settings.delays.long_click_ms);

        Ok(LongClickData {
            long_clicked_position: point,
            duration: duration_secs,
            after_long_click: self.screen_info()?,
        })
    }

    pub fn double_click(&mut self, point: Point) -> Result<DoubleClickData, ControlError> {
        self.session.channel()?.double_tap(point)?;
        settle("double_click", self.settings.delays.double_click_ms);

        Ok(DoubleClickData {
            double_clicked_position: point,
            after_double_click: self.screen_info()?,
        })
    }

    // ------------------------------------------------------------------------
    // Apps
    // ------------------------------------------------------------------------

    pub fn launch_app(&mut self, package: &str) -> Result<LaunchData, ControlError> {
        self.session.channel()?.launch_app(package)?;
        settle("launch", self.settings.delays.launch_ms);

        let after_launch = self.screen_info()?;
        let current_app = self.session.channel()?.foreground_app()?;
        Ok(LaunchData {
            launched_app: package.to_string(),
            current_app,
            after_launch,
        })
    }

    pub fn force_stop_app(&mut self, package: &str) -> Result<StopData, ControlError> {
        self.session.channel()?.stop_app(package)?;
        settle("stop", self.settings.delays.stop_ms);

        let after_stop = self.screen_info()?;
        let current_app = self.session.channel()?.foreground_app()?;
        Ok(StopData {
            stopped_app: package.to_string(),
            current_app,
            after_stop,
        })
    }

    pub fn list_apps(&mut self, filter: AppFilter) -> Result<AppListData, ControlError> {
        let device = self.session.channel()?;
        let apps = match filter {
            AppFilter::All => device.packages(PackageScope::Installed)?,
            AppFilter::Running => device.packages(PackageScope::Running)?,
            AppFilter::User => user_packages(device.packages(PackageScope::Installed)?),
        };

        Ok(AppListData {
            filter_type: filter.as_str(),
            total_count: apps.len(),
            apps,
        })
    }

    pub fn search_app(&mut self, keyword: &str) -> Result<AppSearchData, ControlError> {
        let installed = self.session.channel()?.packages(PackageScope::Installed)?;
        let matched_apps = search_packages(&installed, keyword, &self.settings.aliases);

        Ok(AppSearchData {
            keyword: keyword.to_string(),
            matched_count: matched_apps.len(),
            matched_apps,
        })
    }

    pub fn app_info(&mut self) -> Result<AppInfoData, ControlError> {
        let device = self.session.channel()?;
        let current_app = device.foreground_app()?;
        let props = device.properties()?;
        let geometry = device.geometry()?;

        Ok(AppInfoData {
            current_app,
            device_info: DeviceSummary {
                brand: props.brand,
                model: props.model,
                sdk: props.sdk,
                android_version: props.android_version,
                display_size: format!("{}x{}", geometry.width, geometry.height),
            },
        })
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    pub fn health(&mut self) -> Result<HealthData, ControlError> {
        let device = self.session.channel()?;
        let geometry = device.geometry()?;
        let props = device.properties()?;
        let detector_available = self.detector.is_available();

        Ok(HealthData {
            status: if detector_available { "healthy" } else { "degraded" },
            device_connected: true,
            detector_available,
            device_info: HealthDevice {
                width: geometry.width,
                height: geometry.height,
                sdk: props.sdk,
            },
        })
    }

    pub fn find_text(&mut self, text: &str) -> Result<FindTextData, ControlError> {
        let capture = self.screen_info()?;
        let matches: Vec<_> = find_by_text(&capture.screen_info, text)
            .into_iter()
            .cloned()
            .collect();

        Ok(FindTextData {
            text: text.to_string(),
            matched_count: matches.len(),
            matches,
            image_path: capture.image_path,
            parsed_image_path: capture.parsed_image_path,
        })
    }
}

// ============================================================================
// Argument validation
// ============================================================================

/// How a swipe was specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipePlan {
    Direction(SwipeDirection),
    Points { from: Point, to: Point },
}

impl SwipePlan {
    /// A direction wins over coordinates; without one, all four coordinates
    /// are required.
    pub fn from_args(
        direction: Option<&str>,
        start_x: Option<i32>,
        start_y: Option<i32>,
        end_x: Option<i32>,
        end_y: Option<i32>,
    ) -> Result<Self, ControlError> {
        if let Some(direction) = direction.filter(|d| !d.is_empty()) {
            return Ok(SwipePlan::Direction(direction.parse()?));
        }

        match (start_x, start_y, end_x, end_y) {
            (Some(sx), Some(sy), Some(ex), Some(ey)) => Ok(SwipePlan::Points {
                from: Point::new(sx, sy),
                to: Point::new(ex, ey),
            }),
            _ => Err(ControlError::invalid_input(
                "Either direction or all coordinates must be provided",
            )),
        }
    }
}

/// Directional swipes cover the middle 40% of the relevant axis.
pub fn direction_swipe(direction: SwipeDirection, geometry: &DeviceGeometry) -> (Point, Point) {
    let w = f64::from(geometry.width);
    let h = f64::from(geometry.height);
    let mid_x = (geometry.width / 2) as i32;
    let mid_y = (geometry.height / 2) as i32;
    let at = |extent: f64, frac: f64| (extent * frac) as i32;

    match direction {
        SwipeDirection::Up => (Point::new(mid_x, at(h, 0.7)), Point::new(mid_x, at(h, 0.3))),
        SwipeDirection::Down => (Point::new(mid_x, at(h, 0.3)), Point::new(mid_x, at(h, 0.7))),
        SwipeDirection::Left => (Point::new(at(w, 0.7), mid_y), Point::new(at(w, 0.3), mid_y)),
        SwipeDirection::Right => (Point::new(at(w, 0.3), mid_y), Point::new(at(w, 0.7), mid_y)),
    }
}

fn require_point(x: Option<i32>, y: Option<i32>) -> Result<Point, ControlError> {
    match (x, y) {
        (Some(x), Some(y)) => Ok(Point::new(x, y)),
        _ => Err(ControlError::invalid_input("Missing required parameters: x, y")),
    }
}

fn require(value: Option<String>, field: &str) -> Result<String, ControlError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ControlError::invalid_input(format!("Missing required parameter: {}", field))),
    }
}

fn seconds(secs: f64, field: &str) -> Result<Duration, ControlError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| ControlError::invalid_input(format!("Invalid {}: {}", field, secs)))
}
