use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use android_screen_control::device::channel::{
    Connector, CurrentApp, DeviceChannel, DeviceGeometry, DeviceProperties, KeyName,
    PackageScope, Point, TextFilter,
};
use android_screen_control::error::{DetectorError, DeviceError};
use android_screen_control::vision::detector::{
    DetectorResponse, VisionDetector, parse_detector_payload,
};

// ============================================================================
// Scripted device
// ============================================================================

/// Every primitive the fake device saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Geometry,
    ForegroundApp,
    Screenshot,
    Tap(Point),
    LongTap(Point, Duration),
    DoubleTap(Point),
    Swipe(Point, Point, Duration),
    Text {
        text: String,
        clear_first: bool,
        char_by_char: bool,
    },
    Key(KeyName),
    PowerOn,
    ElementTexts(TextFilter),
    Launch(String),
    Stop(String),
    Packages(PackageScope),
    Properties,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

/// What the fake device answers.
#[derive(Debug, Clone)]
pub struct DeviceScript {
    pub geometry: DeviceGeometry,
    pub current_app: CurrentApp,
    /// Answers to successive `element_texts` calls; `None` simulates a failed
    /// query. Exhausted samples read as an empty screen.
    pub text_samples: VecDeque<Option<Vec<String>>>,
    pub fail_swipe: bool,
    pub fail_tap: bool,
    /// Foreground app once a swipe has gone through (the keyguard dismissed)
    pub app_after_swipe: Option<CurrentApp>,
    pub installed: Vec<String>,
    pub running: Vec<String>,
    pub properties: DeviceProperties,
}

impl Default for DeviceScript {
    fn default() -> Self {
        Self {
            geometry: phone_geometry(),
            current_app: app("com.example.notes", "com.example.notes.MainActivity"),
            text_samples: VecDeque::new(),
            fail_swipe: false,
            fail_tap: false,
            app_after_swipe: None,
            installed: vec![],
            running: vec![],
            properties: DeviceProperties {
                brand: Some("Xiaomi".into()),
                model: Some("M2102K1C".into()),
                sdk: Some(33),
                android_version: Some("13".into()),
            },
        }
    }
}

impl DeviceScript {
    pub fn with_texts(mut self, samples: Vec<Option<Vec<&str>>>) -> Self {
        self.text_samples = samples
            .into_iter()
            .map(|s| s.map(|texts| texts.into_iter().map(String::from).collect()))
            .collect();
        self
    }

    pub fn with_app(mut self, package: &str) -> Self {
        self.current_app = app(package, "");
        self
    }

    pub fn unlocks_to(mut self, package: &str) -> Self {
        self.app_after_swipe = Some(app(package, ""));
        self
    }

    pub fn screen_off(mut self) -> Self {
        self.geometry.power_on = false;
        self
    }
}

pub struct FakeDevice {
    script: DeviceScript,
    log: CallLog,
}

impl FakeDevice {
    pub fn new(script: DeviceScript) -> (Self, CallLog) {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                script,
                log: log.clone(),
            },
            log,
        )
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

fn scripted_failure(what: &str) -> DeviceError {
    DeviceError::UnexpectedOutput {
        command: what.to_string(),
        detail: "scripted failure".to_string(),
    }
}

impl DeviceChannel for FakeDevice {
    fn geometry(&mut self) -> Result<DeviceGeometry, DeviceError> {
        self.record(Call::Geometry);
        Ok(self.script.geometry)
    }

    fn foreground_app(&mut self) -> Result<CurrentApp, DeviceError> {
        self.record(Call::ForegroundApp);
        Ok(self.script.current_app.clone())
    }

    fn screenshot(&mut self, _path: &Path) -> Result<(), DeviceError> {
        self.record(Call::Screenshot);
        Ok(())
    }

    fn tap(&mut self, point: Point) -> Result<(), DeviceError> {
        self.record(Call::Tap(point));
        if self.script.fail_tap {
            return Err(scripted_failure("input tap"));
        }
        Ok(())
    }

    fn long_tap(&mut self, point: Point, duration: Duration) -> Result<(), DeviceError> {
        self.record(Call::LongTap(point, duration));
        Ok(())
    }

    fn double_tap(&mut self, point: Point) -> Result<(), DeviceError> {
        self.record(Call::DoubleTap(point));
        Ok(())
    }

    fn swipe(&mut self, from: Point, to: Point, duration: Duration) -> Result<(), DeviceError> {
        self.record(Call::Swipe(from, to, duration));
        if self.script.fail_swipe {
            return Err(scripted_failure("input swipe"));
        }
        if let Some(next) = self.script.app_after_swipe.take() {
            self.script.current_app = next;
        }
        Ok(())
    }

    fn text_input(
        &mut self,
        text: &str,
        clear_first: bool,
        char_by_char: bool,
    ) -> Result<(), DeviceError> {
        self.record(Call::Text {
            text: text.to_string(),
            clear_first,
            char_by_char,
        });
        Ok(())
    }

    fn key_event(&mut self, key: KeyName) -> Result<(), DeviceError> {
        self.record(Call::Key(key));
        Ok(())
    }

    fn power_on(&mut self) -> Result<(), DeviceError> {
        self.record(Call::PowerOn);
        self.script.geometry.power_on = true;
        Ok(())
    }

    fn element_texts(&mut self, filter: &TextFilter) -> Result<Vec<String>, DeviceError> {
        self.record(Call::ElementTexts(filter.clone()));
        match self.script.text_samples.pop_front() {
            Some(Some(texts)) => Ok(texts),
            Some(None) => Err(scripted_failure("uiautomator dump")),
            None => Ok(vec![]),
        }
    }

    fn launch_app(&mut self, package: &str) -> Result<(), DeviceError> {
        self.record(Call::Launch(package.to_string()));
        self.script.current_app = app(package, "");
        Ok(())
    }

    fn stop_app(&mut self, package: &str) -> Result<(), DeviceError> {
        self.record(Call::Stop(package.to_string()));
        if self.script.current_app.package == package {
            self.script.current_app = app("com.miui.home", "");
        }
        Ok(())
    }

    fn packages(&mut self, scope: PackageScope) -> Result<Vec<String>, DeviceError> {
        self.record(Call::Packages(scope));
        Ok(match scope {
            PackageScope::Installed => self.script.installed.clone(),
            PackageScope::Running => self.script.running.clone(),
        })
    }

    fn properties(&mut self) -> Result<DeviceProperties, DeviceError> {
        self.record(Call::Properties);
        Ok(self.script.properties.clone())
    }
}

/// Hands out `FakeDevice`s that share one call log.
pub struct FakeConnector {
    script: DeviceScript,
    log: CallLog,
    pub connects: Rc<Cell<usize>>,
    pub offline: bool,
}

impl FakeConnector {
    pub fn new(script: DeviceScript) -> (Self, CallLog) {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                script,
                log: log.clone(),
                connects: Rc::new(Cell::new(0)),
                offline: false,
            },
            log,
        )
    }

    pub fn offline() -> Self {
        let (mut connector, _) = Self::new(DeviceScript::default());
        connector.offline = true;
        connector
    }
}

impl Connector for FakeConnector {
    fn connect(&self) -> Result<Box<dyn DeviceChannel>, DeviceError> {
        self.connects.set(self.connects.get() + 1);
        if self.offline {
            return Err(DeviceError::Unavailable("no devices/emulators found".into()));
        }
        Ok(Box::new(FakeDevice {
            script: self.script.clone(),
            log: self.log.clone(),
        }))
    }
}

// ============================================================================
// Scripted detector
// ============================================================================

/// Replays canned detector bodies. The last body repeats once the queue runs
/// dry; `None` bodies fail the call.
pub struct FakeDetector {
    bodies: RefCell<VecDeque<Option<String>>>,
    last: RefCell<Option<String>>,
    pub available: bool,
    pub calls: Cell<usize>,
}

impl FakeDetector {
    pub fn fixed(body: &str) -> Self {
        Self::sequence(vec![Some(body)])
    }

    pub fn sequence(bodies: Vec<Option<&str>>) -> Self {
        Self {
            bodies: RefCell::new(bodies.into_iter().map(|b| b.map(String::from)).collect()),
            last: RefCell::new(None),
            available: true,
            calls: Cell::new(0),
        }
    }

    pub fn failing() -> Self {
        let mut detector = Self::sequence(vec![None]);
        detector.available = false;
        detector
    }
}

impl VisionDetector for FakeDetector {
    fn parse(&self, _image: &Path) -> Result<DetectorResponse, DetectorError> {
        self.calls.set(self.calls.get() + 1);
        let next = self.bodies.borrow_mut().pop_front();
        let body = match next {
            Some(body) => {
                *self.last.borrow_mut() = body.clone();
                body
            }
            None => self.last.borrow().clone(),
        };

        match body {
            Some(body) => parse_detector_payload(&body),
            None => Err(DetectorError::Unavailable {
                url: "http://fake-detector".into(),
                reason: "connection refused".into(),
            }),
        }
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn phone_geometry() -> DeviceGeometry {
    DeviceGeometry {
        width: 1080,
        height: 2340,
        rotation: 0,
        power_on: true,
    }
}

pub fn app(package: &str, activity: &str) -> CurrentApp {
    CurrentApp {
        package: package.to_string(),
        activity: activity.to_string(),
    }
}

pub fn count(log: &CallLog, pred: impl Fn(&Call) -> bool) -> usize {
    log.borrow().iter().filter(|c| pred(c)).count()
}

pub fn swipes(log: &CallLog) -> Vec<(Point, Point)> {
    log.borrow()
        .iter()
        .filter_map(|c| match c {
            Call::Swipe(from, to, _) => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

/// Calls that change device state (queries excluded).
pub fn mutations(log: &CallLog) -> Vec<Call> {
    log.borrow()
        .iter()
        .filter(|c| {
            matches!(
                c,
                Call::Tap(_)
                    | Call::LongTap(..)
                    | Call::DoubleTap(_)
                    | Call::Swipe(..)
                    | Call::Text { .. }
                    | Call::Key(_)
                    | Call::Launch(_)
                    | Call::Stop(_)
            )
        })
        .cloned()
        .collect()
}
