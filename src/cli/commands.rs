use std::time::Duration;

use tracing::debug;

use crate::cli::config::{AppConfig, Commands, build_control_settings};
use crate::control::controller::Controller;
use crate::control::request::ActionRequest;
use crate::control::response::ActionResponse;
use crate::device::adb::AdbConnector;
use crate::device::session::DeviceSession;
use crate::error::ControlError;
use crate::vision::omniparser::OmniParserClient;

// ============================================================================
// Subcommand -> action request
// ============================================================================

/// Translate a subcommand into the action payload it stands for.
pub fn to_request(command: &Commands) -> Result<ActionRequest, ControlError> {
    let request = match command {
        Commands::Screen => ActionRequest::ScreenInfo,
        Commands::Click { x, y } => ActionRequest::Click {
            x: Some(*x),
            y: Some(*y),
        },
        Commands::Swipe {
            direction,
            start_x,
            start_y,
            end_x,
            end_y,
            duration,
        } => ActionRequest::Swipe {
            direction: direction.clone(),
            start_x: *start_x,
            start_y: *start_y,
            end_x: *end_x,
            end_y: *end_y,
            duration: *duration,
        },
        Commands::Type {
            text,
            clear,
            slowly,
        } => ActionRequest::InputText {
            text: Some(text.clone()),
            clear_before: *clear,
            slowly: *slowly,
        },
        Commands::Back => ActionRequest::Back,
        Commands::Home => ActionRequest::Home,
        Commands::LongClick { x, y, duration } => ActionRequest::LongClick {
            x: Some(*x),
            y: Some(*y),
            duration: *duration,
        },
        Commands::DoubleClick { x, y } => ActionRequest::DoubleClick {
            x: Some(*x),
            y: Some(*y),
        },
        Commands::Launch { package } => ActionRequest::LaunchApp {
            package_name: Some(package.clone()),
        },
        Commands::Stop { package } => ActionRequest::ForceStopApp {
            package_name: Some(package.clone()),
        },
        Commands::ListApps { filter } => ActionRequest::ListApps {
            filter_type: filter.clone(),
        },
        Commands::SearchApp { keyword } => ActionRequest::SearchApp {
            keyword: Some(keyword.clone()),
        },
        Commands::AppInfo => ActionRequest::AppInfo,
        Commands::Find { text } => ActionRequest::FindText {
            text: Some(text.clone()),
        },
        Commands::Health => ActionRequest::Health,
        Commands::Invoke { json } => ActionRequest::from_json(json)?,
    };
    Ok(request)
}

// ============================================================================
// Wiring
// ============================================================================

/// Build a controller backed by adb and the OmniParser HTTP detector.
pub fn build_controller(config: &AppConfig) -> Result<Controller, ControlError> {
    let connector = AdbConnector::new(&config.device.adb_path, config.device.serial.as_deref())
        .with_char_delay(config.delays.text_char_ms);

    let detector = OmniParserClient::new(
        &config.detector.url,
        Duration::from_secs(config.detector.timeout_secs),
    )?
    .with_health_timeout(Duration::from_secs(config.detector.health_timeout_secs))
    .with_labeled_image(config.detector.return_labeled_image);

    debug!(
        adb = %config.device.adb_path,
        detector = %config.detector.url,
        "Controller configured"
    );

    Ok(Controller::new(
        DeviceSession::new(Box::new(connector)),
        Box::new(detector),
        build_control_settings(config),
    ))
}

/// Run one subcommand and return the response envelope. Wiring failures are
/// folded into the envelope too, so the caller always has something to print.
pub fn run_command(command: &Commands, config: &AppConfig) -> ActionResponse {
    let request = match to_request(command) {
        Ok(request) => request,
        Err(e) => return ActionResponse::failure(e.to_string()),
    };

    let mut controller = match build_controller(config) {
        Ok(controller) => controller,
        Err(e) => return ActionResponse::failure(e.to_string()),
    };

    let response = controller.dispatch(request);
    controller.close();
    response
}

/// Pretty JSON for stdout.
pub fn render_response(response: &ActionResponse) -> String {
    serde_json::to_string_pretty(response).unwrap_or_else(|e| {
        format!(
            "{{\"success\": false, \"error\": \"Failed to render response: {}\"}}",
            e
        )
    })
}
