use std::process::ExitStatus;

use thiserror::Error;

/// Failures talking to the device-control channel.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No usable session (device offline, unauthorized, not attached)
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    /// The adb binary could not be started
    #[error("Failed to spawn {program} (is it installed and on PATH?): {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A device command exited with non-zero status
    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    /// A device query returned output we could not interpret
    #[error("Unexpected output from `{command}`: {detail}")]
    UnexpectedOutput { command: String, detail: String },

    #[error("Device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the vision detection service.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Detector unavailable at {url}: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("Detector timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Detector API error: {status} - {body}")]
    Status { status: u16, body: String },

    /// The payload could not be parsed at all
    #[error("Malformed detector response: {0}")]
    MalformedResponse(String),

    #[error("Detector I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that can fail an action at the control boundary.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Detector(#[from] DetectorError),

    /// Caller-supplied arguments were rejected before touching the device
    #[error("{0}")]
    InvalidInput(String),
}

impl ControlError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        ControlError::InvalidInput(message.into())
    }
}
