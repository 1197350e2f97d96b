use tracing::{debug, info};

use crate::device::channel::{Connector, DeviceChannel};
use crate::error::DeviceError;

/// Owns the one device connection a process uses.
///
/// The channel is opened on first use and reused until `close()` (or drop).
/// There is no internal locking: callers that accept concurrent requests must
/// serialize access to the session themselves.
pub struct DeviceSession {
    connector: Box<dyn Connector>,
    channel: Option<Box<dyn DeviceChannel>>,
}

impl DeviceSession {
    pub fn new(connector: Box<dyn Connector>) -> Self {
        DeviceSession {
            connector,
            channel: None,
        }
    }

    /// Get the live channel, connecting if needed.
    pub fn channel(&mut self) -> Result<&mut dyn DeviceChannel, DeviceError> {
        if self.channel.is_none() {
            info!("Connecting to device");
            self.channel = Some(self.connector.connect()?);
        }

        let channel: &mut dyn DeviceChannel = match self.channel.as_mut() {
            Some(channel) => channel.as_mut(),
            None => return Err(DeviceError::Unavailable("session has no channel".into())),
        };
        Ok(channel)
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Drop the channel. The next `channel()` call reconnects.
    pub fn close(&mut self) {
        if self.channel.take().is_some() {
            debug!("Device session closed");
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close();
    }
}
