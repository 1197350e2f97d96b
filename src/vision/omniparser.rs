use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, multipart};
use tracing::{debug, warn};

use crate::error::DetectorError;
use crate::vision::detector::{DetectorResponse, VisionDetector, parse_detector_payload};

// ============================================================================
// OmniParser HTTP backend
// ============================================================================

/// Client for an OmniParser-compatible `/parse` endpoint.
pub struct OmniParserClient {
    base_url: String,
    timeout: Duration,
    health_timeout: Duration,
    return_labeled: bool,
    client: Client,
}

impl OmniParserClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DetectorError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DetectorError::Unavailable {
                url: base_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url,
            timeout,
            health_timeout: Duration::from_secs(5),
            return_labeled: false,
            client,
        })
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Ask the service to include a base64 labeled image in its response.
    pub fn with_labeled_image(mut self, enabled: bool) -> Self {
        self.return_labeled = enabled;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, err: reqwest::Error) -> DetectorError {
        if err.is_timeout() {
            DetectorError::Timeout(self.timeout)
        } else {
            DetectorError::Unavailable {
                url: self.base_url.clone(),
                reason: err.to_string(),
            }
        }
    }
}

impl VisionDetector for OmniParserClient {
    fn parse(&self, image: &Path) -> Result<DetectorResponse, DetectorError> {
        let bytes = std::fs::read(image)?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.png".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/png")
            .map_err(|e| DetectorError::MalformedResponse(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let mut request = self.client.post(format!("{}/parse", self.base_url)).multipart(form);
        if self.return_labeled {
            request = request.query(&[("return_labeled_image", "true")]);
        }

        debug!(image = %image.display(), url = %self.base_url, "Submitting screenshot to detector");
        let response = request.send().map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(DetectorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_detector_payload(&body)
    }

    fn is_available(&self) -> bool {
        let probe = self
            .client
            .get(format!("{}/", self.base_url))
            .timeout(self.health_timeout)
            .send();

        match probe {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(status = resp.status().as_u16(), "Detector may not be running properly");
                false
            }
            Err(e) => {
                warn!("Cannot reach detector at {}: {}", self.base_url, e);
                false
            }
        }
    }
}
