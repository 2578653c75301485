//! Capture session parameters and state.
//!
//! The capture mechanism lives in the host; the controller only tracks
//! whether a session is active and with which parameters.

use crate::error::{CheddarError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Screenshot quality requested from the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl ImageQuality {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated parameters of an active capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureParams {
    pub interval: Duration,
    pub image_quality: ImageQuality,
}

impl CaptureParams {
    /// Parse the wire form: interval as a string of milliseconds, quality as
    /// `low|medium|high`.
    pub fn parse(interval: &str, image_quality: &str) -> Result<Self> {
        let millis: u64 = interval.trim().parse().map_err(|_| {
            CheddarError::Config(format!(
                "capture interval must be a whole number of milliseconds, got {interval:?}"
            ))
        })?;
        if millis == 0 {
            return Err(CheddarError::Config(
                "capture interval must be greater than zero".to_owned(),
            ));
        }
        let image_quality = ImageQuality::parse(image_quality).ok_or_else(|| {
            CheddarError::Config(format!(
                "image quality must be low, medium or high, got {image_quality:?}"
            ))
        })?;
        Ok(Self {
            interval: Duration::from_millis(millis),
            image_quality,
        })
    }
}

/// Capture session state. Only one session is ever active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureState {
    #[default]
    Inactive,
    Active(CaptureParams),
}

impl CaptureState {
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}
