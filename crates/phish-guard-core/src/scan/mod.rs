use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::client::ApiError;

pub mod history;
pub mod session;

pub use history::{HistoryEntry, ScanHistory, HISTORY_CAPACITY};
pub use session::ScanSession;

/// Scores above this are shown as `danger` regardless of status.
pub const DANGER_THRESHOLD: f64 = 0.7;
/// Scores above this (and not above [`DANGER_THRESHOLD`]) are shown as `caution`.
pub const CAUTION_THRESHOLD: f64 = 0.4;

/// Verdict label reported by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Safe,
    Suspicious,
}

impl ScanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Suspicious => "suspicious",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlacklistStatus {
    Clean,
    Listed,
}

/// Display tier used to color-code a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Safe,
    Caution,
    Danger,
}

impl RiskTier {
    /// Map a service verdict onto a display tier.
    ///
    /// `Suspicious` always yields `Danger`. Otherwise the score decides; both thresholds
    /// are exclusive, so exactly `0.7` is `Caution` and exactly `0.4` is `Safe`.
    pub fn classify(status: ScanStatus, risk_score: f64) -> Self {
        if status == ScanStatus::Suspicious || risk_score > DANGER_THRESHOLD {
            Self::Danger
        } else if risk_score > CAUTION_THRESHOLD {
            Self::Caution
        } else {
            Self::Safe
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Caution => "caution",
            Self::Danger => "danger",
        }
    }
}

/// Domain facts the service gathered about the URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanDetails {
    #[serde(alias = "domain_age", alias = "domainAgeDays")]
    pub domain_age_days: u64,
    #[serde(alias = "ssl_certificate", alias = "sslValid")]
    pub ssl_valid: bool,
    #[serde(alias = "reputationScore")]
    pub reputation_score: f64,
    #[serde(alias = "blacklistStatus")]
    pub blacklist_status: BlacklistStatus,
}

/// Result of one scan as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanVerdict {
    pub url: String,
    pub status: ScanStatus,
    pub risk_score: f64,
    pub details: ScanDetails,
}

impl ScanVerdict {
    pub fn tier(&self) -> RiskTier {
        RiskTier::classify(self.status, self.risk_score)
    }

    /// Decode a scan payload, unwrapping the `{"data": ...}` envelope when present.
    ///
    /// `submitted_url` fills in the URL when the service omits it. Scores must lie in
    /// `[0, 1]`; anything else is reported as a decode failure.
    pub fn from_payload(payload: Value, submitted_url: &str) -> Result<Self, ApiError> {
        let body = match payload {
            Value::Object(mut map) if matches!(map.get("data"), Some(Value::Object(_))) => {
                map.remove("data").unwrap_or_default()
            }
            other => other,
        };
        let wire: WireVerdict = serde_json::from_value(body)
            .map_err(|err| ApiError::decode(format!("unexpected scan payload: {err}"), None))?;
        for (field, value) in [
            ("risk_score", wire.risk_score),
            ("reputation_score", wire.details.reputation_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ApiError::decode(
                    format!("{field} must be within 0.0..=1.0 (got {value})"),
                    None,
                ));
            }
        }
        Ok(Self {
            url: wire
                .url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| submitted_url.to_string()),
            status: wire.status,
            risk_score: wire.risk_score,
            details: wire.details,
        })
    }
}

#[derive(Deserialize)]
struct WireVerdict {
    #[serde(default)]
    url: Option<String>,
    status: ScanStatus,
    #[serde(alias = "riskScore")]
    risk_score: f64,
    details: ScanDetails,
}

/// URL accepted for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    pub url: String,
}

impl ScanRequest {
    /// Trim and validate user input; blank or relative URLs are rejected.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        Url::parse(trimmed).map_err(|err| ValidationError::InvalidUrl {
            url: trimmed.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            url: trimmed.to_string(),
        })
    }
}

/// Input rejected before any request was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("url must not be blank")]
    EmptyUrl,
    #[error("`{url}` is not a valid absolute URL: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Failure of [`ScanSession::submit_scan`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Remote endpoint that analyzes a URL and returns the raw verdict payload.
#[async_trait]
pub trait ScanApi: Send + Sync {
    async fn submit_scan(&self, url: &str) -> Result<Value, ApiError>;
}
