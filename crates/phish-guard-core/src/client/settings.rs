use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Connection settings for [`super::ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    /// Scheme and authority of the service; the API base path is appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Transport timeout. Unset means the transport default (no timeout).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Bearer token to start the session with.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
            token: None,
        }
    }
}

impl ClientSettings {
    const BASE_URL_ENV: &'static str = "PHISH_GUARD_BASE_URL";
    const TIMEOUT_ENV: &'static str = "PHISH_GUARD_TIMEOUT_SECS";
    const TOKEN_ENV: &'static str = "PHISH_GUARD_TOKEN";

    /// Load settings from environment variables.
    ///
    /// * `PHISH_GUARD_BASE_URL`     — service origin (default: `http://localhost:8000`).
    /// * `PHISH_GUARD_TIMEOUT_SECS` — optional transport timeout in seconds.
    /// * `PHISH_GUARD_TOKEN`        — optional bearer token for the initial session.
    pub fn from_env() -> Result<Self> {
        Self::from_map(std::env::vars().collect())
    }

    fn from_map(vars: HashMap<String, String>) -> Result<Self> {
        let non_blank = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let base_url = non_blank(Self::BASE_URL_ENV).unwrap_or_else(default_base_url);
        let timeout_secs = match non_blank(Self::TIMEOUT_ENV) {
            Some(raw) => Some(raw.parse::<u64>().with_context(|| {
                format!("{} must be a whole number of seconds (got `{raw}`)", Self::TIMEOUT_ENV)
            })?),
            None => None,
        };
        let settings = Self {
            base_url,
            timeout_secs,
            token: non_blank(Self::TOKEN_ENV),
        }
        .normalize();
        settings.validate()?;
        Ok(settings)
    }

    /// Trim values and treat blank ones as unset, so a blank base URL falls back
    /// to [`DEFAULT_BASE_URL`] whichever source supplied it.
    pub fn normalize(self) -> Self {
        let base_url = match self.base_url.trim() {
            "" => default_base_url(),
            trimmed => trimmed.to_string(),
        };
        let token = self
            .token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        Self {
            base_url,
            timeout_secs: self.timeout_secs,
            token,
        }
    }

    /// Check that the base URL is an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let parsed = Url::parse(&self.base_url)
            .with_context(|| format!("invalid base URL `{}`", self.base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "base URL `{}` must use http or https (got `{}`)",
                self.base_url,
                parsed.scheme()
            );
        }
        Ok(())
    }
}
