mod error;
mod session_state;
mod settings;

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::scan::ScanApi;

pub use error::{ApiError, ErrorCause, GENERIC_FAILURE_MESSAGE};
pub use session_state::SessionState;
pub use settings::{ClientSettings, DEFAULT_BASE_URL};

/// Fixed prefix every endpoint path is appended to.
pub const API_BASE_PATH: &str = "/api/v1";

/// HTTP verbs used by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One outbound call: endpoint path, verb and optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    path: String,
    method: Method,
    body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(self, body: Value) -> Self {
        Self {
            body: Some(body),
            ..self
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// Fields accepted by the registration endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Authenticated JSON client for the inspection service.
///
/// Every request goes through [`ApiClient::send`], which attaches the bearer credential
/// held in [`SessionState`] and maps failures into [`ApiError`]. The client never changes
/// the credential itself; see [`crate::auth::Authenticator`] for that.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: SessionState,
}

impl ApiClient {
    pub fn new(settings: &ClientSettings, session: SessionState) -> anyhow::Result<Self> {
        settings.validate()?;
        let mut builder = Client::builder().user_agent(concat!(
            "phish-guard/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("failed to build HTTP client")?;
        if let Some(token) = &settings.token {
            session.set_token(token.clone());
        }
        Ok(Self {
            http,
            base_url: format!("{}{}", settings.base_url.trim_end_matches('/'), API_BASE_PATH),
            session,
        })
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Absolute URL for an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the decoded JSON payload untouched.
    #[instrument(
        name = "api_send",
        skip(self, descriptor),
        fields(method = ?descriptor.method(), path = %descriptor.path())
    )]
    pub async fn send(&self, descriptor: RequestDescriptor) -> Result<Value, ApiError> {
        let mut request = self
            .http
            .request(descriptor.method.into(), self.endpoint(&descriptor.path))
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.session.token() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = &descriptor.body {
            request = request.body(body.to_string());
        }

        let response = request.send().await.map_err(|err| {
            warn!(error = %err, "request failed before a response arrived");
            ApiError::network(format!("network error: {err}"))
        })?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|err| {
            warn!(error = %err, %status, "failed to read response body");
            ApiError::network(format!("network error while reading response: {err}"))
        })?;
        debug!(%status, body_len = bytes.len(), "response received");

        let payload: Value = serde_json::from_slice(&bytes).map_err(|err| {
            warn!(error = %err, %status, "response body is not valid JSON");
            ApiError::decode(
                format!("invalid JSON in response: {err}"),
                Some(status.as_u16()),
            )
        })?;

        if !status.is_success() {
            let err = ApiError::from_status(status.as_u16(), &payload);
            warn!(%status, message = %err.message, "request rejected");
            return Err(err);
        }
        Ok(payload)
    }

    pub async fn register(&self, registration: &Registration) -> Result<Value, ApiError> {
        self.send(RequestDescriptor::post("/users/register").with_body(json!(registration)))
            .await
    }

    pub async fn login(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Value, ApiError> {
        self.send(RequestDescriptor::post("/users/login").with_body(json!({
            "username": username,
            "email": email,
            "password": password,
        })))
        .await
    }

    pub async fn logout(&self) -> Result<Value, ApiError> {
        self.send(RequestDescriptor::post("/users/logout")).await
    }

    pub async fn get_current_user(&self) -> Result<Value, ApiError> {
        self.send(RequestDescriptor::post("/users/current-user"))
            .await
    }

    pub async fn verify_email(&self, token: &str) -> Result<Value, ApiError> {
        self.send(RequestDescriptor::get(format!(
            "/users/verify-email/{}",
            encode_segment(token)
        )))
        .await
    }

    pub async fn resend_email_verification(&self) -> Result<Value, ApiError> {
        self.send(RequestDescriptor::post("/users/resend-email-verification"))
            .await
    }

    pub async fn refresh_access_token(&self) -> Result<Value, ApiError> {
        self.send(RequestDescriptor::post("/users/refresh-access-token"))
            .await
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<Value, ApiError> {
        self.send(
            RequestDescriptor::post("/users/change-password").with_body(json!({
                "oldPassword": old_password,
                "newPassword": new_password,
            })),
        )
        .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<Value, ApiError> {
        self.send(
            RequestDescriptor::post("/users/forgot-password").with_body(json!({ "email": email })),
        )
        .await
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<Value, ApiError> {
        self.send(
            RequestDescriptor::post(format!("/users/reset-password/{}", encode_segment(token)))
                .with_body(json!({ "newPassword": new_password })),
        )
        .await
    }

    pub async fn submit_scan(&self, url: &str) -> Result<Value, ApiError> {
        self.send(RequestDescriptor::post("/scan").with_body(json!({ "url": url })))
            .await
    }
}

#[async_trait]
impl ScanApi for ApiClient {
    async fn submit_scan(&self, url: &str) -> Result<Value, ApiError> {
        ApiClient::submit_scan(self, url).await
    }
}

/// Characters escaped in a path segment: the WHATWG path-segment set plus `+`.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'+')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Escape a value so it stays a single path segment.
fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}
