//! Credential lifecycle around the account endpoints.
//!
//! [`crate::client::ApiClient`] only reads the credential. The [`Authenticator`] is the
//! piece that writes it: it stores the token handed out by login and refresh, and drops
//! it on logout or when the service answers 401.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{ApiClient, ApiError, SessionState};

mod token_store;

pub use token_store::TokenStore;

/// Drives login, refresh and logout and keeps [`SessionState`] in step with them.
#[derive(Debug, Clone)]
pub struct Authenticator {
    client: Arc<ApiClient>,
}

impl Authenticator {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn session(&self) -> &SessionState {
        self.client.session()
    }

    /// Log in and store the returned access token.
    pub async fn login(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Value, ApiError> {
        let payload = self
            .observe(self.client.login(username, email, password).await)?;
        self.store_token(&payload)?;
        info!(username, "logged in");
        Ok(payload)
    }

    /// Exchange the current session for a fresh access token.
    pub async fn refresh(&self) -> Result<Value, ApiError> {
        let payload = self.observe(self.client.refresh_access_token().await)?;
        self.store_token(&payload)?;
        debug!("access token refreshed");
        Ok(payload)
    }

    /// Log out. The local credential is dropped even if the service call fails.
    pub async fn logout(&self) -> Result<Value, ApiError> {
        let result = self.client.logout().await;
        self.session().clear();
        info!("logged out");
        result
    }

    pub async fn current_user(&self) -> Result<Value, ApiError> {
        self.observe(self.client.get_current_user().await)
    }

    /// Pass a result through, clearing the credential when the service rejected it.
    pub fn observe<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(err) = &result {
            self.handle_rejection(err);
        }
        result
    }

    /// Clear the credential if `err` is a 401. Returns whether it was cleared.
    pub fn handle_rejection(&self, err: &ApiError) -> bool {
        if !err.is_unauthorized() || !self.session().is_authenticated() {
            return false;
        }
        warn!("credential rejected by service; clearing session");
        self.session().clear();
        true
    }

    fn store_token(&self, payload: &Value) -> Result<(), ApiError> {
        let token = extract_access_token(payload).ok_or_else(|| {
            ApiError::decode("authentication response did not include an access token", None)
        })?;
        self.session().set_token(token);
        Ok(())
    }
}

/// Find the access token in an auth response.
///
/// The service wraps results in `{"data": ...}`; bare bodies are accepted too.
pub fn extract_access_token(payload: &Value) -> Option<String> {
    const POINTERS: [&str; 4] = ["/data/accessToken", "/accessToken", "/data/token", "/token"];
    POINTERS
        .iter()
        .filter_map(|pointer| payload.pointer(pointer))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|token| !token.is_empty())
        .map(str::to_string)
}
