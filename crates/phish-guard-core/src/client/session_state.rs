use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared holder for the bearer credential.
///
/// Clones share the same slot, so the handle given to [`super::ApiClient`] observes
/// whatever the auth flows store later. Reads and writes go through a lock and never
/// see a partially written token.
#[derive(Clone, Default)]
pub struct SessionState {
    token: Arc<RwLock<Option<String>>>,
}

impl SessionState {
    /// Empty session; requests are sent unauthenticated.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let state = Self::new();
        state.set_token(token);
        state
    }

    /// Current token, if any.
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store a token. Blank tokens clear the slot instead.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *slot = if token.trim().is_empty() {
            None
        } else {
            Some(token)
        };
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_credential() {
        let state = SessionState::new();
        let handle = state.clone();
        assert!(handle.token().is_none());

        state.set_token("tok123");
        assert_eq!(handle.token().as_deref(), Some("tok123"));

        handle.clear();
        assert!(!state.is_authenticated());
    }

    #[test]
    fn blank_token_clears_slot() {
        let state = SessionState::with_token("abc");
        state.set_token("   ");
        assert!(state.token().is_none());
    }

    #[test]
    fn debug_output_hides_token() {
        let state = SessionState::with_token("super-secret");
        let rendered = format!("{state:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("authenticated: true"));
    }
}
