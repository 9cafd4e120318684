//! Worker identity (the credential passed through every remote call).

use std::fmt;

/// Credential used to authenticate against the external task API.
///
/// An identity without a token performs unauthenticated calls.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Identity {
    token: Option<String>,
}

impl Identity {
    /// Create an identity carrying a bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Create an identity that sends no credentials.
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    /// The bearer token, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Value for the `Authorization` header, if a token is present.
    pub fn bearer_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }
}

// Keep tokens out of logs.
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
