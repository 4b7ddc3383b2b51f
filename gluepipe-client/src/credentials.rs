//! AWS credentials

use std::fmt;

use crate::error::{ClientError, Result};

/// Static AWS credentials
///
/// Inside Lambda these come from the execution role through the standard
/// environment variables.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Reads credentials from environment variables
    ///
    /// Expected environment variables:
    /// - AWS_ACCESS_KEY_ID (required)
    /// - AWS_SECRET_ACCESS_KEY (required)
    /// - AWS_SESSION_TOKEN (optional)
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| {
            ClientError::MissingCredentials("AWS_ACCESS_KEY_ID is not set".to_string())
        })?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            ClientError::MissingCredentials("AWS_SECRET_ACCESS_KEY is not set".to_string())
        })?;
        let session_token = std::env::var("AWS_SESSION_TOKEN")
            .ok()
            .filter(|token| !token.is_empty());

        Ok(Self::new(access_key_id, secret_access_key, session_token))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
