use crate::error::{GatewayError, Result};
use secrecy::{ExposeSecret, Secret};
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Secret string wrapper that prevents accidental exposure
pub type SecretString = Secret<String>;

/// Opaque credentials handle.
///
/// The gateway only ever forwards the bearer token; how it was minted
/// (service account, user OAuth, metadata server) is the caller's concern.
#[derive(Clone)]
pub struct Credentials {
    token: Arc<SecretString>,
}

impl Credentials {
    /// Wrap an already issued access token
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(Secret::new(token.into())),
        }
    }

    /// Read the access token from an environment variable
    pub fn from_env(var: &str) -> Result<Self> {
        let token = env::var(var).map_err(|_| {
            GatewayError::Config(format!("Access token variable '{}' is not set", var))
        })?;
        debug!(var = var, "Loaded access token from environment");
        Self::checked(token, var)
    }

    /// Read the access token from a file, trimming surrounding whitespace
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let token = fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!(
                "Failed to read access token file {}: {}",
                path.display(),
                e
            ))
        })?;
        debug!(path = %path.display(), "Loaded access token from file");
        Self::checked(token, &path.display().to_string())
    }

    fn checked(token: String, source: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(GatewayError::Config(format!(
                "Access token from '{}' is empty",
                source
            )));
        }
        Ok(Self::bearer(token))
    }

    /// Token to place in the `Authorization` header
    pub(crate) fn bearer_token(&self) -> &str {
        self.token.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"[REDACTED]")
            .finish()
    }
}
