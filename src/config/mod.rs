use crate::credentials::Credentials;
use crate::error::{GatewayError, Result};
use crate::gateway::Surface;
use crate::rate_limit::RateLimitConfig;
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Prefix of environment overrides, e.g. `GAPI_GATEWAY__RETRY__MAX_RETRIES=3`
pub const ENV_PREFIX: &str = "GAPI_GATEWAY";

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    /// Drive v3 budget
    #[serde(default = "default_drive_limits")]
    pub drive: RateLimitConfig,
    /// Sheets v4 budget
    #[serde(default = "default_sheets_limits")]
    pub sheets: RateLimitConfig,
    /// Slides v1 budget
    #[serde(default = "default_slides_limits")]
    pub slides: RateLimitConfig,
    /// Retry tuning shared by every surface
    #[serde(default)]
    pub retry: RetryConfig,
    /// API base URLs
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Where the access token comes from
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Base URLs of the Google REST APIs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointsConfig {
    #[serde(default = "default_drive_endpoint")]
    pub drive: String,
    #[serde(default = "default_sheets_endpoint")]
    pub sheets: String,
    #[serde(default = "default_slides_endpoint")]
    pub slides: String,
}

/// Access token source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialsConfig {
    /// Environment variable holding the token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// File holding the token; takes precedence over `token_env`
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

// Quotas of a standard Google Cloud project, per minute
fn default_drive_limits() -> RateLimitConfig {
    RateLimitConfig::single(12000.0)
}

fn default_sheets_limits() -> RateLimitConfig {
    RateLimitConfig::dual(60.0, 60.0)
}

fn default_slides_limits() -> RateLimitConfig {
    RateLimitConfig::dual(600.0, 60.0)
}

fn default_timeout() -> u64 {
    30
}

fn default_drive_endpoint() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_sheets_endpoint() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

fn default_slides_endpoint() -> String {
    "https://slides.googleapis.com/v1".to_string()
}

fn default_token_env() -> String {
    "GOOGLE_ACCESS_TOKEN".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            drive: default_drive_limits(),
            sheets: default_sheets_limits(),
            slides: default_slides_limits(),
            retry: RetryConfig::default(),
            endpoints: EndpointsConfig::default(),
            timeout_secs: default_timeout(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            drive: default_drive_endpoint(),
            sheets: default_sheets_endpoint(),
            slides: default_slides_endpoint(),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            token_file: None,
        }
    }
}

impl EndpointsConfig {
    pub fn for_surface(&self, surface: Surface) -> &str {
        match surface {
            Surface::Drive => &self.drive,
            Surface::Sheets => &self.sheets,
            Surface::Slides => &self.slides,
        }
    }
}

impl CredentialsConfig {
    /// Resolve the configured token source
    pub fn load(&self) -> Result<Credentials> {
        match &self.token_file {
            Some(path) => Credentials::from_file(path),
            None => Credentials::from_env(&self.token_env),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load an optional YAML file, then apply `GAPI_GATEWAY__*` overrides.
    ///
    /// Nested keys are separated by a double underscore:
    /// `GAPI_GATEWAY__SHEETS__WRITE_RATE=30`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_layered(path, ENV_PREFIX)
    }

    fn load_layered(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Budget of one surface
    pub fn limits(&self, surface: Surface) -> &RateLimitConfig {
        match surface {
            Surface::Drive => &self.drive,
            Surface::Sheets => &self.sheets,
            Surface::Slides => &self.slides,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for surface in Surface::ALL {
            self.limits(surface).validate().map_err(|e| match e {
                GatewayError::Config(msg) => GatewayError::Config(format!("{}: {}", surface, msg)),
                other => other,
            })?;

            let endpoint = self.endpoints.for_surface(surface);
            let url = Url::parse(endpoint).map_err(|e| {
                GatewayError::Config(format!(
                    "Invalid {} endpoint '{}': {}",
                    surface, endpoint, e
                ))
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(GatewayError::Config(format!(
                    "{} endpoint must start with http:// or https://",
                    surface
                )));
            }
        }

        self.retry.validate()?;

        if self.timeout_secs == 0 {
            return Err(GatewayError::Config(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::{Algorithm, ChannelMode};
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_values() {
        let config = GatewayConfig::from_yaml("{}").unwrap();

        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.drive.mode(), ChannelMode::Single);
        assert_eq!(config.drive.read_rate, 12000.0);
        assert_eq!(config.sheets.write_rate, Some(60.0));
        assert_eq!(config.slides.read_rate, 600.0);
        assert_eq!(config.slides.algorithm, Algorithm::LeakyBucket);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.credentials.token_env, "GOOGLE_ACCESS_TOKEN");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
sheets:
  algorithm: token_bucket
  read_rate: 300
  write_rate: 60
  write_capacity: 10

slides:
  read_rate: 600

retry:
  max_retries: 3
  base_delay_ms: 1000

endpoints:
  drive: "http://127.0.0.1:9000/drive/v3"

credentials:
  token_file: "/run/secrets/google-token"
"#;

        let config = GatewayConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.sheets.algorithm, Algorithm::TokenBucket);
        assert_eq!(config.sheets.read_rate, 300.0);
        assert_eq!(config.sheets.write_burst(), Some(10.0));
        assert_eq!(config.slides.mode(), ChannelMode::Single);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.max_delay_ms, 60000);
        assert_eq!(config.endpoints.drive, "http://127.0.0.1:9000/drive/v3");
        assert_eq!(config.endpoints.sheets, "https://sheets.googleapis.com/v4");
        assert_eq!(
            config.credentials.token_file,
            Some(PathBuf::from("/run/secrets/google-token"))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_rate() {
        let mut config = GatewayConfig::default();
        config.sheets.write_rate = Some(0.0);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sheets"), "{}", err);
    }

    #[test]
    fn test_validate_invalid_endpoint() {
        let mut config = GatewayConfig::default();
        config.endpoints.slides = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.endpoints.slides = "invalid-url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_retry() {
        let mut config = GatewayConfig::default();
        config.retry.jitter_fraction = 1.5;
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "drive:\n  read_rate: 100").unwrap();

        let config = GatewayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.drive.read_rate, 100.0);

        assert!(GatewayConfig::from_file("/nonexistent/gateway.yaml").is_err());
    }

    #[test]
    fn test_load_layers_environment_over_file() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "retry:\n  max_retries: 2\n  base_delay_ms: 250").unwrap();

        std::env::set_var("GAPI_GATEWAY_TEST__RETRY__MAX_RETRIES", "7");
        std::env::set_var("GAPI_GATEWAY_TEST__TIMEOUT_SECS", "5");
        let config =
            GatewayConfig::load_layered(Some(file.path()), "GAPI_GATEWAY_TEST").unwrap();
        std::env::remove_var("GAPI_GATEWAY_TEST__RETRY__MAX_RETRIES");
        std::env::remove_var("GAPI_GATEWAY_TEST__TIMEOUT_SECS");

        assert_eq!(config.retry.max_retries, 7);
        assert_eq!(config.retry.base_delay_ms, 250);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.sheets, default_sheets_limits());
    }

    #[test]
    fn test_credentials_from_file_take_precedence() {
        let mut file = Builder::new().tempfile().unwrap();
        writeln!(file, "ya29.file-token").unwrap();

        let config = CredentialsConfig {
            token_env: "GAPI_GATEWAY_TEST_UNSET_TOKEN".to_string(),
            token_file: Some(file.path().to_path_buf()),
        };
        assert!(config.load().is_ok());

        let config = CredentialsConfig {
            token_file: None,
            ..config
        };
        assert!(config.load().is_err());
    }
}
