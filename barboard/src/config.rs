//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `BARBOARD_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `BARBOARD_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `BARBOARD_UPSTREAM__URL=http://backend:8080/api` sets the `upstream.url` field.
//!
//! ## Configuration Structure
//!
//! - **Server**: `host`, `port` - HTTP server binding configuration
//! - **Upstream**: `upstream.url`, `upstream.request_timeout` - The service every call is relayed to
//! - **Product board**: `product_board.organization_id`, `product_board.refresh_interval`
//! - **Security**: `cors` - Browser origins allowed to call the service
//! - **Telemetry**: `enable_otel_export` - Ship traces to an OTLP collector
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! BARBOARD_PORT=8080
//! BARBOARD_UPSTREAM__REQUEST_TIMEOUT=10s
//! BARBOARD_PRODUCT_BOARD__ORGANIZATION_ID=2
//! ```

use std::time::Duration;

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::Error;
use crate::types::OrganizationId;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "BARBOARD_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    pub upstream: UpstreamConfig,
    pub product_board: ProductBoardConfig,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
    /// Export traces over OTLP in addition to logging them
    pub enable_otel_export: bool,
}

/// Where relayed and aggregated calls go.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API; resource paths are appended to it
    pub url: Url,
    /// Per-call timeout. Unset means calls wait as long as the upstream takes
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductBoardConfig {
    /// Organization shown when a request does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
    /// How often the live board is re-fetched
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://bar.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            upstream: UpstreamConfig::default(),
            product_board: ProductBoardConfig::default(),
            cors: CorsConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:8080/api").expect("default upstream url is valid"),
            request_timeout: None,
        }
    }
}

impl Default for ProductBoardConfig {
    fn default() -> Self {
        Self {
            organization_id: None,
            refresh_interval: Duration::from_secs(15),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Url(
                Url::parse("http://localhost:3001").expect("default cors origin is valid"),
            )],
            allow_credentials: true,
            max_age: Some(3600),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if !matches!(self.upstream.url.scheme(), "http" | "https") {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: upstream.url must be an http(s) URL, got '{}'",
                    self.upstream.url
                ),
            });
        }

        if self.upstream.url.cannot_be_a_base() {
            return Err(Error::Internal {
                operation: format!("Config validation: upstream.url '{}' cannot carry a path", self.upstream.url),
            });
        }

        if self.upstream.request_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(Error::Internal {
                operation: "Config validation: upstream.request_timeout must be positive when set".to_string(),
            });
        }

        if self.product_board.refresh_interval.is_zero() {
            return Err(Error::Internal {
                operation: "Config validation: product_board.refresh_interval must be positive (default: 15s)".to_string(),
            });
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        let has_wildcard = self
            .cors
            .allowed_origins
            .iter()
            .any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.cors.allow_credentials {
            return Err(Error::Internal {
                operation: "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
                    .to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("BARBOARD_").ignore(&["config"]).split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.product_board.refresh_interval, Duration::from_secs(15));
        assert!(config.upstream.request_timeout.is_none());
    }

    #[test]
    fn test_yaml_config() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 4000
upstream:
  url: https://backend.bar.ee/api
  request_timeout: 5s
product_board:
  organization_id: 2
  refresh_interval: 30s
cors:
  allowed_origins:
    - https://bar.ee
  allow_credentials: true
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.port, 4000);
            assert_eq!(config.upstream.url.as_str(), "https://backend.bar.ee/api");
            assert_eq!(config.upstream.request_timeout, Some(Duration::from_secs(5)));
            assert_eq!(config.product_board.organization_id, Some(2));
            assert_eq!(config.product_board.refresh_interval, Duration::from_secs(30));
            assert!(matches!(config.cors.allowed_origins[0], CorsOrigin::Url(_)));

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
upstream:
  url: http://localhost:8080/api
"#,
            )?;

            jail.set_env("BARBOARD_HOST", "127.0.0.1");
            jail.set_env("BARBOARD_PORT", "8080");
            jail.set_env("BARBOARD_UPSTREAM__URL", "http://backend:9000/api");
            jail.set_env("BARBOARD_PRODUCT_BOARD__REFRESH_INTERVAL", "1m");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.bind_address(), "127.0.0.1:8080");
            assert_eq!(config.upstream.url.as_str(), "http://backend:9000/api");
            assert_eq!(config.product_board.refresh_interval, Duration::from_secs(60));

            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "upstream:\n  uri: http://localhost:8080/api\n")?;
            assert!(Config::load(&args("test.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_zero_refresh_interval() {
        let mut config = Config::default();
        config.product_board.refresh_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_non_http_upstream() {
        let mut config = Config::default();
        config.upstream.url = Url::parse("ftp://backend/api").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_wildcard_with_credentials() {
        let mut config = Config::default();
        config.cors.allowed_origins = vec![CorsOrigin::Wildcard];
        config.cors.allow_credentials = true;
        assert!(config.validate().is_err());

        config.cors.allow_credentials = false;
        assert!(config.validate().is_ok());
    }
}
