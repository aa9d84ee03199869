//! Process-wide configuration.
//!
//! Loaded from a TOML file exactly once at startup, validated, and shared
//! read-only for the remainder of the process lifetime. Nothing in here
//! mutates at runtime — every stage and handler sees the same values.
//!
//! A missing file is not an error (defaults apply); a file that exists but
//! does not parse is fatal, and the process must exit before the listener
//! binds.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;
use crate::logging::Severity;

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bind address for the listener (e.g. `"0.0.0.0:3000"`).
    pub listen: String,

    /// Environment name. `"Development"` (case-insensitive) surfaces full
    /// diagnostic detail for handler faults; any other value returns a
    /// generic failure body and enables HSTS.
    pub environment: String,

    /// Redirect insecure requests to their `https` equivalent. Disable when
    /// TLS terminates at an external proxy and the service only ever sees
    /// plain HTTP.
    pub tls_redirect: bool,

    /// Directory served by the static-asset stage. `None` disables the stage.
    pub static_root: Option<PathBuf>,

    pub forwarded: ForwardedConfig,
    pub auth: AuthPolicy,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_owned(),
            environment: "Production".to_owned(),
            tls_redirect: true,
            static_root: None,
            forwarded: ForwardedConfig::default(),
            auth: AuthPolicy::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Forwarded-header trust policy.
///
/// The shipped default is [`TrustPolicy::All`]: every `x-forwarded-*` header
/// is believed and rewrites the request's apparent origin. That is a
/// deployment-time trust decision — it is only safe when the service sits
/// behind a proxy you control, because any client can send these headers.
/// Set `trust = "none"` when the service is exposed directly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForwardedConfig {
    pub trust: TrustPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustPolicy {
    #[default]
    All,
    None,
}

/// Authorization gate policy.
///
/// The gate's position in the pipeline is fixed; the policy behind it is
/// deliberately small. `allow_all` admits everything. `api_key` requires a
/// configured header to carry a configured value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthPolicy {
    #[default]
    AllowAll,
    ApiKey { header: String, key: String },
}

/// CORS settings. The original deployment allowed any origin; here the
/// allowed origin is explicit and attached to pipeline responses when set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub allowed_origin: Option<String>,
}

/// Logging sink settings, read once at startup by [`logging::init`].
///
/// [`logging::init`]: crate::logging::init
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Records below this severity are dropped by the backend.
    pub min_level: Severity,
    pub sink: LogSink,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { min_level: Severity::Information, sink: LogSink::Stdout }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSink {
    Stdout,
    Stderr,
}

impl Config {
    /// Loads configuration from `path`.
    ///
    /// A file that does not exist yields the defaults. A file that exists
    /// but cannot be read or parsed is a fatal configuration error.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::Config(format!("{}: {e}", path.display()))),
        };

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        self.listen
            .parse::<SocketAddr>()
            .map_err(|_| Error::Config(format!("invalid listen address `{}`", self.listen)))?;
        Ok(())
    }

    /// True when the environment name is `Development`, in any casing.
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_trust_all_forwarded_headers() {
        let config = Config::default();
        assert_eq!(config.forwarded.trust, TrustPolicy::All);
        assert!(matches!(config.auth, AuthPolicy::AllowAll));
        assert!(config.tls_redirect);
        assert!(!config.is_development());
    }

    #[test]
    fn parses_full_document() {
        let config: Config = toml::from_str(
            r#"
            listen = "127.0.0.1:8080"
            environment = "Development"
            tls_redirect = false
            static_root = "wwwroot"

            [forwarded]
            trust = "none"

            [auth]
            mode = "api_key"
            header = "x-api-key"
            key = "s3cret"

            [cors]
            allowed_origin = "https://example.com"

            [logging]
            min_level = "warning"
            sink = "stderr"
            "#,
        )
        .unwrap();

        assert!(config.is_development());
        assert_eq!(config.forwarded.trust, TrustPolicy::None);
        assert!(matches!(config.auth, AuthPolicy::ApiKey { .. }));
        assert_eq!(config.logging.min_level, Severity::Warning);
        assert_eq!(config.logging.sink, LogSink::Stderr);
    }

    #[test]
    fn rejects_unknown_severity() {
        let err = toml::from_str::<Config>("[logging]\nmin_level = \"verbose\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Path::new("/nonexistent/weathervane.toml")).unwrap();
        assert_eq!(config.listen, "0.0.0.0:3000");
    }

    #[test]
    fn malformed_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weathervane.toml");
        std::fs::write(&path, "listen = 42").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn invalid_listen_address_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weathervane.toml");
        std::fs::write(&path, "listen = \"not-an-addr\"").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }
}
