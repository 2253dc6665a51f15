use std::path::Path;
use std::time::Duration;

use nctx_protocol::{Credentials, DatastoreTarget, Endpoint};
use nctx_txn::ValidationMode;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};
use crate::logging::LogConfig;

/// Settings for one [`DatastoreSession`](crate::DatastoreSession).
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes:
///
/// ```toml
/// endpoint = "loopback:lab"
/// commit_timeout_ms = 5000
/// validation = "strict"
///
/// [credentials]
/// method = "password"
/// username = "admin"
/// password = "admin"
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub endpoint: Endpoint,
    pub credentials: Credentials,
    /// Deadline for connects, reads, and other single round trips.
    pub read_timeout_ms: u64,
    /// Deadline for the whole commit exchange.
    pub commit_timeout_ms: u64,
    pub validation: ValidationMode,
    /// Datastore reads come from.
    pub target: DatastoreTarget,
    pub log: LogConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            credentials: Credentials::default(),
            read_timeout_ms: 10_000,
            commit_timeout_ms: 30_000,
            validation: ValidationMode::default(),
            target: DatastoreTarget::default(),
            log: LogConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_timeouts(mut self, read: Duration, commit: Duration) -> Self {
        self.read_timeout_ms = millis(read);
        self.commit_timeout_ms = millis(commit);
        self
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }

    pub fn from_toml_str(text: &str) -> SessionResult<Self> {
        toml::from_str(text).map_err(|e| SessionError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> SessionResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.endpoint.to_string(), "loopback:default");
        assert_eq!(config.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.commit_timeout(), Duration::from_secs(30));
        assert_eq!(config.validation, ValidationMode::Deferred);
        assert_eq!(config.target, DatastoreTarget::Running);
        assert!(!config.credentials.is_authenticated());
    }

    #[test]
    fn partial_toml() {
        let config = SessionConfig::from_toml_str(
            r#"
            endpoint = "loopback:lab"
            commit_timeout_ms = 5000
            validation = "strict"
            target = "candidate"

            [credentials]
            method = "password"
            username = "admin"
            password = "admin"

            [log]
            ansi = false
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoint, Endpoint::loopback("lab"));
        assert_eq!(config.commit_timeout(), Duration::from_secs(5));
        assert_eq!(config.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.validation, ValidationMode::Strict);
        assert_eq!(config.target, DatastoreTarget::Candidate);
        assert_eq!(config.credentials.username(), Some("admin"));
        assert!(!config.log.ansi);
        assert_eq!(config.log.filter, "nctx=info");
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(matches!(
            SessionConfig::from_toml_str("endpoint = \"no-colon\""),
            Err(SessionError::Config(_))
        ));
        assert!(matches!(
            SessionConfig::from_toml_str("validation = \"sometimes\""),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "read_timeout_ms = 250").unwrap();
        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.read_timeout(), Duration::from_millis(250));

        let missing = file.path().with_extension("missing");
        assert!(matches!(SessionConfig::load(&missing), Err(SessionError::Io(_))));
    }

    #[test]
    fn builders() {
        let config = SessionConfig::new(Endpoint::loopback("x"))
            .with_credentials(Credentials::password("u", "p"))
            .with_validation(ValidationMode::Strict)
            .with_timeouts(Duration::from_millis(5), Duration::from_millis(7));
        assert_eq!(config.read_timeout_ms, 5);
        assert_eq!(config.commit_timeout_ms, 7);
        assert!(config.credentials.is_authenticated());
    }
}
