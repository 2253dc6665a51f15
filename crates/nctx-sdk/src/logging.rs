//! Log output for applications embedding the SDK.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directives used when `RUST_LOG` is unset.
    pub filter: String,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "nctx=info".into(),
            ansi: true,
        }
    }
}

/// Install a formatting subscriber for the process.
///
/// `RUST_LOG` wins over `config.filter`. Returns `false` when a global
/// subscriber was already installed, in which case nothing changes.
pub fn init(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let config = LogConfig {
            ansi: false,
            ..Default::default()
        };
        init(&config);
        assert!(!init(&config));
    }

    #[test]
    fn default_filter() {
        assert_eq!(LogConfig::default().filter, "nctx=info");
    }
}
