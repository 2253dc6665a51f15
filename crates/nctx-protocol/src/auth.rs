use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How a session authenticates to the backend.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum Credentials {
    #[default]
    Anonymous,
    Password { username: String, password: String },
    SshKey { username: String, key_path: PathBuf },
}

impl Credentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Password { username, .. } | Self::SshKey { username, .. } => Some(username),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Password { .. } => "password",
            Self::SshKey { .. } => "ssh-key",
        }
    }
}

// Passwords stay out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::SshKey { username, key_path } => f
                .debug_struct("SshKey")
                .field("username", username)
                .field("key_path", key_path)
                .finish(),
        }
    }
}
