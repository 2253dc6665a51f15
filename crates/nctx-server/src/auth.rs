use std::collections::HashMap;

use async_trait::async_trait;
use nctx_protocol::Credentials;

use crate::error::{ServerError, ServerResult};

/// Who a session belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self { name: "anonymous".into() }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
}

/// Accepts any credentials and trusts the claimed user name.
pub struct AllowAllAuth;

#[async_trait]
impl AuthProvider for AllowAllAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        Ok(credentials
            .username()
            .map(Identity::user)
            .unwrap_or_else(Identity::anonymous))
    }
}

/// Fixed user/password table. Key-based logins are refused.
#[derive(Default)]
pub struct PasswordAuth {
    users: HashMap<String, String>,
}

impl PasswordAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }
}

#[async_trait]
impl AuthProvider for PasswordAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Password { username, password } => match self.users.get(username) {
                Some(expected) if expected == password => Ok(Identity::user(username.clone())),
                _ => Err(ServerError::AuthFailed(format!("bad password for '{username}'"))),
            },
            other => Err(ServerError::AuthFailed(format!(
                "{} login is not accepted",
                other.display_name()
            ))),
        }
    }
}
