use std::fmt;

use serde::{Deserialize, Serialize};

/// Credentials as presented by a client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub on_behalf_of: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            on_behalf_of: None,
        }
    }

    pub fn on_behalf_of(mut self, user: impl Into<String>) -> Self {
        self.on_behalf_of = Some(user.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("on_behalf_of", &self.on_behalf_of)
            .finish()
    }
}

/// An authenticated identity, optionally acting for another user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
    pub on_behalf_of: Option<String>,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            on_behalf_of: None,
        }
    }

    /// Every identity whose permissions a write must satisfy.
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.username.as_str()).chain(self.on_behalf_of.as_deref())
    }

    pub fn is_mediated(&self) -> bool {
        self.on_behalf_of.is_some()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.on_behalf_of {
            Some(obo) => write!(f, "{} (on behalf of {})", self.username, obo),
            None => f.write_str(&self.username),
        }
    }
}
