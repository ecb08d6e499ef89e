use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::SwordError;
use crate::model::{Credentials, Principal};

/// Turns presented credentials into a [`Principal`].
#[async_trait]
pub trait Authenticator: Send + Sync + Debug {
    /// Fails with [`SwordError::Authentication`] for bad credentials and
    /// [`SwordError::MediationNotAllowed`] when an on-behalf-of user is
    /// given but mediation is switched off.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, SwordError>;
}

/// Lowercase hex SHA-256 of a password, the form users are stored in.
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// User table held in memory, keyed by username.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuthenticator {
    users: HashMap<String, String>,
    allow_mediation: bool,
}

impl MemoryAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, username: impl Into<String>, password: &str) -> Self {
        self.with_password_digest(username, password_digest(password))
    }

    pub fn with_password_digest(
        mut self,
        username: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        self.users
            .insert(username.into(), digest.into().to_ascii_lowercase());
        self
    }

    pub fn allow_mediation(mut self, allow: bool) -> Self {
        self.allow_mediation = allow;
        self
    }
}

#[async_trait]
impl Authenticator for MemoryAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, SwordError> {
        let presented = password_digest(&credentials.password);
        let valid = self
            .users
            .get(&credentials.username)
            .is_some_and(|digest| bool::from(digest.as_bytes().ct_eq(presented.as_bytes())));
        if !valid {
            tracing::debug!(username = %credentials.username, "rejected credentials");
            return Err(SwordError::Authentication(
                "invalid username or password".to_string(),
            ));
        }

        let mut principal = Principal::new(credentials.username.clone());
        if let Some(obo) = &credentials.on_behalf_of {
            if !self.allow_mediation {
                return Err(SwordError::MediationNotAllowed);
            }
            if !self.users.contains_key(obo) {
                return Err(SwordError::Authentication(format!(
                    "unknown on-behalf-of user: {obo}"
                )));
            }
            principal.on_behalf_of = Some(obo.clone());
        }
        Ok(principal)
    }
}
