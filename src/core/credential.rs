//! core::credential
//!
//! The credential model shared by host providers and credential stores.
//!
//! # Security
//!
//! `Credential` implements `Debug` by hand so that passwords and refresh
//! tokens never reach logs or error messages.

use std::fmt;

use chrono::{DateTime, Utc};

/// A username/secret pair with optional OAuth metadata.
///
/// Credentials are immutable once built. An empty account together with an
/// empty password is a valid value: it signals Windows Integrated
/// Authentication to Git.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    account: String,
    password: String,
    password_expiry: Option<DateTime<Utc>>,
    oauth_refresh_token: Option<String>,
}

impl Credential {
    /// Create a credential from an account and secret.
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            password: password.into(),
            password_expiry: None,
            oauth_refresh_token: None,
        }
    }

    /// Attach an absolute expiry time to the password.
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.password_expiry = Some(expiry);
        self
    }

    /// Attach an OAuth refresh token.
    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.oauth_refresh_token = Some(token.into());
        self
    }

    /// The account (username). May be empty.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// The secret. Never log this.
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn password_expiry(&self) -> Option<DateTime<Utc>> {
        self.password_expiry
    }

    pub fn oauth_refresh_token(&self) -> Option<&str> {
        self.oauth_refresh_token.as_deref()
    }

    /// Whether this is the empty/empty pair used to request integrated auth.
    pub fn is_integrated_auth(&self) -> bool {
        self.account.is_empty() && self.password.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("account", &self.account)
            .field("password", &"[REDACTED]")
            .field("password_expiry", &self.password_expiry)
            .field(
                "oauth_refresh_token",
                &self.oauth_refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
