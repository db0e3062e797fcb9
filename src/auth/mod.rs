//! Request authentication context
//!
//! Protected routes receive an [`Auth`] extension from the auth middleware.
//! Bearer tokens are compared against the configured API secrets in constant time.

use subtle::ConstantTimeEq;

use crate::config::AuthApiSecret;

/// Authentication context attached to each protected request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Auth {
    /// Identifier of the matched API secret, `None` when auth is disabled
    pub id: Option<String>,
}

impl Auth {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }

    /// Context used when authentication is disabled
    pub fn empty() -> Self {
        Self { id: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.id.is_some()
    }
}

/// Find the id of the API secret matching `token`
///
/// Every configured secret is compared so timing does not reveal which entry matched.
pub fn match_api_secret_id<'a>(token: &str, secrets: &'a [AuthApiSecret]) -> Option<&'a str> {
    let mut matched = None;
    for entry in secrets {
        let equal: bool = token.as_bytes().ct_eq(entry.secret.as_bytes()).into();
        if equal && matched.is_none() {
            matched = Some(entry.id.as_str());
        }
    }
    matched
}
