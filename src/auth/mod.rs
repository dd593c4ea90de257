//! Caller identity verification for bearer credentials
//!
//! The gateway never issues tokens; it only checks the ones presented to it.
//! With `[auth] mode = "disabled"` no verifier is built and every request is
//! attributed to the `system` author.

pub mod jwt;

use std::sync::Arc;

use async_trait::async_trait;

pub use jwt::JwtVerifier;

use crate::config::AppConfig;
use crate::config::AuthMode;
use crate::errors::Result;
use crate::models::CallerIdentity;

/// Validates a bearer credential against a trusted key source
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Fails with `AuthFailure`
    async fn verify(&self, token: &str) -> Result<CallerIdentity>;
}

/// Build the verifier for the configured mode; `None` when auth is disabled
pub fn verifier_from_config(config: &AppConfig) -> Result<Option<Arc<dyn IdentityVerifier>>> {
    match config.auth.mode {
        AuthMode::Disabled => {
            tracing::warn!("Authentication disabled; queries are attributed to 'system'");
            Ok(None)
        }
        AuthMode::Jwks | AuthMode::SharedSecret => {
            Ok(Some(Arc::new(JwtVerifier::from_config(&config.auth)?)))
        }
    }
}

/// Token part of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
