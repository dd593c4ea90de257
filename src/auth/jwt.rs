//! JWT bearer verification against a JWKS endpoint or a shared secret

use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use jsonwebtoken::decode;
use jsonwebtoken::decode_header;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;

use super::IdentityVerifier;
use crate::config::AuthConfig;
use crate::config::AuthMode;
use crate::errors::RagDeskError;
use crate::errors::Result;
use crate::models::CallerIdentity;

/// Shortest gap between two JWKS downloads
pub const JWKS_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Where signing keys come from
enum KeySource {
    /// RS256 keys published at a JWKS URL, cached by `kid`
    Jwks(JwksCache),
    /// HS256 with one shared secret
    SharedSecret(DecodingKey),
}

/// Signing keys downloaded from a JWKS URL
///
/// Unknown `kid`s trigger at most one download per `min_interval`; callers
/// arriving during a download wait for it instead of starting their own.
struct JwksCache {
    url: String,
    client: reqwest::Client,
    keys: DashMap<String, DecodingKey>,
    last_refresh: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl JwksCache {
    fn new(url: &str, client: reqwest::Client, min_interval: Duration) -> Self {
        Self {
            url: url.to_string(),
            client,
            keys: DashMap::new(),
            last_refresh: Mutex::new(None),
            min_interval,
        }
    }

    async fn key(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(key) = self.keys.get(kid) {
            return Ok(key.clone());
        }

        let mut last_refresh = self.last_refresh.lock().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(key) = self.keys.get(kid) {
            return Ok(key.clone());
        }
        let recent = (*last_refresh).is_some_and(|at| at.elapsed() < self.min_interval);
        if !recent {
            // Unknown kid: the issuer may have rotated its keys
            *last_refresh = Some(Instant::now());
            self.refresh().await?;
        }

        self.keys
            .get(kid)
            .map(|key| key.clone())
            .ok_or_else(|| auth_error(format!("unknown signing key '{kid}'")))
    }

    /// Download the key set and swap it in; the old keys stay usable until then
    async fn refresh(&self) -> Result<()> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| auth_error(format!("JWKS fetch failed: {e}")))?;
        if !response.status().is_success() {
            return Err(auth_error(format!(
                "JWKS fetch failed with status {}",
                response.status()
            )));
        }
        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| auth_error(format!("JWKS parse failed: {e}")))?;

        let mut fresh = HashMap::new();
        for jwk in &set.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    fresh.insert(kid, key);
                }
                Err(e) => debug!("Skipping unusable JWK {}: {}", kid, e),
            }
        }

        self.keys.retain(|kid, _| fresh.contains_key(kid));
        for (kid, key) in fresh {
            self.keys.insert(kid, key);
        }
        info!("Loaded {} signing keys from {}", self.keys.len(), self.url);
        Ok(())
    }
}

/// Claims read from a verified token
#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
    unique_name: Option<String>,
    preferred_username: Option<String>,
    upn: Option<String>,
    email: Option<String>,
}

impl Claims {
    /// First present of `unique_name`, `preferred_username`, `upn`, `email`
    fn display_name(self) -> Option<String> {
        [
            self.unique_name,
            self.preferred_username,
            self.upn,
            self.email,
        ]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
    }
}

fn auth_error(e: impl std::fmt::Display) -> RagDeskError {
    RagDeskError::AuthFailure(e.to_string())
}

/// Verifies bearer JWTs
pub struct JwtVerifier {
    source: KeySource,
    issuer: Option<String>,
    audience: Option<String>,
}

impl JwtVerifier {
    /// Verifier for RS256 tokens signed by keys published at `jwks_url`
    pub fn with_jwks(
        jwks_url: &str,
        issuer: Option<String>,
        audience: Option<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| RagDeskError::HttpError(e.to_string()))?;

        Ok(Self {
            source: KeySource::Jwks(JwksCache::new(jwks_url, client, JWKS_REFRESH_INTERVAL)),
            issuer,
            audience,
        })
    }

    /// Verifier for HS256 tokens signed with `secret`
    pub fn with_shared_secret(
        secret: &str,
        issuer: Option<String>,
        audience: Option<String>,
    ) -> Self {
        Self {
            source: KeySource::SharedSecret(DecodingKey::from_secret(secret.as_bytes())),
            issuer,
            audience,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        match config.mode {
            AuthMode::Jwks => {
                let url = config.jwks_url.as_deref().ok_or_else(|| {
                    RagDeskError::ConfigError("auth.jwks_url is required in jwks mode".to_string())
                })?;
                Self::with_jwks(url, config.issuer.clone(), config.audience.clone())
            }
            AuthMode::SharedSecret => {
                let secret = config.shared_secret.as_deref().ok_or_else(|| {
                    RagDeskError::ConfigError(
                        "auth.shared_secret is required in shared_secret mode".to_string(),
                    )
                })?;
                Ok(Self::with_shared_secret(
                    secret,
                    config.issuer.clone(),
                    config.audience.clone(),
                ))
            }
            AuthMode::Disabled => Err(RagDeskError::ConfigError(
                "no verifier exists for auth mode 'disabled'".to_string(),
            )),
        }
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }

    async fn decoding_key(&self, token: &str) -> Result<(DecodingKey, Algorithm)> {
        match &self.source {
            KeySource::SharedSecret(key) => Ok((key.clone(), Algorithm::HS256)),
            KeySource::Jwks(cache) => {
                let header = decode_header(token).map_err(auth_error)?;
                let kid = header
                    .kid
                    .ok_or_else(|| auth_error("token header has no kid"))?;
                Ok((cache.key(&kid).await?, Algorithm::RS256))
            }
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<CallerIdentity> {
        let (key, algorithm) = self.decoding_key(token).await?;
        let data = decode::<Claims>(token, &key, &self.validation(algorithm)).map_err(auth_error)?;

        let claims = data.claims;
        let subject = claims
            .sub
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| auth_error("token has no subject"))?;
        Ok(CallerIdentity::new(subject, claims.display_name()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use jsonwebtoken::encode;
    use jsonwebtoken::EncodingKey;
    use jsonwebtoken::Header;
    use serde_json::json;

    use super::*;

    const SECRET: &str = "test-secret";

    fn mint(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn exp_in(secs: i64) -> i64 {
        chrono::Utc::now().timestamp() + secs
    }

    #[tokio::test]
    async fn test_valid_token_yields_identity() {
        let verifier = JwtVerifier::with_shared_secret(SECRET, None, Some("ragdesk".into()));
        let claims = json!({
            "sub": "u-1",
            "aud": "ragdesk",
            "preferred_username": "ada@example.com",
            "exp": exp_in(3600),
        });
        let token = mint(claims, SECRET);

        let identity = verifier.verify(&token).await.unwrap();
        assert_eq!(identity.subject, "u-1");
        assert_eq!(identity.display_name.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_display_name_claim_precedence() {
        let verifier = JwtVerifier::with_shared_secret(SECRET, None, None);
        let claims = json!({
            "sub": "u-1",
            "email": "e@x",
            "upn": "upn@x",
            "unique_name": "Ada",
            "exp": exp_in(60),
        });
        let token = mint(claims, SECRET);
        let identity = verifier.verify(&token).await.unwrap();
        assert_eq!(identity.display_name.as_deref(), Some("Ada"));

        let token = mint(json!({"sub": "u-2", "exp": exp_in(60)}), SECRET);
        let identity = verifier.verify(&token).await.unwrap();
        assert_eq!(CallerIdentity::created_by(Some(&identity)), "system");
    }

    #[tokio::test]
    async fn test_rejects_bad_tokens() {
        let verifier = JwtVerifier::with_shared_secret(
            SECRET,
            Some("https://issuer".into()),
            Some("ragdesk".into()),
        );
        let claims = |sub: Option<&str>, aud: &str, iss: &str, exp: i64| {
            let mut value = json!({"aud": aud, "iss": iss, "exp": exp_in(exp)});
            if let Some(sub) = sub {
                value["sub"] = json!(sub);
            }
            value
        };
        let good = claims(Some("u"), "ragdesk", "https://issuer", 3600);

        let cases = vec![
            mint(good.clone(), "other-secret"),
            mint(claims(Some("u"), "ragdesk", "https://issuer", -3600), SECRET),
            mint(claims(Some("u"), "someone-else", "https://issuer", 3600), SECRET),
            mint(claims(Some("u"), "ragdesk", "https://evil", 3600), SECRET),
            mint(claims(None, "ragdesk", "https://issuer", 3600), SECRET),
            "not-a-jwt".to_string(),
        ];

        for token in cases {
            let err = verifier.verify(&token).await.unwrap_err();
            assert!(matches!(err, RagDeskError::AuthFailure(_)), "{err:?}");
        }
        assert!(verifier.verify(&mint(good, SECRET)).await.is_ok());
    }

    fn token_with_kid(kid: &str) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.into());
        encode(
            &header,
            &json!({"sub": "u", "exp": exp_in(60)}),
            &EncodingKey::from_secret(b"x"),
        )
        .unwrap()
    }

    /// Serves a JWKS document and counts downloads
    async fn jwks_server(body: serde_json::Value) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/keys",
            axum::routing::get(move || {
                let counter = counter.clone();
                let body = body.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    axum::Json(body)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/keys"), hits)
    }

    #[tokio::test]
    async fn test_jwks_unreachable_is_auth_failure() {
        let verifier =
            JwtVerifier::with_jwks("http://127.0.0.1:9/keys", None, Some("ragdesk".into()))
                .unwrap();

        let err = verifier.verify(&token_with_kid("k1")).await.unwrap_err();
        assert!(matches!(err, RagDeskError::AuthFailure(m) if m.contains("JWKS fetch failed")));
    }

    #[tokio::test]
    async fn test_unknown_kids_refresh_at_most_once_per_interval() {
        let (url, hits) = jwks_server(json!({"keys": []})).await;
        let verifier = JwtVerifier::with_jwks(&url, None, None).unwrap();

        for kid in ["a", "b", "c"] {
            let err = verifier.verify(&token_with_kid(kid)).await.unwrap_err();
            assert!(
                matches!(err, RagDeskError::AuthFailure(m) if m.contains("unknown signing key")),
                "{kid}"
            );
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_swaps_key_set() {
        let (url, hits) =
            jwks_server(json!({"keys": [{"kty": "oct", "kid": "fresh", "k": "c2VjcmV0"}]})).await;
        let client = reqwest::Client::new();
        let cache = JwksCache::new(&url, client, Duration::ZERO);
        cache
            .keys
            .insert("stale".to_string(), DecodingKey::from_secret(b"old"));

        assert!(cache.key("fresh").await.is_ok());
        assert!(cache.keys.contains_key("fresh"));
        assert!(!cache.keys.contains_key("stale"));

        assert!(cache.key("fresh").await.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disabled_mode_has_no_verifier() {
        assert!(JwtVerifier::from_config(&AuthConfig::default()).is_err());
    }
}
