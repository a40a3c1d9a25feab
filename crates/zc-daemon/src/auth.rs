//! Bearer-token authentication.
//!
//! Tokens are OIDC access tokens signed RS256 by the identity provider. The
//! provider's signing keys come from its JWKS endpoint; they are cached for
//! the life of the process and re-downloaded once when a token names a `kid`
//! the cache does not know (key rotation).

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, decode_header, jwk::Jwk, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{error::ApiError, state::AppState};

const JWKS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    MissingBearer,
    #[error("Missing kid in token header")]
    MissingKid,
    #[error("No matching JWK for token kid")]
    UnknownKid,
    #[error("Token verification failed: JWKS unavailable: {0}")]
    Jwks(String),
    #[error("Token verification failed: {0}")]
    Invalid(String),
}

/// The subset of token claims the service looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Claims {
    pub sub: Option<String>,
    pub preferred_username: Option<String>,
}

#[async_trait::async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

// ---------------------------------------------------------------------------
// JWKS-backed verifier
// ---------------------------------------------------------------------------

pub struct JwksVerifier {
    jwks_url: String,
    audience: String,
    http: reqwest::Client,
    /// `None` until the first download.
    keys: RwLock<Option<Arc<Vec<Jwk>>>>,
}

impl JwksVerifier {
    pub fn new(jwks_url: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            audience: audience.into(),
            http: reqwest::Client::new(),
            keys: RwLock::new(None),
        }
    }

    async fn download(&self) -> Result<Arc<Vec<Jwk>>, AuthError> {
        let resp = self
            .http
            .get(&self.jwks_url)
            .timeout(JWKS_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Jwks(e.to_string()))?;
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))?;

        // Parse key by key: providers also publish encryption keys whose
        // algorithms the verifier does not model.
        let keys: Vec<Jwk> = body
            .get("keys")
            .and_then(|k| k.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|k| serde_json::from_value::<Jwk>(k.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        debug!(url = %self.jwks_url, keys = keys.len(), "jwks downloaded");

        let keys = Arc::new(keys);
        *self.keys.write().await = Some(Arc::clone(&keys));
        Ok(keys)
    }

    async fn cached_or_download(&self) -> Result<Arc<Vec<Jwk>>, AuthError> {
        if let Some(keys) = self.keys.read().await.as_ref() {
            return Ok(Arc::clone(keys));
        }
        self.download().await
    }

    async fn key_for(&self, kid: &str) -> Result<Jwk, AuthError> {
        let keys = self.cached_or_download().await?;
        if let Some(jwk) = find_kid(&keys, kid) {
            return Ok(jwk);
        }
        let keys = self.download().await?;
        find_kid(&keys, kid).ok_or(AuthError::UnknownKid)
    }
}

fn find_kid(keys: &[Jwk], kid: &str) -> Option<Jwk> {
    keys.iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
        .cloned()
}

#[async_trait::async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Invalid(e.to_string()))?;
        let kid = header.kid.filter(|k| !k.is_empty()).ok_or(AuthError::MissingKid)?;

        let jwk = self.key_for(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(|e| AuthError::Invalid(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.as_str()]);

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| AuthError::Invalid(e.to_string()))?;
        Ok(data.claims)
    }
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// `Authorization: Bearer <token>`, scheme matched case-insensitively.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Rejects the request with 401 unless it carries a token the configured
/// verifier accepts. A state without a verifier lets every request through.
///
/// Accepted claims are attached to the request as an extension.
pub async fn require_bearer(
    State(st): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(verifier) = st.verifier.as_ref() else {
        return next.run(req).await;
    };

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);
    let Some(token) = token else {
        return ApiError::from(AuthError::MissingBearer).into_response();
    };

    match verifier.verify(&token).await {
        Ok(claims) => {
            debug!(sub = claims.sub.as_deref().unwrap_or("-"), "token accepted");
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(err) => {
            warn!(path = %req.uri().path(), error = %err, "token rejected");
            ApiError::from(err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer "), None);
    }

    #[tokio::test]
    async fn garbage_token_is_invalid_before_any_download() {
        let v = JwksVerifier::new("http://127.0.0.1:9/certs", "aud");
        let err = v.verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::Invalid(_)), "{err:?}");
        assert!(v.keys.read().await.is_none());
    }
}
