//! Bearer-token verification against the auth provider's published keys.
//!
//! The platform never trusts a token's claims on sight: the signature is
//! verified against the issuer's JWKS, the issuer claim must match, and expiry
//! is enforced. Only then is the `sub` claim accepted as the caller's user id.
//! Keys are cached per `kid` and refetched once on an unknown key id.

use std::collections::HashMap;
use std::sync::RwLock;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing or invalid token")]
    MissingToken,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Unknown signing key: {0}")]
    UnknownKey(String),

    #[error("Failed to fetch signing keys: {0}")]
    Jwks(String),

    #[error("Token verification failed: {0}")]
    Verification(String),
}

/// Where and how tokens are verified.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// URL of the issuer's published JWKS document.
    pub jwks_url: String,
    /// Expected `iss` claim.
    pub issuer: String,
    /// Expected `aud` claim; audience checking is skipped when `None`.
    pub audience: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    n: Option<String>,
    e: Option<String>,
    x: Option<String>,
    y: Option<String>,
}

pub struct TokenVerifier {
    http: reqwest::Client,
    config: AuthConfig,
    keys: RwLock<HashMap<String, DecodingKey>>,
    /// Fixed key + algorithm, bypassing JWKS. For symmetric-secret issuers
    /// and tests.
    static_key: Option<(DecodingKey, Algorithm)>,
}

impl TokenVerifier {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            keys: RwLock::new(HashMap::new()),
            static_key: None,
        }
    }

    /// A verifier bound to one known key instead of a JWKS endpoint.
    pub fn with_static_key(config: AuthConfig, key: DecodingKey, algorithm: Algorithm) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            keys: RwLock::new(HashMap::new()),
            static_key: Some((key, algorithm)),
        }
    }

    /// Extract the token from an `Authorization` header value.
    pub fn bearer_token(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ").filter(|t| !t.is_empty())
    }

    /// Verify an `Authorization` header and return the subject user id.
    pub async fn verify_bearer(&self, header: &str) -> Result<String, AuthError> {
        let token = Self::bearer_token(header).ok_or(AuthError::MissingToken)?;
        self.verify(token).await
    }

    /// Verify a raw token and return the subject user id.
    pub async fn verify(&self, token: &str) -> Result<String, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::Malformed(e.to_string()))?;

        let (key, algorithm) = match &self.static_key {
            Some((key, algorithm)) => (key.clone(), *algorithm),
            None => {
                if !matches!(header.alg, Algorithm::RS256 | Algorithm::ES256) {
                    return Err(AuthError::Malformed(format!(
                        "unsupported algorithm {:?}",
                        header.alg
                    )));
                }
                let kid = header
                    .kid
                    .ok_or_else(|| AuthError::Malformed("token has no key id".to_string()))?;
                (self.key_for(&kid).await?, header.alg)
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&self.config.issuer]);
        match &self.config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| AuthError::Verification(e.to_string()))?;
        Ok(data.claims.sub)
    }

    /// The cached decoding key for a `kid`, refetching the JWKS once on a
    /// miss.
    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.keys.read().unwrap().get(kid) {
            return Ok(key.clone());
        }

        self.refresh_keys().await?;

        self.keys
            .read()
            .unwrap()
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }

    async fn refresh_keys(&self) -> Result<(), AuthError> {
        let jwks: Jwks = self
            .http
            .get(&self.config.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))?;

        let mut keys = self.keys.write().unwrap();
        keys.clear();
        for jwk in jwks.keys {
            let Some(kid) = jwk.kid else { continue };
            let key = match jwk.kty.as_str() {
                "RSA" => match (&jwk.n, &jwk.e) {
                    (Some(n), Some(e)) => DecodingKey::from_rsa_components(n, e).ok(),
                    _ => None,
                },
                "EC" => match (&jwk.x, &jwk.y) {
                    (Some(x), Some(y)) => DecodingKey::from_ec_components(x, y).ok(),
                    _ => None,
                },
                _ => None,
            };
            if let Some(key) = key {
                keys.insert(kid, key);
            }
        }
        debug!(count = keys.len(), "signing keys refreshed");
        Ok(())
    }
}
