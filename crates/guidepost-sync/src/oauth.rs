//! OAuth access-token refresh and revocation against the provider's token
//! endpoint.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::{SyncError, SyncResult};

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const REVOKE_ENDPOINT: &str = "https://oauth2.googleapis.com/revoke";

/// OAuth client configuration for the calendar provider.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// A freshly-minted access token.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// Whether a stored access token should be refreshed. A missing expiry is
/// treated as still valid; a 60-second skew refreshes slightly early.
pub fn is_expired(expires_at: Option<DateTime<Utc>>) -> bool {
    match expires_at {
        Some(at) => Utc::now() + Duration::seconds(60) >= at,
        None => false,
    }
}

/// Exchange a refresh token for a new access token.
pub async fn refresh_access_token(
    http: &reqwest::Client,
    config: &OAuthConfig,
    refresh_token: &str,
) -> SyncResult<RefreshedToken> {
    let response = http
        .post(TOKEN_ENDPOINT)
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await
        .map_err(|e| SyncError::Network(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SyncError::Network(format!("failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(SyncError::Authentication(format!(
            "token refresh failed ({}): {}",
            status, body
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| SyncError::InvalidResponse(format!("failed to parse token response: {}", e)))?;

    debug!("access token refreshed");
    Ok(RefreshedToken {
        expires_at: token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        access_token: token.access_token,
    })
}

/// Revoke a refresh token with the provider. Callers treat failures as
/// non-fatal and proceed to delete the stored credentials regardless.
pub async fn revoke_token(http: &reqwest::Client, refresh_token: &str) -> SyncResult<()> {
    let response = http
        .post(REVOKE_ENDPOINT)
        .form(&[("token", refresh_token)])
        .send()
        .await
        .map_err(|e| SyncError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SyncError::Api {
            status: status.as_u16(),
            message: "token revocation rejected".to_string(),
        });
    }
    Ok(())
}
