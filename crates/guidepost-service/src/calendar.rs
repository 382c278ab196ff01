//! Calendar credential management and the credential-store adapter.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use guidepost_store::records::CalendarCredentials;
use guidepost_store::Store;
use guidepost_sync::{oauth, BoxFuture, CredentialStore, Credentials};

use crate::error::Result;

/// Adapts the platform [`Store`] to the sync crate's [`CredentialStore`]
/// seam. Lookups that fail are reported as absent so calendar sync stays
/// best-effort.
pub struct StoreCredentials {
    store: Arc<dyn Store>,
}

impl StoreCredentials {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

impl CredentialStore for StoreCredentials {
    fn credentials<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Option<Credentials>> {
        Box::pin(async move {
            match self.store.calendar_credentials(user_id).await {
                Ok(row) => row.map(|c| Credentials {
                    refresh_token: c.refresh_token,
                    access_token: c.access_token,
                    expires_at: c.token_expires_at,
                    sync_enabled: c.sync_enabled,
                }),
                Err(e) => {
                    warn!(user_id, error = %e, "failed to load calendar credentials");
                    None
                }
            }
        })
    }

    fn store_access_token<'a>(
        &'a self,
        user_id: &'a str,
        access_token: &'a str,
        expires_at: Option<DateTime<Utc>>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if let Err(e) = self
                .store
                .update_access_token(user_id, access_token, expires_at)
                .await
            {
                warn!(user_id, error = %e, "failed to persist refreshed access token");
            }
        })
    }
}

/// Connect/disconnect flows for users' calendar accounts.
pub struct CalendarAccountService {
    store: Arc<dyn Store>,
    http: reqwest::Client,
}

impl CalendarAccountService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            http: reqwest::Client::new(),
        }
    }

    /// Store the tokens handed back by the OAuth consent flow, enabling sync.
    pub async fn connect(
        &self,
        user_id: &str,
        refresh_token: String,
        access_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.store
            .upsert_calendar_credentials(CalendarCredentials {
                user_id: user_id.to_string(),
                refresh_token,
                access_token,
                token_expires_at: expires_at,
                sync_enabled: true,
            })
            .await?;
        Ok(())
    }

    /// Revoke the stored refresh token with the provider (best-effort) and
    /// delete the credentials either way.
    pub async fn disconnect(&self, user_id: &str) -> Result<()> {
        if let Some(credentials) = self.store.calendar_credentials(user_id).await? {
            if let Err(e) = oauth::revoke_token(&self.http, &credentials.refresh_token).await {
                warn!(user_id, error = %e, "token revocation failed, deleting anyway");
            }
        }
        self.store.delete_calendar_credentials(user_id).await?;
        Ok(())
    }
}
