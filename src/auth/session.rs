//! Session recovery against the refresh endpoint.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::store::{CredentialKey, StoreError};
use crate::client::error::RefreshError;
use crate::client::ApiClient;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: Option<String>,
}

fn store_error(e: StoreError) -> RefreshError {
    RefreshError::Store(e.to_string())
}

impl ApiClient {
    /// Get a token worth replaying a 401'd request with.
    ///
    /// If another request already refreshed since `used_token` was read, the
    /// stored token is returned without a new refresh. Otherwise this starts
    /// or joins the single in-flight refresh, which runs in its own task.
    pub(crate) async fn recover_unauthorized(&self, used_token: Option<&str>) -> Result<String, RefreshError> {
        if !self.inner.refresh.is_refreshing() {
            let stored = self.inner.credentials.access_token().map_err(store_error)?;
            if let Some(stored) = stored {
                if used_token != Some(stored.as_str()) {
                    tracing::debug!("Stored access token is newer than the rejected one, replaying");
                    return Ok(stored);
                }
            }
        }

        let client = self.clone();
        self.inner
            .refresh
            .run_or_join(move || async move { client.refresh_session().await })
            .await
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// On success only the access token is overwritten. On any failure both
    /// tokens are erased so the caller has to log in again.
    pub async fn refresh_session(&self) -> Result<String, RefreshError> {
        match self.request_access_token().await {
            Ok(token) => {
                tracing::info!("Access token refreshed");
                Ok(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, clearing stored credentials");
                if let Err(clear_err) = self.inner.credentials.clear() {
                    tracing::error!(error = %clear_err, "Failed to clear stored credentials");
                }
                Err(e)
            }
        }
    }

    async fn request_access_token(&self) -> Result<String, RefreshError> {
        let refresh_token = self
            .inner
            .credentials
            .refresh_token()
            .map_err(store_error)?
            .ok_or(RefreshError::Unavailable)?;

        let url = self
            .endpoint(&self.inner.config.api.refresh_path)
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let response = self
            .inner
            .http
            .post(url)
            .timeout(self.inner.config.auth.refresh_timeout())
            .header("x-request-id", Uuid::new_v4().to_string())
            .json(&RefreshRequest { refresh_token: &refresh_token })
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected { status: status.as_u16() });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;
        let access_token = serde_json::from_slice::<RefreshResponse>(&body)
            .ok()
            .and_then(|r| r.access_token)
            .filter(|token| !token.is_empty())
            .ok_or(RefreshError::MissingAccessToken)?;

        self.inner
            .credentials
            .set(CredentialKey::AccessToken, &access_token)
            .map_err(store_error)?;

        Ok(access_token)
    }
}
