//! Reqwest-backed notifier adapter for the messaging channel.
//!
//! This adapter owns transport details only: token refresh, request
//! serialisation, and error mapping. The channel issues short-lived access
//! tokens from a credential pair; tokens live in an [`AccessTokenCache`]
//! owned by this value, and a delivery rejected for a stale token
//! invalidates the cache so the next notification refreshes.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{MatchNotice, Notifier, NotifierError};
use crate::domain::user::UserId;

use super::token_cache::AccessTokenCache;

/// Channel response codes that mean the access token is no longer accepted.
const STALE_TOKEN_CODES: [i64; 2] = [40001, 42001];

/// Credentials and endpoint for the messaging channel.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Channel API base URL.
    pub base_url: Url,
    /// Application identifier.
    pub app_id: String,
    /// Application secret.
    pub app_secret: String,
}

/// Notifier that delivers match notices over the channel's HTTP API.
pub struct HttpNotifier {
    client: Client,
    config: NotifyConfig,
    tokens: AccessTokenCache,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    to_user: i64,
    table_id: i64,
    matched_at: &'a str,
    start_time: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    errcode: Option<i64>,
    errmsg: Option<String>,
}

impl HttpNotifier {
    /// Build a notifier with its own HTTP client and an empty token cache.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: NotifyConfig, clock: Arc<dyn Clock>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            config,
            tokens: AccessTokenCache::new(),
            clock,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, NotifierError> {
        self.config
            .base_url
            .join(path)
            .map_err(|err| NotifierError::delivery(format!("bad endpoint {path}: {err}")))
    }

    /// Return a usable access token, refreshing through the channel's token
    /// endpoint when the cache is empty or expired.
    async fn access_token(&self) -> Result<String, NotifierError> {
        let now = self.clock.utc();
        if let Some(token) = self.tokens.current(now).await {
            return Ok(token);
        }

        let endpoint = self
            .endpoint("token")
            .map_err(|err| NotifierError::credentials(err.to_string()))?;
        let response: TokenResponse = self
            .client
            .get(endpoint)
            .query(&[
                ("app_id", self.config.app_id.as_str()),
                ("app_secret", self.config.app_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|err| NotifierError::credentials(err.to_string()))?
            .error_for_status()
            .map_err(|err| NotifierError::credentials(err.to_string()))?
            .json()
            .await
            .map_err(|err| NotifierError::credentials(err.to_string()))?;

        let (Some(token), Some(expires_in)) = (response.access_token, response.expires_in) else {
            let code = response.errcode.unwrap_or_default();
            let message = response.errmsg.unwrap_or_default();
            return Err(NotifierError::credentials(format!(
                "token endpoint rejected credentials: {code} {message}"
            )));
        };

        self.tokens.store(token.clone(), now, expires_in).await;
        Ok(token)
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, user: UserId, notice: MatchNotice) -> Result<(), NotifierError> {
        let token = self.access_token().await?;
        let endpoint = self.endpoint("messages/send")?;

        let matched_at = notice.matched_at.to_rfc3339();
        let start_time = notice.start_time.to_rfc3339();
        let body = SendRequest {
            to_user: user.get(),
            table_id: notice.table_id,
            matched_at: &matched_at,
            start_time: &start_time,
        };

        let response: SendResponse = self
            .client
            .post(endpoint)
            .query(&[("access_token", token.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|err| NotifierError::delivery(err.to_string()))?
            .error_for_status()
            .map_err(|err| NotifierError::delivery(err.to_string()))?
            .json()
            .await
            .map_err(|err| NotifierError::delivery(err.to_string()))?;

        match response.errcode.unwrap_or(0) {
            0 => Ok(()),
            code if STALE_TOKEN_CODES.contains(&code) => {
                self.tokens.invalidate().await;
                Err(NotifierError::delivery(format!(
                    "channel rejected the access token ({code})"
                )))
            }
            code => Err(NotifierError::delivery(format!(
                "channel refused delivery: {code} {}",
                response.errmsg.unwrap_or_default()
            ))),
        }
    }
}
