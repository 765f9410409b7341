//! Bearer-token session handling for the core-networks API.
use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::corenetworks::client::{read_body, send};
use crate::error::{ClientError, Result};

/// Login payload. Supplied once by the operator and never mutated.
#[derive(Clone, Serialize)]
pub struct Credentials {
    #[serde(rename = "login")]
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response of `POST /auth/token`; `expires` is in seconds.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    expires: i64,
}

/// A token together with the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Owns the session of one client instance. The lock is held across the
/// whole check-and-refresh sequence so concurrent callers log in once.
#[derive(Debug)]
pub struct SessionManager {
    credentials: Credentials,
    session: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            session: Mutex::new(None),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Snapshot of the held session, if any.
    pub async fn current(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    /// Forget the held token; the next call logs in again.
    pub async fn invalidate(&self) {
        *self.session.lock().await = None;
    }

    /// Return a token that has not expired yet, logging in first when no
    /// session is held or the held one is past its expiry.
    pub async fn ensure_valid(
        &self,
        http: &Client,
        base_url: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref().filter(|s| !s.is_expired(Utc::now())) {
            return Ok(session.token.clone());
        }

        let session = self.login(http, base_url, cancel).await?;
        let token = session.token.clone();
        *guard = Some(session);
        Ok(token)
    }

    async fn login(
        &self,
        http: &Client,
        base_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Session> {
        let url = format!("{}/auth/token", base_url);
        debug!(user = %self.credentials.user, "requesting core-networks token");

        let res = send(http.post(url).json(&self.credentials), cancel).await?;
        let status = res.status();
        let body = read_body(res, cancel).await?;
        if !status.is_success() {
            return Err(ClientError::Auth { status, body });
        }

        let parsed = serde_json::from_str::<TokenResponse>(&body);
        let parsed = match parsed {
            Ok(parsed) if !parsed.token.is_empty() => parsed,
            Ok(_) => return Err(ClientError::Auth { status, body }),
            Err(err) => {
                debug!("token response did not parse: {err}");
                return Err(ClientError::Auth { status, body });
            }
        };

        let expires_at = chrono::Duration::try_seconds(parsed.expires.max(0))
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        info!(%expires_at, "obtained core-networks session token");
        Ok(Session {
            token: parsed.token,
            expires_at,
        })
    }
}
