//! Client-side session management.
//!
//! Holds the token pair, refreshes the access token proactively near expiry,
//! and retries a request exactly once after a 401. Concurrent callers that
//! hit an expired token share one refresh instead of stampeding the server.

use reqwest::{Method, Response, StatusCode};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::api::handlers::auth::types::{
    LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, RefreshResponse, UserResponse,
};
use crate::APP_USER_AGENT;

pub mod store;

pub use store::{FileTokenStore, MemoryTokenStore, StoredTokens, TokenStore};

/// Refresh this many seconds before the access token actually expires.
const EXPIRY_BUFFER_SECONDS: i64 = 60;

/// Broadcast auth state so every part of a client application observes a
/// logout, the way browser tabs watch storage events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    SignedIn,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The session cannot be recovered; the caller should send the user back
    /// to the login screen.
    #[error("session expired")]
    SessionExpired,
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    tokens: Mutex<Option<StoredTokens>>,
    /// Serializes refreshes; whoever waits here re-checks freshness after
    /// acquiring, so one network call serves every concurrent caller.
    refresh_lock: Mutex<()>,
    events: watch::Sender<SessionState>,
}

impl SessionClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, store: Arc<dyn TokenStore>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .unwrap_or_default();
        let initial = if store.load().is_some() {
            SessionState::SignedIn
        } else {
            SessionState::SignedOut
        };
        let (events, _) = watch::channel(initial);
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
            tokens: Mutex::new(None),
            refresh_lock: Mutex::new(()),
            events,
        }
    }

    /// Watch login/logout transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.events.subscribe()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Sign in and persist the issued token pair.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] with the server's message for bad
    /// credentials or rate limiting, [`ClientError::Http`] on transport
    /// failures.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Rejected(error_message(response).await));
        }

        let body: LoginResponse = response.json().await?;
        let stored = StoredTokens {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_at: Self::now() + body.expires_in,
        };
        self.store.save(&stored);
        *self.tokens.lock().await = Some(stored);
        let _ = self.events.send_replace(SessionState::SignedIn);

        Ok(body.user)
    }

    /// Return an access token that is good for at least the buffer window,
    /// refreshing first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionExpired`] when no session exists or the
    /// refresh token was rejected.
    pub async fn valid_access_token(&self) -> Result<String, ClientError> {
        let cached = {
            let mut tokens = self.tokens.lock().await;
            if tokens.is_none() {
                // Another process (or a previous run) may have signed in.
                *tokens = self.store.load();
            }
            tokens.clone()
        };

        match cached {
            None => Err(self.expire().await),
            Some(stored) if stored.expires_at - EXPIRY_BUFFER_SECONDS > Self::now() => {
                Ok(stored.access_token)
            }
            Some(_) => self.refresh_access_token().await,
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionExpired`] when the server rejects the
    /// refresh token; local state is cleared before returning.
    pub async fn refresh_access_token(&self) -> Result<String, ClientError> {
        self.refresh_internal(None).await
    }

    /// `stale` is the access token a caller just saw rejected; when another
    /// caller already replaced it, the replacement is returned without a
    /// second network call.
    async fn refresh_internal(&self, stale: Option<&str>) -> Result<String, ClientError> {
        let _guard = self.refresh_lock.lock().await;

        // A caller that was queued behind the lock may find fresh state.
        let snapshot = self.tokens.lock().await.clone();
        let refresh_token = match snapshot {
            None => return Err(self.expire().await),
            Some(stored) => {
                let fresh = stored.expires_at - EXPIRY_BUFFER_SECONDS > Self::now();
                let already_replaced =
                    stale.is_some_and(|stale| stale != stored.access_token);
                if already_replaced || (stale.is_none() && fresh) {
                    return Ok(stored.access_token);
                }
                stored.refresh_token
            }
        };

        debug!("Refreshing access token");
        let response = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(_) | Err(_) => return Err(self.expire().await),
        };

        let body: RefreshResponse = match response.json().await {
            Ok(body) => body,
            Err(_) => return Err(self.expire().await),
        };

        let updated = {
            let mut tokens = self.tokens.lock().await;
            tokens.as_mut().map(|stored| {
                stored.access_token = body.access_token.clone();
                stored.expires_at = Self::now() + body.expires_in;
                self.store.save(stored);
            })
        };
        if updated.is_none() {
            // Logged out while the refresh was in flight.
            return Err(self.expire().await);
        }

        Ok(body.access_token)
    }

    /// Send an authenticated request, refreshing and retrying once on 401.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionExpired`] when the retry also comes back
    /// 401, [`ClientError::Http`] on transport failures.
    pub async fn fetch_with_auth(
        &self,
        method: Method,
        path: &str,
    ) -> Result<Response, ClientError> {
        let token = self.valid_access_token().await?;
        let response = self
            .http
            .request(method.clone(), self.url(path))
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        // One refresh-and-retry cycle; a second 401 means the session is gone.
        let token = self.refresh_internal(Some(&token)).await?;
        let response = self
            .http
            .request(method, self.url(path))
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(self.expire().await);
        }

        Ok(response)
    }

    /// Fetch the identity behind the current session.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::fetch_with_auth`] failures.
    pub async fn me(&self) -> Result<UserResponse, ClientError> {
        let response = self.fetch_with_auth(Method::GET, "/auth/me").await?;
        if !response.status().is_success() {
            return Err(ClientError::Rejected(error_message(response).await));
        }
        Ok(response.json().await?)
    }

    /// Sign out. Local state clears immediately; server-side revocation is
    /// best-effort and a failure to reach the server does not undo the local
    /// logout.
    pub async fn logout(&self) {
        let refresh_token = {
            let mut tokens = self.tokens.lock().await;
            let refresh_token = tokens.as_ref().map(|stored| stored.refresh_token.clone());
            *tokens = None;
            refresh_token
        };
        self.store.clear();
        let _ = self.events.send_replace(SessionState::SignedOut);

        if let Some(refresh_token) = refresh_token {
            let result = self
                .http
                .post(self.url("/auth/logout"))
                .json(&LogoutRequest { refresh_token })
                .send()
                .await;
            if let Err(err) = result {
                warn!("Failed to notify server of logout: {err}");
            }
        }
    }

    /// Clear every trace of the session and report it as expired.
    async fn expire(&self) -> ClientError {
        *self.tokens.lock().await = None;
        self.store.clear();
        let _ = self.events.send_replace(SessionState::SignedOut);
        ClientError::SessionExpired
    }
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        });
    body.unwrap_or_else(|| format!("HTTP {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store(expires_at: i64) -> Arc<MemoryTokenStore> {
        let store = Arc::new(MemoryTokenStore::new());
        store.save(&StoredTokens {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at,
        });
        store
    }

    #[tokio::test]
    async fn valid_access_token_uses_store_when_fresh() {
        let store = seeded_store(SessionClient::now() + 3600);
        let client = SessionClient::new("http://127.0.0.1:1", store);

        let token = client.valid_access_token().await.expect("token");
        assert_eq!(token, "access");
    }

    #[tokio::test]
    async fn missing_session_reports_expired() {
        let store = Arc::new(MemoryTokenStore::new());
        let client = SessionClient::new("http://127.0.0.1:1", store);

        assert!(matches!(
            client.valid_access_token().await,
            Err(ClientError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn unreachable_refresh_clears_state() {
        // Token already inside the buffer window forces a refresh; the server
        // is unreachable, so the session must end signed out.
        let store = seeded_store(SessionClient::now() + 10);
        let client = SessionClient::new("http://127.0.0.1:1", store.clone());

        assert!(matches!(
            client.valid_access_token().await,
            Err(ClientError::SessionExpired)
        ));
        assert!(store.load().is_none());
        assert_eq!(*client.subscribe().borrow(), SessionState::SignedOut);
    }

    #[tokio::test]
    async fn logout_clears_local_state_even_without_server() {
        let store = seeded_store(SessionClient::now() + 3600);
        let client = SessionClient::new("http://127.0.0.1:1", store.clone());
        let events = client.subscribe();

        client.logout().await;

        assert!(store.load().is_none());
        assert_eq!(*events.borrow(), SessionState::SignedOut);
        assert!(matches!(
            client.valid_access_token().await,
            Err(ClientError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn subscribe_reflects_persisted_session() {
        let store = seeded_store(SessionClient::now() + 3600);
        let client = SessionClient::new("http://127.0.0.1:1", store);
        assert_eq!(*client.subscribe().borrow(), SessionState::SignedIn);
    }
}
