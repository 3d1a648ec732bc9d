//! Authentication session for the current client
//!
//! Holds the bearer token and the current-user snapshot. The token lives in
//! three places at once: this session's state, the persisted store and the
//! shared client's `Authorization` default header. Only `set_token` and
//! `clear_token` touch them, so once an operation returns
//! either all three agree or all three are empty.

use std::sync::Mutex;

use tokio::sync::watch;

use crate::client::ApiClient;
use crate::config::{endpoints, SessionConfig};
use crate::error::Result;
use crate::models::{
    LoginData, LoginResult, RegisterData, RegisterResult, SessionState, TokenResponse, User,
};
use crate::storage::{TokenStore, TOKEN_KEY};

/// Shown when a failed login carries no server `detail`
pub const LOGIN_FALLBACK_ERROR: &str = "登录失败";
/// Shown when a failed registration carries no server `detail`
pub const REGISTER_FALLBACK_ERROR: &str = "注册失败";

/// Options that change session behaviour beyond the defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Log out when fetching the current user answers 401
    pub logout_on_unauthorized: bool,
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            logout_on_unauthorized: config.logout_on_unauthorized,
        }
    }
}

/// Login state of one client: bearer token, current user and the operations
/// that change them.
///
/// Construct once per application and share it (behind an `Arc` if several
/// tasks need it). Requests made through [`AuthSession::client`] carry the
/// session's `Authorization` header.
pub struct AuthSession<S: TokenStore> {
    client: ApiClient,
    store: S,
    options: SessionOptions,
    state: watch::Sender<SessionState>,
    // Held for the whole of set_token/clear_token; never across an await
    token_sync: Mutex<()>,
}

impl<S: TokenStore> AuthSession<S> {
    /// Build a session, seeding the token from the persisted store.
    ///
    /// A stored token is installed as the default authorization header
    /// before this returns. An unreadable store is logged and the session
    /// starts logged out.
    pub fn new(client: ApiClient, store: S) -> Self {
        Self::with_options(client, store, SessionOptions::default())
    }

    pub fn with_options(client: ApiClient, store: S, options: SessionOptions) -> Self {
        let token = match store.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                log::warn!("Could not read persisted token: {}", e);
                None
            }
        };

        if let Some(ref token) = token {
            if let Err(e) = client.set_bearer(token) {
                log::warn!("Persisted token is not a valid header value, ignoring it: {}", e);
                return Self::build(client, store, options, None);
            }
            log::debug!("Restored persisted session token");
        }

        Self::build(client, store, options, token)
    }

    fn build(client: ApiClient, store: S, options: SessionOptions, token: Option<String>) -> Self {
        let (state, _) = watch::channel(SessionState { user: None, token });
        Self {
            client,
            store,
            options,
            state,
            token_sync: Mutex::new(()),
        }
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receive every change to `user` and `token`
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The shared client; requests made through it carry the session header
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Exchange credentials for a token, then load the current user.
    ///
    /// Success does not depend on the user fetch; a failed fetch is only
    /// logged. On failure nothing is changed.
    pub async fn login(&self, username: &str, password: &str) -> LoginResult {
        let data = LoginData {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response: TokenResponse = match self.client.post_form(endpoints::TOKEN, &data).await {
            Ok(response) => response,
            Err(e) => {
                log::info!("Login failed for {}: {}", username, e);
                return LoginResult::failed(e.detail().unwrap_or(LOGIN_FALLBACK_ERROR));
            }
        };

        // An empty token would count as logged out on the next start
        if response.access_token.is_empty() {
            log::warn!("Token endpoint returned an empty access_token for {}", username);
            return LoginResult::failed(LOGIN_FALLBACK_ERROR);
        }

        if let Err(e) = self.set_token(&response.access_token) {
            log::error!("Could not install session token: {}", e);
            return LoginResult::failed(e.to_string());
        }
        log::info!("Logged in as {}", username);

        self.fetch_user().await;
        LoginResult::ok()
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> RegisterResult {
        let data = RegisterData {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };

        match self.client.post_json::<_, User>(endpoints::REGISTER, &data).await {
            Ok(user) => {
                log::info!("Registered user {} (id {})", user.username, user.id);
                RegisterResult::ok(user)
            }
            Err(e) => {
                log::info!("Registration failed for {}: {}", username, e);
                RegisterResult::failed(e.detail().unwrap_or(REGISTER_FALLBACK_ERROR))
            }
        }
    }

    /// Refresh the current-user snapshot using the installed header.
    ///
    /// Errors are logged and the previous snapshot is kept.
    pub async fn fetch_user(&self) {
        match self.client.get::<User>(endpoints::CURRENT_USER).await {
            Ok(user) => {
                self.state.send_modify(|state| state.user = Some(user));
            }
            Err(e) => {
                log::error!("Failed to fetch current user: {}", e);
                if self.options.logout_on_unauthorized && e.is_unauthorized() {
                    log::warn!("Server rejected the session token, logging out");
                    self.logout();
                }
            }
        }
    }

    /// Forget the token and user locally. Safe to call repeatedly.
    pub fn logout(&self) {
        self.clear_token();
        log::info!("Logged out");
    }

    // ========================================================================
    // Token synchronization
    // ========================================================================

    /// Persist, install and publish `token`, in that order.
    ///
    /// The store is written first: if that fails the header and state are
    /// left as they were.
    fn set_token(&self, token: &str) -> Result<()> {
        let _sync = self.lock_token_sync();
        self.store.set(TOKEN_KEY, token)?;
        if let Err(e) = self.client.set_bearer(token) {
            // Roll the store back to whatever the session still holds
            let restore = match self.token() {
                Some(previous) => self.store.set(TOKEN_KEY, &previous),
                None => self.store.remove(TOKEN_KEY),
            };
            if let Err(restore_err) = restore {
                log::error!("Could not restore persisted token: {}", restore_err);
            }
            return Err(e);
        }
        let token = token.to_string();
        self.state.send_modify(|state| state.token = Some(token));
        Ok(())
    }

    /// Drop the token and user everywhere
    fn clear_token(&self) {
        let _sync = self.lock_token_sync();
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            log::error!(
                "Could not remove persisted token from {}, it will be restored on next start: {}",
                self.store.location(),
                e
            );
        }
        self.client.clear_bearer();
        self.state.send_modify(|state| {
            state.user = None;
            state.token = None;
        });
    }

    fn lock_token_sync(&self) -> std::sync::MutexGuard<'_, ()> {
        // The guarded data is (), so a poisoned lock is still usable
        self.token_sync.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<S: TokenStore> std::fmt::Debug for AuthSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("AuthSession")
            .field("base_url", &self.client.base_url())
            .field("authenticated", &state.is_authenticated())
            .field("user", &state.user.as_ref().map(|u| u.username.as_str()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::MemoryTokenStore;

    fn client() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9", None).unwrap()
    }

    /// Store whose writes always fail
    struct ReadOnlyStore;

    impl TokenStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::storage("read-only"))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(Error::storage("read-only"))
        }
    }

    #[test]
    fn test_new_without_token() {
        let session = AuthSession::new(client(), MemoryTokenStore::new());
        assert!(!session.is_authenticated());
        assert!(session.client().authorization().is_none());
    }

    #[test]
    fn test_new_restores_token() {
        let session = AuthSession::new(client(), MemoryTokenStore::with_token("abc123"));
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("abc123"));
        assert_eq!(session.client().authorization().as_deref(), Some("Bearer abc123"));
        assert!(session.user().is_none());
    }

    #[test]
    fn test_new_ignores_empty_token() {
        let session = AuthSession::new(client(), MemoryTokenStore::with_token(""));
        assert!(!session.is_authenticated());
        assert!(session.client().authorization().is_none());
    }

    #[test]
    fn test_new_ignores_unusable_token() {
        let session = AuthSession::new(client(), MemoryTokenStore::with_token("bad\ntoken"));
        assert!(!session.is_authenticated());
        assert!(session.client().authorization().is_none());
    }

    #[test]
    fn test_set_token_failure_changes_nothing() {
        let session = AuthSession::new(client(), ReadOnlyStore);
        assert!(session.set_token("abc123").is_err());
        assert!(!session.is_authenticated());
        assert!(session.client().authorization().is_none());
    }

    #[test]
    fn test_set_token_rejects_bad_header_and_restores_store() {
        let session = AuthSession::new(client(), MemoryTokenStore::with_token("good"));
        assert!(session.set_token("bad\ntoken").is_err());
        assert_eq!(session.token().as_deref(), Some("good"));
        assert_eq!(session.store().get(TOKEN_KEY).unwrap().as_deref(), Some("good"));
        assert_eq!(session.client().authorization().as_deref(), Some("Bearer good"));
    }

    #[test]
    fn test_logout_clears_even_when_store_fails() {
        let session = AuthSession::new(client(), ReadOnlyStore);
        session.client().set_bearer("stale").unwrap();
        session.logout();
        assert!(!session.is_authenticated());
        assert!(session.client().authorization().is_none());
    }

    #[test]
    fn test_subscribe_sees_logout() {
        let session = AuthSession::new(client(), MemoryTokenStore::with_token("abc123"));
        let mut rx = session.subscribe();
        assert!(rx.borrow_and_update().is_authenticated());

        session.logout();
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_authenticated());
    }

    #[test]
    fn test_debug_hides_token() {
        let session = AuthSession::new(client(), MemoryTokenStore::with_token("secret-token"));
        let debug = format!("{:?}", session);
        assert!(debug.contains("authenticated: true"));
        assert!(!debug.contains("secret-token"));
    }
}
