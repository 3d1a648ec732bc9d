//! Data models for the chat API auth endpoints

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Current-user profile as returned by `/api/users/me` and `/api/register`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    /// Kept exactly as the server sent it
    pub created_at: String,
}

impl User {
    /// Parse `created_at` for display.
    ///
    /// Accepts RFC 3339 as well as the offset-less ISO-8601 form the API
    /// emits (`2024-05-01T12:30:00.123456`).
    pub fn created_at_time(&self) -> Option<NaiveDateTime> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.created_at) {
            return Some(dt.naive_utc());
        }
        NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%dT%H:%M:%S%.f").ok()
    }
}

/// Credentials for the token endpoint (sent form-encoded)
#[derive(Debug, Clone, Serialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
}

/// Payload for the registration endpoint (sent as JSON)
#[derive(Debug, Clone, Serialize)]
pub struct RegisterData {
    pub username: String,
    pub email: String,
    pub password: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

/// Structured error body (`{"detail": "..."}`)
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// Outcome of a login attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoginResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Outcome of a registration attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegisterResult {
    pub fn ok(user: User) -> Self {
        Self {
            success: true,
            user: Some(user),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            user: None,
            error: Some(error.into()),
        }
    }
}

/// Point-in-time view of the session, published to subscribers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl SessionState {
    /// A token is present; no expiry is tracked
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}
