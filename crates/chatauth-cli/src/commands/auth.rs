//! Session commands
//!
//! login, register, whoami, status and logout.

use anyhow::{bail, Result};
use chatauth_core::{TokenStore, User, TOKEN_KEY};
use serde::Serialize;
use tabled::Tabled;

use super::Context;
use crate::output::{
    mask_token, print_error, print_json, print_single, print_success, OutputFormat,
};

/// User row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct UserRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Username")]
    pub username: String,
    #[tabled(rename = "Email")]
    pub email: String,
    #[tabled(rename = "Active")]
    pub is_active: bool,
    #[tabled(rename = "Created")]
    pub created_at: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        let created_at = user
            .created_at_time()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| user.created_at.clone());
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_active: user.is_active,
            created_at,
        }
    }
}

/// Session status for table display
#[derive(Debug, Serialize, Tabled)]
pub struct StatusRow {
    #[tabled(rename = "Authenticated")]
    pub authenticated: bool,
    #[tabled(rename = "Token")]
    pub token: String,
    #[tabled(rename = "Token file")]
    pub token_file: String,
}

pub async fn login(ctx: &Context, username: &str, password: &str) -> Result<()> {
    let result = ctx.session.login(username, password).await;

    if ctx.format == OutputFormat::Json {
        print_json(&result)?;
    }
    if !result.success {
        bail!(result.error.unwrap_or_default());
    }
    if ctx.format == OutputFormat::Table {
        match ctx.session.user() {
            Some(user) => print_success(&format!("Logged in as {}", user.username), ctx.quiet),
            None => print_success(
                "Logged in, but the user profile could not be loaded",
                ctx.quiet,
            ),
        }
    }
    Ok(())
}

pub async fn register(ctx: &Context, username: &str, email: &str, password: &str) -> Result<()> {
    let result = ctx.session.register(username, email, password).await;

    if ctx.format == OutputFormat::Json {
        print_json(&result)?;
    }
    let user = match result.user {
        Some(user) if result.success => user,
        _ => bail!(result.error.unwrap_or_default()),
    };
    if ctx.format == OutputFormat::Table {
        print_success(
            &format!("Registered {0}. Run `chatauth login {0}` to sign in.", user.username),
            ctx.quiet,
        );
        print_single(&UserRow::from(&user), ctx.format)?;
    }
    Ok(())
}

pub async fn whoami(ctx: &Context) -> Result<()> {
    if !ctx.session.is_authenticated() {
        bail!("Not logged in");
    }

    ctx.session.fetch_user().await;

    match ctx.session.user() {
        Some(user) => print_single(&UserRow::from(&user), ctx.format),
        None if ctx.session.is_authenticated() => {
            bail!("Could not load the current user; the stored token may be stale")
        }
        None => bail!("Session expired and was cleared"),
    }
}

pub fn status(ctx: &Context) -> Result<()> {
    let token = ctx.session.token();
    let row = StatusRow {
        authenticated: ctx.session.is_authenticated(),
        token: mask_token(token.as_deref()),
        token_file: ctx.session.store().path().display().to_string(),
    };
    print_single(&row, ctx.format)
}

pub fn logout(ctx: &Context) -> Result<()> {
    ctx.session.logout();
    if let Some(warning) = leftover_token_warning(ctx.session.store()) {
        print_error(&warning);
    }
    print_success("Logged out", ctx.quiet);
    Ok(())
}

/// Warning for a token that is still on disk after logout
///
/// The in-memory session is already cleared at this point, but the next start
/// would pick the token up again.
fn leftover_token_warning<S: TokenStore>(store: &S) -> Option<String> {
    match store.get(TOKEN_KEY) {
        Ok(None) => None,
        Ok(Some(_)) => Some(format!(
            "Token could not be removed from {}; delete it to stay logged out",
            store.location()
        )),
        Err(e) => Some(format!(
            "Could not check {} for a leftover token: {}",
            store.location(),
            e
        )),
    }
}
