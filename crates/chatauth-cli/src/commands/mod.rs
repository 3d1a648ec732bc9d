//! CLI commands module

pub mod auth;
pub mod config;

use crate::output::OutputFormat;
use chatauth_core::{AuthSession, FileTokenStore, SessionConfig};

/// Shared context for all commands
pub struct Context {
    pub session: AuthSession<FileTokenStore>,
    pub config: SessionConfig,
    pub format: OutputFormat,
    pub quiet: bool,
}
