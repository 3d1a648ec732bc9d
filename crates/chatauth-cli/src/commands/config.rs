//! Config commands
//!
//! Shows the effective configuration and where each value came from.

use anyhow::Result;
use chatauth_core::config::{
    ConfigSource, ENV_API_URL, ENV_LOGOUT_ON_401, ENV_TIMEOUT_SECS, ENV_TOKEN_PATH,
};
use chatauth_core::SessionConfig;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use super::Context;
use crate::output::{print_error, print_info, print_output};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
}

/// Config row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

pub fn execute(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => print_output(&config_rows(&ctx.config), ctx.format),
        ConfigAction::Get { key } => get_config(ctx, &key),
    }
}

fn get_config(ctx: &Context, key: &str) -> Result<()> {
    let rows = config_rows(&ctx.config);
    match rows.iter().find(|r| r.key.eq_ignore_ascii_case(key)) {
        Some(row) => print_info(&format!("{} = {}", row.key, row.value), ctx.quiet),
        None => {
            print_error(&format!("Config key not found: {}", key));
            let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
            print_info(&format!("Available keys: {}", keys.join(", ")), ctx.quiet);
        }
    }
    Ok(())
}

fn row(key: &str, value: String, source: ConfigSource) -> ConfigRow {
    ConfigRow {
        key: key.to_string(),
        value,
        source: source.to_string(),
    }
}

fn config_rows(config: &SessionConfig) -> Vec<ConfigRow> {
    vec![
        row(
            ENV_API_URL,
            config.api_url.clone(),
            SessionConfig::source_of(ENV_API_URL),
        ),
        row(
            ENV_TOKEN_PATH,
            config.token_path.display().to_string(),
            SessionConfig::source_of(ENV_TOKEN_PATH),
        ),
        row(
            ENV_TIMEOUT_SECS,
            config
                .timeout
                .map(|t| t.as_secs().to_string())
                .unwrap_or_else(|| "none".to_string()),
            SessionConfig::source_of(ENV_TIMEOUT_SECS),
        ),
        row(
            ENV_LOGOUT_ON_401,
            config.logout_on_unauthorized.to_string(),
            SessionConfig::source_of(ENV_LOGOUT_ON_401),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_config_rows_cover_every_setting() {
        let config = SessionConfig {
            api_url: "https://chat.example.com".to_string(),
            token_path: PathBuf::from("/tmp/storage.json"),
            timeout: None,
            logout_on_unauthorized: false,
        };
        let rows = config_rows(&config);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].value, "https://chat.example.com");
        assert_eq!(rows[2].value, "none");
        assert_eq!(rows[3].value, "false");
    }
}
