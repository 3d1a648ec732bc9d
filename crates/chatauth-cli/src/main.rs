//! chatauth CLI - terminal front-end for the chat API session
//!
//! Logs in, registers accounts and inspects the locally persisted session.

mod commands;
mod output;

use anyhow::Result;
use chatauth_core::config::{ENV_API_URL, ENV_TOKEN_PATH};
use chatauth_core::SessionConfig;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chatauth")]
#[command(author, version, about = "Chat API authentication CLI", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Override the API base URL (or set CHATAUTH_API_URL env var)
    #[arg(long, env = "CHATAUTH_API_URL", global = true)]
    api_url: Option<String>,

    /// Override the token file (or set CHATAUTH_TOKEN_PATH env var)
    #[arg(long, env = "CHATAUTH_TOKEN_PATH", global = true)]
    token_file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login {
        /// Account name
        username: String,

        /// Password (or set CHATAUTH_PASSWORD env var)
        #[arg(long, short, env = "CHATAUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account (does not log in)
    Register {
        /// Account name
        username: String,

        /// Email address
        email: String,

        /// Password (or set CHATAUTH_PASSWORD env var)
        #[arg(long, short, env = "CHATAUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show the user the stored token belongs to
    Whoami,

    /// Show whether a session token is stored
    Status,

    /// Forget the stored session token
    Logout,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Flags win over whatever the environment already holds
    if let Some(api_url) = &cli.api_url {
        std::env::set_var(ENV_API_URL, api_url);
    }
    if let Some(token_file) = &cli.token_file {
        std::env::set_var(ENV_TOKEN_PATH, token_file);
    }

    let config = SessionConfig::from_env()?;
    log::debug!("Using API at {}", config.api_url);
    let session = chatauth_core::open_session(&config)?;

    let ctx = commands::Context {
        session,
        config,
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&ctx, &username, &password).await
        }
        Commands::Register {
            username,
            email,
            password,
        } => commands::auth::register(&ctx, &username, &email, &password).await,
        Commands::Whoami => commands::auth::whoami(&ctx).await,
        Commands::Status => commands::auth::status(&ctx),
        Commands::Logout => commands::auth::logout(&ctx),
        Commands::Config { action } => commands::config::execute(&ctx, action),
    }
}
