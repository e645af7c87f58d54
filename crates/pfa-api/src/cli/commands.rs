//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::client::DEFAULT_BASE_URL;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Interface to bind, overriding the configuration
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind, overriding the configuration
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Account management commands.
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create an account
    Add {
        /// Login name (letters, digits, '_', '.', '-')
        username: String,

        /// Initial password
        #[arg(short, long)]
        password: String,

        /// Grant admin privileges
        #[arg(long)]
        admin: bool,
    },

    /// List accounts
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Delete an account
    Remove {
        /// Login name
        username: String,
    },

    /// Change an account's password
    Passwd {
        /// Login name
        username: String,

        /// New password
        #[arg(short, long)]
        password: String,
    },
}

/// Login command arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub url: String,

    /// Login name
    #[arg(short, long)]
    pub username: String,

    /// Password
    #[arg(short, long)]
    pub password: String,
}

/// Whoami command arguments.
#[derive(Debug, Args)]
pub struct WhoamiCommand {
    /// API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub url: String,

    /// Bearer token from `pfa-api login`
    #[arg(short, long)]
    pub token: String,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
