//! Command-line interface for pfa-api.
//!
//! This module provides the CLI structure for the `pfa-api` binary. The
//! handlers live in `main.rs`.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, LoginCommand, ServeCommand, UserCommand, WhoamiCommand};

use crate::logging::Verbosity;

/// pfa-api - Authentication service for the PFA counseling application
///
/// Serves `POST /api/v1/auth/login`, which exchanges a username and password
/// for a bearer token, and manages the accounts behind it.
#[derive(Debug, Parser)]
#[command(name = "pfa-api")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve(ServeCommand),

    /// Manage user accounts in the local database
    #[command(subcommand)]
    User(UserCommand),

    /// Log in against a running server and print the token
    Login(LoginCommand),

    /// Show the account behind a token
    Whoami(WhoamiCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
