//! `pfa-api` - CLI for the PFA counseling authentication service
//!
//! This binary serves the HTTP API, manages accounts in the local database,
//! and talks to a running server.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use pfa_api::auth::Accounts;
use pfa_api::cli::{Cli, Command, ConfigCommand, UserCommand};
use pfa_api::storage::SqliteUserRepository;
use pfa_api::{init_logging, server, Client, Config, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // `config validate` reports load errors itself
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        validate_config(file.clone().or_else(|| cli.config.clone()));
        return Ok(());
    }

    let mut config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(serve) => {
            if let Some(host) = serve.host {
                config.server.host = host;
            }
            if let Some(port) = serve.port {
                config.server.port = port;
            }
            config.validate()?;
            server::serve(&config).await?;
        }
        Command::User(cmd) => handle_user(&config, cmd).await?,
        Command::Login(cmd) => {
            let login = Client::new(cmd.url)?
                .login(&cmd.username, &cmd.password)
                .await?;
            println!("{}", login.token);
        }
        Command::Whoami(cmd) => {
            let user = Client::new(cmd.url)?.me(&cmd.token).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Config(cmd) => handle_config(&config, &cmd)?,
    }
    Ok(())
}

fn accounts(config: &Config) -> anyhow::Result<Accounts> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("opening database {}", path.display()))?;
    let repo = SqliteUserRepository::new(Arc::new(storage));
    Ok(Accounts::new(Arc::new(repo), config.auth.bcrypt_cost))
}

async fn handle_user(config: &Config, cmd: UserCommand) -> anyhow::Result<()> {
    let accounts = accounts(config)?;
    match cmd {
        UserCommand::Add {
            username,
            password,
            admin,
        } => {
            let user = accounts.create(&username, &password, admin).await?;
            println!(
                "Created {}{}",
                user.username,
                if user.is_admin { " (admin)" } else { "" }
            );
        }
        UserCommand::List { json } => {
            let users = accounts.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else if users.is_empty() {
                println!("No accounts.");
            } else {
                println!("{:<6} {:<24} {:<6} CREATED", "ID", "USERNAME", "ADMIN");
                for user in users {
                    println!(
                        "{:<6} {:<24} {:<6} {}",
                        user.id,
                        user.username,
                        if user.is_admin { "yes" } else { "no" },
                        user.created_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
        UserCommand::Remove { username } => {
            accounts.delete(&username).await?;
            println!("Deleted {username}");
        }
        UserCommand::Passwd { username, password } => {
            accounts.set_password(&username, &password).await?;
            println!("Password changed for {username}");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json: true } => {
            println!("{}", serde_json::to_string_pretty(&redacted(config))?);
        }
        ConfigCommand::Show { json: false } => {
            println!("Current Configuration");
            println!("=====================");
            println!();
            println!("[Server]");
            println!("  Listen address:     {}:{}", config.server.host, config.server.port);
            println!();
            println!("[Auth]");
            println!(
                "  JWT secret:         {}",
                if config.auth.jwt_secret.is_some() { "set" } else { "NOT SET" }
            );
            println!("  Issuer:             {}", config.auth.issuer);
            println!("  Token TTL (hours):  {}", config.auth.token_ttl_hours);
            println!("  bcrypt cost:        {}", config.auth.bcrypt_cost);
            println!("  Seed defaults:      {}", config.auth.seed_default_users);
            println!();
            println!("[Storage]");
            println!("  Database path:      {}", config.database_path().display());
            println!(
                "  Prune every (min):  {}",
                config.storage.prune_interval_minutes
            );
            println!();
            println!("[Rate limit]");
            println!("  Enabled:            {}", config.rate_limit.enabled);
            println!("  Auth per minute:    {}", config.rate_limit.auth_per_minute);
            println!("  API per minute:     {}", config.rate_limit.api_per_minute);
            println!();
            println!("[CORS]");
            println!("  Origins:            {}", config.cors.origins.join(", "));
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => validate_config(file.clone()),
    }
    Ok(())
}

fn validate_config(file: Option<std::path::PathBuf>) {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(config) => match config.jwt_secret() {
            Ok(_) => println!("Configuration is valid."),
            Err(e) => println!("Configuration is valid, but cannot serve: {e}"),
        },
        Err(e) => println!("Configuration error: {e}"),
    }
}

fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.auth.jwt_secret.is_some() {
        config.auth.jwt_secret = Some("<redacted>".to_string());
    }
    config
}
