//! Command-line interface.
//!
//! Without a subcommand the binary runs the portal server. Subcommands:
//! - `status` - Check a running portal's health
//! - `config check` - Validate the configuration file
//! - `token check <token>` - Check an invite token's format offline
//! - `price <amount> <currency>` - Format a price, optionally discounted

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::HealthResponse;
use crate::config::{BackendKind, Config};
use crate::invite::validate_token_format;
use crate::pricing::{compute_discounted_price, format_money};

#[derive(Parser, Debug)]
#[command(name = "staydesk")]
#[command(author, version, about = "Hotel booking portal", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "staydesk.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Portal URL for commands that talk to a running server
    #[arg(long, env = "STAYDESK_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that a running portal answers
    Status,

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Invite token helpers
    #[command(subcommand)]
    Token(TokenCommands),

    /// Print a formatted price
    Price {
        /// Amount in the currency's stored unit
        amount: u64,
        /// Currency code, e.g. IDR
        currency: String,
        /// Discount percent to apply (0-100)
        #[arg(short, long)]
        discount: Option<u8>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Check a token's format without contacting the backend
    Check {
        token: String,
    },
}

/// Run a CLI command
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Status) => cmd_status(cli).await,
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli),
        Some(Commands::Token(TokenCommands::Check { token })) => cmd_token_check(token),
        Some(Commands::Price {
            amount,
            currency,
            discount,
        }) => cmd_price(*amount, currency, *discount),
        None => {
            // No subcommand means start the server - this is handled in main.rs
            Ok(())
        }
    }
}

async fn cmd_status(cli: &Cli) -> Result<()> {
    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to create HTTP client")?;

    println!("Connecting to {}...", cli.api_url);

    let url = format!("{}/health", cli.api_url.trim_end_matches('/'));
    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to connect to server. Is staydesk running?")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Server returned error {}: {}", status, body);
    }

    let health: HealthResponse = response
        .json()
        .await
        .context("Failed to parse health response")?;

    println!();
    println!("Version:    v{}", health.version);
    println!("Status:     [OK] {}", health.status);
    println!();
    Ok(())
}

fn cmd_config_check(cli: &Cli) -> Result<()> {
    let config_path = &cli.config;

    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!(
            "[!!] Configuration file not found: {}",
            config_path.display()
        );
        println!();
        println!("A default configuration will be used when starting the server.");
        return Ok(());
    }

    match Config::load(config_path) {
        Ok(config) => {
            println!("[OK] Configuration file is valid!");
            println!();
            println!("Server:");
            println!("  Listen:        {}:{}", config.server.host, config.server.port);
            println!();
            println!("Backend:");
            match config.backend.kind {
                BackendKind::Http => {
                    println!("  Kind:          http");
                    println!("  URL:           {}", config.backend.url);
                }
                BackendKind::Memory => println!("  Kind:          memory"),
            }
            match config.backend.request_timeout_secs {
                Some(secs) => println!("  Timeout:       {}s", secs),
                None => println!("  Timeout:       transport default"),
            }
            println!();
            println!("Cache:");
            println!("  Stale after:   {}s", config.cache.stale_seconds);
            println!("  Read retries:  {}", config.cache.query_retries);
            println!();

            if config.backend.kind == BackendKind::Memory {
                println!("Warnings:");
                println!("  [!] In-memory backend selected - all data is lost on restart");
                println!();
            }
            Ok(())
        }
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            println!();
            anyhow::bail!("Invalid configuration file");
        }
    }
}

fn cmd_token_check(token: &str) -> Result<()> {
    match validate_token_format(token) {
        Ok(()) => {
            println!("[OK] Token is well-formed");
            println!("     Whether it can be redeemed is decided by the backend.");
            Ok(())
        }
        Err(message) => anyhow::bail!("{}", message),
    }
}

fn price_line(amount: u64, currency: &str, discount: Option<u8>) -> Result<String> {
    let Some(percent) = discount else {
        return Ok(format_money(amount, currency));
    };
    let discounted = compute_discounted_price(amount, percent)?;
    Ok(format!(
        "{} (was {}, -{}%)",
        format_money(discounted, currency),
        format_money(amount, currency),
        percent
    ))
}

fn cmd_price(amount: u64, currency: &str, discount: Option<u8>) -> Result<()> {
    println!("{}", price_line(amount, &currency.to_uppercase(), discount)?);
    Ok(())
}
