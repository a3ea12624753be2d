pub mod commands;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, StoreBackend};

#[derive(Parser)]
#[command(name = "finance-tracker-api")]
#[command(about = "Personal finance tracker API - bills, budgets, expenses and wishlists")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides API_PORT / PORT)")]
        port: Option<u16>,
        #[arg(long, value_enum, help = "Document store backend (overrides DATABASE_BACKEND)")]
        store: Option<StoreBackend>,
    },

    #[command(about = "Mint a development bearer token signed with SECURITY_JWT_SECRET")]
    Token {
        #[arg(help = "Subject (user id) the token identifies")]
        subject: String,
        #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command.unwrap_or(Commands::Serve { port: None, store: None }) {
        Commands::Serve { port, store } => commands::serve::handle(config, port, store).await,
        Commands::Token { subject, hours } => commands::token::handle(&config, subject, hours, output_format),
    }
}
