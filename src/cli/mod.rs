//! CLI module for PMP LLM Relay
//!
//! - `serve`: run the HTTP gateway
//! - `probe`: probe every provider once and print the routing order

pub mod probe;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::observability::init_tracing;

/// PMP LLM Relay - Resilient multi-provider chat gateway
#[derive(Parser)]
#[command(name = "llm-relay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP gateway
    Serve,

    /// Probe all providers and print the healthy order
    Probe(probe::ProbeArgs),
}

/// `.env`, layered config and the tracing subscriber, shared by every command
fn bootstrap() -> AppConfig {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });
    init_tracing(&config.logging, &config.observability.tracing);

    config
}
