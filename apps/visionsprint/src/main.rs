//! # VisionSprint - Hackathon Server
//!
//! The main binary for the VisionSprint hackathon platform.
//!
//! This application provides:
//! - HTTP JSON API server (axum-based) for the web front end
//! - CLI interface for running an event offline
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │             apps/visionsprint (THE BINARY)     │
//! │                                                │
//! │  ┌─────────────┐          ┌─────────────┐      │
//! │  │    CLI      │          │  HTTP API   │      │
//! │  │   (clap)    │          │   (axum)    │      │
//! │  └──────┬──────┘          └──────┬──────┘      │
//! │         └──────────┬─────────────┘             │
//! │                    ▼                           │
//! │           ┌──────────────────┐                 │
//! │           │ visionsprint-core│                 │
//! │           │   (THE RULES)    │                 │
//! │           └──────────────────┘                 │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! VISIONSPRINT_AUTH_SECRET=... visionsprint server --port 8080
//!
//! # Offline admin
//! visionsprint stage advance
//! visionsprint teams auto
//! visionsprint users promote lead@example.com
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visionsprint::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // VISIONSPRINT_LOG_FORMAT=json switches to machine-parseable output.
    let log_format =
        std::env::var("VISIONSPRINT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "visionsprint=info,visionsprint_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  __   ___     _          ___          _     _
  \ \ / (_)___(_)___ _ _ / __|_ __ _ _(_)_ _| |_
   \ V /| (_-<| / _ \ ' \\__ \ '_ \ '_| | ' \  _|
    \_/ |_/__/|_\___/_||_|___/ .__/_| |_|_||_\__|
                             |_|
  Hackathon Server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
