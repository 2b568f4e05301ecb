//! # VisionSprint CLI Module
//!
//! Admin command line for running the server and managing an event offline.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database
//! - `status` - Show record counts
//! - `stage` - Show, advance or set the stage
//! - `users` - List users, promote or demote admins
//! - `ideas` - Show the idea leaderboard
//! - `teams` - List teams or form them from joins
//! - `showcase` - Show submissions ranked by reactions
//! - `export` / `import` - Snapshot backup and restore
//! - `hash` - BLAKE3 hash of the current snapshot
//! - `token` - Mint a development identity assertion

mod commands;

use crate::config::{Backend, Config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use visionsprint_core::{Stage, VisionSprintError};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// VisionSprint - hackathon server
///
/// Pitch ideas, vote, form teams, ship a demo, react on the showcase.
#[derive(Parser, Debug)]
#[command(name = "visionsprint")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database (overrides config)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (ACID database) or "memory" (snapshot file)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Show record counts
    Status,

    /// Show or change the stage
    Stage {
        #[command(subcommand)]
        action: Option<StageAction>,
    },

    /// Manage users
    Users {
        #[command(subcommand)]
        action: Option<UsersAction>,
    },

    /// Show the idea leaderboard
    Ideas,

    /// List or form teams
    Teams {
        #[command(subcommand)]
        action: Option<TeamsAction>,
    },

    /// Show submissions ranked by reactions
    Showcase,

    /// Export a snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a snapshot into an empty database
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compute BLAKE3 hash of the current snapshot
    Hash,

    /// Mint an identity assertion for local development
    Token {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        name: String,

        /// Avatar URL
        #[arg(short, long)]
        image: Option<String>,

        /// Validity in seconds
        #[arg(short, long, default_value = "300")]
        ttl: u64,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum StageAction {
    /// Show the current stage and progress
    Show,
    /// Move to the next stage
    Advance,
    /// Jump to a stage
    Set {
        /// submission, sprint or showcase
        stage: Stage,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum UsersAction {
    /// List all users
    List,
    /// Make a user an admin
    Promote { email: String },
    /// Make an admin a regular member
    Demote { email: String },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum TeamsAction {
    /// List all teams
    List,
    /// Form teams for every idea from its joiners
    Auto,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve config from file, environment and global flags.
fn resolve_config(cli: &Cli) -> Result<Config, VisionSprintError> {
    let mut config = Config::load(cli.config.as_deref())?;
    apply_flags(cli, &mut config)?;
    Ok(config)
}

/// Global flags take precedence over the file and the environment.
fn apply_flags(cli: &Cli, config: &mut Config) -> Result<(), VisionSprintError> {
    if let Some(database) = &cli.database {
        config.database.clone_from(database);
    }
    if let Some(backend) = &cli.backend {
        config.backend = backend.parse::<Backend>()?;
    }
    Ok(())
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), VisionSprintError> {
    let mut config = resolve_config(&cli)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            cmd_server(config).await
        }
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Status) | None => cmd_status(&config, json_mode),
        Some(Commands::Stage { action }) => match action.unwrap_or(StageAction::Show) {
            StageAction::Show => cmd_stage_show(&config, json_mode),
            StageAction::Advance => cmd_stage_advance(&config, json_mode),
            StageAction::Set { stage } => cmd_stage_set(&config, stage, json_mode),
        },
        Some(Commands::Users { action }) => match action.unwrap_or(UsersAction::List) {
            UsersAction::List => cmd_users_list(&config, json_mode),
            UsersAction::Promote { email } => {
                cmd_users_set_role(&config, &email, visionsprint_core::Role::Admin, json_mode)
            }
            UsersAction::Demote { email } => {
                cmd_users_set_role(&config, &email, visionsprint_core::Role::Member, json_mode)
            }
        },
        Some(Commands::Ideas) => cmd_ideas(&config, json_mode),
        Some(Commands::Teams { action }) => match action.unwrap_or(TeamsAction::List) {
            TeamsAction::List => cmd_teams_list(&config, json_mode),
            TeamsAction::Auto => cmd_teams_auto(&config, json_mode),
        },
        Some(Commands::Showcase) => cmd_showcase(&config, json_mode),
        Some(Commands::Export { output }) => cmd_export(&config, &output),
        Some(Commands::Import { input }) => cmd_import(&config, &input),
        Some(Commands::Hash) => cmd_hash(&config, json_mode),
        Some(Commands::Token {
            email,
            name,
            image,
            ttl,
        }) => cmd_token(&config, &email, &name, image, ttl),
    }
}
