//! # CLI Command Implementations

use crate::api::{self, AuthKeys};
use crate::config::{Backend, Config};
use serde::Serialize;
use std::path::{Path, PathBuf};
use visionsprint_core::{
    Hackathon, Identity, Role, Stage, VisionSprintError, export_snapshot, import_snapshot,
    now_unix, primitives::MAX_SNAPSHOT_SIZE, snapshot_blake3, snapshot_checksum,
};

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), VisionSprintError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| VisionSprintError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(VisionSprintError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, VisionSprintError> {
    let canonical = path.canonicalize().map_err(|e| {
        VisionSprintError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(VisionSprintError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    Ok(canonical)
}

/// Resolve an output path: its parent must be an existing directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, VisionSprintError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        VisionSprintError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    if !canonical_parent.is_dir() {
        return Err(VisionSprintError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| VisionSprintError::IoError("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

fn read_snapshot_file(path: &Path) -> Result<Vec<u8>, VisionSprintError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_SNAPSHOT_SIZE as u64)?;
    std::fs::read(&validated)
        .map_err(|e| VisionSprintError::IoError(format!("Read file: {}", e)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), VisionSprintError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| VisionSprintError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// STORAGE HELPERS
// =============================================================================

/// Open the configured database.
///
/// The `memory` backend reads a snapshot file at the database path if one
/// exists, and starts empty otherwise.
pub fn open_hackathon(config: &Config) -> Result<Hackathon, VisionSprintError> {
    match config.backend {
        Backend::Redb => Hackathon::with_redb(&config.database),
        Backend::Memory => {
            let mut hackathon = Hackathon::new();
            if config.database.exists() {
                let data = read_snapshot_file(&config.database)?;
                hackathon.restore(import_snapshot(&data)?)?;
            }
            Ok(hackathon)
        }
    }
}

/// Persist changes made through the `memory` backend. Redb commits as it goes.
pub fn save_hackathon(hackathon: &Hackathon, config: &Config) -> Result<(), VisionSprintError> {
    if hackathon.is_persistent() {
        return Ok(());
    }
    let data = export_snapshot(hackathon)?;
    std::fs::write(&config.database, &data)
        .map_err(|e| VisionSprintError::IoError(format!("Write db: {}", e)))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: Config) -> Result<(), VisionSprintError> {
    config.require_auth_secret()?;
    let hackathon = open_hackathon(&config)?;
    if !hackathon.is_persistent() {
        tracing::warn!("memory backend: state is lost when the server stops");
    }

    println!("VisionSprint Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.bind_addr());
    println!("  Backend:  {}", config.backend.as_str());
    println!("  Database: {:?}", config.database);
    println!("  Stage:    {}", hackathon.stage()?);
    println!("  Admins:   {} configured email(s)", config.admin_emails.len());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(config, hackathon).await
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create an empty database.
pub fn cmd_init(config: &Config, force: bool) -> Result<(), VisionSprintError> {
    let path = &config.database;
    if path.exists() {
        if !force {
            return Err(VisionSprintError::Conflict(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path)
            .map_err(|e| VisionSprintError::IoError(format!("Remove db: {}", e)))?;
    }

    let hackathon = match config.backend {
        Backend::Redb => Hackathon::with_redb(path)?,
        Backend::Memory => Hackathon::new(),
    };
    save_hackathon(&hackathon, config)?;
    println!(
        "Initialized new {} database at {:?}",
        config.backend.as_str(),
        path
    );
    Ok(())
}

// =============================================================================
// STATUS & STAGE COMMANDS
// =============================================================================

pub fn cmd_status(config: &Config, json_mode: bool) -> Result<(), VisionSprintError> {
    let hackathon = open_hackathon(config)?;
    let status = hackathon.status()?;

    if json_mode {
        return print_json(&serde_json::json!({
            "database": config.database.to_string_lossy(),
            "backend": config.backend.as_str(),
            "status": status,
        }));
    }

    println!("VisionSprint Status");
    println!("===================");
    println!("Database: {:?}", config.database);
    println!("Backend:  {}", config.backend.as_str());
    println!();
    println!("Stage:       {}", status.stage);
    println!("Users:       {} ({} admin)", status.users, status.admins);
    println!("Ideas:       {}", status.ideas);
    println!("Votes:       {}", status.votes);
    println!("Joins:       {}", status.joins);
    println!("Teams:       {}", status.teams);
    println!("Submissions: {}", status.submissions);
    println!("Reactions:   {}", status.reactions);
    Ok(())
}

fn print_stage(hackathon: &Hackathon, json_mode: bool) -> Result<(), VisionSprintError> {
    let progress = hackathon.stage_progress()?;
    if json_mode {
        return print_json(&progress);
    }

    println!("Current Stage: {}", progress.current);
    match progress.next {
        Some(next) => println!("Next Stage:    {}", next),
        None => println!("Final stage reached"),
    }
    println!();
    println!("Ideas:              {}", progress.ideas);
    println!("Votes:              {}", progress.votes);
    println!("Teams:              {}", progress.teams);
    println!("Submissions:        {}", progress.submissions);
    println!("Teams without demo: {}", progress.teams_pending);
    println!("Joiners not teamed: {}", progress.unassigned_joiners);
    Ok(())
}

pub fn cmd_stage_show(config: &Config, json_mode: bool) -> Result<(), VisionSprintError> {
    print_stage(&open_hackathon(config)?, json_mode)
}

pub fn cmd_stage_advance(config: &Config, json_mode: bool) -> Result<(), VisionSprintError> {
    let mut hackathon = open_hackathon(config)?;
    let stage = hackathon.advance_stage_unchecked()?;
    save_hackathon(&hackathon, config)?;
    tracing::info!(event = "stage_changed", stage = stage.name(), "Stage advanced from CLI");
    print_stage(&hackathon, json_mode)
}

pub fn cmd_stage_set(config: &Config, stage: Stage, json_mode: bool) -> Result<(), VisionSprintError> {
    let mut hackathon = open_hackathon(config)?;
    hackathon.set_stage_unchecked(stage)?;
    save_hackathon(&hackathon, config)?;
    tracing::info!(event = "stage_changed", stage = stage.name(), "Stage set from CLI");
    print_stage(&hackathon, json_mode)
}

// =============================================================================
// USER COMMANDS
// =============================================================================

pub fn cmd_users_list(config: &Config, json_mode: bool) -> Result<(), VisionSprintError> {
    let users = open_hackathon(config)?.users()?;
    if json_mode {
        return print_json(&users);
    }

    println!("{:>5}  {:<7} {:<32} NAME", "ID", "ROLE", "EMAIL");
    for user in &users {
        println!(
            "{:>5}  {:<7} {:<32} {}",
            user.id.0,
            user.role.as_str(),
            user.email,
            user.name
        );
    }
    println!();
    println!("{} user(s)", users.len());
    Ok(())
}

pub fn cmd_users_set_role(
    config: &Config,
    email: &str,
    role: Role,
    json_mode: bool,
) -> Result<(), VisionSprintError> {
    let mut hackathon = open_hackathon(config)?;
    let user = hackathon.set_role_by_email(email, role)?;
    save_hackathon(&hackathon, config)?;
    tracing::info!(event = "role_changed", user = user.id.0, role = role.as_str(), "Role set from CLI");

    if json_mode {
        return print_json(&user);
    }
    println!("{} is now {}", user.email, user.role.as_str());
    Ok(())
}

// =============================================================================
// LISTING COMMANDS
// =============================================================================

pub fn cmd_ideas(config: &Config, json_mode: bool) -> Result<(), VisionSprintError> {
    let ideas = open_hackathon(config)?.ideas()?;
    if json_mode {
        return print_json(&ideas);
    }

    println!("{:>4}  {:>5}  {:>6}  {:<6} TITLE (AUTHOR)", "RANK", "VOTES", "JOINED", "TEAM");
    for (rank, row) in ideas.iter().enumerate() {
        let team = row
            .team
            .map(|t| t.0.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}  {:>5}  {:>6}  {:<6} {} ({})",
            rank + 1,
            row.votes,
            row.joiners.len(),
            team,
            row.idea.title,
            row.author_name
        );
    }
    Ok(())
}

fn print_teams(teams: &[visionsprint_core::TeamSummary]) {
    for summary in teams {
        let members: Vec<&str> = summary.members.iter().map(|m| m.name.as_str()).collect();
        let demo = if summary.submission.is_some() {
            "demo submitted"
        } else {
            "no demo"
        };
        println!(
            "#{} {} [{}] ({}): {}",
            summary.team.id.0,
            summary.team.name,
            summary.idea_title,
            demo,
            members.join(", ")
        );
    }
}

pub fn cmd_teams_list(config: &Config, json_mode: bool) -> Result<(), VisionSprintError> {
    let teams = open_hackathon(config)?.teams()?;
    if json_mode {
        return print_json(&teams);
    }
    print_teams(&teams);
    println!();
    println!("{} team(s)", teams.len());
    Ok(())
}

pub fn cmd_teams_auto(config: &Config, json_mode: bool) -> Result<(), VisionSprintError> {
    let mut hackathon = open_hackathon(config)?;
    let created = hackathon.auto_form_teams_unchecked()?;
    save_hackathon(&hackathon, config)?;
    tracing::info!(event = "teams_auto_formed", count = created.len(), "Teams formed from CLI");

    let summaries = created
        .iter()
        .map(|t| hackathon.team(t.id))
        .collect::<Result<Vec<_>, _>>()?;
    if json_mode {
        return print_json(&summaries);
    }
    print_teams(&summaries);
    println!();
    println!("Formed {} team(s)", summaries.len());
    Ok(())
}

pub fn cmd_showcase(config: &Config, json_mode: bool) -> Result<(), VisionSprintError> {
    let entries = open_hackathon(config)?.showcase(None)?;
    if json_mode {
        return print_json(&entries);
    }

    for entry in &entries {
        let tally: Vec<String> = entry
            .reactions
            .tally
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(kind, count)| format!("{} {}", kind.emoji(), count))
            .collect();
        println!(
            "{:>4}  {} ({})  {}",
            entry.reactions.total,
            entry.team_name,
            entry.idea_title,
            tally.join("  ")
        );
        println!(
            "      {}",
            entry
                .submission
                .embed_url
                .as_deref()
                .unwrap_or(&entry.submission.video_url)
        );
    }
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT / HASH
// =============================================================================

pub fn cmd_export(config: &Config, output: &Path) -> Result<(), VisionSprintError> {
    let validated_output = validate_output_path(output)?;
    let hackathon = open_hackathon(config)?;
    let data = export_snapshot(&hackathon)?;

    std::fs::write(&validated_output, &data)
        .map_err(|e| VisionSprintError::IoError(format!("Write file: {}", e)))?;

    println!("Checksum: {}", snapshot_checksum(&data));
    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

pub fn cmd_import(config: &Config, input: &Path) -> Result<(), VisionSprintError> {
    let data = read_snapshot_file(input)?;
    let snapshot = import_snapshot(&data)?;
    let counts = (snapshot.users.len(), snapshot.ideas.len(), snapshot.teams.len());

    let mut hackathon = open_hackathon(config)?;
    hackathon.restore(snapshot)?;
    save_hackathon(&hackathon, config)?;

    println!(
        "Imported {} users, {} ideas, {} teams into {:?}",
        counts.0, counts.1, counts.2, config.database
    );
    Ok(())
}

pub fn cmd_hash(config: &Config, json_mode: bool) -> Result<(), VisionSprintError> {
    let data = export_snapshot(&open_hackathon(config)?)?;
    let hash = snapshot_blake3(&data);

    if json_mode {
        return print_json(&serde_json::json!({
            "algorithm": "blake3",
            "hash": hash,
            "bytes": data.len(),
        }));
    }
    println!("BLAKE3: {}", hash);
    Ok(())
}

// =============================================================================
// TOKEN COMMAND
// =============================================================================

/// Print an identity assertion signed with the configured secret.
pub fn cmd_token(
    config: &Config,
    email: &str,
    name: &str,
    image: Option<String>,
    ttl: u64,
) -> Result<(), VisionSprintError> {
    let keys = AuthKeys::from_secret(config.require_auth_secret()?, config.session_ttl_secs)?;
    let mut identity = Identity::new(email, name);
    identity.image = image;

    let token = keys.sign_assertion(&identity, now_unix().saturating_add(ttl))?;
    println!("{}", token);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
