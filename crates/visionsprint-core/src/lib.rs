//! # visionsprint-core
//!
//! Domain rules for VisionSprint, a small hackathon platform.
//!
//! Participants sign in, pitch ideas, vote for and join the ideas they like,
//! get grouped into teams, submit a demo video and finally react to each
//! other's demos on the showcase page. The event moves through three stages
//! (submission, sprint, showcase) and every action is only open in some of
//! them.
//!
//! ## Architectural Constraints
//!
//! - All rules live in [`Hackathon`]; the HTTP and CLI layers only translate
//! - Storage is behind [`HackathonStore`]; writes are committed as atomic batches
//! - NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod embed;
pub mod export;
pub mod hackathon;
pub mod primitives;
pub mod storage;
pub mod store;
pub mod system;
pub mod types;
pub mod views;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    IdKind, Idea, IdeaId, Identity, Join, Reaction, ReactionKind, Role, Submission, SubmissionId,
    Team, TeamId, User, UserId, VisionSprintError, Vote,
};

// =============================================================================
// RE-EXPORTS: Service & Storage
// =============================================================================

pub use embed::{VideoLink, normalize_video_url};
#[cfg(feature = "crypto-hash")]
pub use export::snapshot_blake3;
pub use export::{
    IdCounters, Snapshot, SnapshotHeader, export_snapshot, import_snapshot, snapshot_checksum,
};
pub use hackathon::{Hackathon, StorageBackend, now_unix};
pub use storage::{MemoryStore, RedbStore};
pub use store::{Change, HackathonStore};
pub use views::{
    HackathonStatus, IdeaSummary, MemberView, ReactionSummary, ShowcaseEntry, TeamSummary,
    rank_ideas, sort_showcase, tally_reactions,
};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::{Capability, Stage, StageGate, StageProgress};
