//! # Core Type Definitions
//!
//! This module contains the records that make up a hackathon:
//! - Identifiers (`UserId`, `IdeaId`, `TeamId`, `SubmissionId`)
//! - Participants (`User`, `Role`, `Identity`)
//! - Project records (`Idea`, `Vote`, `Join`, `Team`, `Submission`, `Reaction`)
//! - Error types (`VisionSprintError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer timestamps (unix seconds), never floating point
//! - Implement `Ord` on identifiers for deterministic ordering in `BTreeMap`/`BTreeSet`

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Unique identifier of a project idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdeaId(pub u64);

/// Unique identifier of a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u64);

/// Unique identifier of a demo submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub u64);

/// The kinds of record that draw ids from a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdKind {
    User,
    Idea,
    Team,
    Submission,
}

impl IdKind {
    pub const ALL: [IdKind; 4] = [IdKind::User, IdKind::Idea, IdKind::Team, IdKind::Submission];

    /// Metadata key under which the next free id is stored.
    #[must_use]
    pub const fn counter_key(self) -> &'static str {
        match self {
            IdKind::User => "next_user_id",
            IdKind::Idea => "next_idea_id",
            IdKind::Team => "next_team_id",
            IdKind::Submission => "next_submission_id",
        }
    }
}

// =============================================================================
// USERS
// =============================================================================

/// Permission level of a user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = VisionSprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            other => Err(VisionSprintError::InvalidInput(format!(
                "unknown role '{}'",
                other
            ))),
        }
    }
}

/// A verified identity as reported by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            image: None,
        }
    }
}

/// A registered participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Lower-cased, unique.
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub role: Role,
    pub created_at: u64,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// =============================================================================
// IDEAS, VOTES, JOINS
// =============================================================================

/// A project idea proposed during the submission stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub id: IdeaId,
    pub title: String,
    pub description: String,
    pub author: UserId,
    pub created_at: u64,
    pub updated_at: u64,
}

/// A user's vote for an idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vote {
    pub user: UserId,
    pub idea: IdeaId,
    pub created_at: u64,
}

/// A user's declared intent to build an idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Join {
    pub user: UserId,
    pub idea: IdeaId,
    pub created_at: u64,
}

// =============================================================================
// TEAMS & SUBMISSIONS
// =============================================================================

/// A team formed around a single idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub idea: IdeaId,
    pub members: BTreeSet<UserId>,
    pub created_at: u64,
}

impl Team {
    #[must_use]
    pub fn has_member(&self, user: UserId) -> bool {
        self.members.contains(&user)
    }
}

/// A team's demo video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub team: TeamId,
    /// The link exactly as submitted.
    pub video_url: String,
    /// Embeddable preview URL, when the host is recognised.
    pub embed_url: Option<String>,
    pub description: String,
    pub submitted_by: UserId,
    pub submitted_at: u64,
}

// =============================================================================
// REACTIONS
// =============================================================================

/// Emoji reactions available on the showcase stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Fire,
    Clap,
    Heart,
    MindBlown,
    Rocket,
    Laugh,
}

impl ReactionKind {
    /// Every reaction kind, in display order.
    pub const ALL: [ReactionKind; 6] = [
        ReactionKind::Fire,
        ReactionKind::Clap,
        ReactionKind::Heart,
        ReactionKind::MindBlown,
        ReactionKind::Rocket,
        ReactionKind::Laugh,
    ];

    /// Stable single-byte code used in storage keys.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            ReactionKind::Fire => 0,
            ReactionKind::Clap => 1,
            ReactionKind::Heart => 2,
            ReactionKind::MindBlown => 3,
            ReactionKind::Rocket => 4,
            ReactionKind::Laugh => 5,
        }
    }

    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ReactionKind::Fire),
            1 => Some(ReactionKind::Clap),
            2 => Some(ReactionKind::Heart),
            3 => Some(ReactionKind::MindBlown),
            4 => Some(ReactionKind::Rocket),
            5 => Some(ReactionKind::Laugh),
            _ => None,
        }
    }

    #[must_use]
    pub fn emoji(self) -> &'static str {
        match self {
            ReactionKind::Fire => "🔥",
            ReactionKind::Clap => "👏",
            ReactionKind::Heart => "❤️",
            ReactionKind::MindBlown => "🤯",
            ReactionKind::Rocket => "🚀",
            ReactionKind::Laugh => "😂",
        }
    }
}

/// One user's reaction of one kind to one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reaction {
    pub submission: SubmissionId,
    pub user: UserId,
    pub kind: ReactionKind,
    pub created_at: u64,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in hackathon operations.
#[derive(Debug, Error)]
pub enum VisionSprintError {
    /// A field failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: u64 },

    /// The actor lacks permission for the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The operation is not available in the current stage.
    #[error("'{action}' is closed during the {stage} stage")]
    StageClosed {
        action: &'static str,
        stage: &'static str,
    },

    /// A per-user or per-team limit would be exceeded.
    #[error("Limit reached: {0}")]
    LimitReached(String),

    /// The operation conflicts with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No valid credentials were presented.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl VisionSprintError {
    #[must_use]
    pub fn user_not_found(id: UserId) -> Self {
        Self::NotFound {
            kind: "user",
            id: id.0,
        }
    }

    #[must_use]
    pub fn idea_not_found(id: IdeaId) -> Self {
        Self::NotFound {
            kind: "idea",
            id: id.0,
        }
    }

    #[must_use]
    pub fn team_not_found(id: TeamId) -> Self {
        Self::NotFound {
            kind: "team",
            id: id.0,
        }
    }

    #[must_use]
    pub fn submission_not_found(id: SubmissionId) -> Self {
        Self::NotFound {
            kind: "submission",
            id: id.0,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
