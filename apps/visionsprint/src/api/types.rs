//! # API Request/Response Types
//!
//! JSON structures for the HTTP API. Every response carries `success`.

use serde::{Deserialize, Serialize};
use visionsprint_core::{
    HackathonStatus, IdeaId, IdeaSummary, ReactionKind, ReactionSummary, Role, ShowcaseEntry,
    Stage, StageProgress, Submission, TeamId, TeamSummary, User, UserId,
};

// =============================================================================
// COMMON
// =============================================================================

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Success without a payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}

impl AckResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: HackathonStatus,
}

// =============================================================================
// STAGE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResponse {
    pub success: bool,
    pub stage: Stage,
    pub name: String,
    pub progress: StageProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStageRequest {
    pub stage: Stage,
}

// =============================================================================
// AUTH & USERS
// =============================================================================

/// Exchange an identity assertion for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub assertion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: u64,
    pub user: User,
}

/// The signed-in user with their participation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub success: bool,
    pub user: User,
    pub votes: Vec<IdeaId>,
    pub votes_remaining: usize,
    pub joined: Vec<IdeaId>,
    pub team: Option<TeamId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

// =============================================================================
// IDEAS
// =============================================================================

/// Body for creating or editing an idea.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaResponse {
    pub success: bool,
    pub idea: IdeaSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeasResponse {
    pub success: bool,
    pub ideas: Vec<IdeaSummary>,
}

/// Result of a vote or unvote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub success: bool,
    pub idea: IdeaSummary,
    pub votes_remaining: usize,
}

/// Result of a join or leave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub success: bool,
    pub idea: IdeaSummary,
    pub joined: Vec<IdeaId>,
}

// =============================================================================
// TEAMS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeamRequest {
    pub idea: IdeaId,
    pub name: String,
    pub members: Vec<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamResponse {
    pub success: bool,
    pub team: TeamSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamsResponse {
    pub success: bool,
    pub teams: Vec<TeamSummary>,
}

// =============================================================================
// SUBMISSIONS & REACTIONS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub video_url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
    pub submission: Submission,
    pub reactions: ReactionSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionsResponse {
    pub success: bool,
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionRequest {
    pub kind: ReactionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionResponse {
    pub success: bool,
    /// Whether the reaction is set after the toggle.
    pub active: bool,
    pub reactions: ReactionSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowcaseResponse {
    pub success: bool,
    pub stage: Stage,
    pub entries: Vec<ShowcaseEntry>,
}

// =============================================================================
// EXPORT
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    /// Base64 encoded snapshot.
    pub data: String,
    pub checksum: u64,
    pub blake3: String,
}

impl ExportResponse {
    #[must_use]
    pub fn new(data: &[u8], checksum: u64, blake3: String) -> Self {
        Self {
            success: true,
            data: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, data),
            checksum,
            blake3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashResponse {
    pub success: bool,
    pub algorithm: String,
    pub hash: String,
}
