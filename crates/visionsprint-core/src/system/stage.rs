//! # Hackathon Stages
//!
//! The hackathon moves through three ordered stages. Each gated action
//! ([`Capability`]) is open in a fixed set of stages, and [`StageGate`]
//! rejects everything else with [`VisionSprintError::StageClosed`].
//!
//! ## Stage Definitions
//!
//! | Stage      | Open capabilities                                 |
//! |------------|---------------------------------------------------|
//! | Submission | submit/edit ideas, vote, join, form teams          |
//! | Sprint     | form teams, submit demos                           |
//! | Showcase   | react to submissions                               |
//!
//! Admins move the hackathon forward with `advance` or jump with `set`.

use crate::VisionSprintError;
use serde::{Deserialize, Serialize};

// =============================================================================
// STAGE ENUM
// =============================================================================

/// Hackathon stages, in chronological order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Ideas are proposed, voted on and joined.
    #[default]
    Submission,
    /// Teams build and submit their demos.
    Sprint,
    /// Everyone watches the demos and reacts.
    Showcase,
}

impl Stage {
    /// Every stage, in order.
    pub const ALL: [Stage; 3] = [Stage::Submission, Stage::Sprint, Stage::Showcase];

    /// Get the stage name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Submission => "Submission",
            Stage::Sprint => "Sprint",
            Stage::Showcase => "Showcase",
        }
    }

    /// Get the next stage, if any.
    #[must_use]
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Submission => Some(Stage::Sprint),
            Stage::Sprint => Some(Stage::Showcase),
            Stage::Showcase => None,
        }
    }

    /// Get the previous stage, if any.
    #[must_use]
    pub fn previous(&self) -> Option<Stage> {
        match self {
            Stage::Submission => None,
            Stage::Sprint => Some(Stage::Submission),
            Stage::Showcase => Some(Stage::Sprint),
        }
    }

    /// Check if this stage is terminal (Showcase).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Showcase)
    }

    /// Numeric code used for storage.
    #[must_use]
    pub const fn code(self) -> u64 {
        match self {
            Stage::Submission => 0,
            Stage::Sprint => 1,
            Stage::Showcase => 2,
        }
    }

    /// Decode a stored stage code.
    pub fn from_code(code: u64) -> Result<Self, VisionSprintError> {
        match code {
            0 => Ok(Stage::Submission),
            1 => Ok(Stage::Sprint),
            2 => Ok(Stage::Showcase),
            other => Err(VisionSprintError::SerializationError(format!(
                "unknown stage code {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Stage {
    type Err = VisionSprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submission" => Ok(Stage::Submission),
            "sprint" => Ok(Stage::Sprint),
            "showcase" => Ok(Stage::Showcase),
            other => Err(VisionSprintError::InvalidInput(format!(
                "unknown stage '{}' (expected submission, sprint or showcase)",
                other
            ))),
        }
    }
}

// =============================================================================
// CAPABILITIES
// =============================================================================

/// Actions whose availability depends on the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    SubmitIdea,
    EditIdea,
    Vote,
    Join,
    FormTeam,
    SubmitDemo,
    React,
}

impl Capability {
    /// Stages in which this capability is open.
    #[must_use]
    pub fn allowed_stages(&self) -> &'static [Stage] {
        match self {
            Capability::SubmitIdea
            | Capability::EditIdea
            | Capability::Vote
            | Capability::Join => &[Stage::Submission],
            Capability::FormTeam => &[Stage::Submission, Stage::Sprint],
            Capability::SubmitDemo => &[Stage::Sprint],
            Capability::React => &[Stage::Showcase],
        }
    }

    /// Short name used in error messages.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Capability::SubmitIdea => "submit idea",
            Capability::EditIdea => "edit idea",
            Capability::Vote => "vote",
            Capability::Join => "join",
            Capability::FormTeam => "form team",
            Capability::SubmitDemo => "submit demo",
            Capability::React => "react",
        }
    }
}

// =============================================================================
// STAGE GATE
// =============================================================================

/// Checks capabilities against the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageGate {
    stage: Stage,
}

impl StageGate {
    #[must_use]
    pub fn new(stage: Stage) -> Self {
        Self { stage }
    }

    /// Whether `capability` is open right now.
    #[must_use]
    pub fn allows(&self, capability: Capability) -> bool {
        capability.allowed_stages().contains(&self.stage)
    }

    /// Fail with `StageClosed` unless `capability` is open.
    pub fn check(&self, capability: Capability) -> Result<(), VisionSprintError> {
        if self.allows(capability) {
            Ok(())
        } else {
            Err(VisionSprintError::StageClosed {
                action: capability.action(),
                stage: self.stage.name(),
            })
        }
    }
}

// =============================================================================
// STAGE PROGRESS
// =============================================================================

/// Snapshot of where the hackathon stands relative to the next stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    pub current: Stage,
    pub next: Option<Stage>,
    pub ideas: usize,
    pub votes: usize,
    pub teams: usize,
    pub submissions: usize,
    /// Teams that have not yet submitted a demo.
    pub teams_pending: usize,
    /// Users who joined an idea but are not on any team.
    pub unassigned_joiners: usize,
}

// =============================================================================
// TESTS
// =============================================================================
