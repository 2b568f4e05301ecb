//! # Store Abstraction
//!
//! [`HackathonStore`] is the seam between the rules in [`crate::Hackathon`]
//! and the storage backends. Reads are individual calls; writes are collected
//! into a list of [`Change`]s and applied by [`HackathonStore::commit`] as one
//! atomic unit, so a rejected operation never leaves partial state behind.

use crate::system::Stage;
use crate::{
    Idea, IdeaId, IdKind, Join, Reaction, ReactionKind, Submission, SubmissionId, Team, TeamId,
    User, UserId, VisionSprintError, Vote,
};

// =============================================================================
// CHANGE SET
// =============================================================================

/// A single write, applied as part of a [`HackathonStore::commit`] batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    PutUser(User),
    PutIdea(Idea),
    DeleteIdea(IdeaId),
    PutVote(Vote),
    DeleteVote {
        user: UserId,
        idea: IdeaId,
    },
    PutJoin(Join),
    DeleteJoin {
        user: UserId,
        idea: IdeaId,
    },
    PutTeam(Team),
    DeleteTeam(TeamId),
    PutSubmission(Submission),
    PutReaction(Reaction),
    DeleteReaction {
        submission: SubmissionId,
        user: UserId,
        kind: ReactionKind,
    },
    SetStage(Stage),
    /// Raise the next id of `kind` to at least `next`. Counters never move back.
    SetCounter {
        kind: IdKind,
        next: u64,
    },
}

impl Change {
    /// The id sequence this change advances, with the lowest next id it implies.
    #[must_use]
    pub fn counter_floor(&self) -> Option<(IdKind, u64)> {
        match self {
            Change::PutUser(u) => Some((IdKind::User, u.id.0.saturating_add(1))),
            Change::PutIdea(i) => Some((IdKind::Idea, i.id.0.saturating_add(1))),
            Change::PutTeam(t) => Some((IdKind::Team, t.id.0.saturating_add(1))),
            Change::PutSubmission(s) => Some((IdKind::Submission, s.id.0.saturating_add(1))),
            Change::SetCounter { kind, next } => Some((*kind, *next)),
            _ => None,
        }
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Storage interface shared by the in-memory and redb backends.
///
/// List methods return records in ascending id (or key) order.
pub trait HackathonStore {
    /// Current stage. A fresh store is in [`Stage::Submission`].
    fn stage(&self) -> Result<Stage, VisionSprintError>;

    /// Next unused id of the given kind (ids start at 1).
    fn next_id(&self, kind: IdKind) -> Result<u64, VisionSprintError>;

    fn user(&self, id: UserId) -> Result<Option<User>, VisionSprintError>;

    /// Lookup by normalized (lower-case) email.
    fn user_by_email(&self, email: &str) -> Result<Option<User>, VisionSprintError>;

    fn users(&self) -> Result<Vec<User>, VisionSprintError>;

    fn idea(&self, id: IdeaId) -> Result<Option<Idea>, VisionSprintError>;

    fn ideas(&self) -> Result<Vec<Idea>, VisionSprintError>;

    /// All votes ordered by (user, idea).
    fn votes(&self) -> Result<Vec<Vote>, VisionSprintError>;

    /// All joins ordered by (user, idea).
    fn joins(&self) -> Result<Vec<Join>, VisionSprintError>;

    fn team(&self, id: TeamId) -> Result<Option<Team>, VisionSprintError>;

    fn teams(&self) -> Result<Vec<Team>, VisionSprintError>;

    fn submission(&self, id: SubmissionId) -> Result<Option<Submission>, VisionSprintError>;

    fn submissions(&self) -> Result<Vec<Submission>, VisionSprintError>;

    /// All reactions ordered by (submission, user, kind).
    fn reactions(&self) -> Result<Vec<Reaction>, VisionSprintError>;

    /// Apply every change or none of them.
    fn commit(&mut self, changes: Vec<Change>) -> Result<(), VisionSprintError>;

    // -------------------------------------------------------------------------
    // Derived lookups. Backends override these when they can do better than a
    // full scan.
    // -------------------------------------------------------------------------

    fn votes_by_user(&self, user: UserId) -> Result<Vec<Vote>, VisionSprintError> {
        Ok(self.votes()?.into_iter().filter(|v| v.user == user).collect())
    }

    fn votes_for_idea(&self, idea: IdeaId) -> Result<Vec<Vote>, VisionSprintError> {
        Ok(self.votes()?.into_iter().filter(|v| v.idea == idea).collect())
    }

    fn joins_by_user(&self, user: UserId) -> Result<Vec<Join>, VisionSprintError> {
        Ok(self.joins()?.into_iter().filter(|j| j.user == user).collect())
    }

    fn joins_for_idea(&self, idea: IdeaId) -> Result<Vec<Join>, VisionSprintError> {
        Ok(self.joins()?.into_iter().filter(|j| j.idea == idea).collect())
    }

    fn team_of(&self, user: UserId) -> Result<Option<Team>, VisionSprintError> {
        Ok(self.teams()?.into_iter().find(|t| t.has_member(user)))
    }

    fn team_for_idea(&self, idea: IdeaId) -> Result<Option<Team>, VisionSprintError> {
        Ok(self.teams()?.into_iter().find(|t| t.idea == idea))
    }

    fn submission_for_team(&self, team: TeamId) -> Result<Option<Submission>, VisionSprintError> {
        Ok(self.submissions()?.into_iter().find(|s| s.team == team))
    }

    fn reactions_for(&self, submission: SubmissionId) -> Result<Vec<Reaction>, VisionSprintError> {
        Ok(self
            .reactions()?
            .into_iter()
            .filter(|r| r.submission == submission)
            .collect())
    }
}
