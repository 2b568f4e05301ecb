//! # In-Memory Store
//!
//! `BTreeMap`-backed implementation of [`HackathonStore`]. Volatile; used by
//! tests, the `memory` backend and as the target of snapshot restores.

use crate::store::{Change, HackathonStore};
use crate::system::Stage;
use crate::{
    Idea, IdeaId, IdKind, Join, Reaction, ReactionKind, Submission, SubmissionId, Team, TeamId,
    User, UserId, VisionSprintError, Vote,
};
use std::collections::BTreeMap;

/// In-memory hackathon state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    stage: Stage,
    counters: BTreeMap<IdKind, u64>,
    users: BTreeMap<UserId, User>,
    email_index: BTreeMap<String, UserId>,
    ideas: BTreeMap<IdeaId, Idea>,
    votes: BTreeMap<(UserId, IdeaId), Vote>,
    joins: BTreeMap<(UserId, IdeaId), Join>,
    teams: BTreeMap<TeamId, Team>,
    submissions: BTreeMap<SubmissionId, Submission>,
    reactions: BTreeMap<(SubmissionId, UserId, ReactionKind), Reaction>,
}

impl MemoryStore {
    /// Create an empty store in the submission stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&mut self, change: Change) {
        if let Some((kind, floor)) = change.counter_floor() {
            let counter = self.counters.entry(kind).or_insert(1);
            *counter = (*counter).max(floor);
        }

        match change {
            Change::PutUser(user) => {
                if let Some(previous) = self.users.get(&user.id) {
                    if previous.email != user.email {
                        self.email_index.remove(&previous.email);
                    }
                }
                self.email_index.insert(user.email.clone(), user.id);
                self.users.insert(user.id, user);
            }
            Change::PutIdea(idea) => {
                self.ideas.insert(idea.id, idea);
            }
            Change::DeleteIdea(id) => {
                self.ideas.remove(&id);
            }
            Change::PutVote(vote) => {
                self.votes.insert((vote.user, vote.idea), vote);
            }
            Change::DeleteVote { user, idea } => {
                self.votes.remove(&(user, idea));
            }
            Change::PutJoin(join) => {
                self.joins.insert((join.user, join.idea), join);
            }
            Change::DeleteJoin { user, idea } => {
                self.joins.remove(&(user, idea));
            }
            Change::PutTeam(team) => {
                self.teams.insert(team.id, team);
            }
            Change::DeleteTeam(id) => {
                self.teams.remove(&id);
            }
            Change::PutSubmission(submission) => {
                self.submissions.insert(submission.id, submission);
            }
            Change::PutReaction(reaction) => {
                self.reactions.insert(
                    (reaction.submission, reaction.user, reaction.kind),
                    reaction,
                );
            }
            Change::DeleteReaction {
                submission,
                user,
                kind,
            } => {
                self.reactions.remove(&(submission, user, kind));
            }
            Change::SetStage(stage) => {
                self.stage = stage;
            }
            Change::SetCounter { .. } => {}
        }
    }
}

impl HackathonStore for MemoryStore {
    fn stage(&self) -> Result<Stage, VisionSprintError> {
        Ok(self.stage)
    }

    fn next_id(&self, kind: IdKind) -> Result<u64, VisionSprintError> {
        Ok(self.counters.get(&kind).copied().unwrap_or(1))
    }

    fn user(&self, id: UserId) -> Result<Option<User>, VisionSprintError> {
        Ok(self.users.get(&id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, VisionSprintError> {
        Ok(self
            .email_index
            .get(email)
            .and_then(|id| self.users.get(id))
            .cloned())
    }

    fn users(&self) -> Result<Vec<User>, VisionSprintError> {
        Ok(self.users.values().cloned().collect())
    }

    fn idea(&self, id: IdeaId) -> Result<Option<Idea>, VisionSprintError> {
        Ok(self.ideas.get(&id).cloned())
    }

    fn ideas(&self) -> Result<Vec<Idea>, VisionSprintError> {
        Ok(self.ideas.values().cloned().collect())
    }

    fn votes(&self) -> Result<Vec<Vote>, VisionSprintError> {
        Ok(self.votes.values().copied().collect())
    }

    fn joins(&self) -> Result<Vec<Join>, VisionSprintError> {
        Ok(self.joins.values().copied().collect())
    }

    fn team(&self, id: TeamId) -> Result<Option<Team>, VisionSprintError> {
        Ok(self.teams.get(&id).cloned())
    }

    fn teams(&self) -> Result<Vec<Team>, VisionSprintError> {
        Ok(self.teams.values().cloned().collect())
    }

    fn submission(&self, id: SubmissionId) -> Result<Option<Submission>, VisionSprintError> {
        Ok(self.submissions.get(&id).cloned())
    }

    fn submissions(&self) -> Result<Vec<Submission>, VisionSprintError> {
        Ok(self.submissions.values().cloned().collect())
    }

    fn reactions(&self) -> Result<Vec<Reaction>, VisionSprintError> {
        Ok(self.reactions.values().copied().collect())
    }

    fn commit(&mut self, changes: Vec<Change>) -> Result<(), VisionSprintError> {
        // Every change is infallible here, so applying in order is atomic.
        for change in changes {
            self.apply(change);
        }
        Ok(())
    }

    fn votes_by_user(&self, user: UserId) -> Result<Vec<Vote>, VisionSprintError> {
        Ok(self
            .votes
            .range((user, IdeaId(0))..=(user, IdeaId(u64::MAX)))
            .map(|(_, v)| *v)
            .collect())
    }

    fn joins_by_user(&self, user: UserId) -> Result<Vec<Join>, VisionSprintError> {
        Ok(self
            .joins
            .range((user, IdeaId(0))..=(user, IdeaId(u64::MAX)))
            .map(|(_, j)| *j)
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
