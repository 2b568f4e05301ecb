//! # redb-backed Hackathon Storage
//!
//! A disk-backed [`HackathonStore`] using the redb embedded database, providing:
//! - ACID transactions (every [`Change`] batch is one write transaction)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are stored as postcard bytes keyed by their numeric id. Votes,
//! joins and reactions are pure key sets whose value is the creation time.

use crate::store::{Change, HackathonStore};
use crate::system::Stage;
use crate::{
    Idea, IdeaId, IdKind, Join, Reaction, ReactionKind, Submission, SubmissionId, Team, TeamId,
    User, UserId, VisionSprintError, Vote,
};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for users: UserId(u64) -> serialized User bytes
const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Table for the email index: lower-case email -> UserId(u64)
const EMAIL_INDEX: TableDefinition<&str, u64> = TableDefinition::new("email_index");

/// Table for ideas: IdeaId(u64) -> serialized Idea bytes
const IDEAS: TableDefinition<u64, &[u8]> = TableDefinition::new("ideas");

/// Table for votes: (user, idea) -> created_at
const VOTES: TableDefinition<(u64, u64), u64> = TableDefinition::new("votes");

/// Table for joins: (user, idea) -> created_at
const JOINS: TableDefinition<(u64, u64), u64> = TableDefinition::new("joins");

/// Table for teams: TeamId(u64) -> serialized Team bytes
const TEAMS: TableDefinition<u64, &[u8]> = TableDefinition::new("teams");

/// Table for submissions: SubmissionId(u64) -> serialized Submission bytes
const SUBMISSIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("submissions");

/// Table for reactions: (submission, user, kind code) -> created_at
const REACTIONS: TableDefinition<(u64, u64, u8), u64> = TableDefinition::new("reactions");

/// Table for metadata: key string -> value u64 (stage code, id counters)
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const STAGE_KEY: &str = "stage";

type RecordTable = TableDefinition<'static, u64, &'static [u8]>;

fn storage_err(e: impl std::fmt::Display) -> VisionSprintError {
    VisionSprintError::IoError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, VisionSprintError> {
    postcard::to_allocvec(value).map_err(|e| VisionSprintError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, VisionSprintError> {
    postcard::from_bytes(bytes).map_err(|e| VisionSprintError::SerializationError(e.to_string()))
}

fn decode_kind(code: u8) -> Result<ReactionKind, VisionSprintError> {
    ReactionKind::from_code(code).ok_or_else(|| {
        VisionSprintError::SerializationError(format!("unknown reaction code {}", code))
    })
}

/// A disk-backed hackathon store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a hackathon database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VisionSprintError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            write_txn.open_table(USERS).map_err(storage_err)?;
            write_txn.open_table(EMAIL_INDEX).map_err(storage_err)?;
            write_txn.open_table(IDEAS).map_err(storage_err)?;
            write_txn.open_table(VOTES).map_err(storage_err)?;
            write_txn.open_table(JOINS).map_err(storage_err)?;
            write_txn.open_table(TEAMS).map_err(storage_err)?;
            write_txn.open_table(SUBMISSIONS).map_err(storage_err)?;
            write_txn.open_table(REACTIONS).map_err(storage_err)?;
            write_txn.open_table(METADATA).map_err(storage_err)?;
            write_txn.commit().map_err(storage_err)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), VisionSprintError> {
        self.db.compact().map_err(storage_err)?;
        Ok(())
    }

    fn metadata(&self, key: &str) -> Result<Option<u64>, VisionSprintError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(METADATA).map_err(storage_err)?;
        Ok(table.get(key).map_err(storage_err)?.map(|v| v.value()))
    }

    fn record<T: DeserializeOwned>(
        &self,
        def: RecordTable,
        id: u64,
    ) -> Result<Option<T>, VisionSprintError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(def).map_err(storage_err)?;
        match table.get(id).map_err(storage_err)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    fn records<T: DeserializeOwned>(&self, def: RecordTable) -> Result<Vec<T>, VisionSprintError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(def).map_err(storage_err)?;

        let mut out = Vec::new();
        for entry in table.iter().map_err(storage_err)? {
            let (_, value) = entry.map_err(storage_err)?;
            out.push(decode(value.value())?);
        }
        Ok(out)
    }

    fn pairs(
        &self,
        def: TableDefinition<'static, (u64, u64), u64>,
        user: Option<UserId>,
    ) -> Result<Vec<(UserId, IdeaId, u64)>, VisionSprintError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(def).map_err(storage_err)?;

        let iter = match user {
            Some(u) => table
                .range((u.0, 0u64)..=(u.0, u64::MAX))
                .map_err(storage_err)?,
            None => table.iter().map_err(storage_err)?,
        };

        let mut out = Vec::new();
        for entry in iter {
            let (key, value) = entry.map_err(storage_err)?;
            let (user_id, idea_id) = key.value();
            out.push((UserId(user_id), IdeaId(idea_id), value.value()));
        }
        Ok(out)
    }

    fn reaction_rows(
        &self,
        submission: Option<SubmissionId>,
    ) -> Result<Vec<Reaction>, VisionSprintError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(REACTIONS).map_err(storage_err)?;

        let iter = match submission {
            Some(s) => table
                .range((s.0, 0u64, 0u8)..=(s.0, u64::MAX, u8::MAX))
                .map_err(storage_err)?,
            None => table.iter().map_err(storage_err)?,
        };

        let mut out = Vec::new();
        for entry in iter {
            let (key, value) = entry.map_err(storage_err)?;
            let (submission_id, user_id, code) = key.value();
            out.push(Reaction {
                submission: SubmissionId(submission_id),
                user: UserId(user_id),
                kind: decode_kind(code)?,
                created_at: value.value(),
            });
        }
        Ok(out)
    }
}

// =============================================================================
// HACKATHONSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl HackathonStore for RedbStore {
    fn stage(&self) -> Result<Stage, VisionSprintError> {
        match self.metadata(STAGE_KEY)? {
            Some(code) => Stage::from_code(code),
            None => Ok(Stage::default()),
        }
    }

    fn next_id(&self, kind: IdKind) -> Result<u64, VisionSprintError> {
        Ok(self.metadata(kind.counter_key())?.unwrap_or(1))
    }

    fn user(&self, id: UserId) -> Result<Option<User>, VisionSprintError> {
        self.record(USERS, id.0)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, VisionSprintError> {
        let id = {
            let read_txn = self.db.begin_read().map_err(storage_err)?;
            let table = read_txn.open_table(EMAIL_INDEX).map_err(storage_err)?;
            table.get(email).map_err(storage_err)?.map(|v| v.value())
        };
        match id {
            Some(id) => self.record(USERS, id),
            None => Ok(None),
        }
    }

    fn users(&self) -> Result<Vec<User>, VisionSprintError> {
        self.records(USERS)
    }

    fn idea(&self, id: IdeaId) -> Result<Option<Idea>, VisionSprintError> {
        self.record(IDEAS, id.0)
    }

    fn ideas(&self) -> Result<Vec<Idea>, VisionSprintError> {
        self.records(IDEAS)
    }

    fn votes(&self) -> Result<Vec<Vote>, VisionSprintError> {
        Ok(self
            .pairs(VOTES, None)?
            .into_iter()
            .map(|(user, idea, created_at)| Vote {
                user,
                idea,
                created_at,
            })
            .collect())
    }

    fn joins(&self) -> Result<Vec<Join>, VisionSprintError> {
        Ok(self
            .pairs(JOINS, None)?
            .into_iter()
            .map(|(user, idea, created_at)| Join {
                user,
                idea,
                created_at,
            })
            .collect())
    }

    fn team(&self, id: TeamId) -> Result<Option<Team>, VisionSprintError> {
        self.record(TEAMS, id.0)
    }

    fn teams(&self) -> Result<Vec<Team>, VisionSprintError> {
        self.records(TEAMS)
    }

    fn submission(&self, id: SubmissionId) -> Result<Option<Submission>, VisionSprintError> {
        self.record(SUBMISSIONS, id.0)
    }

    fn submissions(&self) -> Result<Vec<Submission>, VisionSprintError> {
        self.records(SUBMISSIONS)
    }

    fn reactions(&self) -> Result<Vec<Reaction>, VisionSprintError> {
        self.reaction_rows(None)
    }

    fn commit(&mut self, changes: Vec<Change>) -> Result<(), VisionSprintError> {
        if changes.is_empty() {
            return Ok(());
        }

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut users = write_txn.open_table(USERS).map_err(storage_err)?;
            let mut emails = write_txn.open_table(EMAIL_INDEX).map_err(storage_err)?;
            let mut ideas = write_txn.open_table(IDEAS).map_err(storage_err)?;
            let mut votes = write_txn.open_table(VOTES).map_err(storage_err)?;
            let mut joins = write_txn.open_table(JOINS).map_err(storage_err)?;
            let mut teams = write_txn.open_table(TEAMS).map_err(storage_err)?;
            let mut submissions = write_txn.open_table(SUBMISSIONS).map_err(storage_err)?;
            let mut reactions = write_txn.open_table(REACTIONS).map_err(storage_err)?;
            let mut meta = write_txn.open_table(METADATA).map_err(storage_err)?;

            for change in changes {
                if let Some((kind, floor)) = change.counter_floor() {
                    let key = kind.counter_key();
                    let counter = meta.get(key).map_err(storage_err)?.map(|v| v.value());
                    if floor > counter.unwrap_or(1) {
                        meta.insert(key, floor).map_err(storage_err)?;
                    }
                }

                match change {
                    Change::PutUser(user) => {
                        let previous: Option<User> = match users.get(user.id.0).map_err(storage_err)? {
                            Some(guard) => Some(decode(guard.value())?),
                            None => None,
                        };
                        if let Some(previous) = previous {
                            if previous.email != user.email {
                                emails
                                    .remove(previous.email.as_str())
                                    .map_err(storage_err)?;
                            }
                        }
                        emails
                            .insert(user.email.as_str(), user.id.0)
                            .map_err(storage_err)?;
                        let bytes = encode(&user)?;
                        users
                            .insert(user.id.0, bytes.as_slice())
                            .map_err(storage_err)?;
                    }
                    Change::PutIdea(idea) => {
                        let bytes = encode(&idea)?;
                        ideas
                            .insert(idea.id.0, bytes.as_slice())
                            .map_err(storage_err)?;
                    }
                    Change::DeleteIdea(id) => {
                        ideas.remove(id.0).map_err(storage_err)?;
                    }
                    Change::PutVote(vote) => {
                        votes
                            .insert((vote.user.0, vote.idea.0), vote.created_at)
                            .map_err(storage_err)?;
                    }
                    Change::DeleteVote { user, idea } => {
                        votes.remove((user.0, idea.0)).map_err(storage_err)?;
                    }
                    Change::PutJoin(join) => {
                        joins
                            .insert((join.user.0, join.idea.0), join.created_at)
                            .map_err(storage_err)?;
                    }
                    Change::DeleteJoin { user, idea } => {
                        joins.remove((user.0, idea.0)).map_err(storage_err)?;
                    }
                    Change::PutTeam(team) => {
                        let bytes = encode(&team)?;
                        teams
                            .insert(team.id.0, bytes.as_slice())
                            .map_err(storage_err)?;
                    }
                    Change::DeleteTeam(id) => {
                        teams.remove(id.0).map_err(storage_err)?;
                    }
                    Change::PutSubmission(submission) => {
                        let bytes = encode(&submission)?;
                        submissions
                            .insert(submission.id.0, bytes.as_slice())
                            .map_err(storage_err)?;
                    }
                    Change::PutReaction(reaction) => {
                        reactions
                            .insert(
                                (reaction.submission.0, reaction.user.0, reaction.kind.code()),
                                reaction.created_at,
                            )
                            .map_err(storage_err)?;
                    }
                    Change::DeleteReaction {
                        submission,
                        user,
                        kind,
                    } => {
                        reactions
                            .remove((submission.0, user.0, kind.code()))
                            .map_err(storage_err)?;
                    }
                    Change::SetStage(stage) => {
                        meta.insert(STAGE_KEY, stage.code()).map_err(storage_err)?;
                    }
                    Change::SetCounter { .. } => {}
                }
            }
        }
        write_txn.commit().map_err(storage_err)?;

        Ok(())
    }

    fn votes_by_user(&self, user: UserId) -> Result<Vec<Vote>, VisionSprintError> {
        Ok(self
            .pairs(VOTES, Some(user))?
            .into_iter()
            .map(|(user, idea, created_at)| Vote {
                user,
                idea,
                created_at,
            })
            .collect())
    }

    fn joins_by_user(&self, user: UserId) -> Result<Vec<Join>, VisionSprintError> {
        Ok(self
            .pairs(JOINS, Some(user))?
            .into_iter()
            .map(|(user, idea, created_at)| Join {
                user,
                idea,
                created_at,
            })
            .collect())
    }

    fn reactions_for(&self, submission: SubmissionId) -> Result<Vec<Reaction>, VisionSprintError> {
        self.reaction_rows(Some(submission))
    }
}
