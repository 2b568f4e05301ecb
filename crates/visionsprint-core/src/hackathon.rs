//! # Hackathon Service
//!
//! [`Hackathon`] is the single entry point for every operation. Each mutating
//! method receives the acting user's id and checks, in order:
//!
//! 1. the actor exists (and is an admin where required),
//! 2. the current stage allows the action ([`StageGate`]),
//! 3. the referenced records exist,
//! 4. per-user and per-team limits,
//!
//! and only then commits all resulting writes as one [`Change`] batch.
//!
//! ## Storage Backends
//!
//! - `InMemory`: [`MemoryStore`] (fast, volatile)
//! - `Persistent`: [`RedbStore`] (disk-backed, ACID)

use crate::embed::normalize_video_url;
use crate::primitives::{
    MAX_DESCRIPTION_LENGTH, MAX_JOINS_PER_USER, MAX_SUBMISSION_DESCRIPTION_LENGTH,
    MAX_TEAM_NAME_LENGTH, MAX_TEAM_SIZE, MAX_TITLE_LENGTH, MAX_URL_LENGTH, MAX_USER_NAME_LENGTH,
    MAX_VOTES_PER_USER, MIN_TEAM_SIZE, bounded_text, normalize_email,
};
use crate::storage::{MemoryStore, RedbStore};
use crate::store::{Change, HackathonStore};
use crate::system::{Capability, Stage, StageGate, StageProgress};
use crate::views::{
    HackathonStatus, IdeaSummary, MemberView, ReactionSummary, ShowcaseEntry, TeamSummary,
    rank_ideas, sort_showcase, tally_reactions,
};
use crate::{
    IdKind, Idea, IdeaId, Identity, Join, Reaction, ReactionKind, Role, Submission, SubmissionId,
    Team, TeamId, User, UserId, VisionSprintError, Vote,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as unix seconds (0 if the clock is before the epoch).
#[must_use]
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Storage backend for a Hackathon.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory maps (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

/// The hackathon: rules on top of a storage backend.
#[derive(Debug, Default)]
pub struct Hackathon {
    backend: StorageBackend,
}

impl Hackathon {
    /// Create an empty in-memory hackathon.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing in-memory store.
    #[must_use]
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            backend: StorageBackend::InMemory(store),
        }
    }

    /// Open or create a redb-backed hackathon at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, VisionSprintError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbStore::open(path)?),
        })
    }

    /// Whether changes are persisted to disk.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// Read access to the underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn HackathonStore {
        match &self.backend {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
        }
    }

    fn store_mut(&mut self) -> &mut dyn HackathonStore {
        match &mut self.backend {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
        }
    }

    /// Apply a raw change batch without rule checks. Used by snapshot restore.
    pub(crate) fn commit_unchecked(&mut self, changes: Vec<Change>) -> Result<(), VisionSprintError> {
        self.store_mut().commit(changes)
    }

    // =========================================================================
    // GUARDS
    // =========================================================================

    fn require_user(&self, id: UserId) -> Result<User, VisionSprintError> {
        self.store()
            .user(id)?
            .ok_or_else(|| VisionSprintError::user_not_found(id))
    }

    fn require_admin(&self, id: UserId) -> Result<User, VisionSprintError> {
        let user = self.require_user(id)?;
        if !user.is_admin() {
            return Err(VisionSprintError::Forbidden(
                "this action requires an admin".to_string(),
            ));
        }
        Ok(user)
    }

    fn require_idea(&self, id: IdeaId) -> Result<Idea, VisionSprintError> {
        self.store()
            .idea(id)?
            .ok_or_else(|| VisionSprintError::idea_not_found(id))
    }

    fn require_team(&self, id: TeamId) -> Result<Team, VisionSprintError> {
        self.store()
            .team(id)?
            .ok_or_else(|| VisionSprintError::team_not_found(id))
    }

    fn require_submission(&self, id: SubmissionId) -> Result<Submission, VisionSprintError> {
        self.store()
            .submission(id)?
            .ok_or_else(|| VisionSprintError::submission_not_found(id))
    }

    fn gate(&self, capability: Capability) -> Result<(), VisionSprintError> {
        StageGate::new(self.stage()?).check(capability)
    }

    // =========================================================================
    // USERS
    // =========================================================================

    /// Register or refresh a user from a verified identity.
    ///
    /// Emails in `admin_emails` are promoted to admin on sign-in; nobody is
    /// demoted by this path.
    pub fn sign_in(
        &mut self,
        identity: &Identity,
        admin_emails: &[String],
    ) -> Result<User, VisionSprintError> {
        let email = normalize_email(&identity.email)?;
        let name = bounded_text("name", &identity.name, 1, MAX_USER_NAME_LENGTH)?;
        let image = match identity.image.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(url) if url.len() > MAX_URL_LENGTH => {
                return Err(VisionSprintError::InvalidInput(
                    "image url is too long".to_string(),
                ));
            }
            Some(url) => Some(url.to_string()),
        };
        let listed_admin = admin_emails
            .iter()
            .any(|a| a.trim().eq_ignore_ascii_case(&email));

        let user = match self.store().user_by_email(&email)? {
            Some(mut existing) => {
                existing.name = name;
                existing.image = image;
                if listed_admin {
                    existing.role = Role::Admin;
                }
                existing
            }
            None => User {
                id: UserId(self.store().next_id(IdKind::User)?),
                email,
                name,
                image,
                role: if listed_admin {
                    Role::Admin
                } else {
                    Role::Member
                },
                created_at: now_unix(),
            },
        };

        self.store_mut()
            .commit(vec![Change::PutUser(user.clone())])?;
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Result<User, VisionSprintError> {
        self.require_user(id)
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>, VisionSprintError> {
        self.store().user_by_email(&normalize_email(email)?)
    }

    pub fn users(&self) -> Result<Vec<User>, VisionSprintError> {
        self.store().users()
    }

    /// Change a user's role. The last admin cannot be demoted.
    pub fn set_role(
        &mut self,
        actor: UserId,
        target: UserId,
        role: Role,
    ) -> Result<User, VisionSprintError> {
        self.require_admin(actor)?;
        let mut user = self.require_user(target)?;
        self.assign_role(&mut user, role)?;
        Ok(user)
    }

    /// Change a user's role by email, without an acting user. Used by the CLI,
    /// which is trusted by virtue of having access to the database.
    pub fn set_role_by_email(&mut self, email: &str, role: Role) -> Result<User, VisionSprintError> {
        let email = normalize_email(email)?;
        let mut user = self
            .store()
            .user_by_email(&email)?
            .ok_or_else(|| VisionSprintError::InvalidInput(format!("no user with email {}", email)))?;
        self.assign_role(&mut user, role)?;
        Ok(user)
    }

    fn assign_role(&mut self, user: &mut User, role: Role) -> Result<(), VisionSprintError> {
        if user.role == role {
            return Ok(());
        }
        if user.role == Role::Admin {
            let admins = self.users()?.iter().filter(|u| u.is_admin()).count();
            if admins <= 1 {
                return Err(VisionSprintError::Conflict(
                    "cannot demote the last admin".to_string(),
                ));
            }
        }
        user.role = role;
        self.store_mut().commit(vec![Change::PutUser(user.clone())])
    }

    // =========================================================================
    // STAGE
    // =========================================================================

    pub fn stage(&self) -> Result<Stage, VisionSprintError> {
        self.store().stage()
    }

    /// Move to the next stage.
    pub fn advance_stage(&mut self, actor: UserId) -> Result<Stage, VisionSprintError> {
        self.require_admin(actor)?;
        self.advance_stage_unchecked()
    }

    /// Move to the next stage without an acting user (CLI).
    pub fn advance_stage_unchecked(&mut self) -> Result<Stage, VisionSprintError> {
        let current = self.stage()?;
        let next = current.next().ok_or_else(|| {
            VisionSprintError::Conflict(format!("{} is the final stage", current))
        })?;
        self.store_mut().commit(vec![Change::SetStage(next)])?;
        Ok(next)
    }

    /// Jump directly to `stage`.
    pub fn set_stage(&mut self, actor: UserId, stage: Stage) -> Result<Stage, VisionSprintError> {
        self.require_admin(actor)?;
        self.set_stage_unchecked(stage)
    }

    /// Jump directly to `stage` without an acting user (CLI).
    pub fn set_stage_unchecked(&mut self, stage: Stage) -> Result<Stage, VisionSprintError> {
        self.store_mut().commit(vec![Change::SetStage(stage)])?;
        Ok(stage)
    }

    /// Counters describing readiness for the next stage.
    pub fn stage_progress(&self) -> Result<StageProgress, VisionSprintError> {
        let store = self.store();
        let current = store.stage()?;
        let teams = store.teams()?;
        let submissions = store.submissions()?;

        let submitted: BTreeSet<TeamId> = submissions.iter().map(|s| s.team).collect();
        let teamed: BTreeSet<UserId> = teams.iter().flat_map(|t| t.members.iter().copied()).collect();
        let joiners: BTreeSet<UserId> = store.joins()?.iter().map(|j| j.user).collect();

        Ok(StageProgress {
            current,
            next: current.next(),
            ideas: store.ideas()?.len(),
            votes: store.votes()?.len(),
            teams: teams.len(),
            submissions: submissions.len(),
            teams_pending: teams.iter().filter(|t| !submitted.contains(&t.id)).count(),
            unassigned_joiners: joiners.difference(&teamed).count(),
        })
    }

    // =========================================================================
    // IDEAS
    // =========================================================================

    pub fn submit_idea(
        &mut self,
        actor: UserId,
        title: &str,
        description: &str,
    ) -> Result<Idea, VisionSprintError> {
        let author = self.require_user(actor)?;
        self.gate(Capability::SubmitIdea)?;

        let now = now_unix();
        let idea = Idea {
            id: IdeaId(self.store().next_id(IdKind::Idea)?),
            title: bounded_text("title", title, 1, MAX_TITLE_LENGTH)?,
            description: bounded_text("description", description, 0, MAX_DESCRIPTION_LENGTH)?,
            author: author.id,
            created_at: now,
            updated_at: now,
        };

        self.store_mut().commit(vec![Change::PutIdea(idea.clone())])?;
        Ok(idea)
    }

    /// Edit an idea. Only its author or an admin may do so.
    pub fn update_idea(
        &mut self,
        actor: UserId,
        id: IdeaId,
        title: &str,
        description: &str,
    ) -> Result<Idea, VisionSprintError> {
        let user = self.require_user(actor)?;
        self.gate(Capability::EditIdea)?;
        let mut idea = self.require_idea(id)?;
        if idea.author != user.id && !user.is_admin() {
            return Err(VisionSprintError::Forbidden(
                "only the author can edit this idea".to_string(),
            ));
        }

        idea.title = bounded_text("title", title, 1, MAX_TITLE_LENGTH)?;
        idea.description = bounded_text("description", description, 0, MAX_DESCRIPTION_LENGTH)?;
        idea.updated_at = now_unix();

        self.store_mut().commit(vec![Change::PutIdea(idea.clone())])?;
        Ok(idea)
    }

    /// Delete an idea together with its votes and joins.
    pub fn delete_idea(&mut self, actor: UserId, id: IdeaId) -> Result<(), VisionSprintError> {
        let user = self.require_user(actor)?;
        self.gate(Capability::EditIdea)?;
        let idea = self.require_idea(id)?;
        if idea.author != user.id && !user.is_admin() {
            return Err(VisionSprintError::Forbidden(
                "only the author can delete this idea".to_string(),
            ));
        }
        if self.store().team_for_idea(id)?.is_some() {
            return Err(VisionSprintError::Conflict(
                "a team is already working on this idea".to_string(),
            ));
        }

        let mut changes = vec![Change::DeleteIdea(id)];
        changes.extend(
            self.store()
                .votes_for_idea(id)?
                .into_iter()
                .map(|v| Change::DeleteVote {
                    user: v.user,
                    idea: id,
                }),
        );
        changes.extend(
            self.store()
                .joins_for_idea(id)?
                .into_iter()
                .map(|j| Change::DeleteJoin {
                    user: j.user,
                    idea: id,
                }),
        );
        self.store_mut().commit(changes)
    }

    pub fn idea(&self, id: IdeaId) -> Result<IdeaSummary, VisionSprintError> {
        let idea = self.require_idea(id)?;
        let store = self.store();
        let teams: Vec<Team> = store.team_for_idea(id)?.into_iter().collect();
        let author: Vec<User> = store.user(idea.author)?.into_iter().collect();
        rank_ideas(
            vec![idea],
            &store.votes_for_idea(id)?,
            &store.joins_for_idea(id)?,
            &teams,
            &author,
        )
        .pop()
        .ok_or_else(|| VisionSprintError::idea_not_found(id))
    }

    /// All ideas in leaderboard order.
    pub fn ideas(&self) -> Result<Vec<IdeaSummary>, VisionSprintError> {
        let store = self.store();
        Ok(rank_ideas(
            store.ideas()?,
            &store.votes()?,
            &store.joins()?,
            &store.teams()?,
            &store.users()?,
        ))
    }

    // =========================================================================
    // VOTES
    // =========================================================================

    pub fn vote(&mut self, actor: UserId, idea: IdeaId) -> Result<Vote, VisionSprintError> {
        let user = self.require_user(actor)?;
        self.gate(Capability::Vote)?;
        let target = self.require_idea(idea)?;
        if target.author == user.id {
            return Err(VisionSprintError::Forbidden(
                "you cannot vote for your own idea".to_string(),
            ));
        }

        let mine = self.store().votes_by_user(user.id)?;
        if mine.iter().any(|v| v.idea == idea) {
            return Err(VisionSprintError::Conflict(format!(
                "already voted for idea {}",
                idea.0
            )));
        }
        if mine.len() >= MAX_VOTES_PER_USER {
            return Err(VisionSprintError::LimitReached(format!(
                "at most {} votes per user",
                MAX_VOTES_PER_USER
            )));
        }

        let vote = Vote {
            user: user.id,
            idea,
            created_at: now_unix(),
        };
        self.store_mut().commit(vec![Change::PutVote(vote)])?;
        Ok(vote)
    }

    pub fn unvote(&mut self, actor: UserId, idea: IdeaId) -> Result<(), VisionSprintError> {
        let user = self.require_user(actor)?;
        self.gate(Capability::Vote)?;
        if !self
            .store()
            .votes_by_user(user.id)?
            .iter()
            .any(|v| v.idea == idea)
        {
            return Err(VisionSprintError::NotFound {
                kind: "vote",
                id: idea.0,
            });
        }
        self.store_mut()
            .commit(vec![Change::DeleteVote { user: user.id, idea }])
    }

    pub fn votes_of(&self, user: UserId) -> Result<Vec<Vote>, VisionSprintError> {
        self.store().votes_by_user(user)
    }

    // =========================================================================
    // JOINS
    // =========================================================================

    pub fn join(&mut self, actor: UserId, idea: IdeaId) -> Result<Join, VisionSprintError> {
        let user = self.require_user(actor)?;
        self.gate(Capability::Join)?;
        self.require_idea(idea)?;

        let mine = self.store().joins_by_user(user.id)?;
        if mine.iter().any(|j| j.idea == idea) {
            return Err(VisionSprintError::Conflict(format!(
                "already joined idea {}",
                idea.0
            )));
        }
        if mine.len() >= MAX_JOINS_PER_USER {
            return Err(VisionSprintError::LimitReached(format!(
                "you can join at most {} idea(s); leave your current one first",
                MAX_JOINS_PER_USER
            )));
        }
        if self.store().team_of(user.id)?.is_some() {
            return Err(VisionSprintError::Conflict(
                "you are already on a team".to_string(),
            ));
        }
        if self.store().team_for_idea(idea)?.is_some() {
            return Err(VisionSprintError::Conflict(
                "this idea already has a team".to_string(),
            ));
        }

        let join = Join {
            user: user.id,
            idea,
            created_at: now_unix(),
        };
        self.store_mut().commit(vec![Change::PutJoin(join)])?;
        Ok(join)
    }

    pub fn leave(&mut self, actor: UserId, idea: IdeaId) -> Result<(), VisionSprintError> {
        let user = self.require_user(actor)?;
        self.gate(Capability::Join)?;
        if !self
            .store()
            .joins_by_user(user.id)?
            .iter()
            .any(|j| j.idea == idea)
        {
            return Err(VisionSprintError::NotFound {
                kind: "join",
                id: idea.0,
            });
        }
        self.store_mut()
            .commit(vec![Change::DeleteJoin { user: user.id, idea }])
    }

    pub fn joins_of(&self, user: UserId) -> Result<Vec<Join>, VisionSprintError> {
        self.store().joins_by_user(user)
    }

    // =========================================================================
    // TEAMS
    // =========================================================================

    /// Form a team around `idea` with the given members.
    pub fn form_team(
        &mut self,
        actor: UserId,
        idea: IdeaId,
        name: &str,
        members: &[UserId],
    ) -> Result<Team, VisionSprintError> {
        self.require_admin(actor)?;
        self.gate(Capability::FormTeam)?;
        self.require_idea(idea)?;
        if self.store().team_for_idea(idea)?.is_some() {
            return Err(VisionSprintError::Conflict(
                "this idea already has a team".to_string(),
            ));
        }

        let name = bounded_text("team name", name, 1, MAX_TEAM_NAME_LENGTH)?;
        let members: BTreeSet<UserId> = members.iter().copied().collect();
        if members.len() < MIN_TEAM_SIZE {
            return Err(VisionSprintError::InvalidInput(format!(
                "a team needs at least {} member(s)",
                MIN_TEAM_SIZE
            )));
        }
        if members.len() > MAX_TEAM_SIZE {
            return Err(VisionSprintError::LimitReached(format!(
                "a team has at most {} members",
                MAX_TEAM_SIZE
            )));
        }

        let teamed = self.teamed_users()?;
        for member in &members {
            self.require_user(*member)?;
            if teamed.contains(member) {
                return Err(VisionSprintError::Conflict(format!(
                    "user {} is already on a team",
                    member.0
                )));
            }
        }

        let team = Team {
            id: TeamId(self.store().next_id(IdKind::Team)?),
            name,
            idea,
            members,
            created_at: now_unix(),
        };
        self.store_mut().commit(vec![Change::PutTeam(team.clone())])?;
        Ok(team)
    }

    /// Form teams for every idea without one, from its joiners.
    ///
    /// Ideas are visited in leaderboard order; joiners are taken in join order
    /// and users already on a team are skipped. Ideas left with no joiners
    /// get no team.
    pub fn auto_form_teams(&mut self, actor: UserId) -> Result<Vec<Team>, VisionSprintError> {
        self.require_admin(actor)?;
        self.auto_form_teams_unchecked()
    }

    /// [`Hackathon::auto_form_teams`] without an acting user (CLI).
    pub fn auto_form_teams_unchecked(&mut self) -> Result<Vec<Team>, VisionSprintError> {
        self.gate(Capability::FormTeam)?;

        let mut taken = self.teamed_users()?;
        let mut next_id = self.store().next_id(IdKind::Team)?;
        let now = now_unix();
        let mut created = Vec::new();

        for summary in self.ideas()? {
            if summary.team.is_some() {
                continue;
            }
            let members: BTreeSet<UserId> = summary
                .joiners
                .iter()
                .copied()
                .filter(|u| !taken.contains(u))
                .take(MAX_TEAM_SIZE)
                .collect();
            if members.is_empty() {
                continue;
            }
            taken.extend(members.iter().copied());

            created.push(Team {
                id: TeamId(next_id),
                name: truncate_on_char_boundary(&summary.idea.title, MAX_TEAM_NAME_LENGTH),
                idea: summary.idea.id,
                members,
                created_at: now,
            });
            next_id = next_id.saturating_add(1);
        }

        self.store_mut()
            .commit(created.iter().cloned().map(Change::PutTeam).collect())?;
        Ok(created)
    }

    pub fn add_member(
        &mut self,
        actor: UserId,
        team: TeamId,
        user: UserId,
    ) -> Result<Team, VisionSprintError> {
        self.require_admin(actor)?;
        self.gate(Capability::FormTeam)?;
        let mut team = self.require_team(team)?;
        self.require_user(user)?;

        if team.has_member(user) || self.store().team_of(user)?.is_some() {
            return Err(VisionSprintError::Conflict(format!(
                "user {} is already on a team",
                user.0
            )));
        }
        if team.members.len() >= MAX_TEAM_SIZE {
            return Err(VisionSprintError::LimitReached(format!(
                "a team has at most {} members",
                MAX_TEAM_SIZE
            )));
        }

        team.members.insert(user);
        self.store_mut().commit(vec![Change::PutTeam(team.clone())])?;
        Ok(team)
    }

    pub fn remove_member(
        &mut self,
        actor: UserId,
        team: TeamId,
        user: UserId,
    ) -> Result<Team, VisionSprintError> {
        self.require_admin(actor)?;
        self.gate(Capability::FormTeam)?;
        let mut team = self.require_team(team)?;

        if !team.has_member(user) {
            return Err(VisionSprintError::NotFound {
                kind: "team member",
                id: user.0,
            });
        }
        if team.members.len() <= MIN_TEAM_SIZE {
            return Err(VisionSprintError::Conflict(
                "cannot remove the last member; disband the team instead".to_string(),
            ));
        }

        team.members.remove(&user);
        self.store_mut().commit(vec![Change::PutTeam(team.clone())])?;
        Ok(team)
    }

    /// Delete a team that has not submitted a demo.
    pub fn disband_team(&mut self, actor: UserId, team: TeamId) -> Result<(), VisionSprintError> {
        self.require_admin(actor)?;
        self.gate(Capability::FormTeam)?;
        let team = self.require_team(team)?;
        if self.store().submission_for_team(team.id)?.is_some() {
            return Err(VisionSprintError::Conflict(
                "the team has already submitted a demo".to_string(),
            ));
        }
        self.store_mut().commit(vec![Change::DeleteTeam(team.id)])
    }

    pub fn team(&self, id: TeamId) -> Result<TeamSummary, VisionSprintError> {
        let team = self.require_team(id)?;
        self.summarize_team(team, &self.user_map()?)
    }

    pub fn teams(&self) -> Result<Vec<TeamSummary>, VisionSprintError> {
        let users = self.user_map()?;
        self.store()
            .teams()?
            .into_iter()
            .map(|t| self.summarize_team(t, &users))
            .collect()
    }

    pub fn team_of(&self, user: UserId) -> Result<Option<Team>, VisionSprintError> {
        self.store().team_of(user)
    }

    fn teamed_users(&self) -> Result<BTreeSet<UserId>, VisionSprintError> {
        Ok(self
            .store()
            .teams()?
            .iter()
            .flat_map(|t| t.members.iter().copied())
            .collect())
    }

    fn user_map(&self) -> Result<BTreeMap<UserId, User>, VisionSprintError> {
        Ok(self.users()?.into_iter().map(|u| (u.id, u)).collect())
    }

    fn summarize_team(
        &self,
        team: Team,
        users: &BTreeMap<UserId, User>,
    ) -> Result<TeamSummary, VisionSprintError> {
        let idea_title = self
            .store()
            .idea(team.idea)?
            .map(|i| i.title)
            .unwrap_or_default();
        let submission = self.store().submission_for_team(team.id)?.map(|s| s.id);
        let members = team
            .members
            .iter()
            .filter_map(|id| users.get(id))
            .map(MemberView::from)
            .collect();
        Ok(TeamSummary {
            team,
            idea_title,
            members,
            submission,
        })
    }

    // =========================================================================
    // SUBMISSIONS
    // =========================================================================

    /// Submit (or replace) a team's demo video.
    pub fn submit_demo(
        &mut self,
        actor: UserId,
        team: TeamId,
        video_url: &str,
        description: &str,
    ) -> Result<Submission, VisionSprintError> {
        let user = self.require_user(actor)?;
        self.gate(Capability::SubmitDemo)?;
        let team = self.require_team(team)?;
        if !team.has_member(user.id) && !user.is_admin() {
            return Err(VisionSprintError::Forbidden(
                "only team members can submit the demo".to_string(),
            ));
        }

        let link = normalize_video_url(video_url)?;
        let description = bounded_text(
            "description",
            description,
            0,
            MAX_SUBMISSION_DESCRIPTION_LENGTH,
        )?;
        let id = match self.store().submission_for_team(team.id)? {
            Some(existing) => existing.id,
            None => SubmissionId(self.store().next_id(IdKind::Submission)?),
        };

        let submission = Submission {
            id,
            team: team.id,
            video_url: link.url,
            embed_url: link.embed_url,
            description,
            submitted_by: user.id,
            submitted_at: now_unix(),
        };
        self.store_mut()
            .commit(vec![Change::PutSubmission(submission.clone())])?;
        Ok(submission)
    }

    pub fn submission(&self, id: SubmissionId) -> Result<Submission, VisionSprintError> {
        self.require_submission(id)
    }

    pub fn submissions(&self) -> Result<Vec<Submission>, VisionSprintError> {
        self.store().submissions()
    }

    // =========================================================================
    // REACTIONS
    // =========================================================================

    /// Toggle a reaction. Returns `true` when the reaction is now present.
    pub fn react(
        &mut self,
        actor: UserId,
        submission: SubmissionId,
        kind: ReactionKind,
    ) -> Result<bool, VisionSprintError> {
        let user = self.require_user(actor)?;
        self.gate(Capability::React)?;
        self.require_submission(submission)?;

        let exists = self
            .store()
            .reactions_for(submission)?
            .iter()
            .any(|r| r.user == user.id && r.kind == kind);

        let change = if exists {
            Change::DeleteReaction {
                submission,
                user: user.id,
                kind,
            }
        } else {
            Change::PutReaction(Reaction {
                submission,
                user: user.id,
                kind,
                created_at: now_unix(),
            })
        };
        self.store_mut().commit(vec![change])?;
        Ok(!exists)
    }

    pub fn reactions(
        &self,
        submission: SubmissionId,
        viewer: Option<UserId>,
    ) -> Result<ReactionSummary, VisionSprintError> {
        self.require_submission(submission)?;
        Ok(tally_reactions(
            submission,
            &self.store().reactions_for(submission)?,
            viewer,
        ))
    }

    /// Every submission with its team, idea and reactions, most popular first.
    pub fn showcase(&self, viewer: Option<UserId>) -> Result<Vec<ShowcaseEntry>, VisionSprintError> {
        let store = self.store();
        let users = self.user_map()?;
        let teams: BTreeMap<TeamId, Team> =
            store.teams()?.into_iter().map(|t| (t.id, t)).collect();
        let ideas: BTreeMap<IdeaId, Idea> =
            store.ideas()?.into_iter().map(|i| (i.id, i)).collect();
        let reactions = store.reactions()?;

        let mut entries: Vec<ShowcaseEntry> = store
            .submissions()?
            .into_iter()
            .map(|submission| {
                let team = teams.get(&submission.team);
                let idea_title = team
                    .and_then(|t| ideas.get(&t.idea))
                    .map(|i| i.title.clone())
                    .unwrap_or_default();
                let members = team
                    .map(|t| {
                        t.members
                            .iter()
                            .filter_map(|id| users.get(id))
                            .map(MemberView::from)
                            .collect()
                    })
                    .unwrap_or_default();
                ShowcaseEntry {
                    team_name: team.map(|t| t.name.clone()).unwrap_or_default(),
                    idea_title,
                    members,
                    reactions: tally_reactions(submission.id, &reactions, viewer),
                    submission,
                }
            })
            .collect();

        sort_showcase(&mut entries);
        Ok(entries)
    }

    // =========================================================================
    // STATUS
    // =========================================================================

    pub fn status(&self) -> Result<HackathonStatus, VisionSprintError> {
        let store = self.store();
        let users = store.users()?;
        Ok(HackathonStatus {
            stage: store.stage()?,
            admins: users.iter().filter(|u| u.is_admin()).count(),
            users: users.len(),
            ideas: store.ideas()?.len(),
            votes: store.votes()?.len(),
            joins: store.joins()?.len(),
            teams: store.teams()?.len(),
            submissions: store.submissions()?.len(),
            reactions: store.reactions()?.len(),
        })
    }
}

/// Cut `s` to at most `max` bytes without splitting a character.
fn truncate_on_char_boundary(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].trim_end().to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        hackathon: Hackathon,
        admin: UserId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut hackathon = Hackathon::new();
            let admin = hackathon
                .sign_in(
                    &Identity::new("root@example.com", "Root"),
                    &["root@example.com".to_string()],
                )
                .expect("sign in")
                .id;
            Self { hackathon, admin }
        }

        fn member(&mut self, name: &str) -> UserId {
            self.hackathon
                .sign_in(
                    &Identity::new(format!("{}@example.com", name), name),
                    &[],
                )
                .expect("sign in")
                .id
        }

        fn idea(&mut self, author: UserId, title: &str) -> IdeaId {
            self.hackathon
                .submit_idea(author, title, "")
                .expect("submit")
                .id
        }

        fn to_stage(&mut self, stage: Stage) {
            self.hackathon
                .set_stage(self.admin, stage)
                .expect("set stage");
        }
    }

    #[test]
    fn sign_in_creates_then_refreshes() {
        let mut h = Hackathon::new();
        let first = h
            .sign_in(&Identity::new("Ada@Example.com", "Ada"), &[])
            .expect("sign in");
        assert_eq!(first.email, "ada@example.com");
        assert_eq!(first.role, Role::Member);

        let again = h
            .sign_in(&Identity::new("ada@example.com", "Ada L."), &[])
            .expect("sign in");
        assert_eq!(again.id, first.id);
        assert_eq!(again.name, "Ada L.");
        assert_eq!(h.users().expect("users").len(), 1);
    }

    #[test]
    fn sign_in_promotes_listed_admins() {
        let mut h = Hackathon::new();
        let user = h
            .sign_in(
                &Identity::new("boss@example.com", "Boss"),
                &["BOSS@example.com".to_string()],
            )
            .expect("sign in");
        assert!(user.is_admin());
    }

    #[test]
    fn last_admin_cannot_be_demoted() {
        let mut f = Fixture::new();
        let err = f
            .hackathon
            .set_role(f.admin, f.admin, Role::Member)
            .expect_err("last admin");
        assert!(matches!(err, VisionSprintError::Conflict(_)));

        let other = f.member("bob");
        f.hackathon
            .set_role(f.admin, other, Role::Admin)
            .expect("promote");
        f.hackathon
            .set_role(f.admin, f.admin, Role::Member)
            .expect("demote self");
    }

    #[test]
    fn members_cannot_change_roles() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        let err = f
            .hackathon
            .set_role(bob, bob, Role::Admin)
            .expect_err("forbidden");
        assert!(matches!(err, VisionSprintError::Forbidden(_)));
    }

    #[test]
    fn advance_walks_all_stages() {
        let mut f = Fixture::new();
        assert_eq!(f.hackathon.advance_stage(f.admin).expect("advance"), Stage::Sprint);
        assert_eq!(
            f.hackathon.advance_stage(f.admin).expect("advance"),
            Stage::Showcase
        );
        assert!(matches!(
            f.hackathon.advance_stage(f.admin),
            Err(VisionSprintError::Conflict(_))
        ));
    }

    #[test]
    fn ideas_are_closed_after_submission() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        f.to_stage(Stage::Sprint);
        let err = f
            .hackathon
            .submit_idea(bob, "Late idea", "")
            .expect_err("closed");
        assert!(matches!(err, VisionSprintError::StageClosed { .. }));
    }

    #[test]
    fn only_author_or_admin_edits() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        let eve = f.member("eve");
        let idea = f.idea(bob, "Drone delivery");

        assert!(matches!(
            f.hackathon.update_idea(eve, idea, "Mine now", ""),
            Err(VisionSprintError::Forbidden(_))
        ));
        let updated = f
            .hackathon
            .update_idea(bob, idea, "Drone delivery v2", "faster")
            .expect("author edit");
        assert_eq!(updated.title, "Drone delivery v2");
        f.hackathon
            .update_idea(f.admin, idea, "Drone delivery v3", "")
            .expect("admin edit");
    }

    #[test]
    fn delete_idea_removes_votes_and_joins() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        let eve = f.member("eve");
        let idea = f.idea(bob, "Smart garden");
        f.hackathon.vote(eve, idea).expect("vote");
        f.hackathon.join(eve, idea).expect("join");

        f.hackathon.delete_idea(bob, idea).expect("delete");
        assert!(f.hackathon.votes_of(eve).expect("votes").is_empty());
        assert!(f.hackathon.joins_of(eve).expect("joins").is_empty());
        assert!(f.hackathon.idea(idea).is_err());
    }

    #[test]
    fn vote_rules() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        let eve = f.member("eve");
        let own = f.idea(bob, "Own idea");

        assert!(matches!(
            f.hackathon.vote(bob, own),
            Err(VisionSprintError::Forbidden(_))
        ));

        let ideas: Vec<IdeaId> = (0..4).map(|i| f.idea(eve, &format!("Idea {}", i))).collect();
        for idea in &ideas[..MAX_VOTES_PER_USER] {
            f.hackathon.vote(bob, *idea).expect("vote");
        }
        assert!(matches!(
            f.hackathon.vote(bob, ideas[0]),
            Err(VisionSprintError::Conflict(_))
        ));
        assert!(matches!(
            f.hackathon.vote(bob, ideas[3]),
            Err(VisionSprintError::LimitReached(_))
        ));

        f.hackathon.unvote(bob, ideas[0]).expect("unvote");
        f.hackathon.vote(bob, ideas[3]).expect("vote after unvote");
        assert!(matches!(
            f.hackathon.unvote(bob, ideas[0]),
            Err(VisionSprintError::NotFound { kind: "vote", .. })
        ));
    }

    #[test]
    fn join_limit_and_switch() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        let a = f.idea(f.admin, "A");
        let b = f.idea(f.admin, "B");

        f.hackathon.join(bob, a).expect("join");
        assert!(matches!(
            f.hackathon.join(bob, b),
            Err(VisionSprintError::LimitReached(_))
        ));
        f.hackathon.leave(bob, a).expect("leave");
        f.hackathon.join(bob, b).expect("switch");
    }

    #[test]
    fn leaderboard_counts_votes() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        let eve = f.member("eve");
        let a = f.idea(f.admin, "A");
        let b = f.idea(f.admin, "B");
        f.hackathon.vote(bob, b).expect("vote");
        f.hackathon.vote(eve, b).expect("vote");
        f.hackathon.vote(eve, a).expect("vote");

        let board = f.hackathon.ideas().expect("ideas");
        assert_eq!(board[0].idea.id, b);
        assert_eq!(board[0].votes, 2);
        assert_eq!(board[0].author_name, "Root");
        assert_eq!(f.hackathon.idea(a).expect("idea").votes, 1);
    }

    #[test]
    fn form_team_rules() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        let eve = f.member("eve");
        let a = f.idea(bob, "A");
        let b = f.idea(bob, "B");

        assert!(matches!(
            f.hackathon.form_team(bob, a, "Team A", &[bob]),
            Err(VisionSprintError::Forbidden(_))
        ));
        assert!(matches!(
            f.hackathon.form_team(f.admin, a, "Team A", &[]),
            Err(VisionSprintError::InvalidInput(_))
        ));

        let team = f
            .hackathon
            .form_team(f.admin, a, "Team A", &[bob, eve, bob])
            .expect("form");
        assert_eq!(team.members.len(), 2);

        assert!(matches!(
            f.hackathon.form_team(f.admin, a, "Again", &[f.admin]),
            Err(VisionSprintError::Conflict(_))
        ));
        assert!(matches!(
            f.hackathon.form_team(f.admin, b, "Team B", &[eve]),
            Err(VisionSprintError::Conflict(_))
        ));
    }

    #[test]
    fn team_size_is_capped() {
        let mut f = Fixture::new();
        let idea = f.idea(f.admin, "Big project");
        let members: Vec<UserId> = (0..MAX_TEAM_SIZE)
            .map(|i| f.member(&format!("m{}", i)))
            .collect();
        let team = f
            .hackathon
            .form_team(f.admin, idea, "Big", &members)
            .expect("form");

        let extra = f.member("extra");
        assert!(matches!(
            f.hackathon.add_member(f.admin, team.id, extra),
            Err(VisionSprintError::LimitReached(_))
        ));

        let mut too_many = members.clone();
        too_many.push(extra);
        let other = f.idea(f.admin, "Other");
        assert!(matches!(
            f.hackathon.form_team(f.admin, other, "Too big", &too_many),
            Err(VisionSprintError::LimitReached(_))
        ));
    }

    #[test]
    fn remove_last_member_is_rejected() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        let eve = f.member("eve");
        let idea = f.idea(bob, "Solo");
        let team = f
            .hackathon
            .form_team(f.admin, idea, "Pair", &[bob, eve])
            .expect("form");

        let team = f
            .hackathon
            .remove_member(f.admin, team.id, eve)
            .expect("remove");
        assert!(matches!(
            f.hackathon.remove_member(f.admin, team.id, bob),
            Err(VisionSprintError::Conflict(_))
        ));
        assert!(matches!(
            f.hackathon.remove_member(f.admin, team.id, eve),
            Err(VisionSprintError::NotFound { .. })
        ));
        f.hackathon.disband_team(f.admin, team.id).expect("disband");
        assert!(f.hackathon.team_of(bob).expect("team").is_none());
    }

    #[test]
    fn auto_form_uses_joiners_in_leaderboard_order() {
        let mut f = Fixture::new();
        let users: Vec<UserId> = (0..4).map(|i| f.member(&format!("u{}", i))).collect();
        let popular = f.idea(f.admin, "Popular");
        let quiet = f.idea(f.admin, "Quiet");
        let empty = f.idea(f.admin, "Nobody joined");

        f.hackathon.vote(users[0], popular).expect("vote");
        f.hackathon.join(users[0], popular).expect("join");
        f.hackathon.join(users[1], popular).expect("join");
        f.hackathon.join(users[2], quiet).expect("join");

        let teams = f.hackathon.auto_form_teams(f.admin).expect("auto");
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].idea, popular);
        assert_eq!(teams[0].name, "Popular");
        assert_eq!(teams[0].members.len(), 2);
        assert_eq!(teams[1].idea, quiet);
        assert_ne!(teams[0].id, teams[1].id);
        assert!(
            f.hackathon
                .ideas()
                .expect("ideas")
                .iter()
                .any(|s| s.idea.id == empty && s.team.is_none())
        );

        // Running again creates nothing new.
        assert!(f.hackathon.auto_form_teams(f.admin).expect("auto").is_empty());
    }

    #[test]
    fn demo_submission_flow() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        let eve = f.member("eve");
        let idea = f.idea(bob, "Demo app");
        let team = f
            .hackathon
            .form_team(f.admin, idea, "Demo team", &[bob])
            .expect("form");

        assert!(matches!(
            f.hackathon
                .submit_demo(bob, team.id, "https://example.com/v", ""),
            Err(VisionSprintError::StageClosed { .. })
        ));

        f.to_stage(Stage::Sprint);
        assert!(matches!(
            f.hackathon
                .submit_demo(eve, team.id, "https://example.com/v", ""),
            Err(VisionSprintError::Forbidden(_))
        ));

        let first = f
            .hackathon
            .submit_demo(
                bob,
                team.id,
                "https://drive.google.com/file/d/abc/view",
                "v1",
            )
            .expect("submit");
        assert_eq!(
            first.embed_url.as_deref(),
            Some("https://drive.google.com/file/d/abc/preview")
        );

        let second = f
            .hackathon
            .submit_demo(bob, team.id, "https://example.com/final.mp4", "v2")
            .expect("resubmit");
        assert_eq!(second.id, first.id);
        assert_eq!(f.hackathon.submissions().expect("subs").len(), 1);
        assert_eq!(
            f.hackathon.team(team.id).expect("team").submission,
            Some(first.id)
        );
        assert!(matches!(
            f.hackathon.disband_team(f.admin, team.id),
            Err(VisionSprintError::Conflict(_))
        ));
    }

    #[test]
    fn reactions_toggle_and_rank_showcase() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        let eve = f.member("eve");
        let a = f.idea(bob, "A");
        let b = f.idea(eve, "B");
        let team_a = f.hackathon.form_team(f.admin, a, "TA", &[bob]).expect("form");
        let team_b = f.hackathon.form_team(f.admin, b, "TB", &[eve]).expect("form");

        f.to_stage(Stage::Sprint);
        let sub_a = f
            .hackathon
            .submit_demo(bob, team_a.id, "https://example.com/a", "")
            .expect("submit");
        let sub_b = f
            .hackathon
            .submit_demo(eve, team_b.id, "https://example.com/b", "")
            .expect("submit");

        assert!(matches!(
            f.hackathon.react(bob, sub_b.id, ReactionKind::Fire),
            Err(VisionSprintError::StageClosed { .. })
        ));

        f.to_stage(Stage::Showcase);
        assert!(f.hackathon.react(bob, sub_b.id, ReactionKind::Fire).expect("react"));
        assert!(f.hackathon.react(eve, sub_b.id, ReactionKind::Clap).expect("react"));
        assert!(f.hackathon.react(bob, sub_a.id, ReactionKind::Heart).expect("react"));
        assert!(!f.hackathon.react(bob, sub_a.id, ReactionKind::Heart).expect("untoggle"));

        let summary = f.hackathon.reactions(sub_b.id, Some(bob)).expect("summary");
        assert_eq!(summary.total, 2);
        assert!(summary.mine.contains(&ReactionKind::Fire));

        let showcase = f.hackathon.showcase(Some(eve)).expect("showcase");
        assert_eq!(showcase.len(), 2);
        assert_eq!(showcase[0].submission.id, sub_b.id);
        assert_eq!(showcase[0].team_name, "TB");
        assert_eq!(showcase[0].idea_title, "B");
        assert!(showcase[0].reactions.mine.contains(&ReactionKind::Clap));
        assert_eq!(showcase[1].reactions.total, 0);
    }

    #[test]
    fn stage_progress_counts_pending_teams() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        let eve = f.member("eve");
        let idea = f.idea(f.admin, "A");
        f.hackathon.join(bob, idea).expect("join");
        f.hackathon.join(eve, idea).expect("join");
        f.hackathon
            .form_team(f.admin, idea, "T", &[bob])
            .expect("form");

        let progress = f.hackathon.stage_progress().expect("progress");
        assert_eq!(progress.current, Stage::Submission);
        assert_eq!(progress.next, Some(Stage::Sprint));
        assert_eq!(progress.teams_pending, 1);
        assert_eq!(progress.unassigned_joiners, 1);
    }

    #[test]
    fn status_counts_records() {
        let mut f = Fixture::new();
        let bob = f.member("bob");
        let idea = f.idea(f.admin, "A");
        f.hackathon.vote(bob, idea).expect("vote");

        let status = f.hackathon.status().expect("status");
        assert_eq!(status.users, 2);
        assert_eq!(status.admins, 1);
        assert_eq!(status.ideas, 1);
        assert_eq!(status.votes, 1);
        assert_eq!(status.stage, Stage::Submission);
    }

    #[test]
    fn unknown_actor_is_rejected() {
        let mut h = Hackathon::new();
        assert!(matches!(
            h.submit_idea(UserId(99), "Ghost", ""),
            Err(VisionSprintError::NotFound { kind: "user", .. })
        ));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_on_char_boundary("héllo", 2), "h");
        assert_eq!(truncate_on_char_boundary("short", 80), "short");
    }
}
