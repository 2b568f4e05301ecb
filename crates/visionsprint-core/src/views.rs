//! # Read Models
//!
//! Aggregated, serializable views assembled from raw records: the idea
//! leaderboard, team rosters, reaction tallies and the showcase listing.
//! The ranking and tally functions are pure so they can be reused and
//! benchmarked without a store.

use crate::system::Stage;
use crate::{
    Idea, IdeaId, Join, Reaction, ReactionKind, Submission, SubmissionId, Team, TeamId, User,
    UserId, Vote,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// An idea with its leaderboard data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaSummary {
    pub idea: Idea,
    pub author_name: String,
    pub votes: usize,
    /// Users who joined the idea, in join order.
    pub joiners: Vec<UserId>,
    pub team: Option<TeamId>,
}

/// Public view of a team member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberView {
    pub id: UserId,
    pub name: String,
    pub image: Option<String>,
}

impl From<&User> for MemberView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}

/// A team with its idea and members resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub team: Team,
    pub idea_title: String,
    pub members: Vec<MemberView>,
    pub submission: Option<SubmissionId>,
}

/// Reaction counts for one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub submission: SubmissionId,
    /// Every kind is present, zero when nobody reacted with it.
    pub tally: BTreeMap<ReactionKind, u64>,
    pub total: u64,
    /// Kinds the viewing user has reacted with.
    pub mine: BTreeSet<ReactionKind>,
}

/// One row on the showcase page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowcaseEntry {
    pub submission: Submission,
    pub team_name: String,
    pub idea_title: String,
    pub members: Vec<MemberView>,
    pub reactions: ReactionSummary,
}

/// Record counts across the hackathon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HackathonStatus {
    pub stage: Stage,
    pub users: usize,
    pub admins: usize,
    pub ideas: usize,
    pub votes: usize,
    pub joins: usize,
    pub teams: usize,
    pub submissions: usize,
    pub reactions: usize,
}

// =============================================================================
// PURE AGGREGATIONS
// =============================================================================

/// Build leaderboard rows: most votes first, then oldest idea first.
pub fn rank_ideas(
    ideas: Vec<Idea>,
    votes: &[Vote],
    joins: &[Join],
    teams: &[Team],
    users: &[User],
) -> Vec<IdeaSummary> {
    let mut vote_counts: BTreeMap<IdeaId, usize> = BTreeMap::new();
    for vote in votes {
        *vote_counts.entry(vote.idea).or_insert(0) += 1;
    }

    let mut joiners: BTreeMap<IdeaId, Vec<&Join>> = BTreeMap::new();
    for join in joins {
        joiners.entry(join.idea).or_default().push(join);
    }

    let team_by_idea: BTreeMap<IdeaId, TeamId> = teams.iter().map(|t| (t.idea, t.id)).collect();
    let names: BTreeMap<UserId, &str> = users.iter().map(|u| (u.id, u.name.as_str())).collect();

    let mut rows: Vec<IdeaSummary> = ideas
        .into_iter()
        .map(|idea| {
            let mut joined = joiners.remove(&idea.id).unwrap_or_default();
            joined.sort_by_key(|j| (j.created_at, j.user));
            IdeaSummary {
                author_name: names.get(&idea.author).copied().unwrap_or_default().to_string(),
                votes: vote_counts.get(&idea.id).copied().unwrap_or(0),
                joiners: joined.iter().map(|j| j.user).collect(),
                team: team_by_idea.get(&idea.id).copied(),
                idea,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.idea.id.cmp(&b.idea.id)));
    rows
}

/// Count reactions of one submission, flagging the viewer's own.
pub fn tally_reactions(
    submission: SubmissionId,
    reactions: &[Reaction],
    viewer: Option<UserId>,
) -> ReactionSummary {
    let mut tally: BTreeMap<ReactionKind, u64> =
        ReactionKind::ALL.iter().map(|k| (*k, 0)).collect();
    let mut mine = BTreeSet::new();
    let mut total: u64 = 0;

    for reaction in reactions.iter().filter(|r| r.submission == submission) {
        *tally.entry(reaction.kind).or_insert(0) += 1;
        total = total.saturating_add(1);
        if Some(reaction.user) == viewer {
            mine.insert(reaction.kind);
        }
    }

    ReactionSummary {
        submission,
        tally,
        total,
        mine,
    }
}

/// Order showcase rows: most reactions first, then earliest submission id.
pub fn sort_showcase(entries: &mut [ShowcaseEntry]) {
    entries.sort_by(|a, b| {
        b.reactions
            .total
            .cmp(&a.reactions.total)
            .then(a.submission.id.cmp(&b.submission.id))
    });
}
