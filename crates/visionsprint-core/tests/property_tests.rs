//! # Property-Based Tests
//!
//! Random sequences of participant actions must never break the limits
//! enforced by the hackathon, whatever order they arrive in.

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;
use visionsprint_core::primitives::{MAX_JOINS_PER_USER, MAX_TEAM_SIZE, MAX_VOTES_PER_USER};
use visionsprint_core::{Hackathon, IdeaId, Identity, UserId, export_snapshot, import_snapshot};

const USERS: usize = 8;
const IDEAS: usize = 5;

#[derive(Debug, Clone)]
enum Action {
    Vote(usize, usize),
    Unvote(usize, usize),
    Join(usize, usize),
    Leave(usize, usize),
    FormTeam(usize, Vec<usize>),
    AutoForm,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (0..USERS, 0..IDEAS).prop_map(|(u, i)| Action::Vote(u, i)),
        1 => (0..USERS, 0..IDEAS).prop_map(|(u, i)| Action::Unvote(u, i)),
        3 => (0..USERS, 0..IDEAS).prop_map(|(u, i)| Action::Join(u, i)),
        1 => (0..USERS, 0..IDEAS).prop_map(|(u, i)| Action::Leave(u, i)),
        1 => (0..IDEAS, vec(0..USERS, 0..8)).prop_map(|(i, m)| Action::FormTeam(i, m)),
        1 => Just(Action::AutoForm),
    ]
}

/// An admin (index 0), `USERS` members and `IDEAS` ideas by the admin.
fn setup() -> (Hackathon, UserId, Vec<UserId>, Vec<IdeaId>) {
    let mut h = Hackathon::new();
    let admin = h
        .sign_in(
            &Identity::new("admin@example.com", "Admin"),
            &["admin@example.com".to_string()],
        )
        .expect("admin")
        .id;
    let users = (0..USERS)
        .map(|i| {
            h.sign_in(
                &Identity::new(format!("user{}@example.com", i), format!("User {}", i)),
                &[],
            )
            .expect("user")
            .id
        })
        .collect();
    let ideas = (0..IDEAS)
        .map(|i| {
            h.submit_idea(admin, &format!("Idea {}", i), "")
                .expect("idea")
                .id
        })
        .collect();
    (h, admin, users, ideas)
}

fn apply(h: &mut Hackathon, admin: UserId, users: &[UserId], ideas: &[IdeaId], action: &Action) {
    // Rejections are expected; only the resulting state matters.
    let _ = match action {
        Action::Vote(u, i) => h.vote(users[*u], ideas[*i]).map(|_| ()),
        Action::Unvote(u, i) => h.unvote(users[*u], ideas[*i]),
        Action::Join(u, i) => h.join(users[*u], ideas[*i]).map(|_| ()),
        Action::Leave(u, i) => h.leave(users[*u], ideas[*i]),
        Action::FormTeam(i, members) => {
            let members: Vec<UserId> = members.iter().map(|m| users[*m]).collect();
            h.form_team(admin, ideas[*i], "Team", &members).map(|_| ())
        }
        Action::AutoForm => h.auto_form_teams(admin).map(|_| ()),
    };
}

proptest! {
    /// Vote, join and team limits hold after any action sequence.
    #[test]
    fn limits_hold_for_any_action_sequence(actions in vec(action(), 1..60)) {
        let (mut h, admin, users, ideas) = setup();
        for action in &actions {
            apply(&mut h, admin, &users, &ideas, action);
        }

        for user in &users {
            prop_assert!(h.votes_of(*user).expect("votes").len() <= MAX_VOTES_PER_USER);
            prop_assert!(h.joins_of(*user).expect("joins").len() <= MAX_JOINS_PER_USER);
        }

        let teams = h.teams().expect("teams");
        let mut seen_users = BTreeSet::new();
        let mut seen_ideas = BTreeSet::new();
        for summary in &teams {
            prop_assert!(!summary.team.members.is_empty());
            prop_assert!(summary.team.members.len() <= MAX_TEAM_SIZE);
            prop_assert!(seen_ideas.insert(summary.team.idea), "two teams on one idea");
            for member in &summary.team.members {
                prop_assert!(seen_users.insert(*member), "user on two teams");
            }
        }
    }

    /// Leaderboard is sorted by votes descending, then id ascending.
    #[test]
    fn leaderboard_is_sorted(actions in vec(action(), 1..40)) {
        let (mut h, admin, users, ideas) = setup();
        for action in &actions {
            apply(&mut h, admin, &users, &ideas, action);
        }

        let board = h.ideas().expect("ideas");
        prop_assert_eq!(board.len(), IDEAS);
        for pair in board.windows(2) {
            let ordered = pair[0].votes > pair[1].votes
                || (pair[0].votes == pair[1].votes && pair[0].idea.id < pair[1].idea.id);
            prop_assert!(ordered);
        }
    }

    /// Export after the same action sequence yields identical bytes, and
    /// a restored copy exports identically.
    #[test]
    fn snapshot_is_deterministic(actions in vec(action(), 1..30)) {
        let (mut a, admin, users, ideas) = setup();
        for action in &actions {
            apply(&mut a, admin, &users, &ideas, action);
        }

        let bytes = export_snapshot(&a).expect("export");
        let mut restored = Hackathon::new();
        restored.restore(import_snapshot(&bytes).expect("import")).expect("restore");
        prop_assert_eq!(export_snapshot(&restored).expect("export"), bytes);
    }
}
