//! # Lifecycle Tests
//!
//! One full hackathon, stage by stage, against both storage backends.

use tempfile::TempDir;
use visionsprint_core::{
    Hackathon, Identity, ReactionKind, Role, Stage, UserId, VisionSprintError, export_snapshot,
    import_snapshot,
};

struct Cast {
    admin: UserId,
    ada: UserId,
    linus: UserId,
    grace: UserId,
}

fn sign_in_cast(h: &mut Hackathon) -> Cast {
    let admins = vec!["admin@example.com".to_string()];
    let mut sign = |email: &str, name: &str| {
        h.sign_in(&Identity::new(email, name), &admins)
            .expect("sign in")
            .id
    };
    Cast {
        admin: sign("admin@example.com", "Admin"),
        ada: sign("ada@example.com", "Ada"),
        linus: sign("linus@example.com", "Linus"),
        grace: sign("grace@example.com", "Grace"),
    }
}

/// Drive a hackathon from sign-up to showcase and check each stage.
fn run_full_event(h: &mut Hackathon) {
    let cast = sign_in_cast(h);

    // -- Submission ---------------------------------------------------------
    let compiler = h
        .submit_idea(cast.ada, "Self-hosting compiler", "A compiler for kids")
        .expect("idea")
        .id;
    let kernel = h
        .submit_idea(cast.linus, "Tiny kernel", "")
        .expect("idea")
        .id;

    h.vote(cast.grace, compiler).expect("vote");
    h.vote(cast.linus, compiler).expect("vote");
    h.vote(cast.ada, kernel).expect("vote");

    h.join(cast.grace, compiler).expect("join");
    h.join(cast.ada, compiler).expect("join");
    h.join(cast.linus, kernel).expect("join");

    let board = h.ideas().expect("ideas");
    assert_eq!(board[0].idea.id, compiler);
    assert_eq!(board[0].votes, 2);

    // -- Sprint -------------------------------------------------------------
    assert_eq!(h.advance_stage(cast.admin).expect("advance"), Stage::Sprint);
    assert!(matches!(
        h.vote(cast.admin, kernel),
        Err(VisionSprintError::StageClosed { .. })
    ));

    let teams = h.auto_form_teams(cast.admin).expect("auto form");
    assert_eq!(teams.len(), 2);
    let compiler_team = teams
        .iter()
        .find(|t| t.idea == compiler)
        .expect("compiler team");
    assert!(compiler_team.has_member(cast.grace));
    assert!(compiler_team.has_member(cast.ada));

    let demo = h
        .submit_demo(
            cast.grace,
            compiler_team.id,
            "https://docs.google.com/presentation/d/deck42/edit",
            "Slides and a recorded demo",
        )
        .expect("submit demo");
    assert_eq!(
        demo.embed_url.as_deref(),
        Some("https://docs.google.com/presentation/d/deck42/preview")
    );

    let progress = h.stage_progress().expect("progress");
    assert_eq!(progress.teams_pending, 1);

    // -- Showcase -----------------------------------------------------------
    assert_eq!(h.advance_stage(cast.admin).expect("advance"), Stage::Showcase);
    assert!(h.react(cast.linus, demo.id, ReactionKind::MindBlown).expect("react"));
    assert!(h.react(cast.admin, demo.id, ReactionKind::Fire).expect("react"));

    let showcase = h.showcase(Some(cast.linus)).expect("showcase");
    assert_eq!(showcase.len(), 1);
    assert_eq!(showcase[0].reactions.total, 2);
    assert!(showcase[0].reactions.mine.contains(&ReactionKind::MindBlown));
    assert_eq!(showcase[0].members.len(), 2);

    let status = h.status().expect("status");
    assert_eq!(status.stage, Stage::Showcase);
    assert_eq!(status.users, 4);
    assert_eq!(status.teams, 2);
    assert_eq!(status.submissions, 1);
    assert_eq!(status.reactions, 2);
}

#[test]
fn full_event_in_memory() {
    let mut h = Hackathon::new();
    run_full_event(&mut h);
}

#[test]
fn full_event_on_redb_survives_reopen() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("event.redb");

    let exported = {
        let mut h = Hackathon::with_redb(&path).expect("open");
        assert!(h.is_persistent());
        run_full_event(&mut h);
        export_snapshot(&h).expect("export")
    };

    let reopened = Hackathon::with_redb(&path).expect("reopen");
    assert_eq!(reopened.stage().expect("stage"), Stage::Showcase);
    assert_eq!(reopened.showcase(None).expect("showcase").len(), 1);
    assert_eq!(export_snapshot(&reopened).expect("export"), exported);
}

#[test]
fn snapshot_moves_between_backends() {
    let mut memory = Hackathon::new();
    run_full_event(&mut memory);
    let bytes = export_snapshot(&memory).expect("export");

    let dir = TempDir::new().expect("tempdir");
    let mut disk = Hackathon::with_redb(dir.path().join("copy.redb")).expect("open");
    disk.restore(import_snapshot(&bytes).expect("import"))
        .expect("restore");

    assert_eq!(export_snapshot(&disk).expect("export"), bytes);
    assert_eq!(disk.ideas().expect("ideas"), memory.ideas().expect("ideas"));
}

#[test]
fn admin_list_promotes_on_later_sign_in() {
    let mut h = Hackathon::new();
    let user = h
        .sign_in(&Identity::new("late@example.com", "Late"), &[])
        .expect("sign in");
    assert_eq!(user.role, Role::Member);

    let again = h
        .sign_in(
            &Identity::new("late@example.com", "Late"),
            &["late@example.com".to_string()],
        )
        .expect("sign in");
    assert_eq!(again.id, user.id);
    assert_eq!(again.role, Role::Admin);

    // Dropping the email from the list does not demote.
    let third = h
        .sign_in(&Identity::new("late@example.com", "Late"), &[])
        .expect("sign in");
    assert_eq!(third.role, Role::Admin);
}
