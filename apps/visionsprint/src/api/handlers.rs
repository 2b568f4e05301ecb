//! # API Endpoint Handlers
//!
//! Thin translations from HTTP to [`Hackathon`] calls. Reads take the shared
//! lock, writes the exclusive one; every rule lives in the core.

use super::{
    AppState,
    auth::{CurrentUser, MaybeUser},
    error::{ApiError, ApiJson, ApiPath},
    types::{
        AckResponse, AddMemberRequest, CreateTeamRequest, ExportResponse, HashResponse,
        HealthResponse, IdeaRequest, IdeaResponse, IdeasResponse, JoinResponse, MeResponse,
        ReactionRequest, ReactionResponse, SessionRequest, SessionResponse, SetRoleRequest,
        SetStageRequest, ShowcaseResponse, StageResponse, StatusResponse, SubmissionRequest,
        SubmissionResponse, SubmissionsResponse, TeamResponse, TeamsResponse, UserResponse,
        UsersResponse, VoteResponse,
    },
};
use axum::{Json, extract::State};
use visionsprint_core::{
    Hackathon, IdeaId, SubmissionId, TeamId, User, UserId, VisionSprintError, export_snapshot,
    now_unix, primitives::MAX_VOTES_PER_USER, snapshot_blake3, snapshot_checksum,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(VisionSprintError::Forbidden("this action requires an admin".to_string()).into())
    }
}

// =============================================================================
// HEALTH & STATUS
// =============================================================================

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

pub async fn status_handler(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    let hackathon = state.hackathon.read().await;
    Ok(Json(StatusResponse {
        success: true,
        status: hackathon.status()?,
    }))
}

// =============================================================================
// STAGE
// =============================================================================

fn stage_response(hackathon: &Hackathon) -> ApiResult<StageResponse> {
    let progress = hackathon.stage_progress()?;
    Ok(Json(StageResponse {
        success: true,
        stage: progress.current,
        name: progress.current.name().to_string(),
        progress,
    }))
}

pub async fn stage_handler(State(state): State<AppState>) -> ApiResult<StageResponse> {
    let hackathon = state.hackathon.read().await;
    stage_response(&hackathon)
}

pub async fn advance_stage_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<StageResponse> {
    let mut hackathon = state.hackathon.write().await;
    let stage = hackathon.advance_stage(user.id)?;
    tracing::info!(event = "stage_changed", stage = stage.name(), by = user.id.0, "Stage advanced");
    stage_response(&hackathon)
}

pub async fn set_stage_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<SetStageRequest>,
) -> ApiResult<StageResponse> {
    let mut hackathon = state.hackathon.write().await;
    let stage = hackathon.set_stage(user.id, request.stage)?;
    tracing::info!(event = "stage_changed", stage = stage.name(), by = user.id.0, "Stage set");
    stage_response(&hackathon)
}

// =============================================================================
// AUTH & USERS
// =============================================================================

/// Exchange an identity assertion for a session token.
pub async fn session_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SessionRequest>,
) -> ApiResult<SessionResponse> {
    let now = now_unix();
    let identity = state
        .auth
        .verify_assertion(&request.assertion, now)
        .map_err(|e| {
            tracing::warn!(event = "auth_failure", reason = "invalid_assertion", "{}", e);
            e
        })?;

    let user = {
        let mut hackathon = state.hackathon.write().await;
        hackathon.sign_in(&identity, &state.config.admin_emails)?
    };
    let (token, expires_at) = state.auth.issue_session(user.id, now)?;
    tracing::info!(
        event = "sign_in",
        user = user.id.0,
        role = user.role.as_str(),
        "User signed in"
    );

    Ok(Json(SessionResponse {
        success: true,
        token,
        expires_at,
        user,
    }))
}

pub async fn me_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<MeResponse> {
    let hackathon = state.hackathon.read().await;
    let votes: Vec<IdeaId> = hackathon.votes_of(user.id)?.iter().map(|v| v.idea).collect();
    let joined = hackathon.joins_of(user.id)?.iter().map(|j| j.idea).collect();
    let team = hackathon.team_of(user.id)?.map(|t| t.id);

    Ok(Json(MeResponse {
        success: true,
        votes_remaining: MAX_VOTES_PER_USER.saturating_sub(votes.len()),
        votes,
        joined,
        team,
        user,
    }))
}

pub async fn list_users_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<UsersResponse> {
    require_admin(&user)?;
    let hackathon = state.hackathon.read().await;
    Ok(Json(UsersResponse {
        success: true,
        users: hackathon.users()?,
    }))
}

pub async fn set_role_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<SetRoleRequest>,
) -> ApiResult<UserResponse> {
    let mut hackathon = state.hackathon.write().await;
    let updated = hackathon.set_role(user.id, UserId(id), request.role)?;
    tracing::info!(
        event = "role_changed",
        user = id,
        role = updated.role.as_str(),
        by = user.id.0,
        "Role changed"
    );
    Ok(Json(UserResponse {
        success: true,
        user: updated,
    }))
}

// =============================================================================
// IDEAS
// =============================================================================

pub async fn list_ideas_handler(State(state): State<AppState>) -> ApiResult<IdeasResponse> {
    let hackathon = state.hackathon.read().await;
    Ok(Json(IdeasResponse {
        success: true,
        ideas: hackathon.ideas()?,
    }))
}

pub async fn create_idea_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<IdeaRequest>,
) -> ApiResult<IdeaResponse> {
    let mut hackathon = state.hackathon.write().await;
    let idea = hackathon.submit_idea(user.id, &request.title, &request.description)?;
    tracing::info!(event = "idea_submitted", idea = idea.id.0, user = user.id.0, "Idea submitted");
    Ok(Json(IdeaResponse {
        success: true,
        idea: hackathon.idea(idea.id)?,
    }))
}

pub async fn get_idea_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<IdeaResponse> {
    let hackathon = state.hackathon.read().await;
    Ok(Json(IdeaResponse {
        success: true,
        idea: hackathon.idea(IdeaId(id))?,
    }))
}

pub async fn update_idea_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<IdeaRequest>,
) -> ApiResult<IdeaResponse> {
    let mut hackathon = state.hackathon.write().await;
    hackathon.update_idea(user.id, IdeaId(id), &request.title, &request.description)?;
    Ok(Json(IdeaResponse {
        success: true,
        idea: hackathon.idea(IdeaId(id))?,
    }))
}

pub async fn delete_idea_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<AckResponse> {
    let mut hackathon = state.hackathon.write().await;
    hackathon.delete_idea(user.id, IdeaId(id))?;
    tracing::info!(event = "idea_deleted", idea = id, user = user.id.0, "Idea deleted");
    Ok(Json(AckResponse::ok()))
}

fn vote_response(hackathon: &Hackathon, user: UserId, idea: IdeaId) -> ApiResult<VoteResponse> {
    let used = hackathon.votes_of(user)?.len();
    Ok(Json(VoteResponse {
        success: true,
        idea: hackathon.idea(idea)?,
        votes_remaining: MAX_VOTES_PER_USER.saturating_sub(used),
    }))
}

pub async fn vote_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<VoteResponse> {
    let mut hackathon = state.hackathon.write().await;
    hackathon.vote(user.id, IdeaId(id))?;
    vote_response(&hackathon, user.id, IdeaId(id))
}

pub async fn unvote_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<VoteResponse> {
    let mut hackathon = state.hackathon.write().await;
    hackathon.unvote(user.id, IdeaId(id))?;
    vote_response(&hackathon, user.id, IdeaId(id))
}

fn join_response(hackathon: &Hackathon, user: UserId, idea: IdeaId) -> ApiResult<JoinResponse> {
    Ok(Json(JoinResponse {
        success: true,
        idea: hackathon.idea(idea)?,
        joined: hackathon.joins_of(user)?.iter().map(|j| j.idea).collect(),
    }))
}

pub async fn join_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<JoinResponse> {
    let mut hackathon = state.hackathon.write().await;
    hackathon.join(user.id, IdeaId(id))?;
    join_response(&hackathon, user.id, IdeaId(id))
}

pub async fn leave_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<JoinResponse> {
    let mut hackathon = state.hackathon.write().await;
    hackathon.leave(user.id, IdeaId(id))?;
    join_response(&hackathon, user.id, IdeaId(id))
}

// =============================================================================
// TEAMS
// =============================================================================

pub async fn list_teams_handler(State(state): State<AppState>) -> ApiResult<TeamsResponse> {
    let hackathon = state.hackathon.read().await;
    Ok(Json(TeamsResponse {
        success: true,
        teams: hackathon.teams()?,
    }))
}

pub async fn create_team_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(request): ApiJson<CreateTeamRequest>,
) -> ApiResult<TeamResponse> {
    let mut hackathon = state.hackathon.write().await;
    let team = hackathon.form_team(user.id, request.idea, &request.name, &request.members)?;
    tracing::info!(
        event = "team_formed",
        team = team.id.0,
        idea = team.idea.0,
        members = team.members.len(),
        "Team formed"
    );
    Ok(Json(TeamResponse {
        success: true,
        team: hackathon.team(team.id)?,
    }))
}

pub async fn auto_teams_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<TeamsResponse> {
    let mut hackathon = state.hackathon.write().await;
    let created = hackathon.auto_form_teams(user.id)?;
    tracing::info!(event = "teams_auto_formed", count = created.len(), "Teams formed from joins");

    let teams = created
        .iter()
        .map(|t| hackathon.team(t.id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(TeamsResponse {
        success: true,
        teams,
    }))
}

pub async fn get_team_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<TeamResponse> {
    let hackathon = state.hackathon.read().await;
    Ok(Json(TeamResponse {
        success: true,
        team: hackathon.team(TeamId(id))?,
    }))
}

pub async fn disband_team_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<AckResponse> {
    let mut hackathon = state.hackathon.write().await;
    hackathon.disband_team(user.id, TeamId(id))?;
    tracing::info!(event = "team_disbanded", team = id, "Team disbanded");
    Ok(Json(AckResponse::ok()))
}

pub async fn add_member_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<AddMemberRequest>,
) -> ApiResult<TeamResponse> {
    let mut hackathon = state.hackathon.write().await;
    hackathon.add_member(user.id, TeamId(id), request.user_id)?;
    Ok(Json(TeamResponse {
        success: true,
        team: hackathon.team(TeamId(id))?,
    }))
}

pub async fn remove_member_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath((id, member)): ApiPath<(u64, u64)>,
) -> ApiResult<TeamResponse> {
    let mut hackathon = state.hackathon.write().await;
    hackathon.remove_member(user.id, TeamId(id), UserId(member))?;
    Ok(Json(TeamResponse {
        success: true,
        team: hackathon.team(TeamId(id))?,
    }))
}

// =============================================================================
// SUBMISSIONS & REACTIONS
// =============================================================================

pub async fn submit_demo_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<SubmissionRequest>,
) -> ApiResult<SubmissionResponse> {
    let mut hackathon = state.hackathon.write().await;
    let submission =
        hackathon.submit_demo(user.id, TeamId(id), &request.video_url, &request.description)?;
    tracing::info!(
        event = "demo_submitted",
        team = id,
        submission = submission.id.0,
        embedded = submission.embed_url.is_some(),
        "Demo submitted"
    );
    let reactions = hackathon.reactions(submission.id, Some(user.id))?;
    Ok(Json(SubmissionResponse {
        success: true,
        submission,
        reactions,
    }))
}

pub async fn list_submissions_handler(
    State(state): State<AppState>,
) -> ApiResult<SubmissionsResponse> {
    let hackathon = state.hackathon.read().await;
    Ok(Json(SubmissionsResponse {
        success: true,
        submissions: hackathon.submissions()?,
    }))
}

pub async fn get_submission_handler(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<SubmissionResponse> {
    let hackathon = state.hackathon.read().await;
    let submission = hackathon.submission(SubmissionId(id))?;
    let reactions = hackathon.reactions(submission.id, viewer.map(|u| u.id))?;
    Ok(Json(SubmissionResponse {
        success: true,
        submission,
        reactions,
    }))
}

pub async fn react_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<u64>,
    ApiJson(request): ApiJson<ReactionRequest>,
) -> ApiResult<ReactionResponse> {
    let mut hackathon = state.hackathon.write().await;
    let active = hackathon.react(user.id, SubmissionId(id), request.kind)?;
    Ok(Json(ReactionResponse {
        success: true,
        active,
        reactions: hackathon.reactions(SubmissionId(id), Some(user.id))?,
    }))
}

pub async fn showcase_handler(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
) -> ApiResult<ShowcaseResponse> {
    let hackathon = state.hackathon.read().await;
    Ok(Json(ShowcaseResponse {
        success: true,
        stage: hackathon.stage()?,
        entries: hackathon.showcase(viewer.map(|u| u.id))?,
    }))
}

// =============================================================================
// EXPORT & HASH
// =============================================================================

pub async fn export_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<ExportResponse> {
    require_admin(&user)?;
    let hackathon = state.hackathon.read().await;
    let data = export_snapshot(&hackathon)?;
    tracing::info!(event = "export", bytes = data.len(), by = user.id.0, "Snapshot exported");
    Ok(Json(ExportResponse::new(
        &data,
        snapshot_checksum(&data),
        snapshot_blake3(&data),
    )))
}

pub async fn hash_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<HashResponse> {
    require_admin(&user)?;
    let hackathon = state.hackathon.read().await;
    let data = export_snapshot(&hackathon)?;
    Ok(Json(HashResponse {
        success: true,
        algorithm: "blake3".to_string(),
        hash: snapshot_blake3(&data),
    }))
}
