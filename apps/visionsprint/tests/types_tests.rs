//! Wire-format tests for the API request and response types.

#![allow(clippy::unwrap_used, clippy::panic)]

use visionsprint::api::{
    AckResponse, CreateTeamRequest, ErrorResponse, ExportResponse, HealthResponse, IdeaRequest,
    ReactionRequest, SetRoleRequest, SetStageRequest, SubmissionRequest,
};
use visionsprint_core::{IdeaId, ReactionKind, Role, Stage, UserId};

// =============================================================================
// COMMON
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_error_response_shape() {
    let json = serde_json::to_string(&ErrorResponse::new("sign in required")).unwrap();
    assert_eq!(json, r#"{"success":false,"error":"sign in required"}"#);
}

#[test]
fn test_ack_response_shape() {
    let json = serde_json::to_string(&AckResponse::ok()).unwrap();
    assert_eq!(json, r#"{"success":true}"#);
}

// =============================================================================
// REQUESTS
// =============================================================================

#[test]
fn test_idea_request_description_optional() {
    let request: IdeaRequest = serde_json::from_str(r#"{"title":"Smart mirror"}"#).unwrap();
    assert_eq!(request.title, "Smart mirror");
    assert!(request.description.is_empty());

    let request: SubmissionRequest =
        serde_json::from_str(r#"{"video_url":"https://example.com/v"}"#).unwrap();
    assert!(request.description.is_empty());
}

#[test]
fn test_enums_use_snake_case() {
    let stage: SetStageRequest = serde_json::from_str(r#"{"stage":"sprint"}"#).unwrap();
    assert_eq!(stage.stage, Stage::Sprint);

    let role: SetRoleRequest = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
    assert_eq!(role.role, Role::Admin);

    let reaction: ReactionRequest = serde_json::from_str(r#"{"kind":"mind_blown"}"#).unwrap();
    assert_eq!(reaction.kind, ReactionKind::MindBlown);

    assert!(serde_json::from_str::<SetStageRequest>(r#"{"stage":"Sprint"}"#).is_err());
    assert!(serde_json::from_str::<ReactionRequest>(r#"{"kind":"thumbs"}"#).is_err());
}

#[test]
fn test_ids_are_plain_numbers() {
    let request: CreateTeamRequest =
        serde_json::from_str(r#"{"idea":7,"name":"Mirrors","members":[1,2]}"#).unwrap();
    assert_eq!(request.idea, IdeaId(7));
    assert_eq!(request.members, vec![UserId(1), UserId(2)]);
}

// =============================================================================
// EXPORT
// =============================================================================

#[test]
fn test_export_response_base64() {
    let export = ExportResponse::new(b"VSPX", 42, "abc".to_string());
    assert!(export.success);
    assert_eq!(export.data, "VlNQWA==");
    assert_eq!(export.checksum, 42);
}
