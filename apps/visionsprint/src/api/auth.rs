//! # Authentication Module
//!
//! Signed tokens for the VisionSprint HTTP API.
//!
//! The identity provider (the web front end's OAuth flow) hands the browser a
//! short-lived *identity assertion* signed with the shared secret. The API
//! exchanges it at `POST /auth/session` for a *session token*, which is then
//! sent on every request:
//!
//! ```text
//! Authorization: Bearer <session-token>
//! ```
//!
//! Both token kinds share one format:
//!
//! ```text
//! base64url(json payload) "." hex(blake3 keyed MAC)
//! ```
//!
//! The two MAC keys are derived from the secret under different contexts, so
//! an assertion can never be replayed as a session and vice versa.

use super::AppState;
use super::error::ApiError;
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use visionsprint_core::{Identity, User, UserId, VisionSprintError, now_unix};

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LENGTH: usize = 16;

/// Maximum accepted token length in bytes.
const MAX_TOKEN_LENGTH: usize = 8 * 1024;

const ASSERTION_CONTEXT: &str = "VisionSprint 2024-05-01 identity assertion MAC key";
const SESSION_CONTEXT: &str = "VisionSprint 2024-05-01 session token MAC key";

// =============================================================================
// TOKEN PAYLOADS
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    email: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    exp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    uid: u64,
    exp: u64,
}

// =============================================================================
// KEYS
// =============================================================================

/// MAC keys derived from the configured secret.
#[derive(Clone)]
pub struct AuthKeys {
    assertion_key: [u8; 32],
    session_key: [u8; 32],
    session_ttl_secs: u64,
}

impl std::fmt::Debug for AuthKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthKeys")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .finish()
    }
}

impl AuthKeys {
    /// Derive both keys from `secret`.
    pub fn from_secret(secret: &str, session_ttl_secs: u64) -> Result<Self, VisionSprintError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(VisionSprintError::InvalidInput(format!(
                "auth secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        Ok(Self {
            assertion_key: blake3::derive_key(ASSERTION_CONTEXT, secret.as_bytes()),
            session_key: blake3::derive_key(SESSION_CONTEXT, secret.as_bytes()),
            session_ttl_secs,
        })
    }

    /// Mint an identity assertion valid until `exp` (unix seconds).
    pub fn sign_assertion(&self, identity: &Identity, exp: u64) -> Result<String, VisionSprintError> {
        sign(
            &self.assertion_key,
            &AssertionClaims {
                email: identity.email.clone(),
                name: identity.name.clone(),
                image: identity.image.clone(),
                exp,
            },
        )
    }

    /// Check an identity assertion and return the identity it carries.
    pub fn verify_assertion(&self, token: &str, now: u64) -> Result<Identity, VisionSprintError> {
        let claims: AssertionClaims = verify(&self.assertion_key, token)?;
        if claims.exp <= now {
            return Err(VisionSprintError::Unauthenticated(
                "identity assertion expired".to_string(),
            ));
        }
        Ok(Identity {
            email: claims.email,
            name: claims.name,
            image: claims.image,
        })
    }

    /// Issue a session for `user`. Returns the token and its expiry.
    pub fn issue_session(&self, user: UserId, now: u64) -> Result<(String, u64), VisionSprintError> {
        let exp = now.saturating_add(self.session_ttl_secs);
        let token = sign(&self.session_key, &SessionClaims { uid: user.0, exp })?;
        Ok((token, exp))
    }

    /// Check a session token and return the user it belongs to.
    pub fn verify_session(&self, token: &str, now: u64) -> Result<UserId, VisionSprintError> {
        let claims: SessionClaims = verify(&self.session_key, token)?;
        if claims.exp <= now {
            return Err(VisionSprintError::Unauthenticated(
                "session expired".to_string(),
            ));
        }
        Ok(UserId(claims.uid))
    }
}

fn mac_hex(key: &[u8; 32], body: &str) -> String {
    blake3::keyed_hash(key, body.as_bytes()).to_hex().to_string()
}

fn sign<T: Serialize>(key: &[u8; 32], claims: &T) -> Result<String, VisionSprintError> {
    let json = serde_json::to_vec(claims)
        .map_err(|e| VisionSprintError::SerializationError(e.to_string()))?;
    let body = URL_SAFE_NO_PAD.encode(json);
    let mac = mac_hex(key, &body);
    Ok(format!("{}.{}", body, mac))
}

fn verify<T: DeserializeOwned>(key: &[u8; 32], token: &str) -> Result<T, VisionSprintError> {
    let invalid = || VisionSprintError::Unauthenticated("invalid token".to_string());

    if token.len() > MAX_TOKEN_LENGTH {
        return Err(invalid());
    }
    let (body, provided) = token.split_once('.').ok_or_else(invalid)?;
    let expected = mac_hex(key, body);

    // Slices of different length compare unequal without an early exit.
    let mac_ok: bool = provided.as_bytes().ct_eq(expected.as_bytes()).into();
    if !mac_ok {
        return Err(invalid());
    }

    let json = URL_SAFE_NO_PAD.decode(body).map_err(|_| invalid())?;
    serde_json::from_slice(&json).map_err(|_| invalid())
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Read `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn resolve_user(state: &AppState, token: &str) -> Result<User, ApiError> {
    let uid = state.auth.verify_session(token, now_unix()).map_err(|e| {
        tracing::warn!(
            event = "auth_failure",
            reason = "invalid_session",
            "Authentication failed: {}",
            e
        );
        e
    })?;

    let hackathon = state.hackathon.read().await;
    match hackathon.store().user(uid)? {
        Some(user) => Ok(user),
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "unknown_user",
                user = uid.0,
                "Session refers to an unknown user"
            );
            Err(VisionSprintError::Unauthenticated("unknown user".to_string()).into())
        }
    }
}

/// The signed-in user. Rejects the request with 401 otherwise.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            return Err(VisionSprintError::Unauthenticated("sign in required".to_string()).into());
        };
        resolve_user(state, token).await.map(CurrentUser)
    }
}

/// The signed-in user, if any. A present but invalid token is still a 401.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => resolve_user(state, token).await.map(|u| MaybeUser(Some(u))),
            None => Ok(MaybeUser(None)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-0123456789";

    fn keys() -> AuthKeys {
        AuthKeys::from_secret(SECRET, 3600).expect("keys")
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(AuthKeys::from_secret("short", 60).is_err());
    }

    #[test]
    fn assertion_round_trip() {
        let keys = keys();
        let mut identity = Identity::new("ada@example.com", "Ada");
        identity.image = Some("https://example.com/ada.png".to_string());

        let token = keys.sign_assertion(&identity, 1_000).expect("sign");
        let verified = keys.verify_assertion(&token, 999).expect("verify");
        assert_eq!(verified, identity);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let keys = keys();
        let token = keys
            .sign_assertion(&Identity::new("a@example.com", "A"), 100)
            .expect("sign");
        assert!(matches!(
            keys.verify_assertion(&token, 100),
            Err(VisionSprintError::Unauthenticated(_))
        ));

        let (session, exp) = keys.issue_session(UserId(1), 50).expect("issue");
        assert_eq!(exp, 3650);
        assert!(keys.verify_session(&session, exp).is_err());
        assert_eq!(keys.verify_session(&session, 51).expect("valid"), UserId(1));
    }

    #[test]
    fn tampered_payload_fails_mac() {
        let keys = keys();
        let (token, _) = keys.issue_session(UserId(1), 0).expect("issue");
        let (_, mac) = token.split_once('.').expect("dot");
        let forged_body = URL_SAFE_NO_PAD.encode(br#"{"uid":2,"exp":99999999999}"#);
        let forged = format!("{}.{}", forged_body, mac);
        assert!(keys.verify_session(&forged, 1).is_err());
    }

    #[test]
    fn assertion_is_not_a_session() {
        let keys = keys();
        let assertion = keys
            .sign_assertion(&Identity::new("a@example.com", "A"), u64::MAX)
            .expect("sign");
        assert!(keys.verify_session(&assertion, 0).is_err());
    }

    #[test]
    fn other_secret_cannot_verify() {
        let (token, _) = keys().issue_session(UserId(1), 0).expect("issue");
        let other = AuthKeys::from_secret("a-completely-different-secret", 3600).expect("keys");
        assert!(other.verify_session(&token, 1).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let keys = keys();
        assert!(keys.verify_session("", 0).is_err());
        assert!(keys.verify_session("no-dot", 0).is_err());
        assert!(keys.verify_session("a.b.c", 0).is_err());
    }
}
