// =============================================================================
// Request authentication: Axum extractor + webhook secret check
// =============================================================================
//
// Admin endpoints take `Authorization: Bearer <token>` checked against
// `AppState::secrets.admin_token`. The Telegram webhook may carry
// `X-Telegram-Bot-Api-Secret-Token`, checked against `webhook_secret` when one
// is configured. Both comparisons run in constant time.
//
// Usage as an Axum extractor:
//
//   async fn handler(_auth: AuthBearer, State(state): State<Arc<AppState>>) { ... }
//
// A missing or wrong token short-circuits with 403 before the handler runs.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app_state::AppState;

pub const WEBHOOK_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

// =============================================================================
// Constant-time comparison
// =============================================================================

/// Compare two byte slices in constant time. A length mismatch returns early;
/// the expected length is not secret enough to matter for bearer tokens.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

// =============================================================================
// Extractor
// =============================================================================

/// Proof that the request carried the admin bearer token.
pub struct AuthBearer;

/// Rejection type returned when authentication fails.
pub struct AuthRejection {
    status: StatusCode,
    message: &'static str,
}

impl AuthRejection {
    fn forbidden(message: &'static str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message,
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, axum::Json(body)).into_response()
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthBearer {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.secrets.admin_token.as_deref().filter(|t| !t.is_empty()) else {
            warn!("LIQBOT_ADMIN_TOKEN is not set, rejecting admin request");
            return Err(AuthRejection::forbidden("Server authentication not configured"));
        };

        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        let Some(token) = token else {
            warn!("Missing or malformed Authorization header");
            return Err(AuthRejection::forbidden("Missing or invalid authorization token"));
        };

        if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
            warn!("Invalid admin token presented");
            return Err(AuthRejection::forbidden("Invalid authorization token"));
        }

        Ok(AuthBearer)
    }
}

// =============================================================================
// Webhook secret
// =============================================================================

/// True when no webhook secret is configured, or the header matches it.
pub fn webhook_secret_matches(expected: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected.filter(|s| !s.is_empty()) else {
        return true;
    };
    headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|got| constant_time_eq(got.as_bytes(), expected.as_bytes()))
}

// =============================================================================
// Tests
// =============================================================================
