// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// Public:    GET  /api/v1/health
// Telegram:  POST /api/telegram/webhook   (optional secret header)
// Admin:     everything else under /api/v1/, Bearer token via `AuthBearer`.
//
// CORS is configured permissively; the admin surface is token-protected.
// =============================================================================

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, instrument, warn};

use crate::api::auth::{webhook_secret_matches, AuthBearer};
use crate::app_state::AppState;
use crate::commands::handle_command;
use crate::pairs::normalize_symbol;
use crate::tick::run_tick;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/telegram/webhook", post(telegram_webhook))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/pairs", get(pairs))
        .route("/api/v1/alerts", get(alerts))
        .route("/api/v1/errors", get(errors))
        .route("/api/v1/analysis", get(cached_analyses))
        .route("/api/v1/analysis/:symbol", get(analysis))
        .route("/api/v1/analysis/:symbol/last", get(last_analysis))
        .route("/api/v1/tick", post(tick_now))
        .route("/api/v1/control/tick", post(control_tick))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

// =============================================================================
// Health (public)
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_health())
}

// =============================================================================
// Telegram webhook
// =============================================================================

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    #[serde(default)]
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    chat: TelegramChat,
    #[serde(default)]
    from: Option<TelegramUser>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TelegramUser {
    id: i64,
}

fn ok_ack() -> Response {
    Json(serde_json::json!({ "ok": true })).into_response()
}

#[instrument(skip_all, name = "telegram_webhook")]
async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !webhook_secret_matches(state.secrets.webhook_secret.as_deref(), &headers) {
        warn!("webhook secret mismatch");
        return error_response(StatusCode::FORBIDDEN, "invalid webhook secret");
    }

    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            warn!(error = %e, "undecodable telegram update");
            state.push_error(format!("webhook decode: {e}"), None);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let Some(message) = update.message else {
        return ok_ack();
    };
    let text = message.text.unwrap_or_default();
    let user_id = message.from.map(|u| u.id);

    let Some(reply) = handle_command(&state, &text, user_id).await else {
        return ok_ack();
    };

    let chat_id = message.chat.id.to_string();
    if let Err(e) = state.notifier.send(&reply, Some(&chat_id)).await {
        warn!(chat = %chat_id, error = %e, "command reply not delivered");
        state.push_error(format!("reply delivery: {e}"), None);
    }

    ok_ack()
}

// =============================================================================
// Pairs, alerts, errors (authenticated)
// =============================================================================

#[derive(Serialize)]
struct PairsResponse {
    pairs: Vec<String>,
    locked: bool,
}

async fn pairs(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(PairsResponse {
        pairs: state.pairs.active(),
        locked: state.pairs.is_locked(),
    })
}

async fn alerts(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let alerts = state.recent_alerts.read().clone();
    Json(alerts)
}

async fn errors(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let errors = state.recent_errors.read().clone();
    Json(errors)
}

// =============================================================================
// On-demand analysis (authenticated)
// =============================================================================

async fn analysis(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Response {
    let Some(symbol) = normalize_symbol(&symbol) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid symbol");
    };

    match state.analyzer.analyze_symbol(&symbol).await {
        Some(a) => {
            state.record_analysis(a.clone());
            Json(a).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, format!("no data for {symbol}")),
    }
}

async fn cached_analyses(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.cached_analyses())
}

/// Most recent analysis from a tick, command or API call, without
/// refetching.
async fn last_analysis(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Response {
    let Some(symbol) = normalize_symbol(&symbol) else {
        return error_response(StatusCode::BAD_REQUEST, "invalid symbol");
    };

    match state.cached_analysis(&symbol) {
        Some(a) => Json(a).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("no cached analysis for {symbol}")),
    }
}

// =============================================================================
// Tick control (authenticated)
// =============================================================================

async fn tick_now(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("manual tick requested via API");
    Json(run_tick(&state).await)
}

#[derive(Deserialize)]
struct TickControlRequest {
    enabled: bool,
}

#[derive(Serialize)]
struct TickControlResponse {
    tick_enabled: bool,
}

async fn control_tick(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(req): Json<TickControlRequest>,
) -> impl IntoResponse {
    let config = {
        let mut config = state.runtime_config.write();
        config.tick_enabled = req.enabled;
        config.clone()
    };
    state.increment_version();
    info!(tick_enabled = req.enabled, "tick toggled via API");

    if let Err(e) = config.save(&state.config_path) {
        warn!(error = %e, "failed to persist tick toggle");
    }

    Json(TickControlResponse {
        tick_enabled: req.enabled,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_config::RuntimeConfig;
    use crate::test_support::{
        sample_analysis, state_with, test_state, RecordingNotifier, StubExchange, StubHeatmap,
        StubVenue,
    };
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn admin_get(uri: &str) -> Request<Body> {
        Request::get(uri)
            .header("authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap()
    }

    fn webhook(body: serde_json::Value) -> Request<Body> {
        Request::post("/api/telegram/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (state, _) = test_state(RuntimeConfig::default());
        let (status, body) = call(router(state), Request::get("/api/v1/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_pairs"], 2);
    }

    #[tokio::test]
    async fn admin_routes_need_token() {
        let (state, _) = test_state(RuntimeConfig::default());
        let app = router(state);

        let (status, _) = call(app.clone(), Request::get("/api/v1/pairs").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let bad = Request::get("/api/v1/pairs")
            .header("authorization", "Bearer nope")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(app.clone(), bad).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(app, admin_get("/api/v1/pairs")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pairs"], serde_json::json!(["BTCUSDT", "AVAXUSDT"]));
    }

    #[tokio::test]
    async fn webhook_ignores_updates_without_commands() {
        let (state, notifier) = test_state(RuntimeConfig::default());
        let app = router(state);

        let (status, body) = call(app.clone(), webhook(serde_json::json!({ "update_id": 1 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let msg = serde_json::json!({
            "message": { "chat": { "id": 5 }, "from": { "id": 9 }, "text": "hi" }
        });
        let (_, body) = call(app, webhook(msg)).await;
        assert_eq!(body["ok"], true);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn webhook_replies_to_the_chat() {
        let (state, notifier) = test_state(RuntimeConfig::default());
        let msg = serde_json::json!({
            "message": { "chat": { "id": -100 }, "from": { "id": 9 }, "text": "/pairs" }
        });
        let (status, body) = call(router(state), webhook(msg)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.contains("• BTCUSDT"));
        assert_eq!(sent[0].1.as_deref(), Some("-100"));
    }

    #[tokio::test]
    async fn webhook_survives_delivery_failure() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let state = state_with(
            RuntimeConfig::default(),
            StubExchange::default(),
            StubVenue::default(),
            StubHeatmap::default(),
            notifier,
        );
        let msg = serde_json::json!({ "message": { "chat": { "id": 1 }, "text": "/help" } });
        let (status, body) = call(router(state.clone()), webhook(msg)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(state.recent_errors.read().len(), 1);
    }

    #[tokio::test]
    async fn malformed_update_is_a_server_error() {
        let (state, _) = test_state(RuntimeConfig::default());
        let req = Request::post("/api/telegram/webhook")
            .body(Body::from("not json"))
            .unwrap();
        let (status, body) = call(router(state), req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn analysis_404_without_price() {
        let (state, _) = test_state(RuntimeConfig::default());
        let (status, body) = call(router(state), admin_get("/api/v1/analysis/btc")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "no data for BTCUSDT");
    }

    #[tokio::test]
    async fn cached_analysis_is_served_without_refetch() {
        let (state, _) = test_state(RuntimeConfig::default());
        let app = router(state.clone());

        let (status, body) = call(app.clone(), admin_get("/api/v1/analysis/btc/last")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "no cached analysis for BTCUSDT");

        state.record_analysis(sample_analysis("BTCUSDT", 60_000.0));

        let (status, body) = call(app.clone(), admin_get("/api/v1/analysis/btc/last")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "BTCUSDT");

        let (status, body) = call(app, admin_get("/api/v1/analysis")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn manual_tick_returns_summary() {
        let (state, _) = test_state(RuntimeConfig::default());
        let req = Request::post("/api/v1/tick")
            .header("authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(router(state), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["evaluated"], 2);
        assert_eq!(body["failed"], 2);
    }

    #[tokio::test]
    async fn tick_toggle_persists() {
        let (state, _) = test_state(RuntimeConfig::default());
        let req = Request::post("/api/v1/control/tick")
            .header("authorization", "Bearer test-token")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"enabled":false}"#))
            .unwrap();
        let (status, body) = call(router(state.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tick_enabled"], false);
        assert!(!state.config().tick_enabled);

        let saved = RuntimeConfig::load(&state.config_path).unwrap();
        assert!(!saved.tick_enabled);
        let _ = std::fs::remove_file(&state.config_path);
    }
}
