//!
//! pantry HTTP server
//! ------------------
//! Axum-based HTTP API over the list service.
//!
//! Responsibilities:
//! - Login/logout endpoints backed by the credential verifier and the
//!   session manager, with a simple session-cookie model.
//! - Per-request authorization: every gated handler looks up the session and
//!   asks the decision service for a fresh group membership before touching
//!   the list. Nothing about a caller outlives its request except the
//!   session token itself.
//! - List read and append endpoints delegating to `ListService`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::authz::AuthorizationResolver;
use crate::error::{AppError, AppResult};
use crate::identity::{CredentialBundle, CredentialVerifier, RequestContext, SessionManager};
use crate::list::ListService;

const SESSION_COOKIE: &str = "pantry_session";

/// Shared server state injected into all handlers. Verifier, resolver and
/// list service sit behind trait objects so tests mount stubs.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn CredentialVerifier>,
    pub authz: Arc<dyn AuthorizationResolver>,
    pub list: Arc<ListService>,
    pub sessions: SessionManager,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "pantry ok" }))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/list", get(get_list).post(post_list))
        .with_state(state)
}

/// Start the pantry HTTP server bound to the given port.
pub async fn run_with_port(http_port: u16, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name { return Some(v[1..].to_string()); }
        }
    }
    None
}

fn set_session_cookie(token: &str) -> HeaderValue {
    // HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!("{}={}; HttpOnly; Secure; SameSite=Strict; Path=/", SESSION_COOKIE, token)).unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!("{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict; Path=/", SESSION_COOKIE)).unwrap()
}

fn err_response(err: &AppError) -> (StatusCode, Json<serde_json::Value>) {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"status":"error","code": err.code_str(), "message": err.message()})))
}

/// Session lookup plus a fresh membership resolution. Runs on every gated
/// request; resolver results are never reused across requests, so a group
/// change takes effect on the very next call.
async fn authed_context(state: &AppState, headers: &HeaderMap) -> AppResult<RequestContext> {
    let token = parse_cookie(headers, SESSION_COOKIE)
        .ok_or_else(|| AppError::unauthenticated("not logged in"))?;
    let principal = state
        .sessions
        .lookup(&token)
        .ok_or_else(|| AppError::unauthenticated("not logged in"))?;
    let groups = state.authz.resolve(&principal).await?;
    Ok(RequestContext { principal, groups })
}

async fn login(State(state): State<AppState>, Json(payload): Json<CredentialBundle>) -> impl IntoResponse {
    match state.verifier.verify(&payload).await {
        Ok(principal) => {
            let session = state.sessions.issue(principal.clone());
            info!("login user={}", principal);
            let mut headers = HeaderMap::new();
            headers.insert("Set-Cookie", set_session_cookie(&session.token));
            (StatusCode::OK, headers, Json(json!({"status":"ok","username": principal.as_str()})))
        }
        Err(e) => {
            let (status, body) = err_response(&e);
            (status, HeaderMap::new(), body)
        }
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = parse_cookie(&headers, SESSION_COOKIE) {
        state.sessions.destroy(&token);
    }
    let mut h = HeaderMap::new();
    h.insert("Set-Cookie", clear_session_cookie());
    (StatusCode::OK, h, Json(json!({"status":"ok"})))
}

async fn get_list(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let ctx = match authed_context(&state, &headers).await {
        Ok(c) => c,
        Err(e) => return err_response(&e),
    };
    debug!("list read by {}", ctx.principal);
    match state.list.get_list().await {
        Ok(items) => (StatusCode::OK, Json(json!({"status":"ok","list": items}))),
        Err(e) => err_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct AppendPayload { item: String }

async fn post_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AppendPayload>,
) -> impl IntoResponse {
    let ctx = match authed_context(&state, &headers).await {
        Ok(c) => c,
        Err(e) => return err_response(&e),
    };
    match state.list.append_item(&ctx.principal, &ctx.groups, payload.item).await {
        Ok(items) => (StatusCode::OK, Json(json!({"status":"ok","message":"Item added","list": items}))),
        Err(e) => err_response(&e),
    }
}
