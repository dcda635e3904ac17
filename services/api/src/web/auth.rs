//! services/api/src/web/auth.rs
//!
//! Sign-in endpoints: start the Google redirect flow, receive its callback,
//! and log out.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use chrono::{Duration, Utc};
use emotionverse_core::identity::{ClientEnvironment, SignInNotice};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::{read_cookie, SESSION_COOKIE};
use crate::web::state::AppState;

const OAUTH_STATE_COOKIE: &str = "oauth_state";
const SESSION_DAYS: i64 = 30;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StartParams {
    /// Expo execution environment of the client (`storeClient`, `standalone`, `bare`).
    pub environment: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Shown to the user instead of starting the sign-in flow.
#[derive(Serialize, ToSchema)]
pub struct NoticeResponse {
    pub title: String,
    pub message: String,
}

impl From<SignInNotice> for NoticeResponse {
    fn from(notice: SignInNotice) -> Self {
        Self {
            title: notice.title,
            message: notice.message,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /auth/google/start - Begin Google sign-in
#[utoipa::path(
    get,
    path = "/auth/google/start",
    params(StartParams),
    responses(
        (status = 303, description = "Redirect to the Google consent page"),
        (status = 400, description = "Unknown environment"),
        (status = 409, description = "Sign-in unavailable in this environment", body = NoticeResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn start_sign_in_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StartParams>,
) -> Result<Response, ApiError> {
    let environment = params
        .environment
        .parse::<ClientEnvironment>()
        .map_err(|_| ApiError::UnknownEnvironment(params.environment.clone()))?;

    let csrf_state = Uuid::new_v4().to_string();
    let redirect_url = state.identity.sign_in(environment, &csrf_state)?;

    let cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/auth; Max-Age=600",
        OAUTH_STATE_COOKIE, csrf_state
    );
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to(&redirect_url)).into_response())
}

/// GET /auth/google/callback - Finish Google sign-in
#[utoipa::path(
    get,
    path = "/auth/google/callback",
    params(CallbackParams),
    responses(
        (status = 303, description = "Signed in; session cookie set"),
        (status = 400, description = "Missing code or state mismatch"),
        (status = 401, description = "Google rejected the sign-in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn sign_in_callback_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if let Some(reason) = params.error {
        info!("Sign-in cancelled by provider: {}", reason);
        return Err((StatusCode::UNAUTHORIZED, format!("Sign-in failed: {}", reason)));
    }

    // 1. Check the CSRF state round-tripped through the provider
    let expected = read_cookie(&headers, OAUTH_STATE_COOKIE);
    if expected.is_none() || expected != params.state.as_deref() {
        return Err((StatusCode::BAD_REQUEST, "Sign-in state mismatch".to_string()));
    }
    let code = params
        .code
        .ok_or((StatusCode::BAD_REQUEST, "Missing authorization code".to_string()))?;

    // 2. Let the provider vouch for the user
    let verified = state.identity.complete_sign_in(&code).await.map_err(|e| {
        error!("Sign-in error: {:?}", e);
        (StatusCode::UNAUTHORIZED, "Sign-in failed".to_string())
    })?;

    // 3. Create or refresh the user
    let user = state.auth.upsert_user(&verified).await.map_err(|e| {
        error!("Failed to store user: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user".to_string())
    })?;

    // 4. Create auth session
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_DAYS);
    state
        .auth
        .create_auth_session(&auth_session_id, user.id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
        })?;

    // 5. Set session cookie, drop the state cookie
    let session_cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        auth_session_id,
        Duration::days(SESSION_DAYS).num_seconds()
    );
    let clear_state = format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/auth; Max-Age=0",
        OAUTH_STATE_COOKIE
    );

    Ok((
        AppendHeaders([
            (header::SET_COOKIE, session_cookie),
            (header::SET_COOKIE, clear_state),
        ]),
        Redirect::to("/"),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Parse session ID from cookie
    let auth_session_id = read_cookie(&headers, SESSION_COOKIE)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 2. Delete auth session
    state
        .auth
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;

    // 3. Clear cookie
    let cookie = format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    );

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}
