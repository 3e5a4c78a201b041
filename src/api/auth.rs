//! Authentication API endpoints
//!
//! - POST /api/v1/auth/setup - Create the first admin
//! - GET  /api/v1/auth/has-admin - Whether setup is done
//! - POST /api/v1/auth/login - Log in
//! - POST /api/v1/auth/logout - Log out
//! - GET  /api/v1/auth/me - Current user
//! - PUT  /api/v1/auth/password - Change own password

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::middleware::{extract_ip_address, extract_session_token, ApiError, AuthenticatedUser};
use super::AppState;
use crate::models::{Session, User};
use crate::services::{LoginInput, SetupInput, UserServiceError};

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct HasAdminResponse {
    pub has_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/setup", post(setup))
        .route("/login", post(login))
        .route("/has-admin", get(has_admin))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/password", put(change_password))
}

async fn has_admin(State(state): State<AppState>) -> Result<Json<HasAdminResponse>, ApiError> {
    let has_admin = state.user_service.has_admin().await?;
    Ok(Json(HasAdminResponse { has_admin }))
}

/// POST /api/v1/auth/setup - Create the first admin and log them in
async fn setup(
    State(state): State<AppState>,
    Json(body): Json<SetupInput>,
) -> Result<impl IntoResponse, ApiError> {
    let password = body.password.clone();
    let user = state.user_service.setup(body).await?;
    let (session, user) = state
        .user_service
        .login(LoginInput::new(&user.username, password))
        .await?;

    Ok((
        StatusCode::CREATED,
        session_cookie(&state, &session)?,
        Json(AuthResponse {
            user,
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(ip) = extract_ip_address(&headers) {
        if !state.rate_limiter.allow_login_request(ip).await {
            tracing::warn!("Login rate limit hit for {}", ip);
            return Err(ApiError::rate_limited(
                "Too many requests, please try again later",
                60,
            ));
        }
    }

    let username = body.username_or_email.trim().to_lowercase();
    if state.rate_limiter.is_username_limited(&username).await {
        tracing::warn!("Too many failed logins for '{}'", username);
        return Err(ApiError::rate_limited(
            "Too many failed attempts, please try again in 15 minutes",
            900,
        ));
    }

    let (session, user) = match state.user_service.login(body).await {
        Ok(result) => result,
        Err(e) => {
            if matches!(e, UserServiceError::AuthenticationError(_)) {
                state.rate_limiter.record_failed_login(&username).await;
            }
            return Err(e.into());
        }
    };
    state.rate_limiter.clear_username(&username).await;
    tracing::info!("User '{}' logged in", user.username);

    Ok((
        session_cookie(&state, &session)?,
        Json(AuthResponse {
            user,
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;
    state.user_service.logout(&token).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/v1/auth/me
async fn me(user: AuthenticatedUser) -> Json<User> {
    Json(user.0)
}

/// PUT /api/v1/auth/password
async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .user_service
        .change_password(user.0.id, &body.current_password, &body.new_password)
        .await
        .map_err(|e| match e {
            // A wrong current password must not look like an expired session
            UserServiceError::AuthenticationError(msg) => ApiError::validation_error(msg),
            other => other.into(),
        })?;
    Ok(StatusCode::NO_CONTENT)
}

fn session_cookie(state: &AppState, session: &Session) -> Result<HeaderMap, ApiError> {
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id,
        state.user_service.session_lifetime().num_seconds()
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(ApiError::internal)?,
    );
    Ok(headers)
}
