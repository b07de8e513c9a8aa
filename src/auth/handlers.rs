use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, CheckEmailRequest, CheckEmailResponse, LoginRequest, PublicUser,
            RegisterRequest,
        },
        extractors::CurrentUser,
        service::is_valid_email,
        session::{clear_session_cookie, session_cookie, SESSION_COOKIE},
    },
    error::AuthError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/verify/:token", get(verify_email))
        .route("/auth/check-email", post(check_email))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AuthError> {
    let email = payload.email.trim().to_lowercase();

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AuthError::Validation("Invalid email"));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(AuthError::Validation("Password too short"));
    }

    let registration = state.auth.register(&email, &payload.password).await?;

    // The original flow logs the new account straight in.
    let session = state
        .sessions
        .create(registration.user.id, payload.remember)
        .await?;

    let jar = jar.add(session_cookie(&session, payload.remember));
    Ok((
        jar,
        Json(AuthResponse {
            user: PublicUser::from(&registration.user),
            verification_pending: registration.verification_pending,
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AuthError> {
    let email = payload.email.trim().to_lowercase();

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AuthError::Validation("Invalid email"));
    }

    let user = state.auth.authenticate(&email, &payload.password).await?;
    let session = state.sessions.create(user.id, payload.remember).await?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    let jar = jar.add(session_cookie(&session, payload.remember));
    Ok((
        jar,
        Json(AuthResponse {
            user: PublicUser::from(&user),
            verification_pending: false,
        }),
    ))
}

/// Invalidate the presented session and clear the cookie. Succeeds no
/// matter what cookie (if any) came in.
#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar), AuthError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.invalidate(cookie.value()).await?;
    }
    let jar = jar.add(clear_session_cookie());
    Ok((StatusCode::NO_CONTENT, jar))
}

#[instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<serde_json::Value>, AuthError> {
    state.auth.verify_email(&token).await?;
    Ok(Json(json!({ "status": "verified" })))
}

#[instrument(skip(state, payload))]
pub async fn check_email(
    State(state): State<AppState>,
    Json(payload): Json<CheckEmailRequest>,
) -> Result<Json<CheckEmailResponse>, AuthError> {
    let email = payload.email.trim().to_lowercase();

    if !is_valid_email(&email) {
        return Err(AuthError::Validation("Invalid email"));
    }

    let exists = state.auth.email_exists(&email).await?;
    Ok(Json(CheckEmailResponse { exists }))
}

#[instrument(skip(current))]
pub async fn get_me(current: CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(&current.user))
}
