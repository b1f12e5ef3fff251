use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{instrument, warn};

use super::claims::{Identity, TokenKind};
use super::credentials::normalize_email;
use super::dto::{
    LoginRequest, LoginResponse, LogoutRequest, MessageResponse, PublicUser, RefreshResponse,
    RegisterRequest, RegisterResponse,
};
use super::extractors::{AuthUser, BearerToken};
use crate::{
    error::{AppError, AppResult},
    extract::{is_valid_email, required, JsonBody},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let username = required(payload.username, "username")?;
    let email = normalize_email(&required(payload.email, "email")?);
    let password = required(payload.password, "password")?;

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("invalid email".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user = state
        .credentials
        .create_user(&username, &email, &password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            msg: "user_created",
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    // No format check here: a malformed address simply has no account.
    let email = normalize_email(&required(payload.email, "email")?);
    let password = required(payload.password, "password")?;

    let user = state.credentials.verify_credentials(&email, &password).await?;

    let identity = Identity {
        user_id: user.id,
        username: user.username.clone(),
    };
    let access_token = state.tokens.issue_access(&identity)?;
    let refresh_token = state.tokens.issue_refresh(&identity)?;

    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    }))
}

/// Revoke the presented access token, plus the caller's refresh token if one
/// is supplied in the body.
#[instrument(skip(state, auth, payload), fields(user_id = %auth.id()))]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Option<Json<LogoutRequest>>,
) -> AppResult<Json<MessageResponse>> {
    state.tokens.revoke(&auth.token).await?;

    if let Some(refresh) = payload.and_then(|Json(p)| p.refresh_token) {
        match state.tokens.verify(&refresh, TokenKind::Refresh).await {
            Ok(claims) if claims.sub == auth.id() => state.tokens.revoke(&refresh).await?,
            Ok(claims) => {
                warn!(owner = %claims.sub, "refusing to revoke another user's refresh token")
            }
            Err(e) => warn!(error = %e, "ignoring unusable refresh token on logout"),
        }
    }

    Ok(Json(MessageResponse { msg: "logged_out" }))
}

#[instrument(skip(state, token))]
pub async fn refresh(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> AppResult<Json<RefreshResponse>> {
    let access_token = state.tokens.refresh(&token).await?;
    Ok(Json(RefreshResponse { access_token }))
}
