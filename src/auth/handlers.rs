use axum::{
    extract::{rejection::JsonRejection, FromRef, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        cookie::{clear_refresh_cookie, read_cookie, refresh_cookie, REFRESH_COOKIE},
        dto::{AccessTokenResponse, LoginRequest},
        jwt::JwtKeys,
        services,
    },
    error::ServiceResult,
    state::AppState,
    users::dto::MessageResponse,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", get(refresh))
        .route("/auth/verification/resend/:email", get(resend_verification))
        .route("/auth/verification/:token", get(confirm_email))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ServiceResult<Response> {
    let Json(payload) = payload?;
    let session = services::login(&state, payload).await?;

    let max_age = JwtKeys::from_ref(&state).refresh_ttl.as_secs();
    let cookie = refresh_cookie(&session.refresh_token, max_age, state.config.cookie_secure);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AccessTokenResponse {
            access_token: session.access_token,
        }),
    )
        .into_response())
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if read_cookie(&headers, REFRESH_COOKIE).is_none() {
        return StatusCode::NO_CONTENT.into_response();
    }
    (
        [(header::SET_COOKIE, clear_refresh_cookie(state.config.cookie_secure))],
        Json(MessageResponse::new("Cookie cleared")),
    )
        .into_response()
}

#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServiceResult<Json<AccessTokenResponse>> {
    let access_token = services::refresh(&state, read_cookie(&headers, REFRESH_COOKIE)).await?;
    Ok(Json(AccessTokenResponse { access_token }))
}

#[instrument(skip(state))]
pub async fn resend_verification(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ServiceResult<Json<MessageResponse>> {
    let message = services::resend_verification(&state, &email).await?;
    Ok(Json(MessageResponse::new(message)))
}

#[instrument(skip_all)]
pub async fn confirm_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ServiceResult<Json<MessageResponse>> {
    let message = services::confirm_email(&state, &token).await?;
    Ok(Json(MessageResponse::new(message)))
}
