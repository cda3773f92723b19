use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{jwt::AuthUser, services::send_verification},
    error::{ServiceError, ServiceResult},
    state::AppState,
    users::{
        dto::{CreateUserRequest, DeleteUserRequest, MessageResponse, UpdateUserRequest},
        User,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route(
        "/users",
        get(list_users)
            .post(create_user)
            .patch(update_user)
            .delete(delete_user),
    )
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ServiceResult<Json<Vec<User>>> {
    Ok(Json(state.users.list_users().await?))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ServiceResult<(StatusCode, Json<MessageResponse>)> {
    let Json(payload) = payload?;
    let done = state.users.create_user(payload).await?;

    // the account exists either way; the user can ask for another link
    if let Err(e) = send_verification(&state, &done.user).await {
        warn!(error = %e, user_id = %done.user.id, "verification email not sent");
    }

    Ok((StatusCode::CREATED, Json(MessageResponse::new(done.message))))
}

/// Access tokens outlive account changes, so the caller is looked up again.
async fn ensure_active(state: &AppState, caller: &AuthUser) -> ServiceResult<()> {
    match state.users.store().find_by_id(caller.id).await? {
        Some(user) if user.active => Ok(()),
        _ => {
            warn!(user_id = %caller.id, "token for missing or inactive user");
            Err(ServiceError::Unauthorized("Unauthorized".into()))
        }
    }
}

#[instrument(skip_all, fields(caller = %caller.id))]
pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ServiceResult<Json<MessageResponse>> {
    ensure_active(&state, &caller).await?;
    let Json(payload) = payload?;
    let done = state.users.update_user(payload).await?;
    Ok(Json(MessageResponse::new(done.message)))
}

#[instrument(skip_all, fields(caller = %caller.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<DeleteUserRequest>, JsonRejection>,
) -> ServiceResult<Json<String>> {
    ensure_active(&state, &caller).await?;
    let Json(payload) = payload?;
    let done = state.users.delete_user(payload).await?;
    Ok(Json(done.message))
}
