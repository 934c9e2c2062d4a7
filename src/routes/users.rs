use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::users::{ChangePasswordRequest, UpdateUserRequest},
    error::AppResult,
    middleware::validate::ValidatedJson,
    models::User,
    response::ApiResponse,
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{user_id}", get(get_user).put(update_user))
        .route("/{user_id}/password", put(change_password))
}

#[utoipa::path(
    get,
    path = "/api/user/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = ApiResponse<User>),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = user_service::get_user(&state, user_id).await?;
    Ok(Json(ApiResponse::success("User profile", user)))
}

#[utoipa::path(
    put,
    path = "/api/user/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<User>),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = user_service::update_profile(&state, user_id, payload).await?;
    Ok(Json(ApiResponse::success("Profile updated successfully", user)))
}

#[utoipa::path(
    put,
    path = "/api/user/{user_id}/password",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Old password is incorrect")
    ),
    tag = "Users"
)]
pub async fn change_password(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    user_service::change_password(&state, user_id, payload).await?;
    Ok(Json(ApiResponse::empty("Password changed successfully")))
}
