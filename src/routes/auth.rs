use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use crate::{
    dto::auth::RegisterRequest,
    error::AppResult,
    middleware::validate::ValidatedJson,
    models::User,
    response::ApiResponse,
    services::auth_service::register_user,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/register", post(register))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user", body = ApiResponse<User>),
        (status = 400, description = "Username or email already taken")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let user = register_user(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User registered successfully", user)),
    ))
}
