use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::reviews::{CreateReviewRequest, ReviewList},
    error::AppResult,
    middleware::{acting_user::ActingUser, validate::ValidatedJson},
    models::Review,
    response::ApiResponse,
    services::review_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_review))
        .route("/product/{product_id}", get(list_product_reviews))
        .route("/{id}", delete(delete_review))
}

#[utoipa::path(
    get,
    path = "/api/reviews/product/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Reviews, newest first", body = ApiResponse<ReviewList>)
    ),
    tag = "Reviews"
)]
pub async fn list_product_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let items = review_service::list_product_reviews(&state, product_id).await?;
    Ok(Json(ApiResponse::success("Reviews", ReviewList { items })))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    params(("userId" = Uuid, Query, description = "Reviewer")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created", body = ApiResponse<Review>),
        (status = 400, description = "Already reviewed or invalid rating"),
        (status = 404, description = "Product or user not found")
    ),
    tag = "Reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    user: ActingUser,
    ValidatedJson(payload): ValidatedJson<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Review>>)> {
    let review = review_service::create_review(&state, user.user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Review created successfully", review)),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/reviews/{id}",
    params(
        ("id" = Uuid, Path, description = "Review ID"),
        ("userId" = Uuid, Query, description = "Reviewer")
    ),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 403, description = "Review belongs to another user"),
        (status = 404, description = "Review not found")
    ),
    tag = "Reviews"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    review_service::delete_review(&state, user.user_id, id).await?;
    Ok(Json(ApiResponse::empty("Review deleted successfully")))
}
