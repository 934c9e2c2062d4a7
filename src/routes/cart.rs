use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    error::AppResult,
    middleware::{acting_user::ActingUser, validate::ValidatedJson},
    models::Cart,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", axum::routing::post(add_item))
        .route("/items/{item_id}", put(update_item).delete(remove_item))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    params(("userId" = Uuid, Query, description = "Acting user")),
    responses(
        (status = 200, description = "Current cart", body = ApiResponse<Cart>),
        (status = 404, description = "Cart not found")
    ),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: ActingUser,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = cart_service::get_cart(&state, user.user_id).await?;
    Ok(Json(ApiResponse::success("Cart", cart)))
}

#[utoipa::path(
    post,
    path = "/api/cart/items",
    params(("userId" = Uuid, Query, description = "Acting user")),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added", body = ApiResponse<Cart>),
        (status = 400, description = "Insufficient stock"),
        (status = 404, description = "Product not found")
    ),
    tag = "Cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: ActingUser,
    ValidatedJson(payload): ValidatedJson<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = cart_service::add_item(&state, user.user_id, payload).await?;
    Ok(Json(ApiResponse::success("Item added to cart", cart)))
}

#[utoipa::path(
    put,
    path = "/api/cart/items/{item_id}",
    params(
        ("item_id" = Uuid, Path, description = "Cart item ID"),
        ("userId" = Uuid, Query, description = "Acting user")
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity updated", body = ApiResponse<Cart>),
        (status = 400, description = "Insufficient stock"),
        (status = 403, description = "Item belongs to another cart")
    ),
    tag = "Cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: ActingUser,
    Path(item_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = cart_service::update_item(&state, user.user_id, item_id, payload).await?;
    Ok(Json(ApiResponse::success("Cart item updated", cart)))
}

#[utoipa::path(
    delete,
    path = "/api/cart/items/{item_id}",
    params(
        ("item_id" = Uuid, Path, description = "Cart item ID"),
        ("userId" = Uuid, Query, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Item removed", body = ApiResponse<Cart>),
        (status = 403, description = "Item belongs to another cart")
    ),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    user: ActingUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = cart_service::remove_item(&state, user.user_id, item_id).await?;
    Ok(Json(ApiResponse::success("Item removed from cart", cart)))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    params(("userId" = Uuid, Query, description = "Acting user")),
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse<Cart>)
    ),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: ActingUser,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let cart = cart_service::clear_cart(&state, user.user_id).await?;
    Ok(Json(ApiResponse::success("Cart cleared", cart)))
}
