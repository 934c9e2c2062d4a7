use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, StatusHistory, UpdateOrderStatusRequest},
    error::AppResult,
    middleware::{acting_user::ActingUser, validate::ValidatedJson},
    models::Order,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn route() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/{id}", get(get_order).delete(cancel_order))
        .route("/{id}/status", put(update_order_status))
        .route("/{id}/history", get(order_history))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    params(("userId" = Uuid, Query, description = "Acting user")),
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed from the cart", body = ApiResponse<Order>),
        (status = 400, description = "Empty cart, insufficient stock or invalid payment method"),
        (status = 404, description = "User or cart not found")
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: ActingUser,
    ValidatedJson(payload): ValidatedJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let order = order_service::create_order(&state, user.user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Order created successfully", order)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(("userId" = Uuid, Query, description = "Acting user"), OrderListQuery),
    responses(
        (status = 200, description = "The user's orders, newest first", body = ApiResponse<OrderList>)
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: ActingUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, user.user_id, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("userId" = Uuid, Query, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Order with its lines", body = ApiResponse<Order>),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found")
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = order_service::get_order(&state, user.user_id, id).await?;
    Ok(Json(ApiResponse::success("Order", order)))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("userId" = Uuid, Query, description = "User making the change")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<Order>),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order or user not found")
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = order_service::update_status(&state, id, user.user_id, payload).await?;
    Ok(Json(ApiResponse::success("Order status updated successfully", order)))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("userId" = Uuid, Query, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Order cancelled and stock restored"),
        (status = 400, description = "Order can no longer be cancelled"),
        (status = 403, description = "Order belongs to another user")
    ),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    order_service::cancel_order(&state, user.user_id, id).await?;
    Ok(Json(ApiResponse::empty("Order cancelled successfully")))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/history",
    params(
        ("id" = Uuid, Path, description = "Order ID"),
        ("userId" = Uuid, Query, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Status changes, oldest first", body = ApiResponse<StatusHistory>),
        (status = 403, description = "Order belongs to another user")
    ),
    tag = "Orders"
)]
pub async fn order_history(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<StatusHistory>>> {
    let history = order_service::order_history(&state, user.user_id, id).await?;
    Ok(Json(ApiResponse::success("Order history", history)))
}
