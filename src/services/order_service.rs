use std::{
    collections::HashMap,
    str::FromStr,
    sync::{
        LazyLock,
        atomic::{AtomicU32, Ordering},
    },
};

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, StatusHistory, UpdateOrderStatusRequest},
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        enums::{OrderStatus, PaymentMethod, PaymentStatus},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        order_status_history::{Column as HistoryCol, Entity as OrderStatusHistory},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    history::record_status_change,
    models::{Order, OrderSummary, StatusHistoryEntry},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::{
        cart_service::{cart_lines, find_cart},
        inventory::{decrease_stock, ensure_available, increase_stock},
        user_service::find_user,
    },
    state::AppState,
};

static ORDER_SEQUENCE: LazyLock<AtomicU32> =
    LazyLock::new(|| AtomicU32::new((Uuid::new_v4().as_u128() % 1000) as u32));

/// `ORD-<YYYYMMDDHHMMSS>-<NNN>`.
///
/// The suffix is a process-wide counter with a random starting point, so a
/// single process never repeats a number within one second until it has
/// handed out a thousand of them. The unique column on `order_number`
/// catches anything that still collides.
pub fn generate_order_number() -> String {
    let suffix = ORDER_SEQUENCE.fetch_add(1, Ordering::Relaxed) % 1000;
    format!("ORD-{}-{:03}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
}

fn parse_status(raw: &str) -> AppResult<OrderStatus> {
    OrderStatus::from_str(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("Invalid order status: {raw}")))
}

/// Turns the user's cart into an order.
///
/// Every line is checked against current stock before anything is written.
/// The order, its lines, the stock decrements, the first history entry and
/// the emptied cart are committed together or not at all.
pub async fn create_order(
    state: &AppState,
    user_id: Uuid,
    payload: CreateOrderRequest,
) -> AppResult<Order> {
    let payment_method = PaymentMethod::from_str(payload.payment_method.trim()).map_err(|_| {
        AppError::BadRequest(format!("Invalid payment method: {}", payload.payment_method))
    })?;

    let txn = state.orm.begin().await?;

    let user = find_user(&txn, user_id).await?;
    let cart = find_cart(&txn, user.id).await?;
    let lines = cart_lines(&txn, cart.id).await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    for (item, product) in &lines {
        ensure_available(product, item.quantity)?;
    }
    let total_amount: Decimal = lines.iter().map(|(item, _)| item.subtotal()).sum();

    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        order_number: Set(generate_order_number()),
        total_amount: Set(total_amount),
        status: Set(OrderStatus::Pending),
        payment_method: Set(payment_method),
        payment_status: Set(PaymentStatus::Pending),
        shipping_name: Set(payload.shipping_name),
        shipping_address: Set(payload.shipping_address),
        shipping_phone: Set(payload.shipping_phone),
        shipping_fee: Set(Decimal::ZERO),
        discount_amount: Set(Decimal::ZERO),
        note: Set(payload.note),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await
    .map_err(|e| AppError::on_unique_violation(e, "Order number collision, please retry"))?;

    let mut items = Vec::with_capacity(lines.len());
    for (line_number, (cart_item, product)) in (1..).zip(lines.iter()) {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            line_number: Set(line_number),
            product_name: Set(product.name.clone()),
            quantity: Set(cart_item.quantity),
            price: Set(cart_item.price),
            subtotal: Set(cart_item.subtotal()),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
        items.push(item);

        decrease_stock(&txn, product.id, cart_item.quantity).await?;
    }

    record_status_change(
        &txn,
        order.id,
        None,
        OrderStatus::Pending,
        Some("Order created".into()),
        user.id,
    )
    .await?;

    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        %user_id,
        total = %order.total_amount,
        lines = items.len(),
        "order created"
    );
    Ok(Order::new(order, items))
}

#[derive(Debug, FromQueryResult)]
struct ItemCountRow {
    order_id: Uuid,
    item_count: i64,
}

/// The user's orders, newest first.
pub async fn list_orders(
    state: &AppState,
    user_id: Uuid,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, per_page, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(OrderCol::UserId.eq(user_id));
    if let Some(status) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        condition = condition.add(OrderCol::Status.eq(parse_status(status)?));
    }

    let finder = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(per_page as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let counts: HashMap<Uuid, i64> = if ids.is_empty() {
        HashMap::new()
    } else {
        OrderItems::find()
            .select_only()
            .column(OrderItemCol::OrderId)
            .column_as(Expr::col(OrderItemCol::Id).count(), "item_count")
            .filter(OrderItemCol::OrderId.is_in(ids))
            .group_by(OrderItemCol::OrderId)
            .into_model::<ItemCountRow>()
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|row| (row.order_id, row.item_count))
            .collect()
    };

    let items = orders
        .into_iter()
        .map(|order| OrderSummary {
            item_count: counts.get(&order.id).copied().unwrap_or(0),
            id: order.id,
            order_number: order.order_number,
            total_amount: order.total_amount,
            status: order.status,
            payment_status: order.payment_status,
            created_at: order.created_at.with_timezone(&Utc),
        })
        .collect();

    Ok(ApiResponse::paged(
        "Orders",
        OrderList { items },
        Meta::new(page, per_page, total),
    ))
}

pub async fn get_order(state: &AppState, user_id: Uuid, order_id: Uuid) -> AppResult<Order> {
    let order = find_order(&state.orm, order_id, false).await?;
    ensure_owner(&order, user_id)?;
    let items = order_items(&state.orm, order.id).await?;
    Ok(Order::new(order, items))
}

/// Moves an order to any status and records who did it.
///
/// No transition graph is enforced here; cancellation by the owner goes
/// through [`cancel_order`], which does restrict the starting status.
pub async fn update_status(
    state: &AppState,
    order_id: Uuid,
    acting_user_id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<Order> {
    let txn = state.orm.begin().await?;

    let order = find_order(&txn, order_id, true).await?;
    let new_status = parse_status(&payload.status)?;
    let actor = find_user(&txn, acting_user_id).await?;

    let old_status = order.status;
    let mut active: OrderActive = order.into();
    active.status = Set(new_status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    record_status_change(
        &txn,
        order.id,
        Some(old_status),
        new_status,
        payload.note,
        actor.id,
    )
    .await?;
    let items = order_items(&txn, order.id).await?;

    txn.commit().await?;

    tracing::info!(
        order_number = %order.order_number,
        from = %old_status,
        to = %new_status,
        changed_by = %actor.id,
        "order status updated"
    );
    Ok(Order::new(order, items))
}

/// Cancels the caller's own order and puts every line back into stock.
pub async fn cancel_order(state: &AppState, user_id: Uuid, order_id: Uuid) -> AppResult<()> {
    let txn = state.orm.begin().await?;

    let order = find_order(&txn, order_id, true).await?;
    ensure_owner(&order, user_id)?;
    if !order.status.is_cancellable() {
        return Err(AppError::BadRequest(
            "Cannot cancel order in current status".into(),
        ));
    }

    let old_status = order.status;
    let order_number = order.order_number.clone();
    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    for item in order_items(&txn, order_id).await? {
        increase_stock(&txn, item.product_id, item.quantity).await?;
    }

    record_status_change(
        &txn,
        order_id,
        Some(old_status),
        OrderStatus::Cancelled,
        Some("Order cancelled by user".into()),
        user_id,
    )
    .await?;

    txn.commit().await?;

    tracing::info!(%order_number, %user_id, "order cancelled");
    Ok(())
}

/// Status audit trail of the caller's own order, oldest entry first.
pub async fn order_history(
    state: &AppState,
    user_id: Uuid,
    order_id: Uuid,
) -> AppResult<StatusHistory> {
    let order = find_order(&state.orm, order_id, false).await?;
    ensure_owner(&order, user_id)?;

    let items = OrderStatusHistory::find()
        .filter(HistoryCol::OrderId.eq(order.id))
        .order_by_asc(HistoryCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(StatusHistoryEntry::from)
        .collect();

    Ok(StatusHistory { items })
}

async fn find_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    for_update: bool,
) -> AppResult<OrderModel> {
    let mut finder = Orders::find_by_id(order_id);
    if for_update {
        finder = finder.lock(LockType::Update);
    }
    finder
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Order", order_id))
}

fn ensure_owner(order: &OrderModel, user_id: Uuid) -> AppResult<()> {
    if order.user_id != user_id {
        return Err(AppError::Unauthorized(
            "This order does not belong to you".into(),
        ));
    }
    Ok(())
}

async fn order_items<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderItemModel>> {
    Ok(OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::LineNumber)
        .all(conn)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_carry_timestamp_and_three_digit_suffix() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 14);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 3);
        assert!(parts[2].parse::<u32>().is_ok_and(|n| n < 1000));
    }

    #[test]
    fn consecutive_order_numbers_differ() {
        let numbers: std::collections::HashSet<String> =
            (0..50).map(|_| generate_order_number()).collect();
        assert_eq!(numbers.len(), 50);
    }

    #[test]
    fn status_names_parse_case_insensitively() {
        assert_eq!(parse_status("DELIVERED").ok(), Some(OrderStatus::Delivered));
        assert_eq!(parse_status(" shipped ").ok(), Some(OrderStatus::Shipped));
        assert!(matches!(parse_status("LOST"), Err(AppError::BadRequest(_))));
    }
}
