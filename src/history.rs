use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use uuid::Uuid;

use crate::{
    entity::{
        enums::OrderStatus,
        order_status_history::{ActiveModel as HistoryActive, Model as HistoryModel},
    },
    error::AppResult,
};

/// Appends one row to an order's status audit trail.
pub async fn record_status_change<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    old_status: Option<OrderStatus>,
    new_status: OrderStatus,
    note: Option<String>,
    changed_by: Uuid,
) -> AppResult<HistoryModel> {
    let entry = HistoryActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        old_status: Set(old_status),
        new_status: Set(new_status),
        note: Set(note),
        changed_by: Set(Some(changed_by)),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    Ok(entry)
}
