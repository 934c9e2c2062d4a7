mod common;

use common::{
    add_to_cart, create_category_named, create_product_in, create_user, order_request,
    setup_state, stock_of,
};
use foodstore_api::{
    dto::orders::UpdateOrderStatusRequest,
    entity::{
        OrderItems, OrderStatusHistory, Orders,
        enums::{OrderStatus, PaymentMethod, PaymentStatus},
    },
    error::AppError,
    routes::params::OrderListQuery,
    services::{cart_service, inventory, order_service},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};

fn status_request(status: &str, note: Option<&str>) -> UpdateOrderStatusRequest {
    UpdateOrderStatusRequest {
        status: status.into(),
        note: note.map(Into::into),
    }
}

#[tokio::test]
async fn create_order_decrements_stock_and_empties_cart() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "lan").await?;
    let soups = create_category_named(&state, "Soups", None).await?;
    let pho = create_product_in(&state, soups, "Pho Bo", dec!(45000), 5).await?;

    add_to_cart(&state, user_id, pho, 3).await?;
    let order = order_service::create_order(&state, user_id, order_request("COD")).await?;

    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.payment_method, PaymentMethod::Cod);
    assert_eq!(order.total_amount, dec!(135000));
    assert_eq!(order.shipping_fee, Decimal::ZERO);
    assert_eq!(order.discount_amount, Decimal::ZERO);
    assert_eq!(
        order.final_amount,
        order.total_amount + order.shipping_fee - order.discount_amount
    );

    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].product_id, pho);
    assert_eq!(order.items[0].product_name, "Pho Bo");
    assert_eq!(order.items[0].quantity, 3);
    assert_eq!(order.items[0].subtotal, dec!(135000));

    assert_eq!(stock_of(&state, pho).await?, 2);
    let cart = cart_service::get_cart(&state, user_id).await?;
    assert!(cart.items.is_empty());
    assert_eq!(cart.total_amount, Decimal::ZERO);

    let history = order_service::order_history(&state, user_id, order.id).await?;
    assert_eq!(history.items.len(), 1);
    assert_eq!(history.items[0].old_status, None);
    assert_eq!(history.items[0].new_status, OrderStatus::Pending);
    assert_eq!(history.items[0].note.as_deref(), Some("Order created"));
    assert_eq!(history.items[0].changed_by, Some(user_id));
    Ok(())
}

#[tokio::test]
async fn empty_cart_is_rejected_without_side_effects() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "minh").await?;

    let err = order_service::create_order(&state, user_id, order_request("COD"))
        .await
        .unwrap_err();

    match err {
        AppError::BadRequest(msg) => assert_eq!(msg, "Cart is empty"),
        other => panic!("expected bad request, got {other:?}"),
    }
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(OrderStatusHistory::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_user_cannot_order() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let err = order_service::create_order(&state, uuid::Uuid::new_v4(), order_request("COD"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn stock_pre_check_failure_leaves_everything_untouched() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "hoa").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let rice = create_product_in(&state, food, "Com Tam", dec!(38000), 5).await?;
    let tea = create_product_in(&state, food, "Lotus Tea", dec!(15000), 2).await?;

    add_to_cart(&state, user_id, rice, 3).await?;
    add_to_cart(&state, user_id, tea, 2).await?;
    // Someone else buys a tea between add-to-cart and checkout.
    inventory::decrease_stock(&state.orm, tea, 1).await?;

    let err = order_service::create_order(&state, user_id, order_request("COD"))
        .await
        .unwrap_err();

    match err {
        AppError::InsufficientStock(msg) => assert!(msg.contains("Lotus Tea")),
        other => panic!("expected insufficient stock, got {other:?}"),
    }
    assert_eq!(Orders::find().count(&state.orm).await?, 0);
    assert_eq!(OrderItems::find().count(&state.orm).await?, 0);
    assert_eq!(stock_of(&state, rice).await?, 5);
    assert_eq!(stock_of(&state, tea).await?, 1);
    let cart = cart_service::get_cart(&state, user_id).await?;
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.total_items, 5);
    Ok(())
}

#[tokio::test]
async fn invalid_payment_method_is_a_bad_request() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "tuan").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Ga", dec!(40000), 5).await?;
    add_to_cart(&state, user_id, pho, 1).await?;

    let err = order_service::create_order(&state, user_id, order_request("BITCOIN"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(stock_of(&state, pho).await?, 5);
    Ok(())
}

#[tokio::test]
async fn cancel_restores_stock_of_every_line() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "mai").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 10).await?;
    let coffee = create_product_in(&state, food, "Iced Coffee", dec!(25000), 4).await?;

    add_to_cart(&state, user_id, pho, 2).await?;
    add_to_cart(&state, user_id, coffee, 4).await?;
    let order = order_service::create_order(&state, user_id, order_request("E_WALLET")).await?;
    assert_eq!(stock_of(&state, pho).await?, 8);
    assert_eq!(stock_of(&state, coffee).await?, 0);

    order_service::cancel_order(&state, user_id, order.id).await?;

    assert_eq!(stock_of(&state, pho).await?, 10);
    assert_eq!(stock_of(&state, coffee).await?, 4);
    let reloaded = order_service::get_order(&state, user_id, order.id).await?;
    assert_eq!(reloaded.status, OrderStatus::Cancelled);

    let history = order_service::order_history(&state, user_id, order.id).await?;
    assert_eq!(history.items.len(), 2);
    let last = &history.items[1];
    assert_eq!(last.old_status, Some(OrderStatus::Pending));
    assert_eq!(last.new_status, OrderStatus::Cancelled);
    assert_eq!(last.note.as_deref(), Some("Order cancelled by user"));
    Ok(())
}

#[tokio::test]
async fn confirmed_orders_can_still_be_cancelled() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "khoa").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 3).await?;
    add_to_cart(&state, user_id, pho, 3).await?;
    let order = order_service::create_order(&state, user_id, order_request("COD")).await?;

    order_service::update_status(&state, order.id, user_id, status_request("CONFIRMED", None))
        .await?;
    order_service::cancel_order(&state, user_id, order.id).await?;

    assert_eq!(stock_of(&state, pho).await?, 3);
    Ok(())
}

#[tokio::test]
async fn shipped_order_cannot_be_cancelled() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "an").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 5).await?;
    add_to_cart(&state, user_id, pho, 2).await?;
    let order = order_service::create_order(&state, user_id, order_request("COD")).await?;
    order_service::update_status(&state, order.id, user_id, status_request("SHIPPED", None))
        .await?;

    let err = order_service::cancel_order(&state, user_id, order.id)
        .await
        .unwrap_err();

    match err {
        AppError::BadRequest(msg) => assert_eq!(msg, "Cannot cancel order in current status"),
        other => panic!("expected bad request, got {other:?}"),
    }
    let reloaded = order_service::get_order(&state, user_id, order.id).await?;
    assert_eq!(reloaded.status, OrderStatus::Shipped);
    assert_eq!(stock_of(&state, pho).await?, 3);
    Ok(())
}

#[tokio::test]
async fn status_update_is_permissive_and_audited() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "binh").await?;
    let staff_id = create_user(&state, "staff").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 5).await?;
    add_to_cart(&state, user_id, pho, 1).await?;
    let order = order_service::create_order(&state, user_id, order_request("COD")).await?;

    let updated = order_service::update_status(
        &state,
        order.id,
        staff_id,
        status_request("DELIVERED", Some("Handed to customer")),
    )
    .await?;
    assert_eq!(updated.status, OrderStatus::Delivered);

    let history = order_service::order_history(&state, user_id, order.id).await?;
    assert_eq!(history.items.len(), 2);
    let entry = &history.items[1];
    assert_eq!(entry.old_status, Some(OrderStatus::Pending));
    assert_eq!(entry.new_status, OrderStatus::Delivered);
    assert_eq!(entry.changed_by, Some(staff_id));
    assert_eq!(entry.note.as_deref(), Some("Handed to customer"));

    // Any status may follow any other.
    let back = order_service::update_status(&state, order.id, staff_id, status_request("PENDING", None))
        .await?;
    assert_eq!(back.status, OrderStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn unknown_status_or_actor_is_rejected() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "chi").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 5).await?;
    add_to_cart(&state, user_id, pho, 1).await?;
    let order = order_service::create_order(&state, user_id, order_request("COD")).await?;

    let err = order_service::update_status(&state, order.id, user_id, status_request("LOST", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = order_service::update_status(
        &state,
        order.id,
        uuid::Uuid::new_v4(),
        status_request("CONFIRMED", None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let reloaded = order_service::get_order(&state, user_id, order.id).await?;
    assert_eq!(reloaded.status, OrderStatus::Pending);
    let history = order_service::order_history(&state, user_id, order.id).await?;
    assert_eq!(history.items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn orders_are_private_to_their_owner() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let owner = create_user(&state, "owner").await?;
    let intruder = create_user(&state, "intruder").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 5).await?;
    add_to_cart(&state, owner, pho, 2).await?;
    let order = order_service::create_order(&state, owner, order_request("COD")).await?;

    assert!(matches!(
        order_service::get_order(&state, intruder, order.id).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        order_service::cancel_order(&state, intruder, order.id).await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        order_service::order_history(&state, intruder, order.id).await,
        Err(AppError::Unauthorized(_))
    ));
    assert_eq!(stock_of(&state, pho).await?, 3);
    Ok(())
}

#[tokio::test]
async fn order_list_summarises_newest_first() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "dung").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 10).await?;
    let tea = create_product_in(&state, food, "Lotus Tea", dec!(15000), 10).await?;

    add_to_cart(&state, user_id, pho, 1).await?;
    let first = order_service::create_order(&state, user_id, order_request("COD")).await?;
    add_to_cart(&state, user_id, pho, 1).await?;
    add_to_cart(&state, user_id, tea, 2).await?;
    let second = order_service::create_order(&state, user_id, order_request("BANK_TRANSFER")).await?;
    assert_ne!(first.order_number, second.order_number);

    let resp = order_service::list_orders(&state, user_id, OrderListQuery::default()).await?;
    let list = resp.data.expect("order list");
    assert_eq!(list.items.len(), 2);
    assert_eq!(list.items[0].id, second.id);
    assert_eq!(list.items[0].item_count, 2);
    assert_eq!(list.items[1].id, first.id);
    assert_eq!(list.items[1].item_count, 1);
    assert_eq!(resp.meta.and_then(|m| m.total), Some(2));

    let pending_only = OrderListQuery {
        status: Some("CANCELLED".into()),
        ..Default::default()
    };
    let resp = order_service::list_orders(&state, user_id, pending_only).await?;
    assert!(resp.data.expect("order list").items.is_empty());
    Ok(())
}

#[tokio::test]
async fn decrease_stock_is_exact_or_refused() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 5).await?;

    inventory::decrease_stock(&state.orm, pho, 3).await?;
    assert_eq!(stock_of(&state, pho).await?, 2);

    let err = inventory::decrease_stock(&state.orm, pho, 3).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));
    assert_eq!(stock_of(&state, pho).await?, 2);

    inventory::increase_stock(&state.orm, pho, 4).await?;
    assert_eq!(stock_of(&state, pho).await?, 6);

    let missing = inventory::decrease_stock(&state.orm, uuid::Uuid::new_v4(), 1)
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::NotFound(_)));
    Ok(())
}
