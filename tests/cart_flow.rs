mod common;

use common::{add_to_cart, create_category_named, create_product_in, create_user, setup_state, stock_of};
use common::order_request;
use foodstore_api::{
    dto::{cart::UpdateCartItemRequest, products::ProductRequest},
    entity::cart_items::ActiveModel as CartItemActive,
    error::AppError,
    models::Cart,
    services::{cart_service, order_service, product_service},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

fn assert_totals_consistent(cart: &Cart) {
    let amount: Decimal = cart
        .items
        .iter()
        .map(|i| i.price * Decimal::from(i.quantity))
        .sum();
    let items: i32 = cart.items.iter().map(|i| i.quantity).sum();
    assert_eq!(cart.total_amount, amount);
    assert_eq!(cart.total_items, items);
}

#[tokio::test]
async fn registration_creates_an_empty_cart() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "lan").await?;

    let cart = cart_service::get_cart(&state, user_id).await?;
    assert!(cart.items.is_empty());
    assert_eq!(cart.total_amount, Decimal::ZERO);
    assert_eq!(cart.total_items, 0);

    assert!(matches!(
        cart_service::get_cart(&state, uuid::Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn adding_the_same_product_merges_lines() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "minh").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 5).await?;
    let tea = create_product_in(&state, food, "Lotus Tea", dec!(15000), 9).await?;

    add_to_cart(&state, user_id, pho, 2).await?;
    add_to_cart(&state, user_id, tea, 3).await?;
    add_to_cart(&state, user_id, pho, 1).await?;

    let cart = cart_service::get_cart(&state, user_id).await?;
    assert_eq!(cart.items.len(), 2);
    let pho_line = cart.items.iter().find(|i| i.product_id == pho).expect("pho line");
    assert_eq!(pho_line.quantity, 3);
    assert_eq!(cart.total_amount, dec!(180000));
    assert_eq!(cart.total_items, 6);
    assert_totals_consistent(&cart);

    // Adding to the cart never reserves stock.
    assert_eq!(stock_of(&state, pho).await?, 5);
    Ok(())
}

#[tokio::test]
async fn merged_quantity_is_checked_against_stock() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "hoa").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 4).await?;

    add_to_cart(&state, user_id, pho, 3).await?;
    let err = add_to_cart(&state, user_id, pho, 2).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::InsufficientStock(_))
    ));

    let cart = cart_service::get_cart(&state, user_id).await?;
    assert_eq!(cart.items[0].quantity, 3);
    Ok(())
}

#[tokio::test]
async fn huge_merge_quantity_is_rejected_without_touching_the_line() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "quang").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 5).await?;
    let rich = create_product_in(&state, food, "Banh Chung", dec!(60000), i32::MAX).await?;

    add_to_cart(&state, user_id, pho, 1).await?;
    let err = add_to_cart(&state, user_id, pho, i32::MAX).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::InsufficientStock(_))
    ));

    // Stock large enough that only the sum itself can overflow.
    add_to_cart(&state, user_id, rich, 2).await?;
    let err = add_to_cart(&state, user_id, rich, i32::MAX).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::InsufficientStock(_))
    ));

    let cart = cart_service::get_cart(&state, user_id).await?;
    assert!(cart.items.iter().all(|i| i.quantity >= 1));
    let mut quantities: Vec<i32> = cart.items.iter().map(|i| i.quantity).collect();
    quantities.sort();
    assert_eq!(quantities, [1, 2]);
    assert_totals_consistent(&cart);
    Ok(())
}

#[tokio::test]
async fn price_snapshot_survives_product_edits() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "tuan").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 10).await?;
    add_to_cart(&state, user_id, pho, 2).await?;

    product_service::update_product(
        &state,
        pho,
        ProductRequest {
            category_id: food,
            name: "Pho Bo".into(),
            description: None,
            price: dec!(50000),
            stock_quantity: 10,
            image_url: None,
            sku: None,
            is_active: None,
        },
    )
    .await?;

    let cart = cart_service::get_cart(&state, user_id).await?;
    assert_eq!(cart.items[0].price, dec!(45000));
    assert_eq!(cart.total_amount, dec!(90000));
    Ok(())
}

#[tokio::test]
async fn update_and_remove_check_ownership() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let owner = create_user(&state, "owner").await?;
    let other = create_user(&state, "other").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 5).await?;
    add_to_cart(&state, owner, pho, 1).await?;
    let item_id = cart_service::get_cart(&state, owner).await?.items[0].id;

    let err = cart_service::update_item(&state, other, item_id, UpdateCartItemRequest { quantity: 2 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    let err = cart_service::remove_item(&state, other, item_id).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let cart = cart_service::update_item(&state, owner, item_id, UpdateCartItemRequest { quantity: 4 })
        .await?;
    assert_eq!(cart.items[0].quantity, 4);
    assert_eq!(cart.total_amount, dec!(180000));
    assert_totals_consistent(&cart);

    let err = cart_service::update_item(&state, owner, item_id, UpdateCartItemRequest { quantity: 6 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));

    let cart = cart_service::remove_item(&state, owner, item_id).await?;
    assert!(cart.items.is_empty());
    assert_totals_consistent(&cart);
    Ok(())
}

#[tokio::test]
async fn clear_cart_keeps_the_cart_itself() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "mai").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 5).await?;
    let tea = create_product_in(&state, food, "Lotus Tea", dec!(15000), 5).await?;
    add_to_cart(&state, user_id, pho, 1).await?;
    add_to_cart(&state, user_id, tea, 1).await?;

    let before = cart_service::get_cart(&state, user_id).await?;
    let cleared = cart_service::clear_cart(&state, user_id).await?;
    assert_eq!(cleared.id, before.id);
    assert!(cleared.items.is_empty());

    let after = cart_service::get_cart(&state, user_id).await?;
    assert_eq!(after.id, before.id);
    assert!(after.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_product_cannot_be_added() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "an").await?;
    let err = add_to_cart(&state, user_id, uuid::Uuid::new_v4(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn lines_added_at_the_same_instant_keep_a_stable_order() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user_id = create_user(&state, "thu").await?;
    let food = create_category_named(&state, "Food", None).await?;
    let pho = create_product_in(&state, food, "Pho Bo", dec!(45000), 5).await?;
    let tea = create_product_in(&state, food, "Lotus Tea", dec!(15000), 5).await?;
    let cart_id = cart_service::get_cart(&state, user_id).await?.id;

    let mut ids = [Uuid::new_v4(), Uuid::new_v4()];
    ids.sort();
    let created_at = chrono::Utc::now().fixed_offset();
    // Larger id inserted first, so insertion order and id order disagree.
    for (id, product_id, price) in [(ids[1], tea, dec!(15000)), (ids[0], pho, dec!(45000))] {
        CartItemActive {
            id: Set(id),
            cart_id: Set(cart_id),
            product_id: Set(product_id),
            quantity: Set(1),
            price: Set(price),
            created_at: Set(created_at),
        }
        .insert(&state.orm)
        .await?;
    }

    let cart = cart_service::get_cart(&state, user_id).await?;
    let line_ids: Vec<Uuid> = cart.items.iter().map(|i| i.id).collect();
    assert_eq!(line_ids, ids);

    let order = order_service::create_order(&state, user_id, order_request("COD")).await?;
    let products: Vec<Uuid> = order.items.iter().map(|i| i.product_id).collect();
    assert_eq!(products, [pho, tea]);
    Ok(())
}
