use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    entity::{
        cart_items::{
            ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
            Model as CartItemModel,
        },
        carts::{Column as CartCol, Entity as Carts, Model as CartModel},
        products::{Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    models::Cart,
    services::inventory::{ensure_available, insufficient},
    state::AppState,
};

pub(crate) async fn find_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<CartModel> {
    Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cart not found for user with id : '{user_id}'")))
}

/// Cart lines joined with their products, oldest line first, ties broken by id.
pub(crate) async fn cart_lines<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> AppResult<Vec<(CartItemModel, ProductModel)>> {
    let rows = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .order_by_asc(CartItemCol::CreatedAt)
        .order_by_asc(CartItemCol::Id)
        .find_also_related(Products)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(item, product)| product.map(|p| (item, p)))
        .collect())
}

async fn cart_view<C: ConnectionTrait>(conn: &C, cart_id: Uuid) -> AppResult<Cart> {
    Ok(Cart::from_lines(cart_id, cart_lines(conn, cart_id).await?))
}

async fn find_product<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> AppResult<ProductModel> {
    Products::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Product", product_id))
}

/// Loads a line and checks that it sits in `cart`.
async fn owned_item<C: ConnectionTrait>(
    conn: &C,
    cart: &CartModel,
    item_id: Uuid,
) -> AppResult<CartItemModel> {
    let item = CartItems::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("CartItem", item_id))?;
    if item.cart_id != cart.id {
        return Err(AppError::Unauthorized(
            "This cart item does not belong to you".into(),
        ));
    }
    Ok(item)
}

pub async fn get_cart(state: &AppState, user_id: Uuid) -> AppResult<Cart> {
    let cart = find_cart(&state.orm, user_id).await?;
    cart_view(&state.orm, cart.id).await
}

/// Adds a product, merging into the existing line for it when there is one.
///
/// The price snapshot is taken when the line is first created; merging only
/// changes the quantity.
pub async fn add_item(
    state: &AppState,
    user_id: Uuid,
    payload: AddToCartRequest,
) -> AppResult<Cart> {
    let txn = state.orm.begin().await?;

    let cart = find_cart(&txn, user_id).await?;
    let product = find_product(&txn, payload.product_id).await?;
    if !product.is_active {
        return Err(AppError::BadRequest(format!(
            "Product {} is not available",
            product.name
        )));
    }

    let existing = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .filter(CartItemCol::ProductId.eq(product.id))
        .one(&txn)
        .await?;

    ensure_available(&product, payload.quantity)?;
    match existing {
        Some(item) => {
            let quantity = item
                .quantity
                .checked_add(payload.quantity)
                .ok_or_else(|| insufficient(&product))?;
            ensure_available(&product, quantity)?;
            let mut active: CartItemActive = item.into();
            active.quantity = Set(quantity);
            active.update(&txn).await?;
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                quantity: Set(payload.quantity),
                price: Set(product.price),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?;
        }
    }

    let view = cart_view(&txn, cart.id).await?;
    txn.commit().await?;

    tracing::info!(
        %user_id,
        product_id = %product.id,
        quantity = payload.quantity,
        "cart item added"
    );
    Ok(view)
}

pub async fn update_item(
    state: &AppState,
    user_id: Uuid,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<Cart> {
    let txn = state.orm.begin().await?;

    let cart = find_cart(&txn, user_id).await?;
    let item = owned_item(&txn, &cart, item_id).await?;
    let product = find_product(&txn, item.product_id).await?;
    ensure_available(&product, payload.quantity)?;

    let mut active: CartItemActive = item.into();
    active.quantity = Set(payload.quantity);
    active.update(&txn).await?;

    let view = cart_view(&txn, cart.id).await?;
    txn.commit().await?;

    tracing::info!(%user_id, %item_id, quantity = payload.quantity, "cart item updated");
    Ok(view)
}

pub async fn remove_item(state: &AppState, user_id: Uuid, item_id: Uuid) -> AppResult<Cart> {
    let txn = state.orm.begin().await?;

    let cart = find_cart(&txn, user_id).await?;
    let item = owned_item(&txn, &cart, item_id).await?;
    CartItems::delete_by_id(item.id).exec(&txn).await?;

    let view = cart_view(&txn, cart.id).await?;
    txn.commit().await?;

    tracing::info!(%user_id, %item_id, "cart item removed");
    Ok(view)
}

pub async fn clear_cart(state: &AppState, user_id: Uuid) -> AppResult<Cart> {
    let cart = find_cart(&state.orm, user_id).await?;
    let removed = CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&state.orm)
        .await?;

    tracing::info!(%user_id, lines = removed.rows_affected, "cart cleared");
    Ok(Cart::from_lines(cart.id, Vec::new()))
}
