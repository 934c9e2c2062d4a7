#![allow(dead_code)]

use foodstore_api::{
    db::{create_orm_conn, run_migrations},
    dto::{
        auth::RegisterRequest, cart::AddToCartRequest, categories::CategoryRequest,
        orders::CreateOrderRequest, products::ProductRequest,
    },
    entity::products::Entity as Products,
    services::{
        auth_service::register_user, cart_service, category_service::create_category,
        file_service::FileStorage, product_service::create_product,
    },
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use uuid::Uuid;

/// Fresh in-memory database with the schema applied and a throwaway upload dir.
pub async fn setup_state() -> anyhow::Result<AppState> {
    let orm = create_orm_conn("sqlite::memory:").await?;
    run_migrations(&orm).await?;
    let dir = std::env::temp_dir().join(format!("foodstore-test-{}", Uuid::new_v4()));
    let storage = FileStorage::init(dir).await?;
    Ok(AppState { orm, storage })
}

pub async fn create_user(state: &AppState, username: &str) -> anyhow::Result<Uuid> {
    let user = register_user(
        state,
        RegisterRequest {
            username: username.into(),
            email: format!("{username}@example.com"),
            password: "secret123".into(),
            full_name: Some(format!("{username} tester")),
            phone: None,
            address: None,
        },
    )
    .await?;
    Ok(user.id)
}

pub async fn create_category_named(
    state: &AppState,
    name: &str,
    parent_id: Option<Uuid>,
) -> anyhow::Result<Uuid> {
    let category = create_category(
        state,
        CategoryRequest {
            name: name.into(),
            description: None,
            parent_id,
            image_url: None,
            display_order: None,
            is_active: None,
        },
    )
    .await?;
    Ok(category.id)
}

pub fn product_request(category_id: Uuid, name: &str, price: Decimal, stock: i32) -> ProductRequest {
    ProductRequest {
        category_id,
        name: name.into(),
        description: Some(format!("Freshly made {name}")),
        price,
        stock_quantity: stock,
        image_url: None,
        sku: None,
        is_active: None,
    }
}

pub async fn create_product_in(
    state: &AppState,
    category_id: Uuid,
    name: &str,
    price: Decimal,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let product = create_product(state, product_request(category_id, name, price, stock)).await?;
    Ok(product.id)
}

pub async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} missing"))?;
    Ok(product.stock_quantity)
}

pub async fn add_to_cart(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<()> {
    cart_service::add_item(state, user_id, AddToCartRequest { product_id, quantity }).await?;
    Ok(())
}

pub fn order_request(payment_method: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        shipping_name: "Nguyen Van A".into(),
        shipping_address: "12 Hang Bac, Hanoi".into(),
        shipping_phone: "0900000000".into(),
        payment_method: payment_method.into(),
        note: Some("Leave at the door".into()),
    }
}
