use foodstore_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::{auth::RegisterRequest, categories::CategoryRequest, products::ProductRequest},
    entity::{
        categories::{Column as CategoryCol, Entity as Categories},
        enums::Role,
        products::{Column as ProdCol, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    services::{
        auth_service::register_user, category_service::create_category,
        file_service::FileStorage, product_service::create_product,
    },
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;
    let storage = FileStorage::init(&config.upload_dir).await?;
    let state = AppState { orm, storage };

    let admin_id = ensure_user(&state, "admin", "admin@foodstore.local", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&state, "demo", "demo@foodstore.local", "demo123", Role::User).await?;
    seed_catalog(&state).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Username.eq(username))
        .one(&state.orm)
        .await?
    {
        println!("User {username} already present");
        return Ok(existing.id);
    }

    let user = register_user(
        state,
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            full_name: None,
            phone: None,
            address: None,
        },
    )
    .await?;

    if role != Role::User {
        UserActive {
            id: Set(user.id),
            role: Set(role),
            ..Default::default()
        }
        .update(&state.orm)
        .await?;
    }

    println!("Ensured user {username} (role={role:?})");
    Ok(user.id)
}

async fn ensure_category(
    state: &AppState,
    name: &str,
    parent_id: Option<Uuid>,
    display_order: i32,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Categories::find()
        .filter(CategoryCol::Name.eq(name))
        .one(&state.orm)
        .await?
    {
        return Ok(existing.id);
    }

    let category = create_category(
        state,
        CategoryRequest {
            name: name.into(),
            description: None,
            parent_id,
            image_url: None,
            display_order: Some(display_order),
            is_active: Some(true),
        },
    )
    .await?;
    Ok(category.id)
}

async fn seed_catalog(state: &AppState) -> anyhow::Result<()> {
    let meals = ensure_category(state, "Meals", None, 0).await?;
    let noodles = ensure_category(state, "Noodles", Some(meals), 0).await?;
    let rice = ensure_category(state, "Rice Dishes", Some(meals), 1).await?;
    let drinks = ensure_category(state, "Drinks", None, 1).await?;

    let products = [
        (noodles, "Pho Bo", "Beef noodle soup with fresh herbs", 45000, 50, "PHO-BO"),
        (noodles, "Bun Cha", "Grilled pork with rice vermicelli", 40000, 40, "BUN-CHA"),
        (rice, "Com Tam", "Broken rice with grilled pork chop", 38000, 60, "COM-TAM"),
        (drinks, "Iced Milk Coffee", "Vietnamese drip coffee over ice", 25000, 100, "CA-PHE-SUA"),
        (drinks, "Lotus Tea", "Hot jasmine and lotus tea", 15000, 80, "TRA-SEN"),
    ];

    for (category_id, name, description, price, stock, sku) in products {
        let exists = Products::find()
            .filter(ProdCol::Sku.eq(sku))
            .one(&state.orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        create_product(
            state,
            ProductRequest {
                category_id,
                name: name.into(),
                description: Some(description.into()),
                price: Decimal::from(price),
                stock_quantity: stock,
                image_url: None,
                sku: Some(sku.into()),
                is_active: Some(true),
            },
        )
        .await?;
    }

    println!("Seeded catalog");
    Ok(())
}
