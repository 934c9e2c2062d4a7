use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use crate::{
    dto::products::{ProductList, ProductRequest},
    entity::{
        categories::Entity as Categories,
        products::{
            ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
            Model as ProductModel,
        },
    },
    error::{AppError, AppResult},
    models::{Product, ProductSummary},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, ProductSortBy, SortOrder},
    services::{
        category_service::load_tree,
        review_service::{rating_summaries, rating_summary},
    },
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let finder = Products::find().filter(ProdCol::IsActive.eq(true));
    page_of(&state.orm, sorted(finder, &query), query.pagination(), "Products").await
}

/// Fetches one product, counting the visit.
pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<Product> {
    let bumped = Products::update_many()
        .col_expr(ProdCol::Views, Expr::col(ProdCol::Views).add(1))
        .filter(ProdCol::Id.eq(id))
        .exec(&state.orm)
        .await?;
    if bumped.rows_affected == 0 {
        return Err(AppError::not_found("Product", id));
    }

    let (product, category) = Products::find_by_id(id)
        .find_also_related(Categories)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product", id))?;
    let rating = rating_summary(&state.orm, id).await?;

    Ok(Product::new(
        product,
        category.map(|c| c.name).unwrap_or_default(),
        rating,
    ))
}

/// Active products in the category or anywhere beneath it.
pub async fn products_by_category(
    state: &AppState,
    category_id: Uuid,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let tree = load_tree(&state.orm).await?;
    if !tree.contains(category_id) {
        return Err(AppError::not_found("Category", category_id));
    }

    let finder = Products::find()
        .filter(ProdCol::IsActive.eq(true))
        .filter(ProdCol::CategoryId.is_in(tree.descendants(category_id)));
    page_of(&state.orm, sorted(finder, &query), query.pagination(), "Products").await
}

/// Case-insensitive match on name or description, active products only.
pub async fn search_products(
    state: &AppState,
    keyword: &str,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(AppError::BadRequest("Search keyword is required".into()));
    }

    let pattern = format!("%{}%", keyword.to_lowercase());
    let finder = Products::find()
        .filter(ProdCol::IsActive.eq(true))
        .filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(ProdCol::Name))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(ProdCol::Description))).like(pattern)),
        )
        .order_by_asc(ProdCol::Name);
    page_of(&state.orm, finder, pagination, "Search results").await
}

pub async fn create_product(state: &AppState, payload: ProductRequest) -> AppResult<Product> {
    let category = Categories::find_by_id(payload.category_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category", payload.category_id))?;

    let now = Utc::now();
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        category_id: Set(payload.category_id),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        stock_quantity: Set(payload.stock_quantity),
        image_url: Set(payload.image_url),
        sku: Set(payload.sku),
        is_active: Set(payload.is_active.unwrap_or(true)),
        views: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::on_unique_violation(e, "SKU already exists"))?;

    tracing::info!(product_id = %product.id, name = %product.name, "product created");
    Ok(Product::new(product, category.name, Default::default()))
}

pub async fn update_product(
    state: &AppState,
    id: Uuid,
    payload: ProductRequest,
) -> AppResult<Product> {
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product", id))?;
    let category = Categories::find_by_id(payload.category_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category", payload.category_id))?;

    let mut active: ProductActive = existing.into();
    active.category_id = Set(payload.category_id);
    active.name = Set(payload.name);
    active.description = Set(payload.description);
    active.price = Set(payload.price);
    active.stock_quantity = Set(payload.stock_quantity);
    active.image_url = Set(payload.image_url);
    active.sku = Set(payload.sku);
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let product = active
        .update(&state.orm)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "SKU already exists"))?;

    tracing::info!(product_id = %product.id, name = %product.name, "product updated");
    let rating = rating_summary(&state.orm, id).await?;
    Ok(Product::new(product, category.name, rating))
}

pub async fn delete_product(state: &AppState, id: Uuid) -> AppResult<()> {
    let result = Products::delete_by_id(id)
        .exec(&state.orm)
        .await
        .map_err(still_referenced)?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Product", id));
    }

    tracing::info!(product_id = %id, "product deleted");
    Ok(())
}

fn still_referenced(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => AppError::BadRequest(
            "Product is still referenced by carts or orders".into(),
        ),
        _ => AppError::OrmError(err),
    }
}

fn sorted(finder: Select<Products>, query: &ProductQuery) -> Select<Products> {
    let column = match query.sort_by.unwrap_or_default() {
        ProductSortBy::CreatedAt => ProdCol::CreatedAt,
        ProductSortBy::Price => ProdCol::Price,
        ProductSortBy::Name => ProdCol::Name,
    };
    match query.sort_order.unwrap_or_default() {
        SortOrder::Asc => finder.order_by_asc(column),
        SortOrder::Desc => finder.order_by_desc(column),
    }
}

async fn page_of<C: ConnectionTrait>(
    conn: &C,
    finder: Select<Products>,
    pagination: Pagination,
    message: &str,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, per_page, offset) = pagination.normalize();
    let total = finder.clone().count(conn).await? as i64;

    let models: Vec<ProductModel> = finder
        .limit(per_page as u64)
        .offset(offset as u64)
        .all(conn)
        .await?;
    let ids: Vec<Uuid> = models.iter().map(|p| p.id).collect();
    let ratings = rating_summaries(conn, &ids).await?;

    let items = models
        .into_iter()
        .map(|p| {
            let rating = ratings.get(&p.id).copied().unwrap_or_default();
            ProductSummary::new(p, rating)
        })
        .collect();

    Ok(ApiResponse::paged(
        message,
        ProductList { items },
        Meta::new(page, per_page, total),
    ))
}
