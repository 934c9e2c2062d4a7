use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, sea_query::Expr};
use uuid::Uuid;

use crate::{
    entity::products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
};

/// Checks a requested quantity against the stock currently on the product row.
///
/// Nothing is reserved; the authoritative check is the conditional update in
/// [`decrease_stock`].
pub fn ensure_available(product: &ProductModel, quantity: i32) -> AppResult<()> {
    if product.stock_quantity < quantity {
        return Err(insufficient(product));
    }
    Ok(())
}

pub(crate) fn insufficient(product: &ProductModel) -> AppError {
    AppError::InsufficientStock(format!("Product {} has insufficient stock", product.name))
}

/// Takes `quantity` units out of stock in a single conditional update.
///
/// The row only changes when at least `quantity` units are available, so two
/// concurrent callers can never drive the stock below zero. On failure the
/// stock is left untouched.
pub async fn decrease_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest("quantity must be greater than 0".into()));
    }

    let result = Products::update_many()
        .col_expr(ProdCol::StockQuantity, Expr::col(ProdCol::StockQuantity).sub(quantity))
        .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(ProdCol::Id.eq(product_id))
        .filter(ProdCol::StockQuantity.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        let product = Products::find_by_id(product_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("Product", product_id))?;
        return Err(insufficient(&product));
    }

    Ok(())
}

/// Puts `quantity` units back into stock.
pub async fn increase_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest("quantity must be greater than 0".into()));
    }

    let result = Products::update_many()
        .col_expr(ProdCol::StockQuantity, Expr::col(ProdCol::StockQuantity).add(quantity))
        .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(ProdCol::Id.eq(product_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::not_found("Product", product_id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn availability_compares_against_current_stock() {
        let now = Utc::now().into();
        let product = ProductModel {
            id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            name: "Banh Mi".into(),
            description: None,
            price: dec!(25000),
            stock_quantity: 5,
            image_url: None,
            sku: None,
            is_active: true,
            views: 0,
            created_at: now,
            updated_at: now,
        };

        assert!(ensure_available(&product, 5).is_ok());
        match ensure_available(&product, 6) {
            Err(AppError::InsufficientStock(msg)) => {
                assert_eq!(msg, "Product Banh Mi has insufficient stock")
            }
            other => panic!("expected insufficient stock, got {other:?}"),
        }
    }
}
