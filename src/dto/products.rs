use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::ProductSummary;

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub category_id: Uuid,
    #[validate(length(min = 3, max = 200, message = "Product name must be between 3 and 200 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "positive_price"))]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub stock_quantity: i32,
    pub image_url: Option<String>,
    #[validate(length(max = 50, message = "SKU cannot exceed 50 characters"))]
    pub sku: Option<String>,
    pub is_active: Option<bool>,
}

fn positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_positive() && !price.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("price").with_message("Price must be greater than 0".into()))
    }
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<ProductSummary>)]
    pub items: Vec<ProductSummary>,
}
