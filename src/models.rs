use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    cart_items::Model as CartItemModel,
    categories::Model as CategoryModel,
    enums::{OrderStatus, PaymentMethod, PaymentStatus, Role, UserStatus},
    order_items::Model as OrderItemModel,
    order_status_history::Model as HistoryModel,
    orders::Model as OrderModel,
    products::Model as ProductModel,
    users::Model as UserModel,
};

#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            full_name: model.full_name,
            phone: model.phone,
            address: model.address,
            role: model.role,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    #[schema(no_recursion)]
    pub children: Vec<Category>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn leaf(model: CategoryModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            parent_id: model.parent_id,
            image_url: model.image_url,
            display_order: model.display_order,
            is_active: model.is_active,
            children: Vec::new(),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// Aggregated review figures for one product.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub image_url: Option<String>,
    pub sku: Option<String>,
    pub is_active: bool,
    pub views: i32,
    pub average_rating: Option<f64>,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(model: ProductModel, category_name: String, rating: RatingSummary) -> Self {
        Self {
            id: model.id,
            category_id: model.category_id,
            category_name,
            name: model.name,
            description: model.description,
            price: model.price,
            stock_quantity: model.stock_quantity,
            image_url: model.image_url,
            sku: model.sku,
            is_active: model.is_active,
            views: model.views,
            average_rating: rating.average_rating,
            review_count: rating.review_count,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub average_rating: Option<f64>,
}

impl ProductSummary {
    pub fn new(model: ProductModel, rating: RatingSummary) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            image_url: model.image_url,
            stock_quantity: model.stock_quantity,
            is_active: model.is_active,
            average_rating: rating.average_rating,
        }
    }
}

#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
    pub stock_quantity: i32,
}

#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    pub items: Vec<CartItem>,
    pub total_amount: Decimal,
    pub total_items: i32,
}

impl Cart {
    /// Builds the cart view; totals are always derived from the lines.
    pub fn from_lines(id: Uuid, lines: Vec<(CartItemModel, ProductModel)>) -> Self {
        let items: Vec<CartItem> = lines
            .into_iter()
            .map(|(item, product)| CartItem {
                id: item.id,
                product_id: product.id,
                product_name: product.name,
                image_url: product.image_url,
                price: item.price,
                quantity: item.quantity,
                subtotal: item.subtotal(),
                stock_quantity: product.stock_quantity,
            })
            .collect();
        let total_amount = items.iter().map(|i| i.subtotal).sum();
        let total_items = items.iter().map(|i| i.quantity).sum();
        Self {
            id,
            items,
            total_amount,
            total_items,
        }
    }
}

#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

impl From<OrderItemModel> for OrderItem {
    fn from(model: OrderItemModel) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            product_name: model.product_name,
            quantity: model.quantity,
            price: model.price,
            subtotal: model.subtotal,
        }
    }
}

#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping_name: String,
    pub shipping_address: String,
    pub shipping_phone: String,
    pub shipping_fee: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub note: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(model: OrderModel, items: Vec<OrderItemModel>) -> Self {
        Self {
            id: model.id,
            final_amount: model.final_amount(),
            order_number: model.order_number,
            total_amount: model.total_amount,
            status: model.status,
            payment_method: model.payment_method,
            payment_status: model.payment_status,
            shipping_name: model.shipping_name,
            shipping_address: model.shipping_address,
            shipping_phone: model.shipping_phone,
            shipping_fee: model.shipping_fee,
            discount_amount: model.discount_amount,
            note: model.note,
            items: items.into_iter().map(OrderItem::from).collect(),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub old_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub note: Option<String>,
    pub changed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<HistoryModel> for StatusHistoryEntry {
    fn from(model: HistoryModel) -> Self {
        Self {
            id: model.id,
            old_status: model.old_status,
            new_status: model.new_status,
            note: model.note,
            changed_by: model.changed_by,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}
