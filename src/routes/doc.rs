use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::RegisterRequest,
        cart::{AddToCartRequest, UpdateCartItemRequest},
        categories::CategoryRequest,
        files::{FileCheck, StoredFile, StoredFiles},
        orders::{CreateOrderRequest, OrderList, StatusHistory, UpdateOrderStatusRequest},
        products::{ProductList, ProductRequest},
        reviews::{CreateReviewRequest, ReviewList},
        users::{ChangePasswordRequest, UpdateUserRequest},
    },
    entity::enums::{OrderStatus, PaymentMethod, PaymentStatus, Role, UserStatus},
    error::ErrorDetail,
    models::{
        Cart, CartItem, Category, Order, OrderItem, OrderSummary, Product, ProductSummary, Review,
        StatusHistoryEntry, User,
    },
    response::{ApiResponse, Meta},
    routes::{
        auth, cart, categories, files, health, orders, params, products as product_routes,
        reviews, users,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        users::get_user,
        users::update_user,
        users::change_password,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::products_by_category,
        product_routes::search_products,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        cart::get_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        orders::cancel_order,
        orders::order_history,
        reviews::list_product_reviews,
        reviews::create_review,
        reviews::delete_review,
        files::upload_file,
        files::upload_files,
        files::download_file,
        files::delete_file,
        files::check_file
    ),
    components(
        schemas(
            User,
            Category,
            Product,
            ProductSummary,
            Cart,
            CartItem,
            Order,
            OrderItem,
            OrderSummary,
            StatusHistoryEntry,
            Review,
            OrderStatus,
            PaymentMethod,
            PaymentStatus,
            Role,
            UserStatus,
            RegisterRequest,
            UpdateUserRequest,
            ChangePasswordRequest,
            CategoryRequest,
            ProductRequest,
            AddToCartRequest,
            UpdateCartItemRequest,
            CreateOrderRequest,
            UpdateOrderStatusRequest,
            CreateReviewRequest,
            ProductList,
            OrderList,
            StatusHistory,
            ReviewList,
            StoredFile,
            StoredFiles,
            FileCheck,
            ErrorDetail,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Cart>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<ErrorDetail>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration"),
        (name = "Users", description = "User profile endpoints"),
        (name = "Categories", description = "Category tree endpoints"),
        (name = "Products", description = "Product endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Reviews", description = "Review endpoints"),
        (name = "Files", description = "Image upload endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
