pub mod auth;
pub mod cart;
pub mod categories;
pub mod files;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;
