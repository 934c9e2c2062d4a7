pub mod acting_user;
pub mod validate;
