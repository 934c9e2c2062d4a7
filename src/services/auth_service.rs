use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::auth::RegisterRequest,
    entity::{
        carts::ActiveModel as CartActive,
        enums::{Role, UserStatus},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    models::User,
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Creates the account and its cart together; a user never exists without a cart.
pub async fn register_user(state: &AppState, payload: RegisterRequest) -> AppResult<User> {
    let RegisterRequest {
        username,
        email,
        password,
        full_name,
        phone,
        address,
    } = payload;

    let txn = state.orm.begin().await?;

    if exists(&txn, UserCol::Username, &username).await? {
        return Err(AppError::BadRequest("Username already exists".into()));
    }
    if exists(&txn, UserCol::Email, &email).await? {
        return Err(AppError::BadRequest("Email already exists".into()));
    }

    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        email: Set(email),
        password_hash: Set(hash_password(&password)?),
        full_name: Set(full_name),
        phone: Set(phone),
        address: Set(address),
        role: Set(Role::User),
        status: Set(UserStatus::Active),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await
    .map_err(|e| AppError::on_unique_violation(e, "Username or email already exists"))?;

    CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(User::from(user))
}

async fn exists<C: ConnectionTrait>(conn: &C, column: UserCol, value: &str) -> AppResult<bool> {
    let count = Users::find().filter(column.eq(value)).count(conn).await?;
    Ok(count > 0)
}
