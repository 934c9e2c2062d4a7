use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use uuid::Uuid;

use crate::{
    dto::users::{ChangePasswordRequest, UpdateUserRequest},
    entity::users::{ActiveModel as UserActive, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    models::User,
    services::auth_service::{hash_password, verify_password},
    state::AppState,
};

pub(crate) async fn find_user<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<UserModel> {
    Users::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("User", user_id))
}

pub async fn get_user(state: &AppState, user_id: Uuid) -> AppResult<User> {
    find_user(&state.orm, user_id).await.map(User::from)
}

pub async fn update_profile(
    state: &AppState,
    user_id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<User> {
    let existing = find_user(&state.orm, user_id).await?;

    let mut active: UserActive = existing.into();
    active.full_name = Set(payload.full_name);
    active.phone = Set(payload.phone);
    active.address = Set(payload.address);
    active.updated_at = Set(Utc::now().into());
    let user = active.update(&state.orm).await?;

    tracing::info!(user_id = %user.id, "profile updated");
    Ok(User::from(user))
}

pub async fn change_password(
    state: &AppState,
    user_id: Uuid,
    payload: ChangePasswordRequest,
) -> AppResult<()> {
    let existing = find_user(&state.orm, user_id).await?;

    if !verify_password(&payload.old_password, &existing.password_hash)? {
        return Err(AppError::BadRequest("Old password is incorrect".into()));
    }

    let mut active: UserActive = existing.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    tracing::info!(%user_id, "password changed");
    Ok(())
}
