use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

/// The user on whose behalf a request acts, taken from the `userId` query parameter.
#[derive(Debug, Clone, Copy)]
pub struct ActingUser {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserIdQuery {
    user_id: Option<Uuid>,
}

impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<UserIdQuery>::try_from_uri(&parts.uri)
            .map_err(|_| AppError::BadRequest("Invalid userId query parameter".into()))?;
        let user_id = query
            .user_id
            .ok_or_else(|| AppError::BadRequest("Missing userId query parameter".into()))?;

        Ok(ActingUser { user_id })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(uri: &str) -> Result<ActingUser, AppError> {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        ActingUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_user_id_among_other_params() {
        let id = Uuid::new_v4();
        let user = extract(&format!("/api/orders?page=2&userId={id}")).await.unwrap();
        assert_eq!(user.user_id, id);
    }

    #[tokio::test]
    async fn rejects_missing_or_malformed_user_id() {
        assert!(matches!(extract("/api/orders").await, Err(AppError::BadRequest(_))));
        assert!(matches!(
            extract("/api/orders?userId=42").await,
            Err(AppError::BadRequest(_))
        ));
    }
}
