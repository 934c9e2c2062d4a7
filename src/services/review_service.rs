use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    dto::reviews::CreateReviewRequest,
    entity::{
        products::Entity as Products,
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    models::{RatingSummary, Review},
    services::user_service::find_user,
    state::AppState,
};

#[derive(Debug, FromQueryResult)]
struct RatingRow {
    product_id: Uuid,
    rating_sum: Option<i64>,
    review_count: i64,
}

/// Average rating and review count per product, computed in one grouped query.
///
/// Products without reviews are absent from the map; callers fall back to
/// [`RatingSummary::default`].
pub async fn rating_summaries<C: ConnectionTrait>(
    conn: &C,
    product_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, RatingSummary>> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = Reviews::find()
        .select_only()
        .column(ReviewCol::ProductId)
        .column_as(Expr::col(ReviewCol::Rating).sum(), "rating_sum")
        .column_as(Expr::col(ReviewCol::Id).count(), "review_count")
        .filter(ReviewCol::ProductId.is_in(product_ids.iter().copied()))
        .group_by(ReviewCol::ProductId)
        .into_model::<RatingRow>()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let average_rating = match (row.rating_sum, row.review_count) {
                (Some(sum), count) if count > 0 => Some(sum as f64 / count as f64),
                _ => None,
            };
            (
                row.product_id,
                RatingSummary {
                    average_rating,
                    review_count: row.review_count,
                },
            )
        })
        .collect())
}

pub async fn rating_summary<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> AppResult<RatingSummary> {
    let mut summaries = rating_summaries(conn, &[product_id]).await?;
    Ok(summaries.remove(&product_id).unwrap_or_default())
}

pub async fn list_product_reviews(state: &AppState, product_id: Uuid) -> AppResult<Vec<Review>> {
    let rows = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .order_by_desc(ReviewCol::CreatedAt)
        .find_also_related(Users)
        .all(&state.orm)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(review, user)| Review {
            id: review.id,
            product_id: review.product_id,
            user_id: review.user_id,
            username: user.map(|u| u.username).unwrap_or_default(),
            rating: review.rating,
            comment: review.comment,
            is_verified: review.is_verified,
            created_at: review.created_at.with_timezone(&Utc),
        })
        .collect())
}

/// One review per user and product; the unique index backs the pre-check.
pub async fn create_review(
    state: &AppState,
    user_id: Uuid,
    payload: CreateReviewRequest,
) -> AppResult<Review> {
    Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product", payload.product_id))?;
    let user = find_user(&state.orm, user_id).await?;

    let existing = Reviews::find()
        .filter(ReviewCol::ProductId.eq(payload.product_id))
        .filter(ReviewCol::UserId.eq(user_id))
        .count(&state.orm)
        .await?;
    if existing > 0 {
        return Err(AppError::BadRequest(
            "You have already reviewed this product".into(),
        ));
    }

    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(payload.product_id),
        user_id: Set(user_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        is_verified: Set(false),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::on_unique_violation(e, "You have already reviewed this product"))?;

    tracing::info!(
        review_id = %review.id,
        product_id = %review.product_id,
        %user_id,
        rating = review.rating,
        "review created"
    );

    Ok(Review {
        id: review.id,
        product_id: review.product_id,
        user_id,
        username: user.username,
        rating: review.rating,
        comment: review.comment,
        is_verified: review.is_verified,
        created_at: review.created_at.with_timezone(&Utc),
    })
}

pub async fn delete_review(state: &AppState, user_id: Uuid, review_id: Uuid) -> AppResult<()> {
    let review = Reviews::find_by_id(review_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Review", review_id))?;

    if review.user_id != user_id {
        return Err(AppError::Unauthorized(
            "This review does not belong to you".into(),
        ));
    }

    Reviews::delete_by_id(review_id).exec(&state.orm).await?;
    tracing::info!(%review_id, %user_id, "review deleted");
    Ok(())
}
