use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use market_db::models::ReviewRow;
use market_types::api::CreateReviewRequest;
use market_types::models::Review;

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiResult, written};
use crate::extract::{JsonBody, PathId};

fn review_response(row: ReviewRow) -> Review {
    Review {
        id: row.id,
        rating: row.rating,
        content: row.content,
        reviewer_id: row.reviewer_id,
        owner_id: row.owner_id,
    }
}

/// POST /users/{id}/reviews: `{id}` is the reviewed user.
pub async fn create_review(
    State(state): State<AppState>,
    PathId(owner_id): PathId,
    JsonBody(req): JsonBody<CreateReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let row = blocking(&state, move |state| {
        written(
            state
                .db
                .create_review(owner_id, req.reviewer_id, req.rating, &req.content)?,
            "User",
            "Review already exists",
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(review_response(row))))
}

/// GET /users/{id}/reviews
pub async fn list_user_reviews(
    State(state): State<AppState>,
    PathId(owner_id): PathId,
) -> ApiResult<impl IntoResponse> {
    let rows = blocking(&state, move |state| Ok(state.db.list_user_reviews(owner_id)?)).await?;

    let reviews: Vec<Review> = rows.into_iter().map(review_response).collect();
    Ok(Json(reviews))
}
