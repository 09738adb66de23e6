use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::info;

use market_db::NO_OWNER_ID;
use market_db::models::{UserFields, UserRow};
use market_types::api::{Claims, CreateUserRequest, FollowRequest, UpdateUserRequest};
use market_types::models::User;

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, ApiResult, written};
use crate::extract::{JsonBody, PathId};

fn user_response(row: UserRow) -> User {
    User {
        id: row.id,
        name: row.name,
        phone: row.phone,
        picture: B64.encode(&row.picture),
        rating: row.rating,
    }
}

fn decode_picture(picture: &str) -> ApiResult<Vec<u8>> {
    B64.decode(picture)
        .map_err(|e| ApiError::BadRequest(format!("picture is not valid base64: {}", e)))
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.name.trim().is_empty() || req.phone.trim().is_empty() {
        return Err(ApiError::BadRequest("name and phone are required".into()));
    }
    let picture = decode_picture(&req.picture)?;

    let row = blocking(&state, move |state| {
        let fields = UserFields {
            name: req.name,
            phone: req.phone,
            password: state.credentials.hash(&req.password)?,
            picture,
            rating: 0.0,
        };
        written(
            state.db.create_user(&fields)?,
            "User",
            "Phone number already registered",
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(user_response(row))))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> ApiResult<impl IntoResponse> {
    let row = blocking(&state, move |state| {
        state.db.get_user(id)?.ok_or(ApiError::NotFound("User"))
    })
    .await?;

    Ok(Json(user_response(row)))
}

/// PUT /users/{id}: overwrites every column, including fields left out of the body.
pub async fn update_user(
    State(state): State<AppState>,
    PathId(id): PathId,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    if claims.sub != id {
        return Err(ApiError::Forbidden);
    }
    let picture = decode_picture(&req.picture)?;

    let user = blocking(&state, move |state| {
        let stored = state
            .db
            .get_credential_by_id(id)?
            .ok_or(ApiError::NotFound("User"))?;

        // Keep the stored credential when it already matches so repeated updates are idempotent.
        let password = if state.credentials.verify(&stored, &req.password) {
            stored
        } else {
            state.credentials.hash(&req.password)?
        };

        let fields = UserFields {
            name: req.name,
            phone: req.phone,
            password,
            picture,
            rating: req.rating,
        };
        written(
            state.db.update_user(id, &fields)?,
            "User",
            "Phone number already registered",
        )?;

        Ok(User {
            id,
            name: fields.name,
            phone: fields.phone,
            picture: B64.encode(&fields.picture),
            rating: fields.rating,
        })
    })
    .await?;

    Ok(Json(user))
}

/// DELETE /users/{id}: reviews of this user move to the sentinel owner first.
pub async fn delete_user(
    State(state): State<AppState>,
    PathId(id): PathId,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    if id == NO_OWNER_ID {
        return Err(ApiError::BadRequest("the sentinel user cannot be deleted".into()));
    }
    if claims.sub != id {
        return Err(ApiError::Forbidden);
    }

    blocking(&state, move |state| {
        written(state.db.delete_user(id)?, "User", "User conflict")
    })
    .await?;

    info!("User {} deleted their account", id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/{id}/followers
pub async fn list_followers(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> ApiResult<impl IntoResponse> {
    let rows = blocking(&state, move |state| Ok(state.db.list_followers(id)?)).await?;

    let users: Vec<User> = rows.into_iter().map(user_response).collect();
    Ok(Json(users))
}

/// POST /users/{id}/followers: `follower_id` starts following `{id}`.
pub async fn follow(
    State(state): State<AppState>,
    PathId(id): PathId,
    JsonBody(req): JsonBody<FollowRequest>,
) -> ApiResult<impl IntoResponse> {
    let follower_id = req.follower_id;
    if follower_id == id {
        return Err(ApiError::BadRequest("a user cannot follow themselves".into()));
    }

    blocking(&state, move |state| {
        written(
            state.db.follow(id, follower_id)?,
            "User",
            "Already following this user",
        )
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "user_id": id, "follower_id": follower_id })),
    ))
}
