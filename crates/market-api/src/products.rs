use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use tracing::warn;

use market_db::models::{ProductFields, ProductRow};
use market_types::api::{Claims, CreateProductRequest, UpdateProductRequest};
use market_types::models::Product;

use crate::auth::{AppState, AppStateInner};
use crate::blocking;
use crate::error::{ApiError, ApiResult, written};
use crate::extract::{JsonBody, PathId};

fn product_response(row: ProductRow) -> Product {
    Product {
        upload_date: row.upload_date.parse::<NaiveDate>().unwrap_or_else(|e| {
            warn!("Corrupt upload_date '{}' on product {}: {}", row.upload_date, row.id, e);
            NaiveDate::default()
        }),
        id: row.id,
        name: row.name,
        service: row.service,
        price: row.price,
        description: row.description,
        user_id: row.user_id,
    }
}

/// Caller must own the product. Missing products are 404 before the ownership check.
fn check_owner(state: &AppStateInner, product_id: i64, claims: &Claims) -> ApiResult<()> {
    let owner = state
        .db
        .get_product_owner(product_id)?
        .ok_or(ApiError::NotFound("Product"))?;
    if owner != claims.sub {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// POST /users/{id}/product: the path id is the owner, never the body.
pub async fn create_product(
    State(state): State<AppState>,
    PathId(owner_id): PathId,
    JsonBody(req): JsonBody<CreateProductRequest>,
) -> ApiResult<impl IntoResponse> {
    let fields = ProductFields {
        name: req.name,
        service: req.service,
        price: req.price,
        upload_date: req
            .upload_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
            .to_string(),
        description: req.description,
    };

    let row = blocking(&state, move |state| {
        written(
            state.db.create_product(owner_id, &fields)?,
            "User",
            "Product already exists",
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(product_response(row))))
}

/// GET /products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> ApiResult<impl IntoResponse> {
    let row = blocking(&state, move |state| {
        state.db.get_product(id)?.ok_or(ApiError::NotFound("Product"))
    })
    .await?;

    Ok(Json(product_response(row)))
}

/// GET /users/{id}/products
pub async fn list_user_products(
    State(state): State<AppState>,
    PathId(user_id): PathId,
) -> ApiResult<impl IntoResponse> {
    let rows = blocking(&state, move |state| Ok(state.db.list_user_products(user_id)?)).await?;

    let products: Vec<Product> = rows.into_iter().map(product_response).collect();
    Ok(Json(products))
}

/// PUT /products/{id}: full overwrite of every column except the owner.
pub async fn update_product(
    State(state): State<AppState>,
    PathId(id): PathId,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<UpdateProductRequest>,
) -> ApiResult<impl IntoResponse> {
    let fields = ProductFields {
        name: req.name,
        service: req.service,
        price: req.price,
        upload_date: req.upload_date.to_string(),
        description: req.description,
    };

    let product = blocking(&state, move |state| {
        check_owner(state, id, &claims)?;
        written(
            state.db.update_product(id, &fields)?,
            "Product",
            "Product conflict",
        )?;

        Ok(product_response(ProductRow {
            id,
            name: fields.name,
            service: fields.service,
            price: fields.price,
            upload_date: fields.upload_date,
            description: fields.description,
            user_id: claims.sub,
        }))
    })
    .await?;

    Ok(Json(product))
}

/// DELETE /products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    PathId(id): PathId,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    blocking(&state, move |state| {
        check_owner(state, id, &claims)?;
        written(state.db.delete_product(id)?, "Product", "Product conflict")
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
