pub mod auth;
pub mod communities;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod products;
pub mod reviews;
pub mod users;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tracing::error;

use crate::auth::{AppState, AppStateInner};
use crate::error::{ApiError, ApiResult};

/// Every route of the service. Update and delete of users and products sit
/// behind [`middleware::require_auth`].
pub fn router(state: AppState) -> Router {
    let require_auth = axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth);

    Router::new()
        .route("/ping", get(ping))
        .route("/login", post(auth::login))
        .route("/communities", get(communities::list_communities))
        .route("/users", post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user).merge(
                put(users::update_user)
                    .delete(users::delete_user)
                    .route_layer(require_auth.clone()),
            ),
        )
        .route(
            "/users/{id}/communities",
            get(communities::list_user_communities).post(communities::join_community),
        )
        .route(
            "/users/{id}/followers",
            get(users::list_followers).post(users::follow),
        )
        .route("/users/{id}/products", get(products::list_user_products))
        .route("/users/{id}/product", post(products::create_product))
        .route(
            "/users/{id}/reviews",
            get(reviews::list_user_reviews).post(reviews::create_review),
        )
        .route(
            "/products/{id}",
            get(products::get_product).merge(
                put(products::update_product)
                    .delete(products::delete_product)
                    .route_layer(require_auth),
            ),
        )
        .with_state(state)
}

async fn ping() -> &'static str {
    "pong"
}

/// Runs store work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&AppStateInner) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
}
