use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{AdminUser, AuthUser};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::profiles())
        .merge(routes::feed())
        .merge(routes::notes())
        .merge(routes::market())
        .merge(routes::workspace())
        .merge(routes::admin())
        .merge(routes::payments())
        .with_state(state)
}
