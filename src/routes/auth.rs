use axum::routing::{get, post};
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(handlers::register))
        .route("/users/login", post(handlers::login))
        .route("/users/logout", post(handlers::logout))
        .route(
            "/users/refresh-token",
            get(handlers::refresh_access_token).post(handlers::refresh_access_token),
        )
        .route("/users/change-password", post(handlers::change_password))
}
