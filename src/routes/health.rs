use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::response::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/healthcheck", get(healthcheck))
}

async fn healthcheck() -> Response {
    ApiResponse::ok("OK", "Service is healthy").into_response()
}
