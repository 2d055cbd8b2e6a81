pub mod auth;
pub mod health;
pub mod likes;
pub mod users;
pub mod videos;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{Config, MediaProvider};
use crate::error::AppError;
use crate::state::AppState;

/// Assemble the full application router.
pub fn build_router(state: AppState) -> Router {
    let mut app = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(videos::router())
        .merge(likes::router())
        .merge(health::router());

    // Locally stored media is served back from the uploads directory.
    if state.config.media.provider == MediaProvider::Local {
        app = app.nest_service("/media", ServeDir::new(state.config.uploads_path()));
    }

    let body_limit = state.config.server.max_upload_mb.saturating_mul(1024 * 1024);

    app.fallback(route_not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".into())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let Some(origin) = config.server.cors_origin.as_deref() else {
        return CorsLayer::permissive();
    };

    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        Err(_) => {
            tracing::warn!("Ignoring invalid CORS origin: {}", origin);
            CorsLayer::new()
        }
    }
}
