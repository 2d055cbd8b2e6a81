use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use crate::db::likes;
use crate::error::AppResult;
use crate::extractors::{ApiPath, CurrentUser};
use crate::response::ApiResponse;
use crate::routes::videos::load_visible_video;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub video_id: String,
    pub liked: bool,
    pub likes_count: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/likes/toggle/{video_id}", post(toggle_video_like))
        .route("/likes/videos", get(liked_videos))
}

async fn toggle_video_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(video_id): ApiPath<String>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let video = load_visible_video(&conn, &video_id, Some(&user))?;

    let liked = likes::toggle(&conn, &video.id, &user.id)?;
    let likes_count = likes::count_for_video(&conn, &video.id)?;

    tracing::debug!(video_id = %video.id, user_id = %user.id, liked, "Like toggled");

    let message = if liked {
        "Video liked successfully"
    } else {
        "Video unliked successfully"
    };
    let status = LikeStatus {
        video_id: video.id,
        liked,
        likes_count,
    };
    Ok(ApiResponse::ok(status, message).into_response())
}

async fn liked_videos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let videos = likes::liked_videos(&conn, &user.id)?;
    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully").into_response())
}
