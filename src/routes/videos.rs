use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::auth::ensure_owner;
use crate::db::models::{NewVideo, User, Video};
use crate::db::videos::{self, SortDirection, SortField, VideoQuery};
use crate::db::{is_valid_id, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiPath, ApiQuery, CurrentUser, MaybeUser};
use crate::media::{self, MediaKind, UploadForm};
use crate::response::ApiResponse;
use crate::state::AppState;

const DEFAULT_PAGE_LIMIT: u64 = 10;
const MAX_PAGE_LIMIT: u64 = 100;

// --- Query params ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVideosParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPage {
    pub videos: Vec<Video>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl ListVideosParams {
    /// Validate params into a repository query for `viewer`.
    fn into_query(self, viewer: Option<&User>) -> AppResult<(VideoQuery, u64)> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if page < 1 || limit < 1 {
            return Err(AppError::Validation(
                "page and limit must be positive".into(),
            ));
        }
        let limit = limit.min(MAX_PAGE_LIMIT);

        let sort = match self.sort_by.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => s.parse::<SortField>().map_err(AppError::Validation)?,
            None => SortField::default(),
        };
        let direction = match self.sort_type.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => s.parse::<SortDirection>().map_err(AppError::Validation)?,
            None => SortDirection::default(),
        };

        let owner_id = match self.user_id.filter(|s| !s.is_empty()) {
            Some(id) if is_valid_id(&id) => Some(id),
            Some(_) => return Err(AppError::Validation("Invalid user id".into())),
            None => None,
        };

        let query = VideoQuery {
            search: self.query.map(|q| q.trim().to_string()),
            owner_id,
            viewer_id: viewer.map(|u| u.id.clone()),
            sort,
            direction,
            limit,
            offset: (page - 1).saturating_mul(limit),
        };
        Ok((query, page))
    }
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/videos", get(list_videos))
        .route("/videos/upload-video", post(publish_video))
        .route("/videos/{video_id}", get(get_video))
        .route("/videos/update-video/{video_id}", patch(update_video))
        .route("/videos/delete-video/{video_id}", delete(delete_video))
        .route("/videos/publish-video/{video_id}", patch(toggle_publish))
}

// --- Lookup helpers ---

fn parse_video_id(id: &str) -> AppResult<&str> {
    if is_valid_id(id) {
        Ok(id)
    } else {
        Err(AppError::Validation("Invalid video id".into()))
    }
}

/// Load a video the viewer may see; unpublished videos are visible only to their owner.
pub(crate) fn load_visible_video(
    conn: &Connection,
    id: &str,
    viewer: Option<&User>,
) -> AppResult<Video> {
    let video = videos::find_by_id(conn, parse_video_id(id)?)?
        .ok_or_else(|| AppError::NotFound("Video not found".into()))?;

    let visible = video.is_published || viewer.is_some_and(|u| crate::auth::is_owner(u, &video));
    if !visible {
        return Err(AppError::NotFound("Video not found".into()));
    }
    Ok(video)
}

/// Load a video for mutation: malformed id, missing row and non-owner are
/// rejected in that order.
fn load_owned_video(conn: &Connection, id: &str, user: &User) -> AppResult<Video> {
    let video = videos::find_by_id(conn, parse_video_id(id)?)?
        .ok_or_else(|| AppError::NotFound("Video not found".into()))?;
    ensure_owner(user, &video)?;
    Ok(video)
}

// --- Handlers ---

async fn list_videos(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    ApiQuery(params): ApiQuery<ListVideosParams>,
) -> AppResult<Response> {
    let (query, page) = params.into_query(viewer.as_ref())?;

    let conn = state.db.get()?;
    let (videos, total) = videos::list(&conn, &query)?;

    let body = VideoPage {
        videos,
        page,
        limit: query.limit,
        total,
        total_pages: total.div_ceil(query.limit),
    };
    Ok(ApiResponse::ok(body, "Videos fetched successfully").into_response())
}

async fn publish_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut form: UploadForm,
) -> AppResult<Response> {
    let (Some(title), Some(description)) = (form.text("title"), form.text("description")) else {
        return Err(AppError::Validation(
            "Title and description are required".into(),
        ));
    };
    let title = title.to_string();
    let description = description.to_string();

    let (Some(video_file), Some(thumbnail_file)) =
        (form.take_file("video"), form.take_file("thumbnail"))
    else {
        return Err(AppError::Validation(
            "Video and thumbnail files are required".into(),
        ));
    };

    let video = media::store_temp_file(state.media.as_ref(), video_file, MediaKind::Video).await?;
    let thumbnail =
        match media::store_temp_file(state.media.as_ref(), thumbnail_file, MediaKind::Image).await
        {
            Ok(stored) => stored,
            Err(e) => {
                media::discard(state.media.as_ref(), &video.url).await;
                return Err(e.into());
            }
        };

    let new_video = NewVideo {
        owner_id: user.id.clone(),
        video_url: video.url,
        thumbnail_url: thumbnail.url,
        title,
        description,
        duration: video.duration.unwrap_or(0.0),
    };

    let inserted = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| Ok(videos::insert(&conn, &new_video)?));
    let created = media::discard_on_error(
        state.media.as_ref(),
        &[new_video.video_url.as_str(), new_video.thumbnail_url.as_str()],
        inserted,
    )
    .await?;

    tracing::info!(video_id = %created.id, owner = %user.id, "Video published");

    Ok(ApiResponse::ok(created, "Video uploaded successfully").into_response())
}

async fn get_video(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    ApiPath(video_id): ApiPath<String>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let mut video = load_visible_video(&conn, &video_id, viewer.as_ref())?;

    videos::increment_views(&conn, &video.id)?;
    video.views += 1;

    if let Some(viewer) = &viewer {
        users::record_watch(&conn, &viewer.id, &video.id)?;
    }

    Ok(ApiResponse::ok(video, "Video fetched successfully").into_response())
}

async fn update_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(video_id): ApiPath<String>,
    mut form: UploadForm,
) -> AppResult<Response> {
    let existing = {
        let conn = state.db.get()?;
        load_owned_video(&conn, &video_id, &user)?
    };

    let (Some(title), Some(description)) = (form.text("title"), form.text("description")) else {
        return Err(AppError::Validation(
            "Title and description are required".into(),
        ));
    };
    let title = title.to_string();
    let description = description.to_string();

    let thumbnail = match form.take_file("thumbnail") {
        Some(file) => Some(
            media::store_temp_file(state.media.as_ref(), file, MediaKind::Image)
                .await?
                .url,
        ),
        None => None,
    };

    let saved = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| {
            videos::update_details(
                &conn,
                &existing.id,
                &title,
                &description,
                thumbnail.as_deref(),
            )?
            .ok_or_else(|| AppError::NotFound("Video not found".into()))
        });
    let new_assets: Vec<&str> = thumbnail.as_deref().into_iter().collect();
    let updated = media::discard_on_error(state.media.as_ref(), &new_assets, saved).await?;

    if thumbnail.is_some() {
        media::discard(state.media.as_ref(), &existing.thumbnail_url).await;
    }

    Ok(ApiResponse::ok(updated, "Video updated successfully").into_response())
}

async fn delete_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(video_id): ApiPath<String>,
) -> AppResult<Response> {
    let video = {
        let conn = state.db.get()?;
        let video = load_owned_video(&conn, &video_id, &user)?;
        if !videos::delete(&conn, &video.id)? {
            return Err(AppError::NotFound("Video not found".into()));
        }
        video
    };

    media::discard(state.media.as_ref(), &video.video_url).await;
    media::discard(state.media.as_ref(), &video.thumbnail_url).await;

    tracing::info!(video_id = %video.id, "Video deleted");

    Ok(ApiResponse::ok(
        serde_json::json!({ "videoId": video.id }),
        "Video deleted successfully",
    )
    .into_response())
}

async fn toggle_publish(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(video_id): ApiPath<String>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let video = load_owned_video(&conn, &video_id, &user)?;
    let toggled = videos::toggle_published(&conn, &video.id)?
        .ok_or_else(|| AppError::NotFound("Video not found".into()))?;

    Ok(ApiResponse::ok(toggled, "Publish status toggled successfully").into_response())
}
