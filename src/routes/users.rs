use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::Router;
use serde::Deserialize;

use crate::db::models::PublicUser;
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, ApiPath, CurrentUser};
use crate::media::{self, MediaKind, UploadForm};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetailsRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone, Copy)]
enum ProfileImage {
    Avatar,
    Cover,
}

impl ProfileImage {
    fn field(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "avatar",
            ProfileImage::Cover => "coverImage",
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/current-user", get(current_user))
        .route("/users/update-user-details", patch(update_account_details))
        .route("/users/update-avatar", patch(update_avatar))
        .route("/users/update-coverimage", patch(update_cover_image))
        .route("/users/c/{username}", get(channel_profile))
        .route("/users/history", get(watch_history))
}

async fn current_user(CurrentUser(user): CurrentUser) -> Response {
    ApiResponse::ok(PublicUser::from(&user), "Current user fetched successfully").into_response()
}

async fn update_account_details(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<AccountDetailsRequest>,
) -> AppResult<Response> {
    let full_name = req.full_name.as_deref().map(str::trim).unwrap_or_default();
    let email = req
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_default();

    if full_name.is_empty() || email.is_empty() {
        return Err(AppError::Validation("Full name and email are required".into()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".into()));
    }

    let conn = state.db.get()?;
    if let Some(existing) = users::find_by_email(&conn, &email)? {
        if existing.id != user.id {
            return Err(AppError::Conflict("Email is already in use".into()));
        }
    }

    let updated = users::update_details(&conn, &user.id, full_name, &email)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(ApiResponse::ok(PublicUser::from(&updated), "Account details updated successfully")
        .into_response())
}

async fn replace_profile_image(
    state: &AppState,
    user_id: &str,
    previous: Option<String>,
    mut form: UploadForm,
    image: ProfileImage,
) -> AppResult<PublicUser> {
    let file = form
        .take_file(image.field())
        .ok_or_else(|| AppError::Validation(format!("{} file is missing", image.field())))?;

    let stored = media::store_temp_file(state.media.as_ref(), file, MediaKind::Image).await?;

    let updated = {
        let conn = state.db.get()?;
        let row = match image {
            ProfileImage::Avatar => users::update_avatar(&conn, user_id, &stored.url)?,
            ProfileImage::Cover => users::update_cover_image(&conn, user_id, &stored.url)?,
        };
        row.ok_or_else(|| AppError::NotFound("User not found".into()))?
    };

    if let Some(old) = previous {
        media::discard(state.media.as_ref(), &old).await;
    }

    Ok(PublicUser::from(&updated))
}

async fn update_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    form: UploadForm,
) -> AppResult<Response> {
    let updated = replace_profile_image(
        &state,
        &user.id,
        Some(user.avatar_url.clone()),
        form,
        ProfileImage::Avatar,
    )
    .await?;
    Ok(ApiResponse::ok(updated, "Avatar updated successfully").into_response())
}

async fn update_cover_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    form: UploadForm,
) -> AppResult<Response> {
    let updated = replace_profile_image(
        &state,
        &user.id,
        user.cover_image_url.clone(),
        form,
        ProfileImage::Cover,
    )
    .await?;
    Ok(ApiResponse::ok(updated, "Cover image updated successfully").into_response())
}

async fn channel_profile(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
) -> AppResult<Response> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(AppError::Validation("Username is missing".into()));
    }

    let conn = state.db.get()?;
    let profile = users::channel_profile(&conn, &username)?
        .ok_or_else(|| AppError::NotFound("Channel does not exist".into()))?;

    Ok(ApiResponse::ok(profile, "User channel fetched successfully").into_response())
}

async fn watch_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let history = users::watch_history(&conn, &user.id)?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully").into_response())
}
