use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::tokens::TokenPair;
use crate::db::models::{NewUser, PublicUser, User};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{cookie_from_headers, ApiJson, CurrentUser, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::media::{self, MediaKind, UploadForm};
use crate::response::ApiResponse;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(alias = "password")]
    pub old_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

// -- Cookie helpers --

fn token_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> String {
    let secure = if secure { " Secure;" } else { "" };
    format!("{name}={value}; HttpOnly;{secure} SameSite=Lax; Path=/; Max-Age={max_age_secs}")
}

fn clear_cookie(name: &str, secure: bool) -> String {
    token_cookie(name, "", 0, secure)
}

fn auth_cookies(state: &AppState, pair: &TokenPair) -> AppendHeaders<[(header::HeaderName, String); 2]> {
    let secure = state.config.auth.secure_cookies;
    AppendHeaders([
        (
            header::SET_COOKIE,
            token_cookie(
                ACCESS_COOKIE,
                &pair.access_token,
                state.tokens.access_ttl_secs(),
                secure,
            ),
        ),
        (
            header::SET_COOKIE,
            token_cookie(
                REFRESH_COOKIE,
                &pair.refresh_token,
                state.tokens.refresh_ttl_secs(),
                secure,
            ),
        ),
    ])
}

fn issue_pair(state: &AppState, user: &User) -> AppResult<TokenPair> {
    state
        .tokens
        .issue_pair(user)
        .map_err(|e| AppError::Internal(format!("Failed to sign tokens: {e}")))
}

fn hash(state: &AppState, plaintext: &str) -> AppResult<String> {
    hash_password(plaintext, state.config.auth.bcrypt_cost)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

fn required<'a>(value: Option<&'a str>, message: &str) -> AppResult<&'a str> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation(message.to_string()))
}

/// `refreshToken` from a JSON body; anything unparseable counts as absent.
fn refresh_token_from_body(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    serde_json::from_slice::<RefreshRequest>(body)
        .ok()?
        .refresh_token
        .filter(|t| !t.is_empty())
}

// -- Handlers --

/// POST /users/register. Multipart: fullName, email, username, password, avatar, coverImage?
pub async fn register(State(state): State<AppState>, mut form: UploadForm) -> AppResult<Response> {
    let (Some(full_name), Some(email), Some(username), Some(password)) = (
        form.text("fullName"),
        form.text("email"),
        form.text("username"),
        form.text("password"),
    ) else {
        return Err(AppError::Validation("All fields are required".into()));
    };

    let full_name = full_name.to_string();
    let email = email.to_lowercase();
    let username = username.to_lowercase();
    let password = password.to_string();

    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".into()));
    }

    let avatar = form
        .take_file("avatar")
        .ok_or_else(|| AppError::Validation("Avatar file is required".into()))?;
    let cover = form.take_file("coverImage");

    {
        let conn = state.db.get()?;
        if users::exists_with_username_or_email(&conn, &username, &email)? {
            return Err(AppError::Conflict(
                "User with this email or username already exists".into(),
            ));
        }
    }

    let password_hash = hash(&state, &password)?;

    let avatar = media::store_temp_file(state.media.as_ref(), avatar, MediaKind::Image).await?;

    let cover_image_url = match cover {
        Some(file) => {
            match media::store_temp_file(state.media.as_ref(), file, MediaKind::Image).await {
                Ok(stored) => Some(stored.url),
                Err(e) => {
                    tracing::warn!("Cover image upload failed, continuing without it: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    let new_user = NewUser {
        username,
        email,
        full_name,
        password_hash,
        avatar_url: avatar.url,
        cover_image_url,
    };

    let inserted = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| Ok(users::insert(&conn, &new_user)?))
        .map_err(|e| match e {
            AppError::Conflict(_) => {
                AppError::Conflict("User with this email or username already exists".into())
            }
            other => other,
        });

    let mut stored = vec![new_user.avatar_url.as_str()];
    stored.extend(new_user.cover_image_url.as_deref());
    let user = media::discard_on_error(state.media.as_ref(), &stored, inserted).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(ApiResponse::created(PublicUser::from(&user), "User registered successfully").into_response())
}

/// POST /users/login: issues an access/refresh pair as body fields and cookies.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<Response> {
    let email = required(req.email.as_deref(), "Email is required")?.to_lowercase();
    let password = required(req.password.as_deref(), "Password is required")?;

    let conn = state.db.get()?;
    let user = users::find_by_email(&conn, &email)?
        .ok_or_else(|| AppError::NotFound("User does not exist".into()))?;

    if !verify_password(password, &user.password_hash) {
        return Err(AppError::Unauthorized("Invalid user credentials".into()));
    }

    let pair = issue_pair(&state, &user)?;
    users::set_refresh_token(&conn, &user.id, Some(&pair.refresh_token))?;

    tracing::info!(user_id = %user.id, "User logged in");

    let body = LoginData {
        user: PublicUser::from(&user),
        access_token: pair.access_token.clone(),
        refresh_token: pair.refresh_token.clone(),
    };

    Ok((
        auth_cookies(&state, &pair),
        ApiResponse::ok(body, "User logged in successfully"),
    )
        .into_response())
}

/// POST /users/logout: revokes the stored refresh token and clears both cookies.
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    users::set_refresh_token(&conn, &user.id, None)?;

    tracing::info!(user_id = %user.id, "User logged out");

    let secure = state.config.auth.secure_cookies;
    Ok((
        AppendHeaders([
            (header::SET_COOKIE, clear_cookie(ACCESS_COOKIE, secure)),
            (header::SET_COOKIE, clear_cookie(REFRESH_COOKIE, secure)),
        ]),
        ApiResponse::ok(serde_json::json!({}), "User logged out"),
    )
        .into_response())
}

/// GET|POST /users/refresh-token: rotates the refresh token. The presented
/// token must be the one currently stored; it is swapped out atomically.
pub async fn refresh_access_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let incoming = cookie_from_headers(&headers, REFRESH_COOKIE)
        .map(str::to_string)
        .or_else(|| refresh_token_from_body(&body))
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".into()))?;

    let claims = state.tokens.verify_refresh(&incoming).map_err(|e| {
        tracing::warn!("Rejected refresh token: {}", e);
        AppError::Unauthorized("Invalid refresh token".into())
    })?;

    let conn = state.db.get()?;
    let user = users::find_by_id(&conn, &claims.sub)?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".into()))?;

    let pair = issue_pair(&state, &user)?;
    if !users::rotate_refresh_token(&conn, &user.id, &incoming, &pair.refresh_token)? {
        tracing::warn!(user_id = %user.id, "Stale refresh token presented");
        return Err(AppError::Unauthorized(
            "Refresh token is expired or used".into(),
        ));
    }

    Ok((
        auth_cookies(&state, &pair),
        ApiResponse::ok(pair.clone(), "Access token refreshed"),
    )
        .into_response())
}

/// POST /users/change-password
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> AppResult<Response> {
    let old_password = required(req.old_password.as_deref(), "Old password is required")?;
    let new_password = required(req.new_password.as_deref(), "New password is required")?;
    let confirm_password =
        required(req.confirm_password.as_deref(), "Confirm password is required")?;

    if new_password != confirm_password {
        return Err(AppError::Validation(
            "New password and confirm password do not match".into(),
        ));
    }

    if !verify_password(old_password, &user.password_hash) {
        return Err(AppError::Unauthorized("Invalid old password".into()));
    }

    let new_hash = hash(&state, new_password)?;
    let conn = state.db.get()?;
    users::update_password(&conn, &user.id, &new_hash)?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(ApiResponse::ok(serde_json::json!({}), "Password changed successfully").into_response())
}
