use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{ChannelProfile, HistoryEntry, NewUser, OwnerSummary, User};
use super::{new_id, now_timestamp, videos};

const USER_COLUMNS: &str = "id, username, email, full_name, password_hash, avatar_url, \
                            cover_image_url, refresh_token, created_at, updated_at";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        password_hash: row.get(4)?,
        avatar_url: row.get(5)?,
        cover_image_url: row.get(6)?,
        refresh_token: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn find_one(conn: &Connection, column: &str, value: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
        params![value],
        user_from_row,
    )
    .optional()
}

pub fn insert(conn: &Connection, new: &NewUser) -> rusqlite::Result<User> {
    let id = new_id();
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO users (id, username, email, full_name, password_hash, avatar_url, cover_image_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            new.username,
            new.email,
            new.full_name,
            new.password_hash,
            new.avatar_url,
            new.cover_image_url,
            now
        ],
    )?;

    Ok(User {
        id,
        username: new.username.clone(),
        email: new.email.clone(),
        full_name: new.full_name.clone(),
        password_hash: new.password_hash.clone(),
        avatar_url: new.avatar_url.clone(),
        cover_image_url: new.cover_image_url.clone(),
        refresh_token: None,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub fn find_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    find_one(conn, "id", id)
}

pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    find_one(conn, "email", email)
}

pub fn exists_with_username_or_email(
    conn: &Connection,
    username: &str,
    email: &str,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1 OR email = ?2",
        params![username, email],
        |row| row.get(0),
    )
}

/// Store (or clear, with `None`) the user's current refresh token.
pub fn set_refresh_token(
    conn: &Connection,
    user_id: &str,
    token: Option<&str>,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE users SET refresh_token = ?1 WHERE id = ?2",
        params![token, user_id],
    )?;
    Ok(rows > 0)
}

/// Compare-and-swap on the stored refresh token. Returns false when `current`
/// is no longer the stored value, i.e. it was already rotated or revoked.
pub fn rotate_refresh_token(
    conn: &Connection,
    user_id: &str,
    current: &str,
    next: &str,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE users SET refresh_token = ?1 WHERE id = ?2 AND refresh_token = ?3",
        params![next, user_id, current],
    )?;
    Ok(rows == 1)
}

pub fn update_password(conn: &Connection, user_id: &str, hash: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
        params![hash, now_timestamp(), user_id],
    )?;
    Ok(())
}

pub fn update_details(
    conn: &Connection,
    user_id: &str,
    full_name: &str,
    email: &str,
) -> rusqlite::Result<Option<User>> {
    conn.execute(
        "UPDATE users SET full_name = ?1, email = ?2, updated_at = ?3 WHERE id = ?4",
        params![full_name, email, now_timestamp(), user_id],
    )?;
    find_by_id(conn, user_id)
}

pub fn update_avatar(conn: &Connection, user_id: &str, url: &str) -> rusqlite::Result<Option<User>> {
    conn.execute(
        "UPDATE users SET avatar_url = ?1, updated_at = ?2 WHERE id = ?3",
        params![url, now_timestamp(), user_id],
    )?;
    find_by_id(conn, user_id)
}

pub fn update_cover_image(
    conn: &Connection,
    user_id: &str,
    url: &str,
) -> rusqlite::Result<Option<User>> {
    conn.execute(
        "UPDATE users SET cover_image_url = ?1, updated_at = ?2 WHERE id = ?3",
        params![url, now_timestamp(), user_id],
    )?;
    find_by_id(conn, user_id)
}

pub fn channel_profile(conn: &Connection, username: &str) -> rusqlite::Result<Option<ChannelProfile>> {
    conn.query_row(
        "SELECT u.id, u.username, u.full_name, u.avatar_url, u.cover_image_url, u.created_at,
                (SELECT COUNT(*) FROM videos v WHERE v.owner_id = u.id AND v.is_published = 1),
                (SELECT COUNT(*) FROM likes l JOIN videos v ON v.id = l.video_id WHERE v.owner_id = u.id)
         FROM users u
         WHERE u.username = ?1",
        params![username],
        |row| {
            Ok(ChannelProfile {
                id: row.get(0)?,
                username: row.get(1)?,
                full_name: row.get(2)?,
                avatar: row.get(3)?,
                cover_image: row.get(4)?,
                created_at: row.get(5)?,
                videos_count: row.get(6)?,
                total_likes: row.get(7)?,
            })
        },
    )
    .optional()
}

/// Record that `user_id` watched `video_id`; re-watching moves it to the front.
pub fn record_watch(conn: &Connection, user_id: &str, video_id: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO watch_history (user_id, video_id, watched_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, video_id) DO UPDATE SET watched_at = excluded.watched_at",
        params![user_id, video_id, now_timestamp()],
    )?;
    Ok(())
}

pub fn watch_history(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, u.id, u.username, u.full_name, u.avatar_url, h.watched_at
         FROM watch_history h
         JOIN videos v ON v.id = h.video_id
         JOIN users u ON u.id = v.owner_id
         WHERE h.user_id = ?1
         ORDER BY h.watched_at DESC",
        videos::qualified_columns("v")
    ))?;

    let entries = stmt
        .query_map(params![user_id], |row| {
            let video = videos::video_from_row(row)?;
            let base = videos::COLUMN_COUNT;
            Ok(HistoryEntry {
                video,
                owner_details: OwnerSummary {
                    id: row.get(base)?,
                    username: row.get(base + 1)?,
                    full_name: row.get(base + 2)?,
                    avatar: row.get(base + 3)?,
                },
                watched_at: row.get(base + 4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

#[cfg(test)]
pub(crate) fn sample_new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: email.to_string(),
        full_name: "Test User".to_string(),
        password_hash: "hash".to_string(),
        avatar_url: "http://localhost/media/avatar.png".to_string(),
        cover_image_url: None,
    }
}
