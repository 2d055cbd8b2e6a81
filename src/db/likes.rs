use rusqlite::{params, Connection};

use super::models::Video;
use super::{new_id, now_timestamp, videos};

/// Toggle the (video, user) like. Returns true when the video is now liked.
///
/// The delete doubles as the existence check so the toggle never reads a
/// stale row; the UNIQUE(video_id, liked_by) constraint keeps the pair single.
pub fn toggle(conn: &Connection, video_id: &str, user_id: &str) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM likes WHERE video_id = ?1 AND liked_by = ?2",
        params![video_id, user_id],
    )?;
    if removed > 0 {
        return Ok(false);
    }

    conn.execute(
        "INSERT INTO likes (id, video_id, liked_by, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![new_id(), video_id, user_id, now_timestamp()],
    )?;
    Ok(true)
}

pub fn count_for_video(conn: &Connection, video_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE video_id = ?1",
        params![video_id],
        |row| row.get(0),
    )
}

/// Videos the user has liked, newest like first. Unpublished videos are
/// included only when the user owns them.
pub fn liked_videos(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<Video>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM likes l
         JOIN videos v ON v.id = l.video_id
         WHERE l.liked_by = ?1 AND (v.is_published = 1 OR v.owner_id = ?1)
         ORDER BY l.created_at DESC",
        videos::qualified_columns("v")
    ))?;

    let rows = stmt
        .query_map(params![user_id], videos::video_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
