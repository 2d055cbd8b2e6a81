use std::str::FromStr;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::models::{NewVideo, Video};
use super::{new_id, now_timestamp};

const COLUMNS: [&str; 11] = [
    "id",
    "owner_id",
    "video_url",
    "thumbnail_url",
    "title",
    "description",
    "duration",
    "views",
    "is_published",
    "created_at",
    "updated_at",
];

pub const COLUMN_COUNT: usize = COLUMNS.len();

/// Video column list prefixed with a table alias, for joins.
pub fn qualified_columns(alias: &str) -> String {
    COLUMNS
        .iter()
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn video_from_row(row: &Row) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        video_url: row.get(2)?,
        thumbnail_url: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        duration: row.get(6)?,
        views: row.get(7)?,
        is_published: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Duration,
    Views,
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Title => "title",
            SortField::Duration => "duration",
            SortField::Views => "views",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "created_at" => Ok(SortField::CreatedAt),
            "updatedAt" | "updated_at" => Ok(SortField::UpdatedAt),
            "title" => Ok(SortField::Title),
            "duration" => Ok(SortField::Duration),
            "views" => Ok(SortField::Views),
            other => Err(format!("Unsupported sort field: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "1" => Ok(SortDirection::Asc),
            "desc" | "-1" => Ok(SortDirection::Desc),
            other => Err(format!("Unsupported sort direction: {other}")),
        }
    }
}

/// Filter, sort and window for [`list`].
#[derive(Debug, Clone, Default)]
pub struct VideoQuery {
    pub search: Option<String>,
    pub owner_id: Option<String>,
    /// Unpublished videos are only visible to their owner.
    pub viewer_id: Option<String>,
    pub sort: SortField,
    pub direction: SortDirection,
    pub limit: u64,
    pub offset: u64,
}

/// Returns the requested page and the total number of matching rows.
pub fn list(conn: &Connection, query: &VideoQuery) -> rusqlite::Result<(Vec<Video>, u64)> {
    let mut clauses = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    match &query.viewer_id {
        Some(viewer) => {
            clauses.push("(is_published = 1 OR owner_id = ?)");
            values.push(Value::Text(viewer.clone()));
        }
        None => clauses.push("is_published = 1"),
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        // Literal substring match; no LIKE wildcards to escape
        clauses.push("instr(fold_case(title), ?) > 0");
        values.push(Value::Text(search.to_lowercase()));
    }

    if let Some(owner) = &query.owner_id {
        clauses.push("owner_id = ?");
        values.push(Value::Text(owner.clone()));
    }

    let where_sql = clauses.join(" AND ");

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM videos WHERE {where_sql}"),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let dir = query.direction.keyword();
    let sql = format!(
        "SELECT {} FROM videos WHERE {where_sql} ORDER BY {} {dir}, id {dir} LIMIT ? OFFSET ?",
        COLUMNS.join(", "),
        query.sort.column(),
    );
    // Out-of-range windows clamp to the end instead of wrapping negative
    values.push(Value::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)));
    values.push(Value::Integer(i64::try_from(query.offset).unwrap_or(i64::MAX)));

    let mut stmt = conn.prepare(&sql)?;
    let videos = stmt
        .query_map(params_from_iter(values.iter()), video_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((videos, total as u64))
}

pub fn insert(conn: &Connection, new: &NewVideo) -> rusqlite::Result<Video> {
    let id = new_id();
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO videos (id, owner_id, video_url, thumbnail_url, title, description, duration, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            new.owner_id,
            new.video_url,
            new.thumbnail_url,
            new.title,
            new.description,
            new.duration,
            now
        ],
    )?;

    Ok(Video {
        id,
        owner_id: new.owner_id.clone(),
        video_url: new.video_url.clone(),
        thumbnail_url: new.thumbnail_url.clone(),
        title: new.title.clone(),
        description: new.description.clone(),
        duration: new.duration,
        views: 0,
        is_published: true,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub fn find_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Video>> {
    conn.query_row(
        &format!("SELECT {} FROM videos WHERE id = ?1", COLUMNS.join(", ")),
        params![id],
        video_from_row,
    )
    .optional()
}

/// Update title and description, and the thumbnail when one is given.
pub fn update_details(
    conn: &Connection,
    id: &str,
    title: &str,
    description: &str,
    thumbnail_url: Option<&str>,
) -> rusqlite::Result<Option<Video>> {
    conn.execute(
        "UPDATE videos
         SET title = ?1, description = ?2, thumbnail_url = COALESCE(?3, thumbnail_url), updated_at = ?4
         WHERE id = ?5",
        params![title, description, thumbnail_url, now_timestamp(), id],
    )?;
    find_by_id(conn, id)
}

/// Flip the published flag in a single statement.
pub fn toggle_published(conn: &Connection, id: &str) -> rusqlite::Result<Option<Video>> {
    conn.execute(
        "UPDATE videos SET is_published = NOT is_published, updated_at = ?1 WHERE id = ?2",
        params![now_timestamp(), id],
    )?;
    find_by_id(conn, id)
}

pub fn increment_views(conn: &Connection, id: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE videos SET views = views + 1 WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

/// Likes and watch history rows go with the video via ON DELETE CASCADE.
pub fn delete(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM videos WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

#[cfg(test)]
pub(crate) fn sample_new_video(owner_id: &str, title: &str) -> NewVideo {
    NewVideo {
        owner_id: owner_id.to_string(),
        video_url: format!("http://localhost/media/{title}.mp4"),
        thumbnail_url: format!("http://localhost/media/{title}.png"),
        title: title.to_string(),
        description: format!("about {title}"),
        duration: 0.0,
    }
}
