use serde::Serialize;

/// Full user row. Deliberately not `Serialize`: responses go through [`PublicUser`]
/// so the password hash and refresh token can never leak.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar: user.avatar_url.clone(),
            cover_image: user.cover_image_url.clone(),
            created_at: user.created_at.clone(),
            updated_at: user.updated_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    #[serde(rename = "owner")]
    pub owner_id: String,
    #[serde(rename = "videoFile")]
    pub video_url: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub owner_id: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
}

/// A watched video together with who uploaded it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub video: Video,
    pub owner_details: OwnerSummary,
    pub watched_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: String,
    pub videos_count: i64,
    pub total_likes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "u1".into(),
            username: "ab".into(),
            email: "a@b.com".into(),
            full_name: "A B".into(),
            password_hash: "$2b$04$hash".into(),
            avatar_url: "http://x/a.png".into(),
            cover_image_url: None,
            refresh_token: Some("rt".into()),
            created_at: "2025-01-01T00:00:00Z".into(),
            updated_at: "2025-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn public_user_strips_secrets() {
        let json = serde_json::to_value(PublicUser::from(&sample_user())).unwrap();
        assert_eq!(json["username"], "ab");
        assert_eq!(json["fullName"], "A B");
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("refreshToken").is_none());
    }

    #[test]
    fn video_serializes_with_public_field_names() {
        let video = Video {
            id: "v1".into(),
            owner_id: "u1".into(),
            video_url: "http://x/v.mp4".into(),
            thumbnail_url: "http://x/t.png".into(),
            title: "t".into(),
            description: "d".into(),
            duration: 12.5,
            views: 0,
            is_published: true,
            created_at: "c".into(),
            updated_at: "u".into(),
        };
        let json = serde_json::to_value(&video).unwrap();
        assert_eq!(json["owner"], "u1");
        assert_eq!(json["videoFile"], "http://x/v.mp4");
        assert_eq!(json["thumbnail"], "http://x/t.png");
        assert_eq!(json["isPublished"], true);
    }
}
