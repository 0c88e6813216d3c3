use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A feed post with its engagement counts.
///
/// `like_count` and `comment_count` come from the store; `is_liked` is
/// viewer-specific and is overlaid after the fetch, so it defaults to
/// false when a post is deserialized from the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostWithStats {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_handle: Option<String>,
    pub author_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub like_count: i64,
    pub comment_count: i64,
    #[serde(default)]
    pub is_liked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_handle: Option<String>,
    pub author_name: Option<String>,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
