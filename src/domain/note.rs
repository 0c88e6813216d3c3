use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A shared study note. Author columns are denormalized from the profiles
/// join so a note renders without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: Option<String>,
    pub author_avatar_url: Option<String>,
    pub title: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
