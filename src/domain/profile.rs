use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Public identity record. Everything here is safe to show to any viewer;
/// the email and password hash never leave the auth queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub handle: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: ProfileRole,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Profile plus derived follow counts, shaped for header/card rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileCard {
    pub id: Uuid,
    pub handle: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: ProfileRole,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub follower_count: i64,
    pub following_count: i64,
}

impl ProfileCard {
    pub fn from_profile(profile: Profile, follower_count: i64, following_count: i64) -> Self {
        Self {
            id: profile.id,
            handle: profile.handle,
            full_name: profile.full_name,
            bio: profile.bio,
            avatar_url: profile.avatar_url,
            role: profile.role,
            created_at: profile.created_at,
            follower_count,
            following_count,
        }
    }
}

/// Account view of a profile: includes the email. Returned only to the
/// account owner and to admins.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub handle: String,
    pub email: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: ProfileRole,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    Student,
    Vendor,
    Admin,
}

impl ProfileRole {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "student" => Some(Self::Student),
            "vendor" => Some(Self::Vendor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Vendor => "vendor",
            Self::Admin => "admin",
        }
    }
}
