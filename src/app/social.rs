use anyhow::Result;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::profiles::read_profile;
use crate::domain::profile::Profile;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct SocialService {
    db: Db,
}

#[derive(Debug, Clone)]
pub struct SocialEdge {
    pub profile: Profile,
    pub followed_at: OffsetDateTime,
}

impl SocialService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a follow edge. Returns `None` when the target profile does not
    /// exist, `Some(true)` when a new edge was written, `Some(false)` when it
    /// already existed.
    pub async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<Option<bool>> {
        let target: Option<Uuid> = sqlx::query_scalar("SELECT id FROM profiles WHERE id = $1")
            .bind(following_id)
            .fetch_optional(self.db.pool())
            .await?;
        if target.is_none() {
            return Ok(None);
        }

        let result = sqlx::query(
            "INSERT INTO follows (follower_id, following_id) \
             SELECT $1, $2 \
             WHERE $1 <> $2 \
             ON CONFLICT DO NOTHING",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(self.db.pool())
        .await?;

        Ok(Some(result.rows_affected() > 0))
    }

    /// Remove a follow edge. Returns whether an edge was actually deleted.
    pub async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM follows WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool> {
        let following: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(following)
    }

    pub async fn follower_count(&self, profile_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE following_id = $1")
            .bind(profile_id)
            .fetch_one(self.db.pool())
            .await?;

        Ok(count)
    }

    pub async fn following_count(&self, profile_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(profile_id)
            .fetch_one(self.db.pool())
            .await?;

        Ok(count)
    }

    pub async fn list_followers(&self, profile_id: Uuid, limit: i64) -> Result<Vec<SocialEdge>> {
        let rows = sqlx::query(
            "SELECT p.id, p.handle, p.full_name, p.bio, p.avatar_url, p.role, \
                    p.created_at, f.created_at AS followed_at \
             FROM follows f \
             JOIN profiles p ON p.id = f.follower_id \
             WHERE f.following_id = $1 \
             ORDER BY f.created_at DESC, f.follower_id DESC \
             LIMIT $2",
        )
        .bind(profile_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(SocialEdge {
                profile: read_profile(&row)?,
                followed_at: row.get("followed_at"),
            });
        }

        Ok(items)
    }

    pub async fn list_following(&self, profile_id: Uuid, limit: i64) -> Result<Vec<SocialEdge>> {
        let rows = sqlx::query(
            "SELECT p.id, p.handle, p.full_name, p.bio, p.avatar_url, p.role, \
                    p.created_at, f.created_at AS followed_at \
             FROM follows f \
             JOIN profiles p ON p.id = f.following_id \
             WHERE f.follower_id = $1 \
             ORDER BY f.created_at DESC, f.following_id DESC \
             LIMIT $2",
        )
        .bind(profile_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(SocialEdge {
                profile: read_profile(&row)?,
                followed_at: row.get("followed_at"),
            });
        }

        Ok(items)
    }
}
