use std::collections::HashSet;

use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::post::Comment;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Like a post. Returns `None` when the post does not exist,
    /// `Some(true)` when the like was written, `Some(false)` when the
    /// viewer had already liked it.
    pub async fn like_post(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<bool>> {
        let target: Option<Uuid> = sqlx::query_scalar("SELECT id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;
        if target.is_none() {
            return Ok(None);
        }

        let result = sqlx::query(
            "INSERT INTO likes (user_id, post_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(self.db.pool())
        .await?;

        Ok(Some(result.rows_affected() > 0))
    }

    pub async fn unlike_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Every post id the viewer has liked, fetched once so feed and profile
    /// rendering can mark posts without a per-post query.
    pub async fn liked_post_ids(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT post_id FROM likes WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;

        Ok(ids.into_iter().collect())
    }

    /// Comment on a post. Returns `None` when the post does not exist.
    pub async fn comment_post(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        body: String,
    ) -> Result<Option<Comment>> {
        let target: Option<Uuid> = sqlx::query_scalar("SELECT id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;
        if target.is_none() {
            return Ok(None);
        }

        let row = sqlx::query(
            "WITH inserted AS ( \
                 INSERT INTO comments (post_id, author_id, body) VALUES ($1, $2, $3) \
                 RETURNING id, post_id, author_id, body, created_at \
             ) \
             SELECT i.id, i.post_id, i.author_id, p.handle AS author_handle, \
                    p.full_name AS author_name, i.body, i.created_at \
             FROM inserted i \
             JOIN profiles p ON p.id = i.author_id",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(body)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Some(read_comment(&row)))
    }

    pub async fn list_comments(&self, post_id: Uuid, limit: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, p.handle AS author_handle, \
                    p.full_name AS author_name, c.body, c.created_at \
             FROM comments c \
             JOIN profiles p ON p.id = c.author_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created_at DESC, c.id DESC \
             LIMIT $2",
        )
        .bind(post_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(read_comment).collect())
    }

    pub async fn delete_comment(
        &self,
        comment_id: Uuid,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM comments WHERE id = $1 AND post_id = $2 AND author_id = $3",
        )
        .bind(comment_id)
        .bind(post_id)
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn read_comment(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        author_handle: row.get("author_handle"),
        author_name: row.get("author_name"),
        body: row.get("body"),
        created_at: row.get("created_at"),
    }
}
