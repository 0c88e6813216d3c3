use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::post::PostWithStats;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_post(&self, author_id: Uuid, content: String) -> Result<PostWithStats> {
        let row = sqlx::query(
            "WITH inserted_post AS ( \
                INSERT INTO posts (author_id, content) \
                VALUES ($1, $2) \
                RETURNING id, author_id, content, created_at \
             ) \
             SELECT i.id, i.author_id, p.handle AS author_handle, \
                    p.full_name AS author_name, p.avatar_url AS author_avatar_url, \
                    i.content, i.created_at \
             FROM inserted_post i \
             JOIN profiles p ON p.id = i.author_id",
        )
        .bind(author_id)
        .bind(content)
        .fetch_one(self.db.pool())
        .await?;

        Ok(PostWithStats {
            id: row.get("id"),
            author_id: row.get("author_id"),
            author_handle: row.get("author_handle"),
            author_name: row.get("author_name"),
            author_avatar_url: row.get("author_avatar_url"),
            content: row.get("content"),
            created_at: row.get("created_at"),
            like_count: 0,
            comment_count: 0,
            is_liked: false,
        })
    }

    pub async fn update_content(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> Result<Option<PostWithStats>> {
        let row = sqlx::query(
            "WITH updated_post AS ( \
                UPDATE posts SET content = $3 \
                WHERE id = $1 AND author_id = $2 \
                RETURNING id, author_id, content, created_at \
             ) \
             SELECT u.id, u.author_id, p.handle AS author_handle, \
                    p.full_name AS author_name, p.avatar_url AS author_avatar_url, \
                    u.content, u.created_at, \
                    (SELECT COUNT(*) FROM likes l WHERE l.post_id = u.id) AS like_count, \
                    (SELECT COUNT(*) FROM comments c WHERE c.post_id = u.id) AS comment_count \
             FROM updated_post u \
             JOIN profiles p ON p.id = u.author_id",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| read_post(&row)))
    }

    pub async fn delete_post(&self, post_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(post_id)
            .bind(author_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<Option<PostWithStats>> {
        let row = sqlx::query(
            "SELECT p.id, p.author_id, u.handle AS author_handle, \
                    u.full_name AS author_name, u.avatar_url AS author_avatar_url, \
                    p.content, p.created_at, \
                    (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count, \
                    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count \
             FROM posts p \
             JOIN profiles u ON u.id = p.author_id \
             WHERE p.id = $1",
        )
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| read_post(&row)))
    }

    pub async fn list_by_author(&self, author_id: Uuid, limit: i64) -> Result<Vec<PostWithStats>> {
        let rows = sqlx::query(
            "SELECT p.id, p.author_id, u.handle AS author_handle, \
                    u.full_name AS author_name, u.avatar_url AS author_avatar_url, \
                    p.content, p.created_at, \
                    (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count, \
                    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count \
             FROM posts p \
             JOIN profiles u ON u.id = p.author_id \
             WHERE p.author_id = $1 \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2",
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(read_post).collect())
    }

    pub async fn list_recent(
        &self,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<PostWithStats>> {
        let rows = match cursor {
            Some((created_at, post_id)) => {
                sqlx::query(
                    "SELECT p.id, p.author_id, u.handle AS author_handle, \
                            u.full_name AS author_name, u.avatar_url AS author_avatar_url, \
                            p.content, p.created_at, \
                            (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count, \
                            (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count \
                     FROM posts p \
                     JOIN profiles u ON u.id = p.author_id \
                     WHERE p.created_at < $1 OR (p.created_at = $1 AND p.id < $2) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $3",
                )
                .bind(created_at)
                .bind(post_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT p.id, p.author_id, u.handle AS author_handle, \
                            u.full_name AS author_name, u.avatar_url AS author_avatar_url, \
                            p.content, p.created_at, \
                            (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count, \
                            (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count \
                     FROM posts p \
                     JOIN profiles u ON u.id = p.author_id \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $1",
                )
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(rows.iter().map(read_post).collect())
    }
}

fn read_post(row: &PgRow) -> PostWithStats {
    PostWithStats {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_handle: row.get("author_handle"),
        author_name: row.get("author_name"),
        author_avatar_url: row.get("author_avatar_url"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        like_count: row.get("like_count"),
        comment_count: row.get("comment_count"),
        is_liked: false,
    }
}
