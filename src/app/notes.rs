use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::note::Note;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct NoteService {
    db: Db,
}

impl NoteService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        title: String,
        subject: Option<String>,
        description: Option<String>,
        file_url: Option<String>,
    ) -> Result<Note> {
        let row = sqlx::query(
            "WITH inserted AS ( \
                 INSERT INTO notes (author_id, title, subject, description, file_url) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING id, author_id, title, subject, description, file_url, created_at \
             ) \
             SELECT i.id, i.author_id, p.full_name AS author_name, \
                    p.avatar_url AS author_avatar_url, i.title, i.subject, \
                    i.description, i.file_url, i.created_at \
             FROM inserted i \
             JOIN profiles p ON p.id = i.author_id",
        )
        .bind(author_id)
        .bind(title)
        .bind(subject)
        .bind(description)
        .bind(file_url)
        .fetch_one(self.db.pool())
        .await?;

        Ok(read_note(&row))
    }

    pub async fn list_by_author(&self, author_id: Uuid, limit: i64) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT n.id, n.author_id, p.full_name AS author_name, \
                    p.avatar_url AS author_avatar_url, n.title, n.subject, \
                    n.description, n.file_url, n.created_at \
             FROM notes n \
             JOIN profiles p ON p.id = n.author_id \
             WHERE n.author_id = $1 \
             ORDER BY n.created_at DESC, n.id DESC \
             LIMIT $2",
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(read_note).collect())
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT n.id, n.author_id, p.full_name AS author_name, \
                    p.avatar_url AS author_avatar_url, n.title, n.subject, \
                    n.description, n.file_url, n.created_at \
             FROM notes n \
             JOIN profiles p ON p.id = n.author_id \
             ORDER BY n.created_at DESC, n.id DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(read_note).collect())
    }

    pub async fn delete(&self, note_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND author_id = $2")
            .bind(note_id)
            .bind(author_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn read_note(row: &PgRow) -> Note {
    Note {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        author_avatar_url: row.get("author_avatar_url"),
        title: row.get("title"),
        subject: row.get("subject"),
        description: row.get("description"),
        file_url: row.get("file_url"),
        created_at: row.get("created_at"),
    }
}
