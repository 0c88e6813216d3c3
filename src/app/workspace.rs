use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::workspace::{Competition, Internship};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct WorkspaceService {
    db: Db,
}

impl WorkspaceService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Competitions with the nearest deadline first.
    pub async fn list_competitions(&self, limit: i64) -> Result<Vec<Competition>> {
        let rows = sqlx::query(
            "SELECT id, title, description, prize, entry_fee, deadline, \
                    image_url, details_pdf_url, created_at \
             FROM competitions \
             ORDER BY deadline ASC, id ASC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(read_competition).collect())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_competition(
        &self,
        title: String,
        description: String,
        prize: i64,
        entry_fee: i64,
        deadline: OffsetDateTime,
        image_url: Option<String>,
        details_pdf_url: Option<String>,
    ) -> Result<Competition> {
        let row = sqlx::query(
            "INSERT INTO competitions (title, description, prize, entry_fee, deadline, image_url, details_pdf_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, title, description, prize, entry_fee, deadline, \
                       image_url, details_pdf_url, created_at",
        )
        .bind(title)
        .bind(description)
        .bind(prize)
        .bind(entry_fee)
        .bind(deadline)
        .bind(image_url)
        .bind(details_pdf_url)
        .fetch_one(self.db.pool())
        .await?;

        Ok(read_competition(&row))
    }

    pub async fn delete_competition(&self, competition_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM competitions WHERE id = $1")
            .bind(competition_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Internships with the nearest application deadline first; ones
    /// without a deadline sort last.
    pub async fn list_internships(&self, limit: i64) -> Result<Vec<Internship>> {
        let rows = sqlx::query(
            "SELECT id, title, company, description, location, stipend, \
                    apply_url, deadline, created_at \
             FROM internships \
             ORDER BY deadline ASC NULLS LAST, id ASC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(read_internship).collect())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_internship(
        &self,
        title: String,
        company: String,
        description: Option<String>,
        location: Option<String>,
        stipend: Option<i64>,
        apply_url: Option<String>,
        deadline: Option<OffsetDateTime>,
    ) -> Result<Internship> {
        let row = sqlx::query(
            "INSERT INTO internships (title, company, description, location, stipend, apply_url, deadline) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, title, company, description, location, stipend, \
                       apply_url, deadline, created_at",
        )
        .bind(title)
        .bind(company)
        .bind(description)
        .bind(location)
        .bind(stipend)
        .bind(apply_url)
        .bind(deadline)
        .fetch_one(self.db.pool())
        .await?;

        Ok(read_internship(&row))
    }

    pub async fn delete_internship(&self, internship_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM internships WHERE id = $1")
            .bind(internship_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn read_competition(row: &PgRow) -> Competition {
    Competition {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        prize: row.get("prize"),
        entry_fee: row.get("entry_fee"),
        deadline: row.get("deadline"),
        image_url: row.get("image_url"),
        details_pdf_url: row.get("details_pdf_url"),
        created_at: row.get("created_at"),
    }
}

fn read_internship(row: &PgRow) -> Internship {
    Internship {
        id: row.get("id"),
        title: row.get("title"),
        company: row.get("company"),
        description: row.get("description"),
        location: row.get("location"),
        stipend: row.get("stipend"),
        apply_url: row.get("apply_url"),
        deadline: row.get("deadline"),
        created_at: row.get("created_at"),
    }
}
