use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::listing::{Listing, ListingStatus};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct MarketplaceService {
    db: Db,
}

impl MarketplaceService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_listing(
        &self,
        seller_id: Uuid,
        name: String,
        description: Option<String>,
        price: i64,
        category: String,
        image_url: Option<String>,
    ) -> Result<Listing> {
        let row = sqlx::query(
            "WITH inserted AS ( \
                 INSERT INTO listings (seller_id, name, description, price, category, image_url) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING id, seller_id, name, description, price, category, image_url, status, created_at \
             ) \
             SELECT i.id, i.seller_id, p.full_name AS seller_name, i.name, i.description, \
                    i.price, i.category, i.image_url, i.status, i.created_at \
             FROM inserted i \
             JOIN profiles p ON p.id = i.seller_id",
        )
        .bind(seller_id)
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(category)
        .bind(image_url)
        .fetch_one(self.db.pool())
        .await?;

        read_listing(&row)
    }

    /// Browse active listings, optionally narrowed by category and a name search.
    pub async fn list_active(
        &self,
        category: Option<&str>,
        query: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Listing>> {
        let pattern = query.map(|q| format!("%{}%", escape_like_pattern(q)));
        let rows = sqlx::query(
            "SELECT l.id, l.seller_id, p.full_name AS seller_name, l.name, l.description, \
                    l.price, l.category, l.image_url, l.status, l.created_at \
             FROM listings l \
             JOIN profiles p ON p.id = l.seller_id \
             WHERE l.status = 'active' \
               AND ($1::text IS NULL OR l.category = $1) \
               AND ($2::text IS NULL OR l.name ILIKE $2 ESCAPE '\\') \
             ORDER BY l.created_at DESC, l.id DESC \
             LIMIT $3",
        )
        .bind(category)
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let mut listings = Vec::with_capacity(rows.len());
        for row in rows {
            listings.push(read_listing(&row)?);
        }

        Ok(listings)
    }

    /// Active listings put up by one seller, for the profile page.
    pub async fn list_active_by_seller(&self, seller_id: Uuid, limit: i64) -> Result<Vec<Listing>> {
        let rows = sqlx::query(
            "SELECT l.id, l.seller_id, p.full_name AS seller_name, l.name, l.description, \
                    l.price, l.category, l.image_url, l.status, l.created_at \
             FROM listings l \
             JOIN profiles p ON p.id = l.seller_id \
             WHERE l.seller_id = $1 AND l.status = 'active' \
             ORDER BY l.created_at DESC, l.id DESC \
             LIMIT $2",
        )
        .bind(seller_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let mut listings = Vec::with_capacity(rows.len());
        for row in rows {
            listings.push(read_listing(&row)?);
        }

        Ok(listings)
    }

    /// Everything one seller has listed, sold items included, so sellers can
    /// manage their inventory.
    pub async fn list_by_seller(&self, seller_id: Uuid, limit: i64) -> Result<Vec<Listing>> {
        let rows = sqlx::query(
            "SELECT l.id, l.seller_id, p.full_name AS seller_name, l.name, l.description, \
                    l.price, l.category, l.image_url, l.status, l.created_at \
             FROM listings l \
             JOIN profiles p ON p.id = l.seller_id \
             WHERE l.seller_id = $1 \
             ORDER BY l.created_at DESC, l.id DESC \
             LIMIT $2",
        )
        .bind(seller_id)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let mut listings = Vec::with_capacity(rows.len());
        for row in rows {
            listings.push(read_listing(&row)?);
        }

        Ok(listings)
    }

    /// Seller-only status change (e.g. marking an item sold).
    pub async fn set_status(
        &self,
        listing_id: Uuid,
        seller_id: Uuid,
        status: ListingStatus,
    ) -> Result<Option<Listing>> {
        let row = sqlx::query(
            "WITH updated AS ( \
                 UPDATE listings SET status = $3 \
                 WHERE id = $1 AND seller_id = $2 \
                 RETURNING id, seller_id, name, description, price, category, image_url, status, created_at \
             ) \
             SELECT u.id, u.seller_id, p.full_name AS seller_name, u.name, u.description, \
                    u.price, u.category, u.image_url, u.status, u.created_at \
             FROM updated u \
             JOIN profiles p ON p.id = u.seller_id",
        )
        .bind(listing_id)
        .bind(seller_id)
        .bind(status.as_db())
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| read_listing(&row)).transpose()
    }

    pub async fn delete_listing(&self, listing_id: Uuid, seller_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1 AND seller_id = $2")
            .bind(listing_id)
            .bind(seller_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn read_listing(row: &PgRow) -> Result<Listing> {
    let status: String = row.get("status");
    let status = ListingStatus::from_db(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown listing status: {}", status))?;
    Ok(Listing {
        id: row.get("id"),
        seller_id: row.get("seller_id"),
        seller_name: row.get("seller_name"),
        name: row.get("name"),
        description: row.get("description"),
        price: row.get("price"),
        category: row.get("category"),
        image_url: row.get("image_url"),
        status,
        created_at: row.get("created_at"),
    })
}

fn escape_like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '%' | '_' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}
