use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::profile::{Account, Profile, ProfileCard, ProfileRole};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct ProfileService {
    db: Db,
}

impl ProfileService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, profile_id: Uuid) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT id, handle, full_name, bio, avatar_url, role, created_at \
             FROM profiles WHERE id = $1",
        )
        .bind(profile_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| read_profile(&row)).transpose()
    }

    pub async fn get_by_handle(&self, handle: &str) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT id, handle, full_name, bio, avatar_url, role, created_at \
             FROM profiles WHERE handle = $1",
        )
        .bind(handle)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| read_profile(&row)).transpose()
    }

    /// Profile plus follow counts in one round trip.
    pub async fn card_by_handle(&self, handle: &str) -> Result<Option<ProfileCard>> {
        let row = sqlx::query(
            "SELECT p.id, p.handle, p.full_name, p.bio, p.avatar_url, p.role, p.created_at, \
                    (SELECT COUNT(*) FROM follows f WHERE f.following_id = p.id) AS follower_count, \
                    (SELECT COUNT(*) FROM follows f WHERE f.follower_id = p.id) AS following_count \
             FROM profiles p WHERE p.handle = $1",
        )
        .bind(handle)
        .fetch_optional(self.db.pool())
        .await?;

        let card = match row {
            Some(row) => {
                let profile = read_profile(&row)?;
                Some(ProfileCard::from_profile(
                    profile,
                    row.get("follower_count"),
                    row.get("following_count"),
                ))
            }
            None => None,
        };

        Ok(card)
    }

    pub async fn update_profile(
        &self,
        profile_id: Uuid,
        full_name: Option<String>,
        bio: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "UPDATE profiles \
             SET full_name = COALESCE($2, full_name), \
                 bio = COALESCE($3, bio), \
                 avatar_url = COALESCE($4, avatar_url) \
             WHERE id = $1 \
             RETURNING id, handle, full_name, bio, avatar_url, role, created_at",
        )
        .bind(profile_id)
        .bind(full_name)
        .bind(bio)
        .bind(avatar_url)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| read_profile(&row)).transpose()
    }

    pub async fn role_of(&self, profile_id: Uuid) -> Result<Option<ProfileRole>> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM profiles WHERE id = $1")
            .bind(profile_id)
            .fetch_optional(self.db.pool())
            .await?;

        match role {
            Some(role) => {
                let parsed = ProfileRole::from_db(&role)
                    .ok_or_else(|| anyhow::anyhow!("unknown profile role: {}", role))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Admin listing: accounts with email, newest first.
    pub async fn list_accounts(&self, limit: i64) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            "SELECT id, handle, email, full_name, bio, avatar_url, role, created_at \
             FROM profiles \
             ORDER BY created_at DESC, id DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            accounts.push(read_account(&row)?);
        }

        Ok(accounts)
    }

    pub async fn set_role(&self, profile_id: Uuid, role: ProfileRole) -> Result<Option<Account>> {
        let row = sqlx::query(
            "UPDATE profiles SET role = $2 WHERE id = $1 \
             RETURNING id, handle, email, full_name, bio, avatar_url, role, created_at",
        )
        .bind(profile_id)
        .bind(role.as_db())
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| read_account(&row)).transpose()
    }

    pub async fn delete_account(&self, profile_id: Uuid) -> Result<bool> {
        // ON DELETE CASCADE removes follows, posts, likes, comments, notes
        // and listings along with the profile row.
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(profile_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub(crate) fn read_profile(row: &PgRow) -> Result<Profile> {
    let role: String = row.get("role");
    let role = ProfileRole::from_db(&role)
        .ok_or_else(|| anyhow::anyhow!("unknown profile role: {}", role))?;
    Ok(Profile {
        id: row.get("id"),
        handle: row.get("handle"),
        full_name: row.get("full_name"),
        bio: row.get("bio"),
        avatar_url: row.get("avatar_url"),
        role,
        created_at: row.get("created_at"),
    })
}

fn read_account(row: &PgRow) -> Result<Account> {
    let role: String = row.get("role");
    let role = ProfileRole::from_db(&role)
        .ok_or_else(|| anyhow::anyhow!("unknown profile role: {}", role))?;
    Ok(Account {
        id: row.get("id"),
        handle: row.get("handle"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        bio: row.get("bio"),
        avatar_url: row.get("avatar_url"),
        role,
        created_at: row.get("created_at"),
    })
}
