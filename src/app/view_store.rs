use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::app::engagement::EngagementService;
use crate::app::marketplace::MarketplaceService;
use crate::app::notes::NoteService;
use crate::app::posts::PostService;
use crate::app::profiles::ProfileService;
use crate::app::profile_view::{ContentStore, ProfileStore, RelationshipStore};
use crate::app::social::SocialService;
use crate::domain::listing::Listing;
use crate::domain::note::Note;
use crate::domain::post::PostWithStats;
use crate::domain::profile::Profile;
use crate::infra::db::Db;

/// How many rows each profile-page collection fetches.
const PROFILE_CONTENT_LIMIT: i64 = 200;

/// Postgres-backed store for [`crate::app::profile_view::ProfileView`],
/// delegating to the same services the rest of the HTTP layer uses.
#[derive(Clone)]
pub struct CommunityStores {
    profiles: ProfileService,
    social: SocialService,
    notes: NoteService,
    marketplace: MarketplaceService,
    posts: PostService,
    engagement: EngagementService,
}

impl CommunityStores {
    pub fn new(db: Db) -> Self {
        Self {
            profiles: ProfileService::new(db.clone()),
            social: SocialService::new(db.clone()),
            notes: NoteService::new(db.clone()),
            marketplace: MarketplaceService::new(db.clone()),
            posts: PostService::new(db.clone()),
            engagement: EngagementService::new(db),
        }
    }
}

#[async_trait]
impl ProfileStore for CommunityStores {
    async fn profile_by_handle(&self, handle: &str) -> anyhow::Result<Option<Profile>> {
        self.profiles.get_by_handle(handle).await
    }

    async fn profile_by_id(&self, id: Uuid) -> anyhow::Result<Option<Profile>> {
        self.profiles.get_by_id(id).await
    }
}

#[async_trait]
impl RelationshipStore for CommunityStores {
    async fn follower_count(&self, profile_id: Uuid) -> anyhow::Result<i64> {
        self.social.follower_count(profile_id).await
    }

    async fn following_count(&self, profile_id: Uuid) -> anyhow::Result<i64> {
        self.social.following_count(profile_id).await
    }

    async fn follow_exists(&self, follower_id: Uuid, following_id: Uuid) -> anyhow::Result<bool> {
        self.social.is_following(follower_id, following_id).await
    }

    async fn insert_follow(&self, follower_id: Uuid, following_id: Uuid) -> anyhow::Result<bool> {
        let created = self.social.follow(follower_id, following_id).await?;
        created.ok_or_else(|| anyhow::anyhow!("follow target no longer exists"))
    }

    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> anyhow::Result<bool> {
        self.social.unfollow(follower_id, following_id).await
    }

    async fn follower_profiles(&self, profile_id: Uuid) -> anyhow::Result<Vec<Profile>> {
        let edges = self
            .social
            .list_followers(profile_id, PROFILE_CONTENT_LIMIT)
            .await?;
        Ok(edges.into_iter().map(|edge| edge.profile).collect())
    }

    async fn following_profiles(&self, profile_id: Uuid) -> anyhow::Result<Vec<Profile>> {
        let edges = self
            .social
            .list_following(profile_id, PROFILE_CONTENT_LIMIT)
            .await?;
        Ok(edges.into_iter().map(|edge| edge.profile).collect())
    }
}

#[async_trait]
impl ContentStore for CommunityStores {
    async fn notes_by_author(&self, author_id: Uuid) -> anyhow::Result<Vec<Note>> {
        self.notes
            .list_by_author(author_id, PROFILE_CONTENT_LIMIT)
            .await
    }

    async fn listings_by_seller(&self, seller_id: Uuid) -> anyhow::Result<Vec<Listing>> {
        self.marketplace
            .list_active_by_seller(seller_id, PROFILE_CONTENT_LIMIT)
            .await
    }

    async fn posts_by_author(&self, author_id: Uuid) -> anyhow::Result<Vec<PostWithStats>> {
        self.posts
            .list_by_author(author_id, PROFILE_CONTENT_LIMIT)
            .await
    }

    async fn liked_post_ids(&self, viewer_id: Uuid) -> anyhow::Result<HashSet<Uuid>> {
        self.engagement.liked_post_ids(viewer_id).await
    }
}
