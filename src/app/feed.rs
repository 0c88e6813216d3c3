use anyhow::Result;
use redis::AsyncCommands;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::app::engagement::EngagementService;
use crate::app::posts::PostService;
use crate::domain::post::PostWithStats;
use crate::infra::{cache::RedisCache, db::Db};

#[derive(Clone)]
pub struct FeedService {
    cache: RedisCache,
    posts: PostService,
    engagement: EngagementService,
}

const FEED_CACHE_TTL_SECONDS: u64 = 30;

impl FeedService {
    pub fn new(db: Db, cache: RedisCache) -> Self {
        Self {
            cache,
            posts: PostService::new(db.clone()),
            engagement: EngagementService::new(db),
        }
    }

    /// Recent community posts, newest first. Pages are cached briefly with
    /// viewer-agnostic counts; the viewer's liked flags are overlaid after the
    /// fetch so the cache stays shared across viewers.
    pub async fn recent_posts(
        &self,
        viewer_id: Option<Uuid>,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<(Vec<PostWithStats>, Option<(OffsetDateTime, Uuid)>)> {
        let cache_key = match cursor {
            Some((created_at, id)) => format!("feed:recent:{}:{}", created_at, id),
            None => "feed:recent".to_string(),
        };

        if let Ok(mut conn) = self.cache.client().get_multiplexed_async_connection().await {
            if let Ok(Some(payload)) = conn.get::<_, Option<String>>(&cache_key).await {
                if let Ok(mut posts) = serde_json::from_str::<Vec<PostWithStats>>(&payload) {
                    // A full page implies more rows probably exist; the cursor
                    // may point at an empty page right at the boundary.
                    let next_cursor = if posts.len() == limit as usize {
                        posts.last().map(|post| (post.created_at, post.id))
                    } else {
                        None
                    };
                    self.overlay_liked(viewer_id, &mut posts).await;
                    return Ok((posts, next_cursor));
                }
            }
        }

        let mut posts = self.posts.list_recent(cursor, limit + 1).await?;
        let next_cursor = if posts.len() > limit as usize {
            posts.pop();
            posts.last().map(|post| (post.created_at, post.id))
        } else {
            None
        };

        if let Ok(mut conn) = self.cache.client().get_multiplexed_async_connection().await {
            if let Ok(payload) = serde_json::to_string(&posts) {
                if let Err(err) = conn
                    .set_ex::<_, _, ()>(&cache_key, payload, FEED_CACHE_TTL_SECONDS)
                    .await
                {
                    warn!(error = ?err, "failed to write feed cache");
                }
            }
        }

        self.overlay_liked(viewer_id, &mut posts).await;

        Ok((posts, next_cursor))
    }

    /// Drop the cached first page, e.g. after a new post.
    pub async fn invalidate_recent(&self) {
        if let Ok(mut conn) = self.cache.client().get_multiplexed_async_connection().await {
            let _ = conn.del::<_, ()>("feed:recent").await;
        }
    }

    async fn overlay_liked(&self, viewer_id: Option<Uuid>, posts: &mut [PostWithStats]) {
        let Some(viewer_id) = viewer_id else {
            return;
        };
        match self.engagement.liked_post_ids(viewer_id).await {
            Ok(liked) => {
                for post in posts.iter_mut() {
                    post.is_liked = liked.contains(&post.id);
                }
            }
            Err(err) => {
                warn!(error = ?err, "failed to load viewer likes for feed");
            }
        }
    }
}
