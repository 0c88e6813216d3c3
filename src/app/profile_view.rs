//! Stateful profile view: resolves a profile, checks the viewer's follow
//! relationship, aggregates the profile's content collections, and applies
//! optimistic follow toggles.
//!
//! The view is generic over its store so the HTTP layer can drive it with
//! the Postgres-backed services while tests drive it with an in-memory
//! store. Loads are numbered; a load that finishes after a newer one has
//! started is discarded rather than clobbering fresher state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::domain::listing::Listing;
use crate::domain::note::Note;
use crate::domain::post::PostWithStats;
use crate::domain::profile::{Profile, ProfileCard};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("sign in required")]
    Unauthenticated,
    #[error("profile not found")]
    NotFound,
    #[error("cannot follow your own profile")]
    SelfFollow,
    #[error("no profile is loaded")]
    NotLoaded,
    #[error("a follow update is already in flight")]
    ToggleInFlight,
    #[error("superseded by a newer load")]
    Superseded,
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// Profile lookups, keyed by handle or id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile_by_handle(&self, handle: &str) -> anyhow::Result<Option<Profile>>;
    async fn profile_by_id(&self, id: Uuid) -> anyhow::Result<Option<Profile>>;
}

/// Follow-graph reads and writes.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    async fn follower_count(&self, profile_id: Uuid) -> anyhow::Result<i64>;
    async fn following_count(&self, profile_id: Uuid) -> anyhow::Result<i64>;
    async fn follow_exists(&self, follower_id: Uuid, following_id: Uuid) -> anyhow::Result<bool>;
    /// Returns whether a new edge was actually written.
    async fn insert_follow(&self, follower_id: Uuid, following_id: Uuid) -> anyhow::Result<bool>;
    /// Returns whether an edge was actually removed.
    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> anyhow::Result<bool>;
    async fn follower_profiles(&self, profile_id: Uuid) -> anyhow::Result<Vec<Profile>>;
    async fn following_profiles(&self, profile_id: Uuid) -> anyhow::Result<Vec<Profile>>;
}

/// The profile's content collections.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn notes_by_author(&self, author_id: Uuid) -> anyhow::Result<Vec<Note>>;
    async fn listings_by_seller(&self, seller_id: Uuid) -> anyhow::Result<Vec<Listing>>;
    async fn posts_by_author(&self, author_id: Uuid) -> anyhow::Result<Vec<PostWithStats>>;
    async fn liked_post_ids(&self, viewer_id: Uuid) -> anyhow::Result<HashSet<Uuid>>;
}

/// Everything a [`ProfileView`] needs. Blanket-implemented for any type
/// providing the three stores.
pub trait ViewStore: ProfileStore + RelationshipStore + ContentStore {}

impl<T: ProfileStore + RelationshipStore + ContentStore> ViewStore for T {}

/// Which profile the view should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileTarget {
    /// The viewer's own profile; requires a signed-in viewer.
    Own,
    /// Another profile, looked up by handle.
    Handle(String),
}

/// Content collections rendered alongside the profile header. Collections
/// degrade independently: a failed branch shows up empty instead of taking
/// the whole view down.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileContent {
    pub notes: Vec<Note>,
    pub listings: Vec<Listing>,
    pub posts: Vec<PostWithStats>,
    pub followers: Vec<Profile>,
    pub following: Vec<Profile>,
}

/// One fully-assembled profile page.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSnapshot {
    pub profile: ProfileCard,
    pub is_following: bool,
    pub content: ProfileContent,
}

/// A viewer's live view of one profile page.
///
/// The viewer identity is fixed at construction and passed explicitly to
/// every store call; nothing here reads ambient session state. Counts shown
/// after a toggle are optimistic and reconciled by the next [`load`].
///
/// [`load`]: ProfileView::load
pub struct ProfileView<S> {
    store: S,
    viewer: Option<Uuid>,
    generation: AtomicU64,
    state: Mutex<Option<ProfileSnapshot>>,
    toggle_busy: AtomicBool,
}

impl<S: ViewStore> ProfileView<S> {
    pub fn new(store: S, viewer: Option<Uuid>) -> Self {
        Self {
            store,
            viewer,
            generation: AtomicU64::new(0),
            state: Mutex::new(None),
            toggle_busy: AtomicBool::new(false),
        }
    }

    pub fn viewer(&self) -> Option<Uuid> {
        self.viewer
    }

    /// The last committed snapshot, if any.
    pub fn snapshot(&self) -> Option<ProfileSnapshot> {
        self.lock_state().clone()
    }

    /// Resolve the target profile and assemble the full page.
    ///
    /// The relationship check and the content fan-out run concurrently once
    /// the profile id is known. A load that finishes after a newer load has
    /// begun returns [`ViewError::Superseded`] and leaves state untouched.
    pub async fn load(&self, target: &ProfileTarget) -> Result<ProfileSnapshot, ViewError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let profile = self.resolve(target).await?;
        let profile_id = profile.id;

        let (follower_count, following_count) = self.resolve_counts(profile_id).await;

        let (is_following, content) = tokio::join!(
            self.check_following(profile_id),
            self.aggregate_content(profile_id),
        );
        let is_following = is_following?;

        let snapshot = ProfileSnapshot {
            profile: ProfileCard::from_profile(profile, follower_count, following_count),
            is_following,
            content,
        };

        let mut state = self.lock_state();
        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(ViewError::Superseded);
        }
        *state = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Re-resolve the loaded profile from the store.
    ///
    /// Counts shown after [`toggle_follow`] are optimistic arithmetic on the
    /// cached snapshot; this replaces them with a fresh aggregation. Runs as
    /// an ordinary load, so it obeys the same supersession rules.
    ///
    /// [`toggle_follow`]: ProfileView::toggle_follow
    pub async fn refresh(&self) -> Result<ProfileSnapshot, ViewError> {
        let handle = {
            let state = self.lock_state();
            let loaded = state.as_ref().ok_or(ViewError::NotLoaded)?;
            loaded.profile.handle.clone()
        };
        self.load(&ProfileTarget::Handle(handle)).await
    }

    /// Flip the follow state against the loaded profile.
    ///
    /// Exactly one toggle may be in flight at a time; a second call while
    /// the first awaits the store is rejected with
    /// [`ViewError::ToggleInFlight`]. On success the cached snapshot's
    /// `is_following` flips and its follower count moves by one only when
    /// the store actually changed an edge, so a duplicate request cannot
    /// move the count twice.
    ///
    /// Returns the new follow state.
    pub async fn toggle_follow(&self) -> Result<bool, ViewError> {
        let viewer = self.viewer.ok_or(ViewError::Unauthenticated)?;
        let (target, currently_following) = {
            let state = self.lock_state();
            let loaded = state.as_ref().ok_or(ViewError::NotLoaded)?;
            (loaded.profile.id, loaded.is_following)
        };
        if viewer == target {
            return Err(ViewError::SelfFollow);
        }

        if self
            .toggle_busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ViewError::ToggleInFlight);
        }
        let _busy = ToggleGuard(&self.toggle_busy);

        if currently_following {
            let removed = self
                .store
                .delete_follow(viewer, target)
                .await
                .map_err(ViewError::Transport)?;
            self.commit_toggle(target, false, if removed { -1 } else { 0 });
            Ok(false)
        } else {
            let created = self
                .store
                .insert_follow(viewer, target)
                .await
                .map_err(ViewError::Transport)?;
            self.commit_toggle(target, true, if created { 1 } else { 0 });
            Ok(true)
        }
    }

    async fn resolve(&self, target: &ProfileTarget) -> Result<Profile, ViewError> {
        match target {
            ProfileTarget::Own => {
                let viewer = self.viewer.ok_or(ViewError::Unauthenticated)?;
                self.store
                    .profile_by_id(viewer)
                    .await
                    .map_err(ViewError::Transport)?
                    .ok_or(ViewError::NotFound)
            }
            ProfileTarget::Handle(handle) => self
                .store
                .profile_by_handle(handle)
                .await
                .map_err(ViewError::Transport)?
                .ok_or(ViewError::NotFound),
        }
    }

    /// Follow counts degrade to zero; only the profile row itself is fatal.
    async fn resolve_counts(&self, profile_id: Uuid) -> (i64, i64) {
        let (followers, following) = tokio::join!(
            self.store.follower_count(profile_id),
            self.store.following_count(profile_id),
        );
        let followers = followers.unwrap_or_else(|err| {
            warn!(error = ?err, %profile_id, "follower count unavailable, showing zero");
            0
        });
        let following = following.unwrap_or_else(|err| {
            warn!(error = ?err, %profile_id, "following count unavailable, showing zero");
            0
        });
        (followers, following)
    }

    /// Skipped entirely for anonymous viewers and for the viewer's own
    /// profile: no edge lookup is issued in either case.
    async fn check_following(&self, target_id: Uuid) -> Result<bool, ViewError> {
        let Some(viewer) = self.viewer else {
            return Ok(false);
        };
        if viewer == target_id {
            return Ok(false);
        }
        self.store
            .follow_exists(viewer, target_id)
            .await
            .map_err(ViewError::Transport)
    }

    /// Fan out to every collection at once; each branch that fails is
    /// replaced with its empty value.
    async fn aggregate_content(&self, profile_id: Uuid) -> ProfileContent {
        let liked = async {
            match self.viewer {
                Some(viewer) => self.store.liked_post_ids(viewer).await,
                None => Ok(HashSet::new()),
            }
        };

        let (notes, listings, posts, followers, following, liked) = tokio::join!(
            self.store.notes_by_author(profile_id),
            self.store.listings_by_seller(profile_id),
            self.store.posts_by_author(profile_id),
            self.store.follower_profiles(profile_id),
            self.store.following_profiles(profile_id),
            liked,
        );

        let liked = branch_or_empty(liked, "liked posts");
        let mut posts = branch_or_empty(posts, "posts");
        for post in &mut posts {
            post.is_liked = liked.contains(&post.id);
        }

        ProfileContent {
            notes: branch_or_empty(notes, "notes"),
            listings: branch_or_empty(listings, "listings"),
            posts,
            followers: branch_or_empty(followers, "followers"),
            following: branch_or_empty(following, "following"),
        }
    }

    fn commit_toggle(&self, target: Uuid, now_following: bool, delta: i64) {
        let mut state = self.lock_state();
        if let Some(loaded) = state.as_mut() {
            if loaded.profile.id == target {
                loaded.is_following = now_following;
                loaded.profile.follower_count += delta;
            }
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, Option<ProfileSnapshot>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct ToggleGuard<'a>(&'a AtomicBool);

impl Drop for ToggleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn branch_or_empty<T: Default>(result: anyhow::Result<T>, collection: &str) -> T {
    result.unwrap_or_else(|err| {
        warn!(error = ?err, collection, "profile content branch failed, showing empty");
        T::default()
    })
}
