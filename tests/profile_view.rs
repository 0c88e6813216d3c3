//! Profile view behavior: load assembly, degraded branches, optimistic
//! follow toggles, and the stale-load guard. Everything runs against the
//! in-memory store so failures and interleavings are deterministic.

mod common;

use common::{sample_listing, sample_note, sample_post, sample_profile, MemoryCommunity};
use uninest::app::profile_view::{ProfileTarget, ProfileView, ViewError};

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_assembles_profile_counts_and_content() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    let carol = sample_profile("carol");
    store.add_profile(alice.clone());
    store.add_profile(bob.clone());
    store.add_profile(carol.clone());

    store.add_follow(alice.id, bob.id);
    store.add_follow(carol.id, bob.id);
    store.add_follow(bob.id, carol.id);

    store.add_note(sample_note(&bob, "Signals cheat sheet"));
    store.add_listing(sample_listing(&bob, "Used oscilloscope"));
    store.add_post(sample_post(&bob, "lab report done"));

    let view = ProfileView::new(store.clone(), Some(alice.id));
    let page = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    assert_eq!(page.profile.id, bob.id);
    assert_eq!(page.profile.handle, "bob");
    assert_eq!(page.profile.follower_count, 2);
    assert_eq!(page.profile.following_count, 1);
    assert!(page.is_following);

    assert_eq!(page.content.notes.len(), 1);
    assert_eq!(page.content.notes[0].title, "Signals cheat sheet");
    assert_eq!(page.content.listings.len(), 1);
    assert_eq!(page.content.posts.len(), 1);
    assert_eq!(page.content.followers.len(), 2);
    assert_eq!(page.content.following.len(), 1);
    assert_eq!(page.content.following[0].handle, "carol");

    // The committed snapshot matches what the load returned.
    let snapshot = view.snapshot().expect("no snapshot after load");
    assert_eq!(snapshot.profile.id, page.profile.id);
    assert_eq!(snapshot.profile.follower_count, 2);
    assert!(snapshot.is_following);
}

#[tokio::test]
async fn a_profile_with_no_edges_shows_zero_counts() {
    let store = MemoryCommunity::new();
    store.add_profile(sample_profile("loner"));

    let view = ProfileView::new(store, None);
    let page = view
        .load(&ProfileTarget::Handle("loner".to_string()))
        .await
        .expect("load failed");

    assert_eq!(page.profile.follower_count, 0);
    assert_eq!(page.profile.following_count, 0);
    assert!(page.content.followers.is_empty());
    assert!(page.content.following.is_empty());
}

#[tokio::test]
async fn anonymous_viewer_skips_the_relationship_probe() {
    let store = MemoryCommunity::new();
    let bob = sample_profile("bob");
    let carol = sample_profile("carol");
    store.add_profile(bob.clone());
    store.add_profile(carol.clone());
    store.add_follow(carol.id, bob.id);

    let view = ProfileView::new(store.clone(), None);
    let page = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    assert!(!page.is_following);
    assert_eq!(page.profile.follower_count, 1);
    assert_eq!(store.exists_probes(), 0);
}

#[tokio::test]
async fn own_profile_skips_the_relationship_probe() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    store.add_profile(alice.clone());

    let view = ProfileView::new(store.clone(), Some(alice.id));
    let page = view.load(&ProfileTarget::Own).await.expect("load failed");

    assert_eq!(page.profile.handle, "alice");
    assert!(!page.is_following);
    assert_eq!(store.exists_probes(), 0);
}

#[tokio::test]
async fn unknown_handle_is_not_found() {
    let store = MemoryCommunity::new();
    store.add_profile(sample_profile("alice"));

    let view = ProfileView::new(store, None);
    let err = view
        .load(&ProfileTarget::Handle("ghost".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, ViewError::NotFound));
    assert!(view.snapshot().is_none());
}

#[tokio::test]
async fn own_target_requires_a_viewer() {
    let store = MemoryCommunity::new();
    let view = ProfileView::new(store, None);

    let err = view.load(&ProfileTarget::Own).await.unwrap_err();
    assert!(matches!(err, ViewError::Unauthenticated));
}

// ---------------------------------------------------------------------------
// Degraded branches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn count_failures_degrade_to_zero() {
    let store = MemoryCommunity::new();
    let bob = sample_profile("bob");
    let carol = sample_profile("carol");
    store.add_profile(bob.clone());
    store.add_profile(carol.clone());
    store.add_follow(carol.id, bob.id);
    store.add_note(sample_note(&bob, "Thermo notes"));
    store.fail_counts();

    let view = ProfileView::new(store, None);
    let page = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    assert_eq!(page.profile.follower_count, 0);
    assert_eq!(page.profile.following_count, 0);
    // The rest of the page is unaffected.
    assert_eq!(page.content.notes.len(), 1);
}

#[tokio::test]
async fn a_failed_listings_branch_comes_back_empty() {
    let store = MemoryCommunity::new();
    let bob = sample_profile("bob");
    store.add_profile(bob.clone());
    store.add_note(sample_note(&bob, "Thermo notes"));
    store.add_listing(sample_listing(&bob, "Lab coat"));
    store.add_post(sample_post(&bob, "exam week"));
    store.fail_listings();

    let view = ProfileView::new(store, None);
    let page = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    assert!(page.content.listings.is_empty());
    assert_eq!(page.content.notes.len(), 1);
    assert_eq!(page.content.posts.len(), 1);
}

#[tokio::test]
async fn a_failed_notes_branch_leaves_the_rest_intact() {
    let store = MemoryCommunity::new();
    let bob = sample_profile("bob");
    store.add_profile(bob.clone());
    store.add_note(sample_note(&bob, "Thermo notes"));
    store.add_listing(sample_listing(&bob, "Lab coat"));
    store.add_post(sample_post(&bob, "exam week"));
    store.fail_notes();

    let view = ProfileView::new(store, None);
    let page = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    assert!(page.content.notes.is_empty());
    assert_eq!(page.content.listings.len(), 1);
    assert_eq!(page.content.posts.len(), 1);
}

#[tokio::test]
async fn relationship_failure_fails_the_load() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    store.add_profile(alice.clone());
    store.add_profile(bob.clone());
    store.fail_relationship();

    let view = ProfileView::new(store, Some(alice.id));
    let err = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, ViewError::Transport(_)));
    assert!(view.snapshot().is_none());
}

#[tokio::test]
async fn viewer_likes_are_overlaid_on_posts() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    store.add_profile(alice.clone());
    store.add_profile(bob.clone());

    let liked = sample_post(&bob, "liked one");
    let other = sample_post(&bob, "other one");
    store.add_post(liked.clone());
    store.add_post(other.clone());
    store.add_like(alice.id, liked.id);

    let view = ProfileView::new(store, Some(alice.id));
    let page = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    let find = |id| {
        page.content
            .posts
            .iter()
            .find(|post| post.id == id)
            .expect("post missing")
    };
    assert!(find(liked.id).is_liked);
    assert!(!find(other.id).is_liked);
}

#[tokio::test]
async fn liked_set_failure_leaves_posts_unmarked() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    store.add_profile(alice.clone());
    store.add_profile(bob.clone());

    let post = sample_post(&bob, "still visible");
    store.add_post(post.clone());
    store.add_like(alice.id, post.id);
    store.fail_liked();

    let view = ProfileView::new(store, Some(alice.id));
    let page = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    assert_eq!(page.content.posts.len(), 1);
    assert!(!page.content.posts[0].is_liked);
}

// ---------------------------------------------------------------------------
// Follow toggles
// ---------------------------------------------------------------------------

#[tokio::test]
async fn toggle_follows_then_unfollows_exactly_once() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    store.add_profile(alice.clone());
    store.add_profile(bob.clone());

    let view = ProfileView::new(store.clone(), Some(alice.id));
    let page = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");
    assert!(!page.is_following);
    assert_eq!(page.profile.follower_count, 0);

    assert!(view.toggle_follow().await.expect("follow failed"));
    let snapshot = view.snapshot().unwrap();
    assert!(snapshot.is_following);
    assert_eq!(snapshot.profile.follower_count, 1);
    assert!(store.has_follow(alice.id, bob.id));

    assert!(!view.toggle_follow().await.expect("unfollow failed"));
    let snapshot = view.snapshot().unwrap();
    assert!(!snapshot.is_following);
    assert_eq!(snapshot.profile.follower_count, 0);
    assert!(!store.has_follow(alice.id, bob.id));
}

#[tokio::test]
async fn a_new_follower_raises_the_count_by_one() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    let carol = sample_profile("carol");
    let dana = sample_profile("dana");
    let emma = sample_profile("emma");
    for profile in [&alice, &bob, &carol, &dana, &emma] {
        store.add_profile((*profile).clone());
    }

    // Alice already has two followers and follows three people herself.
    store.add_follow(carol.id, alice.id);
    store.add_follow(dana.id, alice.id);
    store.add_follow(alice.id, carol.id);
    store.add_follow(alice.id, dana.id);
    store.add_follow(alice.id, emma.id);

    let view = ProfileView::new(store, Some(bob.id));
    let page = view
        .load(&ProfileTarget::Handle("alice".to_string()))
        .await
        .expect("load failed");
    assert_eq!(page.profile.follower_count, 2);
    assert_eq!(page.profile.following_count, 3);
    assert!(!page.is_following);

    assert!(view.toggle_follow().await.expect("follow failed"));
    let snapshot = view.snapshot().unwrap();
    assert!(snapshot.is_following);
    assert_eq!(snapshot.profile.follower_count, 3);
    // Only the follower side moves.
    assert_eq!(snapshot.profile.following_count, 3);
}

#[tokio::test]
async fn repeated_toggle_pairs_do_not_drift_the_count() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    let carol = sample_profile("carol");
    store.add_profile(alice.clone());
    store.add_profile(bob.clone());
    store.add_profile(carol.clone());
    store.add_follow(carol.id, bob.id);

    let view = ProfileView::new(store.clone(), Some(alice.id));
    view.load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    for _ in 0..4 {
        assert!(view.toggle_follow().await.expect("follow failed"));
        assert_eq!(view.snapshot().unwrap().profile.follower_count, 2);
        assert!(!view.toggle_follow().await.expect("unfollow failed"));
        assert_eq!(view.snapshot().unwrap().profile.follower_count, 1);
    }

    assert!(!store.has_follow(alice.id, bob.id));
    assert!(store.has_follow(carol.id, bob.id));
}

#[tokio::test]
async fn duplicate_edge_does_not_move_the_count_twice() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    store.add_profile(alice.clone());
    store.add_profile(bob.clone());

    let view = ProfileView::new(store.clone(), Some(alice.id));
    let page = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");
    assert_eq!(page.profile.follower_count, 0);

    // The edge appears behind the view's back (say, from another device).
    store.add_follow(alice.id, bob.id);

    assert!(view.toggle_follow().await.expect("follow failed"));
    let snapshot = view.snapshot().unwrap();
    assert!(snapshot.is_following);
    // The store reported no new edge, so the count must not move.
    assert_eq!(snapshot.profile.follower_count, 0);

    // The next load reconciles the real count.
    let reloaded = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("reload failed");
    assert_eq!(reloaded.profile.follower_count, 1);
    assert!(reloaded.is_following);
}

#[tokio::test]
async fn absent_edge_unfollow_does_not_move_the_count() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    store.add_profile(alice.clone());
    store.add_profile(bob.clone());
    store.add_follow(alice.id, bob.id);

    let view = ProfileView::new(store.clone(), Some(alice.id));
    let page = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");
    assert!(page.is_following);
    assert_eq!(page.profile.follower_count, 1);

    // The edge disappears behind the view's back (say, from another device).
    store.remove_follow(alice.id, bob.id);

    assert!(!view.toggle_follow().await.expect("unfollow failed"));
    let snapshot = view.snapshot().unwrap();
    assert!(!snapshot.is_following);
    // The store removed nothing, so the count must not move.
    assert_eq!(snapshot.profile.follower_count, 1);

    // The next load reconciles the real count.
    let reloaded = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("reload failed");
    assert_eq!(reloaded.profile.follower_count, 0);
    assert!(!reloaded.is_following);
}

#[tokio::test]
async fn a_failed_follow_write_leaves_state_untouched() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    store.add_profile(alice.clone());
    store.add_profile(bob.clone());

    let view = ProfileView::new(store.clone(), Some(alice.id));
    view.load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    store.fail_inserts();
    let err = view.toggle_follow().await.unwrap_err();
    assert!(matches!(err, ViewError::Transport(_)));

    // Nothing moved: no edge written, cached state untouched.
    let snapshot = view.snapshot().unwrap();
    assert!(!snapshot.is_following);
    assert_eq!(snapshot.profile.follower_count, 0);
    assert!(!store.has_follow(alice.id, bob.id));

    // The in-flight slot was released on the error path; a retry succeeds.
    store.restore_inserts();
    assert!(view.toggle_follow().await.expect("retry failed"));
    let snapshot = view.snapshot().unwrap();
    assert!(snapshot.is_following);
    assert_eq!(snapshot.profile.follower_count, 1);
    assert!(store.has_follow(alice.id, bob.id));
}

#[tokio::test]
async fn a_failed_unfollow_write_leaves_state_untouched() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    store.add_profile(alice.clone());
    store.add_profile(bob.clone());
    store.add_follow(alice.id, bob.id);

    let view = ProfileView::new(store.clone(), Some(alice.id));
    view.load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    store.fail_deletes();
    let err = view.toggle_follow().await.unwrap_err();
    assert!(matches!(err, ViewError::Transport(_)));

    let snapshot = view.snapshot().unwrap();
    assert!(snapshot.is_following);
    assert_eq!(snapshot.profile.follower_count, 1);
    assert!(store.has_follow(alice.id, bob.id));

    store.restore_deletes();
    assert!(!view.toggle_follow().await.expect("unfollow failed"));
    assert!(!store.has_follow(alice.id, bob.id));
}

#[tokio::test]
async fn refresh_replaces_optimistic_counts_with_ground_truth() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    let carol = sample_profile("carol");
    store.add_profile(alice.clone());
    store.add_profile(bob.clone());
    store.add_profile(carol.clone());

    let view = ProfileView::new(store.clone(), Some(alice.id));
    view.load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    assert!(view.toggle_follow().await.expect("follow failed"));
    // Carol follows bob after our load; the cached count knows nothing
    // about her.
    store.add_follow(carol.id, bob.id);
    assert_eq!(view.snapshot().unwrap().profile.follower_count, 1);

    let refreshed = view.refresh().await.expect("refresh failed");
    assert_eq!(refreshed.profile.follower_count, 2);
    assert!(refreshed.is_following);
    assert_eq!(view.snapshot().unwrap().profile.follower_count, 2);
}

#[tokio::test]
async fn refresh_requires_a_loaded_profile() {
    let store = MemoryCommunity::new();
    store.add_profile(sample_profile("alice"));

    let view = ProfileView::new(store, None);
    let err = view.refresh().await.unwrap_err();
    assert!(matches!(err, ViewError::NotLoaded));
}

#[tokio::test]
async fn toggle_requires_a_loaded_profile() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    store.add_profile(alice.clone());

    let view = ProfileView::new(store, Some(alice.id));
    let err = view.toggle_follow().await.unwrap_err();
    assert!(matches!(err, ViewError::NotLoaded));
}

#[tokio::test]
async fn toggling_yourself_is_rejected() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    store.add_profile(alice.clone());

    let view = ProfileView::new(store.clone(), Some(alice.id));
    view.load(&ProfileTarget::Own).await.expect("load failed");

    let err = view.toggle_follow().await.unwrap_err();
    assert!(matches!(err, ViewError::SelfFollow));
    assert!(!store.has_follow(alice.id, alice.id));
}

#[tokio::test]
async fn anonymous_toggle_is_unauthenticated() {
    let store = MemoryCommunity::new();
    store.add_profile(sample_profile("bob"));

    let view = ProfileView::new(store, None);
    view.load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    let err = view.toggle_follow().await.unwrap_err();
    assert!(matches!(err, ViewError::Unauthenticated));
}

#[tokio::test]
async fn only_one_toggle_may_be_in_flight() {
    let store = MemoryCommunity::new();
    let alice = sample_profile("alice");
    let bob = sample_profile("bob");
    store.add_profile(alice.clone());
    store.add_profile(bob.clone());

    let view = ProfileView::new(store.clone(), Some(alice.id));
    view.load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("load failed");

    // Park the first toggle inside the store write.
    store.hold_inserts();
    let first = view.toggle_follow();
    tokio::pin!(first);
    assert!(futures::poll!(first.as_mut()).is_pending());

    // A second toggle on the same pair is rejected, not queued, and the
    // rejection touches nothing: the cached state still reflects the
    // pre-toggle world until the parked write lands.
    let second = view.toggle_follow().await;
    assert!(matches!(second, Err(ViewError::ToggleInFlight)));
    let snapshot = view.snapshot().unwrap();
    assert!(!snapshot.is_following);
    assert_eq!(snapshot.profile.follower_count, 0);

    store.release_inserts();
    assert!(first.await.expect("parked follow failed"));
    assert!(store.has_follow(alice.id, bob.id));

    // The slot frees up once the first toggle settles.
    assert!(!view.toggle_follow().await.expect("unfollow failed"));
}

// ---------------------------------------------------------------------------
// Stale loads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn superseded_load_does_not_overwrite_newer_state() {
    let store = MemoryCommunity::new();
    store.add_profile(sample_profile("alice"));
    store.add_profile(sample_profile("bob"));

    let view = ProfileView::new(store.clone(), None);

    // Park the first load at the profile lookup, then finish a newer one.
    store.hold_handle("alice");
    let stale_target = ProfileTarget::Handle("alice".to_string());
    let stale = view.load(&stale_target);
    tokio::pin!(stale);
    assert!(futures::poll!(stale.as_mut()).is_pending());

    let fresh = view
        .load(&ProfileTarget::Handle("bob".to_string()))
        .await
        .expect("fresh load failed");
    assert_eq!(fresh.profile.handle, "bob");

    store.release_handle("alice");
    let result = stale.await;
    assert!(matches!(result, Err(ViewError::Superseded)));

    let snapshot = view.snapshot().expect("snapshot lost");
    assert_eq!(snapshot.profile.handle, "bob");
}

#[tokio::test]
async fn a_failed_newer_load_still_supersedes_the_older_one() {
    let store = MemoryCommunity::new();
    store.add_profile(sample_profile("alice"));

    let view = ProfileView::new(store.clone(), None);

    store.hold_handle("alice");
    let stale_target = ProfileTarget::Handle("alice".to_string());
    let stale = view.load(&stale_target);
    tokio::pin!(stale);
    assert!(futures::poll!(stale.as_mut()).is_pending());

    // The newer load fails, but it still makes the older one stale.
    let missing = view.load(&ProfileTarget::Handle("ghost".to_string())).await;
    assert!(matches!(missing, Err(ViewError::NotFound)));

    store.release_handle("alice");
    let result = stale.await;
    assert!(matches!(result, Err(ViewError::Superseded)));
    assert!(view.snapshot().is_none());
}
