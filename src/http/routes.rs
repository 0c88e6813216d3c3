use axum::{routing::delete, routing::get, routing::patch, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh_token))
        .route("/auth/revoke", post(handlers::revoke_token))
        .route("/auth/me", get(handlers::get_current_account))
}

pub fn profiles() -> Router<AppState> {
    Router::new()
        .route("/profiles/me", get(handlers::get_own_profile_page))
        .route("/profiles/me", patch(handlers::update_profile))
        .route("/profiles/me/avatar", post(handlers::upload_avatar))
        .route("/profiles/:handle", get(handlers::get_profile_page))
        .route("/profiles/:handle/card", get(handlers::get_profile_card))
        .route("/profiles/:handle/follow", post(handlers::toggle_follow))
        .route("/profiles/:handle/followers", get(handlers::list_followers))
        .route("/profiles/:handle/following", get(handlers::list_following))
        // Account management (authenticated user's own account)
        .route("/account", delete(handlers::delete_account))
}

pub fn feed() -> Router<AppState> {
    Router::new()
        .route("/feed", get(handlers::community_feed))
        .route("/posts", post(handlers::create_post))
        .route("/posts/:id", get(handlers::get_post))
        .route("/posts/:id", patch(handlers::update_post))
        .route("/posts/:id", delete(handlers::delete_post))
        .route("/posts/:id/like", post(handlers::like_post))
        .route("/posts/:id/like", delete(handlers::unlike_post))
        .route("/posts/:id/comments", post(handlers::comment_post))
        .route("/posts/:id/comments", get(handlers::list_post_comments))
        .route(
            "/posts/:id/comments/:comment_id",
            delete(handlers::delete_comment),
        )
}

pub fn notes() -> Router<AppState> {
    Router::new()
        .route("/notes", get(handlers::list_notes))
        .route("/notes", post(handlers::create_note))
        .route("/notes/:id", delete(handlers::delete_note))
}

pub fn market() -> Router<AppState> {
    Router::new()
        .route("/market/listings", get(handlers::list_listings))
        .route("/market/listings", post(handlers::create_listing))
        .route("/market/listings/mine", get(handlers::list_own_listings))
        .route(
            "/market/listings/:id",
            patch(handlers::update_listing_status),
        )
        .route("/market/listings/:id", delete(handlers::delete_listing))
}

pub fn workspace() -> Router<AppState> {
    Router::new()
        .route("/workspace/competitions", get(handlers::list_competitions))
        .route("/workspace/internships", get(handlers::list_internships))
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route("/admin/competitions", post(handlers::create_competition))
        .route(
            "/admin/competitions/:id",
            delete(handlers::delete_competition),
        )
        .route("/admin/internships", post(handlers::create_internship))
        .route(
            "/admin/internships/:id",
            delete(handlers::delete_internship),
        )
        .route("/admin/accounts", get(handlers::list_accounts))
        .route(
            "/admin/accounts/:id/role",
            patch(handlers::update_account_role),
        )
        .route("/admin/accounts/:id", delete(handlers::remove_account))
}

pub fn payments() -> Router<AppState> {
    Router::new()
        .route("/payments/orders", post(handlers::create_payment_order))
        .route("/payments/orders/:order_id", get(handlers::get_payment_order))
        .route("/payments/verify", post(handlers::verify_payment))
        .route("/payments/donors", get(handlers::top_donors))
}
