use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::engagement::EngagementService;
use crate::app::feed::FeedService;
use crate::app::marketplace::MarketplaceService;
use crate::app::notes::NoteService;
use crate::app::payments::{PaymentService, VerifyOutcome};
use crate::app::posts::PostService;
use crate::app::profile_view::{ProfileSnapshot, ProfileTarget, ProfileView};
use crate::app::profiles::ProfileService;
use crate::app::social::SocialService;
use crate::app::view_store::CommunityStores;
use crate::app::workspace::WorkspaceService;
use crate::domain::listing::ListingStatus;
use crate::domain::payment::DonorTotal;
use crate::domain::profile::{Profile, ProfileCard, ProfileRole};
use crate::http::{AdminUser, AppError, AuthUser};
use crate::infra::payments::GatewayError;
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

fn page_limit(limit: Option<i64>) -> Result<i64, AppError> {
    let limit = limit.unwrap_or(30);
    if !(1..=100).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 100"));
    }
    Ok(limit)
}

struct UploadedFile {
    field: String,
    filename: String,
    content_type: String,
    bytes: Bytes,
}

/// Drain a multipart body into plain text fields and file parts. Field order
/// does not matter; the overall size is already capped by the body limit
/// layer.
async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(HashMap<String, String>, Vec<UploadedFile>), AppError> {
    let mut fields = HashMap::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::bad_request("malformed multipart body"))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if let Some(filename) = field.file_name().map(str::to_owned) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|_| AppError::bad_request("failed to read uploaded file"))?;
            files.push(UploadedFile {
                field: name,
                filename,
                content_type,
                bytes,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|_| AppError::bad_request("malformed multipart body"))?;
            fields.insert(name, value);
        }
    }

    Ok((fields, files))
}

fn require_field<'a>(
    fields: &'a HashMap<String, String>,
    name: &str,
) -> Result<&'a str, AppError> {
    fields
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::bad_request(format!("{} is required", name)))
}

fn parse_i64_field(fields: &HashMap<String, String>, name: &str) -> Result<i64, AppError> {
    require_field(fields, name)?
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::bad_request(format!("{} must be an integer", name)))
}

/// Object keys are server-generated; only the extension survives from the
/// client filename.
fn storage_key(prefix: &str, filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!("{}/{}.{}", prefix, Uuid::new_v4(), ext.to_ascii_lowercase())
        }
        _ => format!("{}/{}", prefix, Uuid::new_v4()),
    }
}

async fn upload_file(
    state: &AppState,
    prefix: &str,
    file: UploadedFile,
) -> Result<String, AppError> {
    let key = storage_key(prefix, &file.filename);
    state
        .storage
        .upload_public(&key, &file.content_type, file.bytes)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, key = %key, "failed to store upload");
            AppError::internal("failed to store upload")
        })
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub handle: String,
    pub email: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub password: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<crate::domain::profile::Account>, AppError> {
    const MAX_PASSWORD_LEN: usize = 128;

    if payload.handle.trim().is_empty() {
        return Err(AppError::bad_request("handle cannot be empty"));
    }
    if payload.email.trim().is_empty() {
        return Err(AppError::bad_request("email cannot be empty"));
    }
    if payload.full_name.trim().is_empty() {
        return Err(AppError::bad_request("full_name cannot be empty"));
    }
    if payload.password.trim().len() < 8 {
        return Err(AppError::bad_request("password must be at least 8 characters"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let service = AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.paseto_refresh_key,
        state.access_ttl_minutes,
        state.refresh_ttl_days,
    );
    let account = service
        .signup(
            payload.handle,
            payload.email,
            payload.full_name,
            payload.bio,
            payload.password,
        )
        .await
        .map_err(|err| {
            if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
                if let Some(db_err) = sqlx_err.as_database_error() {
                    if let Some(code) = db_err.code() {
                        if code == "23505" {
                            let constraint = db_err.constraint().unwrap_or_default();
                            if constraint.contains("profiles_handle_key") {
                                return AppError::conflict("Handle already taken");
                            }
                            if constraint.contains("profiles_email_key") {
                                return AppError::conflict("Email already taken");
                            }
                        }
                    }
                }
            }
            tracing::error!(error = ?err, "failed to sign up");
            AppError::internal("failed to sign up")
        })?;

    Ok(Json(account))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_expires_at: OffsetDateTime,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    const MAX_PASSWORD_LEN: usize = 128;

    if payload.identifier.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("identifier and password are required"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let service = AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.paseto_refresh_key,
        state.access_ttl_minutes,
        state.refresh_ttl_days,
    );
    let tokens = service
        .login(&payload.identifier, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match tokens {
        Some(tokens) => Ok(Json(AuthTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        })),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let service = AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.paseto_refresh_key,
        state.access_ttl_minutes,
        state.refresh_ttl_days,
    );
    let tokens = service
        .refresh(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to refresh token");
            AppError::internal("failed to refresh token")
        })?;

    match tokens {
        Some(tokens) => Ok(Json(AuthTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        })),
        None => Err(AppError::unauthorized("invalid refresh token")),
    }
}

#[derive(Deserialize)]
pub struct RevokeRequest {
    pub refresh_token: String,
}

pub async fn revoke_token(
    State(state): State<AppState>,
    Json(payload): Json<RevokeRequest>,
) -> Result<StatusCode, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let service = AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.paseto_refresh_key,
        state.access_ttl_minutes,
        state.refresh_ttl_days,
    );
    // Revoking an unknown or already-revoked token is a no-op.
    service
        .revoke_refresh_token(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to revoke token");
            AppError::internal("failed to revoke token")
        })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_current_account(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::profile::Account>, AppError> {
    let service = AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.paseto_refresh_key,
        state.access_ttl_minutes,
        state.refresh_ttl_days,
    );
    let account = service.current_account(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to fetch current account");
        AppError::internal("failed to fetch current account")
    })?;

    match account {
        Some(account) => Ok(Json(account)),
        None => Err(AppError::not_found("account not found")),
    }
}

/// Delete the authenticated user's account and everything hanging off it.
pub async fn delete_account(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = ProfileService::new(state.db.clone());
    let deleted = service.delete_account(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to delete account");
        AppError::internal("failed to delete account")
    })?;

    if deleted {
        tracing::info!(user_id = %auth.user_id, "account deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("account not found"))
    }
}

pub async fn get_profile_page(
    Path(handle): Path<String>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<ProfileSnapshot>, AppError> {
    let viewer = auth.map(|user| user.user_id);
    let view = ProfileView::new(CommunityStores::new(state.db.clone()), viewer);
    let snapshot = view.load(&ProfileTarget::Handle(handle)).await?;

    Ok(Json(snapshot))
}

pub async fn get_own_profile_page(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileSnapshot>, AppError> {
    let view = ProfileView::new(CommunityStores::new(state.db.clone()), Some(auth.user_id));
    let snapshot = view.load(&ProfileTarget::Own).await?;

    Ok(Json(snapshot))
}

/// Header-only fetch: the profile and its follow counts without any of the
/// content collections.
pub async fn get_profile_card(
    Path(handle): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ProfileCard>, AppError> {
    let service = ProfileService::new(state.db.clone());
    let card = service.card_by_handle(&handle).await.map_err(|err| {
        tracing::error!(error = ?err, handle = %handle, "failed to fetch profile card");
        AppError::internal("failed to fetch profile card")
    })?;

    match card {
        Some(card) => Ok(Json(card)),
        None => Err(AppError::not_found("profile not found")),
    }
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    if let Some(full_name) = &payload.full_name {
        if full_name.trim().is_empty() {
            return Err(AppError::bad_request("full_name cannot be empty"));
        }
    }

    let service = ProfileService::new(state.db.clone());
    let profile = service
        .update_profile(auth.user_id, payload.full_name, payload.bio, payload.avatar_url)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to update profile");
            AppError::internal("failed to update profile")
        })?;

    match profile {
        Some(profile) => Ok(Json(profile)),
        None => Err(AppError::not_found("profile not found")),
    }
}

pub async fn upload_avatar(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Profile>, AppError> {
    let (_fields, files) = read_multipart(multipart).await?;
    let file = files
        .into_iter()
        .find(|file| file.field == "avatar")
        .ok_or_else(|| AppError::bad_request("avatar file is required"))?;
    if !file.content_type.starts_with("image/") {
        return Err(AppError::bad_request("avatar must be an image"));
    }

    let url = upload_file(&state, "avatars", file).await?;

    let service = ProfileService::new(state.db.clone());
    let profile = service
        .update_profile(auth.user_id, None, None, Some(url))
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to update avatar");
            AppError::internal("failed to update avatar")
        })?;

    match profile {
        Some(profile) => Ok(Json(profile)),
        None => Err(AppError::not_found("profile not found")),
    }
}

#[derive(Serialize)]
pub struct FollowToggleResponse {
    pub following: bool,
    pub follower_count: i64,
}

/// Flip the viewer's follow state for the profile at `handle`. The page is
/// loaded first so the toggle runs against current state and the response can
/// echo the adjusted follower count.
pub async fn toggle_follow(
    Path(handle): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FollowToggleResponse>, AppError> {
    let view = ProfileView::new(CommunityStores::new(state.db.clone()), Some(auth.user_id));
    view.load(&ProfileTarget::Handle(handle)).await?;
    let following = view.toggle_follow().await?;

    let snapshot = view
        .snapshot()
        .ok_or_else(|| AppError::internal("profile view state lost"))?;

    Ok(Json(FollowToggleResponse {
        following,
        follower_count: snapshot.profile.follower_count,
    }))
}

#[derive(Serialize)]
pub struct SocialEdgeItem {
    pub profile: Profile,
    #[serde(with = "time::serde::rfc3339")]
    pub followed_at: OffsetDateTime,
}

pub async fn list_followers(
    Path(handle): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<SocialEdgeItem>>, AppError> {
    let limit = page_limit(query.limit)?;

    let profiles = ProfileService::new(state.db.clone());
    let profile = profiles.get_by_handle(&handle).await.map_err(|err| {
        tracing::error!(error = ?err, handle = %handle, "failed to resolve profile");
        AppError::internal("failed to list followers")
    })?;
    let profile = profile.ok_or_else(|| AppError::not_found("profile not found"))?;

    let service = SocialService::new(state.db.clone());
    let followers = service
        .list_followers(profile.id, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, profile_id = %profile.id, "failed to list followers");
            AppError::internal("failed to list followers")
        })?;

    let items = followers
        .into_iter()
        .map(|edge| SocialEdgeItem {
            profile: edge.profile,
            followed_at: edge.followed_at,
        })
        .collect();

    Ok(Json(items))
}

pub async fn list_following(
    Path(handle): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<SocialEdgeItem>>, AppError> {
    let limit = page_limit(query.limit)?;

    let profiles = ProfileService::new(state.db.clone());
    let profile = profiles.get_by_handle(&handle).await.map_err(|err| {
        tracing::error!(error = ?err, handle = %handle, "failed to resolve profile");
        AppError::internal("failed to list following")
    })?;
    let profile = profile.ok_or_else(|| AppError::not_found("profile not found"))?;

    let service = SocialService::new(state.db.clone());
    let following = service
        .list_following(profile.id, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, profile_id = %profile.id, "failed to list following");
            AppError::internal("failed to list following")
        })?;

    let items = following
        .into_iter()
        .map(|edge| SocialEdgeItem {
            profile: edge.profile,
            followed_at: edge.followed_at,
        })
        .collect();

    Ok(Json(items))
}

pub async fn community_feed(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<crate::domain::post::PostWithStats>>, AppError> {
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;
    let viewer_id = auth.map(|user| user.user_id);

    let service = FeedService::new(state.db.clone(), state.cache.clone());
    let (posts, next_cursor) = service
        .recent_posts(viewer_id, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to fetch community feed");
            AppError::internal("failed to fetch community feed")
        })?;

    Ok(Json(ListResponse {
        items: posts,
        next_cursor: encode_cursor(next_cursor),
    }))
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<Json<crate::domain::post::PostWithStats>, AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::bad_request("content cannot be empty"));
    }

    let service = PostService::new(state.db.clone());
    let post = service
        .create_post(auth.user_id, payload.content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, author_id = %auth.user_id, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    FeedService::new(state.db.clone(), state.cache.clone())
        .invalidate_recent()
        .await;

    Ok(Json(post))
}

pub async fn get_post(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::post::PostWithStats>, AppError> {
    let service = PostService::new(state.db.clone());
    let post = service.get_post(id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to fetch post");
        AppError::internal("failed to fetch post")
    })?;

    match post {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::not_found("post not found")),
    }
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub content: String,
}

pub async fn update_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<crate::domain::post::PostWithStats>, AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::bad_request("content cannot be empty"));
    }

    let service = PostService::new(state.db.clone());
    let post = service
        .update_content(id, auth.user_id, payload.content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to update post");
            AppError::internal("failed to update post")
        })?;

    match post {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn delete_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = PostService::new(state.db.clone());
    let deleted = service.delete_post(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to delete post");
        AppError::internal("failed to delete post")
    })?;

    if deleted {
        FeedService::new(state.db.clone(), state.cache.clone())
            .invalidate_recent()
            .await;
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("post not found"))
    }
}

#[derive(Serialize)]
pub struct LikeResponse {
    pub liked: bool,
}

pub async fn like_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LikeResponse>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let liked = service.like_post(auth.user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, user_id = %auth.user_id, "failed to like post");
        AppError::internal("failed to like post")
    })?;

    match liked {
        Some(liked) => Ok(Json(LikeResponse { liked })),
        None => Err(AppError::not_found("post not found")),
    }
}

#[derive(Serialize)]
pub struct UnlikeResponse {
    pub unliked: bool,
}

pub async fn unlike_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UnlikeResponse>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let unliked = service.unlike_post(auth.user_id, id).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, user_id = %auth.user_id, "failed to unlike post");
        AppError::internal("failed to unlike post")
    })?;

    Ok(Json(UnlikeResponse { unliked }))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub body: String,
}

pub async fn comment_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<crate::domain::post::Comment>, AppError> {
    if payload.body.trim().is_empty() {
        return Err(AppError::bad_request("body cannot be empty"));
    }

    let service = EngagementService::new(state.db.clone());
    let comment = service
        .comment_post(auth.user_id, id, payload.body)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, user_id = %auth.user_id, "failed to comment");
            AppError::internal("failed to comment")
        })?;

    match comment {
        Some(comment) => Ok(Json(comment)),
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn list_post_comments(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<crate::domain::post::Comment>>, AppError> {
    let limit = page_limit(query.limit)?;

    let service = EngagementService::new(state.db.clone());
    let comments = service.list_comments(id, limit).await.map_err(|err| {
        tracing::error!(error = ?err, post_id = %id, "failed to list comments");
        AppError::internal("failed to list comments")
    })?;

    Ok(Json(comments))
}

pub async fn delete_comment(
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = EngagementService::new(state.db.clone());
    let deleted = service
        .delete_comment(comment_id, post_id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, comment_id = %comment_id, user_id = %auth.user_id, "failed to delete comment");
            AppError::internal("failed to delete comment")
        })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("comment not found"))
    }
}

pub async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<crate::domain::note::Note>>, AppError> {
    let limit = page_limit(query.limit)?;

    let service = NoteService::new(state.db.clone());
    let notes = service.list_recent(limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list notes");
        AppError::internal("failed to list notes")
    })?;

    Ok(Json(notes))
}

pub async fn create_note(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<crate::domain::note::Note>, AppError> {
    let (fields, files) = read_multipart(multipart).await?;
    let title = require_field(&fields, "title")?.trim().to_owned();
    let subject = fields.get("subject").cloned().filter(|s| !s.trim().is_empty());
    let description = fields
        .get("description")
        .cloned()
        .filter(|s| !s.trim().is_empty());

    let mut file_url = None;
    if let Some(file) = files.into_iter().find(|file| file.field == "file") {
        let accepted = file.content_type == "application/pdf"
            || file.content_type.starts_with("image/");
        if !accepted {
            return Err(AppError::bad_request("note file must be a pdf or an image"));
        }
        file_url = Some(upload_file(&state, "notes", file).await?);
    }

    let service = NoteService::new(state.db.clone());
    let note = service
        .create(auth.user_id, title, subject, description, file_url)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, author_id = %auth.user_id, "failed to create note");
            AppError::internal("failed to create note")
        })?;

    Ok(Json(note))
}

pub async fn delete_note(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = NoteService::new(state.db.clone());
    let deleted = service.delete(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, note_id = %id, "failed to delete note");
        AppError::internal("failed to delete note")
    })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("note not found"))
    }
}

#[derive(Deserialize)]
pub struct ListingFilterQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingFilterQuery>,
) -> Result<Json<Vec<crate::domain::listing::Listing>>, AppError> {
    let limit = page_limit(query.limit)?;

    let service = MarketplaceService::new(state.db.clone());
    let listings = service
        .list_active(query.category.as_deref(), query.q.as_deref(), limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list listings");
            AppError::internal("failed to list listings")
        })?;

    Ok(Json(listings))
}

pub async fn list_own_listings(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<crate::domain::listing::Listing>>, AppError> {
    let limit = page_limit(query.limit)?;

    let service = MarketplaceService::new(state.db.clone());
    let listings = service
        .list_by_seller(auth.user_id, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, seller_id = %auth.user_id, "failed to list own listings");
            AppError::internal("failed to list own listings")
        })?;

    Ok(Json(listings))
}

pub async fn create_listing(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<crate::domain::listing::Listing>, AppError> {
    let (fields, files) = read_multipart(multipart).await?;
    let name = require_field(&fields, "name")?.trim().to_owned();
    let category = require_field(&fields, "category")?.trim().to_owned();
    let price = parse_i64_field(&fields, "price")?;
    if price < 0 {
        return Err(AppError::bad_request("price cannot be negative"));
    }
    let description = fields
        .get("description")
        .cloned()
        .filter(|s| !s.trim().is_empty());

    let mut image_url = None;
    if let Some(file) = files.into_iter().find(|file| file.field == "image") {
        if !file.content_type.starts_with("image/") {
            return Err(AppError::bad_request("listing image must be an image"));
        }
        image_url = Some(upload_file(&state, "listings", file).await?);
    }

    let service = MarketplaceService::new(state.db.clone());
    let listing = service
        .create_listing(auth.user_id, name, description, price, category, image_url)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, seller_id = %auth.user_id, "failed to create listing");
            AppError::internal("failed to create listing")
        })?;

    Ok(Json(listing))
}

#[derive(Deserialize)]
pub struct UpdateListingRequest {
    pub status: ListingStatus,
}

pub async fn update_listing_status(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateListingRequest>,
) -> Result<Json<crate::domain::listing::Listing>, AppError> {
    let service = MarketplaceService::new(state.db.clone());
    let listing = service
        .set_status(id, auth.user_id, payload.status)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, listing_id = %id, "failed to update listing");
            AppError::internal("failed to update listing")
        })?;

    match listing {
        Some(listing) => Ok(Json(listing)),
        None => Err(AppError::not_found("listing not found")),
    }
}

pub async fn delete_listing(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = MarketplaceService::new(state.db.clone());
    let deleted = service
        .delete_listing(id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, listing_id = %id, "failed to delete listing");
            AppError::internal("failed to delete listing")
        })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("listing not found"))
    }
}

pub async fn list_competitions(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<crate::domain::workspace::Competition>>, AppError> {
    let limit = page_limit(query.limit)?;

    let service = WorkspaceService::new(state.db.clone());
    let competitions = service.list_competitions(limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list competitions");
        AppError::internal("failed to list competitions")
    })?;

    Ok(Json(competitions))
}

pub async fn list_internships(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<crate::domain::workspace::Internship>>, AppError> {
    let limit = page_limit(query.limit)?;

    let service = WorkspaceService::new(state.db.clone());
    let internships = service.list_internships(limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list internships");
        AppError::internal("failed to list internships")
    })?;

    Ok(Json(internships))
}

pub async fn create_competition(
    admin: AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<crate::domain::workspace::Competition>, AppError> {
    let (fields, files) = read_multipart(multipart).await?;
    let title = require_field(&fields, "title")?.trim().to_owned();
    let description = require_field(&fields, "description")?.trim().to_owned();
    let prize = parse_i64_field(&fields, "prize")?;
    let entry_fee = parse_i64_field(&fields, "entry_fee")?;
    if prize < 0 || entry_fee < 0 {
        return Err(AppError::bad_request("prize and entry_fee cannot be negative"));
    }
    let deadline = OffsetDateTime::parse(require_field(&fields, "deadline")?.trim(), &Rfc3339)
        .map_err(|_| AppError::bad_request("deadline must be an RFC 3339 timestamp"))?;

    let mut image_url = None;
    let mut details_pdf_url = None;
    for file in files {
        match file.field.as_str() {
            "image" => {
                if !file.content_type.starts_with("image/") {
                    return Err(AppError::bad_request("competition image must be an image"));
                }
                image_url = Some(upload_file(&state, "competitions", file).await?);
            }
            "details_pdf" => {
                if file.content_type != "application/pdf" {
                    return Err(AppError::bad_request("details_pdf must be a pdf"));
                }
                details_pdf_url = Some(upload_file(&state, "competitions", file).await?);
            }
            _ => {}
        }
    }

    let service = WorkspaceService::new(state.db.clone());
    let competition = service
        .create_competition(
            title,
            description,
            prize,
            entry_fee,
            deadline,
            image_url,
            details_pdf_url,
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, admin_id = %admin.user_id, "failed to create competition");
            AppError::internal("failed to create competition")
        })?;

    Ok(Json(competition))
}

pub async fn delete_competition(
    admin: AdminUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = WorkspaceService::new(state.db.clone());
    let deleted = service.delete_competition(id).await.map_err(|err| {
        tracing::error!(error = ?err, competition_id = %id, admin_id = %admin.user_id, "failed to delete competition");
        AppError::internal("failed to delete competition")
    })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("competition not found"))
    }
}

#[derive(Deserialize)]
pub struct CreateInternshipRequest {
    pub title: String,
    pub company: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub stipend: Option<i64>,
    pub apply_url: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deadline: Option<OffsetDateTime>,
}

pub async fn create_internship(
    admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateInternshipRequest>,
) -> Result<Json<crate::domain::workspace::Internship>, AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title cannot be empty"));
    }
    if payload.company.trim().is_empty() {
        return Err(AppError::bad_request("company cannot be empty"));
    }

    let service = WorkspaceService::new(state.db.clone());
    let internship = service
        .create_internship(
            payload.title,
            payload.company,
            payload.description,
            payload.location,
            payload.stipend,
            payload.apply_url,
            payload.deadline,
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, admin_id = %admin.user_id, "failed to create internship");
            AppError::internal("failed to create internship")
        })?;

    Ok(Json(internship))
}

pub async fn delete_internship(
    admin: AdminUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = WorkspaceService::new(state.db.clone());
    let deleted = service.delete_internship(id).await.map_err(|err| {
        tracing::error!(error = ?err, internship_id = %id, admin_id = %admin.user_id, "failed to delete internship");
        AppError::internal("failed to delete internship")
    })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("internship not found"))
    }
}

pub async fn list_accounts(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<crate::domain::profile::Account>>, AppError> {
    let limit = page_limit(query.limit)?;

    let service = ProfileService::new(state.db.clone());
    let accounts = service.list_accounts(limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list accounts");
        AppError::internal("failed to list accounts")
    })?;

    Ok(Json(accounts))
}

#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub role: ProfileRole,
}

pub async fn update_account_role(
    admin: AdminUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<crate::domain::profile::Account>, AppError> {
    if id == admin.user_id {
        return Err(AppError::bad_request("cannot change your own role"));
    }

    let service = ProfileService::new(state.db.clone());
    let account = service.set_role(id, payload.role).await.map_err(|err| {
        tracing::error!(error = ?err, profile_id = %id, "failed to update role");
        AppError::internal("failed to update role")
    })?;

    match account {
        Some(account) => Ok(Json(account)),
        None => Err(AppError::not_found("account not found")),
    }
}

pub async fn remove_account(
    admin: AdminUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if id == admin.user_id {
        return Err(AppError::bad_request("use account deletion for your own account"));
    }

    let service = ProfileService::new(state.db.clone());
    let deleted = service.delete_account(id).await.map_err(|err| {
        tracing::error!(error = ?err, profile_id = %id, "failed to remove account");
        AppError::internal("failed to remove account")
    })?;

    if deleted {
        tracing::info!(profile_id = %id, admin_id = %admin.user_id, "account removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("account not found"))
    }
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub amount: i64,
    pub currency: String,
}

pub async fn create_payment_order(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<crate::infra::payments::GatewayOrder>, AppError> {
    if payload.amount <= 0 {
        return Err(AppError::bad_request("amount must be greater than 0"));
    }
    let currency = payload.currency.trim().to_ascii_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::bad_request("currency must be a 3-letter code"));
    }

    let created_by = auth.map(|user| user.user_id);
    let service = PaymentService::new(state.db.clone(), state.gateway.clone());
    let order = service
        .create_order(created_by, payload.amount, &currency)
        .await
        .map_err(|err| match err.downcast_ref::<GatewayError>() {
            Some(GatewayError::Api {
                status,
                description,
            }) => AppError::with_status(*status, description.clone()),
            Some(GatewayError::Network(_)) => {
                tracing::warn!(error = ?err, "payment provider unreachable");
                AppError::bad_gateway("payment provider unreachable")
            }
            None => {
                tracing::error!(error = ?err, "failed to create payment order");
                AppError::internal("failed to create payment order")
            }
        })?;

    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Serialize)]
pub struct VerifyPaymentResponse {
    pub verified: bool,
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    if payload.order_id.trim().is_empty()
        || payload.payment_id.trim().is_empty()
        || payload.signature.trim().is_empty()
    {
        return Err(AppError::bad_request(
            "order_id, payment_id and signature are required",
        ));
    }

    let service = PaymentService::new(state.db.clone(), state.gateway.clone());
    let outcome = service
        .verify_payment(&payload.order_id, &payload.payment_id, &payload.signature)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, order_id = %payload.order_id, "failed to verify payment");
            AppError::internal("failed to verify payment")
        })?;

    match outcome {
        VerifyOutcome::Verified => Ok(Json(VerifyPaymentResponse { verified: true })),
        VerifyOutcome::BadSignature => Err(AppError::bad_request("invalid payment signature")),
        VerifyOutcome::UnknownOrder => Err(AppError::not_found("order not found")),
    }
}

pub async fn get_payment_order(
    Path(order_id): Path<String>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::payment::PaymentOrder>, AppError> {
    let service = PaymentService::new(state.db.clone(), state.gateway.clone());
    let order = service.get_order(&order_id).await.map_err(|err| {
        tracing::error!(error = ?err, order_id = %order_id, "failed to fetch order");
        AppError::internal("failed to fetch order")
    })?;

    // Orders are visible to their creator only; anyone else gets the same
    // response as for an unknown id.
    match order {
        Some(order) if order.created_by == Some(auth.user_id) => Ok(Json(order)),
        _ => Err(AppError::not_found("order not found")),
    }
}

pub async fn top_donors(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<DonorTotal>>, AppError> {
    let limit = query.limit.unwrap_or(10);
    if !(1..=100).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 100"));
    }

    let service = PaymentService::new(state.db.clone(), state.gateway.clone());
    let donors = service.top_donors(limit).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list donors");
        AppError::internal("failed to list donors")
    })?;

    Ok(Json(donors))
}
