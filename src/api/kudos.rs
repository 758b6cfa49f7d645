/// Kudos feed and moderation endpoints
use crate::{
    admin::{
        build_visibility_predicate, Actor, AdminProfile, DeletionReport, ModerationRecord,
        RequestedView,
    },
    auth::AuthContext,
    context::AppContext,
    error::{KudosError, KudosResult},
    kudos::{FeedCursor, FeedPage, Kudos},
    media::MediaRef,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

/// Build kudos routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/kudos", get(list_feed).post(create_kudos))
        .route("/api/kudos/:id", axum::routing::delete(delete_kudos))
        .route("/api/kudos/:id/hide", post(hide_kudos))
        .route("/api/kudos/:id/unhide", post(unhide_kudos))
}

#[derive(Debug, Deserialize)]
struct FeedQuery {
    /// site | domain | department
    scope: Option<String>,
    limit: Option<i64>,
    before: Option<String>,
}

/// List the feed with the viewer's visibility applied
async fn list_feed(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<FeedQuery>,
) -> KudosResult<Json<FeedPage>> {
    // A token for a user without a row still sees the public feed
    let viewer = ctx
        .authorizer
        .resolver()
        .actor(&auth.user_id)
        .await?
        .unwrap_or_else(|| Actor {
            id: auth.user_id.clone(),
            profile: AdminProfile::user(),
            domain: None,
            department_id: None,
        });

    let before = query.before.as_deref().map(FeedCursor::parse).transpose()?;

    let filter = build_visibility_predicate(&viewer, RequestedView::parse(query.scope.as_deref()));
    let page = ctx
        .kudos_store
        .list_feed(&viewer, &filter, query.limit, before.as_ref())
        .await?;

    Ok(Json(page))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateKudosRequest {
    #[validate(length(min = 1, max = 2000))]
    message: String,
    recipient_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10))]
    media: Vec<MediaRef>,
}

/// Post a kudos
async fn create_kudos(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<CreateKudosRequest>,
) -> KudosResult<(StatusCode, Json<Kudos>)> {
    req.validate()?;
    if req.message.trim().is_empty() {
        return Err(KudosError::Validation("Message cannot be blank".to_string()));
    }

    if let Some(recipient_id) = &req.recipient_id {
        if ctx.users.get(recipient_id).await?.is_none() {
            return Err(KudosError::Validation(format!("Unknown recipient: {}", recipient_id)));
        }
    }

    for item in &req.media {
        if !ctx.media.exists(&item.key).await? {
            return Err(KudosError::Validation(format!("Unknown media: {}", item.key)));
        }
    }

    let kudos = ctx
        .kudos_store
        .create(&auth.user_id, req.recipient_id.as_deref(), &req.message, req.media)
        .await?;

    Ok((StatusCode::CREATED, Json(kudos)))
}

async fn hide_kudos(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> KudosResult<Json<ModerationRecord>> {
    let record = ctx.moderation_manager.hide(&auth.user_id, &id).await?;
    Ok(Json(record))
}

async fn unhide_kudos(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> KudosResult<Json<ModerationRecord>> {
    let record = ctx.moderation_manager.unhide(&auth.user_id, &id).await?;
    Ok(Json(record))
}

/// Delete a kudos; media cleanup failures are reported, not fatal
async fn delete_kudos(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> KudosResult<Json<DeletionReport>> {
    let report = ctx.moderation_manager.delete(&auth.user_id, &id).await?;
    Ok(Json(report))
}
