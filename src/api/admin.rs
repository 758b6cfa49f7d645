/// Admin API Endpoints
use crate::{
    admin::{AdminLevel, Department, ModerationDecision},
    auth::AuthContext,
    context::AppContext,
    db::users::UserRecord,
    error::{KudosError, KudosResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

/// Build admin API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/admin/capabilities", get(get_capabilities))
        .route("/api/admin/users/:id/level", post(assign_level))
        .route("/api/admin/admins", get(list_admins))
        .route("/api/admin/departments", get(list_departments).post(create_department))
        .route("/api/admin/audit", get(list_audit_log))
}

/// Whether the caller has any moderation capability, and at what level
async fn get_capabilities(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> KudosResult<Json<ModerationDecision>> {
    let decision = ctx.authorizer.can_moderate(&auth.user_id, None).await?;
    Ok(Json(decision))
}

#[derive(Debug, Deserialize)]
struct AssignLevelRequest {
    level: String,
    scope: Option<String>,
}

async fn assign_level(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(user_id): Path<String>,
    Json(req): Json<AssignLevelRequest>,
) -> KudosResult<Json<UserRecord>> {
    let level = AdminLevel::parse_strict(&req.level)
        .ok_or_else(|| KudosError::Validation(format!("Invalid admin level: {}", req.level)))?;

    let user = ctx
        .admin_role_manager
        .assign_level(&auth.user_id, &user_id, level, req.scope.as_deref())
        .await?;

    Ok(Json(user))
}

async fn list_admins(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> KudosResult<Json<serde_json::Value>> {
    let admins = ctx.admin_role_manager.list_admins(&auth.user_id).await?;
    Ok(Json(json!({ "admins": admins })))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateDepartmentRequest {
    #[validate(length(min = 1, max = 253))]
    domain: String,
    #[validate(length(min = 1, max = 100))]
    name: String,
}

async fn create_department(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Json(req): Json<CreateDepartmentRequest>,
) -> KudosResult<(StatusCode, Json<Department>)> {
    req.validate()?;

    let department = ctx
        .org_manager
        .create_department(&auth.user_id, &req.domain, &req.name)
        .await?;

    Ok((StatusCode::CREATED, Json(department)))
}

#[derive(Debug, Deserialize)]
struct ListDepartmentsQuery {
    domain: String,
}

async fn list_departments(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    Query(query): Query<ListDepartmentsQuery>,
) -> KudosResult<Json<serde_json::Value>> {
    let departments = ctx.org_manager.list_departments(&query.domain).await?;
    Ok(Json(json!({ "departments": departments })))
}

#[derive(Debug, Deserialize)]
struct AuditLogQuery {
    #[serde(default = "default_audit_limit")]
    limit: i64,
}

fn default_audit_limit() -> i64 {
    50
}

async fn list_audit_log(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Query(query): Query<AuditLogQuery>,
) -> KudosResult<Json<serde_json::Value>> {
    let entries = ctx
        .admin_role_manager
        .list_audit_log(&auth.user_id, query.limit)
        .await?;
    Ok(Json(json!({ "entries": entries })))
}
