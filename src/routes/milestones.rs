use axum::Json;
use axum::extract::{Path, State};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{Milestone, MilestoneStatus, Project};
use crate::state::SharedState;
use crate::tracking::{Identity, access, milestones};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MilestoneInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub target_date: NaiveDate,
}

#[derive(Deserialize)]
pub struct SetStatus {
    pub status: MilestoneStatus,
}

pub async fn list_by_project(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Milestone>>, AppError> {
    let project = state.reader.authorized_project(project_id, &auth.identity()).await?;
    let milestones = state.store.list_milestones(project.id).await?;
    Ok(Json(milestones))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(project_id): Path<Uuid>,
    Json(req): Json<MilestoneInput>,
) -> Result<Json<Milestone>, AppError> {
    let identity = auth.identity();
    let project = state.reader.authorized_project(project_id, &identity).await?;
    access::require_assigned_foreman(&project, &identity)?;
    validate(&req)?;

    let milestone = db::milestones::create(
        &state.pool,
        project.id,
        req.name.trim(),
        req.description.trim(),
        req.target_date,
    )
    .await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "milestone.created",
        "project",
        Some(project.id),
        Some(json!({ "milestone_id": milestone.id })),
    )
    .await;

    Ok(Json(milestone))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MilestoneInput>,
) -> Result<Json<Milestone>, AppError> {
    let identity = auth.identity();
    let (milestone, project) = load_for_foreman(&state, id, &identity).await?;
    validate(&req)?;

    let updated = db::milestones::update(
        &state.pool,
        milestone.id,
        req.name.trim(),
        req.description.trim(),
        req.target_date,
    )
    .await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "milestone.updated",
        "project",
        Some(project.id),
        Some(json!({ "milestone_id": updated.id })),
    )
    .await;

    Ok(Json(updated))
}

pub async fn set_status(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStatus>,
) -> Result<Json<Milestone>, AppError> {
    let updated =
        milestones::set_milestone_status(state.store.as_ref(), id, req.status, &auth.identity())
            .await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "milestone.status_changed",
        "project",
        Some(updated.project_id),
        Some(json!({ "milestone_id": updated.id, "status": updated.status.as_str() })),
    )
    .await;

    Ok(Json(updated))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let identity = auth.identity();
    let (milestone, project) = load_for_foreman(&state, id, &identity).await?;

    db::milestones::delete(&state.pool, milestone.id).await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "milestone.deleted",
        "project",
        Some(project.id),
        Some(json!({ "milestone_id": milestone.id })),
    )
    .await;

    Ok(Json(json!({ "message": "Deleted" })))
}

async fn load_for_foreman(
    state: &SharedState,
    id: Uuid,
    identity: &Identity,
) -> Result<(Milestone, Project), AppError> {
    let milestone = state
        .store
        .find_milestone(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Milestone not found".to_string()))?;
    let project = state
        .store
        .find_project(milestone.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    access::require_assigned_foreman(&project, identity)?;
    Ok((milestone, project))
}

fn validate(req: &MilestoneInput) -> Result<(), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Milestone name is required".to_string()));
    }
    if req.name.len() > 200 {
        return Err(AppError::BadRequest(
            "Milestone name must be at most 200 characters".to_string(),
        ));
    }
    Ok(())
}
