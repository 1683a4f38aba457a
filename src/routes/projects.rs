use axum::Json;
use axum::extract::{Path, State};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::projects::{NewProject, ProjectFields};
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{AuditEvent, Role};
use crate::state::SharedState;
use crate::tracking::{ProjectDetail, ProjectView, access};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProject {
    pub name: String,
    pub service_type: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
    pub start_date: NaiveDate,
    pub client_id: Uuid,
    pub foreman_id: Option<Uuid>,
}

/// Progress and status are derived, so they are not accepted here.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProject {
    pub name: String,
    pub service_type: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
    pub start_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
    pub client_id: Option<Uuid>,
    /// Absent keeps the current foreman, `null` unassigns.
    #[serde(default, deserialize_with = "present")]
    pub foreman_id: Option<Option<Uuid>>,
}

/// Maps a present field, `null` included, to `Some`.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<ProjectView>>, AppError> {
    let projects = state.reader.list_projects(&auth.identity()).await?;
    Ok(Json(projects))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectDetail>, AppError> {
    let detail = state.reader.get_project_detail(id, &auth.identity()).await?;
    Ok(Json(detail))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateProject>,
) -> Result<Json<ProjectView>, AppError> {
    auth.require_admin()?;
    validate_text_fields(&req.name, &req.service_type, &req.address)?;
    require_role(&state, req.client_id, Role::Pelanggan, "client").await?;
    if let Some(foreman_id) = req.foreman_id {
        require_role(&state, foreman_id, Role::Mandor, "foreman").await?;
    }

    let project = db::projects::create(
        &state.pool,
        &NewProject {
            name: req.name.trim(),
            service_type: req.service_type.trim(),
            description: req.description.trim(),
            address: req.address.trim(),
            start_date: req.start_date,
            client_id: req.client_id,
            foreman_id: req.foreman_id,
        },
    )
    .await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "project.created",
        "project",
        Some(project.id),
        None,
    )
    .await;

    let view = state.reader.get_project(project.id, &auth.identity()).await?;
    Ok(Json(view))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProject>,
) -> Result<Json<ProjectView>, AppError> {
    let identity = auth.identity();
    let project = state.reader.authorized_project(id, &identity).await?;
    access::require_project_editor(&project, &identity)?;
    validate_text_fields(&req.name, &req.service_type, &req.address)?;

    let client_id = req.client_id.unwrap_or(project.client_id);
    let foreman_id = req.foreman_id.unwrap_or(project.foreman_id);
    let reassigning = client_id != project.client_id || foreman_id != project.foreman_id;
    if reassigning {
        auth.require_admin()?;
        require_role(&state, client_id, Role::Pelanggan, "client").await?;
        if let Some(foreman_id) = foreman_id {
            require_role(&state, foreman_id, Role::Mandor, "foreman").await?;
        }
    }

    if let Some(done) = req.completion_date {
        if done < req.start_date {
            return Err(AppError::BadRequest(
                "Completion date cannot be before the start date".to_string(),
            ));
        }
    }

    let updated = db::projects::update(
        &state.pool,
        id,
        &ProjectFields {
            name: req.name.trim(),
            service_type: req.service_type.trim(),
            description: req.description.trim(),
            address: req.address.trim(),
            start_date: req.start_date,
            completion_date: req.completion_date,
            client_id,
            foreman_id,
        },
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::NotFound("Project not found".to_string()),
        _ => AppError::Database(e),
    })?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "project.updated",
        "project",
        Some(updated.id),
        reassigning.then(|| json!({ "client_id": client_id, "foreman_id": foreman_id })),
    )
    .await;

    let view = state.reader.get_project(updated.id, &identity).await?;
    Ok(Json(view))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    if !db::projects::delete(&state.pool, id).await? {
        return Err(AppError::NotFound("Project not found".to_string()));
    }

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "project.deleted",
        "project",
        Some(id),
        None,
    )
    .await;

    Ok(Json(json!({ "message": "Deleted" })))
}

pub async fn audit_log(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditEvent>>, AppError> {
    auth.require_admin()?;
    let events = db::audit::list_for_resource(&state.pool, "project", id).await?;
    Ok(Json(events))
}

fn validate_text_fields(name: &str, service_type: &str, address: &str) -> Result<(), AppError> {
    if name.trim().is_empty() || service_type.trim().is_empty() || address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Name, service type and address are required".to_string(),
        ));
    }
    if name.len() > 200 {
        return Err(AppError::BadRequest(
            "Name must be at most 200 characters".to_string(),
        ));
    }
    Ok(())
}

async fn require_role(
    state: &SharedState,
    user_id: Uuid,
    role: Role,
    what: &str,
) -> Result<(), AppError> {
    match db::users::find_by_id(&state.pool, user_id).await? {
        Some(user) if user.role == role => Ok(()),
        Some(_) => Err(AppError::BadRequest(format!(
            "The selected {what} must have the {} role",
            role.as_str()
        ))),
        None => Err(AppError::BadRequest(format!("The selected {what} does not exist"))),
    }
}
