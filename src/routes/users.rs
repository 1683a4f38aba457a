use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::password::{self, MIN_PASSWORD_LEN};
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{Role, User};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    auth.require_admin()?;
    let users = db::users::list_all(&state.pool, query.role).await?;
    Ok(Json(users))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateUser>,
) -> Result<Json<User>, AppError> {
    auth.require_admin()?;

    let email = req.email.trim();
    let name = req.name.trim();
    if email.is_empty() || name.is_empty() {
        return Err(AppError::BadRequest("Email and name are required".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;
    let phone = req.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

    let user = db::users::create(&state.pool, email, &pw_hash, name, phone, req.role)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("A user with this email already exists".to_string())
            }
            _ => AppError::Database(e),
        })?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "user.created",
        "user",
        Some(user.id),
        Some(json!({ "role": user.role.as_str() })),
    )
    .await;

    Ok(Json(user))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    if id == auth.user_id {
        return Err(AppError::BadRequest("You cannot delete your own account".to_string()));
    }

    let deleted = db::users::delete(&state.pool, id).await.map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            AppError::Conflict("User still owns projects".to_string())
        }
        _ => AppError::Database(e),
    })?;
    if !deleted {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    audit::log_event(&state.pool, Some(auth.user_id), "user.deleted", "user", Some(id), None).await;

    Ok(Json(json!({ "message": "Deleted" })))
}
