use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Project;
use crate::tracking::{ProjectScope, StoredProgress};

pub struct NewProject<'a> {
    pub name: &'a str,
    pub service_type: &'a str,
    pub description: &'a str,
    pub address: &'a str,
    pub start_date: NaiveDate,
    pub client_id: Uuid,
    pub foreman_id: Option<Uuid>,
}

/// Direct, non-derived project fields.
pub struct ProjectFields<'a> {
    pub name: &'a str,
    pub service_type: &'a str,
    pub description: &'a str,
    pub address: &'a str,
    pub start_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
    pub client_id: Uuid,
    pub foreman_id: Option<Uuid>,
}

pub async fn list(pool: &PgPool, scope: ProjectScope) -> Result<Vec<Project>, sqlx::Error> {
    match scope {
        ProjectScope::All => {
            sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY created_at DESC")
                .fetch_all(pool)
                .await
        }
        ProjectScope::OwnedBy(client_id) => {
            sqlx::query_as::<_, Project>(
                "SELECT * FROM projects WHERE client_id = $1 ORDER BY created_at DESC",
            )
            .bind(client_id)
            .fetch_all(pool)
            .await
        }
        ProjectScope::AssignedTo(foreman_id) => {
            sqlx::query_as::<_, Project>(
                "SELECT * FROM projects WHERE foreman_id = $1 ORDER BY created_at DESC",
            )
            .bind(foreman_id)
            .fetch_all(pool)
            .await
        }
    }
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(pool: &PgPool, new: &NewProject<'_>) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "INSERT INTO projects
            (name, service_type, description, address, start_date, client_id, foreman_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(new.name)
    .bind(new.service_type)
    .bind(new.description)
    .bind(new.address)
    .bind(new.start_date)
    .bind(new.client_id)
    .bind(new.foreman_id)
    .fetch_one(pool)
    .await
}

/// Never touches `progress` or `status`.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    fields: &ProjectFields<'_>,
) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "UPDATE projects SET name = $2, service_type = $3, description = $4, address = $5,
            start_date = $6, completion_date = $7, client_id = $8, foreman_id = $9,
            updated_at = now(), last_update = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(fields.name)
    .bind(fields.service_type)
    .bind(fields.description)
    .bind(fields.address)
    .bind(fields.start_date)
    .bind(fields.completion_date)
    .bind(fields.client_id)
    .bind(fields.foreman_id)
    .fetch_one(pool)
    .await
}

/// Compare-and-set write of the cached progress columns.
pub async fn heal_progress(
    pool: &PgPool,
    id: Uuid,
    expected: StoredProgress,
    healed: StoredProgress,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE projects SET progress = $4, status = $5, last_update = now()
         WHERE id = $1 AND progress = $2 AND status = $3",
    )
    .bind(id)
    .bind(expected.progress)
    .bind(expected.status)
    .bind(healed.progress)
    .bind(healed.status)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
