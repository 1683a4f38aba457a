use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Milestone;
use crate::tracking::store::MilestoneStatusChange;

pub async fn list_by_project(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<Milestone>, sqlx::Error> {
    sqlx::query_as::<_, Milestone>(
        "SELECT * FROM milestones WHERE project_id = $1 ORDER BY target_date, created_at",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn list_for_projects(
    pool: &PgPool,
    project_ids: &[Uuid],
) -> Result<Vec<Milestone>, sqlx::Error> {
    sqlx::query_as::<_, Milestone>(
        "SELECT * FROM milestones WHERE project_id = ANY($1) ORDER BY target_date, created_at",
    )
    .bind(project_ids)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Milestone>, sqlx::Error> {
    sqlx::query_as::<_, Milestone>("SELECT * FROM milestones WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(
    pool: &PgPool,
    project_id: Uuid,
    name: &str,
    description: &str,
    target_date: NaiveDate,
) -> Result<Milestone, sqlx::Error> {
    sqlx::query_as::<_, Milestone>(
        "INSERT INTO milestones (project_id, name, description, target_date)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(project_id)
    .bind(name)
    .bind(description)
    .bind(target_date)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    name: &str,
    description: &str,
    target_date: NaiveDate,
) -> Result<Milestone, sqlx::Error> {
    sqlx::query_as::<_, Milestone>(
        "UPDATE milestones SET name = $2, description = $3, target_date = $4, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(target_date)
    .fetch_one(pool)
    .await
}

pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    change: MilestoneStatusChange,
) -> Result<Milestone, sqlx::Error> {
    sqlx::query_as::<_, Milestone>(
        "UPDATE milestones SET status = $2, actual_start = $3, actual_completion = $4,
            updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(change.status)
    .bind(change.actual_start)
    .bind(change.actual_completion)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM milestones WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
