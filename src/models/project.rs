use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    Completed,
    Cancelled,
}

/// A project row as stored. `status` and `progress` are a cache of the
/// milestone-derived values and may be stale.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub service_type: String,
    pub description: String,
    pub address: String,
    pub status: ProjectStatus,
    pub progress: i32,
    pub start_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
    pub client_id: Uuid,
    pub foreman_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}
