use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Contact, Milestone, MilestoneStatus, Project, ProjectStatus};
use crate::tracking::access::ProjectScope;

/// The cached progress columns of a project row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredProgress {
    pub progress: i32,
    pub status: ProjectStatus,
}

impl StoredProgress {
    pub fn of(project: &Project) -> Self {
        Self {
            progress: project.progress,
            status: project.status,
        }
    }
}

/// New values for a milestone status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneStatusChange {
    pub status: MilestoneStatus,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_completion: Option<DateTime<Utc>>,
}

/// Data access needed by the reconciling read path and milestone status updates.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, sqlx::Error>;

    async fn list_projects(&self, scope: ProjectScope) -> Result<Vec<Project>, sqlx::Error>;

    async fn list_milestones(&self, project_id: Uuid) -> Result<Vec<Milestone>, sqlx::Error>;

    /// Milestones of several projects in one round trip, in no particular order.
    async fn list_milestones_for(&self, project_ids: &[Uuid])
    -> Result<Vec<Milestone>, sqlx::Error>;

    async fn find_contacts(&self, user_ids: &[Uuid]) -> Result<Vec<Contact>, sqlx::Error>;

    async fn find_milestone(&self, id: Uuid) -> Result<Option<Milestone>, sqlx::Error>;

    async fn set_milestone_status(
        &self,
        id: Uuid,
        change: MilestoneStatusChange,
    ) -> Result<Milestone, sqlx::Error>;

    /// Overwrite the cached progress only if the row still holds `expected`.
    /// Returns whether a row was updated.
    async fn heal_progress(
        &self,
        project_id: Uuid,
        expected: StoredProgress,
        healed: StoredProgress,
    ) -> Result<bool, sqlx::Error>;
}
