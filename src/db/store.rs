use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::{Contact, Milestone, Project};
use crate::tracking::ProjectScope;
use crate::tracking::store::{MilestoneStatusChange, ProjectStore, StoredProgress};

/// Postgres-backed [`ProjectStore`].
#[derive(Clone)]
pub struct PgProjectStore {
    pool: PgPool,
}

impl PgProjectStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
        db::projects::find_by_id(&self.pool, id).await
    }

    async fn list_projects(&self, scope: ProjectScope) -> Result<Vec<Project>, sqlx::Error> {
        db::projects::list(&self.pool, scope).await
    }

    async fn list_milestones(&self, project_id: Uuid) -> Result<Vec<Milestone>, sqlx::Error> {
        db::milestones::list_by_project(&self.pool, project_id).await
    }

    async fn list_milestones_for(
        &self,
        project_ids: &[Uuid],
    ) -> Result<Vec<Milestone>, sqlx::Error> {
        db::milestones::list_for_projects(&self.pool, project_ids).await
    }

    async fn find_contacts(&self, user_ids: &[Uuid]) -> Result<Vec<Contact>, sqlx::Error> {
        db::users::find_contacts(&self.pool, user_ids).await
    }

    async fn find_milestone(&self, id: Uuid) -> Result<Option<Milestone>, sqlx::Error> {
        db::milestones::find_by_id(&self.pool, id).await
    }

    async fn set_milestone_status(
        &self,
        id: Uuid,
        change: MilestoneStatusChange,
    ) -> Result<Milestone, sqlx::Error> {
        db::milestones::set_status(&self.pool, id, change).await
    }

    async fn heal_progress(
        &self,
        project_id: Uuid,
        expected: StoredProgress,
        healed: StoredProgress,
    ) -> Result<bool, sqlx::Error> {
        db::projects::heal_progress(&self.pool, project_id, expected, healed).await
    }
}
