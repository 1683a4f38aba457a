//! Reconciling read path for projects.
//!
//! Every project handed to a caller carries the milestone-derived progress and
//! status, whatever the stored columns say. A disagreement is logged and, when
//! self-heal is switched on, written back in the background with a
//! compare-and-set update.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::SelfHealMode;
use crate::error::AppError;
use crate::models::{Contact, Milestone, Project, ProjectStatus};
use crate::tracking::access::{self, Identity, ProjectScope};
use crate::tracking::progress::{self, ProgressOutcome};
use crate::tracking::store::{ProjectStore, StoredProgress};

/// How the stored progress compared with the derived one on this read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressCheck {
    Consistent,
    /// No active milestones, the stored values were used as-is.
    Fallback,
    Mismatch { stored: StoredProgress },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactView {
    pub id: Option<Uuid>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ContactView {
    pub const UNASSIGNED: &'static str = "Unassigned";

    pub fn unassigned() -> Self {
        Self {
            id: None,
            name: Self::UNASSIGNED.to_string(),
            phone: None,
            email: None,
        }
    }
}

impl From<&Contact> for ContactView {
    fn from(contact: &Contact) -> Self {
        Self {
            id: Some(contact.id),
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            email: Some(contact.email.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectView {
    pub id: Uuid,
    pub name: String,
    pub service_type: String,
    pub description: String,
    pub address: String,
    pub status: ProjectStatus,
    pub progress: i32,
    pub start_date: NaiveDate,
    pub completion_date: Option<NaiveDate>,
    pub client: ContactView,
    pub foreman: ContactView,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    #[serde(skip)]
    pub check: ProgressCheck,
}

/// A project together with the milestones its progress was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: ProjectView,
    pub milestones: Vec<Milestone>,
}

#[derive(Clone)]
pub struct ProjectReader {
    store: Arc<dyn ProjectStore>,
    self_heal: SelfHealMode,
}

impl ProjectReader {
    pub fn new(store: Arc<dyn ProjectStore>, self_heal: SelfHealMode) -> Self {
        Self { store, self_heal }
    }

    pub async fn get_project(&self, id: Uuid, identity: &Identity) -> Result<ProjectView, AppError> {
        Ok(self.get_project_detail(id, identity).await?.project)
    }

    pub async fn get_project_detail(
        &self,
        id: Uuid,
        identity: &Identity,
    ) -> Result<ProjectDetail, AppError> {
        let project = self.authorized_project(id, identity).await?;
        let milestones = self.store.list_milestones(project.id).await?;
        let contacts = self.contacts_for(std::slice::from_ref(&project)).await?;

        let view = self.reconcile(project, &milestones, &contacts);
        Ok(ProjectDetail {
            project: view,
            milestones,
        })
    }

    pub async fn list_projects(&self, identity: &Identity) -> Result<Vec<ProjectView>, AppError> {
        let scope = ProjectScope::for_identity(identity);
        let projects: Vec<Project> = self
            .store
            .list_projects(scope)
            .await?
            .into_iter()
            .filter(|p| scope.contains(p))
            .collect();

        if projects.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
        let mut by_project: HashMap<Uuid, Vec<Milestone>> = HashMap::new();
        for milestone in self.store.list_milestones_for(&ids).await? {
            by_project
                .entry(milestone.project_id)
                .or_default()
                .push(milestone);
        }

        let contacts = self.contacts_for(&projects).await?;

        Ok(projects
            .into_iter()
            .map(|project| {
                let milestones = by_project.remove(&project.id).unwrap_or_default();
                self.reconcile(project, &milestones, &contacts)
            })
            .collect())
    }

    /// Load a project and check the identity may see it. Missing projects are
    /// reported before authorization.
    pub async fn authorized_project(&self, id: Uuid, identity: &Identity) -> Result<Project, AppError> {
        let project = self
            .store
            .find_project(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
        access::require_view(&project, identity)?;
        Ok(project)
    }

    async fn contacts_for(&self, projects: &[Project]) -> Result<HashMap<Uuid, Contact>, AppError> {
        let mut ids: Vec<Uuid> = projects
            .iter()
            .flat_map(|p| std::iter::once(p.client_id).chain(p.foreman_id))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let contacts = self.store.find_contacts(&ids).await?;
        Ok(contacts.into_iter().map(|c| (c.id, c)).collect())
    }

    fn reconcile(
        &self,
        project: Project,
        milestones: &[Milestone],
        contacts: &HashMap<Uuid, Contact>,
    ) -> ProjectView {
        let stored = StoredProgress::of(&project);
        let outcome = progress::compute_progress(milestones, stored.progress, stored.status);

        let check = if outcome.is_fallback() {
            tracing::debug!(
                "Project {} has no active milestones, keeping stored progress {}% ({:?})",
                project.id,
                stored.progress,
                stored.status
            );
            ProgressCheck::Fallback
        } else if outcome.progress == stored.progress && outcome.status == stored.status {
            ProgressCheck::Consistent
        } else {
            tracing::warn!(
                "Stored progress of project {} is stale: stored {}% ({:?}), computed {}% ({:?})",
                project.id,
                stored.progress,
                stored.status,
                outcome.progress,
                outcome.status
            );
            self.schedule_heal(project.id, stored, &outcome);
            ProgressCheck::Mismatch { stored }
        };

        let contact = |id: Option<Uuid>| {
            id.and_then(|id| contacts.get(&id))
                .map(ContactView::from)
                .unwrap_or_else(ContactView::unassigned)
        };

        ProjectView {
            id: project.id,
            client: contact(Some(project.client_id)),
            foreman: contact(project.foreman_id),
            name: project.name,
            service_type: project.service_type,
            description: project.description,
            address: project.address,
            status: outcome.status,
            progress: outcome.progress,
            start_date: project.start_date,
            completion_date: project.completion_date,
            created_at: project.created_at,
            updated_at: project.updated_at,
            last_update: project.last_update,
            check,
        }
    }

    /// Fire-and-forget write-back. Never affects the read that triggered it.
    fn schedule_heal(&self, project_id: Uuid, expected: StoredProgress, outcome: &ProgressOutcome) {
        if self.self_heal != SelfHealMode::CompareAndSet {
            return;
        }

        let store = Arc::clone(&self.store);
        let healed = StoredProgress {
            progress: outcome.progress,
            status: outcome.status,
        };

        tokio::spawn(async move {
            match store.heal_progress(project_id, expected, healed).await {
                Ok(true) => tracing::debug!(
                    "Healed stored progress of project {project_id} to {}% ({:?})",
                    healed.progress,
                    healed.status
                ),
                Ok(false) => tracing::debug!(
                    "Skipped healing project {project_id}: row changed since it was read"
                ),
                Err(e) => {
                    tracing::error!("Failed to heal stored progress of project {project_id}: {e}")
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::models::{MilestoneStatus, Role};
    use crate::tracking::memory::{MemoryStore, contact, milestone, sample_project};

    struct Fixture {
        store: Arc<MemoryStore>,
        client: Uuid,
        foreman: Uuid,
    }

    impl Fixture {
        fn new() -> Self {
            let client = Uuid::now_v7();
            let foreman = Uuid::now_v7();
            let store = Arc::new(MemoryStore::default());
            store.add_contact(contact(client, "Budi"));
            store.add_contact(contact(foreman, "Sari"));
            Self {
                store,
                client,
                foreman,
            }
        }

        fn reader(&self, mode: SelfHealMode) -> ProjectReader {
            ProjectReader::new(self.store.clone(), mode)
        }

        fn project(&self, progress: i32, status: ProjectStatus, statuses: &[MilestoneStatus]) -> Uuid {
            let mut project = sample_project(self.client, Some(self.foreman));
            project.progress = progress;
            project.status = status;
            let id = project.id;
            self.store.add_project(project);
            for status in statuses {
                self.store.add_milestone(milestone(id, *status));
            }
            id
        }

        fn admin(&self) -> Identity {
            Identity::new(Uuid::now_v7(), Role::Admin)
        }

        fn client(&self) -> Identity {
            Identity::new(self.client, Role::Pelanggan)
        }

        fn foreman(&self) -> Identity {
            Identity::new(self.foreman, Role::Mandor)
        }
    }

    async fn wait_for_heal_attempts(store: &MemoryStore, n: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while store.heal_attempts.load(Ordering::SeqCst) < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("heal was not attempted");
    }

    #[tokio::test]
    async fn stale_row_is_replaced_by_derived_values() {
        use MilestoneStatus::*;
        let fx = Fixture::new();
        let id = fx.project(10, ProjectStatus::Planning, &[Completed, Completed, InProgress]);

        let view = fx.reader(SelfHealMode::Off).get_project(id, &fx.client()).await.unwrap();

        assert_eq!(view.progress, 67);
        assert_eq!(view.status, ProjectStatus::InProgress);
        assert_eq!(
            view.check,
            ProgressCheck::Mismatch {
                stored: StoredProgress {
                    progress: 10,
                    status: ProjectStatus::Planning
                }
            }
        );
    }

    #[tokio::test]
    async fn consistent_row_reports_no_mismatch() {
        use MilestoneStatus::*;
        let fx = Fixture::new();
        let id = fx.project(100, ProjectStatus::Completed, &[Completed, Completed]);

        let view = fx.reader(SelfHealMode::Off).get_project(id, &fx.client()).await.unwrap();

        assert_eq!(view.progress, 100);
        assert_eq!(view.status, ProjectStatus::Completed);
        assert_eq!(view.check, ProgressCheck::Consistent);
    }

    #[tokio::test]
    async fn project_without_milestones_falls_back() {
        let fx = Fixture::new();
        let id = fx.project(42, ProjectStatus::Planning, &[]);

        let view = fx.reader(SelfHealMode::CompareAndSet).get_project(id, &fx.admin()).await.unwrap();

        assert_eq!(view.progress, 42);
        assert_eq!(view.status, ProjectStatus::Planning);
        assert_eq!(view.check, ProgressCheck::Fallback);

        tokio::task::yield_now().await;
        assert_eq!(fx.store.heal_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        use MilestoneStatus::*;
        let fx = Fixture::new();
        let id = fx.project(0, ProjectStatus::Planning, &[Completed, NotStarted, Cancelled]);
        let reader = fx.reader(SelfHealMode::Off);

        let first = reader.get_project_detail(id, &fx.foreman()).await.unwrap();
        let second = reader.get_project_detail(id, &fx.foreman()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.project.progress, 50);
        assert_eq!(first.milestones.len(), 3);
    }

    #[tokio::test]
    async fn authorization_follows_role() {
        let fx = Fixture::new();
        let id = fx.project(0, ProjectStatus::Planning, &[]);
        let reader = fx.reader(SelfHealMode::Off);

        let stranger_client = Identity::new(Uuid::now_v7(), Role::Pelanggan);
        let stranger_foreman = Identity::new(Uuid::now_v7(), Role::Mandor);

        assert!(matches!(
            reader.get_project(id, &stranger_client).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            reader.get_project(id, &stranger_foreman).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(reader.get_project(id, &fx.admin()).await.is_ok());
        assert!(reader.get_project(id, &fx.client()).await.is_ok());
        assert!(reader.get_project(id, &fx.foreman()).await.is_ok());
    }

    #[tokio::test]
    async fn missing_project_is_not_found() {
        let fx = Fixture::new();
        let result = fx
            .reader(SelfHealMode::Off)
            .get_project(Uuid::now_v7(), &fx.admin())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn contacts_are_projected_and_unassigned_foreman_is_a_placeholder() {
        let fx = Fixture::new();
        let project = sample_project(fx.client, None);
        let id = project.id;
        fx.store.add_project(project);

        let view = fx.reader(SelfHealMode::Off).get_project(id, &fx.client()).await.unwrap();

        assert_eq!(view.client.id, Some(fx.client));
        assert_eq!(view.client.name, "Budi");
        assert_eq!(view.foreman, ContactView::unassigned());
    }

    #[tokio::test]
    async fn list_is_scoped_and_reconciled_per_project() {
        use MilestoneStatus::*;
        let fx = Fixture::new();
        let a = fx.project(0, ProjectStatus::Planning, &[Completed, NotStarted]);
        let b = fx.project(0, ProjectStatus::Planning, &[Completed, Completed, Completed, InProgress]);

        let other_client = Uuid::now_v7();
        fx.store.add_project(sample_project(other_client, None));

        let reader = fx.reader(SelfHealMode::Off);

        let mine = reader.list_projects(&fx.client()).await.unwrap();
        assert_eq!(mine.len(), 2);
        let progress_of = |id| mine.iter().find(|v| v.id == id).map(|v| v.progress);
        assert_eq!(progress_of(a), Some(50));
        assert_eq!(progress_of(b), Some(75));

        assert_eq!(reader.list_projects(&fx.foreman()).await.unwrap().len(), 2);
        assert_eq!(reader.list_projects(&fx.admin()).await.unwrap().len(), 3);

        let nobody = Identity::new(Uuid::now_v7(), Role::Mandor);
        assert!(reader.list_projects(&nobody).await.unwrap().is_empty());

        // one batched milestone fetch per listing
        assert_eq!(fx.store.batch_fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn self_heal_off_never_writes() {
        use MilestoneStatus::*;
        let fx = Fixture::new();
        let id = fx.project(10, ProjectStatus::Planning, &[Completed]);

        fx.reader(SelfHealMode::Off).get_project(id, &fx.admin()).await.unwrap();
        tokio::task::yield_now().await;

        assert_eq!(fx.store.heal_attempts.load(Ordering::SeqCst), 0);
        assert_eq!(fx.store.stored_progress(id), Some(StoredProgress {
            progress: 10,
            status: ProjectStatus::Planning,
        }));
    }

    #[tokio::test]
    async fn self_heal_writes_back_derived_values() {
        use MilestoneStatus::*;
        let fx = Fixture::new();
        let id = fx.project(10, ProjectStatus::Planning, &[Completed, Completed, InProgress]);

        fx.reader(SelfHealMode::CompareAndSet)
            .get_project(id, &fx.admin())
            .await
            .unwrap();
        wait_for_heal_attempts(&fx.store, 1).await;

        assert_eq!(fx.store.stored_progress(id), Some(StoredProgress {
            progress: 67,
            status: ProjectStatus::InProgress,
        }));

        let again = fx.reader(SelfHealMode::CompareAndSet).get_project(id, &fx.admin()).await.unwrap();
        assert_eq!(again.check, ProgressCheck::Consistent);
    }

    #[tokio::test]
    async fn self_heal_skips_rows_changed_since_the_read() {
        use MilestoneStatus::*;
        let fx = Fixture::new();
        let id = fx.project(10, ProjectStatus::Planning, &[Completed]);
        let reader = fx.reader(SelfHealMode::CompareAndSet);

        let project = fx.store.find_project(id).await.unwrap().unwrap();
        fx.store.set_stored_progress(id, StoredProgress {
            progress: 55,
            status: ProjectStatus::InProgress,
        });

        let outcome = progress::compute_progress(&[milestone(id, Completed)], 10, ProjectStatus::Planning);
        reader.schedule_heal(id, StoredProgress::of(&project), &outcome);
        wait_for_heal_attempts(&fx.store, 1).await;

        assert_eq!(fx.store.stored_progress(id), Some(StoredProgress {
            progress: 55,
            status: ProjectStatus::InProgress,
        }));
    }

    #[tokio::test]
    async fn failed_write_back_does_not_fail_the_read() {
        use MilestoneStatus::*;
        let fx = Fixture::new();
        let id = fx.project(0, ProjectStatus::Planning, &[Completed]);
        fx.store.fail_heal.store(true, Ordering::SeqCst);

        let view = fx
            .reader(SelfHealMode::CompareAndSet)
            .get_project(id, &fx.client())
            .await
            .unwrap();
        wait_for_heal_attempts(&fx.store, 1).await;

        assert_eq!(view.progress, 100);
        assert_eq!(view.status, ProjectStatus::Completed);
    }
}
