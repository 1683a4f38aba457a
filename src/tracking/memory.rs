//! In-memory `ProjectStore` for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{Contact, Milestone, MilestoneStatus, Project, ProjectStatus};
use crate::tracking::access::ProjectScope;
use crate::tracking::store::{MilestoneStatusChange, ProjectStore, StoredProgress};

#[derive(Default)]
pub struct MemoryStore {
    projects: Mutex<Vec<Project>>,
    milestones: Mutex<Vec<Milestone>>,
    contacts: Mutex<Vec<Contact>>,
    pub fail_heal: AtomicBool,
    pub heal_attempts: AtomicUsize,
    pub batch_fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn add_project(&self, project: Project) {
        self.projects.lock().unwrap().push(project);
    }

    pub fn add_milestone(&self, milestone: Milestone) {
        self.milestones.lock().unwrap().push(milestone);
    }

    pub fn add_contact(&self, contact: Contact) {
        self.contacts.lock().unwrap().push(contact);
    }

    pub fn stored_progress(&self, project_id: Uuid) -> Option<StoredProgress> {
        self.projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == project_id)
            .map(StoredProgress::of)
    }

    pub fn set_stored_progress(&self, project_id: Uuid, stored: StoredProgress) {
        let mut projects = self.projects.lock().unwrap();
        if let Some(p) = projects.iter_mut().find(|p| p.id == project_id) {
            p.progress = stored.progress;
            p.status = stored.status;
        }
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
        Ok(self.projects.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn list_projects(&self, scope: ProjectScope) -> Result<Vec<Project>, sqlx::Error> {
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| scope.contains(p))
            .cloned()
            .collect())
    }

    async fn list_milestones(&self, project_id: Uuid) -> Result<Vec<Milestone>, sqlx::Error> {
        Ok(self
            .milestones
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_milestones_for(
        &self,
        project_ids: &[Uuid],
    ) -> Result<Vec<Milestone>, sqlx::Error> {
        self.batch_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .milestones
            .lock()
            .unwrap()
            .iter()
            .filter(|m| project_ids.contains(&m.project_id))
            .cloned()
            .collect())
    }

    async fn find_contacts(&self, user_ids: &[Uuid]) -> Result<Vec<Contact>, sqlx::Error> {
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| user_ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn find_milestone(&self, id: Uuid) -> Result<Option<Milestone>, sqlx::Error> {
        Ok(self.milestones.lock().unwrap().iter().find(|m| m.id == id).cloned())
    }

    async fn set_milestone_status(
        &self,
        id: Uuid,
        change: MilestoneStatusChange,
    ) -> Result<Milestone, sqlx::Error> {
        let mut milestones = self.milestones.lock().unwrap();
        let milestone = milestones
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(sqlx::Error::RowNotFound)?;
        milestone.status = change.status;
        milestone.actual_start = change.actual_start;
        milestone.actual_completion = change.actual_completion;
        milestone.updated_at = Utc::now();
        Ok(milestone.clone())
    }

    async fn heal_progress(
        &self,
        project_id: Uuid,
        expected: StoredProgress,
        healed: StoredProgress,
    ) -> Result<bool, sqlx::Error> {
        self.heal_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_heal.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }

        let mut projects = self.projects.lock().unwrap();
        match projects
            .iter_mut()
            .find(|p| p.id == project_id && StoredProgress::of(p) == expected)
        {
            Some(p) => {
                p.progress = healed.progress;
                p.status = healed.status;
                p.last_update = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

pub fn sample_project(client_id: Uuid, foreman_id: Option<Uuid>) -> Project {
    let now = Utc::now();
    Project {
        id: Uuid::now_v7(),
        name: "Renovasi Dapur".to_string(),
        service_type: "kitchen".to_string(),
        description: String::new(),
        address: "Jl. Merdeka 1".to_string(),
        status: ProjectStatus::Planning,
        progress: 0,
        start_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        completion_date: None,
        client_id,
        foreman_id,
        created_at: now,
        updated_at: now,
        last_update: now,
    }
}

pub fn milestone(project_id: Uuid, status: MilestoneStatus) -> Milestone {
    let now = Utc::now();
    Milestone {
        id: Uuid::now_v7(),
        project_id,
        name: "Pemasangan keramik".to_string(),
        description: String::new(),
        status,
        target_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        actual_start: None,
        actual_completion: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn contact(id: Uuid, name: &str) -> Contact {
    Contact {
        id,
        name: name.to_string(),
        phone: Some("08123456789".to_string()),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}
