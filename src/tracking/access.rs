use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Project, Role};

/// The requesting actor, passed explicitly into every tracking call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Which projects a listing may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectScope {
    All,
    OwnedBy(Uuid),
    AssignedTo(Uuid),
}

impl ProjectScope {
    pub fn for_identity(identity: &Identity) -> Self {
        match identity.role {
            Role::Admin => ProjectScope::All,
            Role::Mandor => ProjectScope::AssignedTo(identity.user_id),
            Role::Pelanggan => ProjectScope::OwnedBy(identity.user_id),
        }
    }

    pub fn contains(&self, project: &Project) -> bool {
        match *self {
            ProjectScope::All => true,
            ProjectScope::OwnedBy(client) => project.client_id == client,
            ProjectScope::AssignedTo(foreman) => project.foreman_id == Some(foreman),
        }
    }
}

pub fn can_view(project: &Project, identity: &Identity) -> bool {
    ProjectScope::for_identity(identity).contains(project)
}

pub fn require_view(project: &Project, identity: &Identity) -> Result<(), AppError> {
    if can_view(project, identity) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You are not authorized to access this project".to_string(),
        ))
    }
}

/// Milestones may only be changed by the foreman assigned to their project.
pub fn require_assigned_foreman(project: &Project, identity: &Identity) -> Result<(), AppError> {
    if identity.role == Role::Mandor && project.foreman_id == Some(identity.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the assigned foreman can change this project's milestones".to_string(),
        ))
    }
}

/// Direct project fields may be edited by an admin or the assigned foreman.
pub fn require_project_editor(project: &Project, identity: &Identity) -> Result<(), AppError> {
    match identity.role {
        Role::Admin => Ok(()),
        Role::Mandor if project.foreman_id == Some(identity.user_id) => Ok(()),
        _ => Err(AppError::Forbidden(
            "You are not allowed to edit this project".to_string(),
        )),
    }
}
