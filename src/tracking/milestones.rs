use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Milestone, MilestoneStatus};
use crate::tracking::access::{self, Identity};
use crate::tracking::store::{MilestoneStatusChange, ProjectStore};

/// Change a milestone's status on behalf of the project's assigned foreman.
///
/// The owning project's cached progress is left alone; the next read derives
/// it again from the milestones.
pub async fn set_milestone_status(
    store: &dyn ProjectStore,
    milestone_id: Uuid,
    new_status: MilestoneStatus,
    identity: &Identity,
) -> Result<Milestone, AppError> {
    let milestone = store
        .find_milestone(milestone_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Milestone not found".to_string()))?;

    let project = store
        .find_project(milestone.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    access::require_assigned_foreman(&project, identity)?;

    let change = plan_status_change(&milestone, new_status, Utc::now())?;
    if change.status == milestone.status
        && change.actual_start == milestone.actual_start
        && change.actual_completion == milestone.actual_completion
    {
        return Ok(milestone);
    }

    let updated = store.set_milestone_status(milestone.id, change).await?;
    tracing::debug!(
        "Milestone {} of project {} moved {} -> {}",
        updated.id,
        updated.project_id,
        milestone.status.as_str(),
        updated.status.as_str()
    );
    Ok(updated)
}

/// Validate the transition and stamp first start/completion times.
pub fn plan_status_change(
    milestone: &Milestone,
    new_status: MilestoneStatus,
    now: DateTime<Utc>,
) -> Result<MilestoneStatusChange, AppError> {
    if !milestone.status.can_transition_to(new_status) {
        return Err(AppError::BadRequest(format!(
            "Cannot change milestone status from {} to {}",
            milestone.status.as_str(),
            new_status.as_str()
        )));
    }

    let mut change = MilestoneStatusChange {
        status: new_status,
        actual_start: milestone.actual_start,
        actual_completion: milestone.actual_completion,
    };

    if new_status != milestone.status {
        match new_status {
            MilestoneStatus::InProgress => {
                change.actual_start.get_or_insert(now);
            }
            MilestoneStatus::Completed => {
                change.actual_completion.get_or_insert(now);
            }
            _ => {}
        }
    }

    Ok(change)
}
