//! Milestone-derived project progress.
//!
//! A project's progress and status are never read from its own row. They are
//! derived from its milestones:
//!
//! - cancelled milestones are ignored entirely;
//! - progress is `round(100 * completed / active)`, rounding halves up;
//! - with no active milestones nothing can be derived and the stored values
//!   are returned untouched.

use crate::models::{Milestone, MilestoneStatus, ProjectStatus};

/// Result of deriving progress for a single project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressOutcome {
    pub progress: i32,
    pub status: ProjectStatus,
    pub basis: ProgressBasis,
}

/// What the outcome was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressBasis {
    Milestones { active: usize, completed: usize },
    /// No active milestones; the stored values were passed through.
    Fallback,
}

impl ProgressOutcome {
    pub fn is_fallback(&self) -> bool {
        self.basis == ProgressBasis::Fallback
    }
}

pub fn compute_progress(
    milestones: &[Milestone],
    fallback_progress: i32,
    fallback_status: ProjectStatus,
) -> ProgressOutcome {
    compute_from_statuses(
        milestones.iter().map(|m| m.status),
        fallback_progress,
        fallback_status,
    )
}

pub fn compute_from_statuses<I>(
    statuses: I,
    fallback_progress: i32,
    fallback_status: ProjectStatus,
) -> ProgressOutcome
where
    I: IntoIterator<Item = MilestoneStatus>,
{
    let (active, completed) = statuses
        .into_iter()
        .filter(|s| s.is_active())
        .fold((0usize, 0usize), |(active, completed), s| {
            let done = usize::from(s == MilestoneStatus::Completed);
            (active + 1, completed + done)
        });

    if active == 0 {
        return ProgressOutcome {
            progress: fallback_progress,
            status: fallback_status,
            basis: ProgressBasis::Fallback,
        };
    }

    let progress = percent_half_up(completed, active);
    let status = if progress == 100 {
        ProjectStatus::Completed
    } else if progress > 0 || fallback_status == ProjectStatus::Planning {
        ProjectStatus::InProgress
    } else {
        fallback_status
    };

    ProgressOutcome {
        progress,
        status,
        basis: ProgressBasis::Milestones { active, completed },
    }
}

/// `round(100 * part / whole)` with halves rounded up. `whole` must be non-zero.
fn percent_half_up(part: usize, whole: usize) -> i32 {
    let scaled = (200 * part + whole) / (2 * whole);
    scaled.min(100) as i32
}
