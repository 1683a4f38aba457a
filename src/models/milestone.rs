use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "milestone_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    NotStarted,
    InProgress,
    Completed,
    Cancelled,
}

impl MilestoneStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MilestoneStatus::Completed | MilestoneStatus::Cancelled)
    }

    /// Cancelled milestones do not count toward progress at all.
    pub fn is_active(self) -> bool {
        self != MilestoneStatus::Cancelled
    }

    /// Forward moves along NotStarted -> InProgress -> Completed, or
    /// cancellation from a non-terminal state. Re-applying the current
    /// status is allowed.
    pub fn can_transition_to(self, next: MilestoneStatus) -> bool {
        if self == next {
            return true;
        }
        match (self, next) {
            (_, MilestoneStatus::Cancelled) => !self.is_terminal(),
            (MilestoneStatus::NotStarted, MilestoneStatus::InProgress)
            | (MilestoneStatus::NotStarted, MilestoneStatus::Completed)
            | (MilestoneStatus::InProgress, MilestoneStatus::Completed) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MilestoneStatus::NotStarted => "not_started",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: String,
    pub status: MilestoneStatus,
    pub target_date: NaiveDate,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_completion: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
