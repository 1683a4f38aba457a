pub mod audit_event;
pub mod milestone;
pub mod project;
pub mod refresh_token;
pub mod user;

pub use audit_event::AuditEvent;
pub use milestone::{Milestone, MilestoneStatus};
pub use project::{Project, ProjectStatus};
pub use refresh_token::RefreshToken;
pub use user::{Contact, Role, User};
