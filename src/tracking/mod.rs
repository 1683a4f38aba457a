//! Project progress tracking: derivation from milestones, the reconciling
//! read path, and milestone status changes.

pub mod access;
pub mod milestones;
pub mod progress;
pub mod reader;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;

pub use access::{Identity, ProjectScope};
pub use reader::{ContactView, ProgressCheck, ProjectDetail, ProjectReader, ProjectView};
pub use store::{ProjectStore, StoredProgress};
