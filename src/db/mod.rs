pub mod audit;
pub mod milestones;
pub mod projects;
pub mod refresh_tokens;
pub mod store;
pub mod users;

pub use store::PgProjectStore;
