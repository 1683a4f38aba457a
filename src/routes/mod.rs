pub mod auth;
pub mod milestones;
pub mod projects;
pub mod users;

use axum::Router;
use axum::routing::{delete, get, post, put};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/change-password", post(auth::change_password))
        .route("/api/v1/auth/me", get(auth::me))
        // Users
        .route("/api/v1/users", get(users::list).post(users::create))
        .route("/api/v1/users/{id}", delete(users::delete))
        // Projects
        .route("/api/v1/projects", get(projects::list).post(projects::create))
        .route(
            "/api/v1/projects/{id}",
            get(projects::get)
                .put(projects::update)
                .delete(projects::delete),
        )
        .route("/api/v1/projects/{id}/audit", get(projects::audit_log))
        // Milestones
        .route(
            "/api/v1/projects/{id}/milestones",
            get(milestones::list_by_project).post(milestones::create),
        )
        .route(
            "/api/v1/milestones/{id}",
            put(milestones::update).delete(milestones::delete),
        )
        .route("/api/v1/milestones/{id}/status", put(milestones::set_status))
}
