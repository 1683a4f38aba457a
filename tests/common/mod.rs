use std::net::SocketAddr;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use renotrack::config::{Config, SelfHealMode};

pub const PASSWORD: &str = "password123";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
}

/// A user created through the admin API, logged in.
pub struct TestUser {
    pub id: String,
    pub token: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Register the bootstrap user (first user becomes the admin).
    pub async fn register(&self, email: &str, password: &str, name: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "email": email, "password": password, "name": name }))
            .send()
            .await
            .expect("register request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn login(&self, email: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Register the bootstrap admin, return its access token.
    pub async fn bootstrap(&self) -> String {
        let (body, status) = self.register("admin@test.com", PASSWORD, "Admin").await;
        assert_eq!(status, StatusCode::OK, "bootstrap register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Create a user with `role` as the admin, then log them in.
    pub async fn create_user(&self, admin_token: &str, email: &str, name: &str, role: &str) -> TestUser {
        let (body, status) = self
            .post_auth(
                "/api/v1/users",
                admin_token,
                &json!({
                    "email": email,
                    "password": PASSWORD,
                    "name": name,
                    "phone": "0812-0000-0000",
                    "role": role,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create user failed: {body}");
        let id = body["id"].as_str().unwrap().to_string();

        let (login, status) = self.login(email, PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login failed: {login}");
        let token = login["access_token"].as_str().unwrap().to_string();

        TestUser { id, token }
    }

    /// Create a project as the admin, return the project JSON.
    pub async fn create_project(
        &self,
        admin_token: &str,
        name: &str,
        client_id: &str,
        foreman_id: Option<&str>,
    ) -> Value {
        let (body, status) = self
            .post_auth(
                "/api/v1/projects",
                admin_token,
                &json!({
                    "name": name,
                    "service_type": "Renovasi Dapur",
                    "address": "Jl. Merdeka 1",
                    "start_date": "2026-01-05",
                    "client_id": client_id,
                    "foreman_id": foreman_id,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create project failed: {body}");
        body
    }

    /// Create a milestone as the assigned foreman, return the milestone JSON.
    pub async fn create_milestone(&self, foreman_token: &str, project_id: &str, name: &str) -> Value {
        let (body, status) = self
            .post_auth(
                &format!("/api/v1/projects/{project_id}/milestones"),
                foreman_token,
                &json!({ "name": name, "target_date": "2026-03-01" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create milestone failed: {body}");
        body
    }

    pub async fn set_milestone_status(
        &self,
        token: &str,
        milestone_id: &str,
        status: &str,
    ) -> (Value, StatusCode) {
        self.put_auth(
            &format!("/api/v1/milestones/{milestone_id}/status"),
            token,
            &json!({ "status": status }),
        )
        .await
    }

    /// Overwrite the stored progress columns, bypassing the API.
    pub async fn force_stored_progress(&self, project_id: &str, progress: i32, status: &str) {
        let id: Uuid = project_id.parse().unwrap();
        sqlx::query("UPDATE projects SET progress = $2, status = $3::project_status WHERE id = $1")
            .bind(id)
            .bind(progress)
            .bind(status)
            .execute(&self.pool)
            .await
            .expect("failed to overwrite stored progress");
    }

    /// Read the stored progress columns, bypassing the API.
    pub async fn stored_progress(&self, project_id: &str) -> (i32, String) {
        let id: Uuid = project_id.parse().unwrap();
        sqlx::query_as::<_, (i32, String)>(
            "SELECT progress, status::text FROM projects WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .expect("failed to read stored progress")
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn put_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

fn base_database_url() -> String {
    let _ = dotenvy::dotenv();
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests")
}

fn with_database(base_url: &str, name: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{name}"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Spawn a test app with a fresh temporary database and self-heal off.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(SelfHealMode::Off).await
}

pub async fn spawn_app_with(self_heal: SelfHealMode) -> TestApp {
    let base_url = base_database_url();
    let db_name = format!("renotrack_test_{}", Uuid::now_v7().simple());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&with_database(&base_url, "postgres"))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = with_database(&base_url, &db_name);
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        max_body_size: 1_048_576,
        log_level: "warn".to_string(),
        self_heal,
    };

    let app = renotrack::build_app(pool.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder().build().unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
    }
}

/// Drop the test database after a test completes.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&with_database(&base_database_url(), "postgres"))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
