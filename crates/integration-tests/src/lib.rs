//! End-to-end tests for EduPlatform.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p eduplatform-integration-tests
//! ```
//!
//! Nothing external is needed: [`FakeBackend`] serves the backend actions
//! in-process and both apps are spawned on random local ports.
//!
//! # Test Categories
//!
//! - `learner_flows` - login, session persistence, content grid, player
//! - `admin_flows` - users, permissions, content and stats views

pub mod backend;
pub mod html;

use std::net::SocketAddr;

use axum::Router;
use reqwest::Client;

pub use backend::{ADMIN_EMAIL, ADMIN_PASSWORD, FakeBackend, LEARNER_PASSWORD, Seed};

/// One app served on a random port plus a cookie-keeping client.
pub struct TestApp {
    pub client: Client,
    addr: SocketAddr,
}

impl TestApp {
    async fn serve(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind app");
        let addr = listener.local_addr().expect("Failed to read app address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("App server error");
        });

        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, addr }
    }

    /// Absolute URL of `path` on this app.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// GET `path` and return the final status and body.
    pub async fn get(&self, path: &str) -> (reqwest::StatusCode, String) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed");
        let status = resp.status();
        (status, resp.text().await.expect("Failed to read body"))
    }

    /// POST a form to `path` and return the final status and body.
    pub async fn post<F: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        form: &F,
    ) -> (reqwest::StatusCode, String) {
        let resp = self
            .client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed");
        let status = resp.status();
        (status, resp.text().await.expect("Failed to read body"))
    }
}

/// Spawn the learner site against `backend`.
pub async fn spawn_learner(backend: &FakeBackend) -> TestApp {
    use eduplatform_learner::{app, config::LearnerConfig, state::AppState};

    let state = AppState::new(LearnerConfig::local(backend.api_config()))
        .expect("Failed to create learner state");
    TestApp::serve(app(state)).await
}

/// Spawn the admin panel against `backend`.
pub async fn spawn_admin(backend: &FakeBackend) -> TestApp {
    use eduplatform_admin::{app, config::AdminConfig, state::AppState};

    let state = AppState::new(AdminConfig::local(backend.api_config()))
        .expect("Failed to create admin state");
    TestApp::serve(app(state)).await
}

/// Spawn the admin panel and sign in with the seeded admin account.
pub async fn signed_in_admin(backend: &FakeBackend) -> TestApp {
    let admin = spawn_admin(backend).await;
    let (status, body) = admin
        .post(
            "/auth/login",
            &[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)],
        )
        .await;
    assert!(status.is_success(), "admin login failed: {status}");
    assert!(body.contains("users-table-body"), "admin login did not land on users");
    admin
}

/// Spawn the learner site and sign in as `email`.
pub async fn signed_in_learner(backend: &FakeBackend, email: &str) -> TestApp {
    let learner = spawn_learner(backend).await;
    let (status, body) = learner
        .post("/auth/login", &[("email", email), ("password", LEARNER_PASSWORD)])
        .await;
    assert!(status.is_success(), "learner login failed: {status}");
    assert!(body.contains(r#"data-view="dashboard""#), "learner login did not land on dashboard");
    learner
}
