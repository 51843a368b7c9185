//! HTTP server for document question answering

pub mod routes;
pub mod state;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Question answering HTTP server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a new server; loads the index and starts ingestion workers
    pub fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .merge(routes::service_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.server.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Start the server and the background sweeper
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        self.spawn_sweeper();
        let router = self.build_router();

        tracing::info!("Starting docqa server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;

        self.state.set_ready(true);
        let served = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
        self.state.set_ready(false);

        served.map_err(|e| Error::Internal(format!("Server error: {}", e)))
    }

    /// Periodically drop idle rate-limit entries and expired jobs
    fn spawn_sweeper(&self) {
        let state = self.state.clone();
        let period = Duration::from_secs(self.config.rate_limit.sweep_interval_secs.max(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                state.sweep();
            }
        });
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Health check endpoint
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness check endpoint
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn test_config(dir: &std::path::Path) -> RagConfig {
        let mut config = RagConfig::default();
        config.storage.documents_dir = dir.join("documents");
        config.storage.index_dir = dir.join("index");
        config.embeddings.dimensions = 64;
        config.rate_limit.max_requests = 2;
        config
    }

    fn router(server: &RagServer) -> Router {
        server
            .build_router()
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn wait_for_job(server: &RagServer, job_id: uuid::Uuid) {
        for _ in 0..200 {
            let job = server.state().job_queue().get(job_id).unwrap();
            if job.status.is_finished() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", job_id);
    }

    fn query(question: &str) -> Request<Body> {
        Request::post("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "question": question }).to_string()))
            .unwrap()
    }

    fn upload(filename: &str, content: &str) -> Request<Body> {
        let boundary = "docqa-test-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{c}\r\n--{b}--\r\n",
            b = boundary,
            f = filename,
            c = content
        );
        Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let server = RagServer::new(test_config(dir.path())).unwrap();

        let response = router(&server)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_query_validation_and_rate_limit() {
        let dir = tempfile::tempdir().unwrap();
        let server = RagServer::new(test_config(dir.path())).unwrap();

        // Rejected input does not use up the quota of two
        for _ in 0..3 {
            let response = router(&server).oneshot(query("hi")).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let response = router(&server).oneshot(query("what is rust?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["answer"], json!(crate::generation::NOT_FOUND_ANSWER));
        assert_eq!(body["sources"], json!([]));

        let response = router(&server).oneshot(query("what is rust?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router(&server).oneshot(query("what is rust?")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn test_ready_after_start() {
        let dir = tempfile::tempdir().unwrap();
        let server = RagServer::new(test_config(dir.path())).unwrap();
        let ready = || Request::get("/ready").body(Body::empty()).unwrap();

        let response = router(&server).oneshot(ready()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        server.state().set_ready(true);
        assert_eq!(server.state().workers_alive(), 2);
        let response = router(&server).oneshot(ready()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let server = RagServer::new(test_config(dir.path())).unwrap();

        let response = router(&server)
            .oneshot(upload("notes.docx", "hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(server.state().job_queue().list().is_empty());
    }

    #[tokio::test]
    async fn test_upload_queues_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let server = RagServer::new(test_config(dir.path())).unwrap();

        let mut job_ids = Vec::new();
        for content in ["rust ownership rules", "rust borrowing rules"] {
            let response = router(&server)
                .oneshot(upload("../nested/notes.txt", content))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let body = body_json(response).await;
            assert_eq!(body["status"], json!("uploaded"));
            assert_eq!(body["file"], json!("notes.txt"));
            let job_id: uuid::Uuid = serde_json::from_value(body["job_id"].clone()).unwrap();
            job_ids.push(job_id);
        }

        // Same declared name, separate stored files
        for job_id in &job_ids {
            let stored = dir.path().join("documents").join(format!("{}-notes.txt", job_id));
            assert!(stored.exists());
            wait_for_job(&server, *job_id).await;
        }
        assert_eq!(server.state().index().len(), 2);
        assert_eq!(server.state().index().sources()[0].source, "notes.txt");

        let response = router(&server)
            .oneshot(Request::get(format!("/jobs/{}", job_ids[0])).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], json!("complete"));
    }

    #[tokio::test]
    async fn test_sweep_drops_expired_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.processing.job_retention_secs = 0;
        let server = RagServer::new(config).unwrap();

        let response = router(&server)
            .oneshot(upload("notes.txt", "rust ownership rules"))
            .await
            .unwrap();
        let body = body_json(response).await;
        let job_id: uuid::Uuid = serde_json::from_value(body["job_id"].clone()).unwrap();
        wait_for_job(&server, job_id).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let (_, jobs) = server.state().sweep();
        assert_eq!(jobs, 1);
        assert!(server.state().job_queue().get(job_id).is_none());
        assert_eq!(server.state().index().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let server = RagServer::new(test_config(dir.path())).unwrap();

        let response = router(&server)
            .oneshot(
                Request::get(format!("/jobs/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
