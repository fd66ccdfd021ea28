#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use jobrelay_core::worker::{JobContext, Worker, WorkerError, WorkerRegistry};
use jobrelay_db::MemoryJobStore;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use jobrelay_api::config::{ServerConfig, StoreBackend};
use jobrelay_api::engine::{
    trigger_channel, Coordinator, Dispatcher, JobRunner, Poller, TriggerReceiver,
};
use jobrelay_api::router::build_app_router;
use jobrelay_api::state::AppState;

// ---------------------------------------------------------------------------
// Scripted workers
// ---------------------------------------------------------------------------

/// Answers every question and echoes its input back, after `delay`.
#[derive(Default)]
pub struct EchoWorker {
    pub delay: Duration,
    inputs: Mutex<Vec<Value>>,
}

impl EchoWorker {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Inputs received so far, in call order.
    pub fn inputs(&self) -> Vec<Value> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }
}

#[async_trait]
impl Worker for EchoWorker {
    async fn execute(&self, _ctx: &JobContext, input: Value) -> Result<Value, WorkerError> {
        self.inputs.lock().unwrap().push(input.clone());
        tokio::time::sleep(self.delay).await;

        let question = input["question"].as_str().unwrap_or_default();
        Ok(json!({
            "answer": format!("answer to: {question}"),
            "echo": input,
        }))
    }
}

/// Always fails with an upstream error.
pub struct FailingWorker;

#[async_trait]
impl Worker for FailingWorker {
    async fn execute(&self, _ctx: &JobContext, _input: Value) -> Result<Value, WorkerError> {
        Err(WorkerError::Upstream("model overloaded".into()))
    }
}

/// Panics instead of returning.
pub struct PanickingWorker;

#[async_trait]
impl Worker for PanickingWorker {
    async fn execute(&self, _ctx: &JobContext, _input: Value) -> Result<Value, WorkerError> {
        panic!("worker exploded");
    }
}

/// Sleeps for the wrapped duration before succeeding.
pub struct SlowWorker(pub Duration);

#[async_trait]
impl Worker for SlowWorker {
    async fn execute(&self, _ctx: &JobContext, _input: Value) -> Result<Value, WorkerError> {
        tokio::time::sleep(self.0).await;
        Ok(json!("late"))
    }
}

/// Records the highest number of executions observed at once.
#[derive(Default)]
pub struct ConcurrencyProbe {
    pub delay: Duration,
    running: AtomicUsize,
    peak: AtomicUsize,
    finished: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Worker for ConcurrencyProbe {
    async fn execute(&self, _ctx: &JobContext, _input: Value) -> Result<Value, WorkerError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(json!("done"))
    }
}

// ---------------------------------------------------------------------------
// App harness
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        store_backend: StoreBackend::Memory,
        ..ServerConfig::default()
    }
}

/// A running in-process app: the router plus handles into its internals.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryJobStore>,
    pub research: Arc<EchoWorker>,
    pub shutdown: CancellationToken,
    /// Queue consumer held open when no runner is spawned.
    pub stalled_queue: Option<TriggerReceiver>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Build the full application router over an in-memory store.
///
/// Registered job types:
/// - `research`: [`EchoWorker`] with a short delay
/// - `broken`: [`FailingWorker`]
/// - `explodes`: [`PanickingWorker`]
///
/// A job runner is spawned so submitted jobs actually execute.
pub fn build_test_app() -> TestApp {
    build_app(test_config(), true)
}

/// Like [`build_test_app`], but nothing consumes the trigger queue, which
/// holds `queue_capacity` triggers before submissions start failing.
pub fn build_stalled_test_app(queue_capacity: usize) -> TestApp {
    let config = ServerConfig {
        trigger_queue_capacity: queue_capacity,
        ..test_config()
    };
    build_app(config, false)
}

fn build_app(config: ServerConfig, run_jobs: bool) -> TestApp {
    let store = Arc::new(MemoryJobStore::new());
    let research = Arc::new(EchoWorker::with_delay(Duration::from_millis(200)));

    let mut registry = WorkerRegistry::new();
    registry.register("research", research.clone()).unwrap();
    registry.register("broken", Arc::new(FailingWorker)).unwrap();
    registry.register("explodes", Arc::new(PanickingWorker)).unwrap();
    let registry = Arc::new(registry);

    let (triggers, receiver) = trigger_channel(config.trigger_queue_capacity);
    let coordinator = Arc::new(Coordinator::new(store.clone(), registry.clone()));

    let shutdown = CancellationToken::new();
    let stalled_queue = if run_jobs {
        let runner = JobRunner::new(coordinator, receiver, config.max_concurrent_jobs);
        tokio::spawn(runner.run(shutdown.clone(), Duration::from_secs(1)));
        None
    } else {
        Some(receiver)
    };

    let state = AppState {
        store: store.clone(),
        dispatcher: Arc::new(Dispatcher::new(store.clone(), registry, triggers)),
        poller: Poller::new(store.clone()),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        research,
        shutdown,
        stalled_queue,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &TestApp, uri: &str, body: &Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn post_raw(app: &TestApp, uri: &str, body: &'static str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Submit a job and return its process id.
pub async fn initiate(app: &TestApp, job_type: &str, input: &Value) -> String {
    let response = post_json(app, &format!("/initiate/{job_type}"), input).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["processId"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Poll `/status/{id}` until the job is terminal, failing after five seconds.
pub async fn wait_until_terminal(app: &TestApp, process_id: &str) -> Value {
    let uri = format!("/status/{process_id}");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);

    loop {
        let response = get(app, &uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;

        if json["status"] == "COMPLETED" || json["status"] == "FAILED" {
            return json;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {process_id} still {} after 5s",
            json["status"]
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
