//! Shared test fixtures and utilities for all test types
//!
//! Every environment gets its own DuckDB file and cache root in temporary
//! directories, so tests never share engine state.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use tower::ServiceExt;

use view_snapshot::{
    api::{create_router, AppState},
    application::{builder::ApplicationBuilder, lifecycle::ArtifactSweeper},
    infrastructure::engine::DuckDbEngine,
    ports::{Clock, EngineError, EngineSession, QueryEngine},
    value_objects::{ConnectionDescriptor, ViewRef},
    Config,
};

pub const ORDERS_CSV: &str = "id,customer,amount_cents\n1,alice,950\n2,bob,1200\n3,o'brien,325\n";

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Engine that records every descriptor it is handed and always opens the
/// local fixture database, so credentialed requests can be exercised
/// without a remote service.
pub struct RecordingEngine {
    database: String,
    inner: DuckDbEngine,
    descriptors: Mutex<Vec<String>>,
}

impl RecordingEngine {
    pub fn new(database: &Path) -> Self {
        Self {
            database: database.to_string_lossy().to_string(),
            inner: DuckDbEngine::new(),
            descriptors: Mutex::new(Vec::new()),
        }
    }

    pub fn connects(&self) -> usize {
        self.descriptors.lock().unwrap().len()
    }

    pub fn descriptors(&self) -> Vec<String> {
        self.descriptors.lock().unwrap().clone()
    }
}

impl QueryEngine for RecordingEngine {
    fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn EngineSession>, EngineError> {
        self.descriptors
            .lock()
            .unwrap()
            .push(descriptor.expose().to_string());
        self.inner
            .connect(&ConnectionDescriptor::new(self.database.clone()))
    }
}

/// Engine whose export takes a while, for overlapping and timed-out requests.
pub struct SlowEngine {
    pub exports: Arc<AtomicUsize>,
    pub open_sessions: Arc<AtomicUsize>,
    pub delay: StdDuration,
}

impl SlowEngine {
    pub fn new(delay: StdDuration) -> Self {
        Self {
            exports: Arc::new(AtomicUsize::new(0)),
            open_sessions: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }
}

struct SlowSession {
    exports: Arc<AtomicUsize>,
    open_sessions: Arc<AtomicUsize>,
    delay: StdDuration,
}

impl QueryEngine for SlowEngine {
    fn connect(
        &self,
        _descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn EngineSession>, EngineError> {
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SlowSession {
            exports: Arc::clone(&self.exports),
            open_sessions: Arc::clone(&self.open_sessions),
            delay: self.delay,
        }))
    }
}

impl EngineSession for SlowSession {
    fn view_exists(&self, _view: &ViewRef) -> Result<bool, EngineError> {
        Ok(true)
    }

    fn export_csv(&self, _view: &ViewRef, destination: &Path) -> Result<(), EngineError> {
        std::thread::sleep(self.delay);
        self.exports.fetch_add(1, Ordering::SeqCst);
        std::fs::write(destination, ORDERS_CSV).map_err(|e| EngineError::Export(e.to_string()))
    }
}

impl Drop for SlowSession {
    fn drop(&mut self) {
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Router over a [`SlowEngine`] with its cache under `cache_root`.
pub async fn slow_app(
    cache_root: &Path,
    engine: Arc<SlowEngine>,
    customize: impl FnOnce(&mut Config),
) -> Router {
    let mut config = Config::for_cache_root(cache_root, "local.db");
    customize(&mut config);

    let builder = ApplicationBuilder::new(config)
        .with_query_engine(engine)
        .with_clock(Arc::new(ManualClock::new()))
        .with_infrastructure()
        .await
        .expect("Failed to initialize infrastructure");
    create_router(builder.build().expect("Failed to build application"))
}

/// Create `salesdb.duckdb` with schema `public`, a table and the `orders` view.
pub fn seed_database(dir: &Path) -> PathBuf {
    let path = dir.join("salesdb.duckdb");
    let connection = duckdb::Connection::open(&path).expect("Failed to open fixture database");
    connection
        .execute_batch(
            "CREATE SCHEMA public;
             CREATE TABLE public.raw_orders (id INTEGER, customer VARCHAR, amount_cents INTEGER);
             INSERT INTO public.raw_orders VALUES (1, 'alice', 950), (2, 'bob', 1200), (3, 'o''brien', 325);
             CREATE VIEW public.orders AS
                 SELECT id, customer, amount_cents FROM public.raw_orders ORDER BY id;",
        )
        .expect("Failed to seed fixture database");
    path
}

/// Run statements against the fixture database with a short-lived connection.
pub fn execute_sql(database: &Path, sql: &str) {
    let connection = duckdb::Connection::open(database).expect("Failed to open fixture database");
    connection.execute_batch(sql).expect("Failed to run SQL");
}

/// Test environment container with all necessary components
pub struct TestEnvironment {
    pub app: Router,
    pub state: AppState,
    pub builder: ApplicationBuilder,
    pub clock: Arc<ManualClock>,
    pub engine: Arc<RecordingEngine>,
    pub database_path: PathBuf,
    pub cache_root: PathBuf,
    _data_dir: TempDir,
    _cache_dir: TempDir,
}

impl TestEnvironment {
    /// Cached policy with a one minute TTL
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn oneshot() -> Self {
        Self::with_config(|config| config.cache_policy = "oneshot".to_string()).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let data_dir = TempDir::new().expect("Failed to create data dir");
        let cache_dir = TempDir::new().expect("Failed to create cache dir");
        let database_path = seed_database(data_dir.path());
        let cache_root = cache_dir.path().join("cache");

        let mut config =
            Config::for_cache_root(&cache_root, &database_path.to_string_lossy());
        customize(&mut config);

        let clock = Arc::new(ManualClock::new());
        let engine = Arc::new(RecordingEngine::new(&database_path));

        let builder = ApplicationBuilder::new(config)
            .with_query_engine(engine.clone())
            .with_clock(clock.clone())
            .with_infrastructure()
            .await
            .expect("Failed to initialize infrastructure");
        let state = builder.build().expect("Failed to build application");

        Self {
            app: create_router(state.clone()),
            state,
            builder,
            clock,
            engine,
            database_path,
            cache_root,
            _data_dir: data_dir,
            _cache_dir: cache_dir,
        }
    }

    pub fn default_connection(&self) -> String {
        self.database_path.to_string_lossy().to_string()
    }

    pub fn sweeper(&self) -> Arc<ArtifactSweeper> {
        self.builder
            .build_sweeper()
            .expect("Failed to build sweeper")
            .expect("Sweeper disabled")
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        send(&self.app, uri).await
    }
}

/// Fully buffered response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }
}

pub async fn send(app: &Router, uri: &str) -> TestResponse {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .expect("Router failed");

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body")
        .to_vec();

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Every regular file under `root`, recursively.
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

/// Poll until `condition` holds or two seconds pass.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(StdDuration::from_millis(20)).await;
    }
    condition()
}
