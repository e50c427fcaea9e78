#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use inventory_gateway::api::{self, AppState};
use inventory_gateway::dispatch::{DispatchLimits, Dispatcher};
use inventory_gateway::error::{GatewayError, Result};
use inventory_gateway::pool::{QueryExecutor, SqlParam};
use inventory_gateway::registry::Registry;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub enum Reply {
    Rows(Vec<Value>),
    Affected(u64),
    Fail(fn() -> GatewayError),
}

/// Executor answering from a per-statement queue of scripted replies.
/// Unscripted queries return no rows; unscripted executes affect nothing.
#[derive(Default)]
pub struct ScriptedExecutor {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, Vec<SqlParam>)>>,
    delay: Option<Duration>,
    abandoned: Arc<AtomicUsize>,
}

/// Counts calls dropped before they completed
struct Abandon(Option<Arc<AtomicUsize>>);

impl Drop for Abandon {
    fn drop(&mut self) {
        if let Some(counter) = self.0.take() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn reply(&self, sql: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(sql.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<(String, Vec<SqlParam>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose futures were dropped mid-flight
    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }

    async fn next(&self, sql: &str, params: &[SqlParam]) -> Option<Reply> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));

        let mut pending = Abandon(Some(self.abandoned.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        pending.0 = None;

        self.replies
            .lock()
            .unwrap()
            .get_mut(sql)
            .and_then(|queue| queue.pop_front())
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn query_json(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Value>> {
        match self.next(sql, params).await {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Affected(_)) | None => Ok(Vec::new()),
            Some(Reply::Fail(make)) => Err(make()),
        }
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        match self.next(sql, params).await {
            Some(Reply::Affected(n)) => Ok(n),
            Some(Reply::Rows(rows)) => Ok(rows.len() as u64),
            None => Ok(0),
            Some(Reply::Fail(make)) => Err(make()),
        }
    }

    async fn ping(&self) -> bool {
        true
    }
}

pub fn limits() -> DispatchLimits {
    DispatchLimits {
        max_in_flight: 8,
        queue_timeout: Duration::from_millis(500),
        query_timeout: Duration::from_secs(2),
    }
}

pub fn app_with(executor: Arc<ScriptedExecutor>, limits: DispatchLimits) -> (Router, Arc<Registry>) {
    let registry = Arc::new(Registry::inventory().expect("inventory registry is valid"));
    let dispatcher = Arc::new(Dispatcher::new(registry.clone(), executor, limits));
    (api::router(AppState::new(dispatcher), 64 * 1024), registry)
}

pub fn app(executor: Arc<ScriptedExecutor>) -> (Router, Arc<Registry>) {
    app_with(executor, limits())
}

pub fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("failed to build request"),
        None => builder.body(Body::empty()).expect("failed to build request"),
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("request failed")
}

pub async fn json_body(resp: Response<Body>) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not JSON")
}
