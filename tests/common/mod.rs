//! Local stand-in for the raw data source, served on an ephemeral port.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;

#[derive(Clone)]
pub struct MockSource {
    body: Arc<Mutex<Value>>,
    status: Arc<Mutex<StatusCode>>,
    delay: Arc<Mutex<Duration>>,
    hits: Arc<AtomicUsize>,
    last_query: Arc<Mutex<Option<HashMap<String, String>>>>,
}

impl MockSource {
    pub fn new(body: Value) -> Self {
        Self {
            body: Arc::new(Mutex::new(body)),
            status: Arc::new(Mutex::new(StatusCode::OK)),
            delay: Arc::new(Mutex::new(Duration::ZERO)),
            hits: Arc::new(AtomicUsize::new(0)),
            last_query: Arc::new(Mutex::new(None)),
        }
    }

    pub fn set_body(&self, body: Value) {
        *self.body.lock().unwrap() = body;
    }

    pub fn set_status(&self, status: StatusCode) {
        *self.status.lock().unwrap() = status;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<HashMap<String, String>> {
        self.last_query.lock().unwrap().clone()
    }

    /// Serve on 127.0.0.1 and return the `/data` URL.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/data", get(data))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/data", addr)
    }
}

async fn data(
    State(mock): State<MockSource>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    mock.hits.fetch_add(1, Ordering::SeqCst);
    *mock.last_query.lock().unwrap() = Some(params);

    let delay = *mock.delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let status = *mock.status.lock().unwrap();
    let body = mock.body.lock().unwrap().clone();
    (status, Json(body)).into_response()
}

/// URL of a port that refuses connections.
pub async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/data", addr)
}
