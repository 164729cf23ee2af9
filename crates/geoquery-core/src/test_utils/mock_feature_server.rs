// src/test_utils/mock_feature_server.rs
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const LAYER_PATH: &str = "/arcgis/rest/services/SampleWorldCities/MapServer/0";

/// Canned answer for one `query` request.
#[derive(Debug, Clone)]
pub enum MockReply {
    Json(Value),
    Status(u16),
}

#[derive(Clone)]
struct MockServerState {
    metadata: Option<Value>,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    metadata_requests: Arc<Mutex<usize>>,
    query_requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

async fn metadata_handler(State(state): State<MockServerState>) -> Response {
    *state.metadata_requests.lock().unwrap() += 1;
    match state.metadata {
        Some(metadata) => Json(metadata).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn query_handler(
    State(state): State<MockServerState>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    log::debug!("Mock feature server received query: {:?}", params);
    state.query_requests.lock().unwrap().push(params);

    match state.replies.lock().unwrap().pop_front() {
        Some(MockReply::Json(body)) => Json(body).into_response(),
        Some(MockReply::Status(code)) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        None => {
            log::error!("Mock feature server ran out of replies!");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// Single-layer stand-in for a map service, bound to an ephemeral port.
pub struct MockFeatureServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    metadata_requests: Arc<Mutex<usize>>,
    query_requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl MockFeatureServer {
    /// `metadata: None` makes the layer endpoint answer 500.
    pub async fn start(metadata: Option<Value>, replies: Vec<MockReply>) -> Self {
        let state = MockServerState {
            metadata,
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            metadata_requests: Arc::new(Mutex::new(0)),
            query_requests: Arc::new(Mutex::new(Vec::new())),
        };
        let metadata_requests = state.metadata_requests.clone();
        let query_requests = state.query_requests.clone();

        let app = Router::new()
            .route(LAYER_PATH, get(metadata_handler))
            .route(&format!("{}/query", LAYER_PATH), post(query_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap_or_else(|e| {
            panic!("Failed to bind mock server to 127.0.0.1:0. Error: {}", e);
        });
        let addr = listener.local_addr().unwrap();
        log::info!("Mock feature server listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap_or_else(|e| {
                    log::error!("Mock feature server error: {}", e);
                });
        });

        MockFeatureServer {
            addr,
            shutdown_tx,
            metadata_requests,
            query_requests,
        }
    }

    pub fn layer_url(&self) -> String {
        format!("http://{}{}", self.addr, LAYER_PATH)
    }

    pub fn metadata_requests(&self) -> usize {
        *self.metadata_requests.lock().unwrap()
    }

    pub fn query_requests(&self) -> Vec<HashMap<String, String>> {
        self.query_requests.lock().unwrap().clone()
    }

    pub async fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            log::warn!("Mock feature server shutdown signal already sent or receiver dropped.");
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }
}
