//! Integration test support for the Bazaar client.
//!
//! [`MockBackend`] is an in-process stand-in for the marketplace REST API.
//! Tests script a response per `METHOD /path`, drive the real client
//! against it, then inspect the requests it recorded.
//!
//! ```rust,ignore
//! let backend = MockBackend::start().await;
//! backend.respond(Method::POST, "/api/login", StatusCode::OK, json!({"user": {"id": 7}, "token": "t"}));
//! let ctx = backend.context();
//! ctx.account().login(&Credentials::new("alice", "pw")).await?;
//! assert_eq!(backend.requests()[0].json()["username"], "alice");
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use bazaar_storefront::store::persist::{KeyValueStorage, MemoryStorage};
use bazaar_storefront::{AppContext, StorefrontConfig};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    /// The body parsed as JSON, or `Null`.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    /// The body as text, for inspecting multipart payloads.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// A header value as text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }

    /// The `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> Option<String> {
        self.header(header::AUTHORIZATION.as_str())
    }
}

#[derive(Default)]
struct Script {
    responses: HashMap<(Method, String), (StatusCode, Value)>,
    requests: Vec<RecordedRequest>,
}

#[derive(Clone, Default)]
struct MockState {
    script: Arc<Mutex<Script>>,
}

impl MockState {
    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A scripted backend listening on an ephemeral local port.
pub struct MockBackend {
    addr: SocketAddr,
    state: MockState,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind to `127.0.0.1:0` and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("failed to bind mock backend: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("mock backend has no address: {e}"));

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// `http://127.0.0.1:<port>/api`.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// `http://127.0.0.1:<port>`.
    #[must_use]
    pub fn host(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer `method path` with `status` and a JSON `body` from now on.
    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.state
            .lock()
            .responses
            .insert((method, path.to_string()), (status, body));
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Requests received for `method path`.
    #[must_use]
    pub fn requests_to(&self, method: &Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == *method && r.path == path)
            .collect()
    }

    /// Client context over in-memory storage.
    #[must_use]
    pub fn context(&self) -> AppContext {
        self.context_with(Arc::new(MemoryStorage::new()))
    }

    /// Client context over `storage`.
    ///
    /// # Panics
    ///
    /// Panics if the context cannot be built.
    #[must_use]
    pub fn context_with(&self, storage: Arc<dyn KeyValueStorage>) -> AppContext {
        AppContext::with_storage(self.config(), storage)
            .unwrap_or_else(|e| panic!("failed to build context: {e}"))
    }

    /// Configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the backend URL does not parse.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        let url = self
            .api_url()
            .parse()
            .unwrap_or_else(|e| panic!("bad mock url: {e}"));
        StorefrontConfig::new(url, PathBuf::from("unused-storage.json"))
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let mut script = state.lock();
    script.requests.push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(String::from),
        headers,
        body,
    });

    match script.responses.get(&(method, path)) {
        Some((status, body)) => (*status, axum::Json(body.clone())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": "no scripted response" })),
        )
            .into_response(),
    }
}
