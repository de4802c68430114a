#![allow(dead_code)]

use std::{
    io,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::{header::CONTENT_TYPE, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;
use speaking_coach::{
    api::AppState,
    build_app,
    config::{RelayConfig, SpeechConfig},
};
use tokio::{net::TcpListener, sync::Mutex};
use tower::ServiceExt;

pub const TEST_API_KEY: &str = "sk-test-key";
pub const MULTIPART_BOUNDARY: &str = "speakingcoachboundary";

struct RunningServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

async fn spawn_server(app: Router) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub server");
    let addr = listener.local_addr().expect("stub address");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        if let Err(e) = server.await {
            eprintln!("stub server error: {e}");
        }
    });

    RunningServer {
        addr,
        shutdown_tx,
        handle,
    }
}

impl RunningServer {
    async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}

#[derive(Clone)]
enum StubBody {
    Json(Value),
    Text(String),
}

impl StubBody {
    fn respond(&self, status: StatusCode) -> Response {
        match self {
            StubBody::Json(value) => (status, Json(value.clone())).into_response(),
            StubBody::Text(text) => (status, text.clone()).into_response(),
        }
    }
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    reply: StubBody,
    hits: Arc<AtomicUsize>,
    last_body: Arc<Mutex<Option<Value>>>,
    last_auth: Arc<Mutex<Option<String>>>,
}

/// Stand-in for the completion provider: answers every request with a fixed
/// status and body, and records what it was sent.
pub struct StubUpstream {
    pub url: String,
    state: StubState,
    server: Option<RunningServer>,
}

impl StubUpstream {
    async fn spawn(status: StatusCode, reply: StubBody) -> Self {
        let state = StubState {
            status,
            reply,
            hits: Arc::new(AtomicUsize::new(0)),
            last_body: Arc::new(Mutex::new(None)),
            last_auth: Arc::new(Mutex::new(None)),
        };

        let app = Router::new()
            .route("/v1/chat/completions", post(stub_completion))
            .with_state(state.clone());
        let server = spawn_server(app).await;

        Self {
            url: format!("http://{}/v1/chat/completions", server.addr),
            state,
            server: Some(server),
        }
    }

    pub async fn start(status: StatusCode, reply: Value) -> Self {
        Self::spawn(status, StubBody::Json(reply)).await
    }

    /// Answers with a plain-text body instead of JSON.
    pub async fn start_text(status: StatusCode, reply: &str) -> Self {
        Self::spawn(status, StubBody::Text(reply.to_string())).await
    }

    /// Replies 200 with a single choice carrying `content`.
    pub async fn replying_with(content: &str) -> Self {
        Self::start(StatusCode::OK, completion_with(content)).await
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub async fn last_body(&self) -> Option<Value> {
        self.state.last_body.lock().await.clone()
    }

    pub async fn last_auth(&self) -> Option<String> {
        self.state.last_auth.lock().await.clone()
    }

    pub async fn shutdown(mut self) {
        if let Some(server) = self.server.take() {
            server.stop().await;
        }
    }
}

async fn stub_completion(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    *state.last_body.lock().await = Some(body);
    *state.last_auth.lock().await = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.reply.respond(state.status)
}

#[derive(Clone)]
struct SpeechStubState {
    token_status: StatusCode,
    token_reply: Value,
    asr_reply: Value,
    token_hits: Arc<AtomicUsize>,
    asr_hits: Arc<AtomicUsize>,
    last_token_query: Arc<Mutex<Option<String>>>,
    last_asr_body: Arc<Mutex<Option<Value>>>,
}

/// Stand-in for the speech provider: an OAuth token endpoint and a
/// recognition endpoint with fixed replies.
pub struct StubSpeech {
    pub token_url: String,
    pub recognize_url: String,
    state: SpeechStubState,
    server: Option<RunningServer>,
}

impl StubSpeech {
    pub async fn start(token_status: StatusCode, token_reply: Value, asr_reply: Value) -> Self {
        let state = SpeechStubState {
            token_status,
            token_reply,
            asr_reply,
            token_hits: Arc::new(AtomicUsize::new(0)),
            asr_hits: Arc::new(AtomicUsize::new(0)),
            last_token_query: Arc::new(Mutex::new(None)),
            last_asr_body: Arc::new(Mutex::new(None)),
        };

        let app = Router::new()
            .route("/oauth/2.0/token", post(stub_token))
            .route("/pro_api", post(stub_recognize))
            .with_state(state.clone());
        let server = spawn_server(app).await;

        Self {
            token_url: format!("http://{}/oauth/2.0/token", server.addr),
            recognize_url: format!("http://{}/pro_api", server.addr),
            state,
            server: Some(server),
        }
    }

    /// Issues `tok-1` and recognizes every clip as `text`.
    pub async fn recognizing(text: &str) -> Self {
        Self::start(
            StatusCode::OK,
            serde_json::json!({ "access_token": "tok-1", "expires_in": 2592000 }),
            serde_json::json!({ "err_no": 0, "err_msg": "success.", "sn": "sn-1", "result": [text] }),
        )
        .await
    }

    pub fn config(&self) -> SpeechConfig {
        let mut speech = SpeechConfig::new("baidu-ak", "baidu-sk");
        speech.token_url = self.token_url.clone();
        speech.recognize_url = self.recognize_url.clone();
        speech.cuid = "test-device".to_string();
        speech
    }

    pub fn token_hits(&self) -> usize {
        self.state.token_hits.load(Ordering::SeqCst)
    }

    pub fn asr_hits(&self) -> usize {
        self.state.asr_hits.load(Ordering::SeqCst)
    }

    pub async fn last_token_query(&self) -> Option<String> {
        self.state.last_token_query.lock().await.clone()
    }

    pub async fn last_asr_body(&self) -> Option<Value> {
        self.state.last_asr_body.lock().await.clone()
    }

    pub async fn shutdown(mut self) {
        if let Some(server) = self.server.take() {
            server.stop().await;
        }
    }
}

async fn stub_token(
    State(state): State<SpeechStubState>,
    RawQuery(query): RawQuery,
) -> (StatusCode, Json<Value>) {
    state.token_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_token_query.lock().await = query;
    (state.token_status, Json(state.token_reply.clone()))
}

async fn stub_recognize(
    State(state): State<SpeechStubState>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.asr_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_asr_body.lock().await = Some(body);
    Json(state.asr_reply.clone())
}

pub fn completion_with(content: &str) -> Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "deepseek-chat",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "message": { "role": "assistant", "content": content }
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30 }
    })
}

pub fn app_from(config: RelayConfig) -> Router {
    build_app(AppState::new(&config).expect("app state"))
}

pub fn app_with(api_key: Option<&str>, upstream_url: &str) -> Router {
    app_from(RelayConfig {
        api_key: api_key.map(str::to_string),
        upstream_url: upstream_url.to_string(),
        ..RelayConfig::default()
    })
}

pub fn app_with_speech(speech: Option<SpeechConfig>) -> Router {
    app_from(RelayConfig {
        speech,
        ..RelayConfig::default()
    })
}

pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let resp = app.oneshot(req).await.expect("router response");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("response body");
    (status, headers, bytes.to_vec())
}

/// POSTs `body` verbatim with the given content type and decodes a JSON reply
/// (`Value::Null` when the reply is not JSON).
pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: &str,
    body: impl Into<Body>,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap();
    let (status, _, bytes) = send(app, req).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

pub async fn post_chat(app: Router, payload: Value) -> (StatusCode, Value) {
    post_raw(
        app,
        "/chat",
        "application/json",
        serde_json::to_string(&payload).unwrap(),
    )
    .await
}

/// A `multipart/form-data` body with one file field.
pub fn multipart_body(field: &str, filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    (
        format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        body,
    )
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

/// Collects formatted `tracing` output written while a guard from
/// [`CapturedLogs::install`] is alive on the current thread.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

pub struct CapturedWriter(Arc<std::sync::Mutex<Vec<u8>>>);

impl io::Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.0.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || CapturedWriter(sink.clone()))
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

/// A one-shot HTTP endpoint that answers with `status_line`, promises a body
/// longer than it sends and then closes the connection. Returns its URL.
pub async fn truncated_reply_server(status_line: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind truncating server");
    let addr = listener.local_addr().expect("truncating server address");

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };

        // Drain the request so closing the socket does not reset it.
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let Ok(n) = socket.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if request_complete(&request) {
                break;
            }
        }

        let head = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: 200\r\nconnection: close\r\n\r\n{{\"error\":"
        );
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.flush().await;
        let _ = socket.shutdown().await;
    });

    format!("http://{addr}/v1/chat/completions")
}

fn request_complete(raw: &[u8]) -> bool {
    let Some(head_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&raw[..head_end]).to_ascii_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    raw.len() >= head_end + 4 + body_len
}
