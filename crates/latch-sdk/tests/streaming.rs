//! End-to-end tests of the client and chat controller against an
//! in-process mock of the assistant backend.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{stream, StreamExt};
use latch_sdk::{
    AssistantChat, ChatRole, ClientConfig, LatchClient, SdkError, SessionState, TranscriptChange,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

const TIMEOUT: Duration = Duration::from_secs(5);

const ANSWER: &[&str] = &[
    "event: metadata\ndata: {\"run_id\":\"r-1\"}\n\n",
    "event: messages/metadata\ndata: {\"r-1\":{\"metadata\":{}}}\n\nevent: messages/partial\ndata: [{\"content\":\"Hel",
    "lo\",\"type\":\"ai\"}]\n\nevent: messages/partial\ndata: [{\"content\":\"Hello there!\",\"type\":\"ai\"}]\n\n",
    "event: end\n\n",
];

const METADATA: &str = "event: messages/metadata\ndata: {\"r-1\":{}}\n\n";

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

struct Mock {
    reply: fn(&str) -> Response,
    assistant_ok: bool,
    runs: AtomicUsize,
    last_thread: Mutex<Option<Value>>,
    last_run: Mutex<Option<Value>>,
}

impl Mock {
    fn new(reply: fn(&str) -> Response) -> Arc<Self> {
        Self::build(reply, true)
    }

    fn without_assistant(reply: fn(&str) -> Response) -> Arc<Self> {
        Self::build(reply, false)
    }

    fn build(reply: fn(&str) -> Response, assistant_ok: bool) -> Arc<Self> {
        Arc::new(Self {
            reply,
            assistant_ok,
            runs: AtomicUsize::new(0),
            last_thread: Mutex::new(None),
            last_run: Mutex::new(None),
        })
    }
}

fn event_stream(body: Body) -> Response {
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

fn answer(_: &str) -> Response {
    event_stream(Body::from_stream(stream::iter(
        ANSWER.iter().copied().map(Ok::<_, Infallible>),
    )))
}

fn failing(_: &str) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

/// Hangs after one metadata event when asked "first".
fn hang_on_first(text: &str) -> Response {
    if text == "first" {
        let body = stream::iter([Ok::<_, Infallible>(METADATA)]).chain(stream::pending());
        event_stream(Body::from_stream(body))
    } else {
        answer(text)
    }
}

async fn assistant(State(mock): State<Arc<Mock>>, Path(assistant_id): Path<String>) -> Response {
    if !mock.assistant_ok {
        return (StatusCode::NOT_FOUND, "no such assistant").into_response();
    }
    Json(json!({
        "assistant_id": assistant_id,
        "graph_id": "agent",
        "config": {},
    }))
    .into_response()
}

async fn create_thread(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> Json<Value> {
    let thread_id = body["thread_id"].clone();
    *mock.last_thread.lock().unwrap() = Some(body);
    Json(json!({ "thread_id": thread_id, "metadata": {} }))
}

async fn run_stream(
    State(mock): State<Arc<Mock>>,
    Path(_thread_id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let text = body["input"]["messages"][0]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    *mock.last_run.lock().unwrap() = Some(body);
    mock.runs.fetch_add(1, Ordering::SeqCst);
    (mock.reply)(&text)
}

async fn babies(Path(user_id): Path<String>) -> Response {
    if user_id != "42" {
        return (StatusCode::NOT_FOUND, "no babies").into_response();
    }
    Json(json!([{
        "id": 1,
        "userId": 42,
        "name": "Ada",
        "age": 0.25,
        "weight": 5.4,
        "height": 58.0,
        "imageBase": null,
        "birthDate": "2024-06-01",
        "gender": "female",
        "createdAt": "2024-06-02T08:00:00Z",
        "updatedAt": "2024-09-01T08:00:00Z",
        "pumpSessions": [],
        "healthLogs": [],
        "feeds": [{"amount": 90}],
        "sleepLogs": [],
        "tushLogs": [],
    }]))
    .into_response()
}

async fn spawn(mock: Arc<Mock>) -> LatchClient {
    let app = Router::new()
        .route("/api/langgraph/assistants/{assistant_id}", get(assistant))
        .route("/api/langgraph/threads", post(create_thread))
        .route("/api/langgraph/threads/{thread_id}/runs/stream", post(run_stream))
        .route("/api/babies/get-babies/{user_id}", get(babies))
        .with_state(mock);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    LatchClient::new(ClientConfig::default().with_backend_url(format!("http://{addr}/"))).unwrap()
}

async fn wait_for_runs(mock: &Mock, n: usize) {
    timeout(TIMEOUT, async {
        while mock.runs.load(Ordering::SeqCst) < n {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

fn roles(chat: &AssistantChat) -> Vec<ChatRole> {
    chat.transcript().with(|t| t.iter().map(|m| m.role).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_thread_returns_requested_id() {
    let mock = Mock::new(answer);
    let client = spawn(mock.clone()).await;

    let thread_id = client.create_thread().await.unwrap();

    let sent = mock.last_thread.lock().unwrap().clone().unwrap();
    assert_eq!(sent["thread_id"], thread_id.as_str());
    assert_eq!(sent["if_exists"], "raise");
}

#[tokio::test]
async fn fetch_baby_profiles() {
    let client = spawn(Mock::new(answer)).await;

    let profiles = client.fetch_baby_profiles("42").await.unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].name, "Ada");
    assert_eq!(profiles[0].feeds.len(), 1);

    let err = client.fetch_baby_profiles("7").await.unwrap_err();
    match err {
        SdkError::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no babies");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn chat_streams_answer_into_transcript() {
    let mock = Mock::new(answer);
    let client = spawn(mock.clone()).await;
    let profiles = client.fetch_baby_profiles("42").await.unwrap();
    let mut chat = AssistantChat::open(client, profiles).await.unwrap();
    let mut changes = chat.transcript().subscribe();

    assert!(!chat.send("  ").await.unwrap());
    assert!(chat.send("Hi").await.unwrap());
    let summary = timeout(TIMEOUT, chat.wait()).await.unwrap().unwrap().unwrap();

    assert_eq!(summary.state, SessionState::Ended);
    assert_eq!(summary.applied, 2);

    let transcript = chat.transcript().snapshot();
    assert_eq!(
        roles(&chat),
        vec![ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
    );
    assert_eq!(transcript.get(1).unwrap().content, "Hi");
    assert_eq!(transcript.last().unwrap().content, "Hello there!");

    let mut seen = Vec::new();
    while let Ok(change) = changes.try_recv() {
        seen.push(change);
    }
    assert_eq!(
        seen,
        vec![
            TranscriptChange::Appended { index: 1 },
            TranscriptChange::Appended { index: 2 },
            TranscriptChange::Removed { index: 2 },
            TranscriptChange::Appended { index: 2 },
            TranscriptChange::Updated { index: 2 },
        ]
    );

    let run = mock.last_run.lock().unwrap().clone().unwrap();
    assert_eq!(run["assistant_id"], ClientConfig::default().assistant_id);
    assert_eq!(run["input"]["messages"][0], json!({"role": "user", "content": "Hi"}));
    assert_eq!(run["input"]["baby_profiles"][0]["name"], "Ada");
    assert_eq!(run["stream_mode"], json!(["messages"]));
}

#[tokio::test]
async fn error_status_fails_the_session() {
    let client = spawn(Mock::new(failing)).await;
    let mut chat = AssistantChat::open(client, Vec::new()).await.unwrap();

    chat.send("Hi").await.unwrap();
    let err = timeout(TIMEOUT, chat.wait()).await.unwrap().unwrap().unwrap_err();

    assert!(matches!(err, SdkError::Status { status: 500, ref body } if body == "boom"));
    assert!(err.is_transport());
    assert_eq!(roles(&chat), vec![ChatRole::Assistant, ChatRole::User]);
}

#[tokio::test]
async fn assistant_lookup_failure_is_not_fatal() {
    let mock = Mock::without_assistant(answer);
    let client = spawn(mock.clone()).await;

    let chat = AssistantChat::open(client, Vec::new()).await.unwrap();
    let sent = mock.last_thread.lock().unwrap().clone().unwrap();
    assert_eq!(sent["thread_id"], chat.thread_id().as_str());
}

#[tokio::test]
async fn new_message_cancels_the_previous_stream() {
    let mock = Mock::new(hang_on_first);
    let client = spawn(mock.clone()).await;
    let mut chat = AssistantChat::open(client, Vec::new()).await.unwrap();

    chat.send("first").await.unwrap();
    wait_for_runs(&mock, 1).await;
    assert!(chat.is_streaming());
    assert!(chat.transcript().snapshot().has_thinking());

    chat.send("second").await.unwrap();
    let summary = timeout(TIMEOUT, chat.wait()).await.unwrap().unwrap().unwrap();
    assert_eq!(summary.state, SessionState::Ended);

    let transcript = chat.transcript().snapshot();
    assert!(!transcript.has_thinking());
    assert_eq!(
        roles(&chat),
        vec![
            ChatRole::Assistant,
            ChatRole::User,
            ChatRole::User,
            ChatRole::Assistant
        ]
    );
    assert_eq!(transcript.get(2).unwrap().content, "second");
    assert_eq!(transcript.last().unwrap().content, "Hello there!");
}

#[tokio::test]
async fn close_releases_the_placeholder() {
    let mock = Mock::new(hang_on_first);
    let client = spawn(mock.clone()).await;
    let mut chat = AssistantChat::open(client, Vec::new()).await.unwrap();

    chat.send("first").await.unwrap();
    wait_for_runs(&mock, 1).await;
    chat.close().await;

    assert!(!chat.is_streaming());
    assert!(chat.wait().await.is_none());
    assert_eq!(roles(&chat), vec![ChatRole::Assistant, ChatRole::User]);
}
