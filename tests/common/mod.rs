// Shared fixtures: a fake transcoder served by axum and recording player mocks.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};

use ma_multiview_engine::engine::surface::{
    AdaptiveSession, PlayRejected, PlaybackSurface, PlayerBackend,
};
use ma_multiview_engine::{EntryId, ViewerEvent};

/// How the fake transcoder answers `POST /start_hls/`.
#[derive(Clone)]
pub enum Reply {
    /// Always the same stream id.
    Session(&'static str),
    /// `sess-1`, `sess-2`, ...
    Sequential,
    /// Non-success status with the given body.
    Status(u16, &'static str),
    /// 200 with an arbitrary body.
    Raw(&'static str),
    /// Stream id after a delay.
    Delayed(Duration, &'static str),
}

#[derive(Clone)]
struct FakeState {
    reply: Reply,
    counter: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<Value>>>,
    stops: Arc<Mutex<Vec<String>>>,
}

pub struct FakeTranscoder {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<Value>>>,
    pub stops: Arc<Mutex<Vec<String>>>,
}

impl FakeTranscoder {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn manifest_url(&self, stream_id: &str) -> String {
        format!("{}/media/hls_media/{}/stream.m3u8", self.base_url(), stream_id)
    }
}

async fn start_hls(State(state): State<FakeState>, Json(body): Json<Value>) -> Response {
    state.requests.lock().push(body);
    match state.reply {
        Reply::Session(id) => Json(json!({
            "stream_id": id,
            "playlist_url": format!("/media/hls_media/{}/stream.m3u8", id),
        }))
        .into_response(),
        Reply::Sequential => {
            let n = state.counter.fetch_add(1, Ordering::Relaxed) + 1;
            Json(json!({ "stream_id": format!("sess-{}", n) })).into_response()
        }
        Reply::Status(code, body) => {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, body.to_string()).into_response()
        }
        Reply::Raw(body) => (StatusCode::OK, body.to_string()).into_response(),
        Reply::Delayed(delay, id) => {
            tokio::time::sleep(delay).await;
            Json(json!({ "stream_id": id })).into_response()
        }
    }
}

async fn stop_hls(State(state): State<FakeState>, Path(stream_id): Path<String>) -> impl IntoResponse {
    state.stops.lock().push(stream_id);
    Json(json!({ "message": "Stream stopped and cleaned up successfully" }))
}

pub async fn start_transcoder(reply: Reply) -> FakeTranscoder {
    let state = FakeState {
        reply,
        counter: Arc::new(AtomicU32::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
        stops: Arc::new(Mutex::new(Vec::new())),
    };
    let requests = state.requests.clone();
    let stops = state.stops.clone();

    let app = Router::new()
        .route("/start_hls/", post(start_hls))
        .route("/stop_hls/{stream_id}/", post(stop_hls))
        .with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    FakeTranscoder {
        addr,
        requests,
        stops,
    }
}

/// Address nobody listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Every call made on mocks, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateSession(EntryId),
    LoadSource(EntryId, String),
    AttachMedia(EntryId),
    StartLoad(EntryId),
    RecoverMedia(EntryId),
    Destroy(EntryId),
    Play(EntryId),
    Pause(EntryId),
    SetSource(EntryId, String),
    Release(EntryId),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn count(log: &CallLog, call: &Call) -> usize {
    log.lock().iter().filter(|c| *c == call).count()
}

pub struct MockSurface {
    entry: EntryId,
    log: CallLog,
    native: bool,
    reject_play: bool,
}

impl MockSurface {
    pub fn boxed(entry: EntryId, log: &CallLog) -> Box<dyn PlaybackSurface> {
        Box::new(Self {
            entry,
            log: log.clone(),
            native: false,
            reject_play: false,
        })
    }

    pub fn native(entry: EntryId, log: &CallLog) -> Box<dyn PlaybackSurface> {
        Box::new(Self {
            entry,
            log: log.clone(),
            native: true,
            reject_play: false,
        })
    }

    pub fn autoplay_blocked(entry: EntryId, log: &CallLog) -> Box<dyn PlaybackSurface> {
        Box::new(Self {
            entry,
            log: log.clone(),
            native: false,
            reject_play: true,
        })
    }
}

impl PlaybackSurface for MockSurface {
    fn play(&mut self) -> Result<(), PlayRejected> {
        self.log.lock().push(Call::Play(self.entry));
        if self.reject_play {
            Err(PlayRejected("NotAllowedError".to_string()))
        } else {
            Ok(())
        }
    }

    fn pause(&mut self) {
        self.log.lock().push(Call::Pause(self.entry));
    }

    fn can_play_native_hls(&self) -> bool {
        self.native
    }

    fn set_source(&mut self, url: &str) {
        self.log.lock().push(Call::SetSource(self.entry, url.to_string()));
    }

    fn release(&mut self) {
        self.log.lock().push(Call::Release(self.entry));
    }
}

struct MockSession {
    entry: EntryId,
    log: CallLog,
}

impl AdaptiveSession for MockSession {
    fn load_source(&mut self, manifest_url: &str) {
        self.log
            .lock()
            .push(Call::LoadSource(self.entry, manifest_url.to_string()));
    }

    fn attach_media(&mut self, _surface: &mut dyn PlaybackSurface) {
        self.log.lock().push(Call::AttachMedia(self.entry));
    }

    fn start_load(&mut self) {
        self.log.lock().push(Call::StartLoad(self.entry));
    }

    fn recover_media_error(&mut self) {
        self.log.lock().push(Call::RecoverMedia(self.entry));
    }

    fn destroy(&mut self) {
        self.log.lock().push(Call::Destroy(self.entry));
    }
}

pub struct MockPlayer {
    log: CallLog,
    supported: bool,
}

impl MockPlayer {
    pub fn new(log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            log: log.clone(),
            supported: true,
        })
    }

    pub fn unsupported(log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            log: log.clone(),
            supported: false,
        })
    }
}

impl PlayerBackend for MockPlayer {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create_session(&self, entry: EntryId) -> Box<dyn AdaptiveSession> {
        self.log.lock().push(Call::CreateSession(entry));
        Box::new(MockSession {
            entry,
            log: self.log.clone(),
        })
    }
}

/// Wait (bounded) for the first event matching `pred`.
pub async fn wait_for<F>(rx: &mut broadcast::Receiver<ViewerEvent>, mut pred: F) -> ViewerEvent
where
    F: FnMut(&ViewerEvent) -> bool,
{
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await;
    waited.expect("timed out waiting for registry event")
}

/// Poll `check` until it holds or a few seconds pass.
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..250 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
