#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jeanne::audio::{AudioSink, PlayableSource, PlaybackProgress, PlaybackQueue};
use jeanne::error::{ApiError, PlaybackError};
use jeanne::kernel::driver::{ConversationDriver, DriverEvent};
use jeanne::services::api::{ChatRequest, ChatResponse, ScamApi, SessionInfo, StartResponse, TurnResponse};
use jeanne::{ClientConfig, Segment};
use reqwest::Url;
use tokio::sync::{mpsc, watch, Notify};

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    CreateSession,
    SessionInfo(String),
    DeleteSession(String),
    Chat { input: String, constraint: String },
    StartRun(String),
    NextTurn { choice: Option<String> },
    StopRun(String),
}

pub fn backend_down() -> ApiError {
    ApiError::Status {
        endpoint: "/api/test".to_string(),
        status: 503,
        body: "backend down".to_string(),
    }
}

/// Backend double answering from a script. An exhausted turn script
/// answers with an error.
pub struct ScriptedApi {
    pub calls: Mutex<Vec<ApiCall>>,
    session_ok: bool,
    opening: Mutex<Option<StartResponse>>,
    turns: Mutex<VecDeque<TurnResponse>>,
    chat_reply: Mutex<Option<ChatResponse>>,
    /// When set, each next_turn waits for a permit before answering.
    pub hold_turns: Option<Arc<Notify>>,
    /// Signalled every time a next_turn request arrives.
    pub turn_requested: Arc<Notify>,
    /// When set, each chat waits for a permit before answering.
    pub hold_chat: Option<Arc<Notify>>,
    pub chat_requested: Arc<Notify>,
}

impl ScriptedApi {
    pub fn new(opening: StartResponse, turns: Vec<TurnResponse>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            session_ok: true,
            opening: Mutex::new(Some(opening)),
            turns: Mutex::new(turns.into()),
            chat_reply: Mutex::new(None),
            hold_turns: None,
            turn_requested: Arc::new(Notify::new()),
            hold_chat: None,
            chat_requested: Arc::new(Notify::new()),
        }
    }

    pub fn without_session() -> Self {
        Self {
            session_ok: false,
            ..Self::new(opening("Bonjour"), Vec::new())
        }
    }

    pub fn holding_turns(mut self) -> (Self, Arc<Notify>) {
        let hold = Arc::new(Notify::new());
        self.hold_turns = Some(hold.clone());
        (self, hold)
    }

    pub fn holding_chat(mut self) -> (Self, Arc<Notify>) {
        let hold = Arc::new(Notify::new());
        self.hold_chat = Some(hold.clone());
        (self, hold)
    }

    pub fn with_chat_reply(self, reply: ChatResponse) -> Self {
        *self.chat_reply.lock().unwrap() = Some(reply);
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls().iter().filter(|call| pred(call)).count()
    }

    pub fn turn_calls(&self) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::NextTurn { choice } => Some(choice),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ScamApi for ScriptedApi {
    async fn create_session(&self) -> Result<String, ApiError> {
        self.push(ApiCall::CreateSession);
        if self.session_ok {
            Ok("session-1".to_string())
        } else {
            Err(backend_down())
        }
    }

    async fn session_info(&self, session_id: &str) -> Result<SessionInfo, ApiError> {
        self.push(ApiCall::SessionInfo(session_id.to_string()));
        Ok(SessionInfo {
            session_id: session_id.to_string(),
            turn_count: 0,
            active: true,
            scam_type: None,
            current_stage: None,
            current_objective: None,
        })
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        self.push(ApiCall::DeleteSession(session_id.to_string()));
        Ok(())
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.push(ApiCall::Chat {
            input: request.user_input.clone(),
            constraint: request.constraint.clone(),
        });
        self.chat_requested.notify_one();
        if let Some(hold) = &self.hold_chat {
            hold.notified().await;
        }
        self.chat_reply.lock().unwrap().clone().ok_or_else(backend_down)
    }

    async fn start_run(&self, session_id: &str) -> Result<StartResponse, ApiError> {
        self.push(ApiCall::StartRun(session_id.to_string()));
        self.opening.lock().unwrap().clone().ok_or_else(backend_down)
    }

    async fn next_turn(&self, _session_id: &str, choice: Option<&str>) -> Result<TurnResponse, ApiError> {
        self.push(ApiCall::NextTurn {
            choice: choice.map(str::to_string),
        });
        self.turn_requested.notify_one();
        if let Some(hold) = &self.hold_turns {
            hold.notified().await;
        }
        self.turns.lock().unwrap().pop_front().ok_or_else(backend_down)
    }

    async fn stop_run(&self, session_id: &str) -> Result<(), ApiError> {
        self.push(ApiCall::StopRun(session_id.to_string()));
        // Stop notifications failing must not matter.
        Err(backend_down())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Played {
    pub source: PlayableSource,
    pub progress: Option<PlaybackProgress>,
    /// Bytes of a clip, read while it was playing.
    pub clip_bytes: Option<Vec<u8>>,
}

/// Output double: records every source and fails the calls it is told to.
#[derive(Default)]
pub struct RecordingSink {
    pub played: Mutex<Vec<Played>>,
    fail_calls: Mutex<HashSet<usize>>,
    fail_all: bool,
    progress: Mutex<Option<watch::Receiver<PlaybackProgress>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn fail_call(&self, call: usize) {
        self.fail_calls.lock().unwrap().insert(call);
    }

    pub fn observe(&self, queue: &PlaybackQueue) {
        *self.progress.lock().unwrap() = Some(queue.subscribe());
    }

    pub fn played(&self) -> Vec<Played> {
        self.played.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, source: PlayableSource) -> Result<(), PlaybackError> {
        let progress = self.progress.lock().unwrap().as_ref().map(|rx| *rx.borrow());
        let clip_bytes = match &source {
            PlayableSource::Clip(path) => std::fs::read(path).ok(),
            PlayableSource::Remote(_) => None,
        };
        let call = {
            let mut played = self.played.lock().unwrap();
            played.push(Played {
                source,
                progress,
                clip_bytes,
            });
            played.len() - 1
        };

        if self.fail_all || self.fail_calls.lock().unwrap().contains(&call) {
            return Err(PlaybackError::Sink(format!("call {call} failed")));
        }
        Ok(())
    }
}

pub fn origin() -> Url {
    Url::parse("http://localhost:8000").unwrap()
}

pub fn opening(text: &str) -> StartResponse {
    StartResponse {
        session_id: "session-1".to_string(),
        scammer_segments: vec![Segment::text(text)],
        scammer_text: text.to_string(),
    }
}

pub struct Harness {
    pub driver: ConversationDriver,
    pub events: mpsc::UnboundedReceiver<DriverEvent>,
    pub api: Arc<ScriptedApi>,
    pub sink: Arc<RecordingSink>,
    pub clip_dir: tempfile::TempDir,
}

impl Harness {
    pub async fn new(api: ScriptedApi) -> Self {
        let api = Arc::new(api);
        let sink = Arc::new(RecordingSink::new());
        let clip_dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            clip_dir: clip_dir.path().to_path_buf(),
            ..ClientConfig::default()
        };
        let queue = Arc::new(PlaybackQueue::from_config(sink.clone(), origin(), &config));
        let (driver, events) = ConversationDriver::new(api.clone(), queue, &config);
        driver.open_session().await;
        Self {
            driver,
            events,
            api,
            sink,
            clip_dir,
        }
    }

    /// Waits for the next event matching `pred`, skipping the rest.
    pub async fn wait_for(&mut self, pred: impl Fn(&DriverEvent) -> bool) -> DriverEvent {
        loop {
            let event = self.events.recv().await.expect("driver event channel closed");
            if pred(&event) {
                return event;
            }
        }
    }
}
