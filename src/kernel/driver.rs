use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::cancel::StopSignal;
use super::gate::{InterventionGate, InterventionRequest};
use super::message::{Message, MessageLog, Speaker};
use super::phase::{PhaseGraph, PhaseRequest, RunPhase};
use super::run::{ConversationRun, RunOutcome};
use super::segment::Segment;
use super::telemetry::event::{InterventionEventKind, RunEventKind, TelemetryEvent};
use super::telemetry::metrics::TelemetrySnapshot;
use super::telemetry::recorder::TelemetryRecorder;
use crate::audio::PlaybackQueue;
use crate::config::ClientConfig;
use crate::error::{ApiError, GateError};
use crate::services::api::{ChatRequest, DirectorInfo, ScamApi, SessionInfo};

/// What the driver tells whoever renders the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    LogReset,
    MessageAppended(Message),
    PhaseChanged { from: RunPhase, to: RunPhase },
    TurnNumber(u32),
    InterventionRequested(InterventionRequest),
    InterventionResolved { choice: Option<String> },
    Director(DirectorInfo),
    RunFinished(RunOutcome),
}

/// What currently owns the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    Idle = 0,
    Running = 1,
    Manual = 2,
}

/// Single busy state shared by `start` and `send_manual`. Claims and
/// releases are compare-exchanges, so at most one activity holds it.
struct ActivityFlag(AtomicU8);

impl ActivityFlag {
    fn new() -> Self {
        Self(AtomicU8::new(Activity::Idle as u8))
    }

    fn current(&self) -> Activity {
        match self.0.load(Ordering::SeqCst) {
            1 => Activity::Running,
            2 => Activity::Manual,
            _ => Activity::Idle,
        }
    }

    fn claim(&self, activity: Activity) -> bool {
        self.0
            .compare_exchange(Activity::Idle as u8, activity as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// No-op unless `activity` is the current holder.
    fn release(&self, activity: Activity) {
        let _ = self
            .0
            .compare_exchange(activity as u8, Activity::Idle as u8, Ordering::SeqCst, Ordering::SeqCst);
    }
}

/// The run currently owning the driver's flags.
struct ActiveRun {
    id: Uuid,
    stop: StopSignal,
}

struct DriverInner {
    api: Arc<dyn ScamApi>,
    queue: Arc<PlaybackQueue>,
    gate: InterventionGate,
    session: Mutex<Option<String>>,
    log: Mutex<MessageLog>,
    phase: Mutex<RunPhase>,
    current_run: Mutex<Option<ActiveRun>>,
    telemetry: Mutex<TelemetryRecorder>,
    activity: ActivityFlag,
    loading: AtomicBool,
    turn_number: AtomicU32,
    events: mpsc::UnboundedSender<DriverEvent>,
    fallback_text: String,
    chat_constraint: String,
}

/// Sequences the autonomous conversation and the manual exchange.
///
/// Cheap to clone; clones share one conversation. `start()` suspends for the
/// whole run, so `stop()` and intervention answers come from other clones.
/// The message log and turn counter are only written from here.
#[derive(Clone)]
pub struct ConversationDriver {
    inner: Arc<DriverInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConversationDriver {
    pub fn new(
        api: Arc<dyn ScamApi>,
        queue: Arc<PlaybackQueue>,
        config: &ClientConfig,
    ) -> (Self, mpsc::UnboundedReceiver<DriverEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let inner = DriverInner {
            api,
            queue,
            gate: InterventionGate::new(),
            session: Mutex::new(None),
            log: Mutex::new(MessageLog::new()),
            phase: Mutex::new(RunPhase::default()),
            current_run: Mutex::new(None),
            telemetry: Mutex::new(TelemetryRecorder::new()),
            activity: ActivityFlag::new(),
            loading: AtomicBool::new(false),
            turn_number: AtomicU32::new(0),
            events,
            fallback_text: config.fallback_text.clone(),
            chat_constraint: config.chat_constraint.clone(),
        };
        (Self { inner: Arc::new(inner) }, receiver)
    }

    // --- Session ---

    /// Creates the backend session. On failure the session stays unset and
    /// every control below is a no-op.
    pub async fn open_session(&self) -> Option<String> {
        match self.inner.api.create_session().await {
            Ok(session_id) => {
                info!(%session_id, "session created");
                *lock(&self.inner.session) = Some(session_id.clone());
                Some(session_id)
            }
            Err(e) => {
                error!(error = %e, "could not create a session; controls disabled");
                None
            }
        }
    }

    pub async fn close_session(&self) {
        let Some(session_id) = lock(&self.inner.session).take() else {
            return;
        };
        if let Err(e) = self.inner.api.delete_session(&session_id).await {
            debug!(error = %e, "session delete failed, ignoring");
        }
    }

    pub async fn session_info(&self) -> Result<Option<SessionInfo>, ApiError> {
        match self.session_id() {
            Some(session_id) => self.inner.api.session_info(&session_id).await.map(Some),
            None => Ok(None),
        }
    }

    pub fn session_id(&self) -> Option<String> {
        lock(&self.inner.session).clone()
    }

    // --- Observation ---

    pub fn is_running(&self) -> bool {
        self.inner.activity.current() == Activity::Running
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    pub fn turn_number(&self) -> u32 {
        self.inner.turn_number.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> RunPhase {
        *lock(&self.inner.phase)
    }

    pub fn messages(&self) -> Vec<Message> {
        lock(&self.inner.log).snapshot()
    }

    pub fn queue(&self) -> &PlaybackQueue {
        &self.inner.queue
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        lock(&self.inner.telemetry).snapshot()
    }

    pub fn telemetry_events(&self) -> Vec<TelemetryEvent> {
        lock(&self.inner.telemetry).events()
    }

    // --- Intervention ---

    pub fn pending_intervention(&self) -> Option<InterventionRequest> {
        self.inner.gate.pending()
    }

    /// Answers the pending intervention with the choice at 0-based `index`.
    pub fn resolve_intervention(&self, index: usize) -> Result<String, GateError> {
        self.inner.gate.resolve(index)
    }

    pub fn resolve_intervention_label(&self, label: &str) -> Result<String, GateError> {
        self.inner.gate.resolve_label(label)
    }

    // --- Autonomous run ---

    /// Runs the autonomous conversation until the backend completes it,
    /// `stop()` is called, or a backend call fails.
    pub async fn start(&self) {
        let Some(session_id) = self.session_id() else {
            debug!("start ignored: no session");
            return;
        };
        if !self.inner.activity.claim(Activity::Running) {
            debug!(busy = ?self.inner.activity.current(), "start ignored");
            return;
        }

        let mut run = ConversationRun::new();
        *lock(&self.inner.current_run) = Some(ActiveRun {
            id: run.id,
            stop: run.stop.clone(),
        });
        info!(run_id = %run.id, %session_id, "run started");

        lock(&self.inner.log).reset();
        self.emit(DriverEvent::LogReset);
        self.set_turn_number(&mut run, 0);
        self.inner.loading.store(true, Ordering::SeqCst);
        self.advance(&run, PhaseRequest::Start);
        self.record(TelemetryEvent::RunLifecycle {
            run_id: run.id,
            event: RunEventKind::Started,
        });

        let outcome = match self.drive(&session_id, &mut run).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(run_id = %run.id, error = %e, "run aborted");
                if self.is_current(&run) && !run.stop.is_requested() {
                    let fallback = self.inner.fallback_text.clone();
                    self.append(Speaker::Persona, fallback, None);
                }
                RunOutcome::Failed
            }
        };

        self.finish(&run, outcome);
    }

    async fn drive(&self, session_id: &str, run: &mut ConversationRun) -> Result<RunOutcome, ApiError> {
        let opening = self.inner.api.start_run(session_id).await?;
        self.append_for(run, Speaker::Scammer, opening.scammer_text, Some(opening.scammer_segments.clone()));
        self.set_loading(run, false);
        self.play(&opening.scammer_segments).await;

        let mut complete = false;
        while !complete && !run.stop.is_requested() {
            self.advance(run, PhaseRequest::AwaitTurn);
            self.set_loading(run, true);

            let choice = run.take_pending_choice();
            let turn = self.inner.api.next_turn(session_id, choice.as_deref()).await?;
            self.set_turn_number(run, turn.turn_number);
            self.set_loading(run, false);
            self.record(TelemetryEvent::TurnReceived {
                run_id: run.id,
                turn_number: turn.turn_number,
                intervention: turn.intervention_required.is_some(),
                complete: turn.is_complete,
            });
            if let Some(info) = turn.director_info.clone() {
                self.emit(DriverEvent::Director(info));
            }

            if run.stop.is_requested() {
                break;
            }

            self.advance(run, PhaseRequest::TurnReceived);
            self.append_for(run, Speaker::Persona, turn.victim_text.clone(), Some(turn.victim_segments.clone()));
            self.play(&turn.victim_segments).await;

            if run.stop.is_requested() {
                break;
            }

            // Checked before is_complete: an intervention keeps the run going.
            if let Some(request) = turn.intervention_required {
                self.advance(run, PhaseRequest::InterventionRequired);
                match self.await_intervention(run, request).await {
                    Some(choice) => {
                        run.set_pending_choice(choice);
                        continue;
                    }
                    None => break,
                }
            }

            if !turn.is_complete && !turn.scammer_text.is_empty() {
                self.advance(run, PhaseRequest::ScammerReply);
                self.append_for(run, Speaker::Scammer, turn.scammer_text, Some(turn.scammer_segments.clone()));
                self.play(&turn.scammer_segments).await;
            }

            complete = turn.is_complete;
        }

        Ok(if complete { RunOutcome::Completed } else { RunOutcome::Stopped })
    }

    async fn await_intervention(&self, run: &ConversationRun, request: InterventionRequest) -> Option<String> {
        let choices = request.choices.len();
        let waiter = self.inner.gate.open(request.clone());

        // stop() may have run between the last checkpoint and open().
        if run.stop.is_requested() {
            self.inner.gate.cancel();
        }

        info!(run_id = %run.id, choices, "waiting for intervention");
        self.record(TelemetryEvent::Intervention {
            run_id: run.id,
            event: InterventionEventKind::Opened { choices },
        });
        self.emit(DriverEvent::InterventionRequested(request));

        let choice = waiter.wait().await;
        self.record(TelemetryEvent::Intervention {
            run_id: run.id,
            event: match choice {
                Some(_) => InterventionEventKind::Resolved,
                None => InterventionEventKind::Cancelled,
            },
        });
        self.emit(DriverEvent::InterventionResolved { choice: choice.clone() });
        choice
    }

    /// Requests a cooperative stop. Flags clear at once; the loop itself
    /// exits at its next checkpoint. The backend is told best-effort.
    pub async fn stop(&self) {
        let Some(session_id) = self.session_id() else {
            return;
        };

        let run_id = lock(&self.inner.current_run).as_ref().map(|active| {
            active.stop.request();
            active.id
        });
        if let Some(run_id) = run_id {
            info!(%run_id, "stop requested");
            self.advance_current(run_id, PhaseRequest::Stop);
        }
        self.inner.gate.cancel();

        self.inner.activity.release(Activity::Running);
        self.inner.loading.store(false, Ordering::SeqCst);

        if let Err(e) = self.inner.api.stop_run(&session_id).await {
            debug!(error = %e, "stop notification failed, ignoring");
        }
    }

    fn finish(&self, run: &ConversationRun, outcome: RunOutcome) {
        info!(run_id = %run.id, ?outcome, turn = run.turn_number, "run finished");
        self.record(TelemetryEvent::RunLifecycle {
            run_id: run.id,
            event: match outcome {
                RunOutcome::Completed => RunEventKind::Completed,
                RunOutcome::Stopped => RunEventKind::Stopped,
                RunOutcome::Failed => RunEventKind::Failed,
            },
        });

        if !self.is_current(run) {
            debug!(run_id = %run.id, "superseded run finished");
            return;
        }
        self.advance(
            run,
            match outcome {
                RunOutcome::Completed => PhaseRequest::RunCompleted,
                _ => PhaseRequest::RunEnded,
            },
        );
        self.inner.activity.release(Activity::Running);
        self.inner.loading.store(false, Ordering::SeqCst);
        self.emit(DriverEvent::RunFinished(outcome));
    }

    // --- Manual exchange ---

    /// Sends one scammer line and plays the persona's reply. Ignored when
    /// the text is blank, there is no session, or the driver is busy.
    pub async fn send_manual(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let Some(session_id) = self.session_id() else {
            debug!("manual message ignored: no session");
            return;
        };
        if !self.inner.activity.claim(Activity::Manual) {
            debug!(busy = ?self.inner.activity.current(), "manual message ignored");
            return;
        }

        self.append(Speaker::Scammer, text, None);
        self.inner.loading.store(true, Ordering::SeqCst);

        let request = ChatRequest {
            session_id,
            user_input: text.to_string(),
            constraint: self.inner.chat_constraint.clone(),
        };
        match self.inner.api.chat(&request).await {
            Ok(reply) => {
                self.inner.loading.store(false, Ordering::SeqCst);
                if let Some(info) = reply.director_info.clone() {
                    self.emit(DriverEvent::Director(info));
                }
                self.append(Speaker::Persona, reply.raw_text, Some(reply.segments.clone()));
                self.play(&reply.segments).await;
            }
            Err(e) => {
                warn!(error = %e, "manual exchange failed");
                self.inner.loading.store(false, Ordering::SeqCst);
                let fallback = self.inner.fallback_text.clone();
                self.append(Speaker::Persona, fallback, None);
            }
        }

        self.inner.activity.release(Activity::Manual);
    }

    // --- Internals ---

    async fn play(&self, segments: &[Segment]) {
        let report = self.inner.queue.play(segments).await;
        if report.failures.is_empty() {
            return;
        }
        let mut telemetry = lock(&self.inner.telemetry);
        for failure in report.failures {
            telemetry.record(TelemetryEvent::SegmentFailed {
                index: failure.index,
                kind: failure.kind,
            });
        }
    }

    fn is_current(&self, run: &ConversationRun) -> bool {
        lock(&self.inner.current_run)
            .as_ref()
            .is_some_and(|active| active.id == run.id)
    }

    fn append(&self, speaker: Speaker, text: impl Into<String>, segments: Option<Vec<Segment>>) -> Message {
        let message = lock(&self.inner.log).append(speaker, text, segments);
        self.emit(DriverEvent::MessageAppended(message.clone()));
        message
    }

    /// Appends on behalf of `run`; a superseded run writes nothing.
    fn append_for(&self, run: &ConversationRun, speaker: Speaker, text: String, segments: Option<Vec<Segment>>) {
        if self.is_current(run) {
            self.append(speaker, text, segments);
        }
    }

    fn set_loading(&self, run: &ConversationRun, loading: bool) {
        if self.is_current(run) && !run.stop.is_requested() {
            self.inner.loading.store(loading, Ordering::SeqCst);
        }
    }

    fn set_turn_number(&self, run: &mut ConversationRun, turn_number: u32) {
        run.turn_number = turn_number;
        if self.is_current(run) {
            self.inner.turn_number.store(turn_number, Ordering::SeqCst);
            self.emit(DriverEvent::TurnNumber(turn_number));
        }
    }

    fn advance(&self, run: &ConversationRun, request: PhaseRequest) {
        self.advance_current(run.id, request);
    }

    fn advance_current(&self, run_id: Uuid, request: PhaseRequest) {
        let is_current = lock(&self.inner.current_run)
            .as_ref()
            .is_some_and(|active| active.id == run_id);
        if !is_current {
            return;
        }

        let transition = {
            let mut phase = lock(&self.inner.phase);
            let from = *phase;
            match PhaseGraph::transition(from, request) {
                Some(to) => {
                    *phase = to;
                    Some((from, to))
                }
                None => None,
            }
        };

        match transition {
            Some((from, to)) => {
                debug!(?from, ?to, "phase");
                self.record(TelemetryEvent::PhaseTransition { from, to });
                self.emit(DriverEvent::PhaseChanged { from, to });
            }
            None => debug!(?request, phase = ?self.phase(), "phase request ignored"),
        }
    }

    fn record(&self, event: TelemetryEvent) {
        lock(&self.inner.telemetry).record(event);
    }

    fn emit(&self, event: DriverEvent) {
        // Nobody listening is fine.
        let _ = self.inner.events.send(event);
    }
}
