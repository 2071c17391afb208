//! Core state machine implementation
//!
//! Handles transitions between Idle, Recording, Processing and Speaking
//! in response to toggle events. Every cycle that leaves Idle returns to
//! Idle, whatever the remote services do.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, watch, Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use super::Endpoints;
use crate::client::{ClientError, Services};
use crate::events::{SessionEvent, Stage};
use crate::transcript::{ConversationTurn, TranscriptSink, NO_ANSWER_MARKER};

/// The four possible states of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Waiting for the toggle key
    #[default]
    Idle,
    /// Audio is being captured
    Recording,
    /// Transcription and language model in flight
    Processing,
    /// Answer is being spoken
    Speaking,
}

impl State {
    /// Whether a toggle in this state is ignored
    pub fn is_busy(&self) -> bool {
        matches!(self, State::Processing | State::Speaking)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::Recording => write!(f, "Recording"),
            State::Processing => write!(f, "Processing"),
            State::Speaking => write!(f, "Speaking"),
        }
    }
}

/// Mutable part of the session, guarded for the whole of a toggle
#[derive(Debug, Default)]
struct Session {
    state: State,
    /// Time when the current recording was acknowledged
    recording_started_at: Option<Instant>,
}

/// Exclusive claim on the session for one toggle
///
/// Taken synchronously by [`SessionMachine::claim_toggle`] so a toggle
/// counts as in flight before its task is ever polled.
pub struct ToggleClaim(OwnedMutexGuard<Session>);

#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
struct CycleError {
    stage: Stage,
    #[source]
    source: ClientError,
}

impl CycleError {
    fn at(stage: Stage) -> impl FnOnce(ClientError) -> Self {
        move |source| Self { stage, source }
    }
}

/// The state machine that drives one user's conversation
pub struct SessionMachine<S, T> {
    identity: String,
    endpoints: Endpoints,
    services: S,
    transcript: T,
    session: Arc<Mutex<Session>>,
    state_tx: watch::Sender<State>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl<S: Services, T: TranscriptSink> SessionMachine<S, T> {
    /// Create a session for a verified identity
    pub fn new(
        identity: impl Into<String>,
        endpoints: Endpoints,
        services: S,
        transcript: T,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let identity = identity.into();
        info!(%identity, "session started");

        Self {
            identity,
            endpoints,
            services,
            transcript,
            session: Arc::new(Mutex::new(Session::default())),
            state_tx: watch::channel(State::Idle).0,
            event_tx,
        }
    }

    /// Get the current state
    pub fn state(&self) -> State {
        *self.state_tx.borrow()
    }

    /// Watch state changes without taking the session lock
    pub fn watch_state(&self) -> watch::Receiver<State> {
        self.state_tx.subscribe()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    pub fn transcript(&self) -> &T {
        &self.transcript
    }

    /// Handle one press of the toggle key
    ///
    /// Starts a recording from Idle, or stops it and runs the whole
    /// transcription/answer/speech cycle from Recording. Ignored while
    /// another toggle is in flight.
    pub async fn toggle(&self) {
        if let Some(claim) = self.claim_toggle() {
            self.run_toggle(claim).await;
        }
    }

    /// Claim the session for a toggle; `None` while another one is in flight
    pub fn claim_toggle(&self) -> Option<ToggleClaim> {
        match Arc::clone(&self.session).try_lock_owned() {
            Ok(guard) => Some(ToggleClaim(guard)),
            Err(_) => {
                debug!(state = %self.state(), "toggle ignored, operation in flight");
                None
            }
        }
    }

    /// Run a claimed toggle to completion
    pub async fn run_toggle(&self, claim: ToggleClaim) {
        let ToggleClaim(mut session) = claim;

        match session.state {
            State::Idle => self.start_recording(&mut session).await,
            State::Recording => self.stop_and_process(&mut session).await,
            State::Processing | State::Speaking => {
                debug!(state = %session.state, "toggle ignored while busy");
            }
        }
    }

    /// Whether a toggle currently holds the session
    pub fn is_in_flight(&self) -> bool {
        self.session.try_lock().is_err()
    }

    /// Wait until no toggle holds the session
    pub async fn wait_settled(&self) {
        drop(self.session.lock().await);
    }

    async fn start_recording(&self, session: &mut Session) {
        info!("starting recording");

        match self.services.start_recording(&self.endpoints.whisper_url).await {
            Ok(true) => {
                session.recording_started_at = Some(Instant::now());
                self.transition_to(session, State::Recording);
                self.emit(SessionEvent::RecordingStarted);
            }
            Ok(false) => {
                error!("transcription service did not acknowledge recording start");
                self.emit(SessionEvent::CycleFailed {
                    stage: Stage::StartRecording,
                    reason: "not acknowledged".to_string(),
                });
            }
            Err(e) => {
                error!(error = %e, "failed to start recording");
                self.emit(SessionEvent::CycleFailed {
                    stage: Stage::StartRecording,
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn stop_and_process(&self, session: &mut Session) {
        info!("stopping recording and processing");

        let duration_ms = session
            .recording_started_at
            .take()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        self.transition_to(session, State::Processing);
        self.emit(SessionEvent::RecordingStopped { duration_ms });

        let stopped_at = Instant::now();
        if let Err(e) = self.run_cycle(session).await {
            error!(stage = %e.stage, error = %e.source, "cycle failed");
            self.emit(SessionEvent::CycleFailed {
                stage: e.stage,
                reason: e.source.to_string(),
            });
        }

        self.transition_to(session, State::Idle);
        self.emit(SessionEvent::CycleCompleted {
            duration_ms: stopped_at.elapsed().as_millis() as u64,
        });
    }

    /// Transcribe, ask, speak. Returning leaves the state to the caller.
    async fn run_cycle(&self, session: &mut Session) -> Result<(), CycleError> {
        let transcription = self
            .services
            .stop_recording(&self.endpoints.whisper_url)
            .await
            .map_err(CycleError::at(Stage::StopRecording))?;

        if transcription.is_empty() {
            warn!("no text detected in transcription");
            return Ok(());
        }

        info!(identity = %self.identity, %transcription, "transcription received");
        self.emit(SessionEvent::TranscriptionReceived {
            chars: transcription.chars().count(),
        });
        self.record(ConversationTurn::user(&transcription));

        info!("querying language model");
        let answer = self
            .services
            .query_language_model(&self.endpoints.llm_url, &transcription)
            .await
            .map_err(CycleError::at(Stage::LanguageModel))?;

        if answer.is_empty() {
            error!("received no answer from language model");
            self.record(ConversationTurn::assistant(NO_ANSWER_MARKER));
            return Ok(());
        }

        info!(%answer, "language model answered");
        self.emit(SessionEvent::AnswerReceived {
            chars: answer.chars().count(),
        });
        self.record(ConversationTurn::assistant(&answer));

        self.transition_to(session, State::Speaking);
        info!("synthesizing speech");
        let acknowledged = self
            .services
            .speak(&self.endpoints.tts_url, &answer)
            .await
            .map_err(CycleError::at(Stage::Speech))?;

        if acknowledged {
            info!("answer spoken");
        } else {
            error!("speech service did not acknowledge");
        }
        self.emit(SessionEvent::SpeechFinished { acknowledged });

        Ok(())
    }

    /// Append a turn; a transcript failure never interrupts the cycle
    fn record(&self, turn: ConversationTurn) {
        if let Err(e) = self.transcript.append(&turn) {
            error!(error = %e, speaker = %turn.speaker, "failed to record transcript turn");
        }
    }

    /// Perform a state transition
    fn transition_to(&self, session: &mut Session, new_state: State) {
        let old_state = session.state;
        if old_state == new_state {
            return;
        }

        info!(from = %old_state, to = %new_state, "state transition");
        session.state = new_state;
        self.state_tx.send_replace(new_state);
    }

    fn emit(&self, event: SessionEvent) {
        debug!(%event, "emitting session event");
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;
    use crate::testing::{call_failure, test_endpoints, FakeServices};
    use crate::transcript::{MemoryTranscript, Speaker};

    fn create_machine(
        services: FakeServices,
    ) -> (
        SessionMachine<FakeServices, MemoryTranscript>,
        broadcast::Receiver<SessionEvent>,
    ) {
        let (tx, rx) = broadcast::channel(64);
        let machine =
            SessionMachine::new("Alice", test_endpoints(), services, MemoryTranscript::new(), tx);
        (machine, rx)
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn turns(machine: &SessionMachine<FakeServices, MemoryTranscript>) -> Vec<(Speaker, String)> {
        machine
            .transcript()
            .turns()
            .into_iter()
            .map(|t| (t.speaker, t.text))
            .collect()
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (machine, _) = create_machine(FakeServices::default());
        assert_eq!(machine.state(), State::Idle);
        assert_eq!(machine.identity(), "Alice");
    }

    #[tokio::test]
    async fn test_full_cycle() {
        let services = FakeServices::default()
            .start(Ok(true))
            .stop(Ok("hello"))
            .answer(Ok("hi there"))
            .speak(Ok(true));
        let (machine, mut rx) = create_machine(services);

        machine.toggle().await;
        assert_eq!(machine.state(), State::Recording);

        machine.toggle().await;
        assert_eq!(machine.state(), State::Idle);
        assert_eq!(machine.services().calls(), vec!["start", "stop", "llm", "speak"]);
        assert_eq!(
            turns(&machine),
            vec![
                (Speaker::User, "hello".to_string()),
                (Speaker::Assistant, "hi there".to_string()),
            ]
        );

        let events = drain(&mut rx);
        assert_eq!(events[0], SessionEvent::RecordingStarted);
        assert!(matches!(events[1], SessionEvent::RecordingStopped { .. }));
        assert_eq!(events[2], SessionEvent::TranscriptionReceived { chars: 5 });
        assert_eq!(events[3], SessionEvent::AnswerReceived { chars: 8 });
        assert_eq!(events[4], SessionEvent::SpeechFinished { acknowledged: true });
        assert!(matches!(events[5], SessionEvent::CycleCompleted { .. }));
    }

    #[tokio::test]
    async fn test_start_not_acknowledged_stays_idle() {
        let (machine, mut rx) = create_machine(FakeServices::default().start(Ok(false)));

        machine.toggle().await;
        assert_eq!(machine.state(), State::Idle);
        assert!(matches!(
            drain(&mut rx)[..],
            [SessionEvent::CycleFailed { stage: Stage::StartRecording, .. }]
        ));
    }

    #[tokio::test]
    async fn test_start_failure_stays_idle() {
        let services = FakeServices::default().start(Err(call_failure("start")));
        let (machine, _) = create_machine(services);

        machine.toggle().await;
        assert_eq!(machine.state(), State::Idle);

        // The next press tries again
        machine.toggle().await;
        assert_eq!(machine.state(), State::Recording);
        assert_eq!(machine.services().calls(), vec!["start", "start"]);
    }

    #[tokio::test]
    async fn test_empty_transcription_short_circuits() {
        let (machine, _) = create_machine(FakeServices::default().stop(Ok("")));

        machine.toggle().await;
        machine.toggle().await;

        assert_eq!(machine.state(), State::Idle);
        assert_eq!(machine.services().calls(), vec!["start", "stop"]);
        assert!(turns(&machine).is_empty());
    }

    #[tokio::test]
    async fn test_empty_answer_records_marker_without_speaking() {
        let services = FakeServices::default().stop(Ok("hello")).answer(Ok(""));
        let (machine, _) = create_machine(services);

        machine.toggle().await;
        machine.toggle().await;

        assert_eq!(machine.state(), State::Idle);
        assert_eq!(machine.services().calls(), vec!["start", "stop", "llm"]);
        assert_eq!(
            turns(&machine),
            vec![
                (Speaker::User, "hello".to_string()),
                (Speaker::Assistant, NO_ANSWER_MARKER.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_speech_not_acknowledged_returns_to_idle() {
        let services = FakeServices::default()
            .stop(Ok("hello"))
            .answer(Ok("hi there"))
            .speak(Ok(false));
        let (machine, mut rx) = create_machine(services);

        machine.toggle().await;
        machine.toggle().await;

        assert_eq!(machine.state(), State::Idle);
        assert_eq!(turns(&machine).len(), 2);
        assert!(drain(&mut rx).contains(&SessionEvent::SpeechFinished { acknowledged: false }));
    }

    #[tokio::test]
    async fn test_every_failure_returns_to_idle() {
        let scenarios: Vec<(FakeServices, Stage, usize)> = vec![
            (FakeServices::default().stop(Err(call_failure("stop"))), Stage::StopRecording, 0),
            (
                FakeServices::default()
                    .stop(Ok("hello"))
                    .answer(Err(call_failure("llm"))),
                Stage::LanguageModel,
                1,
            ),
            (
                FakeServices::default()
                    .stop(Ok("hello"))
                    .answer(Ok("hi there"))
                    .speak(Err(call_failure("tts"))),
                Stage::Speech,
                2,
            ),
        ];

        for (services, failed_stage, expected_turns) in scenarios {
            let (machine, mut rx) = create_machine(services);

            machine.toggle().await;
            machine.toggle().await;

            assert_eq!(machine.state(), State::Idle, "stuck after {failed_stage} failure");
            assert_eq!(turns(&machine).len(), expected_turns);
            let failed = drain(&mut rx).into_iter().any(|event| {
                matches!(event, SessionEvent::CycleFailed { stage, .. } if stage == failed_stage)
            });
            assert!(failed, "no failure event for {failed_stage}");

            // The machine is usable again
            machine.toggle().await;
            assert_eq!(machine.state(), State::Recording);
        }
    }

    #[tokio::test]
    async fn test_toggle_ignored_while_processing() {
        let gate = Arc::new(Notify::new());
        let services = FakeServices::default()
            .gate_stop(&gate)
            .stop(Ok("hello"))
        .answer(Ok("hi there"));
        let (machine, _) = create_machine(services);
        let machine = Arc::new(machine);

        machine.toggle().await;
        let mut state_rx = machine.watch_state();

        let cycle = tokio::spawn({
            let machine = Arc::clone(&machine);
            async move { machine.toggle().await }
        });
        state_rx
            .wait_for(|state| *state == State::Processing)
            .await
            .unwrap();

        machine.toggle().await;
        machine.toggle().await;
        assert_eq!(machine.state(), State::Processing);
        assert_eq!(machine.services().calls(), vec!["start", "stop"]);

        gate.notify_one();
        cycle.await.unwrap();
        assert_eq!(machine.state(), State::Idle);
        assert_eq!(machine.services().calls(), vec!["start", "stop", "llm", "speak"]);
    }

    #[tokio::test]
    async fn test_toggle_ignored_while_speaking() {
        let gate = Arc::new(Notify::new());
        let services = FakeServices::default()
            .gate_speak(&gate)
            .stop(Ok("hello"))
        .answer(Ok("hi there"));
        let (machine, _) = create_machine(services);
        let machine = Arc::new(machine);

        machine.toggle().await;
        let mut state_rx = machine.watch_state();

        let cycle = tokio::spawn({
            let machine = Arc::clone(&machine);
            async move { machine.toggle().await }
        });
        state_rx
            .wait_for(|state| *state == State::Speaking)
            .await
            .unwrap();

        machine.toggle().await;
        assert_eq!(machine.state(), State::Speaking);
        assert_eq!(machine.services().calls(), vec!["start", "stop", "llm", "speak"]);

        gate.notify_one();
        cycle.await.unwrap();
        assert_eq!(machine.state(), State::Idle);
        assert_eq!(machine.services().calls().len(), 4);
    }

    #[test]
    fn test_busy_states() {
        assert!(!State::Idle.is_busy());
        assert!(!State::Recording.is_busy());
        assert!(State::Processing.is_busy());
        assert!(State::Speaking.is_busy());
    }
}
