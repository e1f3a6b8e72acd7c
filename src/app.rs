//! Application state object and event loop.
//!
//! [`Studio`] owns every subsystem and is the only thing that mutates them.
//! User intents arrive as [`StudioCommand`]s; network completions and
//! position ticks arrive on internal channels.  Each message is applied to
//! completion before the next one is taken, and a fresh [`StudioView`] is
//! published after every message.
//!
//! ```text
//! StudioCommand ─┐
//! StudioEvent  ──┼─▶ Studio::run (select!) ─▶ watch::Sender<StudioView>
//! PlaybackTick ──┘        │
//!                         └─ tokio::spawn(timeout(service call)) ─▶ StudioEvent
//! ```
//!
//! Spawned calls never touch state; they only post their result back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::chat::{ChatChannel, ChatMessage, TicketId};
use crate::config::AppConfig;
use crate::documents::{DocumentId, DocumentRegistry, DocumentStats, Language, NamingPolicy};
use crate::generation::{GenerationPipeline, RequestId, Resolution};
use crate::playback::{AudioEngine, PlaybackController, PlaybackState, PlaybackTick};
use crate::service::{SendCodeReply, ServiceError, StudioService};
use crate::status::{StatusEntry, StatusLog};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A user intent.
#[derive(Debug, Clone, PartialEq)]
pub enum StudioCommand {
    AddDocument,
    CloseDocument(DocumentId),
    SelectDocument(DocumentId),
    EditDocument { id: DocumentId, content: String },
    /// Generate music from the active document.
    Run,
    Play,
    Pause,
    Stop,
    Seek(f64),
    SetVolume(i64),
    Chat(String),
}

/// Completion of a spawned service call.
#[derive(Debug)]
pub enum StudioEvent {
    GenerationFinished {
        request_id: RequestId,
        result: Result<SendCodeReply, ServiceError>,
    },
    ChatFinished {
        ticket: TicketId,
        result: Result<String, ServiceError>,
    },
}

// ---------------------------------------------------------------------------
// StudioView
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub name: String,
    pub language: Language,
    pub stats: DocumentStats,
}

/// Read-only snapshot for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StudioView {
    /// In display order.
    pub documents: Vec<DocumentSummary>,
    pub active: DocumentId,
    /// `true` while the latest generation request awaits its response.
    pub generating: bool,
    pub playback: PlaybackState,
    /// Retained status entries, oldest first.
    pub status: Vec<StatusEntry>,
    /// Total status entries ever appended.
    pub status_appended: u64,
    pub chat: Vec<ChatMessage>,
    pub chat_pending: usize,
}

// ---------------------------------------------------------------------------
// Studio
// ---------------------------------------------------------------------------

pub struct Studio {
    naming: NamingPolicy,
    registry: DocumentRegistry,
    pipeline: GenerationPipeline,
    playback: PlaybackController,
    status: StatusLog,
    chat: ChatChannel,
    service: Arc<dyn StudioService>,
    request_timeout: Duration,
    events_tx: mpsc::UnboundedSender<StudioEvent>,
    events_rx: mpsc::UnboundedReceiver<StudioEvent>,
    ticks_rx: mpsc::UnboundedReceiver<PlaybackTick>,
}

impl Studio {
    /// Build the application state.  `engine` becomes the playback
    /// controller's exclusively-owned audio resource.
    pub fn new(
        config: &AppConfig,
        service: Arc<dyn StudioService>,
        engine: Box<dyn AudioEngine>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (ticks_tx, ticks_rx) = mpsc::unbounded_channel();
        let playback = PlaybackController::new(engine, &config.playback).with_ticks(ticks_tx);

        Self {
            naming: NamingPolicy::default(),
            registry: DocumentRegistry::new(),
            pipeline: GenerationPipeline::new(service.stream_url()),
            playback,
            status: StatusLog::new(&config.status),
            chat: ChatChannel::new(&config.chat),
            service,
            request_timeout: config.service.timeout(),
            events_tx,
            events_rx,
            ticks_rx,
        }
    }

    /// Override the deadline applied to every service call.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `commands` is closed, publishing a view after every message.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<StudioCommand>,
        views: watch::Sender<StudioView>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                Some(tick) = self.ticks_rx.recv() => self.handle_tick(tick),
            }
            views.send_replace(self.view());
        }

        self.playback.stop();
        log::info!("studio: command channel closed, shutting down");
    }

    /// Wait for one internal event or tick and apply it.  Returns `false`
    /// only if both internal channels are closed.
    pub async fn process_next_event(&mut self) -> bool {
        tokio::select! {
            biased;
            Some(event) = self.events_rx.recv() => {
                self.handle_event(event);
                true
            }
            Some(tick) = self.ticks_rx.recv() => {
                self.handle_tick(tick);
                true
            }
            else => false,
        }
    }

    // -----------------------------------------------------------------------
    // Message handlers
    // -----------------------------------------------------------------------

    pub fn handle_command(&mut self, command: StudioCommand) {
        log::debug!("studio: command {command:?}");
        match command {
            StudioCommand::AddDocument => {
                let added = self.registry.add_document(&self.naming);
                log::info!("studio: opened {}", added.display_name());
            }
            StudioCommand::CloseDocument(id) => {
                if !self.registry.close_document(id) {
                    log::debug!("studio: close {id} ignored");
                }
            }
            StudioCommand::SelectDocument(id) => {
                if let Err(e) = self.registry.set_active(id) {
                    log::warn!("studio: {e}");
                }
            }
            StudioCommand::EditDocument { id, content } => {
                if let Err(e) = self.registry.update_content(id, content) {
                    log::warn!("studio: {e}");
                }
            }
            StudioCommand::Run => self.start_generation(),
            StudioCommand::Play => {
                if let Err(e) = self.playback.play() {
                    self.status.error(format!("Playback failed: {e}"));
                }
            }
            StudioCommand::Pause => self.playback.pause(),
            StudioCommand::Stop => self.playback.stop(),
            StudioCommand::Seek(secs) => self.playback.seek(secs),
            StudioCommand::SetVolume(percent) => self.playback.set_volume(percent),
            StudioCommand::Chat(text) => self.start_chat(&text),
        }
    }

    pub fn handle_event(&mut self, event: StudioEvent) {
        match event {
            StudioEvent::GenerationFinished { request_id, result } => {
                match self.pipeline.resolve(request_id, result) {
                    Resolution::Succeeded {
                        document_name,
                        artifact,
                        ..
                    } => match self.playback.load_artifact(artifact) {
                        Ok(()) => self
                            .status
                            .success(format!("Music generated from {document_name}")),
                        Err(e) => self.status.error(format!("Playback failed: {e}")),
                    },
                    Resolution::Failed {
                        document_name,
                        cause,
                        ..
                    } => self
                        .status
                        .error(format!("Generation failed for {document_name}: {cause}")),
                    Resolution::Stale { request_id } => {
                        log::warn!("studio: ignored stale response for {request_id}");
                    }
                }
            }
            StudioEvent::ChatFinished { ticket, result } => self.chat.complete(ticket, result),
        }
    }

    fn handle_tick(&mut self, tick: PlaybackTick) {
        if let Err(e) = self.playback.on_tick(tick) {
            self.status.error(format!("Playback failed: {e}"));
        }
    }

    fn start_generation(&mut self) {
        let submission = self.pipeline.submit(self.registry.active());
        self.status.info(format!(
            "Generating music from {}...",
            self.registry.active().display_name()
        ));

        let service = Arc::clone(&self.service);
        let request_id = submission.request_id;
        let code = submission.code;
        self.spawn_call(
            async move { service.send_code(&code).await },
            move |result| StudioEvent::GenerationFinished { request_id, result },
        );
    }

    fn start_chat(&mut self, text: &str) {
        let Some(ticket) = self.chat.begin_send(text) else {
            return;
        };
        let service = Arc::clone(&self.service);
        let id = ticket.id;
        let message = ticket.message;
        self.spawn_call(
            async move { service.chat(&message).await },
            move |result| StudioEvent::ChatFinished { ticket: id, result },
        );
    }

    /// Run `call` on the runtime under the request deadline and post its
    /// result back as an event.  Expiry counts as [`ServiceError::Timeout`].
    fn spawn_call<T, F>(
        &self,
        call: F,
        finish: impl FnOnce(Result<T, ServiceError>) -> StudioEvent + Send + 'static,
    ) where
        T: Send + 'static,
        F: Future<Output = Result<T, ServiceError>> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        let deadline = self.request_timeout;
        tokio::spawn(async move {
            let result = match tokio::time::timeout(deadline, call).await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Timeout),
            };
            if tx.send(finish(result)).is_err() {
                log::debug!("studio: dropped a completion after shutdown");
            }
        });
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn view(&self) -> StudioView {
        StudioView {
            documents: self
                .registry
                .documents()
                .iter()
                .map(|doc| DocumentSummary {
                    id: doc.id(),
                    name: doc.display_name().to_string(),
                    language: doc.language(),
                    stats: doc.stats(),
                })
                .collect(),
            active: self.registry.active_id(),
            generating: self.pipeline.is_sending(),
            playback: self.playback.state(),
            status: self.status.entries().cloned().collect(),
            status_appended: self.status.appended(),
            chat: self.chat.transcript().to_vec(),
            chat_pending: self.chat.in_flight(),
        }
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn pipeline(&self) -> &GenerationPipeline {
        &self.pipeline
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn status(&self) -> &StatusLog {
        &self.status
    }

    pub fn chat(&self) -> &ChatChannel {
        &self.chat
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use crate::chat::ChatRole;
    use crate::config::PlaybackConfig;
    use crate::generation::RequestState;
    use crate::playback::engine::{MockEngine, MockEngineHandle};
    use crate::playback::{EngineError, PlaybackStatus};
    use crate::status::Tone;

    const STREAM: &str = "http://studio.test/stream-mp3";

    type Reply = Result<SendCodeReply, ServiceError>;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// `send_code` waits for a reply the test releases through a oneshot, in
    /// call order.  `chat` echoes immediately.
    #[derive(Default)]
    struct ScriptedService {
        pending: Mutex<VecDeque<oneshot::Receiver<Reply>>>,
        sent: Mutex<Vec<String>>,
        chat_calls: AtomicUsize,
    }

    impl ScriptedService {
        /// Queue a reply slot for the next `send_code` call.
        fn expect_send(&self) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push_back(rx);
            tx
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StudioService for ScriptedService {
        async fn send_code(&self, code: &str) -> Result<SendCodeReply, ServiceError> {
            self.sent.lock().unwrap().push(code.to_string());
            let slot = self.pending.lock().unwrap().pop_front();
            match slot {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(ServiceError::Request("reply dropped".into()))),
                None => std::future::pending().await,
            }
        }

        async fn chat(&self, message: &str) -> Result<String, ServiceError> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("echo: {message}"))
        }

        fn stream_url(&self) -> String {
            STREAM.to_string()
        }
    }

    fn accepted() -> Reply {
        Ok(SendCodeReply {
            message: "Code received!".into(),
            code: serde_json::json!(200),
        })
    }

    fn studio_with(config: AppConfig) -> (Studio, Arc<ScriptedService>, MockEngineHandle) {
        let service = Arc::new(ScriptedService::default());
        let (engine, handle) = MockEngine::new();
        let studio = Studio::new(&config, service.clone(), Box::new(engine));
        (studio, service, handle)
    }

    fn studio() -> (Studio, Arc<ScriptedService>, MockEngineHandle) {
        studio_with(AppConfig::default())
    }

    async fn next(studio: &mut Studio) {
        let processed = tokio::time::timeout(Duration::from_secs(5), studio.process_next_event())
            .await
            .expect("event in time");
        assert!(processed);
    }

    fn errors(studio: &Studio) -> usize {
        studio
            .status()
            .entries()
            .filter(|e| e.tone == Tone::Error)
            .count()
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn closing_inactive_document_keeps_active_content() {
        let (mut studio, _service, _engine) = studio();
        let main = studio.registry().active_id();
        let main_content = studio.registry().active().content().to_string();

        studio.handle_command(StudioCommand::AddDocument);
        let added = studio.registry().active_id();
        studio.handle_command(StudioCommand::SelectDocument(main));
        studio.handle_command(StudioCommand::CloseDocument(added));

        assert_eq!(studio.registry().len(), 1);
        assert_eq!(studio.registry().active_id(), main);
        assert_eq!(studio.registry().active().content(), main_content);
    }

    #[tokio::test]
    async fn unknown_document_commands_are_harmless() {
        let (mut studio, _service, _engine) = studio();
        let before = studio.view();
        studio.handle_command(StudioCommand::SelectDocument(DocumentId(99)));
        studio.handle_command(StudioCommand::EditDocument {
            id: DocumentId(99),
            content: "x".into(),
        });
        studio.handle_command(StudioCommand::CloseDocument(before.active));
        assert_eq!(studio.view(), before);
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn successful_generation_autoplays_fresh_artifact() {
        let (mut studio, service, engine) = studio();
        let reply = service.expect_send();

        studio.handle_command(StudioCommand::Run);
        assert!(studio.view().generating);
        reply.send(accepted()).unwrap();
        next(&mut studio).await;

        let state = studio.playback().state();
        assert_eq!(state.status, PlaybackStatus::Playing);
        assert_eq!(state.position_secs, 0.0);

        let loaded = engine.with(|s| s.loaded.clone());
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].starts_with(&format!("{STREAM}?ts=")));

        let latest = studio.status().latest().unwrap();
        assert_eq!(latest.tone, Tone::Success);
        assert_eq!(latest.text, "Music generated from main.py");
        assert!(!studio.view().generating);
    }

    #[tokio::test]
    async fn superseded_request_never_reaches_playback_either_order() {
        for second_first in [false, true] {
            let (mut studio, service, engine) = studio();
            let doc = studio.registry().active_id();
            let first = service.expect_send();
            let second = service.expect_send();

            studio.handle_command(StudioCommand::Run);
            studio.handle_command(StudioCommand::EditDocument {
                id: doc,
                content: "piano.play('C4')".into(),
            });
            studio.handle_command(StudioCommand::Run);

            // Both spawned calls must have taken their slot before replying.
            while service.sent().len() < 2 {
                tokio::task::yield_now().await;
            }
            assert_eq!(service.sent()[1], "piano.play('C4')");

            let failing = Err(ServiceError::Request("refused".into()));
            if second_first {
                second.send(accepted()).unwrap();
                next(&mut studio).await;
                first.send(failing).unwrap();
                next(&mut studio).await;
            } else {
                first.send(failing).unwrap();
                next(&mut studio).await;
                second.send(accepted()).unwrap();
                next(&mut studio).await;
            }

            assert_eq!(engine.with(|s| s.loaded.len()), 1);
            assert_eq!(errors(&studio), 0, "stale failure leaked (order {second_first})");
            assert_eq!(studio.status().current_tone(), Tone::Success);
            assert_eq!(studio.pipeline().stale_count(), 1);
            assert_eq!(
                studio.pipeline().current().map(|r| r.state),
                Some(RequestState::Succeeded)
            );
        }
    }

    #[tokio::test]
    async fn rejected_code_logs_error_and_leaves_playback_alone() {
        let (mut studio, service, engine) = studio();
        let reply = service.expect_send();

        studio.handle_command(StudioCommand::Run);
        reply
            .send(Ok(SendCodeReply {
                message: "Syntax error".into(),
                code: serde_json::json!(400),
            }))
            .unwrap();
        next(&mut studio).await;

        assert_eq!(errors(&studio), 1);
        let latest = studio.status().latest().unwrap();
        assert!(latest.text.starts_with("Generation failed for main.py"));
        assert_eq!(studio.playback().status(), PlaybackStatus::Stopped);
        assert!(engine.with(|s| s.loaded.is_empty()));
    }

    #[tokio::test]
    async fn timeout_is_one_error_and_playback_unchanged() {
        let (studio, _service, _engine) = studio();
        let mut studio = studio.with_request_timeout(Duration::from_millis(20));
        studio.handle_command(StudioCommand::SetVolume(40));
        let before = studio.playback().state();

        // No reply slot queued: the call never completes on its own.
        studio.handle_command(StudioCommand::Run);
        next(&mut studio).await;

        assert_eq!(errors(&studio), 1);
        assert!(studio
            .status()
            .latest()
            .unwrap()
            .text
            .ends_with("service request timed out"));
        assert_eq!(studio.playback().state(), before);
        assert_eq!(
            studio.pipeline().current().map(|r| r.state),
            Some(RequestState::Failed)
        );
    }

    #[tokio::test]
    async fn load_failure_is_reported_and_stops() {
        let (mut studio, service, engine) = studio();
        engine.with(|s| s.load_error = Some(EngineError::Decode("not audio".into())));
        let reply = service.expect_send();

        studio.handle_command(StudioCommand::Run);
        reply.send(accepted()).unwrap();
        next(&mut studio).await;

        assert_eq!(studio.playback().status(), PlaybackStatus::Stopped);
        let latest = studio.status().latest().unwrap();
        assert_eq!(latest.tone, Tone::Error);
        assert!(latest.text.starts_with("Playback failed"));
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn position_ticks_follow_engine_clock() {
        let config = AppConfig {
            playback: PlaybackConfig {
                poll_interval_ms: 10,
                ..PlaybackConfig::default()
            },
            ..AppConfig::default()
        };
        let (mut studio, service, engine) = studio_with(config);
        let reply = service.expect_send();
        studio.handle_command(StudioCommand::Run);
        reply.send(accepted()).unwrap();
        next(&mut studio).await;

        engine.with(|s| s.position = Duration::from_secs(4));
        next(&mut studio).await;
        assert_eq!(studio.playback().state().position_secs, 4.0);

        engine.with(|s| s.pending_failure = Some(EngineError::Decode("corrupt".into())));
        next(&mut studio).await;
        assert_eq!(studio.playback().status(), PlaybackStatus::Stopped);
        assert_eq!(studio.status().current_tone(), Tone::Error);
    }

    #[tokio::test]
    async fn transport_commands_reach_controller() {
        let (mut studio, service, _engine) = studio();
        let reply = service.expect_send();
        studio.handle_command(StudioCommand::Run);
        reply.send(accepted()).unwrap();
        next(&mut studio).await;

        studio.handle_command(StudioCommand::Pause);
        assert_eq!(studio.playback().status(), PlaybackStatus::Paused);
        studio.handle_command(StudioCommand::Seek(12.0));
        assert_eq!(studio.playback().state().position_secs, 12.0);
        studio.handle_command(StudioCommand::Play);
        assert_eq!(studio.playback().status(), PlaybackStatus::Playing);
        studio.handle_command(StudioCommand::Stop);
        assert_eq!(studio.playback().state().position_secs, 0.0);
        studio.handle_command(StudioCommand::SetVolume(250));
        assert_eq!(studio.playback().state().volume_percent, 100);
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn empty_chat_issues_no_call() {
        let (mut studio, service, _engine) = studio();
        let before = studio.chat().transcript().len();
        studio.handle_command(StudioCommand::Chat("   ".into()));
        tokio::task::yield_now().await;

        assert_eq!(studio.chat().transcript().len(), before);
        assert_eq!(service.chat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn chat_round_trip_is_independent_of_generation() {
        let (mut studio, service, _engine) = studio();
        studio.handle_command(StudioCommand::Chat("how do I loop?".into()));
        assert_eq!(studio.view().chat_pending, 1);
        next(&mut studio).await;

        let last = studio.chat().transcript().last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.text, "echo: how do I loop?");
        assert_eq!(service.chat_calls.load(Ordering::SeqCst), 1);
        assert!(studio.status().is_empty());
        assert_eq!(studio.playback().status(), PlaybackStatus::Stopped);
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn run_publishes_views_until_commands_close() {
        let (studio, service, _engine) = studio();
        let reply = service.expect_send();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (view_tx, mut view_rx) = watch::channel(studio.view());
        let task = tokio::spawn(studio.run(cmd_rx, view_tx));

        cmd_tx.send(StudioCommand::AddDocument).await.unwrap();
        cmd_tx.send(StudioCommand::Run).await.unwrap();
        reply.send(accepted()).unwrap();

        let view = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                view_rx.changed().await.unwrap();
                let view = view_rx.borrow_and_update().clone();
                if view.playback.status == PlaybackStatus::Playing {
                    break view;
                }
            }
        })
        .await
        .expect("playing view");

        assert_eq!(view.documents.len(), 2);
        assert_eq!(view.documents[1].name, "file2.py");
        assert_eq!(
            view.status.last().map(|e| e.text.as_str()),
            Some("Music generated from file2.py")
        );

        drop(cmd_tx);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("studio stops")
            .unwrap();
    }
}
