//! Playback controller state machine.
//!
//! ```text
//! Stopped ──play──▶ Playing ──pause──▶ Paused ──play──▶ Playing
//!    ▲                 │                  │
//!    └──────stop───────┴───────stop───────┘
//! any ──load_artifact──▶ Playing (position 0)
//! any ──engine failure──▶ Stopped
//! ```
//!
//! While `Playing` a [`PositionTicker`] republishes the engine's true
//! position; it is started on entering `Playing` and dropped on leaving it.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::PlaybackConfig;
use crate::generation::Artifact;

use super::engine::{AudioEngine, EngineError};
use super::ticker::{PlaybackTick, PositionTicker};

/// Upper bound for seeks while the source length is still unknown.
pub const MAX_UNKNOWN_SEEK_SECS: f64 = 24.0 * 60.0 * 60.0;

// ---------------------------------------------------------------------------
// PlaybackStatus / PlaybackState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackStatus::Stopped => "Stopped",
            PlaybackStatus::Playing => "Playing",
            PlaybackStatus::Paused => "Paused",
        }
    }
}

/// Transport state as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub position_secs: f64,
    /// `None` until the engine knows the length of the current source.
    pub duration_secs: Option<f64>,
    pub volume_percent: u8,
}

// ---------------------------------------------------------------------------
// PlaybackController
// ---------------------------------------------------------------------------

pub struct PlaybackController {
    engine: Box<dyn AudioEngine>,
    state: PlaybackState,
    artifact: Option<Artifact>,
    poll_interval: Duration,
    tick_tx: Option<mpsc::UnboundedSender<PlaybackTick>>,
    ticker: Option<PositionTicker>,
    epoch: u64,
}

impl PlaybackController {
    /// A stopped controller with the configured default volume.  Position
    /// polling stays off until [`with_ticks`](Self::with_ticks) is called.
    pub fn new(mut engine: Box<dyn AudioEngine>, config: &PlaybackConfig) -> Self {
        let volume_percent = config.default_volume.min(100);
        engine.set_volume(f32::from(volume_percent) / 100.0);
        Self {
            engine,
            state: PlaybackState {
                status: PlaybackStatus::Stopped,
                position_secs: 0.0,
                duration_secs: None,
                volume_percent,
            },
            artifact: None,
            poll_interval: config.poll_interval(),
            tick_tx: None,
            ticker: None,
            epoch: 0,
        }
    }

    /// Deliver position ticks to `tx` while playing.  Requires a tokio
    /// runtime when playback starts.
    pub fn with_ticks(mut self, tx: mpsc::UnboundedSender<PlaybackTick>) -> Self {
        self.tick_tx = Some(tx);
        self
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    /// Replace the source with `artifact` and start playing from 0.
    ///
    /// On failure the controller is left `Stopped` with no source attached.
    pub fn load_artifact(&mut self, artifact: Artifact) -> Result<(), EngineError> {
        log::info!("playback: loading {}", artifact.url);
        self.ticker = None;
        self.state.position_secs = 0.0;
        self.state.duration_secs = None;
        self.artifact = None;

        if let Err(e) = self.engine.load(&artifact) {
            return Err(self.fail(e));
        }
        self.artifact = Some(artifact);
        if let Err(e) = self.engine.play() {
            return Err(self.fail(e));
        }
        self.state.duration_secs = self.engine.duration().map(|d| d.as_secs_f64());
        self.enter(PlaybackStatus::Playing);
        Ok(())
    }

    /// `Stopped | Paused → Playing`.  Silently does nothing when already
    /// playing or when nothing was ever loaded.
    pub fn play(&mut self) -> Result<(), EngineError> {
        // A failure parked while paused must not be resumed into.
        if let Some(e) = self.engine.take_failure() {
            return Err(self.fail(e));
        }
        if self.state.status == PlaybackStatus::Playing {
            return Ok(());
        }
        if self.artifact.is_none() {
            log::debug!("playback: play ignored, nothing loaded");
            return Ok(());
        }
        if let Err(e) = self.engine.play() {
            return Err(self.fail(e));
        }
        self.enter(PlaybackStatus::Playing);
        Ok(())
    }

    /// `Playing → Paused`; no-op otherwise.
    pub fn pause(&mut self) {
        if self.state.status != PlaybackStatus::Playing {
            return;
        }
        self.engine.pause();
        self.state.position_secs = self.engine.position().as_secs_f64();
        self.enter(PlaybackStatus::Paused);
    }

    /// Any state `→ Stopped`, position back to 0.
    pub fn stop(&mut self) {
        self.engine.stop();
        self.state.position_secs = 0.0;
        self.enter(PlaybackStatus::Stopped);
    }

    /// Move to `target_secs`, clamped to `[0, duration]`, or to
    /// `[0, MAX_UNKNOWN_SEEK_SECS]` while the duration is unknown.  The
    /// status is unchanged.
    pub fn seek(&mut self, target_secs: f64) {
        let upper = self.state.duration_secs.unwrap_or(MAX_UNKNOWN_SEEK_SECS);
        let target = if target_secs.is_finite() {
            target_secs.clamp(0.0, upper.max(0.0))
        } else {
            0.0
        };

        let Ok(position) = Duration::try_from_secs_f64(target) else {
            log::warn!("playback: seek target {target}s is out of range");
            return;
        };
        self.state.position_secs = target;

        if self.artifact.is_some() {
            if let Err(e) = self.engine.seek(position) {
                log::warn!("playback: {e}");
            }
        }
    }

    /// Set the volume, clamped to `[0, 100]`.  Applies in every state.
    pub fn set_volume(&mut self, percent: i64) {
        let percent = percent.clamp(0, 100) as u8;
        self.state.volume_percent = percent;
        self.engine.set_volume(f32::from(percent) / 100.0);
    }

    // -----------------------------------------------------------------------
    // Position synchronisation
    // -----------------------------------------------------------------------

    /// Apply one polling tick.  Ticks from a cancelled ticker, or arriving
    /// while not playing, are ignored.
    ///
    /// Returns the engine failure, if one surfaced; the controller is then
    /// `Stopped`.
    pub fn on_tick(&mut self, tick: PlaybackTick) -> Result<(), EngineError> {
        if self.state.status != PlaybackStatus::Playing {
            return Ok(());
        }
        if self.ticker.as_ref().map(PositionTicker::epoch) != Some(tick.epoch) {
            return Ok(());
        }
        self.sync_position()
    }

    /// Read the engine's position and failure state right now.
    pub fn sync_position(&mut self) -> Result<(), EngineError> {
        if let Some(e) = self.engine.take_failure() {
            return Err(self.fail(e));
        }
        if self.state.status != PlaybackStatus::Playing {
            return Ok(());
        }
        if let Some(duration) = self.engine.duration() {
            self.state.duration_secs = Some(duration.as_secs_f64());
        }
        if self.engine.is_finished() {
            log::debug!("playback: reached end of source");
            self.stop();
            return Ok(());
        }
        self.state.position_secs = self.engine.position().as_secs_f64();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state.status
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// `true` while a polling task is scheduled.
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn enter(&mut self, status: PlaybackStatus) {
        if self.state.status != status {
            log::debug!(
                "playback: {} -> {}",
                self.state.status.label(),
                status.label()
            );
        }
        self.state.status = status;

        if status != PlaybackStatus::Playing {
            self.ticker = None;
        } else if self.ticker.is_none() {
            if let Some(tx) = &self.tick_tx {
                self.epoch += 1;
                self.ticker = Some(PositionTicker::spawn(self.poll_interval, self.epoch, tx.clone()));
            }
        }
    }

    fn fail(&mut self, error: EngineError) -> EngineError {
        log::error!("playback: {error}");
        self.engine.stop();
        self.artifact = None;
        self.state.position_secs = 0.0;
        self.state.duration_secs = None;
        self.enter(PlaybackStatus::Stopped);
        error
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
