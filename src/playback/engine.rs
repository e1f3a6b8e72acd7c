//! Audio engine abstraction used by the playback controller.
//!
//! # Overview
//!
//! [`AudioEngine`] is the single exclusively-owned audio resource.  Loading a
//! new artifact detaches the previous one.  It is object-safe and `Send` so
//! the controller can hold it as `Box<dyn AudioEngine>` inside the app task.
//!
//! Engines may decode asynchronously.  Failures that happen after `load` has
//! returned are parked and handed out once by [`AudioEngine::take_failure`],
//! which the controller checks on every position tick.
//!
//! `MockEngine` (available under `#[cfg(test)]`) is a scriptable stub whose
//! clock and failures are driven through a shared [`MockEngineHandle`].

use std::time::Duration;

use thiserror::Error;

use crate::generation::Artifact;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A transport action needed a source but none is attached.
    #[error("no audio source loaded")]
    NoSource,

    /// The artifact could not be fetched.
    #[error("could not load audio: {0}")]
    Load(String),

    /// The artifact was fetched but is not playable audio.
    #[error("could not decode audio: {0}")]
    Decode(String),

    /// The output device is unavailable.
    #[error("audio device error: {0}")]
    Device(String),

    #[error("seek failed: {0}")]
    Seek(String),
}

// ---------------------------------------------------------------------------
// AudioEngine trait
// ---------------------------------------------------------------------------

pub trait AudioEngine: Send {
    /// Replace the current source with `artifact`, paused at position 0.
    fn load(&mut self, artifact: &Artifact) -> Result<(), EngineError>;

    /// Start or resume output of the current source.
    fn play(&mut self) -> Result<(), EngineError>;

    fn pause(&mut self);

    /// Pause and rewind to the start.
    fn stop(&mut self);

    fn seek(&mut self, position: Duration) -> Result<(), EngineError>;

    /// `volume` is linear gain in `0.0 ..= 1.0`.
    fn set_volume(&mut self, volume: f32);

    /// True elapsed position of the current source.
    fn position(&self) -> Duration;

    /// Total length, once known.
    fn duration(&self) -> Option<Duration>;

    /// `true` once the current source has played to its end.
    fn is_finished(&self) -> bool;

    /// Hand out a failure that happened after `load` returned, at most once.
    fn take_failure(&mut self) -> Option<EngineError>;
}

// Compile-time assertion: Box<dyn AudioEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioEngine>) {}
};

// ---------------------------------------------------------------------------
// MockEngine  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::{MockEngine, MockEngineHandle};
