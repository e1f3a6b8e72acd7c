//! Playback: one exclusively-owned audio engine driven by a transport state
//! machine.
//!
//! # Pipeline
//!
//! ```text
//! Artifact → PlaybackController::load_artifact → AudioEngine (Silent | Rodio)
//!                 ▲                                   │
//!                 └── PositionTicker (while Playing) ─┘ position / failures
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use pyzart_studio::config::PlaybackConfig;
//! use pyzart_studio::generation::ArtifactFactory;
//! use pyzart_studio::playback::{PlaybackController, PlaybackStatus, SilentEngine};
//!
//! let mut playback =
//!     PlaybackController::new(Box::new(SilentEngine::new()), &PlaybackConfig::default());
//! let artifact = ArtifactFactory::new("http://127.0.0.1:5000/stream-mp3").mint();
//!
//! playback.load_artifact(artifact).unwrap();
//! assert_eq!(playback.status(), PlaybackStatus::Playing);
//! ```

pub mod controller;
pub mod engine;
#[cfg(feature = "audio-output")]
pub mod rodio_engine;
pub mod silent;
pub mod ticker;

pub use controller::{PlaybackController, PlaybackState, PlaybackStatus};
pub use engine::{AudioEngine, EngineError};
#[cfg(feature = "audio-output")]
pub use rodio_engine::RodioEngine;
pub use silent::SilentEngine;
pub use ticker::{PlaybackTick, PositionTicker};

/// Format seconds as `m:ss`.  Negative and non-finite input reads `0:00`.
pub fn format_clock(secs: f64) -> String {
    let whole = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(9.99), "0:09");
        assert_eq!(format_clock(65.0), "1:05");
        assert_eq!(format_clock(3_600.0), "60:00");
        assert_eq!(format_clock(-4.0), "0:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
    }
}
