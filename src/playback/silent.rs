//! Headless engine that keeps time without producing sound.
//!
//! Used by the binary when no audio output backend is compiled in, so the
//! transport and position polling behave exactly as with a real device.

use std::time::{Duration, Instant};

use crate::generation::Artifact;

use super::engine::{AudioEngine, EngineError};

#[derive(Debug, Default)]
pub struct SilentEngine {
    source: Option<String>,
    /// Position accumulated before the current run.
    offset: Duration,
    /// Set while playing.
    started_at: Option<Instant>,
    duration: Option<Duration>,
    volume: f32,
}

impl SilentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report every loaded source as `duration` long.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn elapsed(&self) -> Duration {
        let running = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        let position = self.offset + running;
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

impl AudioEngine for SilentEngine {
    fn load(&mut self, artifact: &Artifact) -> Result<(), EngineError> {
        let url = reqwest::Url::parse(&artifact.url)
            .map_err(|e| EngineError::Load(format!("{}: {e}", artifact.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(EngineError::Load(format!(
                "unsupported scheme {:?}",
                url.scheme()
            )));
        }
        self.source = Some(artifact.url.clone());
        self.offset = Duration::ZERO;
        self.started_at = None;
        Ok(())
    }

    fn play(&mut self) -> Result<(), EngineError> {
        if self.source.is_none() {
            return Err(EngineError::NoSource);
        }
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.offset = self.elapsed();
        self.started_at = None;
    }

    fn stop(&mut self) {
        self.offset = Duration::ZERO;
        self.started_at = None;
    }

    fn seek(&mut self, position: Duration) -> Result<(), EngineError> {
        if self.source.is_none() {
            return Err(EngineError::NoSource);
        }
        self.offset = position;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn position(&self) -> Duration {
        self.elapsed()
    }

    fn duration(&self) -> Option<Duration> {
        self.source.as_ref().and(self.duration)
    }

    fn is_finished(&self) -> bool {
        self.duration
            .is_some_and(|duration| self.source.is_some() && self.elapsed() >= duration)
    }

    fn take_failure(&mut self) -> Option<EngineError> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ArtifactFactory;

    fn artifact() -> Artifact {
        ArtifactFactory::new("http://127.0.0.1:5000/stream-mp3").mint()
    }

    #[test]
    fn rejects_non_http_sources() {
        let mut engine = SilentEngine::new();
        let bad = Artifact {
            url: "file:///tmp/song.mp3".into(),
            created_at: std::time::SystemTime::now(),
        };
        assert!(matches!(engine.load(&bad), Err(EngineError::Load(_))));
        assert_eq!(engine.play(), Err(EngineError::NoSource));
    }

    #[test]
    fn clock_advances_only_while_playing() {
        let mut engine = SilentEngine::new();
        engine.load(&artifact()).unwrap();
        assert_eq!(engine.position(), Duration::ZERO);

        engine.play().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        engine.pause();
        let paused_at = engine.position();
        assert!(paused_at >= Duration::from_millis(20));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(engine.position(), paused_at);

        engine.stop();
        assert_eq!(engine.position(), Duration::ZERO);
    }

    #[test]
    fn seek_moves_clock() {
        let mut engine = SilentEngine::new();
        engine.load(&artifact()).unwrap();
        engine.seek(Duration::from_secs(42)).unwrap();
        assert_eq!(engine.position(), Duration::from_secs(42));
    }

    #[test]
    fn finishes_at_configured_duration() {
        let mut engine = SilentEngine::new().with_duration(Duration::from_millis(5));
        engine.load(&artifact()).unwrap();
        assert_eq!(engine.duration(), Some(Duration::from_millis(5)));
        engine.play().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(engine.is_finished());
        assert_eq!(engine.position(), Duration::from_millis(5));
    }

    #[test]
    fn volume_is_clamped() {
        let mut engine = SilentEngine::new();
        engine.set_volume(3.0);
        assert_eq!(engine.volume(), 1.0);
    }
}
