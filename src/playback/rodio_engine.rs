//! Audio output through the default device using `rodio`.
//!
//! `rodio::OutputStream` is not `Send`, so the stream and its `Sink` live on
//! a dedicated `audio-output` thread.  [`RodioEngine`] is a thin command
//! sender; the thread publishes position, duration and failures into a
//! shared snapshot that the engine reads back.
//!
//! Downloading and decoding happen on the audio thread.  `load` therefore
//! returns immediately and a fetch or decode failure is reported through
//! [`AudioEngine::take_failure`] on the next poll.
//!
//! The fetched bytes are kept for the life of the source.  A decoder is
//! consumed by playing it, so `Play` on a drained sink queues a fresh one.

use std::io::Cursor;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use crate::generation::Artifact;

use super::engine::{AudioEngine, EngineError};

/// How often the audio thread refreshes the shared snapshot.
const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

enum AudioCommand {
    Load(String),
    Play,
    Pause,
    Stop,
    Seek(Duration),
    Volume(f32),
}

#[derive(Debug, Default)]
struct Snapshot {
    position: Duration,
    duration: Option<Duration>,
    finished: bool,
    failure: Option<EngineError>,
}

type SharedSnapshot = Arc<Mutex<Snapshot>>;

/// The current source as held by the audio thread.
struct LoadedSource {
    bytes: Arc<[u8]>,
    sink: Sink,
    /// Where a refill should start, set by a seek on a drained sink.
    rewind_to: Option<Duration>,
}

pub struct RodioEngine {
    cmd_tx: mpsc::Sender<AudioCommand>,
    snapshot: SharedSnapshot,
    has_source: bool,
}

impl RodioEngine {
    /// Open the default output device on a new audio thread.
    pub fn open() -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let snapshot = SharedSnapshot::default();
        let thread_snapshot = Arc::clone(&snapshot);

        thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || match OutputStream::try_default() {
                Ok((_stream, handle)) => {
                    let _ = ready_tx.send(Ok(()));
                    run_audio_thread(handle, cmd_rx, thread_snapshot);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(EngineError::Device(e.to_string())));
                }
            })
            .map_err(|e| EngineError::Device(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|e| EngineError::Device(e.to_string()))??;
        log::info!("audio: default output device opened");

        Ok(Self {
            cmd_tx,
            snapshot,
            has_source: false,
        })
    }

    fn send(&self, command: AudioCommand) -> Result<(), EngineError> {
        self.cmd_tx
            .send(command)
            .map_err(|_| EngineError::Device("audio thread has exited".into()))
    }

    fn with_snapshot<R>(&self, f: impl FnOnce(&mut Snapshot) -> R) -> R {
        match self.snapshot.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl AudioEngine for RodioEngine {
    fn load(&mut self, artifact: &Artifact) -> Result<(), EngineError> {
        self.with_snapshot(|s| *s = Snapshot::default());
        self.send(AudioCommand::Load(artifact.url.clone()))?;
        self.has_source = true;
        Ok(())
    }

    fn play(&mut self) -> Result<(), EngineError> {
        if !self.has_source {
            return Err(EngineError::NoSource);
        }
        self.send(AudioCommand::Play)
    }

    fn pause(&mut self) {
        let _ = self.send(AudioCommand::Pause);
    }

    fn stop(&mut self) {
        let _ = self.send(AudioCommand::Stop);
        self.with_snapshot(|s| s.position = Duration::ZERO);
    }

    fn seek(&mut self, position: Duration) -> Result<(), EngineError> {
        if !self.has_source {
            return Err(EngineError::NoSource);
        }
        self.send(AudioCommand::Seek(position))?;
        self.with_snapshot(|s| s.position = position);
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        let _ = self.send(AudioCommand::Volume(volume.clamp(0.0, 1.0)));
    }

    fn position(&self) -> Duration {
        self.with_snapshot(|s| s.position)
    }

    fn duration(&self) -> Option<Duration> {
        self.with_snapshot(|s| s.duration)
    }

    fn is_finished(&self) -> bool {
        self.with_snapshot(|s| s.finished)
    }

    fn take_failure(&mut self) -> Option<EngineError> {
        let failure = self.with_snapshot(|s| s.failure.take());
        if failure.is_some() {
            self.has_source = false;
        }
        failure
    }
}

// ---------------------------------------------------------------------------
// Audio thread
// ---------------------------------------------------------------------------

fn run_audio_thread(
    handle: OutputStreamHandle,
    cmd_rx: mpsc::Receiver<AudioCommand>,
    snapshot: SharedSnapshot,
) {
    let mut source: Option<LoadedSource> = None;
    let mut volume = 1.0_f32;
    let mut playing = false;

    loop {
        match cmd_rx.recv_timeout(REFRESH_INTERVAL) {
            Ok(AudioCommand::Load(url)) => {
                // Dropping the old sink detaches the previous source.
                source = None;
                playing = false;
                match open_source(&handle, &url) {
                    Ok((loaded, duration)) => {
                        loaded.sink.set_volume(volume);
                        source = Some(loaded);
                        update(&snapshot, |s| s.duration = duration);
                    }
                    Err(e) => {
                        log::error!("audio: {e}");
                        update(&snapshot, |s| s.failure = Some(e));
                    }
                }
            }
            Ok(AudioCommand::Play) => {
                if let Some(loaded) = source.as_mut() {
                    match refill(loaded) {
                        Ok(()) => {
                            loaded.sink.play();
                            playing = true;
                        }
                        Err(e) => {
                            log::error!("audio: {e}");
                            source = None;
                            playing = false;
                            update(&snapshot, |s| s.failure = Some(e));
                        }
                    }
                }
            }
            Ok(AudioCommand::Pause) => {
                if let Some(loaded) = &source {
                    loaded.sink.pause();
                }
                playing = false;
            }
            Ok(AudioCommand::Stop) => {
                if let Some(loaded) = source.as_mut() {
                    loaded.sink.pause();
                    loaded.rewind_to = None;
                    if !loaded.sink.empty() {
                        if let Err(e) = loaded.sink.try_seek(Duration::ZERO) {
                            log::warn!("audio: rewind failed: {e}");
                        }
                    }
                }
                playing = false;
            }
            Ok(AudioCommand::Seek(position)) => {
                if let Some(loaded) = source.as_mut() {
                    if loaded.sink.empty() {
                        loaded.rewind_to = Some(position);
                    } else if let Err(e) = loaded.sink.try_seek(position) {
                        log::warn!("audio: seek failed: {e}");
                    }
                }
            }
            Ok(AudioCommand::Volume(level)) => {
                volume = level;
                if let Some(loaded) = &source {
                    loaded.sink.set_volume(level);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(loaded) = &source {
            let finished = playing && loaded.sink.empty();
            let position = loaded
                .rewind_to
                .filter(|_| loaded.sink.empty())
                .unwrap_or_else(|| loaded.sink.get_pos());
            update(&snapshot, |s| {
                s.position = position;
                s.finished = finished;
            });
        }
    }

    log::debug!("audio: command channel closed, output thread exiting");
}

/// Fetch `url` and queue it on a fresh, paused sink.
fn open_source(
    handle: &OutputStreamHandle,
    url: &str,
) -> Result<(LoadedSource, Option<Duration>), EngineError> {
    let body = reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.bytes())
        .map_err(|e| EngineError::Load(e.to_string()))?;
    let bytes: Arc<[u8]> = Arc::from(body.as_ref());

    let duration = decode(&bytes)?.total_duration();

    let sink = Sink::try_new(handle).map_err(|e| EngineError::Device(e.to_string()))?;
    sink.pause();
    queue(&sink, &bytes, Duration::ZERO)?;
    Ok((
        LoadedSource {
            bytes,
            sink,
            rewind_to: None,
        },
        duration,
    ))
}

/// Queue a fresh decoder when the sink has drained; otherwise do nothing.
fn refill(loaded: &mut LoadedSource) -> Result<(), EngineError> {
    let Some(start) = refill_start(loaded.sink.empty(), loaded.rewind_to.take()) else {
        return Ok(());
    };
    log::debug!("audio: source drained, requeueing from {start:?}");
    queue(&loaded.sink, &loaded.bytes, start)
}

/// Start offset for a new decoder, or `None` while the sink still holds one.
fn refill_start(sink_empty: bool, requested: Option<Duration>) -> Option<Duration> {
    sink_empty.then(|| requested.unwrap_or(Duration::ZERO))
}

fn decode(bytes: &Arc<[u8]>) -> Result<Decoder<Cursor<Arc<[u8]>>>, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::Decode("empty audio stream".into()));
    }
    Decoder::new(Cursor::new(Arc::clone(bytes))).map_err(|e| EngineError::Decode(e.to_string()))
}

fn queue(sink: &Sink, bytes: &Arc<[u8]>, start: Duration) -> Result<(), EngineError> {
    sink.append(decode(bytes)?);
    if !start.is_zero() {
        if let Err(e) = sink.try_seek(start) {
            log::warn!("audio: seek after requeue failed: {e}");
        }
    }
    Ok(())
}

fn update(snapshot: &SharedSnapshot, f: impl FnOnce(&mut Snapshot)) {
    match snapshot.lock() {
        Ok(mut guard) => f(&mut guard),
        Err(poisoned) => f(&mut poisoned.into_inner()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refill_only_when_drained() {
        assert_eq!(refill_start(false, None), None);
        assert_eq!(refill_start(false, Some(Duration::from_secs(3))), None);
    }

    #[test]
    fn drained_sink_restarts_from_beginning() {
        assert_eq!(refill_start(true, None), Some(Duration::ZERO));
    }

    #[test]
    fn drained_sink_honours_pending_seek() {
        assert_eq!(
            refill_start(true, Some(Duration::from_secs(12))),
            Some(Duration::from_secs(12))
        );
    }

    #[test]
    fn empty_bytes_are_a_decode_error() {
        let bytes: Arc<[u8]> = Arc::from(Vec::new());
        assert_eq!(
            decode(&bytes).err(),
            Some(EngineError::Decode("empty audio stream".into()))
        );
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let bytes: Arc<[u8]> = Arc::from(b"definitely not audio".to_vec());
        assert!(matches!(decode(&bytes), Err(EngineError::Decode(_))));
    }
}
