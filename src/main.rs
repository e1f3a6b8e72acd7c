//! Application entry point: Pyzart Studio console client.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the HTTP service client from config.
//! 5. Open the audio engine (real output with `audio-output`, silent
//!    otherwise).
//! 6. Spawn the [`Studio`] event loop and a view printer on the runtime.
//! 7. Read commands from stdin until `quit` or end of input.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use pyzart_studio::{
    app::{Studio, StudioCommand, StudioView},
    config::AppConfig,
    console::{parse_line, render_view, ConsoleError, ConsoleInput, ViewPrinter, HELP},
    playback::AudioEngine,
    service::{HttpService, StudioService},
};

// ---------------------------------------------------------------------------
// Audio engine selection
// ---------------------------------------------------------------------------

#[cfg(feature = "audio-output")]
fn open_engine() -> Box<dyn AudioEngine> {
    match pyzart_studio::playback::RodioEngine::open() {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            log::warn!("Audio output unavailable ({e}); playing silently");
            Box::new(pyzart_studio::playback::SilentEngine::new())
        }
    }
}

#[cfg(not(feature = "audio-output"))]
fn open_engine() -> Box<dyn AudioEngine> {
    log::info!("Built without audio output; playing silently");
    Box::new(pyzart_studio::playback::SilentEngine::new())
}

// ---------------------------------------------------------------------------
// Console loop
// ---------------------------------------------------------------------------

async fn print_views(mut views: watch::Receiver<StudioView>) {
    let mut printer = ViewPrinter::starting_at(&views.borrow());
    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();
        for line in printer.changes(&view) {
            println!("{line}");
        }
    }
}

async fn read_commands(
    commands: mpsc::Sender<StudioCommand>,
    views: watch::Receiver<StudioView>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        match parse_line(&line) {
            Ok(ConsoleInput::Command(command)) => {
                if commands.send(command).await.is_err() {
                    log::warn!("Studio has stopped; exiting");
                    break;
                }
            }
            Ok(ConsoleInput::Show) => println!("{}", render_view(&views.borrow())),
            Ok(ConsoleInput::Help) => println!("{HELP}"),
            Ok(ConsoleInput::Quit) => break,
            Err(ConsoleError::Empty) => {}
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Pyzart Studio starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async move {
        // 4. Service client
        let service: Arc<dyn StudioService> = Arc::new(HttpService::from_config(&config.service));
        log::info!("Generation service at {}", config.service.base_url);

        // 5. Audio engine
        let engine = open_engine();

        // 6. Studio + printer
        let studio = Studio::new(&config, service, engine);
        let (command_tx, command_rx) = mpsc::channel::<StudioCommand>(32);
        let (view_tx, view_rx) = watch::channel(studio.view());

        println!("{}", render_view(&view_rx.borrow()));
        println!("type `help` for commands");

        let studio_task = tokio::spawn(studio.run(command_rx, view_tx));
        let printer_task = tokio::spawn(print_views(view_rx.clone()));

        // 7. Console input
        let result = read_commands(command_tx, view_rx).await;

        // Dropping the sender above stops the studio, which closes the views.
        if let Err(e) = studio_task.await {
            log::error!("Studio task failed: {e}");
        }
        let _ = printer_task.await;
        result
    })
}
