//! Pyzart Studio: client orchestration for code-to-music generation.
//!
//! Documents are edited locally, submitted to a remote generation service,
//! and the resulting audio is played back with transport controls while a
//! status log and an assistant chat run alongside.
//!
//! [`app::Studio`] ties the subsystems together; each subsystem is usable on
//! its own.

pub mod app;
pub mod chat;
pub mod config;
pub mod console;
pub mod documents;
pub mod generation;
pub mod playback;
pub mod service;
pub mod status;
