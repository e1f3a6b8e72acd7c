//! Remote service module: the HTTP collaborator that turns code into audio
//! and answers chat questions.
//!
//! * [`StudioService`]: async trait implemented by all service backends.
//! * [`HttpService`]: JSON-over-HTTP implementation built with `reqwest`.
//! * [`ServiceError`]: transport, status and parse failures.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pyzart_studio::config::AppConfig;
//! use pyzart_studio::service::{HttpService, StudioService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let service = HttpService::from_config(&config.service);
//!
//!     let reply = service.send_code("piano = Piano()").await;
//!     println!("{reply:?} -> audio at {}", service.stream_url());
//! }
//! ```

pub mod client;

pub use client::{HttpService, SendCodeReply, ServiceError, StudioService};
