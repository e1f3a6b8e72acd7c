//! Generation pipeline: turns "run" on the active document into exactly one
//! observable outcome.
//!
//! # Flow
//!
//! ```text
//! submit(document)            → Submission { request_id, code }
//!   (caller sends `code` to StudioService::send_code)
//! resolve(request_id, result) → Succeeded { artifact } | Failed { cause } | Stale
//! ```
//!
//! Staleness is an explicit id comparison against the latest submission,
//! never inferred from arrival order.

pub mod artifact;
pub mod pipeline;
pub mod request;

pub use artifact::{Artifact, ArtifactFactory};
pub use pipeline::{GenerationPipeline, Resolution, Submission, ACCEPTED_MESSAGE};
pub use request::{GenerationRequest, RequestId, RequestState};
