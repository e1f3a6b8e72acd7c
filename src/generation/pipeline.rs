//! Single-flight generation pipeline.
//!
//! [`GenerationPipeline`] never performs I/O itself.  [`submit`] records a new
//! request and hands back the code snapshot to send; whoever performs the
//! network call later feeds the outcome to [`resolve`] together with the
//! request id captured at submit time.  Only the most recently submitted
//! request can resolve to `Succeeded` or `Failed`; everything else resolves
//! to `Stale`, whatever order responses arrive in.
//!
//! [`submit`]: GenerationPipeline::submit
//! [`resolve`]: GenerationPipeline::resolve

use crate::documents::Document;
use crate::service::{SendCodeReply, ServiceError};

use super::artifact::{Artifact, ArtifactFactory};
use super::request::{GenerationRequest, RequestId, RequestState};

/// Reply text the service sends when it accepted the code.
pub const ACCEPTED_MESSAGE: &str = "Code received!";

// ---------------------------------------------------------------------------
// Submission / Resolution
// ---------------------------------------------------------------------------

/// What the caller needs to issue the remote call for a new request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub request_id: RequestId,
    pub code: String,
}

/// Externally visible outcome of one response.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The current request succeeded; `artifact` must go to playback.
    Succeeded {
        request_id: RequestId,
        document_name: String,
        artifact: Artifact,
    },
    /// The current request failed; `cause` is human readable.
    Failed {
        request_id: RequestId,
        document_name: String,
        cause: String,
    },
    /// The response belonged to a superseded request and must be ignored.
    Stale { request_id: RequestId },
}

// ---------------------------------------------------------------------------
// GenerationPipeline
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct GenerationPipeline {
    artifacts: ArtifactFactory,
    next_id: u64,
    current: Option<GenerationRequest>,
    stale_count: u64,
}

impl GenerationPipeline {
    /// `stream_url` is the stable audio location artifacts are minted from.
    pub fn new(stream_url: impl Into<String>) -> Self {
        Self {
            artifacts: ArtifactFactory::new(stream_url),
            next_id: 1,
            current: None,
            stale_count: 0,
        }
    }

    /// Start a new request for `document`, superseding any request still in
    /// flight.  The returned code is a snapshot; later edits to the document
    /// do not change it.
    pub fn submit(&mut self, document: &Document) -> Submission {
        if let Some(previous) = self.current.as_mut() {
            if previous.state == RequestState::Sending {
                log::debug!("generation: {} superseded, marking stale", previous.id);
                previous.state = RequestState::Stale;
                self.stale_count += 1;
            }
        }

        let id = RequestId(self.next_id);
        self.next_id += 1;

        let mut request = GenerationRequest::new(
            id,
            document.id(),
            document.display_name().to_string(),
            document.content().to_string(),
        );
        request.state = RequestState::Sending;
        log::info!(
            "generation: {id} sending {} ({} bytes)",
            request.document_name,
            request.submitted_content.len()
        );

        let submission = Submission {
            request_id: id,
            code: request.submitted_content.clone(),
        };
        self.current = Some(request);
        submission
    }

    /// Apply the outcome of the remote call made for `request_id`.
    pub fn resolve(
        &mut self,
        request_id: RequestId,
        result: Result<SendCodeReply, ServiceError>,
    ) -> Resolution {
        let request = match self.current.as_mut() {
            Some(request) if request.id == request_id && request.state == RequestState::Sending => {
                request
            }
            _ => {
                log::debug!("generation: discarding late response for {request_id}");
                return Resolution::Stale { request_id };
            }
        };

        match result.and_then(accept_reply) {
            Ok(()) => {
                let artifact = self.artifacts.mint();
                request.state = RequestState::Succeeded;
                request.artifact = Some(artifact.clone());
                log::info!("generation: {request_id} succeeded -> {}", artifact.url);
                Resolution::Succeeded {
                    request_id,
                    document_name: request.document_name.clone(),
                    artifact,
                }
            }
            Err(e) => {
                let cause = e.to_string();
                request.state = RequestState::Failed;
                request.error = Some(cause.clone());
                log::error!("generation: {request_id} failed: {cause}");
                Resolution::Failed {
                    request_id,
                    document_name: request.document_name.clone(),
                    cause,
                }
            }
        }
    }

    /// The most recently submitted request, whatever its state.
    pub fn current(&self) -> Option<&GenerationRequest> {
        self.current.as_ref()
    }

    /// `true` while the most recent request awaits its response.
    pub fn is_sending(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|request| request.state == RequestState::Sending)
    }

    /// Number of requests superseded while still in flight.
    pub fn stale_count(&self) -> u64 {
        self.stale_count
    }
}

/// Application-level acceptance check on a transport-level success.
fn accept_reply(reply: SendCodeReply) -> Result<(), ServiceError> {
    if let Some(code) = reply.code.as_u64() {
        if code >= 400 {
            return Err(ServiceError::Rejected(format!("{} (code {code})", reply.message)));
        }
    }
    if reply.message != ACCEPTED_MESSAGE {
        let message = if reply.message.is_empty() {
            "unexpected reply".to_string()
        } else {
            reply.message
        };
        return Err(ServiceError::Rejected(message));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
