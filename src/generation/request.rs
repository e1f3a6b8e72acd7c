//! Generation request record and its lifecycle states.

use std::fmt;

use crate::documents::DocumentId;

use super::artifact::Artifact;

/// Monotonic identifier of a submission.  A larger id always means a later
/// submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Lifecycle of a [`GenerationRequest`].
///
/// ```text
/// Idle ──submit──▶ Sending ──ok──────▶ Succeeded
///                          ──error───▶ Failed
///                          ──superseded / late──▶ Stale
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Sending,
    Succeeded,
    Failed,
    Stale,
}

impl RequestState {
    /// `true` once the request can no longer change state.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            RequestState::Succeeded | RequestState::Failed | RequestState::Stale
        )
    }
}

/// One "run" of a document against the generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub id: RequestId,
    pub document_id: DocumentId,
    /// Display name at submit time, used in status messages.
    pub document_name: String,
    /// Snapshot of the document content when the request was created.
    pub submitted_content: String,
    pub state: RequestState,
    pub artifact: Option<Artifact>,
    pub error: Option<String>,
}

impl GenerationRequest {
    pub(crate) fn new(
        id: RequestId,
        document_id: DocumentId,
        document_name: String,
        submitted_content: String,
    ) -> Self {
        Self {
            id,
            document_id,
            document_name,
            submitted_content,
            state: RequestState::Idle,
            artifact: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settled_states() {
        assert!(!RequestState::Idle.is_settled());
        assert!(!RequestState::Sending.is_settled());
        assert!(RequestState::Succeeded.is_settled());
        assert!(RequestState::Failed.is_settled());
        assert!(RequestState::Stale.is_settled());
    }

    #[test]
    fn request_ids_order_by_submission() {
        assert!(RequestId(2) > RequestId(1));
        assert_eq!(RequestId(3).to_string(), "req-3");
    }
}
