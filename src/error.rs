//! Pipeline error taxonomy.
//!
//! Only [`PipelineError::InvalidInput`] ever escapes the public entry point.
//! Everything else is recovered by the component that hit it and rendered
//! into a report warning.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Network failure, timeout, or a provider that is not reachable.
    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable { collaborator: String, reason: String },

    /// Bad JSON or an unexpected shape from an AI or search collaborator.
    #[error("malformed response from {collaborator}: {reason}")]
    MalformedResponse { collaborator: String, reason: String },

    /// Fewer usable evidence items than a verdict needs.
    #[error("insufficient evidence: {usable} usable item(s), at least {required} required")]
    InsufficientEvidence { usable: usize, required: usize },

    /// Empty or oversized claim text. Rejected before analysis starts.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl PipelineError {
    pub fn unavailable(collaborator: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: collaborator.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(collaborator: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::MalformedResponse {
            collaborator: collaborator.into(),
            reason: reason.to_string(),
        }
    }

    pub fn timed_out(collaborator: impl Into<String>, after: std::time::Duration) -> Self {
        Self::unavailable(collaborator, format!("timed out after {}s", after.as_secs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = PipelineError::timed_out("newsdata", std::time::Duration::from_secs(15));
        assert_eq!(e.to_string(), "newsdata unavailable: timed out after 15s");

        let e = PipelineError::malformed("llm", "expected JSON object");
        assert_eq!(e.to_string(), "malformed response from llm: expected JSON object");

        let e = PipelineError::InsufficientEvidence {
            usable: 1,
            required: 2,
        };
        assert!(e.to_string().contains("1 usable item(s)"));
    }
}
