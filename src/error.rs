use thiserror::Error;

/// Faults raised inside a flow.
///
/// Most code propagates plain `anyhow::Error`; the flow boundary wraps
/// whatever is not a click or timeout failure as `Unhandled`.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Direct, pointer and script clicks all failed
    #[error("all click strategies failed for {target}: {last_error}")]
    ClickFailure { target: String, last_error: String },

    /// An element or signal never showed up within its bound
    #[error("timed out after {timeout_ms}ms waiting for {what}")]
    TimeoutFailure { what: String, timeout_ms: u64 },

    /// Any other fault
    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

impl FlowError {
    pub fn timeout(what: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::TimeoutFailure {
            what: what.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Short machine-friendly tag used in result records
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::ClickFailure { .. } => "click_failure",
            FlowError::TimeoutFailure { .. } => "timeout_failure",
            FlowError::Unhandled(_) => "unhandled",
        }
    }

    /// Classify an error coming out of a flow
    pub fn classify(err: anyhow::Error) -> Self {
        match err.downcast::<FlowError>() {
            Ok(flow_err) => flow_err,
            Err(other) => FlowError::Unhandled(other),
        }
    }
}
