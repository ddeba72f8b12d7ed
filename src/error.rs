use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Error taxonomy for a workflow run.
///
/// Every variant is fatal to the run in which it occurs: a half-completed
/// liquid operation cannot be safely resumed, so nothing in this crate
/// retries. Errors surfaced to the operator carry the failing step index
/// and container label via [`ProtocolError::StepFailed`].
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Invalid plan, labware, or mapping parameters. Always detected at
    /// plan-construction time, before any liquid is moved.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A consumable allocation could not be satisfied, either because the
    /// pool ran dry or because a specific address is absent or spent.
    #[error("Tip pool exhausted: {0}")]
    PoolExhausted(String),

    /// The actuation layer reported a mechanical or physical failure.
    /// The liquid state at the point of failure is unknown.
    #[error("Actuation fault in {call}: {message}")]
    ActuationFault { call: &'static str, message: String },

    /// Wrapper adding run context to a failure inside one plan step.
    #[error("Step {step_index} ({container}) failed: {source}")]
    StepFailed {
        step_index: usize,
        container: String,
        #[source]
        source: Box<ProtocolError>,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ProtocolError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn fault(call: &'static str, message: impl Into<String>) -> Self {
        Self::ActuationFault {
            call,
            message: message.into(),
        }
    }

    /// Wraps an error with the step index and container label it occurred in.
    pub fn in_step(self, step_index: usize, container: impl Into<String>) -> Self {
        Self::StepFailed {
            step_index,
            container: container.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failed_names_index_and_container() {
        let err = ProtocolError::config("volume must be positive").in_step(3, "plate24_1A");
        let msg = err.to_string();
        assert!(msg.contains("Step 3"));
        assert!(msg.contains("plate24_1A"));
    }

    #[test]
    fn test_fault_message_names_primitive() {
        let err = ProtocolError::fault("dispense", "plunger stall");
        assert!(err.to_string().contains("dispense"));
    }
}
