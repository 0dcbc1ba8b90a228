// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid job state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_names_both_states() {
        let err = DomainError::InvalidStateTransition {
            from: "COMPLETED".into(),
            to: "RUNNING".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid job state transition: COMPLETED -> RUNNING"
        );
    }
}
