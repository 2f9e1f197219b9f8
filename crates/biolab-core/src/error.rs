//! Assessment error types.
//!
//! Every failure a student or teacher can run into maps onto one of these
//! variants. The `Display` text is for operators and logs; end users only ever
//! see [`AssessmentError::user_message`].

use thiserror::Error;

/// Errors surfaced by the quiz, assessment, aggregation and session layers.
#[derive(Debug, Error)]
pub enum AssessmentError {
    /// The AI boundary was unreachable, answered with an error, or returned a
    /// payload that does not match the expected schema.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Local input is incomplete (e.g. empty student name). Never reaches the network.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Wrong teacher passphrase.
    #[error("access code rejected")]
    Auth,

    /// The requested action is not allowed in the current state.
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

impl AssessmentError {
    pub fn generation(cause: impl std::fmt::Display) -> Self {
        AssessmentError::Generation(cause.to_string())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AssessmentError::Validation(message.into())
    }

    /// Returns `true` when a manual retry of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AssessmentError::Generation(_))
    }

    /// Message safe to show inline to a student or teacher.
    ///
    /// Generation failures collapse to a generic sentence; the cause has
    /// already been logged where the error was produced.
    pub fn user_message(&self) -> String {
        match self {
            AssessmentError::Generation(_) => {
                "Something went wrong while analysing the data. Please try again.".to_string()
            }
            AssessmentError::Validation(message) => message.clone(),
            AssessmentError::Auth => "The access code is incorrect.".to_string(),
            AssessmentError::InvalidTransition { .. } => {
                "That action is not available right now.".to_string()
            }
        }
    }
}
