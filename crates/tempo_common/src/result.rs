//! Common result and error types for the Tempo timing analyzer.

/// The standard result type for fallible internal operations.
///
/// `Err` indicates an unrecoverable internal error (a bug in Tempo), not a
/// user-facing error. User-facing conditions (unconstrained endpoints,
/// ambiguous constraints) are reported through the diagnostics crate and the
/// operation still returns `Ok`.
pub type StaResult<T> = Result<T, InternalError>;

/// An internal engine error indicating a bug in Tempo, not a user input
/// problem.
///
/// These errors should never occur during normal operation. If one does, the
/// search state is poisoned and must be cleared before further use.
#[derive(Debug, thiserror::Error)]
#[error("internal timing engine error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("tag index overflow");
        assert_eq!(
            format!("{err}"),
            "internal timing engine error: tag index overflow"
        );
    }

    #[test]
    fn ok_path() {
        let r: StaResult<u32> = Ok(7);
        assert_eq!(r.ok(), Some(7));
    }

    #[test]
    fn from_string() {
        let err: InternalError = "boom".to_string().into();
        assert_eq!(err.message, "boom");
    }
}
