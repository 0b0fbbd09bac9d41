use thiserror::Error;

/// Failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the error from the final attempt
    #[error("Failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: E },

    /// The classifier marked the error as fatal before attempts ran out
    #[error("{0}")]
    NonRetryable(E),
}

impl<E> RetryError<E> {
    /// Number of attempts made, where known
    ///
    /// A fatal error does not record how many attempts preceded it and
    /// reports one.
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::NonRetryable(_) => 1,
        }
    }

    /// The underlying error, whichever way the loop ended
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last_error, .. } => last_error,
            Self::NonRetryable(error) => error,
        }
    }

    pub const fn last_error(&self) -> &E {
        match self {
            Self::Exhausted { last_error, .. } => last_error,
            Self::NonRetryable(error) => error,
        }
    }
}
