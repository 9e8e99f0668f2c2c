use thiserror::Error;

use crate::challenge::Strategy;

/// Failures surfaced by challenge generation and dictionary lookup.
#[derive(Debug, Error)]
pub enum ChallengeError {
    /// The sampling budget ran out before enough matches were found.
    ///
    /// Recoverable: callers are expected to retry, possibly with relaxed
    /// parameters.
    #[error(
        "could not satisfy challenge requirements with given dictionary \
         ({strategy} strategy, attempted {attempts} times)"
    )]
    Unsatisfiable { strategy: Strategy, attempts: usize },
    #[error("unknown dictionary '{0}'")]
    UnknownDictionary(String),
}
