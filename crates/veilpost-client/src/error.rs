//! Registration error type.

use thiserror::Error;

/// Errors from the directory-write endpoint.
///
/// Conflict and not-found responses are not errors (see
/// [`crate::RegisterOutcome`]); this type covers transport failures and
/// outright rejections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The request never produced a directory response.
    #[error("registration request failed: {reason}")]
    Network {
        /// Underlying transport failure.
        reason: String,
    },

    /// The directory answered with a status outside the contract.
    #[error("registration rejected with status {status}: {reason}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        reason: String,
    },
}

impl RegistrationError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Network failures and server-side errors are transient; a 4xx
    /// rejection (auth, validation) indicates the request itself is wrong
    /// and will not succeed unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Rejected { status, .. } => *status >= 500,
        }
    }
}
