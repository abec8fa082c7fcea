//! Errors raised by handle conversions.

use thiserror::Error;

/// The ways a handle conversion can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A [`Weak`](crate::Weak) was promoted after its pointee had been destroyed.
    #[error("expired reference: the pointee has already been destroyed")]
    Expired,
}

/// Result type for handle conversions.
pub type Result<T, E = Error> = core::result::Result<T, E>;
