//! Typed error taxonomy for the ratchet/DAKE core.
//!
//! Every fallible entry point in this crate returns `Result<T, OtrngError>`.
//! No variant carries secret material — by the time an error is constructed
//! on any given path, the secret bytes that led to it have already been
//! zeroized.

use thiserror::Error;

/// The single error type returned by this crate's public API.
#[derive(Debug, Error)]
pub enum OtrngError {
    /// An ECDH or DH agreement failed, or produced a forbidden value
    /// (identity point, or a DH result outside `[2, p-2]`). Fatal to the
    /// conversation.
    #[error("key exchange failed")]
    KeyExchangeError,

    /// A receive referenced a ratchet id that is neither the current one
    /// nor the immediately previous one. Not fatal — drop the message.
    #[error("ratchet {0} not found (current is {1})")]
    RatchetNotFound(u32, u32),

    /// The requested chain index exceeds the configured backfill cap.
    /// Not fatal — drop the message.
    #[error("message id {requested} exceeds backfill cap {cap}")]
    MessageIdTooLarge { requested: u32, cap: u32 },

    /// A pre-key message failed a structural or signature check on
    /// receipt. Rejects this DAKE attempt, not fatal to the host.
    #[error("invalid pre-key message: {0}")]
    InvalidPreKey(&'static str),

    /// An internally computed id disagreed with the expected sending
    /// counter. Indicates a programming error; fatal.
    #[error("internal invariant violated: {0}")]
    InternalInvariantError(&'static str),

    /// Allocation failed while extending a chain. Fatal to the current
    /// operation.
    #[error("out of memory while extending a chain")]
    OutOfMemory,
}

pub type Result<T> = std::result::Result<T, OtrngError>;
