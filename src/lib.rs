//! Double-ratchet key management and DAKE pre-key codec for an OTR
//! version 4 engine: the shared secret produced by a completed DAKE
//! bootstraps a [`key_manager::KeyManager`], which owns the current and
//! previous [`ratchet::Ratchet`]s and derives per-message encryption and
//! MAC keys on demand.
//!
//! Out of scope here (see external collaborators): payload encryption,
//! transport, fragmentation, SMP, and the full client-profile lifecycle.

pub mod chain;
pub mod config;
pub mod dake;
pub mod error;
pub mod key_manager;
pub mod primitives;
pub mod profile;
pub mod ratchet;
pub mod state;

pub use config::Policy;
pub use error::{OtrngError, Result};
pub use key_manager::{KeyManager, MessageKeys};
pub use state::{Conversation, ConversationPhase};
