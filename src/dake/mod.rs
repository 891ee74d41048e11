//! The DAKE pre-key message: the first wire-level message of a
//! conversation, carrying the sender profile and both ephemeral public
//! keys (`SPEC_FULL.md` §4.4).

pub mod prekey;

pub use prekey::PreKeyMessage;
