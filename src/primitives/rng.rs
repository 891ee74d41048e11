//! CSPRNG wrapper. A thin re-export so the rest of the crate names one
//! source of randomness instead of reaching for `rand::thread_rng()` or
//! `OsRng` inconsistently across modules.

use rand_core::{CryptoRng, RngCore};

/// Fills `buf` with cryptographically strong random bytes.
pub fn random_bytes(buf: &mut [u8]) {
    rand::rngs::OsRng.fill_bytes(buf);
}

/// The process's default CSPRNG, for callers that need an `RngCore` to
/// pass into key generation.
pub fn os_rng() -> impl RngCore + CryptoRng {
    rand::rngs::OsRng
}
