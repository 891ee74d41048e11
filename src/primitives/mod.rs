//! Typed wrappers over the raw cryptographic primitives this crate
//! consumes as an external capability (`SPEC_FULL.md` §1, §6): Ed448
//! ECDH, DH-3072, SHA3-256/512 (+ the one-byte-magic KDF), and a CSPRNG.
//!
//! Nothing in this module implements curve or bignum arithmetic itself —
//! it is a narrow façade over `ed448-goldilocks` and `num-bigint` so the
//! ratchet/key-manager code above never imports those crates directly.

pub mod dh;
pub mod ecdh;
pub mod hash;
pub mod rng;
pub mod sign;
