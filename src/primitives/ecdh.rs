//! Ed448 ECDH wrapper.
//!
//! Wraps `ed448-goldilocks`'s Edwards-curve point/scalar arithmetic into
//! the narrow shape the ratchet needs: generate an ephemeral keypair, and
//! agree on a 56-byte shared secret. Point validation (non-identity,
//! correct order) and private-scalar derivation/clamping live here so the
//! rest of the crate never touches raw curve types.

use ed448_goldilocks::{CompressedEdwardsY, EdwardsPoint, Scalar};
use rand_core::{CryptoRng, RngCore};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{OtrngError, Result};

/// Length of an encoded Ed448 point (457-bit encoding padded to 57 bytes).
pub const ED448_POINT_BYTES: usize = 57;

/// Length of the symmetric seed from which a private scalar is derived.
pub const ED448_PRIVATE_BYTES: usize = 57;

/// Length of a completed ECDH agreement, per `SPEC_FULL.md` §4.3.
pub const ECDH_SHARED_SECRET_BYTES: usize = 56;

/// An Ed448 private scalar, zeroized on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct EcdhPrivateKey(Scalar);

/// An Ed448 public point. Not secret; no zeroize requirement.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EcdhPublicKey(CompressedEdwardsY);

impl EcdhPublicKey {
    pub fn from_bytes(bytes: &[u8; ED448_POINT_BYTES]) -> Self {
        Self(CompressedEdwardsY(*bytes))
    }

    pub fn to_bytes(&self) -> [u8; ED448_POINT_BYTES] {
        self.0 .0
    }

    /// Decodes and checks this is a valid, non-identity point of the
    /// expected order. Required before using it in an agreement or
    /// accepting it from the wire (`valid_received_values`, §4.4).
    pub fn validate(&self) -> Result<EdwardsPoint> {
        let point = self
            .0
            .decompress()
            .ok_or(OtrngError::KeyExchangeError)?;
        if point.is_identity() {
            return Err(OtrngError::KeyExchangeError);
        }
        if !point.is_torsion_free() {
            return Err(OtrngError::KeyExchangeError);
        }
        Ok(point)
    }

    /// Big-endian-unsigned-integer comparison used for the A/B chain
    /// tie-break (§3 "Message chain selection"). Ed448 points are encoded
    /// little-endian on the wire, so this reverses the encoding first.
    pub fn cmp_as_unsigned_be(&self, other: &Self) -> std::cmp::Ordering {
        let mut a = self.to_bytes();
        let mut b = other.to_bytes();
        a.reverse();
        b.reverse();
        a.cmp(&b)
    }
}

impl ConstantTimeEq for EcdhPublicKey {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0 .0.ct_eq(&other.0 .0)
    }
}

/// Generates a fresh Ed448 ECDH keypair from CSPRNG entropy, following the
/// original's "derive a scalar from a random symmetric seed" convention
/// (RFC 8032 §5.2.5 key generation: SHAKE256-expand the seed, clamp, and
/// reduce to a scalar).
pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> (EcdhPrivateKey, EcdhPublicKey) {
    let mut seed = [0u8; ED448_PRIVATE_BYTES];
    rng.fill_bytes(&mut seed);
    let keypair = from_symmetric_seed(&seed);
    seed.zeroize();
    keypair
}

/// Deterministically derives a keypair from a fixed symmetric seed. Used
/// by tests that need reproducible ephemerals (scenario fixtures in
/// `SPEC_FULL.md` §8), and internally by [`generate`].
pub fn from_symmetric_seed(seed: &[u8; ED448_PRIVATE_BYTES]) -> (EcdhPrivateKey, EcdhPublicKey) {
    let mut xof = Shake256::default();
    xof.update(seed);
    let mut reader = xof.finalize_xof();
    let mut expanded = [0u8; 114];
    reader.read(&mut expanded);

    // RFC 8032 Ed448 clamping.
    expanded[0] &= 0xFC;
    expanded[55] |= 0x80;
    expanded[56] = 0;

    let scalar = Scalar::from_bytes_mod_order_wide(&expanded);
    expanded.zeroize();

    let public_point = EdwardsPoint::GENERATOR * scalar;
    let public = EcdhPublicKey(public_point.compress());
    (EcdhPrivateKey(scalar), public)
}

/// Computes the 56-byte ECDH shared secret `priv * their_pub`.
///
/// Fails with [`OtrngError::KeyExchangeError`] if `their_pub` does not
/// decode to a valid, non-identity point of the expected order.
pub fn agree(private: &EcdhPrivateKey, their_public: &EcdhPublicKey) -> Result<[u8; ECDH_SHARED_SECRET_BYTES]> {
    let their_point = their_public.validate()?;
    let shared_point = their_point * private.0;
    if shared_point.is_identity() {
        return Err(OtrngError::KeyExchangeError);
    }
    let compressed = shared_point.compress().0;
    let mut out = [0u8; ECDH_SHARED_SECRET_BYTES];
    out.copy_from_slice(&compressed[..ECDH_SHARED_SECRET_BYTES]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn agreement_is_symmetric() {
        let (a_priv, a_pub) = generate(&mut OsRng);
        let (b_priv, b_pub) = generate(&mut OsRng);

        let shared_a = agree(&a_priv, &b_pub).unwrap();
        let shared_b = agree(&b_priv, &a_pub).unwrap();
        assert_eq!(shared_a, shared_b);
    }

    #[test]
    fn deterministic_seed_is_reproducible() {
        let seed = [0x01u8; ED448_PRIVATE_BYTES];
        let (_, pub_a) = from_symmetric_seed(&seed);
        let (_, pub_b) = from_symmetric_seed(&seed);
        assert_eq!(pub_a.to_bytes(), pub_b.to_bytes());
    }

    #[test]
    fn identity_point_is_rejected() {
        let identity = EcdhPublicKey::from_bytes(&[0u8; ED448_POINT_BYTES]);
        assert!(identity.validate().is_err());
    }
}
