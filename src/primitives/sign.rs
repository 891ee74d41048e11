//! Ed448 signing, used only to check a sender profile's self-signature
//! (`SPEC_FULL.md` §4.4). The ratchet itself never signs anything — this
//! is a narrow façade the `profile` module leans on.

use ed448_goldilocks::{Signature, SigningKey, VerifyingKey};
use signature::{Signer, Verifier};

use crate::error::{OtrngError, Result};

pub const ED448_SIGNATURE_BYTES: usize = 114;

pub struct LongTermSigningKey(SigningKey);

impl LongTermSigningKey {
    pub fn from_bytes(bytes: &[u8; 57]) -> Self {
        Self(SigningKey::from_bytes(bytes))
    }

    pub fn verifying_key(&self) -> LongTermVerifyingKey {
        LongTermVerifyingKey(self.0.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; ED448_SIGNATURE_BYTES] {
        self.0.sign(message).to_bytes()
    }
}

#[derive(Clone, Copy)]
pub struct LongTermVerifyingKey(VerifyingKey);

impl LongTermVerifyingKey {
    pub fn from_bytes(bytes: &[u8; 57]) -> Result<Self> {
        VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| OtrngError::InvalidPreKey("malformed long-term public key"))
    }

    pub fn to_bytes(&self) -> [u8; 57] {
        self.0.to_bytes()
    }

    /// Verifies `signature` over `message`. Any malformed signature or
    /// verification failure collapses to `InvalidPreKey` — the core never
    /// distinguishes "bad encoding" from "bad signature" to a caller.
    pub fn verify(&self, message: &[u8], signature: &[u8; ED448_SIGNATURE_BYTES]) -> Result<()> {
        let sig = Signature::from_bytes(signature)
            .map_err(|_| OtrngError::InvalidPreKey("malformed profile signature"))?;
        self.0
            .verify(message, &sig)
            .map_err(|_| OtrngError::InvalidPreKey("profile signature did not verify"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips() {
        let signing = LongTermSigningKey::from_bytes(&[5u8; 57]);
        let verifying = signing.verifying_key();
        let sig = signing.sign(b"profile bytes");
        assert!(verifying.verify(b"profile bytes", &sig).is_ok());
    }

    #[test]
    fn tampered_message_fails_verification() {
        let signing = LongTermSigningKey::from_bytes(&[6u8; 57]);
        let verifying = signing.verifying_key();
        let sig = signing.sign(b"profile bytes");
        assert!(verifying.verify(b"different bytes", &sig).is_err());
    }
}
