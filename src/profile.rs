//! The sender profile carried in a DAKE pre-key message (`SPEC_FULL.md`
//! §4.4): deliberately minimal — a supported-versions list, an embedded
//! Ed448 long-term public key, and a signature over the two. The richer
//! client-profile lifecycle (expiry, transitional signatures, revocation)
//! is out of scope (§1) — this core only needs enough structure to say
//! "self-consistent, signature checks out."

use crate::config::SupportedVersion;
use crate::error::{OtrngError, Result};
use crate::primitives::sign::{LongTermSigningKey, LongTermVerifyingKey, ED448_SIGNATURE_BYTES};

#[derive(Clone)]
pub struct SenderProfile {
    pub versions: Vec<SupportedVersion>,
    pub long_term_key: LongTermVerifyingKey,
    signature: [u8; ED448_SIGNATURE_BYTES],
}

impl SenderProfile {
    /// Builds and self-signs a profile for `long_term_key`'s owner.
    pub fn create(
        versions: Vec<SupportedVersion>,
        signing_key: &LongTermSigningKey,
    ) -> Self {
        let long_term_key = signing_key.verifying_key();
        let body = signable_body(&versions, &long_term_key);
        let signature = signing_key.sign(&body);
        SenderProfile { versions, long_term_key, signature }
    }

    pub fn signature(&self) -> &[u8; ED448_SIGNATURE_BYTES] {
        &self.signature
    }

    /// Reconstructs a profile received off the wire, without checking its
    /// signature — callers must call [`valid`](Self::valid) before trusting it.
    pub fn from_parts(
        versions: Vec<SupportedVersion>,
        long_term_key: LongTermVerifyingKey,
        signature: [u8; ED448_SIGNATURE_BYTES],
    ) -> Self {
        SenderProfile { versions, long_term_key, signature }
    }

    /// Structural + signature validity: the profile's signature verifies
    /// against its own embedded long-term key. Part of the pre-key
    /// message's `valid_received_values` check (§4.4).
    pub fn valid(&self) -> Result<()> {
        if self.versions.is_empty() {
            return Err(OtrngError::InvalidPreKey("sender profile lists no supported versions"));
        }
        let body = signable_body(&self.versions, &self.long_term_key);
        self.long_term_key.verify(&body, &self.signature)
    }

    /// TLV encoding: 1-byte version count, the versions, the 57-byte
    /// long-term key, then the 114-byte signature.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.versions.len() + 57 + ED448_SIGNATURE_BYTES);
        out.push(self.versions.len() as u8);
        out.extend(self.versions.iter().map(|v| *v as u8));
        out.extend_from_slice(&self.long_term_key.to_bytes());
        out.extend_from_slice(&self.signature);
        out
    }

    /// Parses the encoding produced by [`to_bytes`](Self::to_bytes),
    /// returning the profile and the number of bytes consumed. Does not
    /// check the signature — call [`valid`](Self::valid) after.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize)> {
        let bad = || OtrngError::InvalidPreKey("truncated sender profile");
        let count = *data.first().ok_or_else(bad)? as usize;
        let mut offset = 1;

        let version_bytes = data.get(offset..offset + count).ok_or_else(bad)?;
        let versions = version_bytes
            .iter()
            .map(|b| match b {
                0x04 => Ok(SupportedVersion::V3),
                0x05 => Ok(SupportedVersion::V4),
                _ => Err(OtrngError::InvalidPreKey("unrecognised protocol version in profile")),
            })
            .collect::<Result<Vec<_>>>()?;
        offset += count;

        let key_bytes: [u8; 57] = data
            .get(offset..offset + 57)
            .ok_or_else(bad)?
            .try_into()
            .map_err(|_| bad())?;
        let long_term_key = LongTermVerifyingKey::from_bytes(&key_bytes)?;
        offset += 57;

        let signature: [u8; ED448_SIGNATURE_BYTES] = data
            .get(offset..offset + ED448_SIGNATURE_BYTES)
            .ok_or_else(bad)?
            .try_into()
            .map_err(|_| bad())?;
        offset += ED448_SIGNATURE_BYTES;

        Ok((SenderProfile { versions, long_term_key, signature }, offset))
    }
}

fn signable_body(versions: &[SupportedVersion], long_term_key: &LongTermVerifyingKey) -> Vec<u8> {
    let mut body = Vec::with_capacity(versions.len() + 57);
    body.extend(versions.iter().map(|v| *v as u8));
    body.extend_from_slice(&long_term_key.to_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::sign::LongTermSigningKey;

    #[test]
    fn freshly_created_profile_is_valid() {
        let signing_key = LongTermSigningKey::from_bytes(&[3u8; 57]);
        let profile = SenderProfile::create(vec![SupportedVersion::V4], &signing_key);
        assert!(profile.valid().is_ok());
    }

    #[test]
    fn tampered_versions_invalidate_the_signature() {
        let signing_key = LongTermSigningKey::from_bytes(&[4u8; 57]);
        let mut profile = SenderProfile::create(vec![SupportedVersion::V4], &signing_key);
        profile.versions.push(SupportedVersion::V3);
        assert!(profile.valid().is_err());
    }

    #[test]
    fn round_trips_through_bytes() {
        let signing_key = LongTermSigningKey::from_bytes(&[9u8; 57]);
        let profile = SenderProfile::create(vec![SupportedVersion::V4], &signing_key);
        let encoded = profile.to_bytes();
        let (decoded, consumed) = SenderProfile::from_bytes(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded.versions, profile.versions);
        assert_eq!(decoded.long_term_key.to_bytes(), profile.long_term_key.to_bytes());
        assert!(decoded.valid().is_ok());
    }

    #[test]
    fn profile_with_no_versions_is_rejected() {
        let signing_key = LongTermSigningKey::from_bytes(&[8u8; 57]);
        let empty = SenderProfile::create(vec![], &signing_key);
        assert!(empty.valid().is_err());
    }
}
