//! Wire codec for the DAKE pre-key message (`SPEC_FULL.md` §4.4).

use crate::config::PROTOCOL_VERSION;
use crate::error::{OtrngError, Result};
use crate::primitives::dh::DhPublicKey;
use crate::primitives::ecdh::{EcdhPublicKey, ED448_POINT_BYTES};
use crate::profile::SenderProfile;

/// Arbitrary but fixed message-type octet distinguishing a pre-key
/// message from the DAKE's other message types (not modeled here).
pub const PREKEY_MSG_TYPE: u8 = 0x0F;

pub struct PreKeyMessage {
    pub sender_instance_tag: u32,
    pub receiver_instance_tag: u32,
    pub profile: SenderProfile,
    pub y: EcdhPublicKey,
    pub b: DhPublicKey,
}

impl PreKeyMessage {
    pub fn new(
        sender_instance_tag: u32,
        receiver_instance_tag: u32,
        profile: SenderProfile,
        y: EcdhPublicKey,
        b: DhPublicKey,
    ) -> Self {
        PreKeyMessage { sender_instance_tag, receiver_instance_tag, profile, y, b }
    }

    /// Big-endian wire form: version, type, both instance tags, the
    /// TLV profile, a length-prefixed `Y`, and a length-prefixed `B`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        out.push(PREKEY_MSG_TYPE);
        out.extend_from_slice(&self.sender_instance_tag.to_be_bytes());
        out.extend_from_slice(&self.receiver_instance_tag.to_be_bytes());
        out.extend_from_slice(&self.profile.to_bytes());

        let y_bytes = self.y.to_bytes();
        out.extend_from_slice(&(y_bytes.len() as u16).to_be_bytes());
        out.extend_from_slice(&y_bytes);

        let b_bytes = self.b.to_bytes_be();
        out.extend_from_slice(&(b_bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&b_bytes);

        out
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let bad = || OtrngError::InvalidPreKey("truncated pre-key message");

        let version = u16::from_be_bytes(data.get(0..2).ok_or_else(bad)?.try_into().unwrap());
        if version != PROTOCOL_VERSION {
            return Err(OtrngError::InvalidPreKey("unsupported protocol version"));
        }
        let message_type = *data.get(2).ok_or_else(bad)?;
        if message_type != PREKEY_MSG_TYPE {
            return Err(OtrngError::InvalidPreKey("not a pre-key message"));
        }

        let sender_instance_tag =
            u32::from_be_bytes(data.get(3..7).ok_or_else(bad)?.try_into().unwrap());
        let receiver_instance_tag =
            u32::from_be_bytes(data.get(7..11).ok_or_else(bad)?.try_into().unwrap());

        let mut offset = 11;
        let (profile, consumed) = SenderProfile::from_bytes(&data[offset..])?;
        offset += consumed;

        let y_len = u16::from_be_bytes(
            data.get(offset..offset + 2).ok_or_else(bad)?.try_into().unwrap(),
        ) as usize;
        offset += 2;
        if y_len != ED448_POINT_BYTES {
            return Err(OtrngError::InvalidPreKey("unexpected Y field length"));
        }
        let y_bytes: [u8; ED448_POINT_BYTES] =
            data.get(offset..offset + y_len).ok_or_else(bad)?.try_into().map_err(|_| bad())?;
        offset += y_len;
        let y = EcdhPublicKey::from_bytes(&y_bytes);

        let b_len = u32::from_be_bytes(
            data.get(offset..offset + 4).ok_or_else(bad)?.try_into().unwrap(),
        ) as usize;
        offset += 4;
        let b_bytes = data.get(offset..offset + b_len).ok_or_else(bad)?;
        let b = DhPublicKey::from_bytes_be(b_bytes);

        Ok(PreKeyMessage {
            sender_instance_tag,
            receiver_instance_tag,
            profile,
            y,
            b,
        })
    }

    /// `valid_received_values` (§4.4): `Y` decodes to a non-identity
    /// point of the correct order, `B` is a DH public value in
    /// `[2, p-2]`, and the sender profile's signature verifies.
    pub fn valid_received_values(&self) -> Result<()> {
        self.y.validate()?;
        if !self.b.is_valid_public_value() {
            return Err(OtrngError::InvalidPreKey("DH public value out of range"));
        }
        self.profile.valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SupportedVersion;
    use crate::primitives::dh;
    use crate::primitives::ecdh;
    use crate::primitives::rng::os_rng;
    use crate::primitives::sign::LongTermSigningKey;

    fn fixture() -> PreKeyMessage {
        let signing_key = LongTermSigningKey::from_bytes(&[1u8; 57]);
        let profile = SenderProfile::create(vec![SupportedVersion::V4], &signing_key);
        let sym = [0x01u8; ecdh::ED448_PRIVATE_BYTES];
        let (_y_priv, y_pub) = ecdh::from_symmetric_seed(&sym);
        let mut rng = os_rng();
        let (_b_priv, b_pub) = dh::generate(&mut rng);
        PreKeyMessage::new(1, 0, profile, y_pub, b_pub)
    }

    #[test]
    fn first_eleven_bytes_match_the_fixed_header() {
        let message = fixture();
        let serialized = message.serialize();
        assert_eq!(
            &serialized[..11],
            &[0x00, 0x04, PREKEY_MSG_TYPE, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00],
        );
    }

    #[test]
    fn round_trips_through_serialize_and_deserialize() {
        let message = fixture();
        let serialized = message.serialize();
        let decoded = PreKeyMessage::deserialize(&serialized).unwrap();

        assert_eq!(decoded.sender_instance_tag, message.sender_instance_tag);
        assert_eq!(decoded.receiver_instance_tag, message.receiver_instance_tag);
        assert_eq!(decoded.y.to_bytes(), message.y.to_bytes());
        assert_eq!(decoded.b.to_bytes_be(), message.b.to_bytes_be());
        assert!(decoded.valid_received_values().is_ok());
    }

    #[test]
    fn identity_y_point_fails_validation() {
        let mut message = fixture();
        message.y = EcdhPublicKey::from_bytes(&[0u8; ED448_POINT_BYTES]);
        assert!(message.valid_received_values().is_err());
    }

    #[test]
    fn b_equal_to_one_fails_validation() {
        let mut message = fixture();
        message.b = DhPublicKey::from_bytes_be(&[1]);
        assert!(message.valid_received_values().is_err());
    }
}
