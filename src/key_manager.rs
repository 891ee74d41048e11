//! The top-level ratchet owner: current/previous ratchets, local and peer
//! ephemerals, the mix-key, the session id, and the retained MAC keys
//! (`SPEC_FULL.md` §4.3).

use zeroize::Zeroize;

use crate::config::Policy;
use crate::error::{OtrngError, Result};
use crate::primitives::dh::{self, DhPrivateKey, DhPublicKey};
use crate::primitives::ecdh::{self, EcdhPrivateKey, EcdhPublicKey};
use crate::primitives::hash::{kdf_256, kdf_512, sha3_256, sha3_512_concat};
use crate::primitives::rng::os_rng;
use crate::ratchet::Ratchet;

const MAGIC_ENC_KEY: u8 = 0x01;
const MAGIC_MAC_KEY: u8 = 0x02;

/// Which of a ratchet's two chains this endpoint sends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainSide {
    A,
    B,
}

/// Output of a message-key derivation: an encryption key, a MAC key, and
/// the `(ratchet_id, message_id)` coordinates they were derived at.
pub struct MessageKeys {
    pub enc_key: Vec<u8>,
    pub mac_key: Vec<u8>,
    pub ratchet_id: u32,
    pub message_id: u32,
}

impl Drop for MessageKeys {
    fn drop(&mut self) {
        self.enc_key.zeroize();
        self.mac_key.zeroize();
    }
}

/// The view of a ratchet's ephemerals needed to decide chain sides for
/// it. Kept per-ratchet (not just the manager's latest ephemerals) so a
/// `previous` ratchet that outlives an ephemeral rotation still resolves
/// its chain sides the way it did when it was current (§4.3 note on
/// `retrieve_receiving_message_keys`).
struct RatchetEphemerals {
    our_ecdh_pub: EcdhPublicKey,
    their_ecdh_pub: EcdhPublicKey,
}

struct InstalledRatchet {
    ratchet: Ratchet,
    ephemerals: RatchetEphemerals,
}

pub struct KeyManager {
    policy: Policy,

    i: u32,
    j: u32,
    current: InstalledRatchet,
    previous: Option<InstalledRatchet>,

    our_ecdh: (EcdhPrivateKey, EcdhPublicKey),
    our_dh: (DhPrivateKey, DhPublicKey),
    their_ecdh: EcdhPublicKey,
    their_dh: DhPublicKey,

    mix_key: [u8; 32],
    ssid: Option<[u8; 8]>,

    old_mac_keys: Vec<Vec<u8>>,
}

impl KeyManager {
    /// Bootstraps a key manager from the first hybrid agreement completed
    /// by the DAKE: our and the peer's ECDH/DH ephemerals, already
    /// authenticated by the caller. Installs ratchet 0 via
    /// [`enter_new_ratchet`](Self::enter_new_ratchet), deriving `ssid`.
    pub fn new(
        policy: Policy,
        our_ecdh: (EcdhPrivateKey, EcdhPublicKey),
        our_dh: (DhPrivateKey, DhPublicKey),
        their_ecdh: EcdhPublicKey,
        their_dh: DhPublicKey,
    ) -> Result<Self> {
        let initial_mix_key = sha3_256(b"");
        let placeholder_ratchet = Ratchet::from_shared(0, &[0u8; 64]);
        let placeholder_ephemerals = RatchetEphemerals {
            our_ecdh_pub: our_ecdh.1,
            their_ecdh_pub: their_ecdh,
        };

        let mut manager = KeyManager {
            policy,
            i: 0,
            j: 0,
            current: InstalledRatchet {
                ratchet: placeholder_ratchet,
                ephemerals: placeholder_ephemerals,
            },
            previous: None,
            our_ecdh,
            our_dh,
            their_ecdh,
            their_dh,
            mix_key: initial_mix_key,
            ssid: None,
            old_mac_keys: Vec::new(),
        };

        manager.enter_new_ratchet(true)?;
        // The very first ratchet has no real predecessor — the
        // placeholder `enter_new_ratchet` just displaced into `previous`
        // is not a ratchet either peer ever actually held.
        manager.previous = None;
        Ok(manager)
    }

    pub fn ssid(&self) -> Option<[u8; 8]> {
        self.ssid
    }

    pub fn current_ratchet_id(&self) -> u32 {
        self.i
    }

    /// Our current ECDH public ephemeral, for a host to carry in the
    /// message header that announces a rotation to the peer.
    pub fn our_ecdh_public(&self) -> EcdhPublicKey {
        self.our_ecdh.1
    }

    /// Our current DH public ephemeral, refreshed only on DH-rotation
    /// steps; unchanged between them (§4.3 "rotate").
    pub fn our_dh_public(&self) -> DhPublicKey {
        self.our_dh.1.clone()
    }

    /// Ingests the peer's ephemerals carried by an incoming message's
    /// header, ahead of a call to [`ensure_on_ratchet`](Self::ensure_on_ratchet).
    /// `their_dh` is `None` on rounds where the peer did not refresh its
    /// DH ephemeral (every round but every third, §3 "mix_key").
    pub fn receive_their_ephemerals(
        &mut self,
        their_ecdh: EcdhPublicKey,
        their_dh: Option<DhPublicKey>,
    ) {
        self.their_ecdh = their_ecdh;
        if let Some(dh_pub) = their_dh {
            self.their_dh = dh_pub;
        }
    }

    /// Installs a new current ratchet from the hybrid agreement of the
    /// endpoints' currently-held ephemerals (§4.3 "enter_new_ratchet").
    fn enter_new_ratchet(&mut self, refresh_dh: bool) -> Result<()> {
        let mut k_ecdh = ecdh::agree(&self.our_ecdh.0, &self.their_ecdh)?;

        if refresh_dh {
            let mut k_dh = dh::agree(&self.our_dh.0, &self.their_dh)?;
            self.mix_key = sha3_256(&k_dh);
            k_dh.zeroize();
        } else {
            self.mix_key = sha3_256(&self.mix_key);
        }

        let mut shared = sha3_512_concat(&k_ecdh, &self.mix_key);
        k_ecdh.zeroize();

        if self.i == 0 && self.ssid.is_none() {
            let digest = sha3_256(&shared);
            let mut ssid = [0u8; 8];
            ssid.copy_from_slice(&digest[..8]);
            self.ssid = Some(ssid);
        }

        let new_ratchet = Ratchet::from_shared(self.i, &shared);
        shared.zeroize();

        let new_ephemerals = RatchetEphemerals {
            our_ecdh_pub: self.our_ecdh.1,
            their_ecdh_pub: self.their_ecdh,
        };
        let displaced = std::mem::replace(
            &mut self.current,
            InstalledRatchet { ratchet: new_ratchet, ephemerals: new_ephemerals },
        );
        // Drop the previous `previous` explicitly before overwriting it;
        // its chains scrub themselves via `Ratchet`'s `Drop`.
        self.previous = Some(displaced);

        log::debug!(
            "entered ratchet {} (dh_refreshed={})",
            self.i,
            refresh_dh
        );
        Ok(())
    }

    fn should_refresh_dh(i: u32, cadence: u32) -> bool {
        i % cadence == 0
    }

    /// Replaces our ephemeral keypair(s) with fresh ones, generated only
    /// when *we* are about to use them for a send-triggered rotation
    /// (§4.3 "rotate"). The displaced private scalar is explicitly
    /// scrubbed here, at the point we know for certain it is superseded
    /// and will never be paired with a future agreement again — not
    /// inside `enter_new_ratchet` itself, which may reuse the *current*
    /// `our_ecdh`/`our_dh` across several ratchet entries while this end
    /// is only receiving (see `ensure_on_ratchet`).
    fn regenerate_ephemerals(&mut self, refresh_dh: bool) -> Result<()> {
        let mut rng = os_rng();
        let (ecdh_priv, ecdh_pub) = ecdh::generate(&mut rng);
        let old_ecdh = std::mem::replace(&mut self.our_ecdh, (ecdh_priv, ecdh_pub));
        old_ecdh.0.zeroize();

        if refresh_dh {
            let (dh_priv, dh_pub) = dh::generate(&mut rng);
            let old_dh = std::mem::replace(&mut self.our_dh, (dh_priv, dh_pub));
            drop(old_dh.0);
        }
        Ok(())
    }

    /// Sender-initiated rotation: `i += 1`, regenerate ephemerals, install
    /// the next ratchet (§4.3 "rotate").
    pub fn rotate(&mut self) -> Result<()> {
        self.i += 1;
        self.j = 0;
        let refresh_dh = Self::should_refresh_dh(self.i, self.policy.dh_rotation_cadence);
        self.regenerate_ephemerals(refresh_dh)?;
        self.enter_new_ratchet(refresh_dh)
    }

    /// Receiver-side: brings the manager onto ratchet `id`, following the
    /// peer there without disturbing our own ephemerals (§4.3
    /// "ensure_on_ratchet"). Ephemerals are regenerated only by the side
    /// that sends a rotation (`rotate`); the receiving side keeps its
    /// current `our_ecdh`/`our_dh` so the hybrid agreement it computes —
    /// `ECDH(our_ecdh.priv, their_new_ecdh)` — lands on the same point the
    /// sender computed as `ECDH(their_new_ecdh.priv_side, our_ecdh_as_they_
    /// saw_it)`. Regenerating here as well would pair two *new* scalars
    /// that were never agreed with one another, and the two ends would
    /// silently derive different ratchets.
    pub fn ensure_on_ratchet(&mut self, id: u32) -> Result<()> {
        if id == self.i {
            return Ok(());
        }
        if id + 1 == self.i {
            if self.previous.is_some() {
                return Ok(());
            }
            return Err(OtrngError::RatchetNotFound(id, self.i));
        }
        if id < self.i {
            return Err(OtrngError::RatchetNotFound(id, self.i));
        }

        self.i = id;
        let refresh_dh = Self::should_refresh_dh(self.i, self.policy.dh_rotation_cadence);
        self.enter_new_ratchet(refresh_dh)
    }

    /// Lexicographic tie-break on the ECDH publics in force for a given
    /// ratchet (§3 "Message chain selection").
    fn sending_side(ephemerals: &RatchetEphemerals) -> Result<ChainSide> {
        use std::cmp::Ordering;
        match ephemerals.our_ecdh_pub.cmp_as_unsigned_be(&ephemerals.their_ecdh_pub) {
            Ordering::Greater => Ok(ChainSide::A),
            Ordering::Less => Ok(ChainSide::B),
            Ordering::Equal => Err(OtrngError::KeyExchangeError),
        }
    }

    fn receiving_side(ephemerals: &RatchetEphemerals) -> Result<ChainSide> {
        Ok(match Self::sending_side(ephemerals)? {
            ChainSide::A => ChainSide::B,
            ChainSide::B => ChainSide::A,
        })
    }

    fn derive_message_keys(chain_key: &[u8; 64]) -> (Vec<u8>, Vec<u8>) {
        let enc_key = kdf_256(MAGIC_ENC_KEY, chain_key, 32);
        let mac_key = kdf_512(MAGIC_MAC_KEY, chain_key, 64);
        (enc_key, mac_key)
    }

    /// §4.3 "retrieve_sending_message_keys".
    pub fn retrieve_sending_message_keys(&mut self) -> Result<MessageKeys> {
        let needs_advance = self.j != 0;
        if !needs_advance {
            self.rotate()?;
        }

        let side = Self::sending_side(&self.current.ephemerals)?;
        if needs_advance {
            match side {
                ChainSide::A => self.current.ratchet.chain_a.advance()?,
                ChainSide::B => self.current.ratchet.chain_b.advance()?,
            };
        }

        let link = match side {
            ChainSide::A => self.current.ratchet.chain_a.last(),
            ChainSide::B => self.current.ratchet.chain_b.last(),
        };

        if link.id != self.j {
            return Err(OtrngError::InternalInvariantError(
                "sending chain link id disagreed with expected message index",
            ));
        }

        let key = *link.key().ok_or(OtrngError::InternalInvariantError(
            "sending chain head had no key material",
        ))?;
        let (enc_key, mac_key) = Self::derive_message_keys(&key);

        let link_id = link.id;
        match side {
            ChainSide::A => self.current.ratchet.chain_a.mark_consumed(link_id),
            ChainSide::B => self.current.ratchet.chain_b.mark_consumed(link_id),
        }

        let ratchet_id = self.i;
        self.j += 1;

        log::trace!(
            "derived sending keys at ratchet {} message {}",
            ratchet_id,
            link_id
        );

        Ok(MessageKeys { enc_key, mac_key, ratchet_id, message_id: link_id })
    }

    /// §4.3 "retrieve_receiving_message_keys". Does not append to
    /// `old_mac_keys`; call [`acknowledge_received`](Self::acknowledge_received)
    /// once the message has verified.
    pub fn retrieve_receiving_message_keys(
        &mut self,
        ratchet_id: u32,
        message_id: u32,
    ) -> Result<MessageKeys> {
        let installed = if ratchet_id == self.i {
            &mut self.current
        } else if self
            .previous
            .as_ref()
            .map(|p| p.ratchet.id == ratchet_id)
            .unwrap_or(false)
        {
            self.previous.as_mut().unwrap()
        } else {
            return Err(OtrngError::RatchetNotFound(ratchet_id, self.i));
        };

        let side = Self::receiving_side(&installed.ephemerals)?;
        let cap = self.policy.backfill_cap;
        let link = match side {
            ChainSide::A => installed.ratchet.chain_a.extend_to(message_id, cap)?,
            ChainSide::B => installed.ratchet.chain_b.extend_to(message_id, cap)?,
        };

        let key = *link.key().ok_or(OtrngError::InternalInvariantError(
            "receiving chain link had no key material",
        ))?;
        let (enc_key, mac_key) = Self::derive_message_keys(&key);

        match side {
            ChainSide::A => installed.ratchet.chain_a.mark_consumed(message_id),
            ChainSide::B => installed.ratchet.chain_b.mark_consumed(message_id),
        }

        log::trace!(
            "derived receiving keys at ratchet {} message {}",
            ratchet_id,
            message_id
        );

        Ok(MessageKeys { enc_key, mac_key, ratchet_id, message_id })
    }

    /// Records a MAC key for later publication once the caller has
    /// confirmed the corresponding message decrypted and verified
    /// (§4.3 point 5). Not called from [`retrieve_receiving_message_keys`]
    /// itself.
    ///
    /// [`retrieve_receiving_message_keys`]: Self::retrieve_receiving_message_keys
    pub fn acknowledge_received(&mut self, mac_key: Vec<u8>) {
        if let Some(cap) = self.policy.max_retained_mac_keys {
            if self.old_mac_keys.len() >= cap {
                log::debug!("old_mac_keys at policy cap ({}), dropping oldest", cap);
                self.old_mac_keys.remove(0);
            }
        }
        self.old_mac_keys.push(mac_key);
    }

    /// Drains the accumulated old MAC keys for host-side publication.
    /// The core never emits them on its own (§9).
    pub fn drain_old_mac_keys(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.old_mac_keys)
    }
}

impl Drop for KeyManager {
    fn drop(&mut self) {
        self.mix_key.zeroize();
        for key in &mut self.old_mac_keys {
            key.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paired_managers() -> (KeyManager, KeyManager) {
        let mut rng = os_rng();
        let (a_ecdh_priv, a_ecdh_pub) = ecdh::generate(&mut rng);
        let (b_ecdh_priv, b_ecdh_pub) = ecdh::generate(&mut rng);
        let (a_dh_priv, a_dh_pub) = dh::generate(&mut rng);
        let (b_dh_priv, b_dh_pub) = dh::generate(&mut rng);

        let alice = KeyManager::new(
            Policy::default(),
            (a_ecdh_priv, a_ecdh_pub),
            (a_dh_priv, a_dh_pub.clone()),
            b_ecdh_pub,
            b_dh_pub.clone(),
        )
        .unwrap();
        let bob = KeyManager::new(
            Policy::default(),
            (b_ecdh_priv, b_ecdh_pub),
            (b_dh_priv, b_dh_pub),
            a_ecdh_pub,
            a_dh_pub,
        )
        .unwrap();
        (alice, bob)
    }

    #[test]
    fn both_sides_derive_the_same_ssid() {
        let (alice, bob) = paired_managers();
        assert_eq!(alice.ssid(), bob.ssid());
        assert!(alice.ssid().is_some());
    }

    #[test]
    fn sending_then_receiving_keys_match() {
        let (mut alice, mut bob) = paired_managers();
        let sent = alice.retrieve_sending_message_keys().unwrap();
        bob.receive_their_ephemerals(alice.our_ecdh_public(), Some(alice.our_dh_public()));
        bob.ensure_on_ratchet(sent.ratchet_id).unwrap();
        let received = bob
            .retrieve_receiving_message_keys(sent.ratchet_id, sent.message_id)
            .unwrap();
        assert_eq!(sent.enc_key, received.enc_key);
        assert_eq!(sent.mac_key, received.mac_key);
    }

    #[test]
    fn sequential_sends_increment_message_id() {
        let (mut alice, _bob) = paired_managers();
        let first = alice.retrieve_sending_message_keys().unwrap();
        let second = alice.retrieve_sending_message_keys().unwrap();
        assert_eq!(second.ratchet_id, first.ratchet_id);
        assert_eq!(second.message_id, first.message_id + 1);
    }

    #[test]
    fn acknowledge_appends_to_old_mac_keys() {
        let (mut alice, mut bob) = paired_managers();
        let sent = alice.retrieve_sending_message_keys().unwrap();
        bob.receive_their_ephemerals(alice.our_ecdh_public(), Some(alice.our_dh_public()));
        bob.ensure_on_ratchet(sent.ratchet_id).unwrap();
        let received = bob
            .retrieve_receiving_message_keys(sent.ratchet_id, sent.message_id)
            .unwrap();
        let mac_key = received.mac_key.clone();
        bob.acknowledge_received(mac_key.clone());
        let drained = bob.drain_old_mac_keys();
        assert_eq!(drained, vec![mac_key]);
    }

    #[test]
    fn unknown_ratchet_id_is_rejected() {
        let (_alice, mut bob) = paired_managers();
        let err = bob.retrieve_receiving_message_keys(999, 0);
        assert!(matches!(err, Err(OtrngError::RatchetNotFound(999, _))));
    }
}
