//! Construction-time tunables for a [`crate::key_manager::KeyManager`].
//!
//! Nothing here is persisted (the core keeps no state across process
//! restarts, see `SPEC_FULL.md` §1 Non-goals) — a `Policy` is handed to
//! `KeyManager::new` fresh each time a conversation starts.

/// Default cap on how far a chain will backfill in response to a single
/// requested message id. Bounds the hashing cost a peer can force on us by
/// claiming a huge `message_id`.
pub const DEFAULT_BACKFILL_CAP: u32 = 1 << 16;

/// Ratchets are DH-refreshed every `DH_ROTATION_CADENCE`th rotation
/// (`i % DH_ROTATION_CADENCE == 0`). Fixed by the wire protocol, not
/// user-tunable, but named here rather than sprinkled as a magic number.
pub const DH_ROTATION_CADENCE: u32 = 3;

/// The OTRv4 wire protocol version this codec speaks.
pub const PROTOCOL_VERSION: u16 = 0x0004;

/// `POLICY_ALLOW_V3` / `POLICY_ALLOW_V4` in the original source are enum
/// discriminants retained for wire compatibility, not bitset flags — the
/// two values overlap (`0x04` and `0x05`). Modeled here as a plain enum so
/// callers cannot accidentally OR them together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedVersion {
    V3 = 0x04,
    V4 = 0x05,
}

/// Construction-time tunables for a conversation's key manager.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    /// Cap on `Chain::extend_to`, see [`DEFAULT_BACKFILL_CAP`].
    pub backfill_cap: u32,
    /// How many ratchets between DH refreshes, see [`DH_ROTATION_CADENCE`].
    pub dh_rotation_cadence: u32,
    /// Optional cap on `old_mac_keys` length. `None` means unbounded — the
    /// spec does not require eviction, and this core never silently drops
    /// a MAC key the host hasn't acknowledged draining. A host that wants
    /// a bound should set this and call
    /// [`crate::key_manager::KeyManager::drain_old_mac_keys`] periodically.
    pub max_retained_mac_keys: Option<usize>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            backfill_cap: DEFAULT_BACKFILL_CAP,
            dh_rotation_cadence: DH_ROTATION_CADENCE,
            max_retained_mac_keys: None,
        }
    }
}
