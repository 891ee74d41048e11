//! A forward-only symmetric chain: `key_n = SHA3-512(key_{n-1})`.
//!
//! Modeled as a `Vec<Link>` indexed by `id - head_id` rather than the
//! original's singly linked list (`SPEC_FULL.md` §9 "Chain as linked
//! list") — ids are always contiguous from 0 within a ratchet's chain, so
//! a vector gives O(1) lookup-by-id with the same growth semantics.
//!
//! A link's key is zeroized once it is both (a) consumed — a message key
//! has been derived from it — and (b) superseded — a later link already
//! exists, so nothing will ever hash forward from this one again. Either
//! condition alone is not enough: an unconsumed but superseded link
//! (skipped during backfill, not yet used) must keep its key so a
//! later out-of-order message can still claim it; a consumed-but-not-yet-
//! superseded link (the usual case — a link consumed for sending the very
//! message that advanced the chain to it) must keep its key until the
//! *next* link has actually been derived from it.

use zeroize::Zeroize;

use crate::error::{OtrngError, Result};
use crate::primitives::hash::sha3_512;

pub const CHAIN_KEY_BYTES: usize = 64;

pub type ChainKey = [u8; CHAIN_KEY_BYTES];

/// A single chain link: its id and (if not yet scrubbed) its key.
pub struct Link {
    pub id: u32,
    key: Option<ChainKey>,
}

impl Link {
    /// The key, if it hasn't already been zeroized. Chain invariants
    /// guarantee the *last* link's key is always present.
    pub fn key(&self) -> Option<&ChainKey> {
        self.key.as_ref()
    }
}

pub struct Chain {
    links: Vec<Link>,
    consumed: Vec<bool>,
}

impl Chain {
    /// Creates a chain with one link, `(id=0, key=seed)`.
    pub fn new(seed: ChainKey) -> Self {
        Self {
            links: vec![Link { id: 0, key: Some(seed) }],
            consumed: vec![false],
        }
    }

    /// The link with the highest id currently materialised. Never empty;
    /// its key is always present (see module docs).
    pub fn last(&self) -> &Link {
        self.links.last().expect("chain always has at least one link")
    }

    fn last_id(&self) -> u32 {
        self.last().id
    }

    /// The link with that id, or `None` if not yet materialised (or its
    /// key has already been scrubbed).
    pub fn get(&self, id: u32) -> Option<&Link> {
        self.links.get(id as usize)
    }

    /// Appends one link derived from the current last link, scrubbing
    /// the previous last link's key if it was already marked consumed.
    pub fn advance(&mut self) -> Result<&Link> {
        let last_idx = self.links.len() - 1;
        let next_id = self.last_id().checked_add(1).ok_or(OtrngError::OutOfMemory)?;
        let prev_key = *self.links[last_idx]
            .key
            .as_ref()
            .expect("last link's key is always present");
        let next_key = sha3_512(&prev_key);

        if self.consumed[last_idx] {
            if let Some(ref mut k) = self.links[last_idx].key {
                k.zeroize();
            }
            self.links[last_idx].key = None;
        }

        self.links.push(Link { id: next_id, key: Some(next_key) });
        self.consumed.push(false);
        Ok(self.links.last().unwrap())
    }

    /// Grows the chain until `last().id >= id`, bounded by `cap`.
    pub fn extend_to(&mut self, id: u32, cap: u32) -> Result<&Link> {
        if id > cap {
            return Err(OtrngError::MessageIdTooLarge { requested: id, cap });
        }
        while self.last_id() < id {
            self.advance()?;
        }
        Ok(self.get(id).expect("just extended to at least this id"))
    }

    /// Marks the link at `id` as consumed (its message keys have been
    /// derived). Scrubs its key immediately if a later link already
    /// exists; otherwise the scrub is deferred to the next [`advance`]
    /// or [`extend_to`] call that supersedes it.
    ///
    /// [`advance`]: Chain::advance
    /// [`extend_to`]: Chain::extend_to
    pub fn mark_consumed(&mut self, id: u32) {
        let idx = id as usize;
        if idx >= self.links.len() {
            return;
        }
        self.consumed[idx] = true;
        let is_superseded = idx + 1 < self.links.len();
        if is_superseded {
            if let Some(ref mut k) = self.links[idx].key {
                k.zeroize();
            }
            self.links[idx].key = None;
        }
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        for link in &mut self.links {
            if let Some(ref mut k) = link.key {
                k.zeroize();
            }
        }
    }
}
