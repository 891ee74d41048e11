//! The conversation state machine gating when a [`KeyManager`] exists at
//! all (`SPEC_FULL.md` §4.3 "State machine (conversation)").
//!
//! [`KeyManager`]: crate::key_manager::KeyManager

use crate::error::{OtrngError, Result};
use crate::key_manager::KeyManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationPhase {
    None,
    Start,
    WaitingAuthR,
    WaitingAuthI,
    Encrypted,
    Finished,
}

/// Owns the live key manager (only present once `Encrypted`). While
/// already encrypted, a freshly received DAKE pre-key starts an isolated
/// pending session that does not touch the live manager; only once that
/// session's own DAKE completes does it replace the live one (§4.3:
/// "receiving a DAKE pre-key while in ENCRYPTED starts a fresh key
/// manager in an isolated pending slot").
pub struct Conversation {
    phase: ConversationPhase,
    key_manager: Option<KeyManager>,
    pending_session: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Conversation {
            phase: ConversationPhase::None,
            key_manager: None,
            pending_session: false,
        }
    }

    pub fn phase(&self) -> ConversationPhase {
        self.phase
    }

    pub fn key_manager(&self) -> Option<&KeyManager> {
        self.key_manager.as_ref()
    }

    pub fn key_manager_mut(&mut self) -> Option<&mut KeyManager> {
        self.key_manager.as_mut()
    }

    /// `NONE -> START`: a DAKE has begun but no agreement exists yet.
    pub fn begin(&mut self) -> Result<()> {
        self.require_phase(ConversationPhase::None)?;
        self.phase = ConversationPhase::Start;
        Ok(())
    }

    pub fn await_auth_r(&mut self) -> Result<()> {
        self.require_phase(ConversationPhase::Start)?;
        self.phase = ConversationPhase::WaitingAuthR;
        Ok(())
    }

    pub fn await_auth_i(&mut self) -> Result<()> {
        self.require_phase(ConversationPhase::Start)?;
        self.phase = ConversationPhase::WaitingAuthI;
        Ok(())
    }

    /// Completes the in-progress DAKE, installing `manager` as the live
    /// key manager and entering `ENCRYPTED`. If a fresh DAKE had been
    /// started while already encrypted, this is how its pending manager
    /// graduates to live.
    pub fn complete(&mut self, manager: KeyManager) -> Result<()> {
        match self.phase {
            ConversationPhase::WaitingAuthR | ConversationPhase::WaitingAuthI => {
                self.key_manager = Some(manager);
            }
            ConversationPhase::Encrypted if self.pending_session => {
                self.key_manager = Some(manager);
                self.pending_session = false;
            }
            _ => {
                return Err(OtrngError::InternalInvariantError(
                    "completed a DAKE with no in-progress session",
                ))
            }
        }
        self.phase = ConversationPhase::Encrypted;
        Ok(())
    }

    /// A new DAKE pre-key arrived while already `ENCRYPTED`: starts an
    /// isolated session that does not disturb the live key manager until
    /// it completes.
    pub fn begin_pending_session(&mut self) -> Result<()> {
        self.require_phase(ConversationPhase::Encrypted)?;
        self.pending_session = true;
        Ok(())
    }

    /// Destroys the key manager and its secret material, entering
    /// `FINISHED`. Transitions back from `ENCRYPTED` to any earlier
    /// state are disallowed (§4.3) — the only way out is `FINISHED`.
    pub fn finish(&mut self) {
        self.key_manager = None;
        self.pending_session = false;
        self.phase = ConversationPhase::Finished;
    }

    fn require_phase(&self, expected: ConversationPhase) -> Result<()> {
        if self.phase != expected {
            return Err(OtrngError::InternalInvariantError(
                "conversation state transition attempted from the wrong phase",
            ));
        }
        Ok(())
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Policy;
    use crate::primitives::{dh, ecdh, rng::os_rng};

    fn sample_manager() -> KeyManager {
        let mut rng = os_rng();
        let (a_priv, a_pub) = ecdh::generate(&mut rng);
        let (_b_priv, b_pub) = ecdh::generate(&mut rng);
        let (dha_priv, dha_pub) = dh::generate(&mut rng);
        let (_dhb_priv, dhb_pub) = dh::generate(&mut rng);
        KeyManager::new(Policy::default(), (a_priv, a_pub), (dha_priv, dha_pub), b_pub, dhb_pub).unwrap()
    }

    #[test]
    fn happy_path_reaches_encrypted() {
        let mut conversation = Conversation::new();
        conversation.begin().unwrap();
        conversation.await_auth_i().unwrap();
        conversation.complete(sample_manager()).unwrap();
        assert_eq!(conversation.phase(), ConversationPhase::Encrypted);
        assert!(conversation.key_manager().is_some());
    }

    #[test]
    fn cannot_complete_without_an_in_progress_session() {
        let mut conversation = Conversation::new();
        assert!(conversation.complete(sample_manager()).is_err());
    }

    #[test]
    fn finish_clears_the_key_manager() {
        let mut conversation = Conversation::new();
        conversation.begin().unwrap();
        conversation.await_auth_r().unwrap();
        conversation.complete(sample_manager()).unwrap();
        conversation.finish();
        assert_eq!(conversation.phase(), ConversationPhase::Finished);
        assert!(conversation.key_manager().is_none());
    }

    #[test]
    fn new_dake_while_encrypted_does_not_disturb_the_live_manager() {
        let mut conversation = Conversation::new();
        conversation.begin().unwrap();
        conversation.await_auth_r().unwrap();
        conversation.complete(sample_manager()).unwrap();

        conversation.begin_pending_session().unwrap();
        assert_eq!(conversation.phase(), ConversationPhase::Encrypted);
        assert!(conversation.key_manager().is_some());
    }
}
