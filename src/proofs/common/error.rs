use ethereum_types::{H160, H256};
use thiserror::Error;

use crate::proofs::rlp::RlpError;
use crate::proofs::trie::VerifyError;
use crate::provider::ProviderError;

/// Main error type for proof generation and certification
#[derive(Error, Debug)]
pub enum ProofError {
    /// RLP data violates canonical form
    #[error(transparent)]
    Rlp(#[from] RlpError),

    /// A trie proof failed to check (hash mismatch, malformed node).
    /// When raised by a builder this is an internal invariant violation,
    /// not a property of the caller's input.
    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// The account trie proves the address absent (provable exclusion)
    #[error("account {address:?} not found under state root {state_root:?}")]
    AccountNotFound { address: H160, state_root: H256 },

    /// The storage trie proves the slot absent (provable exclusion)
    #[error("slot {slot:?} not found under storage root {storage_root:?}")]
    SlotNotFound { slot: H256, storage_root: H256 },

    /// The account leaf did not decode as the 4-field account record
    #[error("corrupt account RLP: {arity} fields, expected 4")]
    CorruptAccountRlp { arity: usize },

    /// No receipt in the anchor block carries the expected log
    #[error("receipt not found: {what}")]
    ReceiptNotFound { what: String },

    /// More than one log in the target receipt matches the event filter
    #[error("{count} logs match the expected event in tx {tx_hash:?}")]
    AmbiguousLog { tx_hash: H256, count: usize },

    /// A same-slot strategy was requested but the anchor slot's execution
    /// block is not the block containing the source event
    #[error("anchor slot {anchor_slot} holds block {anchor_block}, message is in block {message_block}")]
    SlotMismatch {
        anchor_slot: u64,
        anchor_block: u64,
        message_block: u64,
    },

    /// Upstream data source failure
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Generic errors from other sources
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProofError {
    /// Create an account-exclusion error
    pub fn account_not_found(address: H160, state_root: H256) -> Self {
        Self::AccountNotFound {
            address,
            state_root,
        }
    }

    /// Create a slot-exclusion error
    pub fn slot_not_found(slot: H256, storage_root: H256) -> Self {
        Self::SlotNotFound { slot, storage_root }
    }

    /// Create a receipt-not-found error
    pub fn receipt_not_found(what: impl Into<String>) -> Self {
        Self::ReceiptNotFound { what: what.into() }
    }

    /// Create an invalid-proof error (builder self-check failures)
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Verify(VerifyError::Invalid {
            reason: reason.into(),
        })
    }
}

/// Result type alias using ProofError
pub type ProofResult<T> = Result<T, ProofError>;
