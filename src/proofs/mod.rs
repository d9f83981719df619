pub mod common;
pub mod receipt;
pub mod rlp;
pub mod slot;
pub mod storage;
pub mod trie;

use serde::{Deserialize, Serialize};

pub use common::error::{ProofError, ProofResult};
pub use receipt::{build_receipt_proof, EventProofFixture, ReceiptProofBundle};
pub use slot::{select_slot, SlotStrategy};
pub use storage::{build_storage_proof, StorageProofBundle, StorageProofFixture};

/// Exactly one proof kind is produced per request; the two are mutually
/// exclusive variants, not optional fields on one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofBundle {
    Storage(StorageProofBundle),
    Receipt(ReceiptProofBundle),
}
