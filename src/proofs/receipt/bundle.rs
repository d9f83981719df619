use ethereum_types::{H160, H256};
use serde::{Deserialize, Serialize};

use crate::proofs::storage::bundle::unprefixed_hex_list;
use crate::types::{serde_hex, serde_hex_list, MessageFields};

/// A receipt inclusion proof: the MPT path from the block's receipts root
/// to the target receipt, plus the SSZ branch binding that receipts root
/// into the consensus header at the transaction's slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptProofBundle {
    pub message: MessageFields,
    /// Anchor slot chosen by the slot-selection strategy
    pub src_slot: u64,
    /// Slot containing the transaction's block
    pub tx_slot: u64,
    /// Bottom-up branch from `receipts_root` to the tx slot's header root
    pub receipts_root_proof: Vec<H256>,
    pub receipts_root: H256,
    #[serde(with = "serde_hex_list")]
    pub receipt_proof: Vec<Vec<u8>>,
    /// RLP-encoded transaction index, the trie key of the receipt
    #[serde(with = "serde_hex")]
    pub rlp_encoded_tx_index: Vec<u8>,
    /// Position of the matched log inside the receipt
    pub log_index: u64,
}

/// The event-proof fixture a downstream verifier decodes positionally.
/// The key and proof nodes are hex without the 0x prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventProofFixture {
    pub claimed_emitter: H160,
    #[serde(with = "unprefixed_hex")]
    pub key: Vec<u8>,
    pub log_index: u64,
    pub message_root: H256,
    #[serde(with = "unprefixed_hex_list")]
    pub proof: Vec<Vec<u8>>,
    pub receipts_root: H256,
}

impl ReceiptProofBundle {
    /// The fixture view of this bundle
    pub fn fixture(&self) -> EventProofFixture {
        EventProofFixture {
            claimed_emitter: self.message.contract_address,
            key: self.rlp_encoded_tx_index.clone(),
            log_index: self.log_index,
            message_root: self.message.message_root,
            proof: self.receipt_proof.clone(),
            receipts_root: self.receipts_root,
        }
    }
}

pub(crate) mod unprefixed_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
