use ethereum_types::{H160, H256};
use serde::{Deserialize, Serialize};

use crate::types::{serde_hex_list, MessageFields};

/// A two-level storage proof: account-trie inclusion under the block's
/// state root, then storage-trie inclusion under the account's storage
/// root. Both proofs were re-verified by the builder before this value
/// exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProofBundle {
    pub message: MessageFields,
    #[serde(with = "serde_hex_list")]
    pub account_proof: Vec<Vec<u8>>,
    #[serde(with = "serde_hex_list")]
    pub storage_proof: Vec<Vec<u8>>,
    pub state_root: H256,
    pub storage_root: H256,
    /// The proven 32-byte slot value (the message root)
    pub value: H256,
}

/// The storage-proof fixture a downstream verifier decodes positionally.
/// Proof nodes are hex without the 0x prefix; roots keep it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProofFixture {
    pub contract_address: H160,
    #[serde(with = "unprefixed_hex_list")]
    pub proof: Vec<Vec<u8>>,
    pub state_root_hash: H256,
    pub storage_root: H256,
}

impl StorageProofBundle {
    /// The fixture view of this bundle (the account proof binds the
    /// storage root the fixture consumer walks from)
    pub fn fixture(&self) -> StorageProofFixture {
        StorageProofFixture {
            contract_address: self.message.contract_address,
            proof: self.account_proof.clone(),
            state_root_hash: self.state_root,
            storage_root: self.storage_root,
        }
    }
}

/// Hex without the 0x prefix, the convention for byte arrays embedded in
/// fixture proof lists
pub(crate) mod unprefixed_hex_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let strings: Vec<String> = data.iter().map(hex::encode).collect();
        strings.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .iter()
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::H160;

    #[test]
    fn fixture_proof_entries_have_no_hex_prefix() {
        let fixture = StorageProofFixture {
            contract_address: H160([0x11; 20]),
            proof: vec![vec![0xf8, 0x51], vec![0xde, 0xad]],
            state_root_hash: H256([0x22; 32]),
            storage_root: H256([0x33; 32]),
        };
        let value = serde_json::to_value(&fixture).unwrap();
        assert_eq!(value["proof"][0], "f851");
        assert_eq!(value["proof"][1], "dead");
        let root = value["stateRootHash"].as_str().unwrap();
        assert!(root.starts_with("0x"));
        assert!(value["contractAddress"].as_str().unwrap().starts_with("0x"));
    }
}
