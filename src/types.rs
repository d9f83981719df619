// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use ethereum_types::{H160, H256};
use serde::{Deserialize, Serialize};

/// Execution block header fields needed by the proof builders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionBlock {
    #[serde(with = "serde_quantity")]
    pub number: u64,
    pub hash: H256,
    pub state_root: H256,
    pub receipts_root: H256,
    #[serde(with = "serde_quantity")]
    pub timestamp: u64,
}

/// A transaction receipt as returned by `eth_getBlockReceipts`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: H256,
    #[serde(with = "serde_quantity")]
    pub transaction_index: u64,
    /// EIP-2718 transaction type; 0 for legacy transactions
    #[serde(rename = "type", with = "serde_quantity", default)]
    pub tx_type: u64,
    #[serde(with = "serde_quantity")]
    pub status: u64,
    #[serde(with = "serde_quantity")]
    pub cumulative_gas_used: u64,
    #[serde(with = "serde_hex")]
    pub logs_bloom: Vec<u8>,
    pub logs: Vec<LogEntry>,
}

/// An emitted log inside a receipt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub address: H160,
    pub topics: Vec<H256>,
    #[serde(with = "serde_hex")]
    pub data: Vec<u8>,
}

/// Response shape of `eth_getProof`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthProofResponse {
    #[serde(with = "serde_hex_list")]
    pub account_proof: Vec<Vec<u8>>,
    pub storage_hash: H256,
    pub storage_proof: Vec<StorageEntryProof>,
}

/// Storage-proof leaf of an `eth_getProof` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEntryProof {
    pub key: H256,
    #[serde(with = "serde_hex_list")]
    pub proof: Vec<Vec<u8>>,
}

/// A beacon block header (the 5-field consensus header)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BeaconHeader {
    #[serde(with = "string_u64")]
    pub slot: u64,
    #[serde(with = "string_u64")]
    pub proposer_index: u64,
    pub parent_root: H256,
    pub state_root: H256,
    pub body_root: H256,
}

/// SSZ field roots of a beacon block, enough to rebuild the branch from
/// the execution payload's `receipts_root` up to the header root without
/// shipping the whole block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconBlockRoots {
    pub header: BeaconHeader,
    /// Tree-hash roots of the block body fields, in field order
    pub body_field_roots: Vec<H256>,
    /// Tree-hash roots of the execution payload fields, in field order
    pub payload_field_roots: Vec<H256>,
}

/// A compressed BLS public key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(pub [u8; 48]);

impl Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        let arr: [u8; 48] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("public key must be 48 bytes"))?;
        Ok(PublicKey(arr))
    }
}

/// A sync committee: 512 validator public keys and their aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncCommittee {
    pub pubkeys: Vec<PublicKey>,
    pub aggregate_pubkey: PublicKey,
}

/// Aggregate attestation of a sync committee over a header
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncAggregate {
    #[serde(with = "serde_hex")]
    pub sync_committee_bits: Vec<u8>,
    #[serde(with = "serde_hex")]
    pub sync_committee_signature: Vec<u8>,
}

/// A sync-committee-period update. Immutable once fetched; every derived
/// commitment is a pure function of this value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusUpdate {
    pub attested_header: BeaconHeader,
    pub finalized_header: BeaconHeader,
    pub genesis_validators_root: H256,
    #[serde(with = "string_u64")]
    pub genesis_time: u64,
    pub current_sync_committee: SyncCommittee,
    pub next_sync_committee: SyncCommittee,
    pub sync_aggregate: SyncAggregate,
    pub execution_state_root: H256,
}

/// Fields of a sent message, as read from the source contract's event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFields {
    pub nonce: u64,
    pub contract_address: H160,
    pub message_root: H256,
    #[serde(with = "serde_hex")]
    pub message: Vec<u8>,
    pub tx_hash: H256,
    pub tx_block_number: u64,
}

/// 0x-prefixed hex serialization for byte vectors
pub mod serde_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(data)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

/// 0x-prefixed hex serialization for lists of byte vectors (proof nodes)
pub mod serde_hex_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let strings: Vec<String> = data.iter().map(|d| format!("0x{}", hex::encode(d))).collect();
        strings.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .iter()
            .map(|s| hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Decimal-string integers, as the beacon REST API encodes them
pub mod string_u64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 0x-prefixed hex quantities, as Ethereum JSON-RPC encodes integers
pub mod serde_quantity {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{value:x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_round_trips_through_rpc_shape() {
        let json = serde_json::json!({
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "transactionIndex": "0x2",
            "type": "0x2",
            "status": "0x1",
            "cumulativeGasUsed": "0x5208",
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "logs": [{
                "address": "0x43f0222552e8114ad8f224dea89976d3bf41659d",
                "topics": ["0x2222222222222222222222222222222222222222222222222222222222222222"],
                "data": "0xdeadbeef"
            }]
        });
        let receipt: TxReceipt = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(receipt.transaction_index, 2);
        assert_eq!(receipt.cumulative_gas_used, 0x5208);
        assert_eq!(receipt.logs[0].data, vec![0xde, 0xad, 0xbe, 0xef]);
        let back = serde_json::to_value(&receipt).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn beacon_header_uses_decimal_strings() {
        let json = serde_json::json!({
            "slot": "123456",
            "proposerIndex": "42",
            "parentRoot": "0x3333333333333333333333333333333333333333333333333333333333333333",
            "stateRoot": "0x4444444444444444444444444444444444444444444444444444444444444444",
            "bodyRoot": "0x5555555555555555555555555555555555555555555555555555555555555555"
        });
        let header: BeaconHeader = serde_json::from_value(json).unwrap();
        assert_eq!(header.slot, 123_456);
        assert_eq!(header.proposer_index, 42);
    }
}
