use async_trait::async_trait;
use ethereum_types::{H160, H256};

use amb_proofs::config::ChainConfig;
use amb_proofs::consensus::ssz::{
    hash_tree_root_header, merkleize, verify_branch, BODY_LEAVES, EXECUTION_PAYLOAD_FIELD,
    PAYLOAD_LEAVES, RECEIPTS_ROOT_FIELD, RECEIPTS_ROOT_INDEX,
};
use amb_proofs::proofs::common::evm::hash_event_signature;
use amb_proofs::proofs::receipt::encode_receipt;
use amb_proofs::proofs::rlp;
use amb_proofs::proofs::trie::{self, Trie};
use amb_proofs::provider::{BlockId, DataProvider, HeaderId, ProviderError, UpdateId};
use amb_proofs::types::{
    BeaconBlockRoots, BeaconHeader, ConsensusUpdate, EthProofResponse, ExecutionBlock, LogEntry,
    MessageFields, TxReceipt,
};
use amb_proofs::{build_receipt_proof, find_sent_message, select_slot, ProofError, SlotStrategy};

const CONTRACT: H160 = H160([0x43; 20]);
const MESSAGE_ROOT: H256 = H256([0xab; 32]);
const BLOCK_NUMBER: u64 = 8_526_783;
const BLOCK_SLOT: u64 = 5_043_887;
const HEAD_SLOT: u64 = 5_044_900;

/// In-memory chain with one interesting block: its receipts, the receipts
/// trie they commit to, and the beacon field roots binding that trie's
/// root into a consensus header.
struct MockChain {
    block: ExecutionBlock,
    receipts: Vec<TxReceipt>,
    roots: BeaconBlockRoots,
    /// When set, the block/slot index resolves the block's slot to a
    /// different execution block, as after a reorg.
    skewed_slot_index: bool,
}

impl MockChain {
    fn new() -> Self {
        Self::with_receipts(sample_receipts())
    }

    fn with_receipts(receipts: Vec<TxReceipt>) -> Self {
        let mut trie = Trie::new();
        for receipt in &receipts {
            trie.insert(
                &rlp::encode_u64(receipt.transaction_index),
                encode_receipt(receipt),
            );
        }
        let receipts_root = H256(trie.root_hash());

        let mut payload_field_roots = vec![H256([0x10; 32]); 15];
        payload_field_roots[RECEIPTS_ROOT_FIELD] = receipts_root;
        let payload: Vec<[u8; 32]> = payload_field_roots.iter().map(|h| h.0).collect();

        let mut body_field_roots = vec![H256([0x20; 32]); 11];
        body_field_roots[EXECUTION_PAYLOAD_FIELD] = H256(merkleize(&payload, PAYLOAD_LEAVES));
        let body: Vec<[u8; 32]> = body_field_roots.iter().map(|h| h.0).collect();

        let header = BeaconHeader {
            slot: BLOCK_SLOT,
            proposer_index: 11,
            parent_root: H256([0x30; 32]),
            state_root: H256([0x40; 32]),
            body_root: H256(merkleize(&body, BODY_LEAVES)),
        };

        let block = ExecutionBlock {
            number: BLOCK_NUMBER,
            hash: H256([0x01; 32]),
            state_root: H256([0x02; 32]),
            receipts_root,
            timestamp: 1_675_000_000,
        };

        Self {
            block,
            receipts,
            roots: BeaconBlockRoots {
                header,
                body_field_roots,
                payload_field_roots,
            },
            skewed_slot_index: false,
        }
    }
}

#[async_trait]
impl DataProvider for MockChain {
    async fn get_block(&self, id: BlockId) -> Result<ExecutionBlock, ProviderError> {
        match id {
            BlockId::Number(n) if n == self.block.number => Ok(self.block.clone()),
            BlockId::Number(n) => Err(ProviderError::new(format!("no block {n}"))),
            BlockId::Latest => Ok(self.block.clone()),
            BlockId::Slot(slot) => {
                let mut block = self.block.clone();
                // later slots hold later blocks
                block.number += slot.saturating_sub(BLOCK_SLOT);
                if self.skewed_slot_index {
                    block.number += 1;
                }
                Ok(block)
            }
        }
    }

    async fn get_receipts(&self, _id: BlockId) -> Result<Vec<TxReceipt>, ProviderError> {
        Ok(self.receipts.clone())
    }

    async fn get_proof(
        &self,
        _address: H160,
        _keys: &[H256],
        _block: BlockId,
    ) -> Result<EthProofResponse, ProviderError> {
        Err(ProviderError::new("not served by this mock"))
    }

    async fn get_header(&self, id: HeaderId) -> Result<BeaconHeader, ProviderError> {
        match id {
            HeaderId::Head => Ok(BeaconHeader {
                slot: HEAD_SLOT,
                proposer_index: 0,
                parent_root: H256::zero(),
                state_root: H256::zero(),
                body_root: H256::zero(),
            }),
            other => Err(ProviderError::new(format!("no header for {other:?}"))),
        }
    }

    async fn get_block_roots(&self, slot: u64) -> Result<BeaconBlockRoots, ProviderError> {
        if slot == BLOCK_SLOT {
            Ok(self.roots.clone())
        } else {
            Err(ProviderError::new(format!("no block roots at slot {slot}")))
        }
    }

    async fn block_to_slot(&self, block_number: u64) -> Result<u64, ProviderError> {
        if block_number == BLOCK_NUMBER {
            Ok(BLOCK_SLOT)
        } else {
            Err(ProviderError::new(format!("block {block_number} not indexed")))
        }
    }

    async fn get_update(&self, _id: UpdateId) -> Result<ConsensusUpdate, ProviderError> {
        Err(ProviderError::new("not served by this mock"))
    }
}

fn matching_log(nonce: u64, config: &ChainConfig) -> LogEntry {
    let mut nonce_topic = [0u8; 32];
    nonce_topic[24..].copy_from_slice(&nonce.to_be_bytes());
    LogEntry {
        address: CONTRACT,
        topics: vec![
            hash_event_signature(&config.event_signature),
            H256(nonce_topic),
            MESSAGE_ROOT,
        ],
        data: abi_encode_bytes(b"across the bridge"),
    }
}

fn unrelated_log() -> LogEntry {
    LogEntry {
        address: H160([0x77; 20]),
        topics: vec![H256([0x55; 32])],
        data: vec![0x01],
    }
}

fn abi_encode_bytes(payload: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; 64];
    data[31] = 0x20;
    data[63] = payload.len() as u8;
    data.extend_from_slice(payload);
    data.resize(64 + payload.len().div_ceil(32) * 32, 0);
    data
}

/// Three receipts; the message lives in tx 1, as the second log.
fn sample_receipts() -> Vec<TxReceipt> {
    let config = ChainConfig::default();
    vec![
        TxReceipt {
            transaction_hash: H256([0xa0; 32]),
            transaction_index: 0,
            tx_type: 0,
            status: 1,
            cumulative_gas_used: 21_000,
            logs_bloom: vec![0; 256],
            logs: vec![unrelated_log()],
        },
        TxReceipt {
            transaction_hash: H256([0xa1; 32]),
            transaction_index: 1,
            tx_type: 2,
            status: 1,
            cumulative_gas_used: 84_000,
            logs_bloom: vec![0; 256],
            logs: vec![unrelated_log(), matching_log(7, &config)],
        },
        TxReceipt {
            transaction_hash: H256([0xa2; 32]),
            transaction_index: 2,
            tx_type: 2,
            status: 0,
            cumulative_gas_used: 105_000,
            logs_bloom: vec![0; 256],
            logs: vec![],
        },
    ]
}

fn message() -> MessageFields {
    MessageFields {
        nonce: 7,
        contract_address: CONTRACT,
        message_root: MESSAGE_ROOT,
        message: b"across the bridge".to_vec(),
        tx_hash: H256([0xa1; 32]),
        tx_block_number: BLOCK_NUMBER,
    }
}

#[tokio::test]
async fn builds_and_self_verifies_a_receipt_proof() {
    let chain = MockChain::new();
    let config = ChainConfig::default();

    let bundle = build_receipt_proof(&chain, &config, &message(), SlotStrategy::SameSlot)
        .await
        .expect("receipt proof builds");

    assert_eq!(bundle.src_slot, BLOCK_SLOT);
    assert_eq!(bundle.tx_slot, BLOCK_SLOT);
    assert_eq!(bundle.receipts_root, chain.block.receipts_root);
    assert_eq!(bundle.log_index, 1);
    assert_eq!(bundle.rlp_encoded_tx_index, rlp::encode_u64(1));

    // The MPT path resolves to the target receipt's consensus encoding.
    let value = trie::verify(
        &bundle.receipts_root.0,
        &bundle.rlp_encoded_tx_index,
        &bundle.receipt_proof,
    )
    .expect("proof verifies")
    .expect("receipt included");
    assert_eq!(value, encode_receipt(&chain.receipts[1]));

    // The SSZ branch folds the receipts root up to the header root.
    let header_root = hash_tree_root_header(&chain.roots.header);
    let branch: Vec<[u8; 32]> = bundle.receipts_root_proof.iter().map(|h| h.0).collect();
    assert!(verify_branch(
        &bundle.receipts_root.0,
        &branch,
        RECEIPTS_ROOT_INDEX,
        &header_root.0
    ));

    let fixture = bundle.fixture();
    assert_eq!(fixture.claimed_emitter, CONTRACT);
    assert_eq!(fixture.message_root, MESSAGE_ROOT);
    assert_eq!(fixture.key, bundle.rlp_encoded_tx_index);
    assert_eq!(fixture.proof, bundle.receipt_proof);
}

#[tokio::test]
async fn close_slot_is_same_slot_plus_the_configured_offset() {
    let chain = MockChain::new();
    let config = ChainConfig::default();

    let same = select_slot(SlotStrategy::SameSlot, BLOCK_NUMBER, &config, &chain)
        .await
        .unwrap();
    let close = select_slot(SlotStrategy::CloseSlot, BLOCK_NUMBER, &config, &chain)
        .await
        .unwrap();
    assert_eq!(close, same + config.close_slot_offset);

    // Selection is deterministic for fixed inputs.
    let again = select_slot(SlotStrategy::CloseSlot, BLOCK_NUMBER, &config, &chain)
        .await
        .unwrap();
    assert_eq!(close, again);
}

#[tokio::test]
async fn latest_strategy_anchors_to_the_head_slot() {
    let chain = MockChain::new();
    let config = ChainConfig::default();
    let slot = select_slot(SlotStrategy::Latest, BLOCK_NUMBER, &config, &chain)
        .await
        .unwrap();
    assert_eq!(slot, HEAD_SLOT);
}

#[tokio::test]
async fn close_slot_proof_still_anchors_the_message_block() {
    let chain = MockChain::new();
    let config = ChainConfig::default();

    let bundle = build_receipt_proof(&chain, &config, &message(), SlotStrategy::CloseSlot)
        .await
        .expect("receipt proof builds");
    assert_eq!(bundle.src_slot, BLOCK_SLOT + config.close_slot_offset);
    assert_eq!(bundle.tx_slot, BLOCK_SLOT);
    assert_eq!(bundle.receipts_root, chain.block.receipts_root);
}

#[tokio::test]
async fn same_slot_strategy_rejects_a_skewed_block_index() {
    let mut chain = MockChain::new();
    chain.skewed_slot_index = true;
    let config = ChainConfig::default();

    let err = build_receipt_proof(&chain, &config, &message(), SlotStrategy::SameSlot)
        .await
        .expect_err("skewed index must not be accepted");
    match err {
        ProofError::SlotMismatch {
            anchor_slot,
            anchor_block,
            message_block,
        } => {
            assert_eq!(anchor_slot, BLOCK_SLOT);
            assert_eq!(anchor_block, BLOCK_NUMBER + 1);
            assert_eq!(message_block, BLOCK_NUMBER);
        }
        other => panic!("expected SlotMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_transaction_is_receipt_not_found() {
    let chain = MockChain::new();
    let config = ChainConfig::default();
    let mut msg = message();
    msg.tx_hash = H256([0xee; 32]);

    let err = build_receipt_proof(&chain, &config, &msg, SlotStrategy::SameSlot)
        .await
        .expect_err("unknown tx");
    assert!(matches!(err, ProofError::ReceiptNotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn duplicate_matching_logs_are_ambiguous() {
    let config = ChainConfig::default();
    let mut receipts = sample_receipts();
    receipts[1].logs.push(matching_log(7, &config));
    let chain = MockChain::with_receipts(receipts);

    let err = build_receipt_proof(&chain, &config, &message(), SlotStrategy::SameSlot)
        .await
        .expect_err("two matching logs");
    match err {
        ProofError::AmbiguousLog { tx_hash, count } => {
            assert_eq!(tx_hash, H256([0xa1; 32]));
            assert_eq!(count, 2);
        }
        other => panic!("expected AmbiguousLog, got {other:?}"),
    }
}

#[tokio::test]
async fn wrong_message_root_in_the_log_is_not_found() {
    let chain = MockChain::new();
    let config = ChainConfig::default();
    let mut msg = message();
    msg.message_root = H256([0xcd; 32]);

    let err = build_receipt_proof(&chain, &config, &msg, SlotStrategy::SameSlot)
        .await
        .expect_err("root mismatch");
    assert!(matches!(err, ProofError::ReceiptNotFound { .. }), "got {err:?}");
}

#[test]
fn sent_message_is_read_back_from_the_receipts() {
    let config = ChainConfig::default();
    let receipts = sample_receipts();

    let msg = find_sent_message(&receipts, &config, CONTRACT, BLOCK_NUMBER).unwrap();
    assert_eq!(msg.nonce, 7);
    assert_eq!(msg.message_root, MESSAGE_ROOT);
    assert_eq!(msg.message, b"across the bridge".to_vec());
    assert_eq!(msg.tx_hash, H256([0xa1; 32]));
    assert_eq!(msg.tx_block_number, BLOCK_NUMBER);

    let err = find_sent_message(&receipts, &config, H160([0x99; 20]), BLOCK_NUMBER)
        .expect_err("no event from that emitter");
    assert!(matches!(err, ProofError::ReceiptNotFound { .. }), "got {err:?}");
}
