use ethereum_types::{H160, H256};

use crate::config::ChainConfig;
use crate::consensus::ssz::{
    hash_tree_root_header, header_leaves, merkle_branch, merkleize, verify_branch, BODY_LEAVES,
    BODY_ROOT_FIELD, EXECUTION_PAYLOAD_FIELD, HEADER_LEAVES, PAYLOAD_LEAVES, RECEIPTS_ROOT_DEPTH,
    RECEIPTS_ROOT_FIELD, RECEIPTS_ROOT_INDEX,
};
use crate::proofs::common::error::{ProofError, ProofResult};
use crate::proofs::common::evm::hash_event_signature;
use crate::proofs::receipt::bundle::ReceiptProofBundle;
use crate::proofs::receipt::encode::encode_receipt;
use crate::proofs::slot::{select_slot, SlotStrategy};
use crate::proofs::{rlp, trie};
use crate::provider::{BlockId, DataProvider};
use crate::types::{BeaconBlockRoots, LogEntry, MessageFields, TxReceipt};

/// Build the receipt inclusion proof for a sent message.
///
/// Rebuilds the receipts trie of the message's block from the provider's
/// receipts, locates the unique matching log, extracts the MPT path for
/// the transaction index, and binds the receipts root into the slot's
/// consensus header with an SSZ branch. Every proof is re-verified before
/// the bundle is returned.
pub async fn build_receipt_proof<P: DataProvider + ?Sized>(
    provider: &P,
    config: &ChainConfig,
    message: &MessageFields,
    strategy: SlotStrategy,
) -> ProofResult<ReceiptProofBundle> {
    let src_slot = select_slot(strategy, message.tx_block_number, config, provider).await?;
    let anchor_block = provider.get_block(BlockId::Slot(src_slot)).await?;
    if strategy == SlotStrategy::SameSlot && anchor_block.number != message.tx_block_number {
        return Err(ProofError::SlotMismatch {
            anchor_slot: src_slot,
            anchor_block: anchor_block.number,
            message_block: message.tx_block_number,
        });
    }

    let tx_slot = provider.block_to_slot(message.tx_block_number).await?;
    let block = if anchor_block.number == message.tx_block_number {
        anchor_block
    } else {
        provider
            .get_block(BlockId::Number(message.tx_block_number))
            .await?
    };

    // Rebuild the receipts trie keyed by rlp(txIndex).
    let receipts = provider.get_receipts(BlockId::Number(block.number)).await?;
    let mut receipts_trie = trie::Trie::new();
    for receipt in &receipts {
        receipts_trie.insert(
            &rlp::encode_u64(receipt.transaction_index),
            encode_receipt(receipt),
        );
    }
    let receipts_root = H256(receipts_trie.root_hash());
    if receipts_root != block.receipts_root {
        return Err(ProofError::invalid(format!(
            "rebuilt receipts root {receipts_root:?} disagrees with block header {:?}",
            block.receipts_root
        )));
    }

    // Locate the target transaction and its unique matching log.
    let tx_index = receipts
        .iter()
        .position(|r| r.transaction_hash == message.tx_hash)
        .ok_or_else(|| {
            ProofError::receipt_not_found(format!(
                "tx {:?} not in block {}",
                message.tx_hash, block.number
            ))
        })?;
    let log_index = locate_log(
        &receipts[tx_index],
        hash_event_signature(&config.event_signature),
        message.contract_address,
        message.message_root,
    )?;

    // Extract and self-check the MPT path.
    let rlp_encoded_tx_index = rlp::encode_u64(tx_index as u64);
    let receipt_proof = receipts_trie.prove(&rlp_encoded_tx_index);
    match trie::verify(&receipts_root.0, &rlp_encoded_tx_index, &receipt_proof)? {
        Some(value) if value == encode_receipt(&receipts[tx_index]) => {}
        _ => return Err(ProofError::invalid("receipt proof failed self-check")),
    }

    // Bind the receipts root into the consensus header at the tx slot.
    let roots = provider.get_block_roots(tx_slot).await?;
    let receipts_root_proof = build_receipts_root_branch(&roots, receipts_root)?;

    tracing::info!(
        tx = ?message.tx_hash,
        block = block.number,
        src_slot,
        tx_slot,
        tx_index,
        log_index,
        "built receipt proof"
    );

    Ok(ReceiptProofBundle {
        message: message.clone(),
        src_slot,
        tx_slot,
        receipts_root_proof,
        receipts_root,
        receipt_proof,
        rlp_encoded_tx_index,
        log_index,
    })
}

/// Read the message fields back out of the source contract's event in a
/// block, scanning the block's receipts for the configured signature.
pub fn find_sent_message(
    receipts: &[TxReceipt],
    config: &ChainConfig,
    contract: H160,
    block_number: u64,
) -> ProofResult<MessageFields> {
    let topic0 = hash_event_signature(&config.event_signature);
    let mut found: Option<MessageFields> = None;

    for receipt in receipts {
        for log in &receipt.logs {
            if log.address != contract || log.topics.first() != Some(&topic0) {
                continue;
            }
            if log.topics.len() < 3 {
                return Err(ProofError::receipt_not_found(
                    "matched event is missing indexed fields",
                ));
            }
            if found.is_some() {
                return Err(ProofError::AmbiguousLog {
                    tx_hash: receipt.transaction_hash,
                    count: 2,
                });
            }
            found = Some(MessageFields {
                nonce: topic_to_u64(&log.topics[1]),
                contract_address: contract,
                message_root: log.topics[2],
                message: abi_decode_bytes(&log.data)?,
                tx_hash: receipt.transaction_hash,
                tx_block_number: block_number,
            });
        }
    }

    found.ok_or_else(|| {
        ProofError::receipt_not_found(format!(
            "no {} event from {:?} in block {}",
            config.event_signature, contract, block_number
        ))
    })
}

// --- Helper Functions ---

/// Find the unique log in a receipt matching the event signature and
/// emitter. The log position must be unambiguous: zero matches is
/// `ReceiptNotFound`, more than one is `AmbiguousLog`.
fn locate_log(
    receipt: &TxReceipt,
    topic0: H256,
    emitter: H160,
    expected_root: H256,
) -> ProofResult<u64> {
    let matches: Vec<(usize, &LogEntry)> = receipt
        .logs
        .iter()
        .enumerate()
        .filter(|(_, log)| log.address == emitter && log.topics.first() == Some(&topic0))
        .collect();

    match matches.as_slice() {
        [] => Err(ProofError::receipt_not_found(format!(
            "no matching log in tx {:?}",
            receipt.transaction_hash
        ))),
        [(index, log)] => {
            if log.topics.get(2) != Some(&expected_root) {
                return Err(ProofError::receipt_not_found(format!(
                    "log in tx {:?} does not carry message root {expected_root:?}",
                    receipt.transaction_hash
                )));
            }
            Ok(*index as u64)
        }
        many => Err(ProofError::AmbiguousLog {
            tx_hash: receipt.transaction_hash,
            count: many.len(),
        }),
    }
}

/// Build the bottom-up branch binding `receipts_root` into the header
/// root: payload fields, then body fields, then header fields. The branch
/// is self-checked against the header tree-hash before it is returned.
fn build_receipts_root_branch(
    roots: &BeaconBlockRoots,
    receipts_root: H256,
) -> ProofResult<Vec<H256>> {
    let payload: Vec<[u8; 32]> = roots.payload_field_roots.iter().map(|h| h.0).collect();
    if payload.len() > PAYLOAD_LEAVES || payload.len() <= RECEIPTS_ROOT_FIELD {
        return Err(ProofError::invalid(format!(
            "payload has {} field roots",
            payload.len()
        )));
    }
    if payload[RECEIPTS_ROOT_FIELD] != receipts_root.0 {
        return Err(ProofError::invalid(
            "consensus payload receipts_root disagrees with execution block",
        ));
    }

    let body: Vec<[u8; 32]> = roots.body_field_roots.iter().map(|h| h.0).collect();
    if body.len() > BODY_LEAVES || body.len() <= EXECUTION_PAYLOAD_FIELD {
        return Err(ProofError::invalid(format!(
            "body has {} field roots",
            body.len()
        )));
    }
    if body[EXECUTION_PAYLOAD_FIELD] != merkleize(&payload, PAYLOAD_LEAVES) {
        return Err(ProofError::invalid(
            "body execution_payload root disagrees with payload fields",
        ));
    }
    if merkleize(&body, BODY_LEAVES) != roots.header.body_root.0 {
        return Err(ProofError::invalid(
            "header body_root disagrees with body fields",
        ));
    }

    let mut branch = merkle_branch(&payload, PAYLOAD_LEAVES, RECEIPTS_ROOT_FIELD);
    branch.extend(merkle_branch(&body, BODY_LEAVES, EXECUTION_PAYLOAD_FIELD));
    branch.extend(merkle_branch(
        &header_leaves(&roots.header),
        HEADER_LEAVES,
        BODY_ROOT_FIELD,
    ));

    let header_root = hash_tree_root_header(&roots.header);
    if !verify_branch(
        &receipts_root.0,
        &branch,
        RECEIPTS_ROOT_INDEX,
        &header_root.0,
    ) {
        return Err(ProofError::invalid(
            "receipts-root branch failed self-check",
        ));
    }

    Ok(branch.into_iter().map(H256).collect())
}

fn topic_to_u64(topic: &H256) -> u64 {
    u64::from_be_bytes(topic.0[24..].try_into().expect("8 bytes"))
}

/// Decode a solo ABI-encoded `bytes` payload (offset, length, data).
fn abi_decode_bytes(data: &[u8]) -> ProofResult<Vec<u8>> {
    if data.len() < 64 {
        return Err(ProofError::receipt_not_found(
            "event data too short for ABI bytes",
        ));
    }
    let len = u64::from_be_bytes(data[56..64].try_into().expect("8 bytes")) as usize;
    data.get(64..64 + len)
        .map(|d| d.to_vec())
        .ok_or_else(|| ProofError::receipt_not_found("event data shorter than ABI length"))
}
