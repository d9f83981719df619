use crate::proofs::rlp::{self, Item};
use crate::types::{LogEntry, TxReceipt};

/// Re-encode a receipt exactly as it is committed into the receipts trie.
///
/// The consensus encoding is `rlp([status, cumulativeGasUsed, logsBloom,
/// logs])`, prefixed with the transaction type byte for EIP-2718 typed
/// transactions. Legacy receipts (type 0) are the bare RLP list.
pub fn encode_receipt(receipt: &TxReceipt) -> Vec<u8> {
    let logs = Item::List(receipt.logs.iter().map(encode_log).collect());
    let payload = rlp::encode(&Item::List(vec![
        Item::Bytes(rlp::u64_to_minimal_be(receipt.status)),
        Item::Bytes(rlp::u64_to_minimal_be(receipt.cumulative_gas_used)),
        Item::Bytes(receipt.logs_bloom.clone()),
        logs,
    ]));

    if receipt.tx_type == 0 {
        payload
    } else {
        let mut out = Vec::with_capacity(payload.len() + 1);
        out.push(receipt.tx_type as u8);
        out.extend_from_slice(&payload);
        out
    }
}

fn encode_log(log: &LogEntry) -> Item {
    Item::List(vec![
        Item::Bytes(log.address.as_bytes().to_vec()),
        Item::List(
            log.topics
                .iter()
                .map(|t| Item::Bytes(t.as_bytes().to_vec()))
                .collect(),
        ),
        Item::Bytes(log.data.clone()),
    ])
}
