use ethereum_types::{H256, U256};

use crate::proofs::common::error::ProofError;
use crate::proofs::rlp::{self, Item};

/// The 4-field account record stored at the end of an account-trie proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
}

/// Decode the terminal value of an account-trie proof.
///
/// The value must be an RLP list of exactly `[nonce, balance,
/// storageRoot, codeHash]`; any other arity is `CorruptAccountRlp`.
pub fn decode_account(raw: &[u8]) -> Result<AccountState, ProofError> {
    let item = rlp::decode(raw)?;
    let fields = item.as_list().map_err(ProofError::from)?;
    if fields.len() != 4 {
        return Err(ProofError::CorruptAccountRlp {
            arity: fields.len(),
        });
    }

    let nonce_bytes = fields[0].as_bytes().map_err(ProofError::from)?;
    if nonce_bytes.len() > 8 {
        return Err(ProofError::CorruptAccountRlp { arity: 4 });
    }
    let mut nonce = 0u64;
    for b in nonce_bytes {
        nonce = nonce << 8 | *b as u64;
    }

    let balance_bytes = fields[1].as_bytes().map_err(ProofError::from)?;
    if balance_bytes.len() > 32 {
        return Err(ProofError::CorruptAccountRlp { arity: 4 });
    }

    Ok(AccountState {
        nonce,
        balance: U256::from_big_endian(balance_bytes),
        storage_root: hash_field(&fields[2])?,
        code_hash: hash_field(&fields[3])?,
    })
}

fn hash_field(field: &Item) -> Result<H256, ProofError> {
    let bytes = field.as_bytes().map_err(ProofError::from)?;
    if bytes.len() != 32 {
        return Err(ProofError::CorruptAccountRlp { arity: 4 });
    }
    Ok(H256::from_slice(bytes))
}

/// RLP-encode an account record (used when synthesizing test tries)
pub fn encode_account(account: &AccountState) -> Vec<u8> {
    let mut balance = [0u8; 32];
    account.balance.to_big_endian(&mut balance);
    let first = balance.iter().position(|b| *b != 0).unwrap_or(32);
    rlp::encode(&Item::List(vec![
        Item::Bytes(rlp::u64_to_minimal_be(account.nonce)),
        Item::Bytes(balance[first..].to_vec()),
        Item::Bytes(account.storage_root.as_bytes().to_vec()),
        Item::Bytes(account.code_hash.as_bytes().to_vec()),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AccountState {
        AccountState {
            nonce: 1,
            balance: U256::zero(),
            storage_root: H256([0xaa; 32]),
            code_hash: H256([0xbb; 32]),
        }
    }

    #[test]
    fn account_round_trips() {
        let account = sample();
        let encoded = encode_account(&account);
        assert_eq!(decode_account(&encoded).unwrap(), account);
    }

    #[test]
    fn wrong_arity_is_corrupt() {
        let three = rlp::encode(&Item::List(vec![
            Item::Bytes(vec![1]),
            Item::Bytes(vec![]),
            Item::Bytes(vec![0xaa; 32]),
        ]));
        match decode_account(&three) {
            Err(ProofError::CorruptAccountRlp { arity }) => assert_eq!(arity, 3),
            other => panic!("expected CorruptAccountRlp, got {other:?}"),
        }
    }

    #[test]
    fn truncated_hash_field_is_corrupt() {
        let bad = rlp::encode(&Item::List(vec![
            Item::Bytes(vec![1]),
            Item::Bytes(vec![]),
            Item::Bytes(vec![0xaa; 31]),
            Item::Bytes(vec![0xbb; 32]),
        ]));
        assert!(matches!(
            decode_account(&bad),
            Err(ProofError::CorruptAccountRlp { .. })
        ));
    }

    #[test]
    fn non_list_account_is_malformed() {
        let raw = rlp::encode(&Item::Bytes(vec![1, 2, 3]));
        assert!(matches!(decode_account(&raw), Err(ProofError::Rlp(_))));
    }
}
