use ethereum_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};

/// General Keccak256 hash function
pub fn keccak256(bytes: impl AsRef<[u8]>) -> [u8; 32] {
    let mut h = Keccak256::new();
    h.update(bytes.as_ref());
    let out = h.finalize();
    let mut r = [0u8; 32];
    r.copy_from_slice(&out);
    r
}

/// Hash an event signature string using Keccak256 (Solidity standard)
pub fn hash_event_signature(s: &str) -> H256 {
    H256(keccak256(s.as_bytes()))
}

/// Left-pad bytes to 32 bytes (for EVM storage values)
pub fn left_pad_32(v: &[u8]) -> [u8; 32] {
    if v.len() >= 32 {
        let mut out = [0u8; 32];
        out.copy_from_slice(&v[v.len() - 32..]);
        return out;
    }
    let mut out = [0u8; 32];
    out[32 - v.len()..].copy_from_slice(v);
    out
}

/// Storage slot of `mapping(uint64 => bytes32) messages` for a given
/// nonce: `keccak(pad32(nonce) ++ pad32(base_slot))`, per the Solidity
/// storage layout of the source contract. The base slot is configuration
/// and must match the contract being proved against.
pub fn storage_slot_for_nonce(nonce: u64, base_slot: u64) -> H256 {
    let mut preimage = [0u8; 64];
    U256::from(nonce).to_big_endian(&mut preimage[..32]);
    U256::from(base_slot).to_big_endian(&mut preimage[32..]);
    H256(keccak256(preimage))
}

/// Trie path of an account inside the state trie.
pub fn account_trie_key(address: H160) -> Vec<u8> {
    keccak256(address.as_bytes()).to_vec()
}

/// Trie path of a storage slot inside an account's storage trie.
pub fn storage_trie_key(slot: H256) -> Vec<u8> {
    keccak256(slot.as_bytes()).to_vec()
}
