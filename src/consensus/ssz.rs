use ethereum_types::H256;
use sha2::{Digest, Sha256};

use crate::types::{BeaconHeader, PublicKey, SyncCommittee};

/// Chunk count of a merkleized beacon header (5 fields padded to 8)
pub const HEADER_LEAVES: usize = 8;
/// Field index of `body_root` inside the header
pub const BODY_ROOT_FIELD: usize = 4;
/// Chunk count of a merkleized block body
pub const BODY_LEAVES: usize = 16;
/// Field index of `execution_payload` inside the block body
pub const EXECUTION_PAYLOAD_FIELD: usize = 9;
/// Chunk count of a merkleized execution payload
pub const PAYLOAD_LEAVES: usize = 16;
/// Field index of `receipts_root` inside the execution payload
pub const RECEIPTS_ROOT_FIELD: usize = 3;

/// Validators per sync committee
pub const SYNC_COMMITTEE_SIZE: usize = 512;

/// Depth of the branch from `receipts_root` up to the header root
pub const RECEIPTS_ROOT_DEPTH: usize = 4 + 4 + 3;

/// Bit-packed position of `receipts_root` under the header root, low bits
/// first: payload field, then body field, then header field.
pub const RECEIPTS_ROOT_INDEX: u64 =
    RECEIPTS_ROOT_FIELD as u64 | (EXECUTION_PAYLOAD_FIELD as u64) << 4 | (BODY_ROOT_FIELD as u64) << 8;

/// SHA-256 of the concatenation of two 32-byte chunks
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(left);
    h.update(right);
    let out = h.finalize();
    let mut r = [0u8; 32];
    r.copy_from_slice(&out);
    r
}

/// Merkleize chunks into a binary tree padded with zero chunks to `limit`
/// (a power of two).
pub fn merkleize(chunks: &[[u8; 32]], limit: usize) -> [u8; 32] {
    debug_assert!(limit.is_power_of_two() && chunks.len() <= limit);
    let mut layer: Vec<[u8; 32]> = chunks.to_vec();
    layer.resize(limit, [0u8; 32]);
    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    layer[0]
}

/// Sibling hashes on the path from `chunks[index]` to the subtree root,
/// bottom-up.
pub fn merkle_branch(chunks: &[[u8; 32]], limit: usize, index: usize) -> Vec<[u8; 32]> {
    debug_assert!(limit.is_power_of_two() && index < limit);
    let mut layer: Vec<[u8; 32]> = chunks.to_vec();
    layer.resize(limit, [0u8; 32]);

    let mut branch = Vec::new();
    let mut idx = index;
    while layer.len() > 1 {
        branch.push(layer[idx ^ 1]);
        idx >>= 1;
        layer = layer
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    branch
}

/// Fold a leaf up through its branch. `index` carries the leaf position,
/// low bit deciding the hash order at each level.
pub fn verify_branch(leaf: &[u8; 32], branch: &[[u8; 32]], index: u64, root: &[u8; 32]) -> bool {
    let mut node = *leaf;
    let mut idx = index;
    for sibling in branch {
        node = if idx & 1 == 1 {
            hash_pair(sibling, &node)
        } else {
            hash_pair(&node, sibling)
        };
        idx >>= 1;
    }
    node == *root
}

/// Little-endian integer chunk, as SSZ packs `uint64` fields
pub fn u64_chunk(value: u64) -> [u8; 32] {
    let mut chunk = [0u8; 32];
    chunk[..8].copy_from_slice(&value.to_le_bytes());
    chunk
}

/// Field chunks of a beacon header, in field order
pub fn header_leaves(header: &BeaconHeader) -> Vec<[u8; 32]> {
    vec![
        u64_chunk(header.slot),
        u64_chunk(header.proposer_index),
        header.parent_root.0,
        header.state_root.0,
        header.body_root.0,
    ]
}

/// SSZ tree-hash of a beacon block header
pub fn hash_tree_root_header(header: &BeaconHeader) -> H256 {
    H256(merkleize(&header_leaves(header), HEADER_LEAVES))
}

/// Tree-hash of a single 48-byte public key (two chunks, the second
/// zero-padded)
fn pubkey_leaf(pubkey: &PublicKey) -> [u8; 32] {
    let mut chunk0 = [0u8; 32];
    chunk0.copy_from_slice(&pubkey.0[..32]);
    let mut chunk1 = [0u8; 32];
    chunk1[..16].copy_from_slice(&pubkey.0[32..]);
    hash_pair(&chunk0, &chunk1)
}

/// SSZ tree-hash of a sync committee: the merkleized pubkey vector hashed
/// with the aggregate pubkey root. This is the root the on-chain verifier
/// compares; it is unrelated to the algebraic commitment the circuit
/// consumes.
pub fn hash_tree_root_sync_committee(committee: &SyncCommittee) -> H256 {
    let leaves: Vec<[u8; 32]> = committee.pubkeys.iter().map(pubkey_leaf).collect();
    let pubkeys_root = merkleize(&leaves, SYNC_COMMITTEE_SIZE);
    let aggregate_root = pubkey_leaf(&committee.aggregate_pubkey);
    H256(hash_pair(&pubkeys_root, &aggregate_root))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(fill: u8) -> [u8; 32] {
        [fill; 32]
    }

    #[test]
    fn merkleize_of_two_chunks_is_one_hash() {
        let root = merkleize(&[chunk(1), chunk(2)], 2);
        assert_eq!(root, hash_pair(&chunk(1), &chunk(2)));
    }

    #[test]
    fn merkleize_pads_with_zero_chunks() {
        let explicit = merkleize(&[chunk(1), chunk(2), chunk(3), [0u8; 32]], 4);
        let padded = merkleize(&[chunk(1), chunk(2), chunk(3)], 4);
        assert_eq!(explicit, padded);
    }

    #[test]
    fn branch_round_trips_through_verify() {
        let chunks = vec![chunk(1), chunk(2), chunk(3), chunk(4), chunk(5)];
        let root = merkleize(&chunks, 8);
        for (i, leaf) in chunks.iter().enumerate() {
            let branch = merkle_branch(&chunks, 8, i);
            assert_eq!(branch.len(), 3);
            assert!(verify_branch(leaf, &branch, i as u64, &root));
            assert!(!verify_branch(leaf, &branch, (i as u64) ^ 1, &root));
        }
    }

    #[test]
    fn header_root_commits_to_every_field() {
        let header = BeaconHeader {
            slot: 100,
            proposer_index: 7,
            parent_root: ethereum_types::H256([1; 32]),
            state_root: ethereum_types::H256([2; 32]),
            body_root: ethereum_types::H256([3; 32]),
        };
        let root = hash_tree_root_header(&header);
        let mut changed = header.clone();
        changed.slot += 1;
        assert_ne!(root, hash_tree_root_header(&changed));
        let mut changed = header;
        changed.body_root = ethereum_types::H256([4; 32]);
        assert_ne!(root, hash_tree_root_header(&changed));
    }

    #[test]
    fn committee_root_depends_on_key_order() {
        let key = |b: u8| crate::types::PublicKey([b; 48]);
        let committee = |keys: Vec<crate::types::PublicKey>| crate::types::SyncCommittee {
            pubkeys: keys,
            aggregate_pubkey: key(0xff),
        };
        let a = hash_tree_root_sync_committee(&committee(vec![key(1), key(2)]));
        let b = hash_tree_root_sync_committee(&committee(vec![key(2), key(1)]));
        assert_ne!(a, b);
    }
}
