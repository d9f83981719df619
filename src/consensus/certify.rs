use ethereum_types::H256;
use serde::{Deserialize, Serialize};

use crate::consensus::commitment::{compute_bit_sum, poseidon_committee_commitment};
use crate::consensus::ssz::{hash_tree_root_header, hash_tree_root_sync_committee};
use crate::proofs::common::error::ProofResult;
use crate::types::ConsensusUpdate;

/// Deterministic commitments derived from a sync-committee-period update.
/// Everything here is a pure function of the update; nothing touches the
/// network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    /// Tree-hash of the finalized beacon block header
    pub finalized_header_root: H256,
    /// Algebraic commitment to the current committee's keys (decimal)
    pub current_committee_commitment: String,
    /// Algebraic commitment to the next committee's keys (decimal)
    pub next_committee_commitment: String,
    /// SSZ root of the next committee, for the on-chain verifier
    pub next_committee_ssz_root: H256,
    /// Attesting-validator count in the update's sync aggregate
    pub participation: u64,
}

/// Derive the commitments that certify an update: the finalized header
/// root, both committee commitments, the next committee's SSZ root, and
/// the participation count the caller gates fixture emission on.
pub fn certify(update: &ConsensusUpdate) -> ProofResult<Certification> {
    let finalized_header_root = hash_tree_root_header(&update.finalized_header);
    let current_committee_commitment =
        poseidon_committee_commitment(&update.current_sync_committee.pubkeys)?;
    let next_committee_commitment =
        poseidon_committee_commitment(&update.next_sync_committee.pubkeys)?;
    let next_committee_ssz_root = hash_tree_root_sync_committee(&update.next_sync_committee);
    let participation = compute_bit_sum(&update.sync_aggregate.sync_committee_bits);

    tracing::debug!(
        attested_slot = update.attested_header.slot,
        finalized_slot = update.finalized_header.slot,
        participation,
        "certified consensus update"
    );

    Ok(Certification {
        finalized_header_root,
        current_committee_commitment,
        next_committee_commitment,
        next_committee_ssz_root,
        participation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BeaconHeader, PublicKey, SyncAggregate, SyncCommittee};
    use ethereum_types::H256;

    fn committee(fill: u8) -> SyncCommittee {
        SyncCommittee {
            pubkeys: (0..8).map(|i| PublicKey([fill ^ i as u8; 48])).collect(),
            aggregate_pubkey: PublicKey([fill; 48]),
        }
    }

    fn header(slot: u64) -> BeaconHeader {
        BeaconHeader {
            slot,
            proposer_index: 1,
            parent_root: H256([1; 32]),
            state_root: H256([2; 32]),
            body_root: H256([3; 32]),
        }
    }

    fn update(bits: Vec<u8>) -> ConsensusUpdate {
        ConsensusUpdate {
            attested_header: header(1000),
            finalized_header: header(968),
            genesis_validators_root: H256([7; 32]),
            genesis_time: 1_616_508_000,
            current_sync_committee: committee(0x11),
            next_sync_committee: committee(0x22),
            sync_aggregate: SyncAggregate {
                sync_committee_bits: bits,
                sync_committee_signature: vec![0; 96],
            },
            execution_state_root: H256([8; 32]),
        }
    }

    #[test]
    fn certification_is_pure() {
        let u = update(vec![0xff; 44]);
        let a = certify(&u).unwrap();
        let b = certify(&u).unwrap();
        assert_eq!(a.finalized_header_root, b.finalized_header_root);
        assert_eq!(a.current_committee_commitment, b.current_committee_commitment);
        assert_eq!(a.next_committee_ssz_root, b.next_committee_ssz_root);
        assert_eq!(a.participation, 352);
    }

    #[test]
    fn committees_are_committed_independently() {
        let cert = certify(&update(vec![0xff; 44])).unwrap();
        // Different committees, different commitments; and the next
        // committee's two commitments use different algorithms.
        assert_ne!(
            cert.current_committee_commitment,
            cert.next_committee_commitment
        );
        assert_eq!(
            cert.next_committee_ssz_root,
            hash_tree_root_sync_committee(&committee(0x22))
        );
    }
}
