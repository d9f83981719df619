use ethereum_types::H256;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ChainConfig;
use crate::consensus::certify::Certification;
use crate::proofs::common::error::{ProofError, ProofResult};
use crate::prover::{CircuitKind, Groth16Proof, ProvingOracle};
use crate::types::{string_u64, ConsensusUpdate};

/// Constructor parameters of a downstream light-client deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialFixture {
    #[serde(with = "string_u64")]
    pub genesis_time: u64,
    pub genesis_validators_root: H256,
    pub seconds_per_slot: u64,
    pub slots_per_period: u64,
    pub sync_committee_period: u64,
    pub sync_committee_poseidon: String,
}

/// One attested step of the light client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFixture {
    pub attested_slot: u64,
    pub finalized_slot: u64,
    #[serde(with = "string_u64")]
    pub participation: u64,
    pub finalized_header_root: H256,
    pub execution_state_root: H256,
    #[serde(flatten)]
    pub proof: Groth16Proof,
    pub inputs: Vec<String>,
}

/// One sync-committee rotation of the light client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateFixture {
    #[serde(flatten)]
    pub proof: Groth16Proof,
    #[serde(rename = "syncCommitteeSSZ")]
    pub sync_committee_ssz: H256,
    #[serde(rename = "syncCommitteePoseidon")]
    pub sync_committee_poseidon: String,
}

/// The complete light-client fixture a test harness or verifier consumes.
/// Field names and string encodings are a bit-exact contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightClientFixture {
    pub initial: InitialFixture,
    pub step: StepFixture,
    pub rotate: RotateFixture,
}

/// Assemble the light-client fixture for a certified update.
///
/// Updates below the finality threshold yield `None` before any proving
/// effort is spent; the caller may retry with a later update.
pub async fn build_light_client_fixture<P: ProvingOracle + ?Sized>(
    update: &ConsensusUpdate,
    certification: &Certification,
    prover: &P,
    config: &ChainConfig,
) -> ProofResult<Option<LightClientFixture>> {
    if certification.participation < config.finality_threshold {
        tracing::info!(
            participation = certification.participation,
            threshold = config.finality_threshold,
            "skipping fixture generation due to low participation"
        );
        return Ok(None);
    }

    let step_input = json!({
        "attestedSlot": update.attested_header.slot,
        "finalizedSlot": update.finalized_header.slot,
        "participation": certification.participation,
        "finalizedHeaderRoot": certification.finalized_header_root,
        "executionStateRoot": update.execution_state_root,
        "syncCommitteePoseidon": certification.current_committee_commitment,
    });
    let step = prover
        .prove(CircuitKind::Step, step_input)
        .await
        .map_err(ProofError::Other)?;

    let rotate_input = json!({
        "syncCommitteeSSZ": certification.next_committee_ssz_root,
        "syncCommitteePoseidon": certification.next_committee_commitment,
    });
    let rotate = prover
        .prove(CircuitKind::Rotate, rotate_input)
        .await
        .map_err(ProofError::Other)?;

    Ok(Some(LightClientFixture {
        initial: InitialFixture {
            genesis_time: update.genesis_time,
            genesis_validators_root: update.genesis_validators_root,
            seconds_per_slot: config.seconds_per_slot,
            slots_per_period: config.slots_per_period,
            sync_committee_period: config.period_of(update.attested_header.slot),
            sync_committee_poseidon: certification.current_committee_commitment.clone(),
        },
        step: StepFixture {
            attested_slot: update.attested_header.slot,
            finalized_slot: update.finalized_header.slot,
            participation: certification.participation,
            finalized_header_root: certification.finalized_header_root,
            execution_state_root: update.execution_state_root,
            proof: step.proof,
            inputs: step.public_inputs,
        },
        rotate: RotateFixture {
            proof: rotate.proof,
            sync_committee_ssz: certification.next_committee_ssz_root,
            sync_committee_poseidon: certification.next_committee_commitment.clone(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prover::Groth16Proof;

    #[test]
    fn fixture_serializes_with_contract_field_names() {
        let proof = Groth16Proof {
            a: ["1".into(), "2".into()],
            b: [["3".into(), "4".into()], ["5".into(), "6".into()]],
            c: ["7".into(), "8".into()],
        };
        let fixture = LightClientFixture {
            initial: InitialFixture {
                genesis_time: 1_616_508_000,
                genesis_validators_root: H256([1; 32]),
                seconds_per_slot: 12,
                slots_per_period: 8192,
                sync_committee_period: 512,
                sync_committee_poseidon: "12345".into(),
            },
            step: StepFixture {
                attested_slot: 4_196_352,
                finalized_slot: 4_196_288,
                participation: 426,
                finalized_header_root: H256([2; 32]),
                execution_state_root: H256([3; 32]),
                proof: proof.clone(),
                inputs: vec!["99".into()],
            },
            rotate: RotateFixture {
                proof,
                sync_committee_ssz: H256([4; 32]),
                sync_committee_poseidon: "67890".into(),
            },
        };

        let value = serde_json::to_value(&fixture).unwrap();
        assert_eq!(value["initial"]["genesisTime"], "1616508000");
        assert_eq!(value["initial"]["secondsPerSlot"], 12);
        assert_eq!(value["step"]["participation"], "426");
        assert_eq!(value["step"]["attestedSlot"], 4_196_352);
        assert_eq!(value["step"]["a"][0], "1");
        assert_eq!(value["step"]["inputs"][0], "99");
        assert_eq!(
            value["rotate"]["syncCommitteeSSZ"],
            serde_json::to_value(H256([4; 32])).unwrap()
        );
        assert_eq!(value["rotate"]["syncCommitteePoseidon"], "67890");
    }
}
