use anyhow::{anyhow, Result};
use ark_bn254::Fr;
use ark_ff::PrimeField;
use light_poseidon::{Poseidon, PoseidonHasher};

use crate::types::PublicKey;

/// Number of attesting validators in a sync-committee bitfield
pub fn compute_bit_sum(bits: &[u8]) -> u64 {
    bits.iter().map(|b| b.count_ones() as u64).sum()
}

/// Algebraic commitment to a committee's public keys: a Poseidon (BN254,
/// circom parameters) fold over the keys, each key split into two field
/// elements. This is what the zk circuit consumes; the on-chain SSZ root
/// is computed separately and the two must never be conflated.
///
/// Returned as the decimal string fixtures embed.
pub fn poseidon_committee_commitment(pubkeys: &[PublicKey]) -> Result<String> {
    let mut hasher =
        Poseidon::<Fr>::new_circom(2).map_err(|e| anyhow!("poseidon init: {e}"))?;

    let mut acc = Fr::from(0u64);
    for pubkey in pubkeys {
        // 48 bytes split 24/24 so each half stays below the field modulus.
        let hi = Fr::from_be_bytes_mod_order(&pubkey.0[..24]);
        let lo = Fr::from_be_bytes_mod_order(&pubkey.0[24..]);
        let leaf = hasher
            .hash(&[hi, lo])
            .map_err(|e| anyhow!("poseidon hash: {e}"))?;
        acc = hasher
            .hash(&[acc, leaf])
            .map_err(|e| anyhow!("poseidon hash: {e}"))?;
    }
    Ok(acc.to_string())
}
