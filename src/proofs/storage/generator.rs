use ethereum_types::H256;

use crate::proofs::common::error::{ProofError, ProofResult};
use crate::proofs::common::evm::{account_trie_key, left_pad_32, storage_trie_key};
use crate::proofs::storage::bundle::StorageProofBundle;
use crate::proofs::storage::decode::decode_account;
use crate::proofs::{rlp, trie};
use crate::provider::{BlockId, DataProvider};
use crate::types::MessageFields;

/// Build the two-level storage proof for a contract slot at a block.
///
/// Both trie walks are re-verified here before the bundle is returned, so
/// a bundle this function yields always passes the same verification a
/// downstream consumer runs.
pub async fn build_storage_proof<P: DataProvider + ?Sized>(
    provider: &P,
    message: MessageFields,
    storage_key: H256,
    anchor_block: u64,
) -> ProofResult<StorageProofBundle> {
    let contract = message.contract_address;
    let block = provider.get_block(BlockId::Number(anchor_block)).await?;
    let response = provider
        .get_proof(contract, &[storage_key], BlockId::Number(anchor_block))
        .await?;

    // Account-trie walk: state root -> account record
    let account_raw = trie::verify(
        &block.state_root.0,
        &account_trie_key(contract),
        &response.account_proof,
    )?
    .ok_or_else(|| ProofError::account_not_found(contract, block.state_root))?;

    let account = decode_account(&account_raw)?;
    if account.storage_root != response.storage_hash {
        return Err(ProofError::invalid(format!(
            "proven storage root {:?} disagrees with provider's {:?}",
            account.storage_root, response.storage_hash
        )));
    }

    // Storage-trie walk: storage root -> slot value
    let entry = response
        .storage_proof
        .iter()
        .find(|p| p.key == storage_key)
        .ok_or_else(|| {
            ProofError::Provider(crate::provider::ProviderError::new(format!(
                "provider returned no proof for slot {storage_key:?}"
            )))
        })?;

    let value_raw = trie::verify(
        &account.storage_root.0,
        &storage_trie_key(storage_key),
        &entry.proof,
    )?
    .ok_or_else(|| ProofError::slot_not_found(storage_key, account.storage_root))?;

    // The leaf payload is the RLP of the stored (minimal) value.
    let value_bytes = rlp::decode(&value_raw)?;
    let value = H256(left_pad_32(value_bytes.as_bytes().map_err(ProofError::from)?));

    tracing::info!(
        contract = ?contract,
        block = anchor_block,
        slot = ?storage_key,
        "built storage proof"
    );

    Ok(StorageProofBundle {
        message,
        account_proof: response.account_proof,
        storage_proof: entry.proof.clone(),
        state_root: block.state_root,
        storage_root: account.storage_root,
        value,
    })
}

/// Re-run the account-trie walk of a finished bundle, the check a
/// downstream verifier performs before trusting the storage root.
pub fn verify_storage_bundle(bundle: &StorageProofBundle) -> ProofResult<H256> {
    let account_raw = trie::verify(
        &bundle.state_root.0,
        &account_trie_key(bundle.message.contract_address),
        &bundle.account_proof,
    )?
    .ok_or_else(|| {
        ProofError::account_not_found(bundle.message.contract_address, bundle.state_root)
    })?;
    let account = decode_account(&account_raw)?;
    if account.storage_root != bundle.storage_root {
        return Err(ProofError::invalid("bundle storage root mismatch"));
    }
    Ok(account.storage_root)
}
