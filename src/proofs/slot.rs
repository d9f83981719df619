use crate::config::ChainConfig;
use crate::proofs::common::error::ProofResult;
use crate::provider::{DataProvider, HeaderId};

/// How to choose the consensus slot a proof is anchored to, trading
/// recency against the chain's finality lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStrategy {
    /// The chain head: lowest latency, weakest finality guarantee (the
    /// consumer accepts reorg risk)
    Latest,
    /// The slot containing the source event's block: the anchor state is
    /// consistent with the event's own block, but may precede finality
    SameSlot,
    /// The source slot plus a fixed configured offset: a buffer before
    /// finality without waiting out a full sync-committee period
    CloseSlot,
}

/// Resolve the anchor slot for a proof. Pure given the provider's
/// responses; no retries — an unreachable provider propagates as
/// `ProviderError`.
pub async fn select_slot<P: DataProvider + ?Sized>(
    strategy: SlotStrategy,
    source_block_number: u64,
    config: &ChainConfig,
    provider: &P,
) -> ProofResult<u64> {
    let slot = match strategy {
        SlotStrategy::Latest => provider.get_header(HeaderId::Head).await?.slot,
        SlotStrategy::SameSlot => provider.block_to_slot(source_block_number).await?,
        SlotStrategy::CloseSlot => {
            provider.block_to_slot(source_block_number).await? + config.close_slot_offset
        }
    };
    tracing::debug!(?strategy, source_block_number, slot, "selected anchor slot");
    Ok(slot)
}
