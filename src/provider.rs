// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use ethereum_types::{H160, H256};
use thiserror::Error;

use crate::types::{
    BeaconBlockRoots, BeaconHeader, ConsensusUpdate, EthProofResponse, ExecutionBlock, TxReceipt,
};

/// Upstream data source failure. The core never retries; the error is
/// surfaced to the caller, which may pick a different slot or strategy.
#[derive(Debug, Error)]
#[error("provider error: {cause}")]
pub struct ProviderError {
    pub cause: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl ProviderError {
    /// Create a provider error
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
            source: None,
        }
    }

    /// Create a provider error with source
    pub fn with_source(cause: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            cause: cause.into(),
            source: Some(source),
        }
    }
}

/// Identifies an execution block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
    /// By execution block number
    Number(u64),
    /// By the consensus slot whose payload carries the block
    Slot(u64),
    /// Chain head
    Latest,
}

/// Identifies a consensus header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderId {
    Head,
    Finalized,
    Slot(u64),
}

/// Identifies a sync-committee-period update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateId {
    Finalized,
    Period(u64),
}

/// Abstract chain data source consumed by the proof builders.
///
/// Implementations are expected to be reliable and synchronous per call;
/// retry and backoff belong to the RPC layer behind this trait, never to
/// the proof pipeline.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Execution block header fields
    async fn get_block(&self, id: BlockId) -> Result<ExecutionBlock, ProviderError>;

    /// All transaction receipts of a block, in transaction order
    async fn get_receipts(&self, id: BlockId) -> Result<Vec<TxReceipt>, ProviderError>;

    /// `eth_getProof` for an account and a set of storage keys
    async fn get_proof(
        &self,
        address: H160,
        keys: &[H256],
        block: BlockId,
    ) -> Result<EthProofResponse, ProviderError>;

    /// Consensus header by slot or tag
    async fn get_header(&self, id: HeaderId) -> Result<BeaconHeader, ProviderError>;

    /// SSZ field roots of the beacon block at a slot, enough to rebuild
    /// the fixed-depth branch from the execution payload into the header
    async fn get_block_roots(&self, slot: u64) -> Result<BeaconBlockRoots, ProviderError>;

    /// Consensus slot containing a given execution block
    async fn block_to_slot(&self, block_number: u64) -> Result<u64, ProviderError>;

    /// Sync-committee-period update
    async fn get_update(&self, id: UpdateId) -> Result<ConsensusUpdate, ProviderError>;
}
