// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// Per-chain and per-contract constants consumed by the proof pipeline.
///
/// The source deployment hard-coded these; here they are configuration so
/// the same algorithms serve any target chain and contract layout. The
/// defaults are the repository's working values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain id of the source (execution) chain
    pub chain_id: u64,
    /// Unix time of the consensus genesis, used to map blocks to slots
    pub genesis_time: u64,
    /// Seconds per consensus slot
    pub seconds_per_slot: u64,
    /// Slots per sync-committee period
    pub slots_per_period: u64,
    /// Slot offset added by the close-slot anchoring strategy, a buffer
    /// before finality without waiting a full period
    pub close_slot_offset: u64,
    /// Minimum attesting-validator count before an update is certified
    /// into a fixture
    pub finality_threshold: u64,
    /// Storage slot of the source contract's message mapping; must match
    /// the contract's storage layout
    pub messages_slot: u64,
    /// Signature of the message event emitted by the source contract
    pub event_signature: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 5,
            genesis_time: 1_616_508_000,
            seconds_per_slot: 12,
            slots_per_period: 8192,
            close_slot_offset: 200,
            finality_threshold: 350,
            messages_slot: 0,
            event_signature: "SentMessage(uint64,bytes32,bytes)".to_string(),
        }
    }
}

impl ChainConfig {
    /// Sync-committee period containing a slot
    pub fn period_of(&self, slot: u64) -> u64 {
        slot / self.slots_per_period
    }
}
