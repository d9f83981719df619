// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use ethereum_types::{H160, H256};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::Duration;
use url::Url;

use crate::config::ChainConfig;
use crate::consensus::ssz::hash_tree_root_header;
use crate::provider::{BlockId, DataProvider, HeaderId, ProviderError, UpdateId};
use crate::types::{
    serde_hex, string_u64, BeaconBlockRoots, BeaconHeader, ConsensusUpdate, EthProofResponse,
    ExecutionBlock, PublicKey, SyncAggregate, SyncCommittee, TxReceipt,
};

/// Request timeout of the RPC client
const DEFAULT_REQ_TIMEOUT: Duration = Duration::from_secs(250);

/// HTTP data provider: Ethereum JSON-RPC for the execution chain, the
/// beacon REST API for consensus data, and a proof-helper service for the
/// block/slot index and block field roots.
#[derive(Clone)]
pub struct RpcProvider {
    http_client: reqwest::Client,
    execution_url: Url,
    consensus_url: Url,
    functions_url: Url,
    bearer_token: Option<String>,
    config: ChainConfig,
}

impl RpcProvider {
    /// Creates a new provider that sends requests to the given endpoints
    pub fn new(
        execution_url: Url,
        consensus_url: Url,
        functions_url: Url,
        bearer_token: Option<&str>,
        config: ChainConfig,
    ) -> Self {
        Self {
            http_client: reqwest::Client::default(),
            execution_url,
            consensus_url,
            functions_url,
            bearer_token: bearer_token.map(String::from),
            config,
        }
    }

    /// Make a generic execution JSON-RPC request
    pub async fn rpc_request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ProviderError> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let mut builder = self
            .http_client
            .post(self.execution_url.as_str())
            .json(&request_body)
            .timeout(DEFAULT_REQ_TIMEOUT);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::with_source(format!("{method} request failed"), e.into()))?;
        let response_body = response
            .text()
            .await
            .map_err(|e| ProviderError::with_source(format!("{method} body read failed"), e.into()))?;
        tracing::debug!("{} raw response: {}", method, response_body);

        let value: Value = serde_json::from_str(&response_body)
            .map_err(|e| ProviderError::with_source(format!("{method} returned bad JSON"), e.into()))?;

        if let Some(result) = value.get("result") {
            serde_json::from_value(result.clone()).map_err(|e| {
                ProviderError::with_source(format!("{method} result shape mismatch"), e.into())
            })
        } else if let Some(error) = value.get("error") {
            let error_msg = error
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");
            Err(ProviderError::new(format!("{method} RPC error: {error_msg}")))
        } else {
            Err(ProviderError::new(format!(
                "{method} response has neither result nor error"
            )))
        }
    }

    /// GET a beacon REST route and unwrap its `data` envelope
    async fn beacon_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        #[derive(Deserialize)]
        struct Envelope<T> {
            data: T,
        }
        let envelope: Envelope<T> = self.get_json(&self.consensus_url, path).await?;
        Ok(envelope.data)
    }

    /// GET a proof-helper service route
    async fn functions_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        self.get_json(&self.functions_url, path).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        base: &Url,
        path: &str,
    ) -> Result<T, ProviderError> {
        let url = base
            .join(path)
            .map_err(|e| ProviderError::with_source(format!("bad url {path}"), e.into()))?;
        let response = self
            .http_client
            .get(url.clone())
            .timeout(DEFAULT_REQ_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::with_source(format!("GET {url} failed"), e.into()))?;
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::with_source(format!("GET {url} body read failed"), e.into()))?;
        tracing::debug!("GET {} raw response: {}", url, body);
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::with_source(format!("GET {url} shape mismatch"), e.into()))
    }

    /// Resolve a block id to an execution JSON-RPC block tag
    async fn block_tag(&self, id: BlockId) -> Result<String, ProviderError> {
        Ok(match id {
            BlockId::Number(n) => format!("0x{n:x}"),
            BlockId::Latest => "latest".to_string(),
            BlockId::Slot(slot) => {
                let number: u64 = self
                    .functions_get(&format!(
                        "api/slotToBlock/{}/{}",
                        self.config.chain_id, slot
                    ))
                    .await?;
                format!("0x{number:x}")
            }
        })
    }
}

#[async_trait]
impl DataProvider for RpcProvider {
    async fn get_block(&self, id: BlockId) -> Result<ExecutionBlock, ProviderError> {
        let tag = self.block_tag(id).await?;
        let block: Option<ExecutionBlock> = self
            .rpc_request("eth_getBlockByNumber", json!([tag, false]))
            .await?;
        block.ok_or_else(|| ProviderError::new(format!("no block at {tag}")))
    }

    async fn get_receipts(&self, id: BlockId) -> Result<Vec<TxReceipt>, ProviderError> {
        let tag = self.block_tag(id).await?;
        self.rpc_request("eth_getBlockReceipts", json!([tag])).await
    }

    async fn get_proof(
        &self,
        address: H160,
        keys: &[H256],
        block: BlockId,
    ) -> Result<EthProofResponse, ProviderError> {
        let tag = self.block_tag(block).await?;
        self.rpc_request("eth_getProof", json!([address, keys, tag]))
            .await
    }

    async fn get_header(&self, id: HeaderId) -> Result<BeaconHeader, ProviderError> {
        let tag = match id {
            HeaderId::Head => "head".to_string(),
            HeaderId::Finalized => "finalized".to_string(),
            HeaderId::Slot(slot) => slot.to_string(),
        };
        let data: RestHeaderData = self
            .beacon_get(&format!("eth/v1/beacon/headers/{tag}"))
            .await?;
        Ok(data.header.message.into())
    }

    async fn get_block_roots(&self, slot: u64) -> Result<BeaconBlockRoots, ProviderError> {
        self.functions_get(&format!("api/blockRoots/{}/{}", self.config.chain_id, slot))
            .await
    }

    async fn block_to_slot(&self, block_number: u64) -> Result<u64, ProviderError> {
        self.functions_get(&format!(
            "api/blockToSlot/{}/{}",
            self.config.chain_id, block_number
        ))
        .await
    }

    async fn get_update(&self, id: UpdateId) -> Result<ConsensusUpdate, ProviderError> {
        let genesis: RestGenesis = self.beacon_get("eth/v1/beacon/genesis").await?;

        // Period updates carry the attested/finalized headers, the next
        // committee, and the aggregate; the current committee comes from
        // the bootstrap route at the finalized header root.
        let update = match id {
            UpdateId::Period(period) => self.light_client_update(period).await?,
            UpdateId::Finalized => {
                let finality: RestFinalityUpdate = self
                    .beacon_get("eth/v1/beacon/light_client/finality_update")
                    .await?;
                let period = self.config.period_of(finality.attested_header.beacon.slot);
                let mut update = self.light_client_update(period).await?;
                // Prefer the fresher finality headers over the period update's.
                update.attested_header = finality.attested_header;
                update.finalized_header = finality.finalized_header;
                update.sync_aggregate = finality.sync_aggregate;
                update
            }
        };

        let finalized_root =
            hash_tree_root_header(&BeaconHeader::from(update.finalized_header.beacon.clone()));
        let bootstrap: RestBootstrap = self
            .beacon_get(&format!(
                "eth/v1/beacon/light_client/bootstrap/{finalized_root:?}"
            ))
            .await?;

        Ok(ConsensusUpdate {
            attested_header: update.attested_header.beacon.into(),
            finalized_header: update.finalized_header.beacon.clone().into(),
            genesis_validators_root: genesis.genesis_validators_root,
            genesis_time: genesis.genesis_time,
            current_sync_committee: bootstrap.current_sync_committee.into(),
            next_sync_committee: update.next_sync_committee.into(),
            sync_aggregate: SyncAggregate {
                sync_committee_bits: update.sync_aggregate.sync_committee_bits,
                sync_committee_signature: update.sync_aggregate.sync_committee_signature,
            },
            execution_state_root: update.finalized_header.execution.state_root,
        })
    }
}

impl RpcProvider {
    async fn light_client_update(&self, period: u64) -> Result<RestUpdate, ProviderError> {
        let versioned: Vec<RestVersioned<RestUpdate>> = self
            .get_json(
                &self.consensus_url,
                &format!("eth/v1/beacon/light_client/updates?start_period={period}&count=1"),
            )
            .await?;
        versioned
            .into_iter()
            .next()
            .map(|v| v.data)
            .ok_or_else(|| ProviderError::new(format!("no light client update for period {period}")))
    }
}

// --- Beacon REST wire shapes (snake_case, decimal-string integers) ---

#[derive(Deserialize)]
struct RestVersioned<T> {
    data: T,
}

#[derive(Deserialize)]
struct RestHeaderData {
    header: RestSignedHeader,
}

#[derive(Deserialize)]
struct RestSignedHeader {
    message: RestHeader,
}

#[derive(Clone, Deserialize)]
struct RestHeader {
    #[serde(with = "string_u64")]
    slot: u64,
    #[serde(with = "string_u64")]
    proposer_index: u64,
    parent_root: H256,
    state_root: H256,
    body_root: H256,
}

impl From<RestHeader> for BeaconHeader {
    fn from(h: RestHeader) -> Self {
        BeaconHeader {
            slot: h.slot,
            proposer_index: h.proposer_index,
            parent_root: h.parent_root,
            state_root: h.state_root,
            body_root: h.body_root,
        }
    }
}

#[derive(Clone, Deserialize)]
struct RestHeaderWithExecution {
    beacon: RestHeader,
    execution: RestExecutionHeader,
}

#[derive(Clone, Deserialize)]
struct RestExecutionHeader {
    state_root: H256,
}

#[derive(Deserialize)]
struct RestCommittee {
    pubkeys: Vec<PublicKey>,
    aggregate_pubkey: PublicKey,
}

impl From<RestCommittee> for SyncCommittee {
    fn from(c: RestCommittee) -> Self {
        SyncCommittee {
            pubkeys: c.pubkeys,
            aggregate_pubkey: c.aggregate_pubkey,
        }
    }
}

#[derive(Deserialize)]
struct RestSyncAggregate {
    #[serde(with = "serde_hex")]
    sync_committee_bits: Vec<u8>,
    #[serde(with = "serde_hex")]
    sync_committee_signature: Vec<u8>,
}

#[derive(Deserialize)]
struct RestFinalityUpdate {
    attested_header: RestHeaderWithExecution,
    finalized_header: RestHeaderWithExecution,
    sync_aggregate: RestSyncAggregate,
}

#[derive(Deserialize)]
struct RestUpdate {
    attested_header: RestHeaderWithExecution,
    next_sync_committee: RestCommittee,
    finalized_header: RestHeaderWithExecution,
    sync_aggregate: RestSyncAggregate,
}

#[derive(Deserialize)]
struct RestBootstrap {
    current_sync_committee: RestCommittee,
}

#[derive(Deserialize)]
struct RestGenesis {
    #[serde(with = "string_u64")]
    genesis_time: u64,
    genesis_validators_root: H256,
}
