// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use anyhow::{Context, Result};
use ethereum_types::H160;
use url::Url;

use amb_proofs::client::RpcProvider;
use amb_proofs::config::ChainConfig;
use amb_proofs::consensus::{build_light_client_fixture, certify};
use amb_proofs::proofs::common::evm::storage_slot_for_nonce;
use amb_proofs::proofs::receipt::find_sent_message;
use amb_proofs::prover::{CircuitPaths, RapidsnarkProver};
use amb_proofs::provider::{BlockId, DataProvider, UpdateId};
use amb_proofs::{build_receipt_proof, build_storage_proof, SlotStrategy};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    match args[1].as_str() {
        "storage" => handle_storage(args).await,
        "event" => handle_event(args).await,
        "lightclient" => handle_lightclient(args).await,
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("Usage:");
    println!("  cargo run -- storage <execution_rpc> <consensus_rpc> <functions_rpc> <contract> <block>");
    println!("  cargo run -- event <execution_rpc> <consensus_rpc> <functions_rpc> <contract> <block> [latest|same-slot|close-slot]");
    println!("  cargo run -- lightclient <consensus_rpc> <step_witness> <rotate_witness> <prover_exe> <step_zkey> <rotate_zkey> <work_dir>");
}

fn provider_from_args(args: &[String], config: &ChainConfig) -> Result<RpcProvider> {
    Ok(RpcProvider::new(
        Url::parse(&args[2]).context("bad execution rpc url")?,
        Url::parse(&args[3]).context("bad consensus rpc url")?,
        Url::parse(&args[4]).context("bad functions rpc url")?,
        None,
        config.clone(),
    ))
}

async fn handle_storage(args: Vec<String>) -> Result<()> {
    if args.len() < 7 {
        print_usage();
        return Ok(());
    }
    let config = ChainConfig::default();
    let provider = provider_from_args(&args, &config)?;
    let contract: H160 = args[5].parse().context("bad contract address")?;
    let block: u64 = args[6].parse().context("bad block number")?;

    let receipts = provider.get_receipts(BlockId::Number(block)).await?;
    let message = find_sent_message(&receipts, &config, contract, block)?;
    let slot_key = storage_slot_for_nonce(message.nonce, config.messages_slot);
    let nonce = message.nonce;

    let bundle = build_storage_proof(&provider, message, slot_key, block).await?;
    let fixture = bundle.fixture();

    let file = PathBuf::from(format!("storageProof{nonce}.json"));
    std::fs::write(&file, serde_json::to_string_pretty(&fixture)?)?;
    println!("generated storage proof fixture at {}", file.display());
    Ok(())
}

async fn handle_event(args: Vec<String>) -> Result<()> {
    if args.len() < 7 {
        print_usage();
        return Ok(());
    }
    let config = ChainConfig::default();
    let provider = provider_from_args(&args, &config)?;
    let contract: H160 = args[5].parse().context("bad contract address")?;
    let block: u64 = args[6].parse().context("bad block number")?;
    let strategy = match args.get(7).map(String::as_str) {
        None | Some("close-slot") => SlotStrategy::CloseSlot,
        Some("latest") => SlotStrategy::Latest,
        Some("same-slot") => SlotStrategy::SameSlot,
        Some(other) => anyhow::bail!("unknown slot strategy: {other}"),
    };

    let receipts = provider.get_receipts(BlockId::Number(block)).await?;
    let message = find_sent_message(&receipts, &config, contract, block)?;
    let nonce = message.nonce;

    let bundle = build_receipt_proof(&provider, &config, &message, strategy).await?;
    let fixture = bundle.fixture();

    let file = PathBuf::from(format!("eventProof{nonce}.json"));
    std::fs::write(&file, serde_json::to_string_pretty(&fixture)?)?;
    println!("generated event proof fixture at {}", file.display());
    Ok(())
}

async fn handle_lightclient(args: Vec<String>) -> Result<()> {
    if args.len() < 9 {
        print_usage();
        return Ok(());
    }
    let config = ChainConfig::default();
    let consensus = Url::parse(&args[2]).context("bad consensus rpc url")?;
    let provider = RpcProvider::new(
        consensus.clone(),
        consensus.clone(),
        consensus,
        None,
        config.clone(),
    );
    let work_dir = PathBuf::from(&args[8]);

    let update = provider.get_update(UpdateId::Finalized).await?;
    let certification = certify(&update)?;
    println!("Attested Slot: {}", update.attested_header.slot);
    println!("Finalized Slot: {}", update.finalized_header.slot);
    println!("Participation: {}", certification.participation);
    println!(
        "Finalized Header Root: {:?}",
        certification.finalized_header_root
    );
    println!(
        "Next Sync Committee SSZ: {:?}",
        certification.next_committee_ssz_root
    );
    println!(
        "Next Sync Committee Poseidon: {}",
        certification.next_committee_commitment
    );

    // The circuits share the prover binary; witness generators and
    // proving keys are per circuit.
    let prover = RapidsnarkProver {
        step: CircuitPaths {
            witness_executable: PathBuf::from(&args[3]),
            proving_key: PathBuf::from(&args[6]),
        },
        rotate: CircuitPaths {
            witness_executable: PathBuf::from(&args[4]),
            proving_key: PathBuf::from(&args[7]),
        },
        prover_executable: PathBuf::from(&args[5]),
        work_dir,
    };

    let Some(fixture) =
        build_light_client_fixture(&update, &certification, &prover, &config).await?
    else {
        println!("skipping fixture generation due to low participation");
        return Ok(());
    };

    let file = PathBuf::from(format!("slot{}.json", update.attested_header.slot));
    std::fs::write(&file, serde_json::to_string_pretty(&fixture)?)?;
    println!("generated fixture at {}", file.display());
    Ok(())
}
