// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

pub mod client;
pub mod config;
pub mod consensus;
pub mod proofs;
pub mod prover;
pub mod provider;
pub mod types;

// Re-export main functions
pub use consensus::{build_light_client_fixture, certify, Certification, LightClientFixture};
pub use proofs::receipt::{build_receipt_proof, find_sent_message, ReceiptProofBundle};
pub use proofs::slot::{select_slot, SlotStrategy};
pub use proofs::storage::{build_storage_proof, StorageProofBundle};
pub use proofs::{ProofBundle, ProofError, ProofResult};
