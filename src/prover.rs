// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

/// The zk circuits the pipeline can request proofs for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitKind {
    /// Attests a finalized header under the current committee
    Step,
    /// Attests the next committee's commitments
    Rotate,
}

impl CircuitKind {
    fn name(&self) -> &'static str {
        match self {
            CircuitKind::Step => "step",
            CircuitKind::Rotate => "rotate",
        }
    }
}

/// A Groth16 proof, decimal-string encoded the way fixture consumers
/// decode it positionally
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Groth16Proof {
    pub a: [String; 2],
    pub b: [[String; 2]; 2],
    pub c: [String; 2],
}

/// A proof together with its public inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofWithInputs {
    pub proof: Groth16Proof,
    pub public_inputs: Vec<String>,
}

/// Opaque proving oracle. The constraint systems behind it are a separate
/// system; the pipeline only fixes this input/output contract.
#[async_trait]
pub trait ProvingOracle: Send + Sync {
    async fn prove(&self, circuit: CircuitKind, input: serde_json::Value)
        -> Result<ProofWithInputs>;
}

/// Paths to one circuit's witness generator and proving key
#[derive(Debug, Clone)]
pub struct CircuitPaths {
    pub witness_executable: PathBuf,
    pub proving_key: PathBuf,
}

/// Proving oracle backed by circom witness generators and the rapidsnark
/// prover, invoked as external executables.
pub struct RapidsnarkProver {
    pub step: CircuitPaths,
    pub rotate: CircuitPaths,
    pub prover_executable: PathBuf,
    /// Directory for witness/proof intermediates
    pub work_dir: PathBuf,
}

// rapidsnark emits proofs in the snarkjs JSON layout, with projective
// coordinates we drop when flattening to the fixture shape.
#[derive(Deserialize)]
struct SnarkJsProof {
    pi_a: Vec<String>,
    pi_b: Vec<Vec<String>>,
    pi_c: Vec<String>,
}

#[async_trait]
impl ProvingOracle for RapidsnarkProver {
    async fn prove(
        &self,
        circuit: CircuitKind,
        input: serde_json::Value,
    ) -> Result<ProofWithInputs> {
        let name = circuit.name();
        let paths = match circuit {
            CircuitKind::Step => &self.step,
            CircuitKind::Rotate => &self.rotate,
        };
        let input_path = self.work_dir.join(format!("{name}_input.json"));
        let witness_path = self.work_dir.join(format!("{name}.wtns"));
        let proof_path = self.work_dir.join(format!("{name}_proof.json"));
        let public_path = self.work_dir.join(format!("{name}_public.json"));

        std::fs::write(&input_path, serde_json::to_vec(&input)?)
            .with_context(|| format!("writing circuit input {}", input_path.display()))?;

        tracing::info!("calculating {name} witness");
        let status = Command::new(&paths.witness_executable)
            .arg(&input_path)
            .arg(&witness_path)
            .status()
            .await
            .context("spawning witness generator")?;
        if !status.success() {
            bail!("witness generator exited with {status}");
        }

        tracing::info!("proving {name} circuit");
        let status = Command::new(&self.prover_executable)
            .arg(&paths.proving_key)
            .arg(&witness_path)
            .arg(&proof_path)
            .arg(&public_path)
            .status()
            .await
            .context("spawning prover")?;
        if !status.success() {
            bail!("prover exited with {status}");
        }

        let raw: SnarkJsProof = serde_json::from_slice(
            &std::fs::read(&proof_path).context("reading proof output")?,
        )?;
        let public_inputs: Vec<String> = serde_json::from_slice(
            &std::fs::read(&public_path).context("reading public inputs")?,
        )?;

        Ok(ProofWithInputs {
            proof: flatten_proof(raw)?,
            public_inputs,
        })
    }
}

/// Proving oracle that returns fixed placeholder proofs, for exercising
/// the pipeline without circuit binaries.
pub struct StubProver;

#[async_trait]
impl ProvingOracle for StubProver {
    async fn prove(
        &self,
        _circuit: CircuitKind,
        input: serde_json::Value,
    ) -> Result<ProofWithInputs> {
        let zero = || "0".to_string();
        Ok(ProofWithInputs {
            proof: Groth16Proof {
                a: [zero(), zero()],
                b: [[zero(), zero()], [zero(), zero()]],
                c: [zero(), zero()],
            },
            public_inputs: vec![input.to_string()],
        })
    }
}

// --- Helper Functions ---

fn flatten_proof(raw: SnarkJsProof) -> Result<Groth16Proof> {
    let pair = |v: &[String], what: &str| -> Result<[String; 2]> {
        if v.len() < 2 {
            bail!("{what} has {} coordinates, expected at least 2", v.len());
        }
        Ok([v[0].clone(), v[1].clone()])
    };
    if raw.pi_b.len() < 2 {
        bail!("pi_b has {} rows, expected at least 2", raw.pi_b.len());
    }
    Ok(Groth16Proof {
        a: pair(&raw.pi_a, "pi_a")?,
        b: [pair(&raw.pi_b[0], "pi_b[0]")?, pair(&raw.pi_b[1], "pi_b[1]")?],
        c: pair(&raw.pi_c, "pi_c")?,
    })
}
