pub mod error;
pub mod evm;

pub use error::{ProofError, ProofResult};
