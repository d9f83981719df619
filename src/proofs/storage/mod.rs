pub mod bundle;
pub mod decode;
pub mod generator;

pub use bundle::{StorageProofBundle, StorageProofFixture};
pub use decode::{decode_account, AccountState};
pub use generator::{build_storage_proof, verify_storage_bundle};
