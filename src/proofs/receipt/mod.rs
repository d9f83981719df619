pub mod bundle;
pub mod encode;
pub mod generator;

pub use bundle::{EventProofFixture, ReceiptProofBundle};
pub use encode::encode_receipt;
pub use generator::{build_receipt_proof, find_sent_message};
