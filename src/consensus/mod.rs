pub mod certify;
pub mod commitment;
pub mod fixture;
pub mod ssz;

// Re-export the certification API
pub use certify::{certify, Certification};
pub use commitment::{compute_bit_sum, poseidon_committee_commitment};
pub use fixture::{build_light_client_fixture, LightClientFixture};
