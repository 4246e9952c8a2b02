// lib.rs - Mnemonic Sweep Pipeline Library

pub mod balance;
pub mod config;
pub mod pipeline;
pub mod sampler;
pub mod sink;
pub mod stats;
pub mod wallet;
pub mod wordlist;

// Re-exports for convenience
pub use balance::{BalanceOracle, BalanceStatus, HttpOracle};
pub use config::Config;
pub use pipeline::PhraseOutcome;
pub use sampler::PhraseSampler;
pub use sink::{Match, ResultSink};
pub use stats::Statistics;
pub use wallet::{AddressDeriver, DeriveError};
pub use wordlist::Wordlist;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
