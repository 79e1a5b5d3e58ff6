//! Simulated collaborators for running without a real exchange or custody
//! provider: paper order client, paper accounts, and price sources.

pub mod account;
pub mod client;
pub mod prices;

pub use account::PaperAccountProvider;
pub use client::PaperClient;
pub use prices::{SimulatedPriceSource, StaticPriceSource};
