//! Wiring for the demonstration deployment: CLI parsing and layered
//! configuration around the in-memory backend and the mock deposit
//! provider.

mod cli;
mod config;

pub use cli::{Cli, Mint};
pub use config::{AppConfig, MockProviderConfig};
