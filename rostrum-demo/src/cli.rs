//! Command-line interface definition and parsing.
//!
//! This module defines the command-line arguments accepted by the application
//! and provides parsing functionality using the clap crate.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which kind of token to mint.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Mint {
    /// A bidder token
    Bidder,
    /// A moderator token
    Admin,
}

/// Command-line arguments for the auction room demo.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(short, long, env = "APP_CONFIG")]
    pub config: Option<PathBuf>,

    /// The HMAC secret for verification of JWT claims.
    #[arg(short, long, env = "APP_SECRET")]
    pub secret: String,

    /// Mint a token for this deployment's secret and exit.
    #[arg(long, value_enum)]
    pub mint: Option<Mint>,

    /// Display name claim for a minted bidder token.
    #[arg(long, requires = "mint")]
    pub name: Option<String>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn import() -> Result<Self, clap::Error> {
        Self::try_parse()
    }
}
