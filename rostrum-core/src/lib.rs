#![warn(missing_docs)]
//! Core domain types and contracts for the rostrum auction room service.
//!
//! An auction room is a single shared price that many concurrent bidders push
//! against, with a human moderator deciding which bids are admitted. This
//! crate holds the parts of that system that do not depend on any transport
//! or storage technology:
//!
//! - [`models`]: the domain entities (auctions, bids, deposits, the admin
//!   audit log, overlay events) and the client-facing error taxonomy.
//! - [`ports`]: the traits a backend must implement (repositories) and the
//!   contract consumed from the external deposit service (the provider).
//! - [`ledger`]: the moderation state machine for one auction room. All
//!   price mutations in the system happen through this type, which is kept
//!   synchronous and allocation-light so its invariants are directly
//!   unit-testable.
//! - [`gate`]: the deposit-eligibility check.
//! - [`retry`]: the shared backoff policy for polling the deposit service.

/// Domain models for the auction room.
///
/// These are primarily data structures with minimal business logic. The
/// moderation rules that mutate them live in [`crate::ledger`].
pub mod models;

/// Interface traits between the domain logic and external adapters.
///
/// Backends (storage) implement the repository traits; the payment side
/// implements [`ports::DepositProvider`]. The server is generic over these,
/// so infrastructure can be swapped without touching the moderation core.
pub mod ports;

pub mod gate;
pub mod ledger;
pub mod retry;
