use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use utoipa::ToSchema;

use super::{AuctionId, BidId, BidderId};

/// Lifecycle state of an auction room.
///
/// The only legal transitions are `Scheduled → Live → Ended`; `Ended` is
/// terminal. Bids may be decided only while the auction is `Live`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    /// Created but not yet open for bidding
    Scheduled,
    /// Open: bids may be submitted and decided
    Live,
    /// Closed: the winner (if any) is fixed
    Ended,
}

/// The mutable state of a single auction.
///
/// Owned exclusively by the auction's serialized decision context; nothing
/// else in the system writes `current_price_cents` or
/// `highest_accepted_bid_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Auction {
    /// Unique id of the auction
    pub auction_id: AuctionId,

    /// Current lifecycle state
    pub status: AuctionStatus,

    /// The standing price. Starts at the listing price and only ever
    /// increases, and only as the result of an accept or override decision.
    pub current_price_cents: i64,

    /// Suggested minimum step over the standing price, for display and
    /// client-side validation. Admission itself only requires a strict
    /// improvement on the standing price.
    pub min_increment_cents: i64,

    /// If set, bidders must hold a verified deposit of at least this amount
    /// (auction-scoped or wallet-wide) before their bids are admitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_deposit_cents: Option<i64>,

    /// The bid currently holding the standing price, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_accepted_bid_id: Option<BidId>,

    /// Optional deadline after which the room closes automatically
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub ends_at: Option<OffsetDateTime>,
}

/// The payload required to schedule a new auction.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AuctionData {
    /// The opening price of the lot
    pub starting_price_cents: i64,

    /// Suggested minimum step over the standing price
    pub min_increment_cents: i64,

    /// Deposit requirement for bidder eligibility, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_deposit_cents: Option<i64>,

    /// Optional deadline after which the room closes automatically
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub ends_at: Option<OffsetDateTime>,
}

impl AuctionData {
    /// Check the payload for internally inconsistent values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.starting_price_cents < 0 {
            return Err(ValidationError::NegativePrice);
        }
        if self.min_increment_cents <= 0 {
            return Err(ValidationError::NonPositiveIncrement);
        }
        if matches!(self.min_deposit_cents, Some(min) if min <= 0) {
            return Err(ValidationError::NonPositiveDeposit);
        }
        Ok(())
    }
}

/// An enumeration of the ways auction data may be invalid
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The starting price must be non-negative
    #[error("starting price must be non-negative")]
    NegativePrice,
    /// The minimum increment must be positive
    #[error("minimum increment must be positive")]
    NonPositiveIncrement,
    /// A deposit requirement, if present, must be positive
    #[error("deposit requirement must be positive")]
    NonPositiveDeposit,
}

/// The winning bid of an ended auction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Winner {
    /// The accepted (or overridden) bid that held the standing price at close
    pub bid_id: BidId,
    /// The bidder legally bound by that bid
    pub bidder_id: BidderId,
    /// The binding amount
    pub amount_cents: i64,
}

/// The outcome of an auction.
///
/// An auction that ends without any accepted bid has no winner; that is a
/// valid outcome, not an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuctionResult {
    /// The auction this result belongs to
    pub auction_id: AuctionId,
    /// Lifecycle state at the time of the query
    pub status: AuctionStatus,
    /// The final price (equals the starting price if nothing was accepted)
    pub current_price_cents: i64,
    /// The winning bid, absent if nothing was ever accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
}
