use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use super::{Auction, AuctionId, BidderId};

/// A client's membership in an auction room.
///
/// Establishing membership is idempotent: re-joining a room the client
/// already belongs to returns the existing membership unchanged. Leaving a
/// room removes the membership and nothing else; it never touches auction
/// state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Membership {
    /// The room joined
    pub auction_id: AuctionId,

    /// The joining bidder
    pub bidder_id: BidderId,

    /// When the membership was first established
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,

    /// A snapshot of the room at join time, so the client can render
    /// immediately without waiting for the stream
    pub auction: Auction,
}
