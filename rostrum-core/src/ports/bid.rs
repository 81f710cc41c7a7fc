use crate::models::{AuctionId, Bid, BidId, BidderId};
use std::future::Future;
use time::OffsetDateTime;

/// The result of an idempotent bid insert.
#[derive(Clone, Debug, PartialEq)]
pub enum BidInsert {
    /// A new bid record was created
    Created(Bid),
    /// A bid with this `(auction_id, idempotency_key)` already existed;
    /// it is returned unchanged and nothing was written
    Existing(Bid),
}

impl BidInsert {
    /// The bid record, whether fresh or pre-existing.
    pub fn into_bid(self) -> Bid {
        match self {
            BidInsert::Created(bid) => bid,
            BidInsert::Existing(bid) => bid,
        }
    }
}

/// Repository interface for bid records.
pub trait BidRepository: super::AuctionRepository {
    /// Record a new pending bid, unless one already exists for this
    /// `(auction_id, idempotency_key)`.
    ///
    /// This is the replay-safety primitive: the check-and-insert MUST be
    /// atomic with respect to concurrent calls carrying the same key, so a
    /// double-click or reconnect retry can never produce two bid records.
    fn create_bid(
        &self,
        auction_id: AuctionId,
        bidder_id: BidderId,
        amount_cents: i64,
        idempotency_key: &str,
        as_of: OffsetDateTime,
    ) -> impl Future<Output = Result<BidInsert, Self::Error>> + Send;

    /// Look up a bid by its replay key. Submission consults this before any
    /// validation: a replayed request must resolve to the existing record
    /// unchanged, with no fresh eligibility or price checks.
    fn find_bid(
        &self,
        auction_id: AuctionId,
        idempotency_key: &str,
    ) -> impl Future<Output = Result<Option<Bid>, Self::Error>> + Send;

    /// Fetch a bid by id.
    fn get_bid(
        &self,
        bid_id: BidId,
    ) -> impl Future<Output = Result<Option<Bid>, Self::Error>> + Send;

    /// Overwrite a bid record after a decision. Decided bids are immutable
    /// in the domain; this exists for the pending → terminal transition
    /// written back by the decision context.
    fn update_bid(&self, bid: &Bid) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// All bids recorded against an auction, in submission order. Used to
    /// restore a room's decision context after a restart.
    fn list_bids(
        &self,
        auction_id: AuctionId,
    ) -> impl Future<Output = Result<Vec<Bid>, Self::Error>> + Send;
}
