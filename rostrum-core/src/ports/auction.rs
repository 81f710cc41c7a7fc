use crate::models::{Auction, AuctionData, AuctionId};
use std::future::Future;
use time::OffsetDateTime;

/// Repository interface for auction records.
///
/// The stored record is a write-behind copy of the state owned by the
/// auction's serialized decision context; reads of it are advisory
/// (snapshots, optimistic pre-checks), never authoritative.
pub trait AuctionRepository: super::Repository {
    /// Persist a newly scheduled auction and return its record.
    fn create_auction(
        &self,
        data: AuctionData,
        as_of: OffsetDateTime,
    ) -> impl Future<Output = Result<Auction, Self::Error>> + Send;

    /// Fetch an auction by id.
    fn get_auction(
        &self,
        auction_id: AuctionId,
    ) -> impl Future<Output = Result<Option<Auction>, Self::Error>> + Send;

    /// Overwrite the stored record with the decision context's current state.
    fn update_auction(
        &self,
        auction: &Auction,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
