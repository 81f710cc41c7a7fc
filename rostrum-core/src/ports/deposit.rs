use crate::models::{AuctionId, BidderId, Deposit, DepositId, DepositStatus};
use std::future::Future;

/// Repository interface for deposit records.
///
/// Deposits are owned by the external deposit service; this system records
/// what the service reports and reads those records for eligibility checks.
/// Nothing on the moderation path ever writes a deposit.
pub trait DepositRepository: super::BidRepository {
    /// Record a deposit as reported by the provider (initially `Pending`).
    fn record_deposit(
        &self,
        deposit: &Deposit,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Fetch a deposit by id.
    fn get_deposit(
        &self,
        deposit_id: DepositId,
    ) -> impl Future<Output = Result<Option<Deposit>, Self::Error>> + Send;

    /// Apply a provider-reported status transition and return the updated
    /// record, or `None` if the deposit is unknown.
    fn set_deposit_status(
        &self,
        deposit_id: DepositId,
        status: DepositStatus,
    ) -> impl Future<Output = Result<Option<Deposit>, Self::Error>> + Send;

    /// The largest verified deposit usable for this auction: the maximum
    /// over the bidder's verified deposits earmarked for `auction_id` and
    /// their verified wallet-wide deposits. Zero if there are none.
    fn verified_cover(
        &self,
        user_id: BidderId,
        auction_id: AuctionId,
    ) -> impl Future<Output = Result<i64, Self::Error>> + Send;
}
