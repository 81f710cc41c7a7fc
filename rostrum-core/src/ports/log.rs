use crate::models::{AdminAction, AuctionId};
use std::future::Future;

/// Repository interface for the append-only moderation audit log.
pub trait AdminLogRepository: super::DepositRepository {
    /// Append one audit entry. Entries are write-once and never deleted.
    fn append_action(
        &self,
        auction_id: AuctionId,
        action: &AdminAction,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// The most recent `limit` entries for an auction, oldest first.
    fn list_actions(
        &self,
        auction_id: AuctionId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<AdminAction>, Self::Error>> + Send;
}
