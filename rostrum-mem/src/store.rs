use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use rostrum_core::models::{
    AdminAction, Auction, AuctionData, AuctionId, AuctionStatus, Bid, BidId, BidStatus, BidderId,
    Deposit, DepositId, DepositStatus,
};
use rostrum_core::ports::{
    AdminLogRepository, AuctionRepository, BidInsert, BidRepository, DepositRepository, Repository,
    RoomRepository,
};

/// The in-memory backend cannot actually fail, but the ports demand an
/// error type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {}

/// An in-memory implementation of the rostrum storage ports.
///
/// Clones share the same underlying maps, so one instance can be handed to
/// the app state and every room's decision context.
#[derive(Clone, Default)]
pub struct MemoryStore {
    auctions: Arc<DashMap<AuctionId, Auction, FxBuildHasher>>,
    bids: Arc<DashMap<BidId, Bid, FxBuildHasher>>,
    // (auction, idempotency key) -> bid; the entry API makes the
    // check-and-insert atomic under concurrent retries
    bids_by_key: Arc<DashMap<(AuctionId, String), BidId, FxBuildHasher>>,
    bid_order: Arc<DashMap<AuctionId, Vec<BidId>, FxBuildHasher>>,
    deposits: Arc<DashMap<DepositId, Deposit, FxBuildHasher>>,
    actions: Arc<DashMap<AuctionId, Vec<AdminAction>, FxBuildHasher>>,
}

impl Repository for MemoryStore {
    type Error = StoreError;
}

impl AuctionRepository for MemoryStore {
    async fn create_auction(
        &self,
        data: AuctionData,
        _as_of: OffsetDateTime,
    ) -> Result<Auction, StoreError> {
        let auction = Auction {
            auction_id: Uuid::new_v4().into(),
            status: AuctionStatus::Scheduled,
            current_price_cents: data.starting_price_cents,
            min_increment_cents: data.min_increment_cents,
            min_deposit_cents: data.min_deposit_cents,
            highest_accepted_bid_id: None,
            ends_at: data.ends_at,
        };
        self.auctions.insert(auction.auction_id, auction.clone());
        Ok(auction)
    }

    async fn get_auction(&self, auction_id: AuctionId) -> Result<Option<Auction>, StoreError> {
        Ok(self.auctions.get(&auction_id).map(|entry| entry.clone()))
    }

    async fn update_auction(&self, auction: &Auction) -> Result<(), StoreError> {
        self.auctions.insert(auction.auction_id, auction.clone());
        Ok(())
    }
}

impl BidRepository for MemoryStore {
    async fn create_bid(
        &self,
        auction_id: AuctionId,
        bidder_id: BidderId,
        amount_cents: i64,
        idempotency_key: &str,
        as_of: OffsetDateTime,
    ) -> Result<BidInsert, StoreError> {
        match self
            .bids_by_key
            .entry((auction_id, idempotency_key.to_owned()))
        {
            dashmap::Entry::Occupied(entry) => {
                let existing = self
                    .bids
                    .get(entry.get())
                    .expect("bid index points at a record")
                    .clone();
                Ok(BidInsert::Existing(existing))
            }
            dashmap::Entry::Vacant(entry) => {
                let bid = Bid {
                    bid_id: Uuid::new_v4().into(),
                    auction_id,
                    bidder_id,
                    amount_cents,
                    idempotency_key: idempotency_key.to_owned(),
                    status: BidStatus::Pending,
                    submitted_at: as_of,
                    decided_at: None,
                    decided_by: None,
                };
                self.bids.insert(bid.bid_id, bid.clone());
                self.bid_order
                    .entry(auction_id)
                    .or_default()
                    .push(bid.bid_id);
                entry.insert(bid.bid_id);
                Ok(BidInsert::Created(bid))
            }
        }
    }

    async fn find_bid(
        &self,
        auction_id: AuctionId,
        idempotency_key: &str,
    ) -> Result<Option<Bid>, StoreError> {
        Ok(self
            .bids_by_key
            .get(&(auction_id, idempotency_key.to_owned()))
            .and_then(|entry| self.bids.get(entry.value()).map(|bid| bid.clone())))
    }

    async fn get_bid(&self, bid_id: BidId) -> Result<Option<Bid>, StoreError> {
        Ok(self.bids.get(&bid_id).map(|entry| entry.clone()))
    }

    async fn update_bid(&self, bid: &Bid) -> Result<(), StoreError> {
        self.bids.insert(bid.bid_id, bid.clone());
        Ok(())
    }

    async fn list_bids(&self, auction_id: AuctionId) -> Result<Vec<Bid>, StoreError> {
        let order = match self.bid_order.get(&auction_id) {
            Some(order) => order.clone(),
            None => return Ok(Vec::new()),
        };
        Ok(order
            .iter()
            .filter_map(|bid_id| self.bids.get(bid_id).map(|entry| entry.clone()))
            .collect())
    }
}

impl DepositRepository for MemoryStore {
    async fn record_deposit(&self, deposit: &Deposit) -> Result<(), StoreError> {
        self.deposits.insert(deposit.deposit_id, deposit.clone());
        Ok(())
    }

    async fn get_deposit(&self, deposit_id: DepositId) -> Result<Option<Deposit>, StoreError> {
        Ok(self.deposits.get(&deposit_id).map(|entry| entry.clone()))
    }

    async fn set_deposit_status(
        &self,
        deposit_id: DepositId,
        status: DepositStatus,
    ) -> Result<Option<Deposit>, StoreError> {
        Ok(self.deposits.get_mut(&deposit_id).map(|mut entry| {
            entry.status = status;
            entry.clone()
        }))
    }

    async fn verified_cover(
        &self,
        user_id: BidderId,
        auction_id: AuctionId,
    ) -> Result<i64, StoreError> {
        Ok(self
            .deposits
            .iter()
            .filter(|entry| {
                entry.user_id == user_id
                    && entry.status == DepositStatus::Verified
                    && entry
                        .auction_id
                        .map(|scoped| scoped == auction_id)
                        .unwrap_or(true)
            })
            .map(|entry| entry.amount_cents)
            .max()
            .unwrap_or(0))
    }
}

impl AdminLogRepository for MemoryStore {
    async fn append_action(
        &self,
        auction_id: AuctionId,
        action: &AdminAction,
    ) -> Result<(), StoreError> {
        self.actions
            .entry(auction_id)
            .or_default()
            .push(action.clone());
        Ok(())
    }

    async fn list_actions(
        &self,
        auction_id: AuctionId,
        limit: usize,
    ) -> Result<Vec<AdminAction>, StoreError> {
        Ok(self
            .actions
            .get(&auction_id)
            .map(|entries| {
                let skip = entries.len().saturating_sub(limit);
                entries[skip..].to_vec()
            })
            .unwrap_or_default())
    }
}

impl RoomRepository for MemoryStore {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_idempotency_key_returns_the_original() {
        let store = MemoryStore::default();
        let now = OffsetDateTime::now_utc();
        let auction = store
            .create_auction(
                AuctionData {
                    starting_price_cents: 10_000,
                    min_increment_cents: 100,
                    min_deposit_cents: None,
                    ends_at: None,
                },
                now,
            )
            .await
            .unwrap();

        let bidder: BidderId = Uuid::new_v4().into();
        let first = store
            .create_bid(auction.auction_id, bidder, 12_000, "a-1", now)
            .await
            .unwrap();
        let BidInsert::Created(first) = first else {
            panic!("expected a fresh record");
        };

        let second = store
            .create_bid(auction.auction_id, bidder, 12_000, "a-1", now)
            .await
            .unwrap();
        let BidInsert::Existing(second) = second else {
            panic!("expected the existing record");
        };

        assert_eq!(first.bid_id, second.bid_id);
        assert_eq!(store.list_bids(auction.auction_id).await.unwrap().len(), 1);

        // the same key in a different auction is a different bid
        let other = store
            .create_auction(
                AuctionData {
                    starting_price_cents: 0,
                    min_increment_cents: 100,
                    min_deposit_cents: None,
                    ends_at: None,
                },
                now,
            )
            .await
            .unwrap();
        let third = store
            .create_bid(other.auction_id, bidder, 500, "a-1", now)
            .await
            .unwrap();
        assert!(matches!(third, BidInsert::Created(_)));
    }

    #[tokio::test]
    async fn verified_cover_prefers_the_largest_applicable_deposit() {
        let store = MemoryStore::default();
        let user: BidderId = Uuid::new_v4().into();
        let auction: AuctionId = Uuid::new_v4().into();
        let elsewhere: AuctionId = Uuid::new_v4().into();

        for (amount, scope, status) in [
            (4_000, Some(auction), DepositStatus::Verified),
            (9_000, None, DepositStatus::Verified),
            (20_000, Some(elsewhere), DepositStatus::Verified),
            (50_000, Some(auction), DepositStatus::Pending),
        ] {
            store
                .record_deposit(&Deposit {
                    deposit_id: Uuid::new_v4().into(),
                    user_id: user,
                    auction_id: scope,
                    amount_cents: amount,
                    status,
                })
                .await
                .unwrap();
        }

        // the wallet-wide 9_000 wins; other-auction and pending deposits
        // do not count
        assert_eq!(store.verified_cover(user, auction).await.unwrap(), 9_000);

        let stranger: BidderId = Uuid::new_v4().into();
        assert_eq!(store.verified_cover(stranger, auction).await.unwrap(), 0);
    }
}
