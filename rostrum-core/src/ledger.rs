//! The moderation state machine for one auction room.
//!
//! A [`RoomLedger`] is the single authority over an auction's mutable state:
//! the standing price and the set of pending bids. It is a synchronous,
//! in-memory structure; the serialized execution context that owns it (one
//! per auction) is provided by the server layer. Everything here assumes the
//! caller has already serialized access, which is what makes the invariants
//! simple:
//!
//! - the standing price only ever increases, and only through an accept or
//!   override decision;
//! - every admitted amount strictly exceeds the price as it stood
//!   immediately before the decision;
//! - after an acceptance at price P, no pending bid with amount ≤ P
//!   survives the same step (cascading invalidation).

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use time::OffsetDateTime;

use crate::models::{
    AdminAction, AdminActionKind, Auction, AuctionResult, AuctionStatus, Bid, BidId, BidStatus,
    Decider, Decision, Winner,
};

/// A moderation decision to apply to a pending bid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionAction {
    /// Admit the bid at its submitted amount
    Accept,
    /// Decline the bid
    Reject,
    /// Admit the bid at an adjusted amount
    Override {
        /// The amount that will become the standing price
        amount_cents: i64,
    },
}

/// Why a decision could not be applied.
#[derive(Clone, Debug, PartialEq)]
pub enum DecisionFailure {
    /// The auction is not live
    NotLive,
    /// The bid is unknown, or already decided with a different outcome
    NotPending,
    /// The standing price moved past this bid while it waited. The bid has
    /// been auto-rejected by the system; the updated record is included so
    /// the caller can persist it and notify the submitter.
    Stale(Bid),
    /// The override amount does not beat the standing price. The bid is
    /// left pending.
    TooLow,
}

/// Why a lifecycle transition could not be applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleFailure {
    /// The auction has already ended
    Ended,
    /// The auction has not yet opened
    NotOpen,
}

/// The outcome of registering a submitted bid with the room.
#[derive(Clone, Debug, PartialEq)]
pub enum AdmitOutcome {
    /// The bid is pending a decision (or was already known; re-delivery of
    /// the same bid is a no-op returning the tracked record)
    Admitted(Bid),
    /// The room was no longer live when the bid arrived; it was recorded as
    /// system-rejected so it still reaches a terminal state
    Refused(Bid),
}

/// Settlement data produced by closing a room.
#[derive(Clone, Debug, PartialEq)]
pub struct Closed {
    /// The final outcome
    pub result: AuctionResult,
    /// Bids that were still pending at close, now system-rejected
    pub expired: Vec<Bid>,
}

/// The moderation ledger of one auction room. See the module docs.
#[derive(Clone, Debug)]
pub struct RoomLedger {
    auction: Auction,
    bids: IndexMap<BidId, Bid, FxBuildHasher>,
    keys: FxHashMap<String, BidId>,
}

impl RoomLedger {
    /// Start a ledger for a freshly scheduled auction.
    pub fn new(auction: Auction) -> Self {
        Self::restore(auction, [])
    }

    /// Rebuild a ledger from persisted records, e.g. after a restart.
    pub fn restore(auction: Auction, bids: impl IntoIterator<Item = Bid>) -> Self {
        let bids: IndexMap<BidId, Bid, FxBuildHasher> =
            bids.into_iter().map(|bid| (bid.bid_id, bid)).collect();
        let keys = bids
            .values()
            .map(|bid| (bid.idempotency_key.clone(), bid.bid_id))
            .collect();
        Self {
            auction,
            bids,
            keys,
        }
    }

    /// The auction state as of the last applied operation.
    pub fn auction(&self) -> &Auction {
        &self.auction
    }

    /// Look up a tracked bid.
    pub fn bid(&self, bid_id: BidId) -> Option<&Bid> {
        self.bids.get(&bid_id)
    }

    /// All tracked bids, in admission order.
    pub fn bids(&self) -> impl Iterator<Item = &Bid> {
        self.bids.values()
    }

    /// The bids still awaiting a decision, in admission order.
    pub fn pending(&self) -> impl Iterator<Item = &Bid> {
        self.bids.values().filter(|bid| bid.is_pending())
    }

    /// Open a scheduled room for bidding. Re-opening a live room is a no-op.
    pub fn open(&mut self) -> Result<&Auction, LifecycleFailure> {
        match self.auction.status {
            AuctionStatus::Scheduled => {
                self.auction.status = AuctionStatus::Live;
                Ok(&self.auction)
            }
            AuctionStatus::Live => Ok(&self.auction),
            AuctionStatus::Ended => Err(LifecycleFailure::Ended),
        }
    }

    /// Register a durably recorded bid with the room.
    ///
    /// Re-delivery of a bid the ledger already tracks (by id or by
    /// idempotency key) returns the tracked record unchanged. A bid arriving
    /// after the room stopped being live is refused: recorded as
    /// system-rejected rather than left dangling forever.
    pub fn admit(&mut self, bid: Bid, now: OffsetDateTime) -> AdmitOutcome {
        if let Some(existing) = self.bids.get(&bid.bid_id) {
            return AdmitOutcome::Admitted(existing.clone());
        }
        if let Some(id) = self.keys.get(&bid.idempotency_key) {
            return AdmitOutcome::Admitted(self.bids[id].clone());
        }

        let mut bid = bid;
        let refused = self.auction.status != AuctionStatus::Live;
        if refused {
            bid.status = BidStatus::Rejected;
            bid.decided_at = Some(now);
            bid.decided_by = Some(Decider::System);
        }

        self.keys.insert(bid.idempotency_key.clone(), bid.bid_id);
        self.bids.insert(bid.bid_id, bid.clone());

        if refused {
            AdmitOutcome::Refused(bid)
        } else {
            AdmitOutcome::Admitted(bid)
        }
    }

    /// Apply a moderation decision to a bid.
    ///
    /// Decisions are not idempotent across different outcomes, but
    /// re-issuing the identical prior decision for an already-decided bid is
    /// a no-op success (admin UIs double-click); the returned [`Decision`]
    /// then carries no audit entry.
    pub fn decide(
        &mut self,
        bid_id: BidId,
        action: DecisionAction,
        decided_by: Decider,
        now: OffsetDateTime,
    ) -> Result<Decision, DecisionFailure> {
        if self.auction.status != AuctionStatus::Live {
            return Err(DecisionFailure::NotLive);
        }

        let Some(bid) = self.bids.get(&bid_id) else {
            return Err(DecisionFailure::NotPending);
        };

        if !bid.is_pending() {
            let same = match (action, bid.status) {
                (DecisionAction::Accept, BidStatus::Accepted) => true,
                (DecisionAction::Reject, BidStatus::Rejected) => true,
                (
                    DecisionAction::Override { amount_cents },
                    BidStatus::Overridden { final_amount_cents },
                ) => amount_cents == final_amount_cents,
                _ => false,
            };
            return if same {
                Ok(Decision {
                    bid: bid.clone(),
                    action: None,
                    cascaded: Vec::new(),
                    current_price_cents: self.auction.current_price_cents,
                })
            } else {
                Err(DecisionFailure::NotPending)
            };
        }

        let previous_amount_cents = bid.amount_cents;

        let (status, effective) = match action {
            DecisionAction::Reject => {
                let bid = self.finalize(bid_id, BidStatus::Rejected, decided_by, now);
                return Ok(Decision {
                    bid,
                    action: Some(AdminAction {
                        kind: AdminActionKind::Reject,
                        bid_id,
                        decided_by,
                        previous_amount_cents,
                        new_amount_cents: None,
                        timestamp: now,
                    }),
                    cascaded: Vec::new(),
                    current_price_cents: self.auction.current_price_cents,
                });
            }
            DecisionAction::Accept => {
                if previous_amount_cents <= self.auction.current_price_cents {
                    // Expected race, not an exceptional condition: the price
                    // moved past this bid while it waited.
                    let bid = self.finalize(bid_id, BidStatus::Rejected, Decider::System, now);
                    return Err(DecisionFailure::Stale(bid));
                }
                (BidStatus::Accepted, previous_amount_cents)
            }
            DecisionAction::Override { amount_cents } => {
                if amount_cents <= self.auction.current_price_cents {
                    return Err(DecisionFailure::TooLow);
                }
                (
                    BidStatus::Overridden {
                        final_amount_cents: amount_cents,
                    },
                    amount_cents,
                )
            }
        };

        let bid = self.finalize(bid_id, status, decided_by, now);
        self.auction.current_price_cents = effective;
        self.auction.highest_accepted_bid_id = Some(bid_id);

        let kind = match action {
            DecisionAction::Accept => AdminActionKind::Accept,
            DecisionAction::Override { .. } => AdminActionKind::Override,
            DecisionAction::Reject => unreachable!("handled above"),
        };
        let new_amount_cents = match action {
            DecisionAction::Override { amount_cents } => Some(amount_cents),
            _ => None,
        };

        // Cascading invalidation: no pending bid at or below the new price
        // survives this step.
        let stale: Vec<BidId> = self
            .bids
            .values()
            .filter(|other| other.is_pending() && other.amount_cents <= effective)
            .map(|other| other.bid_id)
            .collect();
        let cascaded = stale
            .into_iter()
            .map(|id| self.finalize(id, BidStatus::Rejected, Decider::System, now))
            .collect();

        Ok(Decision {
            bid,
            action: Some(AdminAction {
                kind,
                bid_id,
                decided_by,
                previous_amount_cents,
                new_amount_cents,
                timestamp: now,
            }),
            cascaded,
            current_price_cents: effective,
        })
    }

    /// Close the room, fixing the outcome.
    ///
    /// Pending bids still open at close are system-rejected in the same
    /// step, so every bid reaches a terminal state. Closing an ended room is
    /// a no-op returning the settled result.
    pub fn close(&mut self, now: OffsetDateTime) -> Result<Closed, LifecycleFailure> {
        match self.auction.status {
            AuctionStatus::Scheduled => Err(LifecycleFailure::NotOpen),
            AuctionStatus::Ended => Ok(Closed {
                result: self.result(),
                expired: Vec::new(),
            }),
            AuctionStatus::Live => {
                self.auction.status = AuctionStatus::Ended;
                let open: Vec<BidId> = self
                    .bids
                    .values()
                    .filter(|bid| bid.is_pending())
                    .map(|bid| bid.bid_id)
                    .collect();
                let expired = open
                    .into_iter()
                    .map(|id| self.finalize(id, BidStatus::Rejected, Decider::System, now))
                    .collect();
                Ok(Closed {
                    result: self.result(),
                    expired,
                })
            }
        }
    }

    /// The room's outcome as of now. Deterministic after close: the winner
    /// is whoever holds `highest_accepted_bid_id`, at the standing price;
    /// absent if nothing was ever accepted.
    pub fn result(&self) -> AuctionResult {
        let winner = self
            .auction
            .highest_accepted_bid_id
            .and_then(|id| self.bids.get(&id))
            .map(|bid| Winner {
                bid_id: bid.bid_id,
                bidder_id: bid.bidder_id,
                amount_cents: bid.effective_amount_cents(),
            });
        AuctionResult {
            auction_id: self.auction.auction_id,
            status: self.auction.status,
            current_price_cents: self.auction.current_price_cents,
            winner,
        }
    }

    fn finalize(
        &mut self,
        bid_id: BidId,
        status: BidStatus,
        decided_by: Decider,
        now: OffsetDateTime,
    ) -> Bid {
        let bid = self
            .bids
            .get_mut(&bid_id)
            .expect("finalize is only called for tracked bids");
        bid.status = status;
        bid.decided_at = Some(now);
        bid.decided_by = Some(decided_by);
        bid.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuctionId, BidderId};
    use uuid::Uuid;

    fn auction(price: i64) -> Auction {
        Auction {
            auction_id: AuctionId::from(Uuid::new_v4()),
            status: AuctionStatus::Live,
            current_price_cents: price,
            min_increment_cents: 100,
            min_deposit_cents: None,
            highest_accepted_bid_id: None,
            ends_at: None,
        }
    }

    fn bid(ledger: &mut RoomLedger, amount: i64, key: &str) -> Bid {
        let now = OffsetDateTime::now_utc();
        let bid = Bid {
            bid_id: BidId::from(Uuid::new_v4()),
            auction_id: ledger.auction().auction_id,
            bidder_id: BidderId::from(Uuid::new_v4()),
            amount_cents: amount,
            idempotency_key: key.to_owned(),
            status: BidStatus::Pending,
            submitted_at: now,
            decided_at: None,
            decided_by: None,
        };
        match ledger.admit(bid, now) {
            AdmitOutcome::Admitted(bid) => bid,
            AdmitOutcome::Refused(bid) => panic!("refused {:?}", bid),
        }
    }

    fn admin() -> Decider {
        Decider::Admin(Uuid::new_v4().into())
    }

    #[test]
    fn accept_raises_the_price_and_cascades() {
        let mut ledger = RoomLedger::new(auction(10_000));
        let low = bid(&mut ledger, 11_000, "low");
        let high = bid(&mut ledger, 12_000, "high");

        let now = OffsetDateTime::now_utc();
        let decision = ledger
            .decide(high.bid_id, DecisionAction::Accept, admin(), now)
            .unwrap();

        assert_eq!(decision.current_price_cents, 12_000);
        assert_eq!(ledger.auction().current_price_cents, 12_000);
        assert_eq!(ledger.auction().highest_accepted_bid_id, Some(high.bid_id));

        // the 11_000 bid no longer beats the price and is system-rejected
        // within the same step
        assert_eq!(decision.cascaded.len(), 1);
        assert_eq!(decision.cascaded[0].bid_id, low.bid_id);
        assert_eq!(decision.cascaded[0].decided_by, Some(Decider::System));
        assert_eq!(ledger.bid(low.bid_id).unwrap().status, BidStatus::Rejected);
        assert_eq!(ledger.pending().count(), 0);
    }

    #[test]
    fn stale_accept_auto_rejects() {
        let mut ledger = RoomLedger::new(auction(10_000));
        let slow = bid(&mut ledger, 11_000, "slow");
        let fast = bid(&mut ledger, 15_000, "fast");

        let now = OffsetDateTime::now_utc();
        ledger
            .decide(fast.bid_id, DecisionAction::Accept, admin(), now)
            .unwrap();

        // `slow` was cascaded away; a fresh pending bid below the price
        // exercises the stale path directly
        let late = bid(&mut ledger, 14_000, "late");
        let failure = ledger
            .decide(late.bid_id, DecisionAction::Accept, admin(), now)
            .unwrap_err();

        let DecisionFailure::Stale(rejected) = failure else {
            panic!("expected stale, got {:?}", failure);
        };
        assert_eq!(rejected.status, BidStatus::Rejected);
        assert_eq!(rejected.decided_by, Some(Decider::System));
        // the price did not move backward
        assert_eq!(ledger.auction().current_price_cents, 15_000);
        assert_eq!(ledger.auction().highest_accepted_bid_id, Some(fast.bid_id));
        let _ = slow;
    }

    #[test]
    fn override_keeps_the_original_amount_for_audit() {
        let mut ledger = RoomLedger::new(auction(10_000));
        let target = bid(&mut ledger, 9_000, "under");

        let now = OffsetDateTime::now_utc();
        let decision = ledger
            .decide(
                target.bid_id,
                DecisionAction::Override {
                    amount_cents: 13_000,
                },
                admin(),
                now,
            )
            .unwrap();

        assert_eq!(
            decision.bid.status,
            BidStatus::Overridden {
                final_amount_cents: 13_000
            }
        );
        assert_eq!(decision.bid.amount_cents, 9_000);
        assert_eq!(decision.bid.effective_amount_cents(), 13_000);

        let action = decision.action.unwrap();
        assert_eq!(action.kind, AdminActionKind::Override);
        assert_eq!(action.previous_amount_cents, 9_000);
        assert_eq!(action.new_amount_cents, Some(13_000));
        assert_eq!(ledger.auction().current_price_cents, 13_000);
    }

    #[test]
    fn override_below_price_leaves_the_bid_pending() {
        let mut ledger = RoomLedger::new(auction(10_000));
        let target = bid(&mut ledger, 9_000, "under");

        let now = OffsetDateTime::now_utc();
        let failure = ledger
            .decide(
                target.bid_id,
                DecisionAction::Override { amount_cents: 9_500 },
                admin(),
                now,
            )
            .unwrap_err();

        assert_eq!(failure, DecisionFailure::TooLow);
        assert!(ledger.bid(target.bid_id).unwrap().is_pending());
        assert_eq!(ledger.auction().current_price_cents, 10_000);
    }

    #[test]
    fn re_issuing_the_same_decision_is_a_noop() {
        let mut ledger = RoomLedger::new(auction(10_000));
        let target = bid(&mut ledger, 12_000, "a-1");

        let now = OffsetDateTime::now_utc();
        let moderator = admin();
        let first = ledger
            .decide(target.bid_id, DecisionAction::Accept, moderator, now)
            .unwrap();
        assert!(first.action.is_some());

        // double-click: same outcome, no new audit entry, no price change
        let second = ledger
            .decide(target.bid_id, DecisionAction::Accept, moderator, now)
            .unwrap();
        assert!(second.action.is_none());
        assert!(second.cascaded.is_empty());
        assert_eq!(second.current_price_cents, 12_000);

        // a different outcome for a decided bid is refused
        let failure = ledger
            .decide(target.bid_id, DecisionAction::Reject, moderator, now)
            .unwrap_err();
        assert_eq!(failure, DecisionFailure::NotPending);
    }

    #[test]
    fn price_is_monotonic_across_decisions() {
        let mut ledger = RoomLedger::new(auction(10_000));
        let now = OffsetDateTime::now_utc();

        let mut last = ledger.auction().current_price_cents;
        for (amount, key) in [(10_500, "a"), (11_000, "b"), (14_000, "c"), (14_500, "d")] {
            let b = bid(&mut ledger, amount, key);
            if ledger
                .decide(b.bid_id, DecisionAction::Accept, admin(), now)
                .is_ok()
            {
                let price = ledger.auction().current_price_cents;
                assert!(price >= last);
                last = price;
            }
        }
        assert_eq!(last, 14_500);
    }

    #[test]
    fn duplicate_admission_returns_the_tracked_bid() {
        let mut ledger = RoomLedger::new(auction(10_000));
        let original = bid(&mut ledger, 12_000, "a-1");

        let now = OffsetDateTime::now_utc();
        let replay = Bid {
            bid_id: BidId::from(Uuid::new_v4()),
            idempotency_key: "a-1".to_owned(),
            ..original.clone()
        };
        let AdmitOutcome::Admitted(tracked) = ledger.admit(replay, now) else {
            panic!("replay refused");
        };
        assert_eq!(tracked.bid_id, original.bid_id);
        assert_eq!(ledger.bids().count(), 1);
    }

    #[test]
    fn decisions_require_a_live_auction() {
        let mut auction = auction(10_000);
        auction.status = AuctionStatus::Scheduled;
        let mut ledger = RoomLedger::new(auction);

        assert!(ledger.open().is_ok());
        let target = bid(&mut ledger, 12_000, "a-1");

        let now = OffsetDateTime::now_utc();
        ledger.close(now).unwrap();
        let failure = ledger
            .decide(target.bid_id, DecisionAction::Accept, admin(), now)
            .unwrap_err();
        assert_eq!(failure, DecisionFailure::NotLive);
        assert_eq!(ledger.open().unwrap_err(), LifecycleFailure::Ended);
    }

    #[test]
    fn close_settles_pending_bids_and_fixes_the_winner() {
        let mut ledger = RoomLedger::new(auction(10_000));
        let winner = bid(&mut ledger, 13_000, "w");
        let now = OffsetDateTime::now_utc();
        ledger
            .decide(winner.bid_id, DecisionAction::Accept, admin(), now)
            .unwrap();
        let open = bid(&mut ledger, 14_000, "open");

        let closed = ledger.close(now).unwrap();
        assert_eq!(closed.expired.len(), 1);
        assert_eq!(closed.expired[0].bid_id, open.bid_id);

        let result = closed.result;
        assert_eq!(result.status, AuctionStatus::Ended);
        let won = result.winner.unwrap();
        assert_eq!(won.bid_id, winner.bid_id);
        assert_eq!(won.amount_cents, 13_000);

        // closing again is a no-op with the same outcome
        let again = ledger.close(now).unwrap();
        assert!(again.expired.is_empty());
        assert_eq!(again.result, ledger.result());
    }

    #[test]
    fn a_room_can_end_with_no_winner() {
        let mut ledger = RoomLedger::new(auction(10_000));
        let only = bid(&mut ledger, 12_000, "a-1");
        let now = OffsetDateTime::now_utc();
        ledger
            .decide(only.bid_id, DecisionAction::Reject, admin(), now)
            .unwrap();

        let closed = ledger.close(now).unwrap();
        assert_eq!(closed.result.winner, None);
        assert_eq!(closed.result.current_price_cents, 10_000);
    }

    #[test]
    fn bids_arriving_after_close_are_refused_terminally() {
        let mut ledger = RoomLedger::new(auction(10_000));
        let now = OffsetDateTime::now_utc();
        ledger.close(now).unwrap();

        let late = Bid {
            bid_id: BidId::from(Uuid::new_v4()),
            auction_id: ledger.auction().auction_id,
            bidder_id: BidderId::from(Uuid::new_v4()),
            amount_cents: 20_000,
            idempotency_key: "late".to_owned(),
            status: BidStatus::Pending,
            submitted_at: now,
            decided_at: None,
            decided_by: None,
        };
        let AdmitOutcome::Refused(refused) = ledger.admit(late, now) else {
            panic!("late bid admitted into an ended room");
        };
        assert_eq!(refused.status, BidStatus::Rejected);
        assert_eq!(refused.decided_by, Some(Decider::System));
    }
}
