//! The serialized decision context of one auction room.
//!
//! One task per auction owns that auction's [`RoomLedger`]; every mutation
//! (admission, decision, lifecycle transition) arrives as a command on the
//! task's queue and is applied strictly one at a time, in arrival order.
//! Many rooms run concurrently; within a room there is no concurrency at
//! all, which is what makes the cascade and monotonic-price guarantees hold.
//!
//! Persistence is write-behind: the ledger is authoritative, the repository
//! records what happened. Fan-out is fire-and-forget and can never delay a
//! decision.

use time::OffsetDateTime;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, event};

use rostrum_core::ledger::{AdmitOutcome, Closed, DecisionAction, DecisionFailure, RoomLedger};
use rostrum_core::models::{
    AdminAction, AdminActionKind, Auction, AuctionResult, AuctionStatus, Bid, BidId, BidderId,
    Decider, Decision, ErrorCode, OverlayEvent, OverlayFlags,
};
use rostrum_core::ports::RoomRepository;

use crate::fanout::{BidderChannels, RoomChannels, RoomEvent};

/// A mutation request for one room, processed in strict arrival order.
#[derive(Debug)]
pub(crate) enum RoomCommand {
    /// Register a durably recorded bid with the room
    Admit { bid: Bid },
    /// Apply a moderation decision
    Decide {
        bid_id: BidId,
        action: DecisionAction,
        decided_by: Decider,
        reply: oneshot::Sender<Result<Decision, ErrorCode>>,
    },
    /// Open a scheduled room for bidding
    Open {
        reply: oneshot::Sender<Result<Auction, ErrorCode>>,
    },
    /// Close the room and fix the outcome
    Close {
        reply: oneshot::Sender<Result<AuctionResult, ErrorCode>>,
    },
}

/// The handle the rest of the server holds on a room: its command queue and
/// its delivery channels.
#[derive(Clone)]
pub(crate) struct RoomHandle {
    pub commands: mpsc::Sender<RoomCommand>,
    pub channels: RoomChannels,
}

/// Spawn the room task and hand back its handle.
pub(crate) fn spawn<T: RoomRepository>(
    ledger: RoomLedger,
    store: T,
    channels: RoomChannels,
    bidders: BidderChannels,
    queue_depth: usize,
) -> RoomHandle {
    let (sender, receiver) = mpsc::channel(queue_depth);
    let room = Room {
        ledger,
        store,
        channels: channels.clone(),
        bidders,
        commands: receiver,
    };
    tokio::spawn(room.run());
    RoomHandle {
        commands: sender,
        channels,
    }
}

struct Room<T: RoomRepository> {
    ledger: RoomLedger,
    store: T,
    channels: RoomChannels,
    bidders: BidderChannels,
    commands: mpsc::Receiver<RoomCommand>,
}

impl<T: RoomRepository> Room<T> {
    async fn run(mut self) {
        loop {
            // A live room with a deadline closes itself when it passes.
            let deadline = match (self.ledger.auction().status, self.ledger.auction().ends_at) {
                (AuctionStatus::Live, Some(at)) => Some(at),
                _ => None,
            };

            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => break,
                },
                _ = sleep_until(deadline), if deadline.is_some() => {
                    let _ = self.close_room(OffsetDateTime::now_utc()).await;
                }
            }
        }
    }

    async fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Admit { bid } => self.admit(bid).await,
            RoomCommand::Decide {
                bid_id,
                action,
                decided_by,
                reply,
            } => {
                let result = self.decide(bid_id, action, decided_by).await;
                let _ = reply.send(result);
            }
            RoomCommand::Open { reply } => {
                let _ = reply.send(self.open().await);
            }
            RoomCommand::Close { reply } => {
                let _ = reply.send(self.close_room(OffsetDateTime::now_utc()).await);
            }
        }
    }

    async fn admit(&mut self, bid: Bid) {
        let now = OffsetDateTime::now_utc();
        match self.ledger.admit(bid, now) {
            AdmitOutcome::Admitted(_) => {}
            AdmitOutcome::Refused(bid) => {
                // The room stopped being live between submission and
                // admission; the bid was settled as rejected.
                self.persist_bid(&bid).await;
                self.notify_submitter(bid);
            }
        }
    }

    async fn decide(
        &mut self,
        bid_id: BidId,
        action: DecisionAction,
        decided_by: Decider,
    ) -> Result<Decision, ErrorCode> {
        let now = OffsetDateTime::now_utc();
        match self.ledger.decide(bid_id, action, decided_by, now) {
            Ok(decision) => {
                self.persist_bid(&decision.bid).await;
                for bid in &decision.cascaded {
                    self.persist_bid(bid).await;
                }
                if let Some(action) = &decision.action {
                    let auction_id = self.ledger.auction().auction_id;
                    if let Err(error) = self.store.append_action(auction_id, action).await {
                        event!(Level::ERROR, ?error, "failed to persist audit entry");
                    }
                    self.persist_auction().await;
                    self.publish(&decision, action);
                }
                Ok(decision)
            }
            Err(DecisionFailure::Stale(bid)) => {
                // Expected race: the price moved past the bid while it
                // waited. It has been settled as rejected by the system.
                self.persist_bid(&bid).await;
                self.notify_submitter(bid);
                Err(ErrorCode::StaleBid)
            }
            Err(DecisionFailure::NotLive) => Err(ErrorCode::AuctionNotLive),
            Err(DecisionFailure::NotPending) => Err(ErrorCode::BidNotPending),
            Err(DecisionFailure::TooLow) => Err(ErrorCode::BidTooLow),
        }
    }

    async fn open(&mut self) -> Result<Auction, ErrorCode> {
        match self.ledger.open() {
            Ok(auction) => {
                let auction = auction.clone();
                self.persist_auction().await;
                Ok(auction)
            }
            Err(_) => Err(ErrorCode::AuctionNotLive),
        }
    }

    async fn close_room(&mut self, now: OffsetDateTime) -> Result<AuctionResult, ErrorCode> {
        let was_live = self.ledger.auction().status == AuctionStatus::Live;
        match self.ledger.close(now) {
            Ok(Closed { result, expired }) => {
                for bid in expired {
                    self.persist_bid(&bid).await;
                    self.notify_submitter(bid);
                }
                if was_live {
                    self.persist_auction().await;
                    self.channels.publish_room(RoomEvent::Ended(result.clone()));
                }
                Ok(result)
            }
            Err(_) => Err(ErrorCode::AuctionNotLive),
        }
    }

    /// Fan a price-changing or rejecting decision out to its audiences.
    fn publish(&self, decision: &Decision, action: &AdminAction) {
        let current_price_cents = decision.current_price_cents;
        match action.kind {
            AdminActionKind::Accept | AdminActionKind::Override => {
                self.channels.publish_room(RoomEvent::NewBid {
                    bid: decision.bid.clone(),
                    accepted: true,
                    current_price_cents,
                });
                self.channels.publish_room(RoomEvent::Overlay(OverlayEvent {
                    amount_cents: current_price_cents,
                    username: self.display_name(decision.bid.bidder_id),
                    flags: (action.kind == AdminActionKind::Override)
                        .then_some(OverlayFlags::AdminOverride),
                }));
            }
            AdminActionKind::Reject => {
                self.notify_submitter(decision.bid.clone());
            }
        }
        for bid in &decision.cascaded {
            self.notify_submitter(bid.clone());
        }
        self.channels.publish_admin(action.clone());
    }

    /// Rejections go to the submitter's private stream only, never the room.
    fn notify_submitter(&self, bid: Bid) {
        self.bidders.notify(
            bid.bidder_id,
            RoomEvent::NewBid {
                accepted: false,
                current_price_cents: self.ledger.auction().current_price_cents,
                bid,
            },
        );
    }

    fn display_name(&self, bidder_id: BidderId) -> String {
        self.channels
            .display_name(bidder_id)
            .unwrap_or_else(|| paddle_name(bidder_id))
    }

    async fn persist_bid(&self, bid: &Bid) {
        if let Err(error) = self.store.update_bid(bid).await {
            event!(Level::ERROR, ?error, bid_id = %bid.bid_id, "failed to persist bid transition");
        }
    }

    async fn persist_auction(&self) {
        if let Err(error) = self.store.update_auction(self.ledger.auction()).await {
            event!(Level::ERROR, ?error, "failed to persist auction state");
        }
    }
}

/// Anonymous fallback shown on overlays for bidders without a name claim.
fn paddle_name(bidder_id: BidderId) -> String {
    let id = bidder_id.to_string();
    format!("paddle-{}", &id[..8])
}

async fn sleep_until(deadline: Option<OffsetDateTime>) {
    match deadline {
        Some(at) => {
            let wait: std::time::Duration = (at - OffsetDateTime::now_utc())
                .try_into()
                .unwrap_or_default();
            tokio::time::sleep(wait).await
        }
        // Guarded out by the caller's `if`; never resolve just in case.
        None => std::future::pending().await,
    }
}
