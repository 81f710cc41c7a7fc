//! Fan-out plumbing for auction rooms.
//!
//! Each room owns a broadcast channel for its members, a second channel for
//! its moderators, and short trailing buffers so a fresh subscriber sees the
//! recent overlays (and moderators the recent audit entries) without any
//! replay protocol. Delivery is fire-and-forget: a send with no receivers or
//! a lagged receiver is never an error here, because the streams are display
//! plumbing, not the source of truth.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::response::sse::Event;
use rustc_hash::{FxBuildHasher, FxHashMap};
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::broadcast;

use rostrum_core::models::{AdminAction, AuctionResult, Bid, BidderId, OverlayEvent};

/// An event fanned out to room participants over SSE.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum RoomEvent {
    /// A bid reached a terminal state; broadcast room-wide only when it
    /// raised the standing price, privately to the submitter otherwise
    NewBid {
        /// The decided bid
        bid: Bid,
        /// Whether the bid was admitted
        accepted: bool,
        /// The standing price after the decision
        current_price_cents: i64,
    },
    /// Ephemeral display payload accompanying a price change
    Overlay(OverlayEvent),
    /// The room closed
    Ended(AuctionResult),
    /// An audit entry, for moderator streams only
    AdminLog {
        /// The appended entry
        action: AdminAction,
    },
}

impl RoomEvent {
    /// The SSE event name, matching the realtime channel contract.
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::NewBid { .. } => "new-bid",
            RoomEvent::Overlay(_) => "bid-overlay",
            RoomEvent::Ended(_) => "auction-ended",
            RoomEvent::AdminLog { .. } => "admin-action-log",
        }
    }

    /// Render as an SSE event.
    pub fn to_sse(&self) -> Event {
        Event::default()
            .event(self.name())
            .data(serde_json::to_string(self).expect("infallible!"))
    }
}

struct Member {
    joined_at: OffsetDateTime,
    display_name: Option<String>,
}

/// The delivery side of one auction room: membership, channels, and the
/// trailing buffers. Cheaply cloneable; all clones share the same room.
#[derive(Clone)]
pub(crate) struct RoomChannels {
    room: broadcast::Sender<RoomEvent>,
    admin: broadcast::Sender<RoomEvent>,
    overlays: Arc<Mutex<VecDeque<OverlayEvent>>>,
    log: Arc<Mutex<VecDeque<AdminAction>>>,
    members: Arc<Mutex<FxHashMap<BidderId, Member>>>,
    overlay_backlog: usize,
    log_backlog: usize,
}

impl RoomChannels {
    pub fn new(capacity: usize, overlay_backlog: usize, log_backlog: usize) -> Self {
        let (room, _) = broadcast::channel(capacity);
        let (admin, _) = broadcast::channel(capacity);
        Self {
            room,
            admin,
            overlays: Default::default(),
            log: Default::default(),
            members: Default::default(),
            overlay_backlog,
            log_backlog,
        }
    }

    /// Preload the audit buffer from persisted entries (room restore).
    pub fn seed_log(&self, actions: impl IntoIterator<Item = AdminAction>) {
        let mut log = self.log.lock().expect("poisoned");
        for action in actions {
            if log.len() == self.log_backlog {
                log.pop_front();
            }
            log.push_back(action);
        }
    }

    /// Establish (or re-establish) membership. Idempotent: the first join
    /// time is retained, a fresh display name wins over a stale one.
    pub fn join(
        &self,
        bidder_id: BidderId,
        display_name: Option<String>,
        now: OffsetDateTime,
    ) -> OffsetDateTime {
        let mut members = self.members.lock().expect("poisoned");
        let member = members.entry(bidder_id).or_insert(Member {
            joined_at: now,
            display_name: None,
        });
        if display_name.is_some() {
            member.display_name = display_name;
        }
        member.joined_at
    }

    /// Drop membership. Touches nothing but the member table.
    pub fn leave(&self, bidder_id: BidderId) {
        self.members.lock().expect("poisoned").remove(&bidder_id);
    }

    pub fn is_member(&self, bidder_id: BidderId) -> bool {
        self.members.lock().expect("poisoned").contains_key(&bidder_id)
    }

    pub fn display_name(&self, bidder_id: BidderId) -> Option<String> {
        self.members
            .lock()
            .expect("poisoned")
            .get(&bidder_id)
            .and_then(|member| member.display_name.clone())
    }

    /// Deliver an event to every subscribed member, recording overlays in
    /// the trailing buffer. Never blocks, never fails.
    pub fn publish_room(&self, event: RoomEvent) {
        if let RoomEvent::Overlay(overlay) = &event {
            let mut overlays = self.overlays.lock().expect("poisoned");
            if overlays.len() == self.overlay_backlog {
                overlays.pop_front();
            }
            overlays.push_back(overlay.clone());
        }
        let _ = self.room.send(event);
    }

    /// Deliver an audit entry to every subscribed moderator.
    pub fn publish_admin(&self, action: AdminAction) {
        {
            let mut log = self.log.lock().expect("poisoned");
            if log.len() == self.log_backlog {
                log.pop_front();
            }
            log.push_back(action.clone());
        }
        let _ = self.admin.send(RoomEvent::AdminLog { action });
    }

    /// Subscribe to the member stream: the trailing overlays (oldest first)
    /// plus everything from now on. Subscribing before snapshotting means a
    /// concurrent overlay may be seen twice; delivery is at-least-once per
    /// connected session by contract.
    pub fn subscribe_room(&self) -> (Vec<RoomEvent>, broadcast::Receiver<RoomEvent>) {
        let receiver = self.room.subscribe();
        let backlog = self
            .overlays
            .lock()
            .expect("poisoned")
            .iter()
            .cloned()
            .map(RoomEvent::Overlay)
            .collect();
        (backlog, receiver)
    }

    /// Subscribe to the moderator stream: the trailing audit entries plus
    /// everything from now on.
    pub fn subscribe_admin(&self) -> (Vec<RoomEvent>, broadcast::Receiver<RoomEvent>) {
        let receiver = self.admin.subscribe();
        let backlog = self
            .log
            .lock()
            .expect("poisoned")
            .iter()
            .cloned()
            .map(|action| RoomEvent::AdminLog { action })
            .collect();
        (backlog, receiver)
    }
}

/// Per-bidder private channels, shared across all rooms. Rejections (and
/// other submitter-only outcomes) travel here so losing-bid information
/// never leaks into a room broadcast.
#[derive(Clone)]
pub(crate) struct BidderChannels {
    senders: Arc<dashmap::DashMap<BidderId, broadcast::Sender<RoomEvent>, FxBuildHasher>>,
    capacity: usize,
}

impl BidderChannels {
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: Default::default(),
            capacity,
        }
    }

    pub fn subscribe(&self, bidder_id: BidderId) -> broadcast::Receiver<RoomEvent> {
        match self.senders.entry(bidder_id) {
            dashmap::Entry::Occupied(entry) => entry.get().subscribe(),
            dashmap::Entry::Vacant(entry) => {
                let (snd, rcv) = broadcast::channel(self.capacity);
                entry.insert(snd);
                rcv
            }
        }
    }

    pub fn notify(&self, bidder_id: BidderId, event: RoomEvent) {
        if let Some(channel) = self.senders.get(&bidder_id) {
            let _ = channel.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostrum_core::models::OverlayFlags;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn overlay(amount_cents: i64) -> OverlayEvent {
        OverlayEvent {
            amount_cents,
            username: "paddle-test".to_owned(),
            flags: None,
        }
    }

    #[test]
    fn event_names_match_the_channel_contract() {
        let result = rostrum_core::models::AuctionResult {
            auction_id: Uuid::new_v4().into(),
            status: rostrum_core::models::AuctionStatus::Ended,
            current_price_cents: 0,
            winner: None,
        };
        assert_eq!(RoomEvent::Overlay(overlay(1)).name(), "bid-overlay");
        assert_eq!(RoomEvent::Ended(result).name(), "auction-ended");
    }

    #[test]
    fn overlay_backlog_keeps_only_the_most_recent() {
        let channels = RoomChannels::new(8, 3, 50);
        for amount in 1..=5 {
            channels.publish_room(RoomEvent::Overlay(overlay(amount)));
        }

        let (backlog, _receiver) = channels.subscribe_room();
        let amounts: Vec<i64> = backlog
            .iter()
            .map(|event| match event {
                RoomEvent::Overlay(overlay) => overlay.amount_cents,
                other => panic!("unexpected backlog event {}", other.name()),
            })
            .collect();
        assert_eq!(amounts, vec![3, 4, 5]);
    }

    #[test]
    fn overlay_flags_serialize_for_display() {
        let event = RoomEvent::Overlay(OverlayEvent {
            amount_cents: 13_000,
            username: "carol".to_owned(),
            flags: Some(OverlayFlags::AdminOverride),
        });
        let data = serde_json::to_value(&event).expect("infallible!");
        assert_eq!(data["flags"]["type"], "admin_override");
    }

    #[test]
    fn membership_is_idempotent_and_isolated() {
        let channels = RoomChannels::new(8, 3, 50);
        let bidder: BidderId = Uuid::new_v4().into();
        let first = OffsetDateTime::now_utc();
        let later = first + time::Duration::seconds(30);

        let joined = channels.join(bidder, Some("judy".to_owned()), first);
        assert_eq!(joined, first);
        // re-joining keeps the original join time
        let joined = channels.join(bidder, None, later);
        assert_eq!(joined, first);
        assert_eq!(channels.display_name(bidder).as_deref(), Some("judy"));

        channels.leave(bidder);
        assert!(!channels.is_member(bidder));
    }
}

/// Build an SSE event stream from a backlog plus a live subscription,
/// dropping lagged gaps silently (the authoritative state is always the
/// auction and bid records, not the stream).
pub(crate) fn sse_stream(
    backlog: Vec<RoomEvent>,
    receiver: broadcast::Receiver<RoomEvent>,
) -> impl tokio_stream::Stream<Item = Result<Event, Infallible>> + Send {
    use tokio_stream::StreamExt as _;
    use tokio_stream::wrappers::BroadcastStream;

    let snapshot: Vec<Result<Event, Infallible>> = std::iter::once(Ok(Event::default().comment("")))
        .chain(backlog.iter().map(|event| Ok(event.to_sse())))
        .collect();

    tokio_stream::iter(snapshot).chain(
        BroadcastStream::new(receiver)
            .filter_map(|item| item.ok().map(|event| Ok(event.to_sse()))),
    )
}
