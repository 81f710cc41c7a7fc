use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use super::{AdminId, Bid, BidId};

/// Who decided a bid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decider {
    /// A human moderator
    Admin(AdminId),
    /// The moderation core itself (cascading invalidation, stale bids,
    /// close-time settlement)
    System,
}

/// The kind of moderation decision taken on a bid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AdminActionKind {
    /// Admit the bid at its submitted amount
    Accept,
    /// Decline the bid
    Reject,
    /// Admit the bid at an adjusted amount
    Override,
}

/// One entry of the append-only moderation audit log.
///
/// Entries are write-once and never deleted. For overrides, both the bid's
/// original amount and the admin-set amount are recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AdminAction {
    /// What was decided
    pub kind: AdminActionKind,

    /// The bid the decision applies to
    pub bid_id: BidId,

    /// Who took the decision
    pub decided_by: Decider,

    /// The bid's submitted amount at decision time
    pub previous_amount_cents: i64,

    /// The adjusted amount, present only for overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_amount_cents: Option<i64>,

    /// When the decision was taken
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Request body for a moderation decision.
///
/// An override must carry the adjusted amount, so the variants are tagged:
/// a malformed override is rejected at deserialization rather than deep in
/// the decision path.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum DecisionRequest {
    /// Admit the bid at its submitted amount
    Accept {
        /// The pending bid to admit
        bid_id: BidId,
    },
    /// Decline the bid
    Reject {
        /// The pending bid to decline
        bid_id: BidId,
    },
    /// Admit the bid at an adjusted amount
    Override {
        /// The pending bid to admit
        bid_id: BidId,
        /// The amount that will become the standing price
        override_amount_cents: i64,
    },
}

impl DecisionRequest {
    /// Returns the bid targeted by this decision
    pub fn bid_id(&self) -> BidId {
        match self {
            Self::Accept { bid_id } => *bid_id,
            Self::Reject { bid_id } => *bid_id,
            Self::Override { bid_id, .. } => *bid_id,
        }
    }
}

/// The result of a moderation decision, as applied by the room's serialized
/// decision context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Decision {
    /// The decided bid, in its post-decision state
    pub bid: Bid,

    /// The audit entry appended for this decision. Absent when the request
    /// re-issued an identical, already-applied decision (a no-op).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<AdminAction>,

    /// Other pending bids system-rejected in the same serialized step
    /// because they no longer beat the new standing price
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cascaded: Vec<Bid>,

    /// The standing price after this decision
    pub current_price_cents: i64,
}
