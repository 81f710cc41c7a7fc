use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

use super::{AuctionId, BidId, BidderId, Decider};

/// The decision state of a bid.
///
/// `Pending` is the only non-terminal state. `Overridden` is a variant of
/// acceptance where the moderator adjusted the amount; the bid record keeps
/// its original `amount_cents` for audit and this variant carries the amount
/// that actually became the standing price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BidStatus {
    /// Awaiting a moderation decision
    Pending,
    /// Admitted at its submitted amount
    Accepted,
    /// Declined, either by the moderator or by the system
    Rejected,
    /// Admitted at a moderator-adjusted amount
    Overridden {
        /// The admin-set amount that became the standing price
        final_amount_cents: i64,
    },
}

impl BidStatus {
    /// Whether this state still awaits a decision
    pub fn is_pending(&self) -> bool {
        matches!(self, BidStatus::Pending)
    }
}

/// Request body for submitting a bid.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BidRequest {
    /// The offered amount
    pub amount_cents: i64,

    /// Client-supplied replay-safety token. Retrying a submission with the
    /// same key returns the original bid instead of creating a second one.
    pub idempotency_key: String,
}

/// A single monetary bid against an auction.
///
/// Bids are immutable once decided. The pair `(auction_id, idempotency_key)`
/// is unique: a retried submission resolves to the already-created record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Bid {
    /// Unique id of the bid
    pub bid_id: BidId,

    /// The auction this bid targets
    pub auction_id: AuctionId,

    /// The submitting bidder
    pub bidder_id: BidderId,

    /// The submitted amount
    pub amount_cents: i64,

    /// Client-supplied replay-safety token, unique per auction
    pub idempotency_key: String,

    /// Decision state
    #[serde(flatten)]
    pub status: BidStatus,

    /// When the bid was durably recorded
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,

    /// When the bid reached a terminal state
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub decided_at: Option<OffsetDateTime>,

    /// Who decided the bid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<Decider>,
}

impl Bid {
    /// The amount this bid holds (or would hold) the standing price at:
    /// the override amount if adjusted, the submitted amount otherwise.
    pub fn effective_amount_cents(&self) -> i64 {
        match self.status {
            BidStatus::Overridden { final_amount_cents } => final_amount_cents,
            _ => self.amount_cents,
        }
    }

    /// Whether the bid still awaits a decision
    pub fn is_pending(&self) -> bool {
        self.status.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn wire_format_flattens_the_decision_state() {
        let bid = Bid {
            bid_id: Uuid::new_v4().into(),
            auction_id: Uuid::new_v4().into(),
            bidder_id: Uuid::new_v4().into(),
            amount_cents: 9_000,
            idempotency_key: "c-1".to_owned(),
            status: BidStatus::Overridden {
                final_amount_cents: 13_000,
            },
            submitted_at: OffsetDateTime::now_utc(),
            decided_at: Some(OffsetDateTime::now_utc()),
            decided_by: Some(Decider::System),
        };

        let value = serde_json::to_value(&bid).unwrap();
        assert_eq!(value["status"], "overridden");
        assert_eq!(value["final_amount_cents"], 13_000);
        assert_eq!(value["amount_cents"], 9_000);
        assert_eq!(value["decided_by"], "system");

        let back: Bid = serde_json::from_value(value).unwrap();
        assert_eq!(back, bid);
    }

    #[test]
    fn pending_bids_omit_decision_fields() {
        let bid = Bid {
            bid_id: Uuid::new_v4().into(),
            auction_id: Uuid::new_v4().into(),
            bidder_id: Uuid::new_v4().into(),
            amount_cents: 12_000,
            idempotency_key: "a-1".to_owned(),
            status: BidStatus::Pending,
            submitted_at: OffsetDateTime::now_utc(),
            decided_at: None,
            decided_by: None,
        };

        let value = serde_json::to_value(&bid).unwrap();
        assert_eq!(value["status"], "pending");
        assert!(value.get("decided_at").is_none());
        assert!(value.get("decided_by").is_none());
    }
}
