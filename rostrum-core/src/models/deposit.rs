use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AuctionId, BidderId, DepositId};

/// Settlement state of a deposit, as reported by the external deposit
/// service. Only an out-of-band confirmation from that service moves a
/// deposit to `Verified`; the moderation core never does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    /// Initiated but not yet confirmed
    Pending,
    /// Funds confirmed by the deposit service
    Verified,
    /// The deposit service reported a failure
    Failed,
    /// Returned to the bidder
    Refunded,
}

impl DepositStatus {
    /// Whether this state can still change
    pub fn is_settled(&self) -> bool {
        !matches!(self, DepositStatus::Pending)
    }
}

/// A bidder's deposit, read (never written) by the eligibility gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Deposit {
    /// Unique id of the deposit
    pub deposit_id: DepositId,

    /// The funding bidder
    pub user_id: BidderId,

    /// The auction this deposit is earmarked for; absent for a general
    /// wallet deposit usable in any room
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_id: Option<AuctionId>,

    /// The funded amount
    pub amount_cents: i64,

    /// Settlement state
    pub status: DepositStatus,
}

/// Request body for initiating a deposit.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DepositRequest {
    /// The amount to fund
    pub amount_cents: i64,

    /// Earmark for a specific auction, or omit for a wallet deposit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_id: Option<AuctionId>,
}

/// The payment-gateway order backing a deposit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderInfo {
    /// The gateway's order id
    pub id: String,
    /// The order amount, in cents
    pub amount: i64,
    /// ISO 4217 currency code
    pub currency: String,
}

/// What the deposit provider returns when an order is created. The `order`
/// and `key_id` are opaque to this system; they are forwarded to the client
/// so it can complete the funding flow with the gateway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DepositOrder {
    /// The deposit this order funds
    pub deposit_id: DepositId,
    /// The gateway order the client completes
    pub order: OrderInfo,
    /// The gateway API key the client should present
    pub key_id: String,
}

/// A point-in-time status report from the deposit provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DepositStatusReport {
    /// The deposit being reported on
    pub id: DepositId,
    /// Settlement state at the time of the report
    pub status: DepositStatus,
    /// The funded amount
    pub amount_cents: i64,
}

/// The deposit gate's answer to "may this bidder bid in this auction?".
///
/// When ineligible, the required amount is included so the caller can
/// present a funding flow instead of a generic error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Eligibility {
    /// Whether bids from this bidder will be admitted
    pub eligible: bool,

    /// The auction's deposit requirement, if it has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_deposit_cents: Option<i64>,
}
