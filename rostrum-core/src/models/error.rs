use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Machine-readable failure codes surfaced to clients.
///
/// These are the only failure details that leave the server; full context is
/// logged server-side. The codes are stable strings in SCREAMING_SNAKE_CASE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bearer token missing, malformed, or failed verification
    AuthFailed,
    /// The referenced auction does not exist
    AuctionNotFound,
    /// The bidder lacks a verified deposit covering the auction's requirement
    DepositRequired,
    /// The submitted (or override) amount does not beat the standing price
    BidTooLow,
    /// The standing price moved past this bid while it waited; the bid was
    /// auto-rejected instead of being accepted below the price
    StaleBid,
    /// The bid has already been decided with a different outcome
    BidNotPending,
    /// The operation requires a live auction
    AuctionNotLive,
    /// The deposit service could not create the funding order
    DepositInitFailed,
    /// The deposit service could not report a settled status in time;
    /// retryable, never treated as a permanent failure
    DepositStatusFailed,
    /// The realtime connection could not be established
    ConnectionFailed,
    /// Anything else; details are server-side only
    UnknownError,
}

impl ErrorCode {
    /// The stable wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthFailed => "AUTH_FAILED",
            ErrorCode::AuctionNotFound => "AUCTION_NOT_FOUND",
            ErrorCode::DepositRequired => "DEPOSIT_REQUIRED",
            ErrorCode::BidTooLow => "BID_TOO_LOW",
            ErrorCode::StaleBid => "STALE_BID",
            ErrorCode::BidNotPending => "BID_NOT_PENDING",
            ErrorCode::AuctionNotLive => "AUCTION_NOT_LIVE",
            ErrorCode::DepositInitFailed => "DEPOSIT_INIT_FAILED",
            ErrorCode::DepositStatusFailed => "DEPOSIT_STATUS_FAILED",
            ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
