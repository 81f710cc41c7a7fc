use crate::models::{AuctionId, BidderId, DepositId, DepositOrder, DepositStatusReport};
use std::future::Future;

/// The contract consumed from the external deposit service.
///
/// Concrete implementations (a real payment gateway, a demo mock) are
/// selected once at startup; the moderation core and the routes only ever
/// see this trait, so nothing downstream branches on which provider is in
/// play.
pub trait DepositProvider: Send + Sync + 'static {
    /// The provider's transport/protocol error.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a funding order with the gateway. The returned order and key
    /// are forwarded verbatim to the client, which completes payment
    /// directly with the gateway.
    fn create_order(
        &self,
        user_id: BidderId,
        amount_cents: i64,
        auction_id: Option<AuctionId>,
    ) -> impl Future<Output = Result<DepositOrder, Self::Error>> + Send;

    /// Query the settlement status of a previously created order.
    ///
    /// Confirmation is out-of-band: only reports from this call (or the
    /// provider's webhook, where deployed) may mark a deposit verified.
    fn fetch_payment(
        &self,
        deposit_id: DepositId,
    ) -> impl Future<Output = Result<DepositStatusReport, Self::Error>> + Send;

    /// Return funds to the bidder. Exposed for settlement flows; never
    /// called from the moderation path.
    fn refund(
        &self,
        deposit_id: DepositId,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
