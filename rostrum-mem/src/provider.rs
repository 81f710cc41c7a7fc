use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

use rostrum_core::models::{
    AuctionId, BidderId, DepositId, DepositOrder, DepositStatus, DepositStatusReport, OrderInfo,
};
use rostrum_core::ports::DepositProvider;

/// Failures the mock provider can report.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The queried deposit was never created with this provider
    #[error("unknown deposit {0}")]
    UnknownDeposit(DepositId),
}

struct MockOrder {
    amount_cents: i64,
    created_at: OffsetDateTime,
    refunded: bool,
}

/// A deposit provider for demos and tests.
///
/// Orders "settle" on a configurable clock: a status query reports
/// `verified` once `verify_after` has elapsed since creation (immediately
/// for a zero delay), and `pending` until then. With no delay configured,
/// orders stay pending forever, which exercises the polling-timeout path.
/// This is the one place mock behavior lives; everything downstream sees
/// only the provider port.
#[derive(Clone)]
pub struct MockDepositProvider {
    orders: Arc<DashMap<DepositId, MockOrder, FxBuildHasher>>,
    verify_after: Option<Duration>,
    key_id: String,
    currency: String,
}

impl MockDepositProvider {
    /// A provider whose orders settle after the given delay.
    pub fn new(verify_after: Option<Duration>) -> Self {
        Self {
            orders: Default::default(),
            verify_after,
            key_id: "mock_key".to_owned(),
            currency: "USD".to_owned(),
        }
    }

    /// A provider whose orders settle on the first status query.
    pub fn instant() -> Self {
        Self::new(Some(Duration::ZERO))
    }
}

impl DepositProvider for MockDepositProvider {
    type Error = ProviderError;

    async fn create_order(
        &self,
        _user_id: BidderId,
        amount_cents: i64,
        _auction_id: Option<AuctionId>,
    ) -> Result<DepositOrder, ProviderError> {
        let deposit_id: DepositId = Uuid::new_v4().into();
        self.orders.insert(
            deposit_id,
            MockOrder {
                amount_cents,
                created_at: OffsetDateTime::now_utc(),
                refunded: false,
            },
        );
        Ok(DepositOrder {
            deposit_id,
            order: OrderInfo {
                id: format!("order_{}", deposit_id.simple()),
                amount: amount_cents,
                currency: self.currency.clone(),
            },
            key_id: self.key_id.clone(),
        })
    }

    async fn fetch_payment(
        &self,
        deposit_id: DepositId,
    ) -> Result<DepositStatusReport, ProviderError> {
        let order = self
            .orders
            .get(&deposit_id)
            .ok_or(ProviderError::UnknownDeposit(deposit_id))?;

        let status = if order.refunded {
            DepositStatus::Refunded
        } else {
            let elapsed: Duration = (OffsetDateTime::now_utc() - order.created_at)
                .try_into()
                .unwrap_or_default();
            match self.verify_after {
                Some(delay) if elapsed >= delay => DepositStatus::Verified,
                _ => DepositStatus::Pending,
            }
        };

        Ok(DepositStatusReport {
            id: deposit_id,
            status,
            amount_cents: order.amount_cents,
        })
    }

    async fn refund(&self, deposit_id: DepositId) -> Result<(), ProviderError> {
        let mut order = self
            .orders
            .get_mut(&deposit_id)
            .ok_or(ProviderError::UnknownDeposit(deposit_id))?;
        order.refunded = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn orders_settle_on_the_configured_clock() {
        let instant = MockDepositProvider::instant();
        let user: BidderId = Uuid::new_v4().into();

        let order = instant.create_order(user, 5_000, None).await.unwrap();
        let report = instant.fetch_payment(order.deposit_id).await.unwrap();
        assert_eq!(report.status, DepositStatus::Verified);
        assert_eq!(report.amount_cents, 5_000);

        let never = MockDepositProvider::new(None);
        let order = never.create_order(user, 5_000, None).await.unwrap();
        let report = never.fetch_payment(order.deposit_id).await.unwrap();
        assert_eq!(report.status, DepositStatus::Pending);

        never.refund(order.deposit_id).await.unwrap();
        let report = never.fetch_payment(order.deposit_id).await.unwrap();
        assert_eq!(report.status, DepositStatus::Refunded);
    }
}
