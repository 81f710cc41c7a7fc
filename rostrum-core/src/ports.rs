mod auction;
mod bid;
mod deposit;
mod log;
mod provider;

pub use auction::AuctionRepository;
pub use bid::{BidInsert, BidRepository};
pub use deposit::DepositRepository;
pub use log::AdminLogRepository;
pub use provider::DepositProvider;

/// Base trait for storage backends, providing the unified error type every
/// repository operation may fail with.
///
/// Repositories are cloned freely (one clone per actor, one in the app
/// state), so implementations are expected to be cheap handles over shared
/// state, not owners of it.
pub trait Repository: Clone + Send + Sync + 'static {
    /// The backend's infrastructure error (connection loss, serialization,
    /// and so on). Domain-level failures are expressed in the operations'
    /// inner result types, not here.
    type Error: std::error::Error + Send + Sync + 'static;
}

/// The "marker" trait used everywhere; implies implementation of all the
/// repository traits above.
pub trait RoomRepository:
    AuctionRepository + BidRepository + DepositRepository + AdminLogRepository
{
}
