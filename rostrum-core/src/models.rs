mod admin;
mod auction;
mod bid;
mod deposit;
mod error;
mod overlay;
mod room;

pub use admin::{AdminAction, AdminActionKind, Decider, Decision, DecisionRequest};
pub use auction::{Auction, AuctionData, AuctionResult, AuctionStatus, ValidationError, Winner};
pub use bid::{Bid, BidRequest, BidStatus};
pub use deposit::{
    Deposit, DepositOrder, DepositRequest, DepositStatus, DepositStatusReport, Eligibility,
    OrderInfo,
};
pub use error::ErrorCode;
pub use overlay::{OverlayEvent, OverlayFlags};
pub use room::Membership;

macro_rules! uuid_wrapper {
    ($struct: ident) => {
        /// A UUID newtype
        #[derive(
            Debug,
            Hash,
            PartialEq,
            Eq,
            Clone,
            Copy,
            serde::Serialize,
            serde::Deserialize,
            PartialOrd,
            Ord,
            utoipa::ToSchema,
        )]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $struct(uuid::Uuid);

        impl From<uuid::Uuid> for $struct {
            fn from(value: uuid::Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$struct> for uuid::Uuid {
            fn from(value: $struct) -> Self {
                value.0
            }
        }

        impl TryFrom<&str> for $struct {
            type Error = <uuid::Uuid as std::str::FromStr>::Err;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Ok(Self(<uuid::Uuid as std::str::FromStr>::from_str(value)?))
            }
        }

        impl std::ops::Deref for $struct {
            type Target = uuid::Uuid;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::fmt::Display for $struct {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

pub(crate) use uuid_wrapper;
uuid_wrapper!(AuctionId);
uuid_wrapper!(BidId);
uuid_wrapper!(BidderId);
uuid_wrapper!(AdminId);
uuid_wrapper!(DepositId);
