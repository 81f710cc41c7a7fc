use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rostrum_core::models::ErrorCode;
use serde::Serialize;
use tracing::{Level, event};
use utoipa::ToSchema;

/// The JSON body of every error response.
///
/// Clients key off `code`; everything else the server knows stays in the
/// server logs. `DEPOSIT_REQUIRED` additionally carries the amount the
/// bidder must fund, so the client can open a funding flow instead of
/// showing a generic failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// The machine-readable failure code
    pub code: ErrorCode,
    /// The deposit requirement, present only for `DEPOSIT_REQUIRED`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_deposit_cents: Option<i64>,
}

/// A route failure: a client-safe code plus the HTTP status it travels on.
#[derive(Debug, thiserror::Error)]
#[error("{code}")]
pub struct ApiError {
    /// The machine-readable failure code
    pub code: ErrorCode,
    status: StatusCode,
    min_deposit_cents: Option<i64>,
}

impl ApiError {
    /// An ineligible-bidder failure carrying the required funding amount.
    pub fn deposit_required(min_deposit_cents: Option<i64>) -> Self {
        Self {
            min_deposit_cents,
            ..ErrorCode::DepositRequired.into()
        }
    }

    /// An authenticated-but-not-allowed failure (e.g. acting on another
    /// bidder's resources, or streaming a room without membership).
    pub fn forbidden(code: ErrorCode) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            ..code.into()
        }
    }

    /// A missing-resource failure, for codes whose default status differs.
    pub fn not_found(code: ErrorCode) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            ..code.into()
        }
    }

    /// A malformed request body; the detail is logged, not echoed.
    pub fn invalid<E: std::fmt::Debug>(error: E) -> Self {
        event!(Level::WARN, ?error);
        Self {
            status: StatusCode::BAD_REQUEST,
            ..ErrorCode::UnknownError.into()
        }
    }

    /// Log the full error server-side and surface an opaque failure.
    pub fn internal<E: std::fmt::Debug>(error: E) -> Self {
        event!(Level::ERROR, ?error);
        ErrorCode::UnknownError.into()
    }
}

impl From<ErrorCode> for ApiError {
    fn from(code: ErrorCode) -> Self {
        let status = match code {
            ErrorCode::AuthFailed => StatusCode::UNAUTHORIZED,
            ErrorCode::AuctionNotFound => StatusCode::NOT_FOUND,
            ErrorCode::DepositRequired => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::BidTooLow
            | ErrorCode::StaleBid
            | ErrorCode::BidNotPending
            | ErrorCode::AuctionNotLive => StatusCode::CONFLICT,
            ErrorCode::DepositInitFailed => StatusCode::BAD_GATEWAY,
            ErrorCode::DepositStatusFailed => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ConnectionFailed => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::UnknownError => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            code,
            status,
            min_deposit_cents: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                code: self.code,
                min_deposit_cents: self.min_deposit_cents,
            }),
        )
            .into_response()
    }
}
