use crate::{ApiError, AppState, utils::Bidder};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing,
};
use rostrum_core::{
    models::{Deposit, DepositId, DepositOrder, DepositRequest, DepositStatus, ErrorCode},
    ports::{DepositProvider, DepositRepository, RoomRepository},
};
use tracing::{Level, event};

pub fn router<T: RoomRepository, P: DepositProvider>() -> Router<AppState<T, P>> {
    Router::new()
        .route("/", routing::post(initiate_deposit))
        .route("/{deposit_id}", routing::get(poll_deposit))
        .route("/{deposit_id}/wait", routing::get(await_deposit))
}

/// Initiate a deposit with the external deposit service.
///
/// The gateway order and key are forwarded to the client verbatim; payment
/// completes directly between client and gateway. The deposit is recorded
/// `pending` and becomes usable for eligibility only once a status poll
/// reports it verified.
#[utoipa::path(
    post,
    path = "/v0/deposits",
    request_body = DepositRequest,
    responses(
        (status = CREATED, body = DepositOrder),
        (status = BAD_GATEWAY, body = crate::ErrorBody)
    ),
    tags = ["deposits"]
)]
pub async fn initiate_deposit<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Bidder { bidder_id, .. }: Bidder,
    Json(input): Json<DepositRequest>,
) -> Result<(StatusCode, Json<DepositOrder>), ApiError> {
    let order = state
        .provider
        .create_order(bidder_id, input.amount_cents, input.auction_id)
        .await
        .map_err(|error| {
            event!(Level::ERROR, ?error, "deposit order creation failed");
            ApiError::from(ErrorCode::DepositInitFailed)
        })?;

    let deposit = Deposit {
        deposit_id: order.deposit_id,
        user_id: bidder_id,
        auction_id: input.auction_id,
        amount_cents: input.amount_cents,
        status: DepositStatus::Pending,
    };
    state
        .store
        .record_deposit(&deposit)
        .await
        .map_err(ApiError::internal)?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Poll the deposit's settlement status once.
///
/// Status transitions come exclusively from the provider's report; nothing
/// here ever marks a deposit verified on its own.
#[utoipa::path(
    get,
    path = "/v0/deposits/{deposit_id}",
    responses(
        (status = OK, body = Deposit),
        (status = NOT_FOUND, body = crate::ErrorBody),
        (status = SERVICE_UNAVAILABLE, body = crate::ErrorBody)
    ),
    params(
        ("deposit_id" = DepositId, description = "Unique identifier of the deposit")
    ),
    tags = ["deposits"]
)]
pub async fn poll_deposit<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Bidder { bidder_id, .. }: Bidder,
    Path(deposit_id): Path<DepositId>,
) -> Result<Json<Deposit>, ApiError> {
    let deposit = lookup(&state, bidder_id, deposit_id).await?;
    if deposit.status.is_settled() {
        return Ok(Json(deposit));
    }
    let refreshed = refresh(&state, deposit).await?;
    Ok(Json(refreshed))
}

/// Poll the deposit's settlement status until it settles or the backoff
/// budget is spent.
///
/// Uses the configured backoff schedule. A deposit still pending when the
/// budget runs out is a retryable failure (the client may call again),
/// never a permanent one.
#[utoipa::path(
    get,
    path = "/v0/deposits/{deposit_id}/wait",
    responses(
        (status = OK, body = Deposit),
        (status = NOT_FOUND, body = crate::ErrorBody),
        (status = SERVICE_UNAVAILABLE, body = crate::ErrorBody, description = "Still pending; retry")
    ),
    params(
        ("deposit_id" = DepositId, description = "Unique identifier of the deposit")
    ),
    tags = ["deposits"]
)]
pub async fn await_deposit<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Bidder { bidder_id, .. }: Bidder,
    Path(deposit_id): Path<DepositId>,
) -> Result<Json<Deposit>, ApiError> {
    let mut deposit = lookup(&state, bidder_id, deposit_id).await?;

    for delay in state.config.deposit_poll.delays() {
        if deposit.status.is_settled() {
            return Ok(Json(deposit));
        }
        tokio::time::sleep(delay).await;
        deposit = refresh(&state, deposit).await?;
    }

    if deposit.status.is_settled() {
        Ok(Json(deposit))
    } else {
        Err(ErrorCode::DepositStatusFailed.into())
    }
}

async fn lookup<T: RoomRepository, P: DepositProvider>(
    state: &AppState<T, P>,
    bidder_id: rostrum_core::models::BidderId,
    deposit_id: DepositId,
) -> Result<Deposit, ApiError> {
    let deposit = state
        .store
        .get_deposit(deposit_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::not_found(ErrorCode::DepositStatusFailed))?;
    if deposit.user_id != bidder_id {
        return Err(ApiError::forbidden(ErrorCode::AuthFailed));
    }
    Ok(deposit)
}

async fn refresh<T: RoomRepository, P: DepositProvider>(
    state: &AppState<T, P>,
    deposit: Deposit,
) -> Result<Deposit, ApiError> {
    let report = state
        .provider
        .fetch_payment(deposit.deposit_id)
        .await
        .map_err(|error| {
            event!(Level::ERROR, ?error, deposit_id = %deposit.deposit_id, "deposit status query failed");
            ApiError::from(ErrorCode::DepositStatusFailed)
        })?;

    if report.status == deposit.status {
        return Ok(deposit);
    }

    let updated = state
        .store
        .set_deposit_status(deposit.deposit_id, report.status)
        .await
        .map_err(ApiError::internal)?;
    Ok(updated.unwrap_or(deposit))
}
