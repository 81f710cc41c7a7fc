use crate::{ApiError, AppState, utils::Bidder, utils::Now};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing,
};
use rostrum_core::{
    gate,
    models::{Auction, AuctionId, AuctionResult, AuctionStatus, Bid, BidRequest, Eligibility,
        ErrorCode, Winner},
    ports::{BidInsert, BidRepository, DepositProvider, RoomRepository},
};
use tracing::{Level, event};

use crate::actor::RoomCommand;

pub fn router<T: RoomRepository, P: DepositProvider>() -> Router<AppState<T, P>> {
    Router::new()
        .route("/{auction_id}", routing::get(get_auction))
        .route("/{auction_id}/result", routing::get(get_result))
        .route("/{auction_id}/eligibility", routing::get(get_eligibility))
        .route("/{auction_id}/bids", routing::post(place_bid))
}

/// Fetch the room snapshot: status, standing price, increment, deposit
/// requirement. Advisory; the serialized decision context is authoritative.
#[utoipa::path(
    get,
    path = "/v0/auctions/{auction_id}",
    responses(
        (status = OK, body = Auction),
        (status = NOT_FOUND, body = crate::ErrorBody)
    ),
    params(
        ("auction_id" = AuctionId, description = "Unique identifier of the auction")
    ),
    tags = ["auctions"]
)]
pub async fn get_auction<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    _bidder: Bidder,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<Auction>, ApiError> {
    let auction = state
        .store
        .get_auction(auction_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or(ErrorCode::AuctionNotFound)?;
    Ok(Json(auction))
}

/// Fetch the auction outcome. For an ended auction this is the settled
/// result; an auction that never accepted a bid has no winner.
#[utoipa::path(
    get,
    path = "/v0/auctions/{auction_id}/result",
    responses(
        (status = OK, body = AuctionResult),
        (status = NOT_FOUND, body = crate::ErrorBody)
    ),
    params(
        ("auction_id" = AuctionId, description = "Unique identifier of the auction")
    ),
    tags = ["auctions"]
)]
pub async fn get_result<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    _bidder: Bidder,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<AuctionResult>, ApiError> {
    let auction = state
        .store
        .get_auction(auction_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or(ErrorCode::AuctionNotFound)?;

    let winner = match auction.highest_accepted_bid_id {
        Some(bid_id) => state
            .store
            .get_bid(bid_id)
            .await
            .map_err(ApiError::internal)?
            .map(|bid| Winner {
                bid_id: bid.bid_id,
                bidder_id: bid.bidder_id,
                amount_cents: bid.effective_amount_cents(),
            }),
        None => None,
    };

    Ok(Json(AuctionResult {
        auction_id: auction.auction_id,
        status: auction.status,
        current_price_cents: auction.current_price_cents,
        winner,
    }))
}

/// Check whether the caller may bid in this auction. Ineligibility carries
/// the required deposit amount so the client can open a funding flow.
#[utoipa::path(
    get,
    path = "/v0/auctions/{auction_id}/eligibility",
    responses(
        (status = OK, body = Eligibility),
        (status = NOT_FOUND, body = crate::ErrorBody)
    ),
    params(
        ("auction_id" = AuctionId, description = "Unique identifier of the auction")
    ),
    tags = ["auctions"]
)]
pub async fn get_eligibility<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Bidder { bidder_id, .. }: Bidder,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<Eligibility>, ApiError> {
    let auction = state
        .store
        .get_auction(auction_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or(ErrorCode::AuctionNotFound)?;

    let eligibility = gate::check_eligibility(&state.store, bidder_id, &auction)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(eligibility))
}

/// Submit a bid.
///
/// Exactly one bid record exists per `(auction, idempotency_key)`: a retry
/// (double-click, reconnect race) returns the original record with `200`
/// instead of creating a second one. A fresh bid is answered `202` as soon
/// as it is durably recorded and enqueued; the moderation decision arrives
/// later, over the streams.
#[utoipa::path(
    post,
    path = "/v0/auctions/{auction_id}/bids",
    request_body = BidRequest,
    responses(
        (status = ACCEPTED, body = Bid, description = "Newly recorded, pending moderation"),
        (status = OK, body = Bid, description = "Replay of an existing submission"),
        (status = PAYMENT_REQUIRED, body = crate::ErrorBody),
        (status = CONFLICT, body = crate::ErrorBody),
        (status = NOT_FOUND, body = crate::ErrorBody)
    ),
    params(
        ("auction_id" = AuctionId, description = "Unique identifier of the auction")
    ),
    tags = ["auctions"]
)]
pub async fn place_bid<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Bidder { bidder_id, .. }: Bidder,
    Path(auction_id): Path<AuctionId>,
    Now(now): Now,
    Json(input): Json<BidRequest>,
) -> Result<(StatusCode, Json<Bid>), ApiError> {
    // Replay safety comes first: a retried submission resolves to the
    // existing record with no fresh checks of any kind.
    if let Some(existing) = BidRepository::find_bid(&state.store, auction_id, &input.idempotency_key)
        .await
        .map_err(ApiError::internal)?
    {
        return Ok((StatusCode::OK, Json(existing)));
    }

    let auction = state
        .store
        .get_auction(auction_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or(ErrorCode::AuctionNotFound)?;

    if auction.status != AuctionStatus::Live {
        return Err(ErrorCode::AuctionNotLive.into());
    }

    let eligibility = gate::check_eligibility(&state.store, bidder_id, &auction)
        .await
        .map_err(ApiError::internal)?;
    if !eligibility.eligible {
        return Err(ApiError::deposit_required(eligibility.min_deposit_cents));
    }

    // Optimistic pre-check against the last persisted price. Advisory only:
    // the price may move before the decision, so the decision context
    // re-checks authoritatively.
    if input.amount_cents <= auction.current_price_cents {
        return Err(ErrorCode::BidTooLow.into());
    }

    let insert = BidRepository::create_bid(
        &state.store,
        auction_id,
        bidder_id,
        input.amount_cents,
        &input.idempotency_key,
        now,
    )
    .await
    .map_err(ApiError::internal)?;

    match insert {
        BidInsert::Existing(bid) => Ok((StatusCode::OK, Json(bid))),
        BidInsert::Created(bid) => {
            let room = state.room(auction_id).await?;
            if let Err(error) = room
                .commands
                .send(RoomCommand::Admit { bid: bid.clone() })
                .await
            {
                // The bid is durably pending; it will be admitted when the
                // room is restored.
                event!(Level::ERROR, ?error, bid_id = %bid.bid_id, "room queue unavailable");
            }
            Ok((StatusCode::ACCEPTED, Json(bid)))
        }
    }
}
