use crate::{ApiError, AppState, fanout, utils::Admin, utils::Now};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing,
};
use rostrum_core::{
    ledger::DecisionAction,
    models::{
        Auction, AuctionData, AuctionId, AuctionResult, Bid, Decider, Decision, DecisionRequest,
    },
    ports::{BidRepository, DepositProvider, RoomRepository},
};
use std::convert::Infallible;
use tokio::sync::oneshot;
use tokio_stream::Stream;

use crate::actor::RoomCommand;

pub fn router<T: RoomRepository, P: DepositProvider>() -> Router<AppState<T, P>> {
    Router::new()
        .route("/auctions", routing::post(create_auction))
        .route("/auctions/{auction_id}/open", routing::post(open_auction))
        .route("/auctions/{auction_id}/close", routing::post(close_auction))
        .route("/auctions/{auction_id}/decisions", routing::post(decide_bid))
        .route("/auctions/{auction_id}/bids", routing::get(list_bids))
        .route("/auctions/{auction_id}/log", routing::get(admin_log_stream))
}

/// Schedule a new auction.
#[utoipa::path(
    post,
    path = "/v0/admin/auctions",
    request_body = AuctionData,
    responses(
        (status = CREATED, body = Auction),
        (status = BAD_REQUEST, body = crate::ErrorBody),
        (status = FORBIDDEN, body = crate::ErrorBody)
    ),
    tags = ["admin"]
)]
pub async fn create_auction<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Admin(_admin): Admin,
    Now(now): Now,
    Json(input): Json<AuctionData>,
) -> Result<(StatusCode, Json<Auction>), ApiError> {
    input.validate().map_err(ApiError::invalid)?;

    let auction = state
        .store
        .create_auction(input, now)
        .await
        .map_err(ApiError::internal)?;

    // Warm the room so members can join and stream immediately.
    let _ = state.room(auction.auction_id).await?;

    Ok((StatusCode::CREATED, Json(auction)))
}

/// Open a scheduled auction for bidding. Re-opening a live auction is a
/// no-op.
#[utoipa::path(
    post,
    path = "/v0/admin/auctions/{auction_id}/open",
    responses(
        (status = OK, body = Auction),
        (status = CONFLICT, body = crate::ErrorBody),
        (status = NOT_FOUND, body = crate::ErrorBody)
    ),
    params(
        ("auction_id" = AuctionId, description = "Unique identifier of the auction")
    ),
    tags = ["admin"]
)]
pub async fn open_auction<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Admin(_admin): Admin,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<Auction>, ApiError> {
    let room = state.room(auction_id).await?;
    let (reply, response) = oneshot::channel();
    room.commands
        .send(RoomCommand::Open { reply })
        .await
        .map_err(ApiError::internal)?;
    let auction = response.await.map_err(ApiError::internal)??;
    Ok(Json(auction))
}

/// Close a live auction, fixing the outcome. Pending bids are settled as
/// rejected in the same step; closing an ended auction is a no-op returning
/// the settled result.
#[utoipa::path(
    post,
    path = "/v0/admin/auctions/{auction_id}/close",
    responses(
        (status = OK, body = AuctionResult),
        (status = CONFLICT, body = crate::ErrorBody),
        (status = NOT_FOUND, body = crate::ErrorBody)
    ),
    params(
        ("auction_id" = AuctionId, description = "Unique identifier of the auction")
    ),
    tags = ["admin"]
)]
pub async fn close_auction<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Admin(_admin): Admin,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<AuctionResult>, ApiError> {
    let room = state.room(auction_id).await?;
    let (reply, response) = oneshot::channel();
    room.commands
        .send(RoomCommand::Close { reply })
        .await
        .map_err(ApiError::internal)?;
    let result = response.await.map_err(ApiError::internal)??;
    Ok(Json(result))
}

/// Decide a pending bid: accept, reject, or override with an adjusted
/// amount.
///
/// Decisions are serialized per auction; any pending bid may be decided in
/// any order, because an acceptance cascades rejection over every pending
/// bid the new price leaves behind. Re-issuing an identical decision is a
/// no-op success; a conflicting one fails.
#[utoipa::path(
    post,
    path = "/v0/admin/auctions/{auction_id}/decisions",
    request_body = DecisionRequest,
    responses(
        (status = OK, body = Decision),
        (status = CONFLICT, body = crate::ErrorBody),
        (status = NOT_FOUND, body = crate::ErrorBody)
    ),
    params(
        ("auction_id" = AuctionId, description = "Unique identifier of the auction")
    ),
    tags = ["admin"]
)]
pub async fn decide_bid<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Admin(admin_id): Admin,
    Path(auction_id): Path<AuctionId>,
    Json(input): Json<DecisionRequest>,
) -> Result<Json<Decision>, ApiError> {
    let action = match input {
        DecisionRequest::Accept { .. } => DecisionAction::Accept,
        DecisionRequest::Reject { .. } => DecisionAction::Reject,
        DecisionRequest::Override {
            override_amount_cents,
            ..
        } => DecisionAction::Override {
            amount_cents: override_amount_cents,
        },
    };

    let room = state.room(auction_id).await?;
    let (reply, response) = oneshot::channel();
    room.commands
        .send(RoomCommand::Decide {
            bid_id: input.bid_id(),
            action,
            decided_by: Decider::Admin(admin_id),
            reply,
        })
        .await
        .map_err(ApiError::internal)?;
    let decision = response.await.map_err(ApiError::internal)??;
    Ok(Json(decision))
}

/// All bids recorded against an auction, for the moderation console.
#[utoipa::path(
    get,
    path = "/v0/admin/auctions/{auction_id}/bids",
    responses(
        (status = OK, body = Vec<Bid>),
        (status = FORBIDDEN, body = crate::ErrorBody)
    ),
    params(
        ("auction_id" = AuctionId, description = "Unique identifier of the auction")
    ),
    tags = ["admin"]
)]
pub async fn list_bids<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Admin(_admin): Admin,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<Vec<Bid>>, ApiError> {
    let bids = BidRepository::list_bids(&state.store, auction_id)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(bids))
}

/// The moderation audit stream: a trailing window of recent entries plus
/// every decision from now on. Moderator-only.
#[utoipa::path(
    get,
    path = "/v0/admin/auctions/{auction_id}/log",
    responses(
        (status = OK, description = "An SSE stream of audit entries"),
        (status = FORBIDDEN, body = crate::ErrorBody),
        (status = NOT_FOUND, body = crate::ErrorBody)
    ),
    params(
        ("auction_id" = AuctionId, description = "Unique identifier of the auction")
    ),
    tags = ["admin"]
)]
pub async fn admin_log_stream<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Admin(_admin): Admin,
    Path(auction_id): Path<AuctionId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + Send>, ApiError> {
    let room = state.room(auction_id).await?;
    let (backlog, receiver) = room.channels.subscribe_admin();
    Ok(Sse::new(fanout::sse_stream(backlog, receiver)).keep_alive(KeepAlive::default()))
}
