use crate::{ApiError, AppState, fanout, utils::Bidder, utils::Now};
use axum::{
    Json, Router,
    extract::{Path, State},
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing,
};
use rostrum_core::{
    models::{AuctionId, BidderId, ErrorCode, Membership},
    ports::{DepositProvider, RoomRepository},
};
use std::convert::Infallible;
use tokio_stream::Stream;

pub fn router<T: RoomRepository, P: DepositProvider>() -> Router<AppState<T, P>> {
    Router::new()
        .route("/{auction_id}/join", routing::post(join_room))
        .route(
            "/{auction_id}/members/{bidder_id}",
            routing::delete(leave_room),
        )
        .route("/{auction_id}/stream", routing::get(room_stream))
}

/// Join an auction room.
///
/// Idempotent: re-joining a room the caller already belongs to returns the
/// existing membership unchanged. A dropped connection does not cancel any
/// already-submitted bid; after a reconnect the client must re-join before
/// the room stream will serve it again.
#[utoipa::path(
    post,
    path = "/v0/rooms/{auction_id}/join",
    responses(
        (status = OK, body = Membership),
        (status = UNAUTHORIZED, body = crate::ErrorBody),
        (status = NOT_FOUND, body = crate::ErrorBody)
    ),
    params(
        ("auction_id" = AuctionId, description = "Unique identifier of the auction")
    ),
    tags = ["rooms"]
)]
pub async fn join_room<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Bidder {
        bidder_id,
        display_name,
    }: Bidder,
    Path(auction_id): Path<AuctionId>,
    Now(now): Now,
) -> Result<Json<Membership>, ApiError> {
    let auction = state
        .store
        .get_auction(auction_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or(ErrorCode::AuctionNotFound)?;

    let room = state.room(auction_id).await?;
    let joined_at = room.channels.join(bidder_id, display_name, now);

    Ok(Json(Membership {
        auction_id,
        bidder_id,
        joined_at,
        auction,
    }))
}

/// Leave an auction room. Removes the membership and nothing else; auction
/// state is never touched by connection lifecycle.
#[utoipa::path(
    delete,
    path = "/v0/rooms/{auction_id}/members/{bidder_id}",
    responses(
        (status = NO_CONTENT),
        (status = FORBIDDEN, body = crate::ErrorBody),
        (status = NOT_FOUND, body = crate::ErrorBody)
    ),
    params(
        ("auction_id" = AuctionId, description = "Unique identifier of the auction"),
        ("bidder_id" = BidderId, description = "Unique identifier of the member")
    ),
    tags = ["rooms"]
)]
pub async fn leave_room<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Bidder { bidder_id, .. }: Bidder,
    Path((auction_id, url_bidder_id)): Path<(AuctionId, BidderId)>,
) -> Result<axum::http::StatusCode, ApiError> {
    if bidder_id != url_bidder_id {
        return Err(ApiError::forbidden(ErrorCode::AuthFailed));
    }

    let room = state.room(auction_id).await?;
    room.channels.leave(bidder_id);
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// The room's live event feed: admitted bids with the new standing price,
/// overlays, and the close event. Requires membership; rejections of other
/// bidders' bids never appear here.
#[utoipa::path(
    get,
    path = "/v0/rooms/{auction_id}/stream",
    responses(
        (status = OK, description = "An SSE stream of room events"),
        (status = SERVICE_UNAVAILABLE, body = crate::ErrorBody, description = "Not a member; join first"),
        (status = NOT_FOUND, body = crate::ErrorBody)
    ),
    params(
        ("auction_id" = AuctionId, description = "Unique identifier of the auction")
    ),
    tags = ["rooms"]
)]
pub async fn room_stream<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Bidder { bidder_id, .. }: Bidder,
    Path(auction_id): Path<AuctionId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + Send>, ApiError> {
    let room = state.room(auction_id).await?;
    if !room.channels.is_member(bidder_id) {
        return Err(ErrorCode::ConnectionFailed.into());
    }

    let (backlog, receiver) = room.channels.subscribe_room();
    Ok(Sse::new(fanout::sse_stream(backlog, receiver)).keep_alive(KeepAlive::default()))
}
