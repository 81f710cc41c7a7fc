use crate::{ApiError, AppState, fanout, utils::Bidder};
use axum::{
    Router,
    extract::{Path, State},
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing,
};
use rostrum_core::{
    models::{BidderId, ErrorCode},
    ports::{DepositProvider, RoomRepository},
};
use std::convert::Infallible;
use tokio_stream::Stream;

pub fn router<T: RoomRepository, P: DepositProvider>() -> Router<AppState<T, P>> {
    Router::new().route("/{bidder_id}/stream", routing::get(bidder_stream))
}

/// The caller's private event feed, across all rooms: rejections of their
/// own bids (moderator rejects, stale bids, cascades, close-time expiry).
/// These are delivered here rather than room-wide so losing-bid information
/// does not leak.
#[utoipa::path(
    get,
    path = "/v0/bidders/{bidder_id}/stream",
    responses(
        (status = OK, description = "An SSE stream of submitter-only events"),
        (status = FORBIDDEN, body = crate::ErrorBody)
    ),
    params(
        ("bidder_id" = BidderId, description = "Unique identifier of the bidder")
    ),
    tags = ["bidders"]
)]
pub async fn bidder_stream<T: RoomRepository, P: DepositProvider>(
    State(state): State<AppState<T, P>>,
    Bidder { bidder_id, .. }: Bidder,
    Path(url_bidder_id): Path<BidderId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + Send>, ApiError> {
    if bidder_id != url_bidder_id {
        return Err(ApiError::forbidden(ErrorCode::AuthFailed));
    }

    let receiver = state.bidders.subscribe(bidder_id);
    Ok(Sse::new(fanout::sse_stream(Vec::new(), receiver)).keep_alive(KeepAlive::default()))
}
