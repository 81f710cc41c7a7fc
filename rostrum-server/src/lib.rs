//! The realtime auction room API server.
//!
//! Bidders join rooms, submit bids, and watch outcomes arrive over SSE; a
//! moderator admits, rejects, or overrides pending bids. Each auction's
//! mutable state is owned by exactly one spawned task (its decision
//! context), so all price mutations and cascading rejections for a room are
//! totally ordered no matter how many clients are connected.
//!
//! The server is generic over the storage backend ([`RoomRepository`]) and
//! the deposit provider ([`DepositProvider`]); the demo binary wires in the
//! in-memory backend and a mock provider.

use rostrum_core::models::AuctionId;
use rostrum_core::ports::{
    AdminLogRepository, AuctionRepository, BidRepository, DepositProvider, RoomRepository,
};

use axum::Router;
use axum::http::header;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use tower_http::cors;

mod actor;
pub mod config;
mod error;
mod fanout;
mod openapi;
mod routes;
mod utils;

use actor::RoomHandle;
use fanout::{BidderChannels, RoomChannels};
use rostrum_core::ledger::RoomLedger;
use rostrum_core::models::ErrorCode;

pub use config::ServerConfig;
pub use error::{ApiError, ErrorBody};
pub use openapi::openapi_router;
pub use utils::{Admin, Bidder, CustomJWTClaims, JWTVerifier, Now, generate_jwt};

type RoomMap = Arc<dashmap::DashMap<AuctionId, RoomHandle, FxBuildHasher>>;

/// Shared state handed to every route handler.
pub struct AppState<T: RoomRepository, P: DepositProvider> {
    jwt: JWTVerifier,
    pub(crate) store: T,
    pub(crate) provider: Arc<P>,
    pub(crate) config: Arc<ServerConfig>,
    rooms: RoomMap,
    pub(crate) bidders: BidderChannels,
}

impl<T: RoomRepository, P: DepositProvider> Clone for AppState<T, P> {
    fn clone(&self) -> Self {
        Self {
            jwt: self.jwt.clone(),
            store: self.store.clone(),
            provider: self.provider.clone(),
            config: self.config.clone(),
            rooms: self.rooms.clone(),
            bidders: self.bidders.clone(),
        }
    }
}

impl<T: RoomRepository, P: DepositProvider> AppState<T, P> {
    /// The handle of an auction's room, spawning (or restoring) its
    /// decision context on first touch.
    pub(crate) async fn room(&self, auction_id: AuctionId) -> Result<RoomHandle, ApiError> {
        if let Some(handle) = self.rooms.get(&auction_id) {
            return Ok(handle.clone());
        }

        // Restore from the repository: the room may predate this process.
        let auction = AuctionRepository::get_auction(&self.store, auction_id)
            .await
            .map_err(ApiError::internal)?
            .ok_or(ErrorCode::AuctionNotFound)?;
        let bids = BidRepository::list_bids(&self.store, auction_id)
            .await
            .map_err(ApiError::internal)?;
        let actions = AdminLogRepository::list_actions(&self.store, auction_id, self.config.log_backlog)
            .await
            .map_err(ApiError::internal)?;

        match self.rooms.entry(auction_id) {
            dashmap::Entry::Occupied(entry) => Ok(entry.get().clone()),
            dashmap::Entry::Vacant(entry) => {
                let channels = RoomChannels::new(
                    self.config.fanout_capacity,
                    self.config.overlay_backlog,
                    self.config.log_backlog,
                );
                channels.seed_log(actions);
                let handle = actor::spawn(
                    RoomLedger::restore(auction, bids),
                    self.store.clone(),
                    channels,
                    self.bidders.clone(),
                    self.config.queue_depth,
                );
                entry.insert(handle.clone());
                Ok(handle)
            }
        }
    }
}

/// Build the combined application state.
pub fn state<T: RoomRepository, P: DepositProvider>(
    api_secret: &str,
    store: T,
    provider: P,
    config: ServerConfig,
) -> AppState<T, P> {
    let bidders = BidderChannels::new(config.fanout_capacity);
    AppState {
        jwt: JWTVerifier::from(api_secret),
        store,
        provider: Arc::new(provider),
        config: Arc::new(config),
        rooms: Default::default(),
        bidders,
    }
}

/// Assemble the router over the given state.
pub fn router<T: RoomRepository, P: DepositProvider>(state: AppState<T, P>) -> Router {
    // To allow for web app access, we use a permissive CORS policy. Notably,
    // this strips any implicit authorization, making this a pretty decent policy.
    let policy = cors::CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods(cors::Any)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    // Wire it together
    let app = Router::new()
        // Room snapshots, eligibility, and bid submission
        .nest("/v0/auctions", routes::auctions::router())
        // Membership and the room event stream
        .nest("/v0/rooms", routes::rooms::router())
        // Submitter-only event streams
        .nest("/v0/bidders", routes::bidders::router())
        // Funding flows against the external deposit service
        .nest("/v0/deposits", routes::deposits::router())
        // Moderation: lifecycle, decisions, audit stream
        .nest("/v0/admin", routes::admin::router());

    app.layer(policy).with_state(state)
}

// The binary can simply provide the configuration to this function to launch
// the server
pub async fn start<T: RoomRepository, P: DepositProvider>(
    api_secret: String,
    store: T,
    provider: P,
    config: ServerConfig,
) {
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .expect("Unable to bind local port");
    tracing::info!(
        "Listening for requests on {}",
        listener.local_addr().unwrap()
    );

    let app_state = state(&api_secret, store, provider, config);

    axum::serve(listener, router(app_state).merge(openapi_router()))
        .await
        .expect("shutdown");
}
