use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_rapidoc::RapiDoc;

use crate::ErrorBody;
use rostrum_core::models::{AdminAction, OverlayEvent};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::routes::auctions::get_auction,
        super::routes::auctions::get_result,
        super::routes::auctions::get_eligibility,
        super::routes::auctions::place_bid,
        super::routes::rooms::join_room,
        super::routes::rooms::leave_room,
        super::routes::rooms::room_stream,
        super::routes::bidders::bidder_stream,
        super::routes::deposits::initiate_deposit,
        super::routes::deposits::poll_deposit,
        super::routes::deposits::await_deposit,
        super::routes::admin::create_auction,
        super::routes::admin::open_auction,
        super::routes::admin::close_auction,
        super::routes::admin::decide_bid,
        super::routes::admin::list_bids,
        super::routes::admin::admin_log_stream,
    ),
    components(schemas(
        // Stream payloads are not referenced by any request/response body,
        // so they are pulled in manually.
        AdminAction,
        ErrorBody,
        OverlayEvent,
    )),
    modifiers(&SecurityAddon),
    security(
        ("jwt" = []),
    )
)]
/// The OpenAPI spec for the auction room service
pub struct AuctionRoomApi;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap(); // we can unwrap safely since there already is components registered.
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        )
    }
}

pub fn openapi_router() -> Router {
    RapiDoc::with_url(
        "/rapidoc",
        "/api-docs/openapi.json",
        AuctionRoomApi::openapi(),
    )
    .into()
}
