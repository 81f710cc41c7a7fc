use axum::http::StatusCode;
use axum_test::TestServer;
use jwt_simple::prelude::{Claims, Duration, HS256Key, MACLike};
use rostrum_core::models::{
    Auction, AuctionStatus, Bid, BidStatus, BidderId, Decider, Decision, Deposit, DepositOrder,
    DepositStatus, Eligibility, Membership,
};
use rostrum_core::retry::BackoffPolicy;
use rostrum_mem::{MemoryStore, MockDepositProvider};
use rostrum_server::{CustomJWTClaims, ServerConfig, router, state};
use rstest::rstest;
use serde_json::{Value, json};
use uuid::Uuid;

fn server_with(provider: MockDepositProvider, config: ServerConfig) -> TestServer {
    let state = state("test-secret-please-change", MemoryStore::default(), provider, config);
    TestServer::new(router(state)).unwrap()
}

fn server() -> TestServer {
    server_with(MockDepositProvider::instant(), ServerConfig::default())
}

fn admin_token() -> String {
    let key = HS256Key::from_bytes("test-secret-please-change".as_bytes());
    let account: BidderId = Uuid::new_v4().into();
    let claims = Claims::with_custom_claims(
        CustomJWTClaims {
            admin: true,
            name: None,
        },
        Duration::from_days(365),
    )
    .with_subject(account.to_string());
    key.authenticate(claims).unwrap()
}

fn bidder_token(name: &str) -> (BidderId, String) {
    let key = HS256Key::from_bytes("test-secret-please-change".as_bytes());
    let account: BidderId = Uuid::new_v4().into();
    let claims = Claims::with_custom_claims(
        CustomJWTClaims {
            admin: false,
            name: Some(name.to_owned()),
        },
        Duration::from_days(365),
    )
    .with_subject(account.to_string());
    (account, key.authenticate(claims).unwrap())
}

async fn launch(server: &TestServer, admin: &str, starting_price_cents: i64) -> Auction {
    let auction = server
        .post("/v0/admin/auctions")
        .authorization_bearer(admin)
        .json(&json!({
            "starting_price_cents": starting_price_cents,
            "min_increment_cents": 100
        }))
        .await
        .json::<Auction>();
    assert_eq!(auction.status, AuctionStatus::Scheduled);

    server
        .post(&format!("/v0/admin/auctions/{}/open", auction.auction_id))
        .authorization_bearer(admin)
        .await
        .json::<Auction>()
}

#[tokio::test]
async fn moderation_pipeline() {
    let server = server();
    let admin = admin_token();
    let (_alice, alice_token) = bidder_token("alice");
    let (bob, bob_token) = bidder_token("bob");

    let auction = server
        .post("/v0/admin/auctions")
        .authorization_bearer(&admin)
        .json(&json!({
            "starting_price_cents": 10_000,
            "min_increment_cents": 100
        }))
        .await
        .json::<Auction>();
    let base = format!("/v0/auctions/{}", auction.auction_id);

    // the room is not live yet, so nothing can be submitted into it
    {
        let response = server
            .post(&format!("{base}/bids"))
            .authorization_bearer(&alice_token)
            .json(&json!({"amount_cents": 12_000, "idempotency_key": "early"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
        assert_eq!(response.json::<Value>()["code"], "AUCTION_NOT_LIVE");
    }

    let live = server
        .post(&format!("/v0/admin/auctions/{}/open", auction.auction_id))
        .authorization_bearer(&admin)
        .await
        .json::<Auction>();
    assert_eq!(live.status, AuctionStatus::Live);

    // joining is idempotent: the first join time sticks
    let membership = server
        .post(&format!("/v0/rooms/{}/join", auction.auction_id))
        .authorization_bearer(&alice_token)
        .await
        .json::<Membership>();
    let again = server
        .post(&format!("/v0/rooms/{}/join", auction.auction_id))
        .authorization_bearer(&alice_token)
        .await
        .json::<Membership>();
    assert_eq!(membership.joined_at, again.joined_at);

    // two pending bids
    let bid_a = {
        let response = server
            .post(&format!("{base}/bids"))
            .authorization_bearer(&alice_token)
            .json(&json!({"amount_cents": 12_000, "idempotency_key": "a-1"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::ACCEPTED);
        response.json::<Bid>()
    };
    assert_eq!(bid_a.status, BidStatus::Pending);

    let bid_b = server
        .post(&format!("{base}/bids"))
        .authorization_bearer(&bob_token)
        .json(&json!({"amount_cents": 11_000, "idempotency_key": "b-1"}))
        .await
        .json::<Bid>();
    assert_eq!(bid_b.bidder_id, bob);

    // accepting the 12_000 bid raises the price and cascades the 11_000
    // bid into rejection within the same decision
    let decision = server
        .post(&format!(
            "/v0/admin/auctions/{}/decisions",
            auction.auction_id
        ))
        .authorization_bearer(&admin)
        .json(&json!({"action": "accept", "bid_id": bid_a.bid_id}))
        .await
        .json::<Decision>();
    assert_eq!(decision.current_price_cents, 12_000);
    assert_eq!(decision.bid.status, BidStatus::Accepted);
    assert_eq!(decision.cascaded.len(), 1);
    assert_eq!(decision.cascaded[0].bid_id, bid_b.bid_id);
    assert_eq!(decision.cascaded[0].decided_by, Some(Decider::System));

    let action = decision.action.expect("a fresh decision is audited");
    assert_eq!(action.previous_amount_cents, 12_000);
    assert_eq!(action.new_amount_cents, None);

    let snapshot = server
        .get(&base)
        .authorization_bearer(&alice_token)
        .await
        .json::<Auction>();
    assert_eq!(snapshot.current_price_cents, 12_000);
    assert_eq!(snapshot.highest_accepted_bid_id, Some(bid_a.bid_id));

    // replaying the same idempotency key returns the original bid: no new
    // record, no price mutation, no fresh validation against the new price
    {
        let response = server
            .post(&format!("{base}/bids"))
            .authorization_bearer(&alice_token)
            .json(&json!({"amount_cents": 12_000, "idempotency_key": "a-1"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let replay = response.json::<Bid>();
        assert_eq!(replay.bid_id, bid_a.bid_id);
        assert_eq!(replay.status, BidStatus::Accepted);
    }

    let bids = server
        .get(&format!("/v0/admin/auctions/{}/bids", auction.auction_id))
        .authorization_bearer(&admin)
        .await
        .json::<Vec<Bid>>();
    assert_eq!(bids.len(), 2);
}

#[tokio::test]
async fn override_and_settlement() {
    let server = server();
    let admin = admin_token();
    let (carol, carol_token) = bidder_token("carol");

    let auction = launch(&server, &admin, 8_000).await;
    let base = format!("/v0/auctions/{}", auction.auction_id);

    let bid = server
        .post(&format!("{base}/bids"))
        .authorization_bearer(&carol_token)
        .json(&json!({"amount_cents": 9_000, "idempotency_key": "c-1"}))
        .await
        .json::<Bid>();

    // the moderator lifts the 9_000 bid to 13_000; the record keeps the
    // original amount and the audit entry records both
    let decision = server
        .post(&format!(
            "/v0/admin/auctions/{}/decisions",
            auction.auction_id
        ))
        .authorization_bearer(&admin)
        .json(&json!({
            "action": "override",
            "bid_id": bid.bid_id,
            "override_amount_cents": 13_000
        }))
        .await
        .json::<Decision>();
    assert_eq!(
        decision.bid.status,
        BidStatus::Overridden {
            final_amount_cents: 13_000
        }
    );
    assert_eq!(decision.bid.amount_cents, 9_000);
    assert_eq!(decision.current_price_cents, 13_000);

    let action = decision.action.expect("a fresh decision is audited");
    assert_eq!(action.previous_amount_cents, 9_000);
    assert_eq!(action.new_amount_cents, Some(13_000));

    // a double-clicked identical decision succeeds without a second audit
    // entry
    let replay = server
        .post(&format!(
            "/v0/admin/auctions/{}/decisions",
            auction.auction_id
        ))
        .authorization_bearer(&admin)
        .json(&json!({
            "action": "override",
            "bid_id": bid.bid_id,
            "override_amount_cents": 13_000
        }))
        .await
        .json::<Decision>();
    assert!(replay.action.is_none());
    assert_eq!(replay.current_price_cents, 13_000);

    // close the room: the winner is fixed at the overridden amount
    let result = server
        .post(&format!("/v0/admin/auctions/{}/close", auction.auction_id))
        .authorization_bearer(&admin)
        .await
        .json::<rostrum_core::models::AuctionResult>();
    assert_eq!(result.status, AuctionStatus::Ended);
    let winner = result.winner.expect("the overridden bid won");
    assert_eq!(winner.bidder_id, carol);
    assert_eq!(winner.amount_cents, 13_000);

    // nothing can be decided or submitted into an ended room
    {
        let response = server
            .post(&format!(
                "/v0/admin/auctions/{}/decisions",
                auction.auction_id
            ))
            .authorization_bearer(&admin)
            .json(&json!({"action": "reject", "bid_id": bid.bid_id}))
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
        assert_eq!(response.json::<Value>()["code"], "AUCTION_NOT_LIVE");

        let response = server
            .post(&format!("{base}/bids"))
            .authorization_bearer(&carol_token)
            .json(&json!({"amount_cents": 20_000, "idempotency_key": "late"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);
    }

    // the result endpoint agrees after the fact
    let result = server
        .get(&format!("{base}/result"))
        .authorization_bearer(&carol_token)
        .await
        .json::<rostrum_core::models::AuctionResult>();
    assert_eq!(result.winner.unwrap().amount_cents, 13_000);
}

#[tokio::test]
async fn ending_with_no_winner_is_representable() {
    let server = server();
    let admin = admin_token();

    let auction = launch(&server, &admin, 10_000).await;
    let result = server
        .post(&format!("/v0/admin/auctions/{}/close", auction.auction_id))
        .authorization_bearer(&admin)
        .await
        .json::<rostrum_core::models::AuctionResult>();
    assert_eq!(result.status, AuctionStatus::Ended);
    assert!(result.winner.is_none());
    assert_eq!(result.current_price_cents, 10_000);
}

#[tokio::test]
async fn deposit_gate_blocks_unfunded_bidders() {
    let server = server();
    let admin = admin_token();
    let (_gina, gina_token) = bidder_token("gina");

    let auction = server
        .post("/v0/admin/auctions")
        .authorization_bearer(&admin)
        .json(&json!({
            "starting_price_cents": 10_000,
            "min_increment_cents": 100,
            "min_deposit_cents": 5_000
        }))
        .await
        .json::<Auction>();
    server
        .post(&format!("/v0/admin/auctions/{}/open", auction.auction_id))
        .authorization_bearer(&admin)
        .await
        .json::<Auction>();
    let base = format!("/v0/auctions/{}", auction.auction_id);

    // an unfunded bidder gets a funding prompt, and no bid record exists
    {
        let response = server
            .post(&format!("{base}/bids"))
            .authorization_bearer(&gina_token)
            .json(&json!({"amount_cents": 12_000, "idempotency_key": "g-1"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::PAYMENT_REQUIRED);
        let body = response.json::<Value>();
        assert_eq!(body["code"], "DEPOSIT_REQUIRED");
        assert_eq!(body["min_deposit_cents"], 5_000);

        let bids = server
            .get(&format!("/v0/admin/auctions/{}/bids", auction.auction_id))
            .authorization_bearer(&admin)
            .await
            .json::<Vec<Bid>>();
        assert!(bids.is_empty());
    }

    let eligibility = server
        .get(&format!("{base}/eligibility"))
        .authorization_bearer(&gina_token)
        .await
        .json::<Eligibility>();
    assert!(!eligibility.eligible);
    assert_eq!(eligibility.min_deposit_cents, Some(5_000));

    // a verified deposit below the requirement does not open the gate
    let small = server
        .post("/v0/deposits")
        .authorization_bearer(&gina_token)
        .json(&json!({"amount_cents": 4_000, "auction_id": auction.auction_id}))
        .await
        .json::<DepositOrder>();
    let polled = server
        .get(&format!("/v0/deposits/{}", small.deposit_id))
        .authorization_bearer(&gina_token)
        .await
        .json::<Deposit>();
    assert_eq!(polled.status, DepositStatus::Verified);
    {
        let response = server
            .post(&format!("{base}/bids"))
            .authorization_bearer(&gina_token)
            .json(&json!({"amount_cents": 12_000, "idempotency_key": "g-2"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::PAYMENT_REQUIRED);
    }

    // a covering deposit does
    let order = server
        .post("/v0/deposits")
        .authorization_bearer(&gina_token)
        .json(&json!({"amount_cents": 5_000, "auction_id": auction.auction_id}))
        .await
        .json::<DepositOrder>();
    assert_eq!(order.order.amount, 5_000);
    let polled = server
        .get(&format!("/v0/deposits/{}", order.deposit_id))
        .authorization_bearer(&gina_token)
        .await
        .json::<Deposit>();
    assert_eq!(polled.status, DepositStatus::Verified);

    let response = server
        .post(&format!("{base}/bids"))
        .authorization_bearer(&gina_token)
        .json(&json!({"amount_cents": 12_000, "idempotency_key": "g-3"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn deposit_polling_times_out_as_retryable() {
    // a provider that never settles, and a backoff budget of a few tens of
    // milliseconds so the test stays fast
    let config = ServerConfig {
        deposit_poll: BackoffPolicy {
            start: std::time::Duration::from_millis(5),
            factor: 1.0,
            cap: std::time::Duration::from_millis(5),
            timeout: std::time::Duration::from_millis(20),
        },
        ..ServerConfig::default()
    };
    let server = server_with(MockDepositProvider::new(None), config);
    let (_hana, hana_token) = bidder_token("hana");

    let order = server
        .post("/v0/deposits")
        .authorization_bearer(&hana_token)
        .json(&json!({"amount_cents": 5_000}))
        .await
        .json::<DepositOrder>();

    let response = server
        .get(&format!("/v0/deposits/{}/wait", order.deposit_id))
        .authorization_bearer(&hana_token)
        .await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["code"], "DEPOSIT_STATUS_FAILED");

    // still pending, not failed: the client may simply try again
    let deposit = server
        .get(&format!("/v0/deposits/{}", order.deposit_id))
        .authorization_bearer(&hana_token)
        .await
        .json::<Deposit>();
    assert_eq!(deposit.status, DepositStatus::Pending);
}

#[rstest]
#[case::accept_then_reject("accept", "reject")]
#[case::reject_then_accept("reject", "accept")]
#[case::override_then_accept("override", "accept")]
#[tokio::test]
async fn conflicting_re_decisions_are_refused(#[case] first: &str, #[case] second: &str) {
    fn payload(action: &str, bid_id: rostrum_core::models::BidId) -> Value {
        match action {
            "override" => json!({
                "action": "override",
                "bid_id": bid_id,
                "override_amount_cents": 14_000
            }),
            other => json!({"action": other, "bid_id": bid_id}),
        }
    }

    let server = server();
    let admin = admin_token();
    let (_ivan, ivan_token) = bidder_token("ivan");

    let auction = launch(&server, &admin, 10_000).await;
    let bid = server
        .post(&format!("/v0/auctions/{}/bids", auction.auction_id))
        .authorization_bearer(&ivan_token)
        .json(&json!({"amount_cents": 12_000, "idempotency_key": "i-1"}))
        .await
        .json::<Bid>();

    let decisions = format!("/v0/admin/auctions/{}/decisions", auction.auction_id);
    let response = server
        .post(&decisions)
        .authorization_bearer(&admin)
        .json(&payload(first, bid.bid_id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server
        .post(&decisions)
        .authorization_bearer(&admin)
        .json(&payload(second, bid.bid_id))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "BID_NOT_PENDING");
}

#[tokio::test]
async fn authentication_and_authorization() {
    let server = server();
    let admin = admin_token();
    let (bidder_id, bidder) = bidder_token("judy");

    let auction = launch(&server, &admin, 10_000).await;
    let base = format!("/v0/auctions/{}", auction.auction_id);

    // no token
    {
        let response = server
            .post(&format!("{base}/bids"))
            .json(&json!({"amount_cents": 12_000, "idempotency_key": "x"}))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["code"], "AUTH_FAILED");
    }

    // a bidder token is not enough for moderation
    {
        let response = server
            .post("/v0/admin/auctions")
            .authorization_bearer(&bidder)
            .json(&json!({"starting_price_cents": 1, "min_increment_cents": 1}))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    // unknown rooms are reported as such
    {
        let response = server
            .post(&format!("/v0/rooms/{}/join", Uuid::new_v4()))
            .authorization_bearer(&bidder)
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["code"], "AUCTION_NOT_FOUND");
    }

    // the room stream requires membership; joining fixes it
    {
        let response = server
            .get(&format!("/v0/rooms/{}/stream", auction.auction_id))
            .authorization_bearer(&bidder)
            .await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.json::<Value>()["code"], "CONNECTION_FAILED");
    }

    // leaving someone else's membership is refused
    {
        let response = server
            .delete(&format!(
                "/v0/rooms/{}/members/{}",
                auction.auction_id,
                Uuid::new_v4()
            ))
            .authorization_bearer(&bidder)
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    // leaving one's own is fine and touches nothing else
    {
        server
            .post(&format!("/v0/rooms/{}/join", auction.auction_id))
            .authorization_bearer(&bidder)
            .await
            .json::<Membership>();
        let response = server
            .delete(&format!(
                "/v0/rooms/{}/members/{}",
                auction.auction_id, bidder_id
            ))
            .authorization_bearer(&bidder)
            .await;
        assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

        let snapshot = server
            .get(&base)
            .authorization_bearer(&bidder)
            .await
            .json::<Auction>();
        assert_eq!(snapshot.current_price_cents, 10_000);
    }
}
