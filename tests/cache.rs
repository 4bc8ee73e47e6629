mod common;
use reqwest::StatusCode;
use rust_decimal_macros::dec;
use serde_json::json;

use crate::common::{
    Action, Flow, decimal_at, login_admin_action, register_action, setup_cached_server, setup_server,
    setup_test_db,
};

#[tokio::test]
async fn route_cache_entry_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            Action::new("get_anonymous", "GET", "/api/cache/greeting")
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(register_action("cacher", "cacher12"))
        .step(
            Action::new("get_missing", "GET", "/api/cache/greeting")
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            Action::new("set_default_ttl", "POST", "/api/cache/greeting")
                .with_body(json!({ "value": "hello" }))
                .assert_json(|body| {
                    assert_eq!(body["key"], "greeting");
                    assert_eq!(body["ttl"], 300);
                }),
        )
        .step(
            Action::new("get", "GET", "/api/cache/greeting").assert_json(|body| {
                assert_eq!(body["key"], "greeting");
                assert_eq!(body["value"], "hello");
            }),
        )
        .step(
            Action::new("overwrite", "POST", "/api/cache/greeting")
                .with_body(json!({ "value": "hi again", "ttl": 30 }))
                .assert_json(|body| assert_eq!(body["ttl"], 30)),
        )
        .step(
            Action::new("get_overwritten", "GET", "/api/cache/greeting")
                .assert_json(|body| assert_eq!(body["value"], "hi again")),
        )
        .step(
            Action::new("zero_ttl", "POST", "/api/cache/greeting")
                .with_body(json!({ "value": "never", "ttl": 0 }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("huge_ttl", "POST", "/api/cache/greeting")
                .with_body(json!({ "value": "forever", "ttl": u64::MAX }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("ttl_past_thirty_days", "POST", "/api/cache/greeting")
                .with_body(json!({ "value": "too long", "ttl": 2_592_001 }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("ttl_thirty_days", "POST", "/api/cache/greeting")
                .with_body(json!({ "value": "month", "ttl": 2_592_000 }))
                .assert_json(|body| assert_eq!(body["ttl"], 2_592_000)),
        )
        .step(
            Action::new("delete", "DELETE", "/api/cache/greeting")
                .assert_json(|body| assert_eq!(body["deleted"], true)),
        )
        .step(
            Action::new("delete_again", "DELETE", "/api/cache/greeting")
                .assert_json(|body| assert_eq!(body["deleted"], false)),
        )
        .step(
            Action::new("get_deleted", "GET", "/api/cache/greeting")
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_cache_flush_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(register_action("flusher", "flusher1"))
        .step(
            Action::new("set", "POST", "/api/cache/doomed")
                .with_body(json!({ "value": "bye" })),
        )
        .step(Action::new("flush_forbidden", "DELETE", "/api/cache").with_expect(StatusCode::FORBIDDEN))
        .step(Action::new("still_there", "GET", "/api/cache/doomed"))
        .step(login_admin_action().with_clear_cookies(true))
        .step(Action::new("flush", "DELETE", "/api/cache"))
        .step(Action::new("gone", "GET", "/api/cache/doomed").with_expect(StatusCode::NOT_FOUND))
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_cache_keys_do_not_reach_market_data_test() {
    let pool = setup_test_db().await;
    let mut server = setup_cached_server(&pool).await;

    let fake_quote = json!({
        "symbol": "AAPL",
        "price": "0.01",
        "change": "0",
        "change_percent": "0",
        "currency": "USD",
        "timestamp": "2026-01-01T00:00:00Z"
    })
    .to_string();

    Flow::new()
        .step(register_action("writer", "writer12"))
        .step(
            Action::new("write_quote_key", "POST", "/api/cache/quote:AAPL")
                .with_body(json!({ "value": fake_quote, "ttl": 600 })),
        )
        .step(
            Action::new("write_market_key", "POST", "/api/cache/market:quote:AAPL")
                .with_body(json!({ "value": fake_quote, "ttl": 600 })),
        )
        .step(
            Action::new("read_back", "GET", "/api/cache/market:quote:AAPL")
                .assert_json(|body| assert_eq!(body["key"], "market:quote:AAPL")),
        )
        .step(register_action("reader", "reader12").with_clear_cookies(true))
        .step(
            Action::new("real_quote", "GET", "/api/v1/market/quote/AAPL")
                .assert_json(|body| assert_eq!(decimal_at(body, "/price"), dec!(150))),
        )
        // the decorator's own entry is now warm and still not addressable
        .step(
            Action::new("quote_again", "GET", "/api/v1/market/quote/AAPL")
                .assert_json(|body| assert_eq!(decimal_at(body, "/price"), dec!(150))),
        )
        .run(&mut server, pool)
        .await;
}
