//! End-to-end tests driving the HTTP router over a mock upstream source.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use opinion_gateway::api::{create_router, AppState};
use opinion_gateway::config::Config;
use opinion_gateway::upstream::{MockSource, MockSourceConfig};

fn state_with(source: MockSource) -> AppState {
    let config = Config {
        opinion_api_key: Some("test-key".to_string()),
        ..Config::default()
    };
    AppState::new(&config, Arc::new(source))
}

async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
    let response = create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// 20 markets m-1..m-20, even ids resolved, served in upstream pages of 5.
fn seeded_source() -> MockSource {
    let source = MockSource::new();
    let markets: Vec<Value> = (1..=20)
        .map(|i| {
            json!({
                "marketId": format!("m-{i}"),
                "title": format!("Market {i}"),
                "status": if i % 2 == 0 { "resolved" } else { "activated" },
                "quoteToken": "USDT",
            })
        })
        .collect();
    for chunk in markets.chunks(5) {
        source.push_page(json!({ "items": chunk, "total": 20 }));
    }
    source
}

#[tokio::test]
async fn list_returns_filtered_window_in_modern_shape() {
    let state = state_with(seeded_source());
    let (status, body) =
        get_json(state, "/api/markets?page=1&pageSize=5&status=resolved").await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["marketId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["m-2", "m-4", "m-6", "m-8", "m-10"]);
    assert_eq!(body["hasMore"], json!(true));
    assert_eq!(body["page"], json!(1));
    assert_eq!(body["pageSize"], json!(5));
    assert_eq!(body["total"], json!(20));
}

#[tokio::test]
async fn list_legacy_shape_uses_original_field_names() {
    let state = state_with(seeded_source());
    let (status, body) =
        get_json(state, "/api/markets?page=1&limit=2&status=resolved&shape=legacy").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("items").is_none());
    let list = body["list"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["marketId"], json!("m-2"));
    assert_eq!(list[0]["marketTitle"], json!("Market 2"));
    assert_eq!(list[0]["statusEnum"], json!("resolved"));
    assert_eq!(body["hasMore"], json!(true));
}

#[tokio::test]
async fn list_past_last_match_is_short_with_no_more() {
    let state = state_with(seeded_source());
    let (status, body) =
        get_json(state, "/api/markets?page=3&pageSize=5&status=resolved").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().len() < 5);
    assert_eq!(body["hasMore"], json!(false));
}

#[tokio::test]
async fn list_clamps_page_size_to_bounds() {
    let state = state_with(seeded_source());
    let (status, body) = get_json(state, "/api/markets?pageSize=500").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pageSize"], json!(50));
}

#[tokio::test]
async fn identical_list_requests_are_served_from_cache() {
    let source = seeded_source();
    let state = state_with(source.clone());

    let uri = "/api/markets?page=1&pageSize=5&status=resolved";
    let (_, first) = get_json(state.clone(), uri).await;
    let scans_after_first = source.page_requests().len();

    let (_, second) = get_json(state, uri).await;
    assert_eq!(first, second);
    assert_eq!(source.page_requests().len(), scans_after_first);
}

#[tokio::test]
async fn application_error_envelope_yields_500_and_skips_cache() {
    let source = MockSource::new();
    source.push_page(json!({ "errno": 7, "errmsg": "quota exceeded" }));
    let state = state_with(source.clone());

    let (status, body) = get_json(state.clone(), "/api/markets?pageSize=20").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Upstream request failed"));
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("quota exceeded"));

    // The failure must not be memoized: the retry reaches the upstream again.
    let scans_after_first = source.page_requests().len();
    let (status, _) = get_json(state, "/api/markets?pageSize=20").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(source.page_requests().len() > scans_after_first);
}

#[tokio::test]
async fn detail_uses_singular_fallback_when_plural_fails() {
    let source = MockSource::with_config(MockSourceConfig {
        fail_plural_detail: true,
        ..MockSourceConfig::default()
    });
    source.set_detail(
        "X",
        json!({
            "market_id": "X",
            "title": "Fallback market",
            "child_markets": [
                { "marketId": "X-child", "yesTokenId": "yes-1", "totalVolume": "42" },
            ],
        }),
    );
    let state = state_with(source.clone());

    let (status, body) = get_json(state, "/api/markets/X").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marketId"], json!("X"));
    assert_eq!(body["title"], json!("Fallback market"));
    assert_eq!(body["childMarkets"][0]["yesTokenId"], json!("yes-1"));
    assert_eq!(body["childMarkets"][0]["totalVolume"], json!(42));
    assert_eq!(source.detail_requests(), vec!["markets/X", "market/X"]);
}

#[tokio::test]
async fn detail_is_cached_by_market_id() {
    let source = MockSource::new();
    source.set_detail("m-1", json!({ "marketId": "m-1", "title": "Cached" }));
    let state = state_with(source.clone());

    let (status, _) = get_json(state.clone(), "/api/markets/m-1").await;
    assert_eq!(status, StatusCode::OK);
    let fetches_after_first = source.detail_requests().len();

    let (status, body) = get_json(state, "/api/markets/m-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], json!("Cached"));
    assert_eq!(source.detail_requests().len(), fetches_after_first);
}

#[tokio::test]
async fn detail_failure_on_both_routes_yields_500() {
    let source = MockSource::with_config(MockSourceConfig {
        fail_plural_detail: true,
        fail_singular_detail: true,
        ..MockSourceConfig::default()
    });
    let state = state_with(source);

    let (status, body) = get_json(state, "/api/markets/X").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Upstream request failed"));
}

#[tokio::test]
async fn detail_surfaces_application_error_envelope() {
    let source = MockSource::new();
    source.set_detail("X", json!({ "errno": 3, "errmsg": "not found upstream" }));
    let state = state_with(source);

    let (status, body) = get_json(state, "/api/markets/X").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("not found upstream"));
}

#[tokio::test]
async fn debug_reports_config_and_probe() {
    let source = seeded_source();
    let state = state_with(source);

    let (status, body) = get_json(state, "/api/debug").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["config"]["hasKey"], json!(true));
    assert_eq!(
        body["config"]["apiBase"],
        json!("https://openapi.opinion.trade/openapi")
    );
    assert_eq!(body["probe"]["status"], json!(200));
    let keys: Vec<&str> = body["probe"]["sampleKeys"]
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k.as_str().unwrap())
        .collect();
    assert!(keys.contains(&"items"));
    assert!(body.get("market").is_none());
}

#[tokio::test]
async fn debug_includes_market_and_token_summary_when_id_given() {
    let source = seeded_source();
    source.set_detail(
        "root",
        json!({
            "marketId": "root",
            "title": "Parent",
            "childMarkets": [
                { "marketId": "c-1", "yesTokenId": "cy", "noTokenId": "cn" },
                { "marketId": "c-2" },
            ],
        }),
    );
    let state = state_with(source);

    let (status, body) = get_json(state, "/api/debug?marketId=root").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["market"]["marketId"], json!("root"));
    assert!(body["tokens"]["rootTokens"].is_null());
    assert_eq!(body["tokens"]["childTokens"][0]["marketId"], json!("c-1"));
}
