//! End-to-end dispatch through the in-process test client.

mod common;

use common::items_client;
use http::Method;
use schemagate::api::Api;
use schemagate::dispatcher::{Dispatcher, DispatcherConfig, HandlerError};
use schemagate::router::Route;
use schemagate::ids::RequestId;
use schemagate::testing::TestClient;
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_get_item_returns_handler_output() {
    let resp = items_client().get("/items/42");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json(), json!({ "id": 42, "name": "widget" }));
    assert_eq!(resp.header("content-type"), Some("application/json"));
}

#[test]
fn test_non_integer_path_param_is_client_error() {
    let resp = items_client().get("/items/abc");
    assert_eq!(resp.status, 422);
    let body = resp.json();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(
        body["violations"],
        json!([{ "location": "path", "field": "id", "reason": "expected integer, found string" }])
    );
}

#[test]
fn test_missing_required_body_field() {
    let resp = items_client().post("/items", json!({}));
    assert_eq!(resp.status, 422);
    assert_eq!(
        resp.json()["violations"],
        json!([{ "location": "body", "field": "name", "reason": "required field missing" }])
    );
}

#[test]
fn test_declared_success_status() {
    let resp = items_client().post("/items", json!({ "name": "bolt" }));
    assert_eq!(resp.status, 201);
    assert!(resp.is_success());
    assert_eq!(resp.json(), json!({ "id": 1, "name": "bolt" }));
}

#[test]
fn test_handler_error_surfaced_verbatim() {
    let resp = items_client().post("/items", json!({ "name": "taken" }));
    assert_eq!(resp.status, 409);
    assert_eq!(resp.json(), json!({ "detail": "Item name already taken" }));
}

#[test]
fn test_output_contract_violation_is_internal_error() {
    let resp = items_client().get("/broken");
    assert_eq!(resp.status, 500);
    let body = resp.json();
    assert_eq!(body["error"], "internal_error");
    assert!(body.get("violations").is_none());
    assert_eq!(body["request_id"], resp.header("x-request-id").unwrap());
}

#[test]
fn test_panicking_handler_is_internal_error() {
    let resp = items_client().get("/panics");
    assert_eq!(resp.status, 500);
    assert!(!resp.text().contains("database handle"));
}

#[test]
fn test_fault_details_never_leak() {
    let resp = items_client().get("/faults");
    assert_eq!(resp.status, 500);
    assert_eq!(resp.json()["error"], "internal_error");
    assert!(!resp.text().contains("postgres"));
}

#[test]
fn test_unknown_route_and_wrong_method() {
    let client = items_client();
    let resp = client.get("/nope");
    assert_eq!(resp.status, 404);
    assert_eq!(
        resp.json(),
        json!({ "error": "not_found", "path": "/nope", "method": "GET" })
    );
    assert_eq!(client.delete("/items/1").status, 404);
    let put = client.put("/items/1", json!({ "name": "bolt" }));
    assert_eq!(put.status, 404);
    assert!(!put.is_success());
}

#[test]
fn test_violations_from_every_location_reported_together() {
    let client = items_client();
    let resp = client.simulate_raw(
        "POST",
        "/items?verbose=1",
        "application/json",
        br#"{"name": 5, "colour": "red"}"#.to_vec(),
    );
    assert_eq!(resp.status, 422);
    let violations = resp.json()["violations"].as_array().unwrap().clone();
    assert_eq!(violations.len(), 2);
    assert!(violations.contains(&json!({
        "location": "body", "field": "name", "reason": "expected string, found integer"
    })));
    assert!(violations.contains(&json!({
        "location": "body", "field": "colour", "reason": "unknown field"
    })));

    let resp = client.get("/search?limit=many");
    let violations = resp.json()["violations"].as_array().unwrap().clone();
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().all(|v| v["location"] == "query"));
}

#[test]
fn test_query_defaults_and_coercion() {
    let client = items_client();
    assert_eq!(
        client.get("/search?q=bolt").json(),
        json!({ "q": "bolt", "limit": 10 })
    );
    assert_eq!(
        client.get("/search?q=a%20b&limit=3").json(),
        json!({ "q": "a b", "limit": 3 })
    );
}

#[test]
fn test_body_problems() {
    let client = items_client();

    let resp = client.simulate_raw("POST", "/items", "application/json", b"{not json".to_vec());
    assert_eq!(resp.status, 422);
    let reason = resp.json()["violations"][0]["reason"].as_str().unwrap().to_string();
    assert!(reason.starts_with("invalid JSON"), "{reason}");

    let resp = client.simulate_raw("POST", "/items", "text/plain", b"name=x".to_vec());
    assert_eq!(resp.status, 422);

    let resp = client.simulate("POST", "/items", None);
    assert_eq!(
        resp.json()["violations"],
        json!([{ "location": "body", "field": "$", "reason": "request body required" }])
    );
}

#[test]
fn test_oversized_body_rejected_before_routing() {
    let config = DispatcherConfig {
        max_body_bytes: 16,
        ..DispatcherConfig::default()
    };
    let client = TestClient::new(Dispatcher::with_config(
        Arc::new(common::items_api()),
        config,
    ));
    let resp = client.post("/items", json!({ "name": "a very long item name indeed" }));
    assert_eq!(resp.status, 413);
    assert_eq!(resp.json()["error"], "payload_too_large");
}

#[test]
fn test_request_id_echoed_or_generated() {
    let id = RequestId::new().to_string();
    let client = items_client().with_header("x-request-id", &id);
    assert_eq!(client.get("/items/1").header("x-request-id"), Some(id.as_str()));

    let generated = items_client().get("/items/1");
    let header = generated.header("x-request-id").unwrap();
    assert!(header.parse::<RequestId>().is_ok());
}

#[test]
fn test_trailing_slash_matches() {
    assert_eq!(items_client().get("/items/7/").json()["id"], 7);
}

#[test]
fn test_repeated_requests_hit_same_handler() {
    let client = items_client();
    for _ in 0..20 {
        assert_eq!(client.get("/items/5").json(), json!({ "id": 5, "name": "widget" }));
    }
}

#[test]
fn test_dispatcher_is_shareable_across_threads() {
    let client = items_client();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let client = client.clone();
            std::thread::spawn(move || client.get(&format!("/items/{i}")).json()["id"].clone())
        })
        .collect();
    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids, vec![json!(0), json!(1), json!(2), json!(3)]);
}

#[test]
fn test_handler_error_outside_error_range_is_fault() {
    let mut builder = Api::builder("t", "1");
    for (path, status) in [("/ok", 200u16), ("/redirect", 302), ("/bogus", 1000), ("/teapot", 418)] {
        builder
            .route(Route::new(Method::GET, path, move |_req| {
                Err(HandlerError::new(status, "declared"))
            }))
            .unwrap();
    }
    let client = TestClient::new(Dispatcher::new(Arc::new(builder.build())));

    for path in ["/ok", "/redirect", "/bogus"] {
        let resp = client.get(path);
        assert_eq!(resp.status, 500, "{path}");
        assert_eq!(resp.json()["error"], "internal_error");
    }
    let teapot = client.get("/teapot");
    assert_eq!(teapot.status, 418);
    assert_eq!(teapot.json(), json!({ "detail": "declared" }));
}
