#![allow(dead_code)]

use http::Method;
use schemagate::api::Api;
use schemagate::config::ServiceConfig;
use schemagate::dispatcher::{Dispatcher, HandlerError};
use schemagate::ledger::{build_api, LedgerStore};
use schemagate::router::Route;
use schemagate::schema::{Field, FieldType, Schema};
use schemagate::testing::TestClient;
use serde_json::json;
use std::sync::Arc;

/// `GET /items/{id}`, `POST /items` and a few misbehaving routes
pub fn items_api() -> Api {
    let mut builder = Api::builder("Items", "1.0.0");
    let item = builder
        .schema(
            "Item",
            Schema::new()
                .field(Field::required("id", FieldType::Integer))
                .field(Field::required("name", FieldType::String)),
        )
        .unwrap();
    let new_item = builder
        .schema(
            "NewItem",
            Schema::new().field(Field::required("name", FieldType::String)),
        )
        .unwrap();

    builder
        .route(
            Route::new(Method::GET, "/items/{id}", |req| {
                Ok(json!({ "id": req.path_param_i64("id")?, "name": "widget" }))
            })
            .path_param("id", FieldType::Integer)
            .output(FieldType::of(&item)),
        )
        .unwrap();
    builder
        .route(
            Route::new(Method::POST, "/items", |req| {
                let name = req
                    .body
                    .as_ref()
                    .and_then(|b| b["name"].as_str())
                    .unwrap_or_default()
                    .to_string();
                if name == "taken" {
                    return Err(HandlerError::conflict("Item name already taken"));
                }
                Ok(json!({ "id": 1, "name": name }))
            })
            .input(FieldType::of(&new_item))
            .output(FieldType::of(&item))
            .status(201),
        )
        .unwrap();
    builder
        .route(
            Route::new(Method::GET, "/broken", |_req| Ok(json!({ "id": 1 })))
                .output(FieldType::of(&item)),
        )
        .unwrap();
    builder
        .route(Route::new(Method::GET, "/panics", |_req| {
            panic!("database handle vanished")
        }))
        .unwrap();
    builder
        .route(Route::new(Method::GET, "/faults", |_req| {
            Err(HandlerError::fault(anyhow::anyhow!(
                "connection string postgres://secret@db"
            )))
        }))
        .unwrap();
    builder
        .route(
            Route::new(Method::GET, "/search", |req| {
                Ok(json!({
                    "q": req.query_param("q"),
                    "limit": req.query_param("limit"),
                }))
            })
            .query_param("q", FieldType::String, true)
            .query_param_default("limit", FieldType::Integer, json!(10)),
        )
        .unwrap();
    builder.build()
}

pub fn items_client() -> TestClient {
    TestClient::new(Dispatcher::new(Arc::new(items_api())))
}

/// Ledger client over a fresh store holding Alice (1000), Bob (500) and Charlie (300)
pub fn ledger_client() -> (TestClient, Arc<LedgerStore>) {
    let store = Arc::new(LedgerStore::with_demo_accounts());
    let api = build_api(Arc::clone(&store), &ServiceConfig::default()).unwrap();
    (TestClient::new(Dispatcher::new(Arc::new(api))), store)
}
