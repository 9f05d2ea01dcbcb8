use super::store::{LedgerStore, NewAccount, TransferRequest};
use crate::dispatcher::{HandlerError, HandlerRequest, HandlerResult};
use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

fn to_json<T: Serialize>(value: &T) -> HandlerResult {
    serde_json::to_value(value)
        .context("Failed to serialise ledger record")
        .map_err(HandlerError::from)
}

pub fn root(_req: &HandlerRequest) -> HandlerResult {
    Ok(json!({ "Hello": "World" }))
}

pub fn create_account(store: Arc<LedgerStore>) -> impl Fn(&HandlerRequest) -> HandlerResult {
    move |req| {
        let new: NewAccount = req.body_as()?;
        to_json(&store.create_account(new))
    }
}

pub fn list_accounts(store: Arc<LedgerStore>) -> impl Fn(&HandlerRequest) -> HandlerResult {
    move |_req| to_json(&store.accounts())
}

pub fn get_account(store: Arc<LedgerStore>) -> impl Fn(&HandlerRequest) -> HandlerResult {
    move |req| {
        let id = req.path_param_i64("id")?;
        store
            .account(id)
            .ok_or_else(|| HandlerError::not_found(format!("Account with id {id} does not exist")))
            .and_then(|account| to_json(&account))
    }
}

pub fn create_transaction(store: Arc<LedgerStore>) -> impl Fn(&HandlerRequest) -> HandlerResult {
    move |req| {
        let transfer: TransferRequest = req.body_as()?;
        match store.transfer(&transfer) {
            Ok(tx) => to_json(&tx),
            Err(e) => Err(HandlerError::new(e.status(), e.to_string())),
        }
    }
}

pub fn list_transactions(store: Arc<LedgerStore>) -> impl Fn(&HandlerRequest) -> HandlerResult {
    move |_req| to_json(&store.transactions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RequestId;
    use http::Method;
    use serde_json::{Map, Value};

    fn request(path_params: Value, body: Option<Value>) -> HandlerRequest {
        HandlerRequest {
            request_id: RequestId::new(),
            method: Method::GET,
            path: "/".to_string(),
            path_params: path_params.as_object().cloned().unwrap_or_default(),
            query_params: Map::new(),
            headers: Default::default(),
            body,
        }
    }

    #[test]
    fn test_get_missing_account() {
        let handler = get_account(Arc::new(LedgerStore::new()));
        match handler(&request(json!({ "id": 7 }), None)) {
            Err(HandlerError::Status { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Account with id 7 does not exist");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_create_account_assigns_id() {
        let store = Arc::new(LedgerStore::new());
        let handler = create_account(Arc::clone(&store));
        let out = handler(&request(
            json!({}),
            Some(json!({ "name": "Eve", "available_cash": 10.5 })),
        ))
        .unwrap();
        assert_eq!(out, json!({ "id": 1, "name": "Eve", "available_cash": 10.5 }));
        assert_eq!(store.accounts().len(), 1);
    }
}
