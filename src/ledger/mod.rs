//! # Ledger Service
//!
//! Reference service built on the core: in-memory bank accounts and cash
//! transfers between them.
//!
//! | Route | Behaviour |
//! |---|---|
//! | `GET /` | `{"Hello": "World"}` |
//! | `POST /accounts` | open an account, returns it with its assigned id |
//! | `GET /accounts` | all accounts |
//! | `GET /accounts/{id}` | one account, 404 `Account with id {id} does not exist` |
//! | `POST /transactions` | transfer cash; every attempt is recorded |
//! | `GET /transactions` | every recorded attempt |
//!
//! Transfer rules are applied in order after the attempt is recorded with
//! `success = false`: negative amount (400), same source and destination (400),
//! unknown source (404), unknown destination (404), insufficient funds (400),
//! destination balance leaving the finite range (400).

mod handlers;
mod schemas;
mod store;

pub use schemas::LedgerSchemas;
pub use store::{
    Account, LedgerStore, NewAccount, Transaction, TransferError, TransferRequest,
};

use crate::api::Api;
use crate::config::ServiceConfig;
use crate::error::BuildError;
use crate::router::Route;
use crate::schema::FieldType;
use http::Method;
use std::sync::Arc;

/// Assemble the ledger [`Api`] over `store`.
///
/// # Errors
///
/// Only on an internally inconsistent route or schema declaration.
pub fn build_api(store: Arc<LedgerStore>, config: &ServiceConfig) -> Result<Api, BuildError> {
    let mut builder = Api::builder(&config.service.title, &config.service.version)
        .allow_extra_fields(config.schema.allow_extra_fields);
    if let Some(text) = &config.service.description {
        builder = builder.description(text);
    }

    let s = LedgerSchemas::register(&mut builder)?;

    builder.route(
        Route::new(Method::GET, "/", handlers::root)
            .summary("Greeting")
            .operation_id("read_root"),
    )?;
    builder.route(
        Route::new(
            Method::POST,
            "/accounts",
            handlers::create_account(Arc::clone(&store)),
        )
        .input(FieldType::of(&s.create_account))
        .output(FieldType::of(&s.account))
        .summary("Create an account")
        .operation_id("create_account"),
    )?;
    builder.route(
        Route::new(
            Method::GET,
            "/accounts",
            handlers::list_accounts(Arc::clone(&store)),
        )
        .output(FieldType::array_of(FieldType::of(&s.account)))
        .summary("Retrieve all accounts")
        .operation_id("retrieve_accounts"),
    )?;
    builder.route(
        Route::new(
            Method::GET,
            "/accounts/{id}",
            handlers::get_account(Arc::clone(&store)),
        )
        .path_param("id", FieldType::Integer)
        .output(FieldType::of(&s.account))
        .summary("Retrieve an account by id")
        .operation_id("retrieve_account"),
    )?;
    builder.route(
        Route::new(
            Method::POST,
            "/transactions",
            handlers::create_transaction(Arc::clone(&store)),
        )
        .input(FieldType::of(&s.create_transaction))
        .output(FieldType::of(&s.transaction))
        .summary("Transfer cash between two accounts")
        .description(
            "Records the attempt, then moves the amount from the source to the \
             destination account if every rule passes.",
        )
        .operation_id("process_transaction"),
    )?;
    builder.route(
        Route::new(
            Method::GET,
            "/transactions",
            handlers::list_transactions(store),
        )
        .output(FieldType::array_of(FieldType::of(&s.transaction)))
        .summary("Retrieve all transactions")
        .operation_id("retrieve_transactions"),
    )?;

    Ok(builder.build())
}
