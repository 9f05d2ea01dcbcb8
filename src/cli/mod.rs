//! # CLI Module
//!
//! Command-line entry points for the `schemagate` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Run the ledger service over HTTP until SIGINT/SIGTERM:
//!
//! ```bash
//! schemagate --config ledger.yaml serve --addr 0.0.0.0:8080 --seed-demo
//! ```
//!
//! ### `docs`
//!
//! Print the generated API description without starting a server:
//!
//! ```bash
//! schemagate docs --format yaml --output openapi.yaml
//! schemagate docs --format html > docs.html
//! ```
//!
//! ### `routes`
//!
//! List the route table in registration order.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{render_docs, run_cli, Cli, Commands, DocsFormat};
