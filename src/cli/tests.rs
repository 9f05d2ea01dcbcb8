use crate::cli::{render_docs, Cli, Commands, DocsFormat};
use crate::config::ServiceConfig;
use crate::ledger::{build_api, LedgerStore};
use clap::Parser;
use std::sync::Arc;

#[test]
fn test_serve_parses() {
    let cli = Cli::try_parse_from([
        "schemagate",
        "--config",
        "ledger.yaml",
        "serve",
        "--addr",
        "0.0.0.0:9000",
        "--seed-demo",
    ])
    .unwrap();
    assert_eq!(cli.config.unwrap().to_string_lossy(), "ledger.yaml");
    match cli.command {
        Commands::Serve { addr, seed_demo } => {
            assert_eq!(addr.as_deref(), Some("0.0.0.0:9000"));
            assert!(seed_demo);
        }
        other => panic!("Expected Serve command, got {other:?}"),
    }
}

#[test]
fn test_docs_defaults_to_json() {
    let cli = Cli::try_parse_from(["schemagate", "docs"]).unwrap();
    match cli.command {
        Commands::Docs { format, output } => {
            assert_eq!(format, DocsFormat::Json);
            assert!(output.is_none());
        }
        other => panic!("Expected Docs command, got {other:?}"),
    }
}

#[test]
fn test_unknown_format_rejected() {
    assert!(Cli::try_parse_from(["schemagate", "docs", "--format", "pdf"]).is_err());
}

#[test]
fn test_render_docs_formats() {
    let api = build_api(Arc::new(LedgerStore::new()), &ServiceConfig::default()).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&render_docs(&api, DocsFormat::Json).unwrap()).unwrap();
    assert_eq!(json["openapi"], "3.1.0");

    let yaml = render_docs(&api, DocsFormat::Yaml).unwrap();
    assert!(yaml.contains("/accounts/{id}"));

    let html = render_docs(&api, DocsFormat::Html).unwrap();
    assert!(html.contains("<!DOCTYPE html>"));
}

#[test]
fn test_docs_written_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("openapi.yaml");
    let cli = Cli::try_parse_from([
        "schemagate",
        "docs",
        "--format",
        "yaml",
        "--output",
        out.to_str().unwrap(),
    ])
    .unwrap();
    super::commands::run(cli).unwrap();
    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains("openapi:"));
    assert!(written.contains("/transactions"));
}
