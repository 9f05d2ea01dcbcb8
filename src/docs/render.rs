use super::generate::{ApiDescription, MediaType};
use anyhow::Context;
use minijinja::{context, Environment, Value as TemplateValue};
use serde::Serialize;
use std::collections::BTreeMap;

const DOCS_TEMPLATE: &str = include_str!("../../templates/docs.html");

#[derive(Serialize)]
struct PathView {
    path: String,
    operations: Vec<OperationView>,
}

#[derive(Serialize)]
struct OperationView {
    method: String,
    operation_id: String,
    summary: Option<String>,
    description: Option<String>,
    parameters: Vec<ParameterView>,
    request_body: Option<String>,
    responses: Vec<ResponseView>,
}

#[derive(Serialize)]
struct ParameterView {
    name: String,
    location: String,
    required: bool,
    schema: String,
}

#[derive(Serialize)]
struct ResponseView {
    status: String,
    description: String,
    schema: Option<String>,
}

#[derive(Serialize)]
struct SchemaView {
    name: String,
    body: String,
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn content_schema(content: &BTreeMap<String, MediaType>) -> Option<String> {
    content.values().next().map(|m| pretty(&m.schema))
}

fn path_views(description: &ApiDescription) -> Vec<PathView> {
    description
        .paths
        .iter()
        .map(|(path, operations)| PathView {
            path: path.clone(),
            operations: operations
                .iter()
                .map(|(method, op)| OperationView {
                    method: method.to_ascii_uppercase(),
                    operation_id: op.operation_id.clone(),
                    summary: op.summary.clone(),
                    description: op.description.clone(),
                    parameters: op
                        .parameters
                        .iter()
                        .map(|p| ParameterView {
                            name: p.name.clone(),
                            location: p.location.clone(),
                            required: p.required,
                            schema: p.schema.to_string(),
                        })
                        .collect(),
                    request_body: op
                        .request_body
                        .as_ref()
                        .and_then(|b| content_schema(&b.content)),
                    responses: op
                        .responses
                        .iter()
                        .map(|(status, r)| ResponseView {
                            status: status.clone(),
                            description: r.description.clone(),
                            schema: r.content.as_ref().and_then(content_schema),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

/// JSON safe to embed inside a `<script>` element
fn script_safe_json(description: &ApiDescription) -> anyhow::Result<String> {
    let raw = serde_json::to_string(description).context("Failed to serialise API description")?;
    Ok(raw
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

/// Render the browsable HTML page for `description`.
///
/// Each path is listed once with its operations grouped beneath it, each schema
/// once, and the full description is embedded as JSON for client-side tooling.
///
/// # Errors
///
/// Template compilation or rendering failure.
pub fn render_interactive(
    description: &ApiDescription,
    openapi_json_path: Option<&str>,
) -> anyhow::Result<String> {
    let mut env = Environment::new();
    env.add_template("docs.html", DOCS_TEMPLATE)
        .context("Failed to compile documentation template")?;
    let template = env
        .get_template("docs.html")
        .context("Documentation template missing")?;

    let schemas: Vec<SchemaView> = description
        .components
        .schemas
        .iter()
        .map(|(name, schema)| SchemaView {
            name: name.clone(),
            body: pretty(schema),
        })
        .collect();

    template
        .render(context! {
            title => description.info.title.as_str(),
            version => description.info.version.as_str(),
            description => description.info.description.as_deref(),
            openapi_json_path => openapi_json_path,
            paths => path_views(description),
            schemas => schemas,
            raw_json => TemplateValue::from_safe_string(script_safe_json(description)?),
        })
        .context("Failed to render documentation page")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::generate::{Components, InfoObject};

    fn empty(title: &str) -> ApiDescription {
        ApiDescription {
            openapi: "3.1.0".to_string(),
            info: InfoObject {
                title: title.to_string(),
                version: "1".to_string(),
                description: None,
            },
            paths: BTreeMap::new(),
            components: Components {
                schemas: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn test_title_is_escaped() {
        let html = render_interactive(&empty("<b>Ledger</b>"), None).unwrap();
        assert!(html.contains("&lt;b&gt;Ledger&lt;&#x2f;b&gt;"));
        assert!(!html.contains("<b>Ledger</b>"));
    }

    #[test]
    fn test_embedded_json_cannot_close_script() {
        let html = render_interactive(&empty("</script>"), None).unwrap();
        let script_start = html.find("id=\"api-description\"").unwrap();
        let tail = &html[script_start..];
        let close = tail.find("</script>").unwrap();
        assert!(tail[..close].contains("\\u003c/script\\u003e"));
    }

    #[test]
    fn test_json_link_optional() {
        let html = render_interactive(&empty("t"), Some("/openapi.json")).unwrap();
        assert!(html.contains("href=\"&#x2f;openapi.json\""));
        let html = render_interactive(&empty("t"), None).unwrap();
        assert!(!html.contains("openapi.json"));
    }
}
