use std::process::ExitCode;

use anyhow::Context as _;
use serde::Serialize;
use serde_json::Value as JsonValue;

use mci::catalog::normalize_input_schema;
use mci::config::UserConfig;
use mci::{Resolution, Tool, pipeline};

use super::{print_warnings, request_for};
use crate::cli::{ListArgs, OutputFormat};

#[derive(Debug, Serialize)]
struct ListDocument<'a> {
    mci_file: String,
    filters_applied: Vec<String>,
    total: usize,
    tools: Vec<ListedTool<'a>>,
}

#[derive(Debug, Serialize)]
struct ListedTool<'a> {
    name: &'a str,
    source: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    execution_type: Option<&'a str>,
    #[serde(rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    input_schema: Option<JsonValue>,
}

impl<'a> ListedTool<'a> {
    fn new(tool: &'a Tool, verbose: bool) -> Self {
        Self {
            name: &tool.name,
            source: &tool.source_toolset,
            description: tool.description.as_deref().unwrap_or_default(),
            tags: verbose.then(|| tool.tags.iter().map(String::as_str).collect()),
            execution_type: if verbose { tool.execution_type() } else { None },
            input_schema: verbose.then(|| normalize_input_schema(tool.input_schema.as_ref())),
        }
    }
}

fn document(res: &Resolution, verbose: bool) -> ListDocument<'_> {
    ListDocument {
        mci_file: res.schema_path.display().to_string(),
        filters_applied: res.filters.iter().map(|f| f.to_string()).collect(),
        total: res.tools.len(),
        tools: res.tools.iter().map(|t| ListedTool::new(t, verbose)).collect(),
    }
}

fn render_text(doc: &ListDocument<'_>) -> String {
    let mut out = format!("{} tool(s) from {}", doc.total, doc.mci_file);
    if !doc.filters_applied.is_empty() {
        out.push_str(&format!(" (filters: {})", doc.filters_applied.join(" AND ")));
    }
    out.push('\n');
    let width = doc.tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for t in &doc.tools {
        out.push_str(&format!("  {:<width$}  [{}]", t.name, t.source, width = width));
        if !t.description.is_empty() {
            out.push_str(&format!("  {}", t.description));
        }
        out.push('\n');
        if let Some(tags) = &t.tags
            && !tags.is_empty()
        {
            out.push_str(&format!("      tags: {}\n", tags.join(", ")));
        }
        if let Some(kind) = t.execution_type {
            out.push_str(&format!("      execution: {}\n", kind));
        }
    }
    out
}

pub fn run(args: ListArgs, user_cfg: Option<&UserConfig>) -> anyhow::Result<ExitCode> {
    let filters = if args.filters.is_empty() {
        let defaults = user_cfg.map(UserConfig::default_filters).unwrap_or_default();
        if !defaults.is_empty() {
            tracing::debug!("using default filters from config: {:?}", defaults);
        }
        defaults.to_vec()
    } else {
        args.filters
    };
    let request = request_for(&args.source)?.with_filters(filters);
    let res = pipeline::resolve(&request).context("failed to resolve tools")?;
    print_warnings(&res.warnings);

    let doc = document(&res, args.verbose);
    let rendered = match args.format {
        OutputFormat::Text => render_text(&doc),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&doc).context("failed to render JSON")? + "\n"
        }
        OutputFormat::Yaml => serde_yaml::to_string(&doc).context("failed to render YAML")?,
    };
    print!("{}", rendered);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mci::ResolutionRequest;
    use serde_json::json;

    fn resolved(filters: &[&str]) -> (tempfile::TempDir, Resolution) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("mci.json"),
            json!({
                "schemaVersion": "1.0",
                "metadata": {},
                "tools": [
                    {"name": "echo_test", "description": "Echo", "tags": ["demo"],
                     "execution": {"type": "text", "text": "hi"}},
                    {"name": "raw", "inputSchema": {"q": {"type": "string"}}}
                ]
            })
            .to_string(),
        )
        .unwrap();
        let req = ResolutionRequest::new(dir.path()).with_filters(filters.iter().copied());
        let res = pipeline::resolve(&req).unwrap();
        (dir, res)
    }

    #[test]
    fn json_document_shape() {
        let (_dir, res) = resolved(&["tags:demo"]);
        let value = serde_json::to_value(document(&res, false)).unwrap();
        assert_eq!(value["total"], json!(1));
        assert_eq!(value["filters_applied"], json!(["tags:demo"]));
        assert_eq!(
            value["tools"],
            json!([{"name": "echo_test", "source": "main", "description": "Echo"}])
        );
    }

    #[test]
    fn verbose_adds_tags_execution_and_schema() {
        let (_dir, res) = resolved(&[]);
        let value = serde_json::to_value(document(&res, true)).unwrap();
        assert_eq!(value["tools"][0]["tags"], json!(["demo"]));
        assert_eq!(value["tools"][0]["execution_type"], json!("text"));
        assert_eq!(
            value["tools"][1]["inputSchema"],
            json!({"type": "object", "properties": {"q": {"type": "string"}}})
        );
        assert!(value["tools"][1].get("execution_type").is_none());
    }

    #[test]
    fn text_lists_name_and_source() {
        let (_dir, res) = resolved(&[]);
        let text = render_text(&document(&res, false));
        assert!(text.starts_with("2 tool(s) from "));
        assert!(text.contains("  echo_test  [main]  Echo\n"));
        assert!(text.contains("  raw        [main]\n"));
    }
}
