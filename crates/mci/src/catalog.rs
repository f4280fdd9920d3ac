//! Consumer-facing view of a resolved tool collection.
//!
//! A protocol server lists [`ToolDefinition`]s and routes calls through
//! [`ToolCatalog::dispatch`] to an external [`ToolExecutor`]. Nothing here
//! interprets an execution payload.

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue, json};
use thiserror::Error;

use crate::env::EnvironmentMapping;
use crate::schema::{Tool, ToolCollection};

/// Runs one tool. Template substitution and the execution itself belong to
/// the implementor.
pub trait ToolExecutor {
    fn execute(
        &self,
        tool: &Tool,
        arguments: &JsonMap<String, JsonValue>,
        env: &EnvironmentMapping,
    ) -> anyhow::Result<JsonValue>;
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("tool '{tool}' failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Tool listing entry in the shape protocol servers expect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<JsonValue>,
}

/// Resolved tools plus the environment they run with.
pub struct ToolCatalog {
    tools: ToolCollection,
    env: EnvironmentMapping,
}

impl ToolCatalog {
    pub fn new(tools: ToolCollection, env: EnvironmentMapping) -> Self {
        tracing::debug!("initialized ToolCatalog (tools={})", tools.len());
        Self { tools, env }
    }

    pub fn tools(&self) -> &ToolCollection {
        &self.tools
    }

    pub fn env(&self) -> &EnvironmentMapping {
        &self.env
    }

    /// Listing entries in resolution order.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema: normalize_input_schema(tool.input_schema.as_ref()),
                annotations: tool.annotations.clone(),
            })
            .collect()
    }

    /// Look `name` up and hand it to `executor`.
    pub fn dispatch(
        &self,
        name: &str,
        arguments: &JsonMap<String, JsonValue>,
        executor: &dyn ToolExecutor,
    ) -> Result<JsonValue, CatalogError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| CatalogError::UnknownTool(name.to_string()))?;
        tracing::info!("dispatch: tool={}, source={}", tool.name, tool.source_toolset);
        executor
            .execute(tool, arguments, &self.env)
            .map_err(|source| CatalogError::Execution {
                tool: name.to_string(),
                source,
            })
    }
}

/// Missing or empty schema becomes an empty object schema; a schema without a
/// `type` is treated as the property map of an object schema.
pub fn normalize_input_schema(schema: Option<&JsonValue>) -> JsonValue {
    match schema {
        None | Some(JsonValue::Null) => empty_object_schema(),
        Some(JsonValue::Object(map)) if map.is_empty() => empty_object_schema(),
        Some(JsonValue::Object(map)) if !map.contains_key("type") => {
            json!({"type": "object", "properties": map})
        }
        Some(other) => other.clone(),
    }
}

fn empty_object_schema() -> JsonValue {
    json!({"type": "object", "properties": {}})
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder {
        calls: RefCell<Vec<String>>,
    }

    impl ToolExecutor for Recorder {
        fn execute(
            &self,
            tool: &Tool,
            arguments: &JsonMap<String, JsonValue>,
            env: &EnvironmentMapping,
        ) -> anyhow::Result<JsonValue> {
            self.calls.borrow_mut().push(tool.name.clone());
            if tool.name == "fails" {
                anyhow::bail!("boom");
            }
            Ok(json!({"args": arguments, "token": env.get("TOKEN")}))
        }
    }

    fn catalog() -> ToolCatalog {
        let mut with_schema = Tool::named("typed");
        with_schema.input_schema = Some(json!({"type": "object", "required": ["q"]}));
        with_schema.annotations = Some(json!({"readOnlyHint": true}));
        let mut bare_props = Tool::named("props");
        bare_props.input_schema = Some(json!({"q": {"type": "string"}}));
        let tools = [Tool::named("plain"), with_schema, bare_props, Tool::named("fails")]
            .into_iter()
            .collect();
        ToolCatalog::new(tools, [("TOKEN", "t0k")].into_iter().collect())
    }

    #[test]
    fn definitions_normalise_schemas() {
        let defs = catalog().tool_definitions();
        assert_eq!(defs.len(), 4);
        assert_eq!(defs[0].input_schema, json!({"type": "object", "properties": {}}));
        assert_eq!(defs[1].input_schema["required"], json!(["q"]));
        assert_eq!(defs[1].annotations, Some(json!({"readOnlyHint": true})));
        assert_eq!(
            defs[2].input_schema,
            json!({"type": "object", "properties": {"q": {"type": "string"}}})
        );
        let wire = serde_json::to_value(&defs[0]).unwrap();
        assert!(wire.get("inputSchema").is_some());
        assert!(wire.get("annotations").is_none());
    }

    #[test]
    fn dispatch_routes_by_exact_name() {
        let cat = catalog();
        let exec = Recorder {
            calls: RefCell::new(Vec::new()),
        };
        let mut args = JsonMap::new();
        args.insert("q".into(), json!("hi"));
        let out = cat.dispatch("plain", &args, &exec).unwrap();
        assert_eq!(out["token"], json!("t0k"));
        assert_eq!(out["args"]["q"], json!("hi"));

        assert!(matches!(
            cat.dispatch("Plain", &args, &exec),
            Err(CatalogError::UnknownTool(_))
        ));
        let err = cat.dispatch("fails", &args, &exec).unwrap_err();
        assert_eq!(err.to_string(), "tool 'fails' failed: boom");
        assert_eq!(*exec.calls.borrow(), vec!["plain", "fails"]);
    }
}
