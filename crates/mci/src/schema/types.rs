use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::servers::ServerDeclaration;
use crate::filter::FilterSpec;

/// Provenance label for tools declared directly in the root schema.
pub const MAIN_SOURCE: &str = "main";

/// One tool definition. Payload fields are carried opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Toolset that declared this tool, or [`MAIN_SOURCE`].
    #[serde(skip)]
    pub source_toolset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<JsonValue>,
    /// Fields this crate does not model.
    #[serde(flatten)]
    pub extra: JsonMap<String, JsonValue>,
}

impl Tool {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            tags: BTreeSet::new(),
            source_toolset: MAIN_SOURCE.to_string(),
            input_schema: None,
            execution: None,
            annotations: None,
            extra: JsonMap::new(),
        }
    }

    /// The `type` field of the execution payload, if any.
    pub fn execution_type(&self) -> Option<&str> {
        self.execution.as_ref()?.get("type")?.as_str()
    }
}

/// An entry of a `toolsets` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsetReference {
    /// Name as written, before `{{env.*}}` substitution.
    pub name: String,
    pub filter: Option<FilterSpec>,
}

/// Ordered tools with unique names. Inserting an existing name replaces the
/// earlier tool in its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCollection {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or override. Returns the replaced tool.
    pub fn insert(&mut self, tool: Tool) -> Option<Tool> {
        match self.index.get(&tool.name) {
            Some(&pos) => Some(std::mem::replace(&mut self.tools[pos], tool)),
            None => {
                self.index.insert(tool.name.clone(), self.tools.len());
                self.tools.push(tool);
                None
            }
        }
    }

    /// Merge `other` over `self`; tools from `other` win.
    pub fn extend(&mut self, other: ToolCollection) {
        for tool in other.tools {
            if let Some(old) = self.insert(tool) {
                tracing::debug!(
                    "tool '{}' from '{}' overridden",
                    old.name,
                    old.source_toolset
                );
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&pos| &self.tools[pos])
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Tool) -> bool) {
        self.tools.retain(|t| keep(t));
        self.index = self
            .tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tool> {
        self.tools.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl FromIterator<Tool> for ToolCollection {
    fn from_iter<I: IntoIterator<Item = Tool>>(iter: I) -> Self {
        let mut out = ToolCollection::new();
        for t in iter {
            out.insert(t);
        }
        out
    }
}

impl IntoIterator for ToolCollection {
    type Item = Tool;
    type IntoIter = std::vec::IntoIter<Tool>;

    fn into_iter(self) -> Self::IntoIter {
        self.tools.into_iter()
    }
}

impl<'a> IntoIterator for &'a ToolCollection {
    type Item = &'a Tool;
    type IntoIter = std::slice::Iter<'a, Tool>;

    fn into_iter(self) -> Self::IntoIter {
        self.tools.iter()
    }
}

/// Whether a file is the root schema or a toolset file; decides the required
/// fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Root,
    Toolset,
}

impl FileRole {
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            FileRole::Root => &["schemaVersion", "metadata"],
            FileRole::Toolset => &["schemaVersion"],
        }
    }
}

/// A parsed and validated schema or toolset file.
#[derive(Debug, Clone)]
pub struct SchemaFile {
    pub path: PathBuf,
    pub tools: Vec<Tool>,
    pub toolsets: Vec<ToolsetReference>,
    /// Only honoured on the root.
    pub library_dir: Option<String>,
    pub servers: Vec<ServerDeclaration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn override_replaces_in_place() {
        let mut c: ToolCollection = ["a", "b", "c"].into_iter().map(Tool::named).collect();
        let mut b = Tool::named("b");
        b.source_toolset = "other".into();
        let old = c.insert(b).unwrap();
        assert_eq!(old.source_toolset, MAIN_SOURCE);
        assert_eq!(c.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(c.get("b").unwrap().source_toolset, "other");
    }

    #[test]
    fn retain_keeps_index_consistent() {
        let mut c: ToolCollection = ["a", "b", "c"].into_iter().map(Tool::named).collect();
        c.retain(|t| t.name != "a");
        assert!(c.get("a").is_none());
        assert_eq!(c.get("c").unwrap().name, "c");
        c.insert(Tool::named("c"));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn tool_passes_unknown_fields_and_dedupes_tags() {
        let raw = json!({
            "name": "echo",
            "tags": ["demo", "demo", "x"],
            "inputSchema": {"type": "object"},
            "execution": {"type": "text", "text": "hi"},
            "x-custom": {"k": 1}
        });
        let tool: Tool = serde_json::from_value(raw).unwrap();
        assert_eq!(tool.tags.len(), 2);
        assert_eq!(tool.execution_type(), Some("text"));
        assert_eq!(tool.extra.get("x-custom"), Some(&json!({"k": 1})));
        let back = serde_json::to_value(&tool).unwrap();
        assert_eq!(back["x-custom"], json!({"k": 1}));
        assert!(back.get("sourceToolset").is_none());
    }
}
