//! Schema and toolset file parsers.
//!
//! Both formats parse into a `serde_json::Value` document so the rest of the
//! loader works on one representation. Structural validation happens once in
//! [`schema_file_from_value`].

use std::path::Path;

use serde_json::Value as JsonValue;

use super::finder::SchemaFormat;
use super::servers::parse_servers;
use super::types::{FileRole, SchemaFile, Tool, ToolsetReference};
use crate::error::{ResolveError, ResolveResult};
use crate::filter::FilterSpec;

/// Parser trait implemented once per serialisation family.
pub trait SchemaParser {
    const FORMAT: SchemaFormat;

    fn supports(path: &Path) -> bool {
        SchemaFormat::from_path(path) == Some(Self::FORMAT)
    }

    /// Parse raw text; the error string is the underlying parser's diagnostic.
    fn parse_value(content: &str) -> Result<JsonValue, String>;
}

pub struct JsonSchemaParser;

impl SchemaParser for JsonSchemaParser {
    const FORMAT: SchemaFormat = SchemaFormat::Json;

    fn parse_value(content: &str) -> Result<JsonValue, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }
}

pub struct YamlSchemaParser;

impl SchemaParser for YamlSchemaParser {
    const FORMAT: SchemaFormat = SchemaFormat::Yaml;

    fn parse_value(content: &str) -> Result<JsonValue, String> {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }
}

/// Parse `content` in the given format.
pub fn parse_with(format: SchemaFormat, content: &str) -> Result<JsonValue, String> {
    match format {
        SchemaFormat::Json => JsonSchemaParser::parse_value(content),
        SchemaFormat::Yaml => YamlSchemaParser::parse_value(content),
    }
}

/// Parse the text of `path`, picking the parser by extension.
pub fn parse_document(content: &str, path: &Path) -> ResolveResult<JsonValue> {
    let format = if JsonSchemaParser::supports(path) {
        SchemaFormat::Json
    } else if YamlSchemaParser::supports(path) {
        SchemaFormat::Yaml
    } else {
        return Err(ResolveError::Schema {
            path: path.to_path_buf(),
            message: "unsupported file extension (expected .json, .yaml or .yml)".to_string(),
        });
    };
    parse_with(format, content).map_err(|message| ResolveError::Parse {
        path: path.to_path_buf(),
        format: format.name(),
        message,
    })
}

/// Read, parse and validate one file.
pub fn read_schema_file(path: &Path, role: FileRole) -> ResolveResult<SchemaFile> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ResolveError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ResolveError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let doc = parse_document(&content, path)?;
    tracing::debug!("parsed {:?} file {}", role, path.display());
    schema_file_from_value(path, role, doc)
}

/// Validate a parsed document and pull out the parts the loader needs.
pub fn schema_file_from_value(
    path: &Path,
    role: FileRole,
    doc: JsonValue,
) -> ResolveResult<SchemaFile> {
    let schema_error = |message: String| ResolveError::Schema {
        path: path.to_path_buf(),
        message,
    };

    let Some(obj) = doc.as_object() else {
        return Err(schema_error("top level must be an object".to_string()));
    };

    let missing: Vec<&str> = role
        .required_fields()
        .iter()
        .copied()
        .filter(|f| obj.get(*f).is_none_or(JsonValue::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(schema_error(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )));
    }

    let tools = match obj.get("tools") {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(JsonValue::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value::<Tool>(item.clone())
                    .map_err(|e| schema_error(format!("tools[{}]: {}", i, e)))
            })
            .collect::<ResolveResult<Vec<_>>>()?,
        Some(_) => return Err(schema_error("'tools' must be an array".to_string())),
    };

    let toolsets = match obj.get("toolsets") {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(JsonValue::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                parse_reference(item).map_err(|e| schema_error(format!("toolsets[{}]: {}", i, e)))
            })
            .collect::<ResolveResult<Vec<_>>>()?,
        Some(_) => return Err(schema_error("'toolsets' must be an array".to_string())),
    };

    let library_dir = match obj.get("libraryDir") {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::String(s)) => Some(s.clone()),
        Some(_) => return Err(schema_error("'libraryDir' must be a string".to_string())),
    };

    Ok(SchemaFile {
        path: path.to_path_buf(),
        tools,
        toolsets,
        library_dir,
        servers: parse_servers(&doc),
    })
}

/// Bare string or `{name, filter?, filterValue?}`.
fn parse_reference(item: &JsonValue) -> Result<ToolsetReference, String> {
    match item {
        JsonValue::String(name) => Ok(ToolsetReference {
            name: non_empty_name(name)?,
            filter: None,
        }),
        JsonValue::Object(map) => {
            let name = map
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| "object reference needs a string 'name'".to_string())
                .and_then(non_empty_name)?;
            let kind = optional_str(map.get("filter"), "filter")?;
            let values = optional_str(map.get("filterValue"), "filterValue")?;
            let filter = match (kind, values) {
                (None, None) => None,
                (Some(kind), Some(values)) => Some(
                    FilterSpec::from_parts(kind, values)
                        .map_err(|e| format!("toolset '{}': {}", name, e))?,
                ),
                (Some(_), None) => {
                    return Err(format!("toolset '{}': 'filter' requires 'filterValue'", name));
                }
                (None, Some(_)) => {
                    return Err(format!("toolset '{}': 'filterValue' requires 'filter'", name));
                }
            };
            Ok(ToolsetReference { name, filter })
        }
        _ => Err("expected a toolset name or an object with a 'name'".to_string()),
    }
}

fn non_empty_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        Err("toolset name must not be empty".to_string())
    } else {
        Ok(name.to_string())
    }
}

fn optional_str<'a>(value: Option<&'a JsonValue>, field: &str) -> Result<Option<&'a str>, String> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(format!("'{}' must be a string", field)),
    }
}
