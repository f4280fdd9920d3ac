//! In-place editing of a root schema's `toolsets` array.
//!
//! The change is spliced into the original text so every untouched byte stays
//! as it was. Each splice is re-parsed and compared with the expected
//! document; when the layout is too unusual for the splicer the document is
//! re-serialised in the same format (keys keep their order, 2-space indent).
//! Writes go through a temporary file in the same directory.

mod json;
mod yaml;

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::EditError;
use crate::filter::FilterSpec;
use crate::schema::SchemaFormat;
use crate::schema::parser::parse_with;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Added,
    Updated,
    Unchanged,
}

/// How the new text was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStrategy {
    Spliced,
    Reserialized,
    /// Nothing written.
    Untouched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub path: PathBuf,
    pub name: String,
    pub action: EditAction,
    pub strategy: EditStrategy,
}

/// Where the entry lands in the `toolsets` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Replace(usize),
    Append,
    /// The key is missing or null.
    Create,
}

/// The reference being written.
#[derive(Debug, Clone)]
struct Entry {
    name: String,
    filter: Option<FilterSpec>,
}

impl Entry {
    fn to_value(&self) -> JsonValue {
        match &self.filter {
            None => JsonValue::String(self.name.clone()),
            Some(filter) => {
                let mut obj = JsonMap::new();
                obj.insert("name".into(), JsonValue::String(self.name.clone()));
                obj.insert(
                    "filter".into(),
                    JsonValue::String(filter.kind().schema_name().to_string()),
                );
                obj.insert("filterValue".into(), JsonValue::String(filter.joined_values()));
                JsonValue::Object(obj)
            }
        }
    }

    /// `(key, value)` pairs of the object form, in write order.
    fn fields(&self) -> Option<[(&'static str, String); 3]> {
        let filter = self.filter.as_ref()?;
        Some([
            ("name", self.name.clone()),
            ("filter", filter.kind().schema_name().to_string()),
            ("filterValue", filter.joined_values()),
        ])
    }
}

/// Add `name` to the `toolsets` array of the schema at `path`, or update the
/// existing entry with the same name. Without a filter the entry is a bare
/// string; with one it is `{name, filter, filterValue}`.
pub fn add_toolset_reference(
    path: &Path,
    name: &str,
    filter_kind: Option<&str>,
    filter_value: Option<&str>,
) -> Result<EditOutcome, EditError> {
    let entry = validate_entry(name, filter_kind, filter_value)?;

    if !path.is_file() {
        return Err(EditError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let format = SchemaFormat::from_path(path).ok_or_else(|| EditError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let text = fs::read_to_string(path).map_err(|source| EditError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |message: String| EditError::Parse {
        path: path.to_path_buf(),
        format: format.name(),
        message,
    };
    let mut doc = parse_with(format, &text).map_err(parse_error)?;
    let Some(root) = doc.as_object_mut() else {
        return Err(parse_error("top level must be an object".to_string()));
    };

    let new_value = entry.to_value();
    let placement = match root.get("toolsets") {
        None | Some(JsonValue::Null) => Placement::Create,
        Some(JsonValue::Array(items)) => match items
            .iter()
            .position(|item| reference_name(item) == Some(entry.name.as_str()))
        {
            Some(i) if items[i] == new_value => {
                tracing::info!("toolset '{}' already up to date in {}", entry.name, path.display());
                return Ok(EditOutcome {
                    path: path.to_path_buf(),
                    name: entry.name,
                    action: EditAction::Unchanged,
                    strategy: EditStrategy::Untouched,
                });
            }
            Some(i) => Placement::Replace(i),
            None => Placement::Append,
        },
        Some(_) => {
            return Err(EditError::Validation(format!(
                "'toolsets' in {} is not an array",
                path.display()
            )));
        }
    };

    match placement {
        Placement::Replace(i) => {
            if let Some(JsonValue::Array(items)) = root.get_mut("toolsets") {
                items[i] = new_value;
            }
        }
        Placement::Append => {
            if let Some(JsonValue::Array(items)) = root.get_mut("toolsets") {
                items.push(new_value);
            }
        }
        Placement::Create => {
            root.insert("toolsets".into(), JsonValue::Array(vec![new_value]));
        }
    }

    let spliced = match format {
        SchemaFormat::Json => json::splice(&text, placement, &entry),
        SchemaFormat::Yaml => yaml::splice(&text, placement, &entry),
    };
    let verified = spliced.filter(|candidate| parse_with(format, candidate).ok().as_ref() == Some(&doc));

    let (output, strategy) = match verified {
        Some(output) => (output, EditStrategy::Spliced),
        None => {
            tracing::warn!(
                "could not splice toolset '{}' into {}; rewriting the whole document",
                entry.name,
                path.display()
            );
            (reserialize(format, &doc, &text)?, EditStrategy::Reserialized)
        }
    };

    write_atomic(path, &output)?;
    let action = match placement {
        Placement::Replace(_) => EditAction::Updated,
        Placement::Append | Placement::Create => EditAction::Added,
    };
    tracing::info!("{:?} toolset '{}' in {}", action, entry.name, path.display());
    Ok(EditOutcome {
        path: path.to_path_buf(),
        name: entry.name,
        action,
        strategy,
    })
}

fn validate_entry(
    name: &str,
    filter_kind: Option<&str>,
    filter_value: Option<&str>,
) -> Result<Entry, EditError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EditError::Validation("toolset name must not be empty".into()));
    }
    let filter = match (filter_kind, filter_value) {
        (None, None) => None,
        (Some(kind), Some(values)) => Some(
            FilterSpec::from_parts(kind, values)
                .map_err(|e| EditError::Validation(e.to_string()))?,
        ),
        (Some(_), None) => {
            return Err(EditError::Validation("a filter needs at least one value".into()));
        }
        (None, Some(_)) => {
            return Err(EditError::Validation("filter values given without a filter type".into()));
        }
    };
    Ok(Entry {
        name: name.to_string(),
        filter,
    })
}

fn reference_name(item: &JsonValue) -> Option<&str> {
    match item {
        JsonValue::String(s) => Some(s.trim()),
        JsonValue::Object(map) => map.get("name").and_then(|v| v.as_str()).map(str::trim),
        _ => None,
    }
}

fn reserialize(format: SchemaFormat, doc: &JsonValue, original: &str) -> Result<String, EditError> {
    let rendered = match format {
        SchemaFormat::Json => serde_json::to_string_pretty(doc).map_err(|e| e.to_string()),
        SchemaFormat::Yaml => serde_yaml::to_string(doc).map_err(|e| e.to_string()),
    }
    .map_err(|e| EditError::Validation(format!("failed to serialise document: {}", e)))?;
    Ok(if original.ends_with('\n') && !rendered.ends_with('\n') {
        rendered + "\n"
    } else {
        rendered
    })
}

/// Replace `path` with `content` via a sibling temporary file, keeping the
/// original permissions.
fn write_atomic(path: &Path, content: &str) -> Result<(), EditError> {
    let io_err = |source: std::io::Error| EditError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(content.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(io_err)?;
    }
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
