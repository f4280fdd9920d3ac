//! Filter specifications of the form `kind:value1,value2,...`.
//!
//! A spec carries exactly one kind. Repeated specs compose by intersection, so
//! applying them in any order yields the same collection.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::FilterSpecError;
use crate::schema::{Tool, ToolCollection};

/// The five filter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Only,
    Except,
    Tags,
    WithoutTags,
    Toolsets,
}

impl FilterKind {
    pub const ALL: [FilterKind; 5] = [
        FilterKind::Only,
        FilterKind::Except,
        FilterKind::Tags,
        FilterKind::WithoutTags,
        FilterKind::Toolsets,
    ];

    /// Spelling stored in schema files.
    pub fn schema_name(self) -> &'static str {
        match self {
            FilterKind::Only => "only",
            FilterKind::Except => "except",
            FilterKind::Tags => "tags",
            FilterKind::WithoutTags => "withoutTags",
            FilterKind::Toolsets => "toolsets",
        }
    }

    /// Spelling used on the command line.
    pub fn cli_name(self) -> &'static str {
        match self {
            FilterKind::WithoutTags => "without-tags",
            other => other.schema_name(),
        }
    }
}

impl FromStr for FilterKind {
    type Err = FilterSpecError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lowered = raw.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "only" => Ok(FilterKind::Only),
            "except" => Ok(FilterKind::Except),
            "tags" => Ok(FilterKind::Tags),
            "without-tags" | "withouttags" => Ok(FilterKind::WithoutTags),
            "toolsets" => Ok(FilterKind::Toolsets),
            _ => Err(FilterSpecError::UnknownKind(raw.trim().to_string())),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

/// A parsed filter: one variant per kind, each holding its normalised values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSpec {
    Only(Vec<String>),
    Except(Vec<String>),
    Tags(Vec<String>),
    WithoutTags(Vec<String>),
    Toolsets(Vec<String>),
}

impl FilterSpec {
    /// Parse `kind:values`. The kind is split off at the first `:`.
    pub fn parse(spec: &str) -> Result<Self, FilterSpecError> {
        let Some((kind, values)) = spec.split_once(':') else {
            return Err(FilterSpecError::MissingSeparator(spec.to_string()));
        };
        Self::from_parts(kind, values)
    }

    /// Build from a separate kind and comma-joined value string, as stored in
    /// a toolset reference.
    pub fn from_parts(kind: &str, values: &str) -> Result<Self, FilterSpecError> {
        let kind: FilterKind = kind.parse()?;
        let values = split_values(values);
        if values.is_empty() {
            return Err(FilterSpecError::EmptyValues(kind.cli_name().to_string()));
        }
        Ok(Self::new(kind, values))
    }

    fn new(kind: FilterKind, values: Vec<String>) -> Self {
        match kind {
            FilterKind::Only => FilterSpec::Only(values),
            FilterKind::Except => FilterSpec::Except(values),
            FilterKind::Tags => FilterSpec::Tags(values),
            FilterKind::WithoutTags => FilterSpec::WithoutTags(values),
            FilterKind::Toolsets => FilterSpec::Toolsets(values),
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            FilterSpec::Only(_) => FilterKind::Only,
            FilterSpec::Except(_) => FilterKind::Except,
            FilterSpec::Tags(_) => FilterKind::Tags,
            FilterSpec::WithoutTags(_) => FilterKind::WithoutTags,
            FilterSpec::Toolsets(_) => FilterKind::Toolsets,
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            FilterSpec::Only(v)
            | FilterSpec::Except(v)
            | FilterSpec::Tags(v)
            | FilterSpec::WithoutTags(v)
            | FilterSpec::Toolsets(v) => v,
        }
    }

    /// Values joined with `,`, the form stored as `filterValue`.
    pub fn joined_values(&self) -> String {
        self.values().join(",")
    }

    pub fn matches(&self, tool: &Tool) -> bool {
        let set: HashSet<&str> = self.values().iter().map(String::as_str).collect();
        match self {
            FilterSpec::Only(_) => set.contains(tool.name.as_str()),
            FilterSpec::Except(_) => !set.contains(tool.name.as_str()),
            FilterSpec::Tags(_) => tool.tags.iter().any(|t| set.contains(t.as_str())),
            FilterSpec::WithoutTags(_) => !tool.tags.iter().any(|t| set.contains(t.as_str())),
            FilterSpec::Toolsets(_) => set.contains(tool.source_toolset.as_str()),
        }
    }

    /// Keep the tools this filter accepts, preserving order.
    pub fn apply(&self, mut tools: ToolCollection) -> ToolCollection {
        let before = tools.len();
        tools.retain(|t| self.matches(t));
        tracing::debug!("filter {} kept {} of {} tool(s)", self, tools.len(), before);
        tools
    }
}

impl FromStr for FilterSpec {
    type Err = FilterSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().cli_name(), self.joined_values())
    }
}

/// Apply every filter in turn (logical AND).
pub fn apply_all(tools: ToolCollection, filters: &[FilterSpec]) -> ToolCollection {
    filters.iter().fold(tools, |acc, f| f.apply(acc))
}

fn split_values(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
