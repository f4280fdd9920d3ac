//! MCI tool-configuration resolution.
//!
//! Turns a root schema, its referenced toolset files, `.env` files, the
//! process environment and command-line overrides into one ordered,
//! de-duplicated tool list. See [`pipeline::resolve`] for the entry point and
//! [`editor::add_toolset_reference`] for in-place schema edits.

pub mod catalog;
pub mod config;
pub mod editor;
pub mod env;
pub mod error;
pub mod filter;
pub mod install;
pub mod pipeline;
pub mod schema;

pub use catalog::{CatalogError, ToolCatalog, ToolDefinition, ToolExecutor};
pub use env::EnvironmentMapping;
pub use error::{EditError, FilterSpecError, ResolveError, ResolveResult, Warning};
pub use filter::{FilterKind, FilterSpec};
pub use pipeline::{Resolution, ResolutionRequest, Validation};
pub use schema::{MAIN_SOURCE, Tool, ToolCollection, ToolsetReference};
