//! Schema model, discovery, parsing and toolset resolution.

pub mod finder;
pub mod loader;
pub mod parser;
pub mod servers;
mod types;

pub use finder::{SchemaFormat, find_schema_file, find_toolset_file, locate_root};
pub use loader::{LoadReport, load};
pub use types::{FileRole, MAIN_SOURCE, SchemaFile, Tool, ToolCollection, ToolsetReference};
