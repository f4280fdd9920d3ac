//! Tool resolution pipeline: environment, schema graph, then filters.

use std::path::{Path, PathBuf};

use crate::env::{self, EnvironmentMapping};
use crate::error::{ResolveError, ResolveResult, Warning};
use crate::filter::{self, FilterSpec};
use crate::schema::{self, ToolCollection, locate_root};

/// Inputs of one invocation. The process environment is captured by the
/// caller and passed in.
#[derive(Debug, Clone, Default)]
pub struct ResolutionRequest {
    /// Explicit schema path; searched for in `start_dir` when absent.
    pub file: Option<PathBuf>,
    pub start_dir: PathBuf,
    pub process_env: EnvironmentMapping,
    pub cli_env: EnvironmentMapping,
    /// Raw `kind:values` strings, applied in order as a conjunction.
    pub filters: Vec<String>,
}

impl ResolutionRequest {
    pub fn new(start_dir: impl Into<PathBuf>) -> Self {
        Self {
            start_dir: start_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_process_env(mut self, env: EnvironmentMapping) -> Self {
        self.process_env = env;
        self
    }

    pub fn with_cli_env(mut self, env: EnvironmentMapping) -> Self {
        self.cli_env = env;
        self
    }

    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = filters.into_iter().map(Into::into).collect();
        self
    }
}

/// A successful resolution.
#[derive(Debug)]
pub struct Resolution {
    pub schema_path: PathBuf,
    pub tools: ToolCollection,
    pub env: EnvironmentMapping,
    pub filters: Vec<FilterSpec>,
    pub warnings: Vec<Warning>,
}

/// Collect-mode result: every error found plus the warnings.
#[derive(Debug)]
pub struct Validation {
    pub schema_path: Option<PathBuf>,
    pub tool_count: usize,
    pub errors: Vec<ResolveError>,
    pub warnings: Vec<Warning>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Resolve, stopping at the first fatal error.
pub fn resolve(request: &ResolutionRequest) -> ResolveResult<Resolution> {
    let filters = parse_filters(&request.filters)?;
    let schema_path = locate_root(request.file.as_deref(), &request.start_dir)?;
    let env = environment_for(&schema_path, request);

    let (tools, warnings) = schema::load(&schema_path, &env).into_result()?;
    let total = tools.len();
    let tools = filter::apply_all(tools, &filters);
    tracing::info!(
        "resolved {} of {} tool(s) from {}",
        tools.len(),
        total,
        schema_path.display()
    );
    Ok(Resolution {
        schema_path,
        tools,
        env,
        filters,
        warnings,
    })
}

/// Resolve without filters, collecting every error instead of stopping.
pub fn validate(request: &ResolutionRequest) -> Validation {
    let schema_path = match locate_root(request.file.as_deref(), &request.start_dir) {
        Ok(path) => path,
        Err(e) => {
            return Validation {
                schema_path: None,
                tool_count: 0,
                errors: vec![e],
                warnings: Vec::new(),
            };
        }
    };
    let env = environment_for(&schema_path, request);
    let report = schema::load(&schema_path, &env);
    Validation {
        schema_path: Some(schema_path),
        tool_count: report.tools.len(),
        errors: report.errors,
        warnings: report.warnings,
    }
}

/// Parse raw filter strings, failing on the first malformed one.
pub fn parse_filters(raw: &[String]) -> ResolveResult<Vec<FilterSpec>> {
    raw.iter()
        .map(|s| FilterSpec::parse(s).map_err(ResolveError::from))
        .collect()
}

fn environment_for(schema_path: &Path, request: &ResolutionRequest) -> EnvironmentMapping {
    let root_dir = schema_path.parent().unwrap_or(Path::new("."));
    env::resolve(root_dir, &request.process_env, &request.cli_env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MAIN_SOURCE;
    use serde_json::json;
    use std::fs;

    fn echo_project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("mci.json"),
            json!({
                "schemaVersion": "1.0",
                "metadata": {"name": "demo"},
                "tools": [{
                    "name": "echo_test",
                    "tags": ["demo"],
                    "execution": {"type": "text", "text": "{{props.message}}"}
                }]
            })
            .to_string(),
        )
        .unwrap();
        dir
    }

    fn names(res: &Resolution) -> Vec<&str> {
        res.tools.names().collect()
    }

    #[test]
    fn echo_example_with_tag_filters() {
        let dir = echo_project();
        let req = ResolutionRequest::new(dir.path()).with_filters(["tags:demo"]);
        let res = resolve(&req).unwrap();
        assert_eq!(names(&res), vec!["echo_test"]);
        assert_eq!(res.tools.get("echo_test").unwrap().source_toolset, MAIN_SOURCE);

        let req = ResolutionRequest::new(dir.path()).with_filters(["tags:other"]);
        assert!(resolve(&req).unwrap().tools.is_empty());
    }

    #[test]
    fn repeated_filters_intersect() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("mci.json"),
            json!({
                "schemaVersion": "1.0",
                "metadata": {},
                "tools": [{"name": "x"}, {"name": "y"}, {"name": "z"}]
            })
            .to_string(),
        )
        .unwrap();
        let req = ResolutionRequest::new(dir.path()).with_filters(["only:x,y", "except:y"]);
        assert_eq!(names(&resolve(&req).unwrap()), vec!["x"]);
    }

    #[test]
    fn bad_filter_fails_before_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let req = ResolutionRequest::new(dir.path()).with_filters(["colour:red"]);
        assert!(matches!(resolve(&req), Err(ResolveError::Filter(_))));
    }

    #[test]
    fn env_is_rooted_at_the_schema_directory() {
        let dir = echo_project();
        fs::write(dir.path().join(".env"), "K=file\nONLY_FILE=1\n").unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let req = ResolutionRequest::new(elsewhere.path())
            .with_file(dir.path().join("mci.json"))
            .with_cli_env([("K", "cli")].into_iter().collect());
        let res = resolve(&req).unwrap();
        assert_eq!(res.env.get("K"), Some("cli"));
        assert_eq!(res.env.get("ONLY_FILE"), Some("1"));
    }

    #[test]
    fn missing_schema_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let req = ResolutionRequest::new(dir.path());
        assert!(matches!(resolve(&req), Err(ResolveError::SchemaNotFound { .. })));
        let v = validate(&req);
        assert!(!v.is_valid());
        assert!(v.schema_path.is_none());
    }

    #[test]
    fn validate_collects_errors_and_warnings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("mci.json"),
            json!({
                "schemaVersion": "1.0",
                "metadata": {},
                "toolsets": ["ghost", "phantom"],
                "mcp_servers": {"s": {"command": "no-such-binary-for-mci-tests"}}
            })
            .to_string(),
        )
        .unwrap();
        let req = ResolutionRequest::new(dir.path())
            .with_process_env([("PATH", "/nonexistent")].into_iter().collect());
        let v = validate(&req);
        assert_eq!(v.errors.len(), 2);
        assert_eq!(v.warnings.len(), 1);
    }

    #[test]
    fn warnings_keep_a_resolution_valid() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("mci.yaml"),
            "schemaVersion: '1.0'\nmetadata: {name: w}\ntools:\n  - name: t\nmcp_servers:\n  s:\n    command: no-such-binary-for-mci-tests\n",
        )
        .unwrap();
        let req = ResolutionRequest::new(dir.path())
            .with_process_env([("PATH", "/nonexistent")].into_iter().collect());
        let res = resolve(&req).unwrap();
        assert_eq!(res.warnings.len(), 1);
        assert_eq!(names(&res), vec!["t"]);
    }
}
