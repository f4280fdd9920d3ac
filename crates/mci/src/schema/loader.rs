//! Toolset graph walk.
//!
//! Resolution starts at the root schema and follows `toolsets` references
//! depth-first using an explicit frame stack. A file re-entered while one of
//! its ancestors on the stack is still open is a cycle; the same file reached
//! again through a sibling path (a diamond) is loaded again.
//!
//! Merge rules:
//! - a frame's nested toolsets merge in declaration order, then the frame's own
//!   tools override them;
//! - the reference filter of a frame scopes that frame's whole contribution;
//! - an override keeps the position of the first occurrence.

use std::path::{Path, PathBuf};

use super::finder::find_toolset_file;
use super::parser::read_schema_file;
use super::servers::check_commands;
use super::types::{FileRole, MAIN_SOURCE, SchemaFile, ToolCollection};
use crate::env::{EnvironmentMapping, LIBRARY_DIR_NAME};
use crate::error::{ResolveError, ResolveResult, Warning};
use crate::filter::FilterSpec;

/// Outcome of a collect-mode load. Any entry in `errors` invalidates `tools`.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub tools: ToolCollection,
    pub errors: Vec<ResolveError>,
    pub warnings: Vec<Warning>,
}

impl LoadReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The first error if any, otherwise the tools and warnings.
    pub fn into_result(self) -> ResolveResult<(ToolCollection, Vec<Warning>)> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok((self.tools, self.warnings)),
        }
    }
}

/// Load `root_path` and every toolset it reaches.
pub fn load(root_path: &Path, env: &EnvironmentMapping) -> LoadReport {
    let mut report = LoadReport::default();
    let root = match read_schema_file(root_path, FileRole::Root) {
        Ok(root) => root,
        Err(e) => {
            report.errors.push(e);
            return report;
        }
    };
    report
        .warnings
        .extend(check_commands(&root.servers, &root.path, env));

    let library_dir = match library_dir_for(&root, env) {
        Ok(dir) => dir,
        Err(e) => {
            report.errors.push(e);
            return report;
        }
    };
    tracing::debug!("toolset library: {}", library_dir.display());

    let mut walk = Walk {
        env,
        library_dir: &library_dir,
        report: &mut report,
    };
    let tools = walk.run(root);
    report.tools = tools;
    tracing::info!(
        "loaded {} tool(s) from {} ({} error(s), {} warning(s))",
        report.tools.len(),
        root_path.display(),
        report.errors.len(),
        report.warnings.len()
    );
    report
}

/// One open file on the walk stack.
struct Frame {
    file: SchemaFile,
    identity: PathBuf,
    label: String,
    scope: Option<FilterSpec>,
    next_ref: usize,
    nested: ToolCollection,
}

impl Frame {
    fn new(file: SchemaFile, label: String, scope: Option<FilterSpec>) -> Self {
        Self {
            identity: identity_of(&file.path),
            file,
            label,
            scope,
            next_ref: 0,
            nested: ToolCollection::new(),
        }
    }

    /// Nested results first, own tools over them, then the reference filter.
    fn finish(self) -> ToolCollection {
        let Frame {
            file,
            label,
            scope,
            mut nested,
            ..
        } = self;
        for mut tool in file.tools {
            tool.source_toolset = label.clone();
            nested.insert(tool);
        }
        match scope {
            Some(filter) => filter.apply(nested),
            None => nested,
        }
    }
}

struct Walk<'a> {
    env: &'a EnvironmentMapping,
    library_dir: &'a Path,
    report: &'a mut LoadReport,
}

impl Walk<'_> {
    fn run(&mut self, root: SchemaFile) -> ToolCollection {
        let mut stack = vec![Frame::new(root, MAIN_SOURCE.to_string(), None)];
        loop {
            let Some(top) = stack.last_mut() else {
                return ToolCollection::new();
            };

            if top.next_ref < top.file.toolsets.len() {
                let reference = top.file.toolsets[top.next_ref].clone();
                top.next_ref += 1;
                let referrer = top.file.path.clone();
                match self.open(&reference.name, &referrer, &stack) {
                    Ok((file, label)) => stack.push(Frame::new(file, label, reference.filter)),
                    Err(e) => self.report.errors.push(e),
                }
                continue;
            }

            let Some(done) = stack.pop() else {
                return ToolCollection::new();
            };
            let contribution = done.finish();
            match stack.last_mut() {
                Some(parent) => parent.nested.extend(contribution),
                None => return contribution,
            }
        }
    }

    /// Locate, cycle-check and parse one referenced toolset.
    fn open(
        &mut self,
        raw_name: &str,
        referrer: &Path,
        stack: &[Frame],
    ) -> ResolveResult<(SchemaFile, String)> {
        let name = expand_env_placeholders(raw_name, self.env).map_err(|var| {
            ResolveError::Schema {
                path: referrer.to_path_buf(),
                message: format!(
                    "toolset reference '{}' uses undefined environment variable '{}'",
                    raw_name, var
                ),
            }
        })?;

        let path = find_toolset_file(self.library_dir, &name).map_err(|tried| {
            ResolveError::ToolsetNotFound {
                name: name.clone(),
                library_dir: self.library_dir.to_path_buf(),
                tried,
                referenced_by: referrer.to_path_buf(),
            }
        })?;

        let identity = identity_of(&path);
        if let Some(pos) = stack.iter().position(|f| f.identity == identity) {
            let mut chain: Vec<String> = stack[pos..].iter().map(|f| f.label.clone()).collect();
            chain.push(name);
            return Err(ResolveError::Cycle { chain });
        }

        let file = read_schema_file(&path, FileRole::Toolset)?;
        self.report
            .warnings
            .extend(check_commands(&file.servers, &file.path, self.env));
        tracing::debug!("entered toolset '{}' ({})", name, path.display());
        Ok((file, name))
    }
}

/// `<root dir>/mci` unless the root declares `libraryDir`.
fn library_dir_for(root: &SchemaFile, env: &EnvironmentMapping) -> ResolveResult<PathBuf> {
    let root_dir = root
        .path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let Some(raw) = root.library_dir.as_deref() else {
        return Ok(root_dir.join(LIBRARY_DIR_NAME));
    };
    let expanded = expand_env_placeholders(raw, env).map_err(|var| ResolveError::Schema {
        path: root.path.clone(),
        message: format!(
            "libraryDir '{}' uses undefined environment variable '{}'",
            raw, var
        ),
    })?;
    let dir = crate::config::expand_home_with(&expanded, env.get("HOME"));
    Ok(if dir.is_absolute() {
        dir
    } else {
        root_dir.join(dir)
    })
}

fn identity_of(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Substitute `{{env.NAME}}` placeholders. Other `{{...}}` text is left as is.
/// Returns the first undefined variable name on failure.
pub fn expand_env_placeholders(text: &str, env: &EnvironmentMapping) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        let inner = rest[start + 2..start + 2 + len].trim();
        out.push_str(&rest[..start]);
        match inner.strip_prefix("env.") {
            Some(var) => match env.get(var.trim()) {
                Some(value) => out.push_str(value),
                None => return Err(var.trim().to_string()),
            },
            None => out.push_str(&rest[start..start + 4 + len]),
        }
        rest = &rest[start + 4 + len..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, json};
    use std::fs;

    struct Project {
        dir: tempfile::TempDir,
    }

    impl Project {
        fn new(root: JsonValue) -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("mci")).unwrap();
            fs::write(dir.path().join("mci.json"), root.to_string()).unwrap();
            Self { dir }
        }

        fn toolset(&self, name: &str, doc: JsonValue) -> &Self {
            fs::write(
                self.dir.path().join("mci").join(format!("{}.mci.json", name)),
                doc.to_string(),
            )
            .unwrap();
            self
        }

        fn load(&self) -> LoadReport {
            self.load_with(&EnvironmentMapping::new())
        }

        fn load_with(&self, env: &EnvironmentMapping) -> LoadReport {
            load(&self.dir.path().join("mci.json"), env)
        }
    }

    fn root(tools: JsonValue, toolsets: JsonValue) -> JsonValue {
        json!({
            "schemaVersion": "1.0",
            "metadata": {"name": "test"},
            "tools": tools,
            "toolsets": toolsets
        })
    }

    fn toolset(tools: JsonValue, toolsets: JsonValue) -> JsonValue {
        json!({"schemaVersion": "1.0", "tools": tools, "toolsets": toolsets})
    }

    fn sources(report: &LoadReport) -> Vec<(String, String)> {
        report
            .tools
            .iter()
            .map(|t| (t.name.clone(), t.source_toolset.clone()))
            .collect()
    }

    #[test]
    fn root_overrides_toolset_and_keeps_position() {
        let p = Project::new(root(
            json!([{"name": "x", "description": "root"}, {"name": "r"}]),
            json!(["gh"]),
        ));
        p.toolset(
            "gh",
            toolset(json!([{"name": "a"}, {"name": "x", "description": "gh"}]), json!([])),
        );
        let report = p.load();
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(
            sources(&report),
            vec![
                ("a".into(), "gh".into()),
                ("x".into(), MAIN_SOURCE.into()),
                ("r".into(), MAIN_SOURCE.into()),
            ]
        );
        assert_eq!(report.tools.get("x").unwrap().description.as_deref(), Some("root"));
    }

    #[test]
    fn later_toolset_overrides_earlier() {
        let p = Project::new(root(json!([]), json!(["one", "two"])));
        p.toolset("one", toolset(json!([{"name": "t", "description": "1"}]), json!([])))
            .toolset("two", toolset(json!([{"name": "t", "description": "2"}]), json!([])));
        let report = p.load();
        let t = report.tools.get("t").unwrap();
        assert_eq!(t.source_toolset, "two");
        assert_eq!(t.description.as_deref(), Some("2"));
        assert_eq!(report.tools.len(), 1);
    }

    #[test]
    fn nested_tools_keep_innermost_provenance() {
        let p = Project::new(root(json!([]), json!(["outer"])));
        p.toolset("outer", toolset(json!([{"name": "o"}]), json!(["inner"])))
            .toolset("inner", toolset(json!([{"name": "i"}]), json!([])));
        let report = p.load();
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(
            sources(&report),
            vec![("i".into(), "inner".into()), ("o".into(), "outer".into())]
        );
    }

    #[test]
    fn reference_filter_scopes_only_that_toolset() {
        let p = Project::new(root(
            json!([{"name": "mine", "tags": ["write"]}]),
            json!([
                {"name": "fs", "filter": "withoutTags", "filterValue": "write"},
                "gh"
            ]),
        ));
        p.toolset(
            "fs",
            toolset(
                json!([{"name": "read", "tags": ["read"]}, {"name": "rm", "tags": ["write"]}]),
                json!([]),
            ),
        )
        .toolset("gh", toolset(json!([{"name": "push", "tags": ["write"]}]), json!([])));
        let report = p.load();
        let names: Vec<&str> = report.tools.names().collect();
        assert_eq!(names, vec!["read", "push", "mine"]);
    }

    #[test]
    fn toolsets_filter_on_reference_uses_provenance() {
        let p = Project::new(root(
            json!([]),
            json!([{"name": "outer", "filter": "toolsets", "filterValue": "inner"}]),
        ));
        p.toolset("outer", toolset(json!([{"name": "o"}]), json!(["inner"])))
            .toolset("inner", toolset(json!([{"name": "i"}]), json!([])));
        let report = p.load();
        assert_eq!(report.tools.names().collect::<Vec<_>>(), vec!["i"]);
    }

    #[test]
    fn direct_cycle_is_reported() {
        let p = Project::new(root(json!([]), json!(["a"])));
        p.toolset("a", toolset(json!([{"name": "t"}]), json!(["a"])));
        let report = p.load();
        assert_eq!(report.errors.len(), 1);
        match &report.errors[0] {
            ResolveError::Cycle { chain } => assert_eq!(chain, &vec!["a", "a"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn transitive_cycle_is_reported() {
        let p = Project::new(root(json!([]), json!(["a"])));
        p.toolset("a", toolset(json!([]), json!(["b"])))
            .toolset("b", toolset(json!([]), json!(["a"])));
        let report = p.load();
        let err = report.into_result().unwrap_err();
        assert_eq!(err.to_string(), "circular toolset reference: a -> b -> a");
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let p = Project::new(root(json!([]), json!(["left", "right"])));
        p.toolset("left", toolset(json!([{"name": "l"}]), json!(["shared"])))
            .toolset("right", toolset(json!([{"name": "r"}]), json!(["shared"])))
            .toolset("shared", toolset(json!([{"name": "s"}]), json!([])));
        let report = p.load();
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.tools.names().collect::<Vec<_>>(), vec!["s", "l", "r"]);
    }

    #[test]
    fn missing_toolset_names_it_and_the_extensions() {
        let p = Project::new(root(json!([{"name": "ok"}]), json!(["ghost"])));
        let err = p.load().into_result().unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, ResolveError::ToolsetNotFound { .. }));
        assert!(msg.contains("ghost"), "{}", msg);
        for ext in ["ghost.mci.json", "ghost.mci.yaml", "ghost.mci.yml"] {
            assert!(msg.contains(ext), "{}", msg);
        }
    }

    #[test]
    fn collects_errors_from_several_references() {
        let p = Project::new(root(json!([]), json!(["ghost", "broken", "fine"])));
        fs::write(p.dir.path().join("mci/broken.mci.json"), "{not json").unwrap();
        p.toolset("fine", toolset(json!([{"name": "f"}]), json!([])));
        let report = p.load();
        assert_eq!(report.errors.len(), 2);
        assert!(matches!(report.errors[1], ResolveError::Parse { .. }));
        assert_eq!(report.tools.names().collect::<Vec<_>>(), vec!["f"]);
    }

    #[test]
    fn yaml_toolsets_resolve() {
        let p = Project::new(root(json!([]), json!(["weather"])));
        fs::write(
            p.dir.path().join("mci/weather.mci.yaml"),
            "schemaVersion: '1.0'\ntools:\n  - name: forecast\n    tags: [api]\n",
        )
        .unwrap();
        let report = p.load();
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.tools.get("forecast").unwrap().source_toolset, "weather");
    }

    #[test]
    fn env_placeholders_in_names_and_library_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib-prod")).unwrap();
        fs::write(
            dir.path().join("mci.json"),
            json!({
                "schemaVersion": "1.0",
                "metadata": {},
                "libraryDir": "lib-{{env.STAGE}}",
                "toolsets": ["{{ env.SET }}"]
            })
            .to_string(),
        )
        .unwrap();
        fs::write(
            dir.path().join("lib-prod/api.mci.json"),
            toolset(json!([{"name": "call"}]), json!([])).to_string(),
        )
        .unwrap();

        let env: EnvironmentMapping = [("STAGE", "prod"), ("SET", "api")].into_iter().collect();
        let report = load(&dir.path().join("mci.json"), &env);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.tools.get("call").unwrap().source_toolset, "api");

        let partial: EnvironmentMapping = [("STAGE", "prod")].into_iter().collect();
        let report = load(&dir.path().join("mci.json"), &partial);
        let msg = report.into_result().unwrap_err().to_string();
        assert!(msg.contains("SET"), "{}", msg);
    }

    #[test]
    fn tilde_library_dir_uses_home_from_the_mapping() {
        let project = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        fs::create_dir_all(home.path().join("lib")).unwrap();
        fs::write(
            home.path().join("lib/api.mci.json"),
            toolset(json!([{"name": "call"}]), json!([])).to_string(),
        )
        .unwrap();
        fs::write(
            project.path().join("mci.json"),
            json!({
                "schemaVersion": "1.0",
                "metadata": {},
                "libraryDir": "~/lib",
                "toolsets": ["api"]
            })
            .to_string(),
        )
        .unwrap();

        let home_str = home.path().to_str().unwrap();
        let env: EnvironmentMapping = [("HOME", home_str)].into_iter().collect();
        let report = load(&project.path().join("mci.json"), &env);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.tools.get("call").unwrap().source_toolset, "api");
    }

    #[test]
    fn placeholder_expansion_leaves_other_templates() {
        let env: EnvironmentMapping = [("A", "1")].into_iter().collect();
        assert_eq!(
            expand_env_placeholders("x{{env.A}}-{{props.b}}-{{", &env).unwrap(),
            "x1-{{props.b}}-{{"
        );
        assert_eq!(expand_env_placeholders("{{env.B}}", &env), Err("B".to_string()));
    }

    #[test]
    fn missing_root_fields_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mci.json"), r#"{"tools": []}"#).unwrap();
        let report = load(&dir.path().join("mci.json"), &EnvironmentMapping::new());
        assert!(!report.is_valid());
        assert!(matches!(report.errors[0], ResolveError::Schema { .. }));
    }

    #[test]
    fn server_warnings_do_not_invalidate() {
        let mut doc = root(json!([{"name": "t"}]), json!([]));
        doc["mcp_servers"] = json!({"srv": {"command": "no-such-binary-for-mci-tests"}});
        let p = Project::new(doc);
        let env: EnvironmentMapping = [("PATH", "/nonexistent")].into_iter().collect();
        let report = p.load_with(&env);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.tools.len(), 1);
    }
}
