//! The module graph.
//!
//! Built breadth-first from the entry point by scanning import
//! specifiers and resolving them over the configured roots. Module ids
//! are short content hashes of the project-relative path, so they are
//! stable across builds and machines.

use super::imports::{scan_imports, ImportSpec};
use super::resolve::Resolver;
use super::BuildError;
use kiln_util::hash::short_hash;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Stable module identifier (8-hex hash of the project-relative path).
pub type ModuleId = String;

/// What kind of content a module carries, which decides its transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Script,
    Json,
    Stylesheet,
    Sass,
    Asset,
}

impl ModuleKind {
    /// Classify a path by extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("js" | "jsx" | "mjs") => Self::Script,
            Some("json") => Self::Json,
            Some("css") => Self::Stylesheet,
            Some("scss" | "sass") => Self::Sass,
            _ => Self::Asset,
        }
    }
}

/// One module in the graph.
#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Project-relative path with forward slashes.
    pub rel_path: String,
    /// Raw content (assets are binary).
    pub source: Vec<u8>,
    pub kind: ModuleKind,
    /// Import specifiers found in the source (scripts only).
    pub imports: Vec<ImportSpec>,
    /// Resolved specifier → module id edges.
    pub dependencies: HashMap<String, ModuleId>,
    /// Specifiers intentionally left unresolved.
    pub externals: Vec<String>,
}

impl Module {
    /// True when the module lives under `node_modules`.
    #[must_use]
    pub fn is_vendor(&self) -> bool {
        self.rel_path.contains("node_modules/")
    }

    /// Source decoded as UTF-8 (lossy).
    #[must_use]
    pub fn source_text(&self) -> String {
        String::from_utf8_lossy(&self.source).into_owned()
    }
}

/// The dependency graph discovered from the entry point.
#[derive(Debug)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    by_id: HashMap<ModuleId, usize>,
    entry: ModuleId,
}

impl ModuleGraph {
    /// Build the graph breadth-first from `entry`.
    pub fn build(
        entry: &Path,
        project_root: &Path,
        resolver: &Resolver,
        external: &[String],
    ) -> Result<Self, BuildError> {
        let entry_path = entry.canonicalize().map_err(|e| BuildError {
            code: "BUILD_ENTRY_NOT_FOUND",
            message: format!("cannot find entry point: {e}"),
            path: Some(entry.display().to_string()),
        })?;

        // Canonicalize so strip_prefix agrees with canonicalized module paths
        let project_root = &project_root
            .canonicalize()
            .unwrap_or_else(|_| project_root.to_path_buf());

        let mut graph = Self {
            modules: Vec::new(),
            by_id: HashMap::new(),
            entry: module_id_for(&rel_path_of(&entry_path, project_root)),
        };

        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        let mut queued: HashSet<PathBuf> = HashSet::new();
        queue.push_back(entry_path);

        while let Some(path) = queue.pop_front() {
            let rel_path = rel_path_of(&path, project_root);
            let id = module_id_for(&rel_path);
            if graph.by_id.contains_key(&id) {
                continue;
            }

            let source = std::fs::read(&path).map_err(|e| BuildError {
                code: "BUILD_READ_ERROR",
                message: e.to_string(),
                path: Some(rel_path.clone()),
            })?;

            let kind = ModuleKind::from_path(&path);
            let mut imports = Vec::new();
            let mut dependencies = HashMap::new();
            let mut externals = Vec::new();

            if kind == ModuleKind::Script {
                let text = String::from_utf8_lossy(&source);
                imports = scan_imports(&text);

                for import in &imports {
                    if is_external(&import.raw, external) {
                        externals.push(import.raw.clone());
                        continue;
                    }

                    let dep_path =
                        resolver
                            .resolve(&import.raw, &path)
                            .map_err(|e| BuildError {
                                code: "BUILD_RESOLVE_ERROR",
                                message: e.to_string(),
                                path: Some(rel_path.clone()),
                            })?;

                    let dep_rel = rel_path_of(&dep_path, project_root);
                    let dep_id = module_id_for(&dep_rel);
                    dependencies.insert(import.raw.clone(), dep_id.clone());

                    if !graph.by_id.contains_key(&dep_id) && !queued.contains(&dep_path) {
                        queued.insert(dep_path.clone());
                        queue.push_back(dep_path);
                    }
                }
            }

            let module = Module {
                id: id.clone(),
                path,
                rel_path,
                source,
                kind,
                imports,
                dependencies,
                externals,
            };

            graph.by_id.insert(id, graph.modules.len());
            graph.modules.push(module);
        }

        Ok(graph)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Module> {
        self.by_id.get(id).map(|&idx| &self.modules[idx])
    }

    #[must_use]
    pub fn entry_id(&self) -> &ModuleId {
        &self.entry
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Dependencies-first topological order from the entry.
    ///
    /// Cycles are tolerated: a module already on the visiting stack is
    /// skipped, matching runtime require semantics.
    #[must_use]
    pub fn toposort(&self) -> Vec<ModuleId> {
        let mut order = Vec::with_capacity(self.modules.len());
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack: Vec<(&Module, usize)> = Vec::new();

        let Some(entry) = self.get(&self.entry) else {
            return order;
        };
        visited.insert(entry.id.clone());
        stack.push((entry, 0));

        while !stack.is_empty() {
            let (module, dep_idx) = stack.last_mut().expect("stack is non-empty");

            // Deterministic order: imports in first-appearance order
            let next: Option<ModuleId> = module
                .imports
                .iter()
                .filter_map(|i| module.dependencies.get(&i.raw))
                .nth(*dep_idx)
                .cloned();

            match next {
                Some(dep_id) => {
                    *dep_idx += 1;
                    if !visited.contains(&dep_id) {
                        if let Some(dep) = self.get(&dep_id) {
                            visited.insert(dep.id.clone());
                            stack.push((dep, 0));
                        }
                    }
                }
                None => {
                    order.push(module.id.clone());
                    stack.pop();
                }
            }
        }

        order
    }
}

/// Project-relative path with forward slashes.
fn rel_path_of(path: &Path, project_root: &Path) -> String {
    let rel = path.strip_prefix(project_root).unwrap_or(path);
    rel.display().to_string().replace('\\', "/")
}

/// Stable module id for a project-relative path.
#[must_use]
pub fn module_id_for(rel_path: &str) -> ModuleId {
    short_hash(rel_path.as_bytes())
}

fn is_external(specifier: &str, external: &[String]) -> bool {
    external
        .iter()
        .any(|e| specifier == e || specifier.starts_with(&format!("{e}/")))
}
