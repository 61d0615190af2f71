//! The build pipeline.
//!
//! One run is linear: build the module graph from the entry, route each
//! module through the rule table, transform in parallel, plan chunks,
//! render output, then hand the in-memory artifact set to the plugin
//! chain. Nothing touches the output directory until the entire run has
//! succeeded; `write` is a separate step so failed builds leave no
//! partial output.

pub mod chunks;
pub mod emit;
pub mod graph;
pub mod imports;
pub mod resolve;
pub mod transform;

pub use chunks::{Chunk, ChunkPlan};
pub use graph::{Module, ModuleGraph, ModuleId, ModuleKind};
pub use imports::{scan_imports, ImportKind, ImportSpec};
pub use resolve::{ResolveError, Resolver};
pub use transform::{EmittedAsset, TransformedModule};

use crate::paths::ProjectPaths;
use crate::plugins::PluginContext;
use crate::profile::{BuildProfile, SourceMaps};
use kiln_util::hash::short_hash;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;

/// A pipeline error. Codes are SCREAMING_SNAKE_CASE and stable.
#[derive(Debug, Clone)]
pub struct BuildError {
    pub code: &'static str,
    pub message: String,
    pub path: Option<String>,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: {} ({})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for BuildError {}

impl From<ResolveError> for BuildError {
    fn from(err: ResolveError) -> Self {
        BuildError {
            code: "BUILD_RESOLVE_ERROR",
            message: err.message.clone(),
            path: Some(err.from.clone()),
        }
    }
}

/// One file of the in-memory artifact set.
#[derive(Debug, Clone)]
pub struct OutputFile {
    /// Output-relative path with forward slashes.
    pub path: String,
    pub contents: Vec<u8>,
}

/// Output size bookkeeping for the bundle report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModuleSize {
    pub chunk: String,
    pub path: String,
    pub bytes: usize,
}

/// Everything one build produced, held in memory until written.
#[derive(Debug, Default)]
pub struct BuildArtifacts {
    pub files: Vec<OutputFile>,
    /// (chunk name, emitted filename) in load order.
    pub chunk_files: Vec<(String, String)>,
    /// Extracted CSS bundle filenames.
    pub css_files: Vec<String>,
    pub module_sizes: Vec<ModuleSize>,
    pub warnings: Vec<String>,
}

impl BuildArtifacts {
    /// Add a file, replacing any existing artifact at the same path.
    pub fn push(&mut self, path: impl Into<String>, contents: Vec<u8>) {
        let path = path.into();
        if let Some(existing) = self.files.iter_mut().find(|f| f.path == path) {
            existing.contents = contents;
        } else {
            self.files.push(OutputFile { path, contents });
        }
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&OutputFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut OutputFile> {
        self.files.iter_mut().find(|f| f.path == path)
    }

    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.files.iter().map(|f| f.contents.len()).sum()
    }
}

/// The build pipeline for one profile.
#[derive(Debug)]
pub struct Pipeline {
    profile: BuildProfile,
    paths: ProjectPaths,
}

impl Pipeline {
    #[must_use]
    pub fn new(profile: BuildProfile, paths: ProjectPaths) -> Self {
        Self { profile, paths }
    }

    #[must_use]
    pub fn profile(&self) -> &BuildProfile {
        &self.profile
    }

    #[must_use]
    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    /// Run the pipeline, producing the in-memory artifact set.
    pub fn run(&self) -> Result<BuildArtifacts, BuildError> {
        let profile = &self.profile;

        let resolver = Resolver::new(
            self.paths.resolve_roots(),
            profile.resolve.extensions.clone(),
        );
        let graph = ModuleGraph::build(
            &self.paths.entry,
            &self.paths.root,
            &resolver,
            &profile.external,
        )?;
        let order = graph.toposort();

        // Route every module before transforming so rule-table errors
        // surface with the module that triggered them
        let routed = order
            .iter()
            .map(|id| {
                let module = graph.get(id).ok_or_else(|| BuildError {
                    code: "BUILD_INTERNAL_ERROR",
                    message: format!("module {id} missing from graph"),
                    path: None,
                })?;
                let rule = profile.rules.route(&module.path).ok_or_else(|| BuildError {
                    code: "NO_MATCHING_RULE",
                    message: "no transform chain matches this module".to_string(),
                    path: Some(module.rel_path.clone()),
                })?;
                Ok((module, rule))
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        let transformed = routed
            .par_iter()
            .map(|&(module, rule)| transform::transform_module(module, rule, &profile.output))
            .collect::<Result<Vec<_>, BuildError>>()?;

        let mut artifacts = BuildArtifacts::default();

        // Emitted assets (fonts, large media)
        for t in &transformed {
            if let Some(asset) = &t.emitted {
                artifacts.push(asset.name.clone(), asset.bytes.clone());
            }
        }

        // Extracted CSS bundle, in module order
        let css_parts: Vec<&str> = transformed
            .iter()
            .filter_map(|t| t.css.as_deref())
            .collect();
        if !css_parts.is_empty() {
            let bundle = css_parts.join("\n");
            let file = profile.output.css_file("main", &short_hash(bundle.as_bytes()));
            artifacts.push(file.clone(), bundle.into_bytes());
            artifacts.css_files.push(file);
        }

        // Chunks
        let by_id: HashMap<&str, &TransformedModule> = transformed
            .iter()
            .map(|t| (t.id.as_str(), t))
            .collect();
        let originals: HashMap<String, String> = graph
            .modules()
            .map(|m| (m.rel_path.clone(), m.source_text()))
            .collect();
        let compact = profile.optimization.compact;
        let plan = ChunkPlan::split(&graph, &order, profile.optimization.split_vendors);

        if profile.optimization.runtime_chunk {
            let code = emit::runtime_source(compact);
            let file = profile
                .output
                .chunk_file("runtime", &short_hash(code.as_bytes()));
            artifacts.push(file.clone(), code.into_bytes());
            artifacts.chunk_files.push(("runtime".to_string(), file));
        }

        for chunk in &plan.chunks {
            let modules: Vec<&TransformedModule> = chunk
                .modules
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).copied())
                .collect();
            let entry = if chunk.is_entry {
                Some(graph.entry_id().as_str())
            } else {
                None
            };

            let mut rendered = String::new();
            if chunk.is_entry && !profile.optimization.runtime_chunk {
                rendered.push_str(&emit::runtime_source(compact));
            }
            rendered.push_str(&emit::render_chunk(&modules, entry, compact));

            let file = if chunk.is_entry {
                profile
                    .output
                    .entry_file(&chunk.name, &short_hash(rendered.as_bytes()))
            } else {
                profile
                    .output
                    .chunk_file(&chunk.name, &short_hash(rendered.as_bytes()))
            };

            match profile.source_maps {
                SourceMaps::None => {
                    artifacts.push(file.clone(), rendered.into_bytes());
                }
                SourceMaps::Inline => {
                    let map = emit::build_chunk_map(&rendered, &file, &originals);
                    let code = emit::append_inline_map(&rendered, &map);
                    artifacts.push(file.clone(), code.into_bytes());
                }
                SourceMaps::File => {
                    let map = emit::build_chunk_map(&rendered, &file, &originals);
                    let map_name = format!(
                        "{}.map",
                        file.rsplit('/').next().unwrap_or(file.as_str())
                    );
                    let code = emit::append_map_reference(&rendered, &map_name);
                    artifacts.push(format!("{file}.map"), map.into_bytes());
                    artifacts.push(file.clone(), code.into_bytes());
                }
            }

            for module in &modules {
                artifacts.module_sizes.push(ModuleSize {
                    chunk: chunk.name.clone(),
                    path: module.rel_path.clone(),
                    bytes: module.body.len(),
                });
            }
            artifacts.chunk_files.push((chunk.name.clone(), file));
        }

        // Manifest: chunk name → emitted filename
        let manifest = serde_json::json!({
            "chunks": artifacts
                .chunk_files
                .iter()
                .map(|(name, file)| (name.clone(), serde_json::Value::String(file.clone())))
                .collect::<serde_json::Map<String, serde_json::Value>>(),
            "css": artifacts.css_files,
        });
        artifacts.push(
            "manifest.json",
            serde_json::to_vec_pretty(&manifest).expect("manifest serializes"),
        );

        // Auxiliary plugins, in declaration order
        let ctx = PluginContext {
            paths: &self.paths,
            mode: profile.mode,
            output: &profile.output,
        };
        for plugin in profile.plugins.iter() {
            plugin.after_emit(&ctx, &mut artifacts)?;
        }

        Ok(artifacts)
    }

    /// Write the artifact set to the output directory.
    ///
    /// Runs plugin `before_write` hooks first (output cleaning), then
    /// writes every file atomically.
    pub fn write(&self, artifacts: &BuildArtifacts) -> Result<PathBuf, BuildError> {
        let out_dir = &self.profile.output.dir;

        for plugin in self.profile.plugins.iter() {
            plugin.before_write(out_dir)?;
        }

        for file in &artifacts.files {
            let target = out_dir.join(&file.path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| write_error(&file.path, &e))?;
            }
            kiln_util::fs::atomic_write(&target, &file.contents)
                .map_err(|e| write_error(&file.path, &e))?;
        }

        Ok(out_dir.clone())
    }
}

fn write_error(path: &str, e: &std::io::Error) -> BuildError {
    BuildError {
        code: "WRITE_ERROR",
        message: e.to_string(),
        path: Some(path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::BuildEnv;
    use crate::profile;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scaffold(root: &Path) {
        write(
            root,
            "src/index.js",
            "import { render } from './app';\nimport './styles.css';\n\nrender(document.getElementById('app'));\n",
        );
        write(
            root,
            "src/app.js",
            "export function render(root) {\n  root.innerHTML = '<h1>Hello</h1>';\n}\n",
        );
        write(root, "src/styles.css", ".app { color: red; }\n");
        write(
            root,
            "public/index.html",
            "<!DOCTYPE html>\n<html>\n<head>\n<title>app</title>\n</head>\n<body>\n<div id=\"app\"></div>\n</body>\n</html>\n",
        );
        write(root, "package.json", "{\"name\": \"fixture\"}");
    }

    fn production_pipeline(root: &Path, env: &BuildEnv) -> Pipeline {
        let paths = ProjectPaths::from_root(root);
        Pipeline::new(profile::production(&paths, env), paths)
    }

    #[test]
    fn test_production_run_produces_hashed_chunks() {
        let dir = tempdir().unwrap();
        scaffold(dir.path());

        let pipeline = production_pipeline(dir.path(), &BuildEnv::default());
        let artifacts = pipeline.run().unwrap();

        let main = artifacts
            .chunk_files
            .iter()
            .find(|(name, _)| name == "main")
            .map(|(_, f)| f.clone())
            .unwrap();
        assert!(main.starts_with("js/main."));
        assert!(main.ends_with(".js"));
        // 8-hex hash segment
        let hash = main
            .trim_start_matches("js/main.")
            .trim_end_matches(".js");
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));

        // runtime chunk present and first
        assert_eq!(artifacts.chunk_files[0].0, "runtime");
    }

    #[test]
    fn test_production_extracts_css() {
        let dir = tempdir().unwrap();
        scaffold(dir.path());

        let pipeline = production_pipeline(dir.path(), &BuildEnv::default());
        let artifacts = pipeline.run().unwrap();

        assert_eq!(artifacts.css_files.len(), 1);
        let css = artifacts.get(&artifacts.css_files[0]).unwrap();
        let text = String::from_utf8_lossy(&css.contents);
        assert!(text.contains("color:red"));
    }

    #[test]
    fn test_html_shell_injects_assets() {
        let dir = tempdir().unwrap();
        scaffold(dir.path());

        let pipeline = production_pipeline(dir.path(), &BuildEnv::default());
        let artifacts = pipeline.run().unwrap();

        let html = artifacts.get("index.html").unwrap();
        let text = String::from_utf8_lossy(&html.contents);
        assert!(text.contains("<script src=\"/js/runtime."));
        assert!(text.contains("<script src=\"/js/main."));
        assert!(text.contains("<link rel=\"stylesheet\" href=\"/css/main."));
    }

    #[test]
    fn test_bundle_keeps_literal_strings() {
        let dir = tempdir().unwrap();
        scaffold(dir.path());

        let pipeline = production_pipeline(dir.path(), &BuildEnv::default());
        let artifacts = pipeline.run().unwrap();

        let main_file = artifacts
            .chunk_files
            .iter()
            .find(|(name, _)| name == "main")
            .map(|(_, f)| f.clone())
            .unwrap();
        let code = String::from_utf8_lossy(&artifacts.get(&main_file).unwrap().contents)
            .into_owned();
        assert!(code.contains("<h1>Hello</h1>"));
        assert!(code.contains("__kiln_require("));
    }

    #[test]
    fn test_analyze_run_adds_report() {
        let dir = tempdir().unwrap();
        scaffold(dir.path());

        let with = production_pipeline(dir.path(), &BuildEnv::new("production", true))
            .run()
            .unwrap();
        assert!(with.get("report.json").is_some());

        let without = production_pipeline(dir.path(), &BuildEnv::new("production", false))
            .run()
            .unwrap();
        assert!(without.get("report.json").is_none());
    }

    #[test]
    fn test_staging_emits_map_files() {
        let dir = tempdir().unwrap();
        scaffold(dir.path());

        let artifacts = production_pipeline(dir.path(), &BuildEnv::new("staging", false))
            .run()
            .unwrap();

        assert!(artifacts.files.iter().any(|f| f.path.ends_with(".js.map")));
    }

    #[test]
    fn test_failed_build_writes_nothing() {
        let dir = tempdir().unwrap();
        scaffold(dir.path());
        write(dir.path(), "src/index.js", "import './missing';\n");

        let pipeline = production_pipeline(dir.path(), &BuildEnv::default());
        let err = pipeline.run().unwrap_err();
        assert_eq!(err.code, "BUILD_RESOLVE_ERROR");
        assert!(!pipeline.profile().output.dir.exists());
    }

    #[test]
    fn test_write_places_files_under_env_directory() {
        let dir = tempdir().unwrap();
        scaffold(dir.path());

        let pipeline = production_pipeline(dir.path(), &BuildEnv::new("staging", false));
        let artifacts = pipeline.run().unwrap();
        let out_dir = pipeline.write(&artifacts).unwrap();

        assert_eq!(out_dir, dir.path().join("build").join("staging"));
        assert!(out_dir.join("index.html").is_file());
        assert!(out_dir.join("manifest.json").is_file());
    }

    #[test]
    fn test_development_run_uses_stable_names_and_inline_maps() {
        let dir = tempdir().unwrap();
        scaffold(dir.path());

        let paths = ProjectPaths::from_root(dir.path());
        let pipeline = Pipeline::new(profile::development(&paths), paths);
        let artifacts = pipeline.run().unwrap();

        let bundle = artifacts.get("js/bundle.js").unwrap();
        let text = String::from_utf8_lossy(&bundle.contents);
        assert!(text.contains("sourceMappingURL=data:application/json;base64,"));

        // development injects styles instead of extracting
        assert!(artifacts.css_files.is_empty());
        assert!(text.contains("document.createElement('style')"));

        // hot-reload client is present and wired into the shell
        assert!(artifacts.get("__kiln/client.js").is_some());
        let html = String::from_utf8_lossy(&artifacts.get("index.html").unwrap().contents)
            .into_owned();
        assert!(html.contains("/__kiln/client.js"));
    }

    #[test]
    fn test_manifest_lists_chunks() {
        let dir = tempdir().unwrap();
        scaffold(dir.path());

        let artifacts = production_pipeline(dir.path(), &BuildEnv::default())
            .run()
            .unwrap();
        let manifest: serde_json::Value =
            serde_json::from_slice(&artifacts.get("manifest.json").unwrap().contents).unwrap();

        assert!(manifest["chunks"]["runtime"].is_string());
        assert!(manifest["chunks"]["main"].is_string());
    }
}
