//! `kiln build` command implementation.
//!
//! Assembles the production profile from the environment, runs the
//! pipeline, and writes the artifact set only when every stage has
//! succeeded.

use kiln_core::pipeline::Pipeline;
use kiln_core::{profile, BuildEnv, ProjectPaths};
use miette::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

/// Build command action.
#[derive(Debug, Clone)]
pub struct BuildAction {
    /// Project directory.
    pub cwd: PathBuf,
    /// `NODE_ENV` override from the CLI.
    pub node_env: Option<String>,
    /// Force the bundle-size report regardless of `ANALYZE`.
    pub analyze: bool,
}

/// JSON output for the build command.
#[derive(Serialize)]
struct BuildResultJson {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    out_dir: Option<String>,
    node_env: String,
    modules: usize,
    files: Vec<FileJson>,
    total_bytes: usize,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<BuildErrorJson>,
}

#[derive(Serialize)]
struct FileJson {
    path: String,
    bytes: usize,
}

#[derive(Serialize)]
struct BuildErrorJson {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

/// Run the build command.
pub fn run(action: &BuildAction, json: bool) -> Result<()> {
    let start = Instant::now();

    let mut env = BuildEnv::from_env();
    if let Some(node_env) = &action.node_env {
        env.node_env.clone_from(node_env);
    }
    env.analyze = env.analyze || action.analyze;

    let paths = ProjectPaths::from_root(&action.cwd);
    let pipeline = Pipeline::new(profile::production(&paths, &env), paths);

    tracing::info!(node_env = %env.node_env, analyze = env.analyze, "starting production build");

    let result = pipeline.run().and_then(|artifacts| {
        pipeline.write(&artifacts).map(|out_dir| (artifacts, out_dir))
    });

    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok((artifacts, out_dir)) => {
            if json {
                let json_result = BuildResultJson {
                    ok: true,
                    out_dir: Some(out_dir.display().to_string()),
                    node_env: env.node_env.clone(),
                    modules: artifacts.module_sizes.len(),
                    files: artifacts
                        .files
                        .iter()
                        .map(|f| FileJson {
                            path: f.path.clone(),
                            bytes: f.contents.len(),
                        })
                        .collect(),
                    total_bytes: artifacts.total_bytes(),
                    duration_ms,
                    error: None,
                };
                println!("{}", serde_json::to_string(&json_result).unwrap());
            } else {
                let total_kb = artifacts.total_bytes() as f64 / 1024.0;
                println!(
                    "  built {} modules -> {} ({} files, {:.1}KB, {}ms)",
                    artifacts.module_sizes.len(),
                    out_dir.display(),
                    artifacts.files.len(),
                    total_kb,
                    duration_ms
                );
                for (name, file) in &artifacts.chunk_files {
                    let bytes = artifacts.get(file).map_or(0, |f| f.contents.len());
                    println!("    {} -> {} ({:.1}KB)", name, file, bytes as f64 / 1024.0);
                }
                for file in &artifacts.css_files {
                    let bytes = artifacts.get(file).map_or(0, |f| f.contents.len());
                    println!("    css -> {} ({:.1}KB)", file, bytes as f64 / 1024.0);
                }
                for warning in &artifacts.warnings {
                    eprintln!("  warning: {warning}");
                }
            }
            Ok(())
        }
        Err(e) => {
            if json {
                let json_result = BuildResultJson {
                    ok: false,
                    out_dir: None,
                    node_env: env.node_env.clone(),
                    modules: 0,
                    files: Vec::new(),
                    total_bytes: 0,
                    duration_ms,
                    error: Some(BuildErrorJson {
                        code: e.code.to_string(),
                        message: e.message.clone(),
                        path: e.path.clone(),
                    }),
                };
                println!("{}", serde_json::to_string(&json_result).unwrap());
            } else {
                eprintln!("error: {e}");
            }
            std::process::exit(1);
        }
    }
}
