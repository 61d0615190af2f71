//! Bundle size reporting (`ANALYZE=true`).

use super::{BuildPlugin, PluginContext};
use crate::pipeline::{BuildArtifacts, BuildError};
use serde::Serialize;

/// Writes `report.json` with per-chunk and per-module output sizes.
#[derive(Debug, Default)]
pub struct BundleReport;

impl BundleReport {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: String,
    total_bytes: usize,
    chunks: Vec<ChunkReport<'a>>,
}

#[derive(Serialize)]
struct ChunkReport<'a> {
    name: &'a str,
    file: &'a str,
    bytes: usize,
    modules: Vec<ModuleReport<'a>>,
}

#[derive(Serialize)]
struct ModuleReport<'a> {
    path: &'a str,
    bytes: usize,
}

impl BuildPlugin for BundleReport {
    fn name(&self) -> &'static str {
        "bundle-report"
    }

    fn after_emit(
        &self,
        _ctx: &PluginContext<'_>,
        artifacts: &mut BuildArtifacts,
    ) -> Result<(), BuildError> {
        let chunks: Vec<ChunkReport<'_>> = artifacts
            .chunk_files
            .iter()
            .map(|(name, file)| ChunkReport {
                name,
                file,
                bytes: artifacts.get(file).map_or(0, |f| f.contents.len()),
                modules: artifacts
                    .module_sizes
                    .iter()
                    .filter(|m| m.chunk == *name)
                    .map(|m| ModuleReport {
                        path: &m.path,
                        bytes: m.bytes,
                    })
                    .collect(),
            })
            .collect();

        let report = Report {
            generated_at: chrono::Utc::now().to_rfc3339(),
            total_bytes: artifacts.total_bytes(),
            chunks,
        };

        let body = serde_json::to_vec_pretty(&report).map_err(|e| BuildError {
            code: "REPORT_ERROR",
            message: e.to_string(),
            path: None,
        })?;

        artifacts.push("report.json", body);
        Ok(())
    }
}
