//! Static asset copying.

use super::{BuildPlugin, PluginContext};
use crate::pipeline::{BuildArtifacts, BuildError};

/// Copies the `public/` tree into the artifact set.
///
/// The HTML shell template is excluded; the shell plugin owns it.
#[derive(Debug, Default)]
pub struct CopyStatic;

impl CopyStatic {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BuildPlugin for CopyStatic {
    fn name(&self) -> &'static str {
        "copy-static"
    }

    fn after_emit(
        &self,
        ctx: &PluginContext<'_>,
        artifacts: &mut BuildArtifacts,
    ) -> Result<(), BuildError> {
        let public = &ctx.paths.public;
        if !public.is_dir() {
            return Ok(());
        }

        for entry in walkdir::WalkDir::new(public).follow_links(false) {
            let entry = entry.map_err(|e| BuildError {
                code: "COPY_ERROR",
                message: e.to_string(),
                path: Some(public.display().to_string()),
            })?;

            if !entry.file_type().is_file() || entry.path() == ctx.paths.html {
                continue;
            }

            let rel = entry
                .path()
                .strip_prefix(public)
                .unwrap_or(entry.path())
                .display()
                .to_string()
                .replace('\\', "/");

            let contents = std::fs::read(entry.path()).map_err(|e| BuildError {
                code: "COPY_ERROR",
                message: e.to_string(),
                path: Some(rel.clone()),
            })?;

            artifacts.push(rel, contents);
        }

        Ok(())
    }
}
