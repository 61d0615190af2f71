//! Output directory cleaning.

use super::BuildPlugin;
use crate::pipeline::BuildError;
use std::path::Path;

/// Removes the stale output directory before writing a fresh build.
#[derive(Debug, Default)]
pub struct CleanOutput;

impl CleanOutput {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BuildPlugin for CleanOutput {
    fn name(&self) -> &'static str {
        "clean-output"
    }

    fn before_write(&self, out_dir: &Path) -> Result<(), BuildError> {
        if out_dir.exists() {
            std::fs::remove_dir_all(out_dir).map_err(|e| BuildError {
                code: "CLEAN_ERROR",
                message: e.to_string(),
                path: Some(out_dir.display().to_string()),
            })?;
        }
        Ok(())
    }
}
