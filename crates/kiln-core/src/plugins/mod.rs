//! Auxiliary build plugins.
//!
//! Plugins run after the module graph is resolved and emitted, in
//! declaration order. They add or rewrite artifacts (`after_emit`) and
//! prepare the output directory (`before_write`).

mod clean;
mod copy;
mod html;
mod reload;
mod report;

pub use clean::CleanOutput;
pub use copy::CopyStatic;
pub use html::HtmlShell;
pub use reload::{client_source, HotReload, CLIENT_PATH, WS_PATH};
pub use report::BundleReport;

use crate::output::OutputDescriptor;
use crate::paths::ProjectPaths;
use crate::pipeline::{BuildArtifacts, BuildError};
use crate::profile::Mode;
use std::path::Path;

/// Context handed to plugin hooks.
pub struct PluginContext<'a> {
    pub paths: &'a ProjectPaths,
    pub mode: Mode,
    pub output: &'a OutputDescriptor,
}

/// One auxiliary build step.
pub trait BuildPlugin: Send + Sync {
    /// Stable plugin name.
    fn name(&self) -> &'static str;

    /// Amend the artifact set after emission.
    fn after_emit(
        &self,
        _ctx: &PluginContext<'_>,
        _artifacts: &mut BuildArtifacts,
    ) -> Result<(), BuildError> {
        Ok(())
    }

    /// Prepare the output directory before files are written.
    fn before_write(&self, _out_dir: &Path) -> Result<(), BuildError> {
        Ok(())
    }
}

/// The ordered plugin list of a profile.
#[derive(Default)]
pub struct PluginChain {
    plugins: Vec<Box<dyn BuildPlugin>>,
}

impl PluginChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, plugin: Box<dyn BuildPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn BuildPlugin> {
        self.plugins.iter().map(AsRef::as_ref)
    }

    /// Plugin names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for PluginChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
