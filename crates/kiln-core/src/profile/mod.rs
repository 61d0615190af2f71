//! Build profile assembly.
//!
//! A profile is the complete, validated configuration for one environment.
//! `production` is a pure function of the build environment variables;
//! `development` is fixed apart from dev-server overrides. Assembly merges
//! the project's path conventions with environment-conditional options
//! (source maps, compaction, hashing, plugin chain).

use crate::env::BuildEnv;
use crate::output::OutputDescriptor;
use crate::paths::ProjectPaths;
use crate::plugins::{
    BundleReport, CleanOutput, CopyStatic, HotReload, HtmlShell, PluginChain,
};
use crate::rules::{standard_rules, RuleSet};
use serde::{Deserialize, Serialize};

/// Build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Source map emission strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMaps {
    /// No source maps.
    None,
    /// Inline data-URI maps appended to each chunk (development).
    Inline,
    /// Sibling `.map` files (staging builds).
    File,
}

/// Module resolution options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Extensions probed in order when a specifier has none.
    pub extensions: Vec<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["js".to_string(), "json".to_string(), "jsx".to_string()],
        }
    }
}

/// Optimization switches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Optimization {
    /// Strip comments and blank lines from emitted scripts.
    pub compact: bool,
    /// Split `node_modules` code into a `vendors` chunk.
    pub split_vendors: bool,
    /// Emit the module-registry bootstrap as its own chunk.
    pub runtime_chunk: bool,
}

/// Development server options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevServerOptions {
    pub port: u16,
    pub host: String,
    /// Serve `index.html` for unknown paths (client-side routing).
    pub history_fallback: bool,
    /// Enable the reload WebSocket and client injection.
    pub hot: bool,
}

impl Default for DevServerOptions {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "localhost".to_string(),
            history_fallback: true,
            hot: true,
        }
    }
}

/// A complete build configuration for one environment.
#[derive(Debug)]
pub struct BuildProfile {
    pub mode: Mode,
    /// Abort without writing any output on the first error.
    pub bail: bool,
    pub source_maps: SourceMaps,
    pub resolve: ResolveOptions,
    pub rules: RuleSet,
    pub output: OutputDescriptor,
    pub optimization: Optimization,
    /// Specifier prefixes left unbundled as plain requires.
    pub external: Vec<String>,
    pub plugins: PluginChain,
    /// Present for development profiles only.
    pub server: Option<DevServerOptions>,
}

/// Assemble the development profile: stable filenames, inline source
/// maps, style injection, hot reload, in-memory serving.
#[must_use]
pub fn development(paths: &ProjectPaths) -> BuildProfile {
    let mut plugins = PluginChain::new();
    plugins.add(Box::new(CopyStatic::new()));
    plugins.add(Box::new(HtmlShell::pretty()));
    plugins.add(Box::new(HotReload::new()));

    BuildProfile {
        mode: Mode::Development,
        bail: false,
        source_maps: SourceMaps::Inline,
        resolve: ResolveOptions::default(),
        rules: standard_rules("development", false, false, &paths.src),
        output: OutputDescriptor {
            dir: paths.build.clone(),
            filename: "js/bundle.js".to_string(),
            chunk_filename: "js/[name].chunk.js".to_string(),
            css_filename: "css/[name].css".to_string(),
            public_path: "/".to_string(),
        },
        optimization: Optimization {
            compact: false,
            split_vendors: true,
            runtime_chunk: true,
        },
        external: Vec::new(),
        plugins,
        server: Some(DevServerOptions::default()),
    }
}

/// Assemble the production profile from the build environment.
///
/// The output directory is the build root joined with the `NODE_ENV`
/// value, filenames embed content hashes, and `ANALYZE=true` appends
/// exactly one bundle-report plugin. Staging builds emit `.map` files
/// and skip compaction so the line-level maps stay accurate.
#[must_use]
pub fn production(paths: &ProjectPaths, env: &BuildEnv) -> BuildProfile {
    let source_maps = if env.source_maps() {
        SourceMaps::File
    } else {
        SourceMaps::None
    };
    let compact = !env.source_maps();

    let mut plugins = PluginChain::new();
    plugins.add(Box::new(CleanOutput::new()));
    plugins.add(Box::new(CopyStatic::new()));
    plugins.add(Box::new(HtmlShell::minified()));
    if env.analyze {
        plugins.add(Box::new(BundleReport::new()));
    }

    BuildProfile {
        mode: Mode::Production,
        bail: true,
        source_maps,
        resolve: ResolveOptions::default(),
        rules: standard_rules(&env.node_env, compact, true, &paths.src),
        output: OutputDescriptor {
            dir: paths.build.join(&env.node_env),
            filename: "js/[name].[hash:8].js".to_string(),
            chunk_filename: "js/[name].[hash:8].chunk.js".to_string(),
            css_filename: "css/[name].[hash:8].css".to_string(),
            public_path: "/".to_string(),
        },
        optimization: Optimization {
            compact,
            split_vendors: true,
            runtime_chunk: true,
        },
        external: Vec::new(),
        plugins,
        server: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn paths() -> ProjectPaths {
        ProjectPaths::from_root(Path::new("/work/app"))
    }

    #[test]
    fn test_production_output_is_build_root_joined_with_env() {
        for name in ["production", "staging", "qa"] {
            let profile = production(&paths(), &BuildEnv::new(name, false));
            assert_eq!(profile.output.dir, Path::new("/work/app/build").join(name));
        }
    }

    #[test]
    fn test_production_filenames_embed_hash() {
        let profile = production(&paths(), &BuildEnv::default());
        assert!(profile.output.filename.contains("[hash:8]"));
        assert!(profile.output.chunk_filename.contains("[hash:8]"));
        assert!(profile.output.css_filename.contains("[hash:8]"));
    }

    #[test]
    fn test_development_filenames_are_stable() {
        let profile = development(&paths());
        assert_eq!(profile.output.filename, "js/bundle.js");
        assert!(!profile.output.chunk_filename.contains("[hash:8]"));
    }

    #[test]
    fn test_analyze_adds_exactly_one_report_plugin() {
        let without = production(&paths(), &BuildEnv::new("production", false));
        let with = production(&paths(), &BuildEnv::new("production", true));

        let count = |p: &BuildProfile| {
            p.plugins
                .names()
                .iter()
                .filter(|&&n| n == "bundle-report")
                .count()
        };

        assert_eq!(count(&without), 0);
        assert_eq!(count(&with), 1);
        assert_eq!(with.plugins.names().len(), without.plugins.names().len() + 1);
    }

    #[test]
    fn test_production_bails() {
        let profile = production(&paths(), &BuildEnv::default());
        assert!(profile.bail);
        assert!(profile.server.is_none());
    }

    #[test]
    fn test_staging_enables_file_maps_and_disables_compaction() {
        let profile = production(&paths(), &BuildEnv::new("staging", false));
        assert_eq!(profile.source_maps, SourceMaps::File);
        assert!(!profile.optimization.compact);

        let plain = production(&paths(), &BuildEnv::new("production", false));
        assert_eq!(plain.source_maps, SourceMaps::None);
        assert!(plain.optimization.compact);
    }

    #[test]
    fn test_development_server_defaults() {
        let profile = development(&paths());
        let server = profile.server.unwrap();
        assert_eq!(server.port, 8000);
        assert!(server.history_fallback);
        assert!(server.hot);
        assert!(profile.plugins.names().contains(&"hot-reload"));
    }
}
