//! Test-runner configuration.
//!
//! Declares test discovery roots and match patterns, maps stylesheet and
//! binary-media imports to mock modules, mirrors the build's script
//! transform options, and gates test runs on coverage thresholds.
//! An optional `kiln.test.json` at the project root overrides the
//! defaults; test execution itself is delegated to the JS runner.

use crate::error::Error;
use crate::rules::ScriptOptions;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maps import paths matching a pattern to a mock module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockMapping {
    /// Regular expression applied to the imported path.
    pub pattern: String,
    /// Project-relative mock module path.
    pub mock: String,
}

/// Minimum coverage percentages; a run below any of them fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageThresholds {
    pub statements: f64,
    pub branches: f64,
    pub functions: f64,
    pub lines: f64,
}

impl Default for CoverageThresholds {
    fn default() -> Self {
        Self {
            statements: 12.0,
            branches: 8.0,
            functions: 12.0,
            lines: 12.0,
        }
    }
}

/// Aggregate coverage percentages reported by the test runner.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageSummary {
    pub statements: f64,
    pub branches: f64,
    pub functions: f64,
    pub lines: f64,
}

impl CoverageSummary {
    /// Load a summary from a JSON file.
    ///
    /// Accepts both the flat shape (`{"statements": 40.0, ...}`) and the
    /// istanbul `coverage-summary.json` shape
    /// (`{"total": {"statements": {"pct": 40.0}, ...}}`).
    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(total) = value.get("total") {
            let pct = |metric: &str| {
                total
                    .get(metric)
                    .and_then(|m| m.get("pct"))
                    .and_then(serde_json::Value::as_f64)
                    .unwrap_or(0.0)
            };
            return Ok(Self {
                statements: pct("statements"),
                branches: pct("branches"),
                functions: pct("functions"),
                lines: pct("lines"),
            });
        }

        serde_json::from_value(value).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// One threshold the summary fell short of.
#[derive(Debug, Clone, Serialize)]
pub struct GateViolation {
    pub metric: &'static str,
    pub actual: f64,
    pub required: f64,
}

impl std::fmt::Display for GateViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "coverage for {} ({:.2}%) does not meet threshold ({:.2}%)",
            self.metric, self.actual, self.required
        )
    }
}

impl CoverageThresholds {
    /// Check a summary against the thresholds.
    ///
    /// An empty result means the gate passes.
    #[must_use]
    pub fn check(&self, summary: &CoverageSummary) -> Vec<GateViolation> {
        let checks = [
            ("statements", summary.statements, self.statements),
            ("branches", summary.branches, self.branches),
            ("functions", summary.functions, self.functions),
            ("lines", summary.lines, self.lines),
        ];

        checks
            .into_iter()
            .filter(|(_, actual, required)| actual < required)
            .map(|(metric, actual, required)| GateViolation {
                metric,
                actual,
                required,
            })
            .collect()
    }
}

/// The complete test-runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestConfig {
    /// Directories searched for test files, relative to the project root.
    pub roots: Vec<String>,
    /// Glob patterns a test file path must match.
    pub test_match: Vec<String>,
    /// Path substrings excluded from discovery.
    pub ignore: Vec<String>,
    /// Import path → mock module mappings.
    pub module_name_mapper: Vec<MockMapping>,
    /// Script transform options, mirroring the build's.
    pub transform: ScriptOptions,
    /// Coverage gate thresholds.
    pub coverage: CoverageThresholds,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            roots: vec!["src".to_string(), "test".to_string()],
            test_match: vec![
                "**/*.test.js".to_string(),
                "**/*.test.jsx".to_string(),
                "**/*.spec.js".to_string(),
                "**/*.spec.jsx".to_string(),
                "test/**".to_string(),
            ],
            ignore: vec!["node_modules".to_string(), "test/setup".to_string()],
            module_name_mapper: vec![
                MockMapping {
                    pattern: r"\.(css|scss|sass)$".to_string(),
                    mock: "test/setup/style-mock.js".to_string(),
                },
                MockMapping {
                    pattern: r"\.(jpg|jpeg|png|gif|eot|otf|webp|svg|ttf|woff|woff2|mp4|webm|wav|mp3|m4a|aac|oga)$"
                        .to_string(),
                    mock: "test/setup/file-mock.js".to_string(),
                },
            ],
            transform: ScriptOptions {
                defines: ScriptOptions::defines_for("test"),
                compact: false,
                src_only: true,
            },
            coverage: CoverageThresholds::default(),
        }
    }
}

/// Config file name at the project root.
pub const CONFIG_FILE: &str = "kiln.test.json";

impl TestConfig {
    /// Load the configuration from `kiln.test.json`, falling back to the
    /// defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(Error::ConfigRead { path, source }),
        };

        serde_json::from_str(&content).map_err(|source| Error::ConfigParse { path, source })
    }

    /// Mock module for an import path, if any mapping matches.
    #[must_use]
    pub fn mock_for(&self, import_path: &str) -> Option<&str> {
        self.module_name_mapper.iter().find_map(|mapping| {
            Regex::new(&mapping.pattern)
                .ok()
                .filter(|re| re.is_match(import_path))
                .map(|_| mapping.mock.as_str())
        })
    }

    /// Discover test files under the configured roots.
    ///
    /// Returns project-relative paths in sorted order.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, Error> {
        let mut patterns = Vec::with_capacity(self.test_match.len());
        for pattern in &self.test_match {
            patterns.push(
                glob::Pattern::new(pattern)
                    .map_err(|e| Error::other(format!("invalid testMatch pattern '{pattern}': {e}")))?,
            );
        }

        let mut found = Vec::new();

        for dir in &self.roots {
            let base = root.join(dir);
            if !base.is_dir() {
                continue;
            }

            for entry in walkdir::WalkDir::new(&base).follow_links(false) {
                let entry = entry.map_err(|e| Error::other(e.to_string()))?;
                if !entry.file_type().is_file() {
                    continue;
                }

                let ext = entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("");
                if ext != "js" && ext != "jsx" {
                    continue;
                }

                let rel = entry
                    .path()
                    .strip_prefix(root)
                    .unwrap_or(entry.path())
                    .display()
                    .to_string()
                    .replace('\\', "/");

                if self.ignore.iter().any(|i| rel.contains(i.as_str())) {
                    continue;
                }

                if patterns.iter().any(|p| p.matches(&rel)) {
                    found.push(PathBuf::from(rel));
                }
            }
        }

        found.sort();
        found.dedup();
        Ok(found)
    }
}
