//! The transform rule table.
//!
//! An ordered list of rules maps file-extension patterns to transform
//! chains. Routing is first-match-wins; a single fallback rule (no
//! pattern) catches everything unmatched. This mirrors a bundler's
//! loader table as an abstract "match pattern → ordered transform list"
//! structure.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A set of lowercase file extensions to match against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPattern {
    extensions: Vec<String>,
}

impl MatchPattern {
    #[must_use]
    pub fn extensions(exts: &[&str]) -> Self {
        Self {
            extensions: exts.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// Check whether a path's extension is in this pattern.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }
}

/// Options for the script transform chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptOptions {
    /// Compile-time constant replacements (e.g. `process.env.NODE_ENV`).
    pub defines: Vec<(String, String)>,
    /// Strip comments and blank lines from transformed output.
    pub compact: bool,
    /// Apply defines/compaction only to project sources, passing
    /// `node_modules` code through untouched.
    pub src_only: bool,
}

impl ScriptOptions {
    /// The standard define set for a given mode value (`development`,
    /// `production`, `staging`, ...).
    #[must_use]
    pub fn defines_for(node_env: &str) -> Vec<(String, String)> {
        vec![(
            "process.env.NODE_ENV".to_string(),
            format!("\"{node_env}\""),
        )]
    }
}

/// Options for the stylesheet transform chain.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StyleOptions {
    /// Add vendor prefixes for the supported browser set.
    pub autoprefix: bool,
    /// Minify the emitted CSS.
    pub minify: bool,
    /// Extract into a CSS bundle file instead of injecting via JS.
    pub extract: bool,
}

/// One named transform with its options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Transform {
    /// Script rewriting: defines, module-syntax rewriting, compaction.
    Script(ScriptOptions),
    /// JSON modules become `module.exports = <value>`.
    Json,
    /// Stylesheet processing (autoprefix / minify / extract-or-inject).
    Style(StyleOptions),
    /// Sass compilation feeding the style chain.
    Sass { include_paths: Vec<PathBuf> },
    /// Inline small assets as data URIs; larger files fall through to
    /// emission under the given name template.
    InlineAsset { limit: u64, name: String },
    /// Emit the file under a hashed name template.
    EmitFile { name: String },
}

impl Transform {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Script(_) => "script",
            Transform::Json => "json",
            Transform::Style(_) => "style",
            Transform::Sass { .. } => "sass",
            Transform::InlineAsset { .. } => "inline-asset",
            Transform::EmitFile { .. } => "emit-file",
        }
    }
}

/// An ordered chain of transforms; earlier output feeds later input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformChain(pub Vec<Transform>);

impl TransformChain {
    /// Find the first transform in the chain with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Transform> {
        self.0.iter().find(|t| t.name() == name)
    }
}

/// One routing rule: a pattern and the chain applied on match.
///
/// A rule without a pattern is the fallback; its `exclude` list names
/// extensions it refuses so they surface as routing errors instead of
/// being silently emitted as files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: Option<MatchPattern>,
    pub chain: TransformChain,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// The ordered rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Route a path to its transform chain. First match wins; the
    /// fallback applies when no pattern matches, unless the extension is
    /// excluded from it.
    #[must_use]
    pub fn route(&self, path: &Path) -> Option<&Rule> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        for rule in &self.rules {
            match &rule.pattern {
                Some(pattern) => {
                    if pattern.matches(path) {
                        return Some(rule);
                    }
                }
                None => {
                    if rule.exclude.iter().any(|e| *e == ext) {
                        return None;
                    }
                    return Some(rule);
                }
            }
        }

        None
    }

    /// Transform names in routing order, for inspection and tests.
    #[must_use]
    pub fn chain_names(&self) -> Vec<Vec<&'static str>> {
        self.rules
            .iter()
            .map(|r| r.chain.0.iter().map(Transform::name).collect())
            .collect()
    }
}

/// Build the standard rule table shared by both profiles.
///
/// The options vary by mode: production compacts scripts and extracts
/// minified CSS; development keeps stable output and injects styles.
#[must_use]
pub fn standard_rules(node_env: &str, compact: bool, extract_css: bool, src: &Path) -> RuleSet {
    let style = StyleOptions {
        autoprefix: true,
        minify: extract_css,
        extract: extract_css,
    };

    RuleSet::new(vec![
        Rule {
            pattern: Some(MatchPattern::extensions(&[
                "bmp", "gif", "jpg", "jpeg", "png",
            ])),
            chain: TransformChain(vec![Transform::InlineAsset {
                limit: 10_000,
                name: "media/[name].[hash:8].[ext]".to_string(),
            }]),
            exclude: Vec::new(),
        },
        Rule {
            pattern: Some(MatchPattern::extensions(&["js", "jsx"])),
            chain: TransformChain(vec![Transform::Script(ScriptOptions {
                defines: ScriptOptions::defines_for(node_env),
                compact,
                src_only: true,
            })]),
            exclude: Vec::new(),
        },
        Rule {
            pattern: Some(MatchPattern::extensions(&["json"])),
            chain: TransformChain(vec![Transform::Json]),
            exclude: Vec::new(),
        },
        Rule {
            pattern: Some(MatchPattern::extensions(&["css"])),
            chain: TransformChain(vec![Transform::Style(style)]),
            exclude: Vec::new(),
        },
        Rule {
            pattern: Some(MatchPattern::extensions(&["scss", "sass"])),
            chain: TransformChain(vec![
                Transform::Sass {
                    include_paths: vec![src.join("styles")],
                },
                Transform::Style(style),
            ]),
            exclude: Vec::new(),
        },
        Rule {
            pattern: Some(MatchPattern::extensions(&[
                "ttf", "eot", "woff", "woff2",
            ])),
            chain: TransformChain(vec![Transform::EmitFile {
                name: "fonts/[name].[hash:8].[ext]".to_string(),
            }]),
            exclude: Vec::new(),
        },
        Rule {
            pattern: None,
            chain: TransformChain(vec![Transform::EmitFile {
                name: "media/[name].[hash:8].[ext]".to_string(),
            }]),
            exclude: vec![
                "js".to_string(),
                "jsx".to_string(),
                "html".to_string(),
                "json".to_string(),
            ],
        },
    ])
}
