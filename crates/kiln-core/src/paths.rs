//! Project path conventions.
//!
//! kiln projects follow a fixed layout: sources under `src/` with an
//! `src/index.js` entry, static files under `public/` (including the HTML
//! shell template), and build output under `build/`.

use std::path::{Path, PathBuf};

/// Resolved filesystem layout for one project.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    /// Project root directory.
    pub root: PathBuf,
    /// Source root (`src/`).
    pub src: PathBuf,
    /// Application entry point (`src/index.js`).
    pub entry: PathBuf,
    /// Static assets directory (`public/`).
    pub public: PathBuf,
    /// HTML shell template (`public/index.html`).
    pub html: PathBuf,
    /// Build output root (`build/`).
    pub build: PathBuf,
}

impl ProjectPaths {
    /// Derive the conventional layout from a project root.
    #[must_use]
    pub fn from_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            src: root.join("src"),
            entry: root.join("src").join("index.js"),
            public: root.join("public"),
            html: root.join("public").join("index.html"),
            build: root.join("build"),
        }
    }

    /// Module resolution roots, in probe order.
    #[must_use]
    pub fn resolve_roots(&self) -> Vec<PathBuf> {
        vec![self.root.join("node_modules"), self.src.clone()]
    }
}

/// Find the project root by walking up from `cwd` looking for `package.json` or `.git`.
///
/// Returns the first directory containing either marker, or `None` if neither is found.
#[must_use]
pub fn project_root(cwd: &Path) -> Option<PathBuf> {
    let mut current = cwd.to_path_buf();

    loop {
        if current.join("package.json").exists() || current.join(".git").exists() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}
