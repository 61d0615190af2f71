//! Module resolution.
//!
//! Relative specifiers resolve against the importing file; bare
//! specifiers probe the configured roots (`node_modules`, then `src`).
//! Extensionless specifiers probe the configured extension list, then
//! `index.<ext>` inside directories.

use std::path::{Path, PathBuf};

/// A failed resolution.
#[derive(Debug, Clone)]
pub struct ResolveError {
    /// The specifier that failed to resolve.
    pub specifier: String,
    /// Path of the importing module.
    pub from: String,
    pub message: String,
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot resolve '{}' from {}: {}",
            self.specifier, self.from, self.message
        )
    }
}

impl std::error::Error for ResolveError {}

/// Specifier resolver over a set of roots and probe extensions.
#[derive(Debug, Clone)]
pub struct Resolver {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl Resolver {
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, extensions: Vec<String>) -> Self {
        Self { roots, extensions }
    }

    /// Resolve a specifier from an importing file to an existing path.
    pub fn resolve(&self, specifier: &str, importer: &Path) -> Result<PathBuf, ResolveError> {
        let err = |message: String| ResolveError {
            specifier: specifier.to_string(),
            from: importer.display().to_string(),
            message,
        };

        if specifier.starts_with('.') {
            let base = importer
                .parent()
                .ok_or_else(|| err("importer has no parent directory".to_string()))?
                .join(specifier);
            return self
                .probe(&base)
                .ok_or_else(|| err("no file matches the specifier".to_string()));
        }

        if Path::new(specifier).is_absolute() {
            return self
                .probe(Path::new(specifier))
                .ok_or_else(|| err("no file at absolute path".to_string()));
        }

        for root in &self.roots {
            if let Some(found) = self.probe(&root.join(specifier)) {
                return Ok(found);
            }
        }

        Err(err(format!(
            "not found under {} resolution root(s)",
            self.roots.len()
        )))
    }

    /// Probe a base path: exact file, then each extension, then
    /// `index.<ext>` if the base is a directory.
    fn probe(&self, base: &Path) -> Option<PathBuf> {
        if base.is_file() {
            return canonical(base);
        }

        for ext in &self.extensions {
            let candidate = PathBuf::from(format!("{}.{}", base.display(), ext));
            if candidate.is_file() {
                return canonical(&candidate);
            }
        }

        if base.is_dir() {
            for ext in &self.extensions {
                let candidate = base.join(format!("index.{ext}"));
                if candidate.is_file() {
                    return canonical(&candidate);
                }
            }
        }

        None
    }
}

fn canonical(path: &Path) -> Option<PathBuf> {
    path.canonicalize().ok()
}
