//! Output descriptors and filename templates.
//!
//! Templates use `[name]`, `[hash:8]` and `[ext]` placeholders.
//! Production templates embed a content hash so client caches invalidate
//! whenever output content changes; development templates are stable
//! names for debugging.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where and under which names build output is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDescriptor {
    /// Absolute output directory.
    pub dir: PathBuf,
    /// Entry chunk filename template.
    pub filename: String,
    /// Non-entry chunk filename template.
    pub chunk_filename: String,
    /// Extracted CSS bundle filename template.
    pub css_filename: String,
    /// URL prefix under which output is served.
    pub public_path: String,
}

impl OutputDescriptor {
    /// Render a template with a chunk/asset name and content hash.
    #[must_use]
    pub fn render(template: &str, name: &str, hash: &str) -> String {
        template
            .replace("[name]", name)
            .replace("[hash:8]", &hash[..hash.len().min(8)])
    }

    /// Render an asset template with stem, hash and extension.
    #[must_use]
    pub fn render_asset(template: &str, stem: &str, hash: &str, ext: &str) -> String {
        Self::render(template, stem, hash).replace("[ext]", ext)
    }

    /// Filename for the entry chunk.
    #[must_use]
    pub fn entry_file(&self, name: &str, hash: &str) -> String {
        Self::render(&self.filename, name, hash)
    }

    /// Filename for a non-entry chunk.
    #[must_use]
    pub fn chunk_file(&self, name: &str, hash: &str) -> String {
        Self::render(&self.chunk_filename, name, hash)
    }

    /// Filename for the extracted CSS bundle.
    #[must_use]
    pub fn css_file(&self, name: &str, hash: &str) -> String {
        Self::render(&self.css_filename, name, hash)
    }

    /// Public URL for an output-relative file path.
    #[must_use]
    pub fn url(&self, file: &str) -> String {
        format!("{}{}", self.public_path, file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prod() -> OutputDescriptor {
        OutputDescriptor {
            dir: PathBuf::from("/app/build/production"),
            filename: "js/[name].[hash:8].js".to_string(),
            chunk_filename: "js/[name].[hash:8].chunk.js".to_string(),
            css_filename: "css/[name].[hash:8].css".to_string(),
            public_path: "/".to_string(),
        }
    }

    #[test]
    fn test_hashed_templates() {
        let out = prod();
        assert_eq!(
            out.entry_file("main", "0123456789abcdef"),
            "js/main.01234567.js"
        );
        assert_eq!(
            out.chunk_file("vendors", "deadbeefcafe"),
            "js/vendors.deadbeef.chunk.js"
        );
        assert_eq!(out.css_file("main", "aabbccdd"), "css/main.aabbccdd.css");
    }

    #[test]
    fn test_stable_dev_templates_ignore_hash() {
        let out = OutputDescriptor {
            dir: PathBuf::from("/app/build"),
            filename: "js/bundle.js".to_string(),
            chunk_filename: "js/[name].chunk.js".to_string(),
            css_filename: "css/[name].css".to_string(),
            public_path: "/".to_string(),
        };
        assert_eq!(out.entry_file("main", "aabbccdd"), "js/bundle.js");
        assert_eq!(out.chunk_file("vendors", "aabbccdd"), "js/vendors.chunk.js");
    }

    #[test]
    fn test_asset_template() {
        assert_eq!(
            OutputDescriptor::render_asset(
                "media/[name].[hash:8].[ext]",
                "logo",
                "0011223344",
                "png"
            ),
            "media/logo.00112233.png"
        );
    }

    #[test]
    fn test_public_url() {
        let out = prod();
        assert_eq!(out.url("js/main.01234567.js"), "/js/main.01234567.js");
    }
}
