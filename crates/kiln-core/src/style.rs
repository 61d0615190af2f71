//! Stylesheet processing.
//!
//! CSS goes through lightningcss for vendor prefixing and minification;
//! Sass/SCSS sources are compiled with grass first. In development the
//! result is wrapped in a small injection module; in production it is
//! extracted into the CSS bundle.

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::path::Path;
use thiserror::Error;

/// Stylesheet processing error.
#[derive(Debug, Error)]
pub enum StyleError {
    #[error("CSS parse error: {0}")]
    Parse(String),

    #[error("CSS transform error: {0}")]
    Transform(String),

    #[error("CSS print error: {0}")]
    Print(String),

    #[error("Sass compilation error: {0}")]
    Sass(String),
}

/// Options for one stylesheet pass.
#[derive(Debug, Clone, Default)]
pub struct StylesheetOptions {
    /// Minify the output.
    pub minify: bool,
    /// Add vendor prefixes for the supported browser set.
    pub autoprefix: bool,
    /// Source path, for error messages.
    pub filename: Option<String>,
}

/// Process CSS with lightningcss.
pub fn process_stylesheet(source: &str, options: &StylesheetOptions) -> Result<String, StyleError> {
    let filename = options.filename.as_deref().unwrap_or("input.css");

    let parser_options = ParserOptions::default();
    let mut stylesheet = StyleSheet::parse(source, parser_options)
        .map_err(|e| StyleError::Parse(format!("{filename}: {e}")))?;

    let targets = if options.autoprefix {
        default_browser_targets()
    } else {
        Browsers::default()
    };

    // minify() also applies the target-driven transforms (prefixing, nesting)
    if options.minify || options.autoprefix {
        stylesheet
            .minify(MinifyOptions {
                targets: Targets::from(targets),
                ..Default::default()
            })
            .map_err(|e| StyleError::Transform(format!("{filename}: {e}")))?;
    }

    let printer_options = PrinterOptions {
        minify: options.minify,
        targets: Targets::from(targets),
        ..Default::default()
    };

    let output = stylesheet
        .to_css(printer_options)
        .map_err(|e| StyleError::Print(format!("{filename}: {e}")))?;

    Ok(output.code)
}

/// Options for Sass compilation.
#[derive(Debug, Clone, Default)]
pub struct SassOptions {
    /// Include paths for `@import`/`@use` resolution.
    pub include_paths: Vec<std::path::PathBuf>,
    /// Compressed output style.
    pub minify: bool,
    /// Source path, for error messages and relative imports.
    pub filename: Option<String>,
}

/// Compile Sass/SCSS to CSS.
///
/// Both `.scss` and the indented `.sass` syntax are accepted; grass picks
/// the syntax from the content.
pub fn compile_sass(source: &str, options: &SassOptions) -> Result<String, StyleError> {
    let mut grass_options = grass::Options::default();

    if options.minify {
        grass_options = grass_options.style(grass::OutputStyle::Compressed);
    } else {
        grass_options = grass_options.style(grass::OutputStyle::Expanded);
    }

    for path in &options.include_paths {
        grass_options = grass_options.load_path(path);
    }

    // The source's own directory resolves its relative imports
    if let Some(ref fname) = options.filename {
        if let Some(parent) = Path::new(fname).parent() {
            grass_options = grass_options.load_path(parent);
        }
    }

    grass::from_string(source.to_string(), &grass_options)
        .map_err(|e| StyleError::Sass(e.to_string()))
}

/// Default browser targets for vendor prefixing.
///
/// Approximates modern evergreen coverage: Chrome 80+, Firefox 75+,
/// Safari 13+, Edge 80+.
fn default_browser_targets() -> Browsers {
    Browsers {
        chrome: Some(80 << 16),
        firefox: Some(75 << 16),
        safari: Some(13 << 16),
        edge: Some(80 << 16),
        ..Default::default()
    }
}

/// Generate the development-mode injection module for a stylesheet.
///
/// The module appends a `<style>` element on evaluation, matching the
/// behavior of style injection in unextracted development builds.
#[must_use]
pub fn injection_module(css: &str) -> String {
    let escaped = css
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${");

    format!(
        r"var style = document.createElement('style');
style.textContent = `{escaped}`;
document.head.appendChild(style);
module.exports = style;
"
    )
}
