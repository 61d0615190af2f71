//! HTML shell generation.

use super::{BuildPlugin, PluginContext};
use crate::pipeline::{BuildArtifacts, BuildError};

/// Reads the HTML template and injects `<link>`/`<script>` tags for the
/// emitted CSS and chunks, in load order.
#[derive(Debug)]
pub struct HtmlShell {
    minify: bool,
}

impl HtmlShell {
    /// Production shell: inter-tag whitespace collapsed.
    #[must_use]
    pub fn minified() -> Self {
        Self { minify: true }
    }

    /// Development shell: template whitespace preserved.
    #[must_use]
    pub fn pretty() -> Self {
        Self { minify: false }
    }
}

impl BuildPlugin for HtmlShell {
    fn name(&self) -> &'static str {
        "html-shell"
    }

    fn after_emit(
        &self,
        ctx: &PluginContext<'_>,
        artifacts: &mut BuildArtifacts,
    ) -> Result<(), BuildError> {
        let template =
            kiln_util::fs::read_to_string_lossy(&ctx.paths.html).map_err(|e| BuildError {
                code: "HTML_TEMPLATE_MISSING",
                message: e.to_string(),
                path: Some(ctx.paths.html.display().to_string()),
            })?;

        let links: String = artifacts
            .css_files
            .iter()
            .map(|f| format!("<link rel=\"stylesheet\" href=\"{}\">", ctx.output.url(f)))
            .collect();

        let scripts: String = artifacts
            .chunk_files
            .iter()
            .map(|(_, f)| format!("<script src=\"{}\"></script>", ctx.output.url(f)))
            .collect();

        let html = inject(&template, "</head>", &links);
        let html = inject(&html, "</body>", &scripts);
        let html = if self.minify { minify_html(&html) } else { html };

        artifacts.push("index.html", html.into_bytes());
        Ok(())
    }
}

/// Insert `content` immediately before `marker`, or append when the
/// marker is absent.
fn inject(html: &str, marker: &str, content: &str) -> String {
    if content.is_empty() {
        return html.to_string();
    }
    match html.find(marker) {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + content.len());
            out.push_str(&html[..idx]);
            out.push_str(content);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{content}"),
    }
}

/// Collapse inter-tag whitespace: lines are trimmed and joined.
fn minify_html(html: &str) -> String {
    html.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputDescriptor;
    use crate::paths::ProjectPaths;
    use crate::profile::Mode;
    use std::fs;
    use tempfile::tempdir;

    fn setup(dir: &std::path::Path) -> (ProjectPaths, OutputDescriptor) {
        let paths = ProjectPaths::from_root(dir);
        fs::create_dir_all(&paths.public).unwrap();
        fs::write(
            &paths.html,
            "<!DOCTYPE html>\n<html>\n<head>\n<title>t</title>\n</head>\n<body>\n<div id=\"app\"></div>\n</body>\n</html>\n",
        )
        .unwrap();
        let output = OutputDescriptor {
            dir: paths.build.clone(),
            filename: "js/[name].[hash:8].js".to_string(),
            chunk_filename: "js/[name].[hash:8].chunk.js".to_string(),
            css_filename: "css/[name].[hash:8].css".to_string(),
            public_path: "/".to_string(),
        };
        (paths, output)
    }

    #[test]
    fn test_injects_scripts_and_links_in_order() {
        let dir = tempdir().unwrap();
        let (paths, output) = setup(dir.path());
        let ctx = PluginContext {
            paths: &paths,
            mode: Mode::Production,
            output: &output,
        };

        let mut artifacts = BuildArtifacts::default();
        artifacts
            .chunk_files
            .push(("runtime".to_string(), "js/runtime.aaaa1111.chunk.js".to_string()));
        artifacts
            .chunk_files
            .push(("main".to_string(), "js/main.bbbb2222.js".to_string()));
        artifacts.css_files.push("css/main.cccc3333.css".to_string());

        HtmlShell::minified().after_emit(&ctx, &mut artifacts).unwrap();

        let html = String::from_utf8(artifacts.get("index.html").unwrap().contents.clone()).unwrap();
        let runtime_pos = html.find("runtime.aaaa1111").unwrap();
        let main_pos = html.find("main.bbbb2222").unwrap();
        assert!(runtime_pos < main_pos);
        assert!(html.contains("<link rel=\"stylesheet\" href=\"/css/main.cccc3333.css\">"));
        // whitespace collapsed
        assert!(!html.contains('\n'));
    }

    #[test]
    fn test_pretty_shell_preserves_template_lines() {
        let dir = tempdir().unwrap();
        let (paths, output) = setup(dir.path());
        let ctx = PluginContext {
            paths: &paths,
            mode: Mode::Development,
            output: &output,
        };

        let mut artifacts = BuildArtifacts::default();
        artifacts
            .chunk_files
            .push(("main".to_string(), "js/bundle.js".to_string()));

        HtmlShell::pretty().after_emit(&ctx, &mut artifacts).unwrap();

        let html = String::from_utf8(artifacts.get("index.html").unwrap().contents.clone()).unwrap();
        assert!(html.contains('\n'));
        assert!(html.contains("<script src=\"/js/bundle.js\"></script>"));
    }

    #[test]
    fn test_missing_template_fails() {
        let dir = tempdir().unwrap();
        let paths = ProjectPaths::from_root(dir.path());
        let output = OutputDescriptor {
            dir: paths.build.clone(),
            filename: "js/bundle.js".to_string(),
            chunk_filename: "js/[name].chunk.js".to_string(),
            css_filename: "css/[name].css".to_string(),
            public_path: "/".to_string(),
        };
        let ctx = PluginContext {
            paths: &paths,
            mode: Mode::Development,
            output: &output,
        };

        let mut artifacts = BuildArtifacts::default();
        let err = HtmlShell::pretty().after_emit(&ctx, &mut artifacts).unwrap_err();
        assert_eq!(err.code, "HTML_TEMPLATE_MISSING");
    }
}
