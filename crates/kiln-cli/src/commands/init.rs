//! `kiln init` command implementation.
//!
//! Writes the starter project: an HTML shell with an `app` mount node, a
//! dependency-free entry module, the placeholder app module, and a
//! stylesheet. The scaffold builds as-is with `kiln build`.

use miette::{miette, Result};
use std::path::Path;

const PACKAGE_JSON: &str = r#"{
    "name": "kiln-app",
    "private": true,
    "scripts": {
        "build": "kiln build",
        "start": "kiln dev"
    }
}
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>kiln app</title>
</head>
<body>
    <div id="app"></div>
</body>
</html>
"#;

const INDEX_JS: &str = r"import { render } from './app';
import './styles.css';

render(document.getElementById('app'));
";

const APP_JS: &str = r"export function render(root) {
    root.innerHTML =
        '<div class=\'app\'>' +
        '<h1>Hello</h1>' +
        '<h2>Start editing to see some magic happen!</h2>' +
        '</div>';
}
";

const STYLES_CSS: &str = r".app {
    font-family: sans-serif;
    text-align: center;
    margin-top: 4rem;
}

.app h2 {
    color: #666;
    font-weight: normal;
}
";

const STYLE_MOCK_JS: &str = "module.exports = {};\n";

const FILE_MOCK_JS: &str = "module.exports = 'test-file-stub';\n";

const SCAFFOLD: &[(&str, &str)] = &[
    ("package.json", PACKAGE_JSON),
    ("public/index.html", INDEX_HTML),
    ("src/index.js", INDEX_JS),
    ("src/app.js", APP_JS),
    ("src/styles.css", STYLES_CSS),
    ("test/setup/style-mock.js", STYLE_MOCK_JS),
    ("test/setup/file-mock.js", FILE_MOCK_JS),
];

/// Run the init command.
pub fn run(cwd: &Path, force: bool, json: bool) -> Result<()> {
    let mut written = Vec::new();
    let mut skipped = Vec::new();

    for (rel, content) in SCAFFOLD {
        let target = cwd.join(rel);
        if target.exists() && !force {
            skipped.push((*rel).to_string());
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| miette!("cannot create {}: {e}", parent.display()))?;
        }
        std::fs::write(&target, content)
            .map_err(|e| miette!("cannot write {}: {e}", target.display()))?;
        written.push((*rel).to_string());
    }

    if json {
        let result = serde_json::json!({
            "ok": true,
            "written": written,
            "skipped": skipped,
        });
        println!("{result}");
    } else {
        for rel in &written {
            println!("  created {rel}");
        }
        for rel in &skipped {
            println!("  skipped {rel} (exists, use --force to overwrite)");
        }
        if !written.is_empty() {
            println!("\n  done. Try `kiln dev` or `kiln build`.");
        }
    }

    Ok(())
}
