//! Per-module transforms.
//!
//! Each module is routed through the first matching rule chain. Script
//! modules get define replacement and line-based module-syntax rewriting
//! into the registry calling convention; stylesheets are processed and
//! either injected (development) or extracted (production); assets become
//! URL- or data-URI-exporting modules.

use super::graph::{Module, ModuleKind};
use super::BuildError;
use crate::output::OutputDescriptor;
use crate::rules::{Rule, ScriptOptions, StyleOptions, Transform};
use crate::style::{self, SassOptions, StylesheetOptions};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// A file emitted verbatim alongside the chunks (fonts, large media).
#[derive(Debug, Clone)]
pub struct EmittedAsset {
    /// Output-relative filename (already hashed).
    pub name: String,
    pub bytes: Vec<u8>,
}

/// The result of transforming one module.
#[derive(Debug, Clone)]
pub struct TransformedModule {
    pub id: String,
    pub rel_path: String,
    /// Registry factory body (JavaScript statements).
    pub body: String,
    /// CSS extracted from this module (production style chain).
    pub css: Option<String>,
    /// File to emit alongside the chunks.
    pub emitted: Option<EmittedAsset>,
}

/// Transform one module according to its routed rule.
pub fn transform_module(
    module: &Module,
    rule: &Rule,
    output: &OutputDescriptor,
) -> Result<TransformedModule, BuildError> {
    let mismatch = || BuildError {
        code: "RULE_MISMATCH",
        message: format!(
            "rule routed for {} has no transform for {:?} content",
            module.rel_path, module.kind
        ),
        path: Some(module.rel_path.clone()),
    };

    let mut out = TransformedModule {
        id: module.id.clone(),
        rel_path: module.rel_path.clone(),
        body: String::new(),
        css: None,
        emitted: None,
    };

    match module.kind {
        ModuleKind::Script => {
            let Some(Transform::Script(opts)) = rule.chain.find("script") else {
                return Err(mismatch());
            };
            out.body = transform_script(module, opts);
        }
        ModuleKind::Json => {
            if rule.chain.find("json").is_none() {
                return Err(mismatch());
            }
            out.body = transform_json(module)?;
        }
        ModuleKind::Stylesheet => {
            let Some(Transform::Style(opts)) = rule.chain.find("style") else {
                return Err(mismatch());
            };
            let css = process_style(&module.source_text(), &module.rel_path, *opts, None)?;
            apply_style_output(&mut out, css, *opts);
        }
        ModuleKind::Sass => {
            let Some(Transform::Sass { include_paths }) = rule.chain.find("sass") else {
                return Err(mismatch());
            };
            let Some(Transform::Style(opts)) = rule.chain.find("style") else {
                return Err(mismatch());
            };
            let css = process_style(
                &module.source_text(),
                &module.rel_path,
                *opts,
                Some(include_paths.as_slice()),
            )?;
            apply_style_output(&mut out, css, *opts);
        }
        ModuleKind::Asset => {
            let (body, emitted) = transform_asset(module, rule, output).ok_or_else(mismatch)?;
            out.body = body;
            out.emitted = emitted;
        }
    }

    Ok(out)
}

fn apply_style_output(out: &mut TransformedModule, css: String, opts: StyleOptions) {
    if opts.extract {
        out.body = format!("/* extracted: {} */\n", out.rel_path);
        out.css = Some(css);
    } else {
        out.body = style::injection_module(&css);
    }
}

fn process_style(
    source: &str,
    rel_path: &str,
    opts: StyleOptions,
    sass_include_paths: Option<&[std::path::PathBuf]>,
) -> Result<String, BuildError> {
    let style_err = |e: style::StyleError| BuildError {
        code: "STYLE_ERROR",
        message: e.to_string(),
        path: Some(rel_path.to_string()),
    };

    let css = if let Some(include_paths) = sass_include_paths {
        style::compile_sass(
            source,
            &SassOptions {
                include_paths: include_paths.to_vec(),
                minify: false,
                filename: Some(rel_path.to_string()),
            },
        )
        .map_err(style_err)?
    } else {
        source.to_string()
    };

    style::process_stylesheet(
        &css,
        &StylesheetOptions {
            minify: opts.minify,
            autoprefix: opts.autoprefix,
            filename: Some(rel_path.to_string()),
        },
    )
    .map_err(style_err)
}

/// Transform a script module: defines, module-syntax rewriting, compaction.
fn transform_script(module: &Module, opts: &ScriptOptions) -> String {
    let vendored = opts.src_only && module.is_vendor();
    let mut text = module.source_text();

    if !vendored {
        for (key, value) in &opts.defines {
            text = text.replace(key.as_str(), value.as_str());
        }
    }

    // Dynamic imports and CJS requires are call expressions; rewrite them
    // textually against the resolved dependency map.
    for (spec, id) in &module.dependencies {
        for quote in ['\'', '"'] {
            text = text.replace(
                &format!("import({quote}{spec}{quote})"),
                &format!("Promise.resolve(require(\"{id}\"))"),
            );
            text = text.replace(
                &format!("require({quote}{spec}{quote})"),
                &format!("require(\"{id}\")"),
            );
        }
    }

    // Line-based rewriting of import/export statements
    let mut body = String::with_capacity(text.len() + 100);
    let mut pending_exports: Vec<String> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("import ") || trimmed.starts_with("import'")
            || trimmed.starts_with("import\"")
        {
            body.push_str(&rewrite_import(line, module));
            body.push('\n');
        } else if trimmed.starts_with("export ") {
            let (rewritten, exports) = rewrite_export(line, module);
            body.push_str(&rewritten);
            body.push('\n');
            pending_exports.extend(exports);
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }

    for stmt in pending_exports {
        body.push_str(&stmt);
        body.push('\n');
    }

    if opts.compact && !vendored {
        compact_source(&body)
    } else {
        body
    }
}

/// Rewrite a single `import ...` line against the dependency map.
fn rewrite_import(line: &str, module: &Module) -> String {
    let trimmed = line.trim();

    let require_for = |spec: &str| match module.dependencies.get(spec) {
        Some(id) => format!("require(\"{id}\")"),
        // External or unresolved: left as a plain require
        None => format!("require('{spec}')"),
    };

    if let Some(from_idx) = trimmed.find(" from ") {
        let clause = trimmed[7..from_idx].trim();
        let spec = trimmed[from_idx + 6..]
            .trim()
            .trim_matches(|c| c == '\'' || c == '"' || c == ';');
        let req = require_for(spec);

        // import { a, b as c } from 'spec'
        if clause.starts_with('{') {
            let destructure = clause.replace(" as ", ": ");
            return format!("var {destructure} = {req};");
        }

        // import * as ns from 'spec'
        if let Some(ns) = clause.strip_prefix("* as ") {
            return format!("var {} = {req};", ns.trim());
        }

        // import def, { a } from 'spec'
        if let Some((default_name, rest)) = clause.split_once(',') {
            let rest = rest.trim();
            if rest.starts_with('{') {
                let destructure = rest.replace(" as ", ": ");
                return format!(
                    "var {def} = {req}.default || {req}; var {destructure} = {req};",
                    def = default_name.trim()
                );
            }
        }

        // import def from 'spec'
        return format!("var {clause} = {req}.default || {req};");
    }

    // Side-effect import: import 'spec';
    if let Some(rest) = trimmed.strip_prefix("import") {
        let rest = rest.trim_start();
        if rest.starts_with('\'') || rest.starts_with('"') {
            let spec = rest.trim_matches(|c| c == '\'' || c == '"' || c == ';');
            return format!("{};", require_for(spec));
        }
    }

    // Multi-line import statements pass through; the scanner already
    // resolved their dependency edge, and the unmodified line keeps the
    // failure visible instead of silently corrupting output.
    line.to_string()
}

/// Rewrite a single `export ...` line.
///
/// Returns the replacement line plus `exports.x = x;` statements emitted
/// at the end of the module body.
fn rewrite_export(line: &str, module: &Module) -> (String, Vec<String>) {
    let trimmed = line.trim();

    let require_for = |spec: &str| match module.dependencies.get(spec) {
        Some(id) => format!("require(\"{id}\")"),
        None => format!("require('{spec}')"),
    };

    // export { a, b as c } from 'spec'; / export * from 'spec';
    if let Some(from_idx) = trimmed.find(" from ") {
        let spec = trimmed[from_idx + 6..]
            .trim()
            .trim_matches(|c| c == '\'' || c == '"' || c == ';');
        let req = require_for(spec);

        if trimmed.starts_with("export *") {
            return (String::new(), vec![format!("Object.assign(exports, {req});")]);
        }

        if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.find('}')) {
            let mut stmts = Vec::new();
            for name in trimmed[start + 1..end].split(',') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                if let Some((local, exported)) = name.split_once(" as ") {
                    stmts.push(format!(
                        "exports.{} = {req}.{};",
                        exported.trim(),
                        local.trim()
                    ));
                } else {
                    stmts.push(format!("exports.{name} = {req}.{name};"));
                }
            }
            return (String::new(), stmts);
        }
    }

    // export default ...
    if let Some(value) = trimmed.strip_prefix("export default ") {
        let value = value.trim_end_matches(';');

        // Named function declarations hoist; named classes are exported
        // at the end of the body with the other pending exports.
        if let Some(rest) = value.strip_prefix("function ") {
            if let Some(paren) = rest.find('(') {
                let name = rest[..paren].trim();
                if !name.is_empty() {
                    return (
                        value.to_string(),
                        vec![format!("exports.default = {name};")],
                    );
                }
            }
        }
        if let Some(rest) = value.strip_prefix("class ") {
            let name = rest
                .split(|c: char| c == '{' || c.is_whitespace())
                .next()
                .unwrap_or("");
            if !name.is_empty() {
                return (
                    value.to_string(),
                    vec![format!("exports.default = {name};")],
                );
            }
        }

        return (format!("exports.default = {value};"), Vec::new());
    }

    // export const/let/var
    if trimmed.starts_with("export const ")
        || trimmed.starts_with("export let ")
        || trimmed.starts_with("export var ")
    {
        let decl = trimmed.strip_prefix("export ").unwrap();
        let parts: Vec<&str> = decl.splitn(3, ' ').collect();
        if parts.len() >= 2 {
            let name = parts[1].trim_end_matches(['=', ':', ' ']);
            return (
                decl.to_string(),
                vec![format!("exports.{name} = {name};")],
            );
        }
    }

    // export function / export async function
    for prefix in ["export function ", "export async function "] {
        if trimmed.starts_with(prefix) {
            let decl = trimmed.strip_prefix("export ").unwrap();
            if let Some(paren) = decl.find('(') {
                let name = decl[..paren]
                    .trim_start_matches("async ")
                    .trim_start_matches("function ")
                    .trim();
                if !name.is_empty() {
                    return (
                        decl.to_string(),
                        vec![format!("exports.{name} = {name};")],
                    );
                }
            }
        }
    }

    // export class
    if trimmed.starts_with("export class ") {
        let decl = trimmed.strip_prefix("export ").unwrap();
        let parts: Vec<&str> = decl.splitn(3, ' ').collect();
        if parts.len() >= 2 {
            let name = parts[1].trim_end_matches(|c: char| matches!(c, '{' | ' '));
            return (
                decl.to_string(),
                vec![format!("exports.{name} = {name};")],
            );
        }
    }

    // export { a, b as c };
    if trimmed.starts_with("export {") || trimmed.starts_with("export{") {
        if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.find('}')) {
            let mut stmts = Vec::new();
            for name in trimmed[start + 1..end].split(',') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                if let Some((local, exported)) = name.split_once(" as ") {
                    stmts.push(format!(
                        "exports.{} = {};",
                        exported.trim(),
                        local.trim()
                    ));
                } else {
                    stmts.push(format!("exports.{name} = {name};"));
                }
            }
            return (String::new(), stmts);
        }
    }

    (line.to_string(), Vec::new())
}

/// JSON modules export the parsed value.
fn transform_json(module: &Module) -> Result<String, BuildError> {
    let value: serde_json::Value =
        serde_json::from_slice(&module.source).map_err(|e| BuildError {
            code: "JSON_PARSE_ERROR",
            message: e.to_string(),
            path: Some(module.rel_path.clone()),
        })?;

    Ok(format!("module.exports = {value};\n"))
}

/// Inline or emit an asset module.
fn transform_asset(
    module: &Module,
    rule: &Rule,
    output: &OutputDescriptor,
) -> Option<(String, Option<EmittedAsset>)> {
    let ext = module
        .path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_else(|| "bin".to_string());
    let stem = module
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("asset");
    let hash = kiln_util::hash::short_hash(&module.source);

    if let Some(Transform::InlineAsset { limit, name }) = rule.chain.find("inline-asset") {
        if module.source.len() as u64 <= *limit {
            let data = BASE64.encode(&module.source);
            let body = format!(
                "module.exports = \"data:{};base64,{data}\";\n",
                mime_for(&ext)
            );
            return Some((body, None));
        }
        let file = OutputDescriptor::render_asset(name, stem, &hash, &ext);
        let body = format!("module.exports = \"{}\";\n", output.url(&file));
        return Some((
            body,
            Some(EmittedAsset {
                name: file,
                bytes: module.source.clone(),
            }),
        ));
    }

    if let Some(Transform::EmitFile { name }) = rule.chain.find("emit-file") {
        let file = OutputDescriptor::render_asset(name, stem, &hash, &ext);
        let body = format!("module.exports = \"{}\";\n", output.url(&file));
        return Some((
            body,
            Some(EmittedAsset {
                name: file,
                bytes: module.source.clone(),
            }),
        ));
    }

    None
}

fn mime_for(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "eot" => "application/vnd.ms-fontobject",
        _ => "application/octet-stream",
    }
}

/// Strip comments and blank lines, keeping string contents intact.
fn compact_source(source: &str) -> String {
    let stripped = strip_comments(source);
    let mut out = String::with_capacity(stripped.len());
    for line in stripped.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() {
            continue;
        }
        out.push_str(trimmed);
        out.push('\n');
    }
    out
}

/// Strip single-line (//) and multi-line (/* */) comments from JS source.
fn strip_comments(source: &str) -> String {
    let mut result = String::with_capacity(source.len());
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len();
    let mut i = 0;
    let mut in_string: Option<char> = None;

    while i < len {
        if let Some(quote) = in_string {
            result.push(chars[i]);
            if chars[i] == '\\' && i + 1 < len {
                result.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if chars[i] == quote {
                in_string = None;
            }
            i += 1;
        } else if i + 1 < len && chars[i] == '/' && chars[i + 1] == '/' {
            while i < len && chars[i] != '\n' {
                i += 1;
            }
        } else if i + 1 < len && chars[i] == '/' && chars[i + 1] == '*' {
            i += 2;
            while i + 1 < len && !(chars[i] == '*' && chars[i + 1] == '/') {
                // Preserve newlines for line structure
                if chars[i] == '\n' {
                    result.push('\n');
                }
                i += 1;
            }
            i += 2;
        } else {
            if chars[i] == '"' || chars[i] == '\'' || chars[i] == '`' {
                in_string = Some(chars[i]);
            }
            result.push(chars[i]);
            i += 1;
        }
    }

    result
}
