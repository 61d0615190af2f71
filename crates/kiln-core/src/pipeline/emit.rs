//! Chunk rendering.
//!
//! Chunks are rendered against a small module registry: every module
//! becomes a factory registered under its stable id, and the entry chunk
//! finishes by requiring the entry module. The registry bootstrap is the
//! `runtime` chunk. Source maps are line-level V3 maps built from module
//! marker comments in the rendered output.

use super::transform::TransformedModule;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::collections::HashMap;

/// The registry bootstrap, emitted as the `runtime` chunk.
#[must_use]
pub fn runtime_source(compact: bool) -> String {
    if compact {
        return concat!(
            "var __kiln_modules={};var __kiln_cache={};",
            "function __kiln_register(m){for(var id in m){__kiln_modules[id]=m[id];}}",
            "function __kiln_require(id){if(__kiln_cache[id])return __kiln_cache[id].exports;",
            "var module={exports:{}};__kiln_cache[id]=module;",
            "__kiln_modules[id](module,module.exports,__kiln_require);return module.exports;}\n"
        )
        .to_string();
    }

    concat!(
        "// kiln module registry\n",
        "var __kiln_modules = {};\n",
        "var __kiln_cache = {};\n",
        "function __kiln_register(m) {\n",
        "  for (var id in m) {\n",
        "    __kiln_modules[id] = m[id];\n",
        "  }\n",
        "}\n",
        "function __kiln_require(id) {\n",
        "  if (__kiln_cache[id]) return __kiln_cache[id].exports;\n",
        "  var module = { exports: {} };\n",
        "  __kiln_cache[id] = module;\n",
        "  __kiln_modules[id](module, module.exports, __kiln_require);\n",
        "  return module.exports;\n",
        "}\n"
    )
    .to_string()
}

/// Render one chunk from its transformed modules.
///
/// `entry` requires the given module id after registration.
#[must_use]
pub fn render_chunk(
    modules: &[&TransformedModule],
    entry: Option<&str>,
    compact: bool,
) -> String {
    let total: usize = modules.iter().map(|m| m.body.len()).sum();
    let mut out = String::with_capacity(total + 256 + modules.len() * 96);

    out.push_str("__kiln_register({\n");

    for module in modules {
        if !compact {
            out.push_str(&format!("// module {}\n", module.rel_path));
        }
        out.push_str(&format!(
            "\"{}\": function (module, exports, require) {{\n",
            module.id
        ));
        if compact {
            for line in module.body.lines() {
                out.push_str(line);
                out.push('\n');
            }
        } else {
            for line in module.body.lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str("},\n");
    }

    out.push_str("});\n");

    if let Some(entry_id) = entry {
        out.push_str(&format!("__kiln_require(\"{entry_id}\");\n"));
    }

    out
}

/// Append an inline source map comment (data URI) to chunk code.
#[must_use]
pub fn append_inline_map(code: &str, map_json: &str) -> String {
    format!(
        "{code}//# sourceMappingURL=data:application/json;base64,{}\n",
        BASE64.encode(map_json.as_bytes())
    )
}

/// Append a file source map reference to chunk code.
#[must_use]
pub fn append_map_reference(code: &str, map_file: &str) -> String {
    format!("{code}//# sourceMappingURL={map_file}\n")
}

// =============================================================================
// Source map support
// =============================================================================

/// VLQ-encode a signed integer and append to the output string.
fn vlq_encode(value: i64, out: &mut String) {
    const B64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    #[allow(clippy::cast_sign_loss)]
    let mut v = (if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    }) as u64;
    loop {
        let mut digit = (v & 0x1f) as u8;
        v >>= 5;
        if v > 0 {
            digit |= 0x20; // continuation bit
        }
        out.push(B64[digit as usize] as char);
        if v == 0 {
            break;
        }
    }
}

/// Tracks output/source line pairs and generates a V3 source map.
struct SourceMapBuilder {
    sources: Vec<String>,
    sources_content: Vec<String>,
    /// (output_line, source_idx, source_line)
    mappings: Vec<(u32, u32, u32)>,
}

impl SourceMapBuilder {
    fn new() -> Self {
        Self {
            sources: Vec::new(),
            sources_content: Vec::new(),
            mappings: Vec::new(),
        }
    }

    fn add_source(&mut self, path: &str, content: &str) -> u32 {
        let idx = self.sources.len() as u32;
        self.sources.push(path.to_string());
        self.sources_content.push(content.to_string());
        idx
    }

    fn add_line_mapping(&mut self, output_line: u32, source_idx: u32, source_line: u32) {
        self.mappings.push((output_line, source_idx, source_line));
    }

    fn generate(&self, file: &str) -> String {
        let mut mappings_str = String::new();
        let mut prev_output_line: u32 = 0;
        let mut prev_source: i64 = 0;
        let mut prev_source_line: i64 = 0;

        let mut sorted = self.mappings.clone();
        sorted.sort_unstable();

        for &(output_line, source_idx, source_line) in &sorted {
            while prev_output_line < output_line {
                mappings_str.push(';');
                prev_output_line += 1;
            }

            // One segment per line: column 0, relative source/line deltas
            vlq_encode(0, &mut mappings_str);
            vlq_encode(i64::from(source_idx) - prev_source, &mut mappings_str);
            vlq_encode(i64::from(source_line) - prev_source_line, &mut mappings_str);
            vlq_encode(0, &mut mappings_str);

            prev_source = i64::from(source_idx);
            prev_source_line = i64::from(source_line);
        }

        let sources_json: Vec<String> = self.sources.iter().map(|s| json_string(s)).collect();
        let contents_json: Vec<String> = self
            .sources_content
            .iter()
            .map(|s| json_string(s))
            .collect();

        format!(
            r#"{{"version":3,"file":{},"sources":[{}],"sourcesContent":[{}],"mappings":{}}}"#,
            json_string(file),
            sources_json.join(","),
            contents_json.join(","),
            json_string(&mappings_str),
        )
    }
}

/// JSON-encode a string value (with escaping).
fn json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Build a line-level source map for a rendered chunk.
///
/// Scans the output for `// module <path>` markers (present in
/// non-compact renders) and maps the lines that follow back to the
/// original sources.
#[must_use]
pub fn build_chunk_map(
    chunk_code: &str,
    chunk_file: &str,
    originals: &HashMap<String, String>,
) -> String {
    let mut builder = SourceMapBuilder::new();
    let mut source_indices: HashMap<&str, u32> = HashMap::new();

    let mut current: Option<(u32, u32)> = None; // (source_idx, next source line)
    for (output_line, line) in chunk_code.lines().enumerate() {
        let trimmed = line.trim();

        if let Some(path) = trimmed.strip_prefix("// module ") {
            if let Some(content) = originals.get(path) {
                let idx = *source_indices
                    .entry(path)
                    .or_insert_with(|| builder.add_source(path, content));
                current = Some((idx, 0));
                continue;
            }
        }

        // Factory scaffolding lines are not source lines
        if trimmed.ends_with("function (module, exports, require) {")
            || trimmed == "},"
            || trimmed == "});"
            || trimmed.starts_with("__kiln_register(")
            || trimmed.starts_with("__kiln_require(")
        {
            if trimmed == "}," || trimmed == "});" {
                current = None;
            }
            continue;
        }

        if let Some((idx, ref mut src_line)) = current {
            if !trimmed.is_empty() {
                builder.add_line_mapping(output_line as u32, idx, *src_line);
                *src_line += 1;
            }
        }
    }

    builder.generate(chunk_file)
}
