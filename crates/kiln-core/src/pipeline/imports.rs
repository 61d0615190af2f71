//! Import specifier scanner.
//!
//! Scans JavaScript source for import/require specifiers without full
//! parsing. Comments are skipped; string escapes inside specifiers are
//! honored.

use std::collections::HashSet;

/// Kind of import statement a specifier was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import ... from "spec"` or `import "spec"`.
    Import,
    /// `export ... from "spec"`.
    ExportFrom,
    /// `require("spec")`.
    Require,
    /// `import("spec")`.
    Dynamic,
}

/// Import specifier found in source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Specifier exactly as found.
    pub raw: String,
    /// Statement kind.
    pub kind: ImportKind,
    /// Line number (1-indexed, best-effort).
    pub line: Option<u32>,
}

impl ImportSpec {
    #[must_use]
    pub fn new(raw: impl Into<String>, kind: ImportKind, line: Option<u32>) -> Self {
        Self {
            raw: raw.into(),
            kind,
            line,
        }
    }
}

/// Scan source code for import/require specifiers.
///
/// Returns discovered imports in first-appearance order, deduplicated by
/// `raw`.
#[must_use]
pub fn scan_imports(source: &str) -> Vec<ImportSpec> {
    let mut results = Vec::new();
    let mut seen = HashSet::new();
    let mut line_num: u32 = 1;
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        if chars[i] == '\n' {
            line_num += 1;
            i += 1;
            continue;
        }

        // Skip single-line comments
        if i + 1 < len && chars[i] == '/' && chars[i + 1] == '/' {
            while i < len && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        // Skip block comments
        if i + 1 < len && chars[i] == '/' && chars[i + 1] == '*' {
            i += 2;
            while i + 1 < len && !(chars[i] == '*' && chars[i + 1] == '/') {
                if chars[i] == '\n' {
                    line_num += 1;
                }
                i += 1;
            }
            i += 2;
            continue;
        }

        if matches_keyword(&chars, i, "import") {
            let start_i = i;
            i += 6;
            if let Some((spec, kind, end)) = scan_import_statement(&chars, i, &mut line_num) {
                if !spec.is_empty() && seen.insert(spec.clone()) {
                    results.push(ImportSpec::new(&spec, kind, Some(line_num)));
                }
                i = end;
                continue;
            }
            i = start_i + 1;
            continue;
        }

        if matches_keyword(&chars, i, "export") {
            let start_i = i;
            i += 6;
            if let Some((spec, end)) = scan_export_from(&chars, i, &mut line_num) {
                if !spec.is_empty() && seen.insert(spec.clone()) {
                    results.push(ImportSpec::new(&spec, ImportKind::ExportFrom, Some(line_num)));
                }
                i = end;
                continue;
            }
            i = start_i + 1;
            continue;
        }

        if matches_keyword(&chars, i, "require") {
            let start_i = i;
            i += 7;
            if let Some((spec, end)) = scan_require_call(&chars, i) {
                if !spec.is_empty() && seen.insert(spec.clone()) {
                    results.push(ImportSpec::new(&spec, ImportKind::Require, Some(line_num)));
                }
                i = end;
                continue;
            }
            i = start_i + 1;
            continue;
        }

        i += 1;
    }

    results
}

/// Check if chars at position match a keyword (with word boundary).
fn matches_keyword(chars: &[char], pos: usize, keyword: &str) -> bool {
    let kw: Vec<char> = keyword.chars().collect();
    let len = kw.len();

    if pos + len > chars.len() {
        return false;
    }

    if pos > 0 && (chars[pos - 1].is_alphanumeric() || chars[pos - 1] == '_') {
        return false;
    }

    for (j, &c) in kw.iter().enumerate() {
        if chars[pos + j] != c {
            return false;
        }
    }

    if pos + len < chars.len() && (chars[pos + len].is_alphanumeric() || chars[pos + len] == '_') {
        return false;
    }

    true
}

/// Read a quoted string starting at `i` (which must be the quote char).
/// Returns (contents, position after the closing quote).
fn read_string(chars: &[char], mut i: usize, line_num: &mut u32) -> (String, usize) {
    let quote = chars[i];
    i += 1;
    let start = i;
    while i < chars.len() && chars[i] != quote {
        if chars[i] == '\n' {
            *line_num += 1;
        }
        if chars[i] == '\\' && i + 1 < chars.len() {
            i += 2;
            continue;
        }
        i += 1;
    }
    let spec: String = chars[start..i].iter().collect();
    (spec, i + 1)
}

/// Scan an import statement for its specifier.
/// Returns (specifier, kind, end position).
fn scan_import_statement(
    chars: &[char],
    start: usize,
    line_num: &mut u32,
) -> Option<(String, ImportKind, usize)> {
    let len = chars.len();
    let mut i = start;

    while i < len && chars[i].is_whitespace() {
        if chars[i] == '\n' {
            *line_num += 1;
        }
        i += 1;
    }

    // Dynamic import: import("...")
    if i < len && chars[i] == '(' {
        i += 1;
        while i < len && chars[i].is_whitespace() {
            if chars[i] == '\n' {
                *line_num += 1;
            }
            i += 1;
        }
        if i < len && (chars[i] == '"' || chars[i] == '\'' || chars[i] == '`') {
            let (spec, end) = read_string(chars, i, line_num);
            return Some((spec, ImportKind::Dynamic, end));
        }
        return None;
    }

    // Regular import: scan until "from" or a direct string
    while i < len {
        if chars[i] == '\n' {
            *line_num += 1;
        }

        if matches_keyword(chars, i, "from") {
            i += 4;
            while i < len && chars[i].is_whitespace() {
                if chars[i] == '\n' {
                    *line_num += 1;
                }
                i += 1;
            }
            if i < len && (chars[i] == '"' || chars[i] == '\'' || chars[i] == '`') {
                let (spec, end) = read_string(chars, i, line_num);
                return Some((spec, ImportKind::Import, end));
            }
        }

        // Side-effect import: import "specifier"
        if chars[i] == '"' || chars[i] == '\'' || chars[i] == '`' {
            let (spec, end) = read_string(chars, i, line_num);
            return Some((spec, ImportKind::Import, end));
        }

        if chars[i] == ';' {
            break;
        }

        i += 1;

        // Safety limit to avoid pathological scans
        if i > start + 1000 {
            break;
        }
    }

    None
}

/// Scan an `export ... from` statement.
fn scan_export_from(chars: &[char], start: usize, line_num: &mut u32) -> Option<(String, usize)> {
    let len = chars.len();
    let mut i = start;

    let limit = (start + 500).min(len);
    while i < limit {
        if chars[i] == '\n' {
            *line_num += 1;
        }

        if matches_keyword(chars, i, "from") {
            i += 4;
            while i < len && chars[i].is_whitespace() {
                if chars[i] == '\n' {
                    *line_num += 1;
                }
                i += 1;
            }
            if i < len && (chars[i] == '"' || chars[i] == '\'' || chars[i] == '`') {
                let (spec, end) = read_string(chars, i, line_num);
                return Some((spec, end));
            }
        }

        i += 1;
    }

    None
}

/// Scan a `require("...")` call.
fn scan_require_call(chars: &[char], start: usize) -> Option<(String, usize)> {
    let len = chars.len();
    let mut i = start;

    while i < len && chars[i].is_whitespace() && chars[i] != '\n' {
        i += 1;
    }

    if i >= len || chars[i] != '(' {
        return None;
    }
    i += 1;

    while i < len && chars[i].is_whitespace() && chars[i] != '\n' {
        i += 1;
    }

    if i >= len || (chars[i] != '"' && chars[i] != '\'' && chars[i] != '`') {
        return None;
    }

    let quote = chars[i];
    i += 1;
    let spec_start = i;

    while i < len && chars[i] != quote {
        if chars[i] == '\\' && i + 1 < len {
            i += 2;
            continue;
        }
        if chars[i] == '\n' {
            // Newline in string - likely not a valid require
            return None;
        }
        i += 1;
    }

    let spec: String = chars[spec_start..i].iter().collect();
    i += 1;

    while i < len && chars[i].is_whitespace() && chars[i] != '\n' {
        i += 1;
    }

    if i < len && chars[i] == ')' {
        i += 1;
        return Some((spec, i));
    }

    // Even without closing paren, we got the specifier
    Some((spec, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_esm_import_from() {
        let source = r#"import { foo } from "./dep";"#;
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].raw, "./dep");
        assert_eq!(imports[0].kind, ImportKind::Import);
    }

    #[test]
    fn test_esm_import_default() {
        let source = r#"import foo from "lodash";"#;
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].raw, "lodash");
    }

    #[test]
    fn test_esm_import_side_effect() {
        let source = r#"import "./polyfill";"#;
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].raw, "./polyfill");
    }

    #[test]
    fn test_css_side_effect_import() {
        let source = "import './styles.css';";
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].raw, "./styles.css");
    }

    #[test]
    fn test_dynamic_import() {
        let source = r#"const mod = await import("./dynamic");"#;
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].raw, "./dynamic");
        assert_eq!(imports[0].kind, ImportKind::Dynamic);
    }

    #[test]
    fn test_cjs_require() {
        let source = r#"const dep = require("./dep");"#;
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].raw, "./dep");
        assert_eq!(imports[0].kind, ImportKind::Require);
    }

    #[test]
    fn test_esm_export_from() {
        let source = r#"export { foo } from "./dep";"#;
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].raw, "./dep");
        assert_eq!(imports[0].kind, ImportKind::ExportFrom);
    }

    #[test]
    fn test_ignores_comments() {
        let source = r#"
// import foo from "commented"
/* import baz from "also-commented" */
import bar from "./real";
"#;
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].raw, "./real");
    }

    #[test]
    fn test_multiple_imports_stable_order() {
        let source = r#"
import a from "./a";
import b from "./b";
import c from "./c";
"#;
        let imports = scan_imports(source);
        let raws: Vec<_> = imports.iter().map(|i| i.raw.as_str()).collect();
        assert_eq!(raws, ["./a", "./b", "./c"]);
    }

    #[test]
    fn test_deduplicates_imports() {
        let source = r#"
import a from "./dep";
import b from "./dep";
"#;
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
    }

    #[test]
    fn test_namespace_import() {
        let source = r#"import * as utils from "./utils";"#;
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].raw, "./utils");
    }

    #[test]
    fn test_scoped_package() {
        let source = r#"import test from "@scope/package";"#;
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].raw, "@scope/package");
    }

    #[test]
    fn test_line_numbers() {
        let source = "\nimport a from \"./a\";\n\nimport b from \"./b\";\n";
        let imports = scan_imports(source);
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].line, Some(2));
        assert_eq!(imports[1].line, Some(4));
    }

    #[test]
    fn test_no_imports() {
        assert!(scan_imports("console.log('hello');").is_empty());
        assert!(scan_imports("").is_empty());
    }
}
