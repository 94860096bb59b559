//! Code optimization pass.

use std::collections::HashSet;

use regex::{NoExpand, Regex};
use tracing::debug;

use crate::code::map_code_segments;
use crate::filter::{FilterContext, PostProcessingFilter, CODE_OPTIMIZATION};

/// Drop repeated single-line import statements, keeping the first.
pub fn dedupe_imports(code: &str) -> String {
    let mut seen = HashSet::new();
    let mut out = String::with_capacity(code.len());

    for line in code.split_inclusive('\n') {
        let trimmed = line.trim();
        if is_single_line_import(trimmed) {
            let key = trimmed.trim_end_matches(';').trim_end().to_string();
            if !seen.insert(key) {
                continue;
            }
        }
        out.push_str(line);
    }

    out
}

fn is_single_line_import(trimmed: &str) -> bool {
    trimmed.starts_with("import ")
        && (trimmed.ends_with(';') || trimmed.ends_with('\'') || trimmed.ends_with('"'))
}

/// Replace bare `<React.Fragment>` wrappers with the `<>` shorthand.
pub fn collapse_fragments(code: &str) -> String {
    code.replace("<React.Fragment>", "<>")
        .replace("</React.Fragment>", "</>")
}

/// Rename `useState` setters to `set` + capitalized state name.
///
/// Every whole-word use of the old setter is renamed. A rename is skipped
/// when the conventional name is already taken.
pub fn normalize_state_setters(code: &str) -> anyhow::Result<String> {
    let re = Regex::new(
        r"\[\s*([A-Za-z_][A-Za-z0-9_]*)\s*,\s*([A-Za-z_][A-Za-z0-9_]*)\s*\]\s*=\s*(?:React\.)?useState\b",
    )?;

    let renames: Vec<(String, String)> = re
        .captures_iter(code)
        .filter_map(|caps| {
            let expected = setter_name(&caps[1]);
            (caps[2] != *expected).then(|| (caps[2].to_string(), expected))
        })
        .collect();

    let mut out = code.to_string();
    for (from, to) in renames {
        let taken = Regex::new(&format!(r"\b{}\b", regex::escape(&to)))?;
        if taken.is_match(&out) {
            debug!("Keeping setter {}: {} already in use", from, to);
            continue;
        }
        let word = Regex::new(&format!(r"\b{}\b", regex::escape(&from)))?;
        out = word.replace_all(&out, NoExpand(&to)).into_owned();
    }

    Ok(out)
}

fn setter_name(state: &str) -> String {
    let mut chars = state.chars();
    match chars.next() {
        Some(first) => format!("set{}{}", first.to_uppercase(), chars.as_str()),
        None => "set".to_string(),
    }
}

/// Remove comment lines that carry nothing: `//`, `// ...`, `/* */`,
/// `{/* */}` and "your code here" stubs.
pub fn strip_placeholder_comments(code: &str) -> anyhow::Result<String> {
    let empty = Regex::new(r"^\s*(?://\s*(?:\.\.\.|…)?|/\*\s*\*/|\{\s*/\*\s*\*/\s*\})\s*$")?;
    let stub = Regex::new(r"(?i)^\s*//\s*(?:add|insert|your)\s+(?:your\s+)?(?:code|logic)\s+here\.?\s*$")?;

    let mut out = String::with_capacity(code.len());
    for line in code.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if empty.is_match(bare) || stub.is_match(bare) {
            continue;
        }
        out.push_str(line);
    }
    Ok(out)
}

/// Run every optimization transform over one code segment.
pub fn optimize_code(code: &str) -> anyhow::Result<String> {
    let code = dedupe_imports(code);
    let code = collapse_fragments(&code);
    let code = normalize_state_setters(&code)?;
    strip_placeholder_comments(&code)
}

/// Built-in pass at priority 1.
#[derive(Debug, Default)]
pub struct CodeOptimizationFilter;

impl PostProcessingFilter for CodeOptimizationFilter {
    fn name(&self) -> &str {
        CODE_OPTIMIZATION
    }

    fn priority(&self) -> i32 {
        1
    }

    fn apply(&self, content: &str, _context: &FilterContext) -> anyhow::Result<String> {
        map_code_segments(content, optimize_code)
    }
}
