//! Formatting pass.

use regex::Regex;

use crate::code::{join_lines, map_code_segments, CodeMap};
use crate::filter::{FilterContext, PostProcessingFilter, FORMATTING};

/// Indent unit in spaces. Tabs expand to one unit.
const INDENT_WIDTH: usize = 2;

/// Convert `\r\n` and lone `\r` to `\n`.
pub fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

/// Re-indent with spaces, rounding odd indents up to the next unit, and
/// strip trailing whitespace. Block comment continuation lines (`* ...`)
/// keep their alignment.
pub fn normalize_indentation(code: &str) -> String {
    let lines: Vec<String> = code
        .trim_end_matches('\n')
        .split('\n')
        .map(|line| {
            let rest = line.trim_start_matches([' ', '\t']);
            if rest.trim().is_empty() {
                return String::new();
            }
            if rest.starts_with('*') {
                return line.trim_end().to_string();
            }

            let width: usize = line[..line.len() - rest.len()]
                .chars()
                .map(|c| if c == '\t' { INDENT_WIDTH } else { 1 })
                .sum();
            let width = width.div_ceil(INDENT_WIDTH) * INDENT_WIDTH;
            format!("{}{}", " ".repeat(width), rest.trim_end())
        })
        .collect();

    join_lines(&lines, code)
}

/// Move the import header into two sorted groups: packages first, then
/// project-local paths (`.`, `/`, `@/`, `~/`), separated by a blank line.
///
/// A leading `'use client'` directive stays on top. Code after the header
/// is left alone. Content without imports, or with an import that never
/// closes, is returned unchanged.
pub fn organize_imports(code: &str) -> anyhow::Result<String> {
    let directive = Regex::new(r#"^\s*['"]use (?:client|server)['"];?\s*$"#)?;
    let source = Regex::new(r#"['"]([^'"]+)['"]\s*;?\s*$"#)?;

    let lines: Vec<&str> = code.trim_end_matches('\n').split('\n').collect();
    let mut i = 0;
    skip_blank(&lines, &mut i);

    let mut head = None;
    if i < lines.len() && directive.is_match(lines[i]) {
        head = Some(lines[i].trim());
        i += 1;
    }

    let mut external = Vec::new();
    let mut internal = Vec::new();
    loop {
        let mark = i;
        skip_blank(&lines, &mut i);
        if i >= lines.len() || !is_import_start(lines[i]) {
            i = mark;
            break;
        }

        let mut statement = lines[i].trim().to_string();
        i += 1;
        while !CodeMap::new(&statement).is_balanced() {
            let Some(next) = lines.get(i) else {
                return Ok(code.to_string());
            };
            statement.push('\n');
            statement.push_str(next.trim_end());
            i += 1;
        }

        let path = source
            .captures(&statement)
            .map(|c| c[1].to_string())
            .unwrap_or_default();
        if is_local_path(&path) {
            internal.push((path, statement));
        } else {
            external.push((path, statement));
        }
    }

    if external.is_empty() && internal.is_empty() {
        return Ok(code.to_string());
    }

    external.sort();
    internal.sort();

    let mut out: Vec<String> = Vec::new();
    if let Some(head) = head {
        out.push(head.to_string());
        out.push(String::new());
    }
    out.extend(external.iter().map(|(_, s)| s.clone()));
    if !external.is_empty() && !internal.is_empty() {
        out.push(String::new());
    }
    out.extend(internal.iter().map(|(_, s)| s.clone()));

    skip_blank(&lines, &mut i);
    if i < lines.len() {
        out.push(String::new());
        out.extend(lines[i..].iter().map(|l| l.to_string()));
    }

    Ok(join_lines(&out, code))
}

fn skip_blank(lines: &[&str], i: &mut usize) {
    while *i < lines.len() && lines[*i].trim().is_empty() {
        *i += 1;
    }
}

fn is_import_start(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("import ") || trimmed.starts_with("import{") || trimmed == "import"
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('.') || path.starts_with('/') || path.starts_with("@/") || path.starts_with("~/")
}

/// Run every formatting transform over one code segment.
pub fn format_code(code: &str) -> anyhow::Result<String> {
    organize_imports(&normalize_indentation(code))
}

/// Built-in pass at priority 3.
#[derive(Debug, Default)]
pub struct FormattingFilter;

impl PostProcessingFilter for FormattingFilter {
    fn name(&self) -> &str {
        FORMATTING
    }

    fn priority(&self) -> i32 {
        3
    }

    fn apply(&self, content: &str, _context: &FilterContext) -> anyhow::Result<String> {
        map_code_segments(&normalize_line_endings(content), format_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\n"), "a\nb\nc\n");
    }

    #[test]
    fn test_normalize_indentation() {
        let code = "function a() {\n\tif (x) {\n\t\ty();  \n   }\n \n}\n";
        assert_eq!(
            normalize_indentation(code),
            "function a() {\n  if (x) {\n    y();\n    }\n\n}\n"
        );
    }

    #[test]
    fn test_normalize_indentation_keeps_doc_comment_alignment() {
        let code = "/**\n * Doc\n */\nconst a = 1;";
        assert_eq!(normalize_indentation(code), code);
    }

    #[test]
    fn test_organize_imports_groups_and_sorts() {
        let code = "'use client'\nimport { z } from './z';\nimport React from 'react';\nimport {\n  Button,\n} from '@/components/ui/button';\nimport axios from 'axios';\n\n\nexport default function A() {}\n";
        let expected = "'use client'\n\nimport axios from 'axios';\nimport React from 'react';\n\nimport { z } from './z';\nimport {\n  Button,\n} from '@/components/ui/button';\n\nexport default function A() {}\n";
        let out = organize_imports(code).unwrap();
        assert_eq!(out, expected);
        assert_eq!(organize_imports(&out).unwrap(), out);
    }

    #[test]
    fn test_organize_imports_without_imports_is_unchanged() {
        let code = "const a = 1;\nimport('./lazy');\n";
        assert_eq!(organize_imports(code).unwrap(), code);
    }

    #[test]
    fn test_organize_imports_unterminated_is_unchanged() {
        let code = "import {\n  a,\n";
        assert_eq!(organize_imports(code).unwrap(), code);
    }

    #[test]
    fn test_format_code_is_idempotent() {
        let code = "import b from './b'\n\timport a from 'a'\nconst x = {\n\ty: 1,\n}";
        let once = format_code(code).unwrap();
        assert_eq!(once, "import a from 'a'\n\nimport b from './b'\n\nconst x = {\n  y: 1,\n}");
        assert_eq!(format_code(&once).unwrap(), once);
    }

    #[test]
    fn test_filter_normalizes_fenced_blocks() {
        let content = "Here:\r\n```js\r\n\tfoo();\r\n```\r\n";
        let out = FormattingFilter
            .apply(content, &FilterContext::default())
            .unwrap();
        assert_eq!(out, "Here:\n```js\n  foo();\n```\n");
    }
}
