//! Error correction pass.

use regex::{Captures, Regex};

use crate::code::{has_code_fences, looks_like_code, map_code_segments, CodeMap};
use crate::filter::{FilterContext, PostProcessingFilter, ERROR_CORRECTION};

/// UI modules under `@/components/ui/` that only have named exports.
pub const KNOWN_UI_MODULES: &[&str] = &[
    "accordion", "alert", "alert-dialog", "avatar", "badge", "button", "card", "checkbox",
    "dialog", "dropdown-menu", "form", "input", "label", "popover", "progress", "radio-group",
    "scroll-area", "select", "separator", "sheet", "skeleton", "slider", "switch", "table",
    "tabs", "textarea", "toast", "toggle", "tooltip",
];

/// Append `;` to complete single-line statements that lack one.
///
/// Only lines starting a declaration, import, `return` or `throw` are
/// considered, and only when the line closes every bracket it opens, ends
/// in an expression-like character, carries no comment, and the next
/// non-blank line does not continue the expression.
pub fn add_missing_semicolons(code: &str) -> anyhow::Result<String> {
    let statement = Regex::new(
        r"^\s*(?:import\b|export\s+default\b|(?:export\s+)?(?:const|let|var)\b|return\b|throw\b|\}\s*from\b)",
    )?;
    let declaration = Regex::new(r"^\s*export\s+default\s+(?:async\s+)?(?:function|class|interface)\b")?;
    let continuation = Regex::new(r"^\s*(?:\.|\?|:|\+|-|\*|/|&&|\|\||=|,|\)|\]|>)")?;

    let lines: Vec<&str> = code.split('\n').collect();
    let mut out = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let body = line.trim_end();
        let needs_semicolon = statement.is_match(body)
            && !declaration.is_match(body)
            && body
                .chars()
                .last()
                .map_or(false, |c| c.is_alphanumeric() || "_$)]'\"}".contains(c))
            && {
                // `} from '...'` closes a multi-line import opened earlier.
                let trimmed = body.trim_start();
                let own = trimmed.strip_prefix('}').unwrap_or(trimmed);
                let map = CodeMap::new(own);
                map.is_balanced() && !map.has_comments() && !map.ends_in_literal()
            }
            && !lines[i + 1..]
                .iter()
                .find(|l| !l.trim().is_empty())
                .map_or(false, |next| continuation.is_match(next));

        if needs_semicolon {
            out.push(format!("{};{}", body, &line[body.len()..]));
        } else {
            out.push(line.to_string());
        }
    }

    Ok(out.join("\n"))
}

/// Annotate untyped TypeScript helper functions that never return a value
/// with `: void` (or `: Promise<void>` when async).
///
/// Capitalized functions are treated as components and left alone, as is
/// any file that shows no sign of TypeScript.
pub fn add_void_return_types(code: &str) -> anyhow::Result<String> {
    let typescript = Regex::new(
        r"\binterface\s+[A-Z]\w*|\btype\s+[A-Z]\w*\s*=|\w\s*:\s*(?:string|number|boolean|any|unknown|void)\b|React\.FC\b",
    )?;
    if !typescript.is_match(code) {
        return Ok(code.to_string());
    }

    let function = Regex::new(
        r"(?m)^([ \t]*(?:export\s+)?(async\s+)?function\s+([A-Za-z_$][\w$]*)\s*(?:<[^>\n]*>)?\s*\([^()]*\))[ \t]*\{",
    )?;
    let returns_value = Regex::new(r"\breturn\s*[^\s;}]")?;
    let map = CodeMap::new(code);

    let mut out = String::with_capacity(code.len() + 16);
    let mut last = 0;

    for caps in function.captures_iter(code) {
        let (Some(whole), Some(signature)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if caps[3].starts_with(|c: char| c.is_uppercase()) {
            continue;
        }
        let open = whole.end() - 1;
        let Some(close) = map.matching_close(open) else {
            continue;
        };
        if returns_value.is_match(&code[open + 1..close]) {
            continue;
        }

        out.push_str(&code[last..signature.end()]);
        out.push_str(if caps.get(2).is_some() { ": Promise<void>" } else { ": void" });
        last = signature.end();
    }

    out.push_str(&code[last..]);
    Ok(out)
}

/// Rewrite default imports of named-export UI modules as named imports.
pub fn fix_ui_imports(code: &str) -> anyhow::Result<String> {
    let re = Regex::new(
        r#"import\s+([A-Z][A-Za-z0-9]*)\s+from\s+(['"])(@/components/ui/([a-z0-9-]+))['"]"#,
    )?;

    Ok(re
        .replace_all(code, |caps: &Captures| {
            if KNOWN_UI_MODULES.contains(&&caps[4]) {
                format!("import {{ {} }} from {}{}{}", &caps[1], &caps[2], &caps[3], &caps[2])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned())
}

/// Give single-argument `useEffect`, `useLayoutEffect`, `useMemo` and
/// `useCallback` calls an empty dependency list.
pub fn ensure_hook_dependencies(code: &str) -> anyhow::Result<String> {
    let hook = Regex::new(r"\b(?:React\.)?(?:useEffect|useLayoutEffect|useMemo|useCallback)\s*\(")?;
    let map = CodeMap::new(code);

    let mut inserts = Vec::new();
    for m in hook.find_iter(code) {
        let open = m.end() - 1;
        let Some(close) = map.matching_close(open) else {
            continue;
        };
        let (Some(from), Some(to)) = (map.position(open), map.position(close)) else {
            continue;
        };

        let mut depth = 0usize;
        let mut commas = 0usize;
        let mut has_argument = false;
        for &(_, c) in &map.chars()[from + 1..to] {
            match c {
                '(' | '[' | '{' => {
                    depth += 1;
                    has_argument = true;
                }
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => commas += 1,
                c if !c.is_whitespace() => has_argument = true,
                _ => {}
            }
        }

        if has_argument && commas == 0 {
            inserts.push(close);
        }
    }

    let mut out = String::with_capacity(code.len() + inserts.len() * 4);
    let mut last = 0;
    for at in inserts {
        out.push_str(&code[last..at]);
        out.push_str(", []");
        last = at;
    }
    out.push_str(&code[last..]);
    Ok(out)
}

/// Run every correction transform over one code segment.
pub fn correct_code(code: &str) -> anyhow::Result<String> {
    let code = fix_ui_imports(code)?;
    let code = ensure_hook_dependencies(&code)?;
    let code = add_void_return_types(&code)?;
    add_missing_semicolons(&code)
}

/// Built-in pass at priority 2.
#[derive(Debug, Default)]
pub struct ErrorCorrectionFilter;

impl PostProcessingFilter for ErrorCorrectionFilter {
    fn name(&self) -> &str {
        ERROR_CORRECTION
    }

    fn priority(&self) -> i32 {
        2
    }

    fn apply(&self, content: &str, _context: &FilterContext) -> anyhow::Result<String> {
        if !has_code_fences(content) && !looks_like_code(content) {
            return Ok(content.to_string());
        }
        map_code_segments(content, correct_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semicolons_added_to_complete_statements() {
        let code = "import React from 'react'\nconst [a, setA] = useState(0)\nexport default App\n";
        assert_eq!(
            add_missing_semicolons(code).unwrap(),
            "import React from 'react';\nconst [a, setA] = useState(0);\nexport default App;\n"
        );
    }

    #[test]
    fn test_semicolons_skip_incomplete_and_continued_lines() {
        let code = [
            "const style = {",
            "  color: 'red',",
            "}",
            "const total = items",
            "  .map(x => x.price)",
            "return (",
            "const note = 1 // keep",
            "export default function App() {",
            "const done = 1;",
        ]
        .join("\n");
        assert_eq!(add_missing_semicolons(&code).unwrap(), code);
    }

    #[test]
    fn test_semicolon_closing_multiline_import() {
        let code = "import {\n  useState,\n} from 'react'\nconst a = 1;";
        assert_eq!(
            add_missing_semicolons(code).unwrap(),
            "import {\n  useState,\n} from 'react';\nconst a = 1;"
        );
    }

    #[test]
    fn test_void_return_types_for_typescript() {
        let code = "interface Props { id: string }\nfunction logClick(id: string) {\n  console.log(id);\n}\nasync function save(p: Props) {\n  await api(p);\n  return;\n}\nfunction total(a: number) {\n  return a * 2;\n}\n";
        let out = add_void_return_types(code).unwrap();
        assert!(out.contains("function logClick(id: string): void {"));
        assert!(out.contains("async function save(p: Props): Promise<void> {"));
        assert!(out.contains("function total(a: number) {"));
    }

    #[test]
    fn test_void_return_types_skip_components_and_plain_js() {
        let ts = "type Props = { a: string };\nfunction Header(props: Props) {\n  console.log(props);\n}\n";
        assert_eq!(add_void_return_types(ts).unwrap(), ts);

        let js = "function handle() {\n  go();\n}\n";
        assert_eq!(add_void_return_types(js).unwrap(), js);
    }

    #[test]
    fn test_fix_ui_imports() {
        let code = "import Button from '@/components/ui/button';\nimport Widget from \"@/components/ui/widget\";";
        assert_eq!(
            fix_ui_imports(code).unwrap(),
            "import { Button } from '@/components/ui/button';\nimport Widget from \"@/components/ui/widget\";"
        );
    }

    #[test]
    fn test_hook_dependencies_added_once() {
        let code = "useEffect(() => {\n  load(a, b);\n});\nconst v = useMemo(() => f(x));\nuseCallback(fn, [dep]);";
        let out = ensure_hook_dependencies(code).unwrap();
        assert_eq!(
            out,
            "useEffect(() => {\n  load(a, b);\n}, []);\nconst v = useMemo(() => f(x), []);\nuseCallback(fn, [dep]);"
        );
        assert_eq!(ensure_hook_dependencies(&out).unwrap(), out);
    }

    #[test]
    fn test_hook_in_string_ignored() {
        let code = "const s = 'useEffect(x)';";
        assert_eq!(ensure_hook_dependencies(code).unwrap(), code);
    }

    #[test]
    fn test_unfenced_prose_left_alone() {
        let filter = ErrorCorrectionFilter;
        let prose = "First load the config.\nreturn the value from the function\nimport the data later";
        assert_eq!(filter.apply(prose, &FilterContext::default()).unwrap(), prose);

        let code = "const a = 1\nexport default a\n";
        assert_eq!(
            filter.apply(code, &FilterContext::default()).unwrap(),
            "const a = 1;\nexport default a;\n"
        );
    }
}
