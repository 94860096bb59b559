//! Code-aware text helpers shared by the passes.

/// Characters of `source` that are code, i.e. outside string literals and
/// comments, with their byte offsets.
///
/// Quoted strings end at the closing quote or the end of the line, so a
/// stray apostrophe in JSX text cannot swallow the rest of the file.
/// Template literals may span lines.
pub struct CodeMap {
    chars: Vec<(usize, char)>,
    comments: usize,
    ends_in_literal: bool,
}

impl CodeMap {
    /// Scan `source`.
    pub fn new(source: &str) -> Self {
        #[derive(PartialEq)]
        enum State {
            Code,
            Quote(char),
            Template,
            LineComment,
            BlockComment,
        }

        let mut chars = Vec::with_capacity(source.len());
        let mut comments = 0usize;
        let mut state = State::Code;
        let mut iter = source.char_indices().peekable();

        while let Some((i, c)) = iter.next() {
            match state {
                State::Code => match c {
                    '\'' | '"' => state = State::Quote(c),
                    '`' => state = State::Template,
                    '/' if matches!(iter.peek(), Some((_, '/'))) => {
                        iter.next();
                        comments += 1;
                        state = State::LineComment;
                    }
                    '/' if matches!(iter.peek(), Some((_, '*'))) => {
                        iter.next();
                        comments += 1;
                        state = State::BlockComment;
                    }
                    _ => chars.push((i, c)),
                },
                State::Quote(q) => match c {
                    '\\' => {
                        iter.next();
                    }
                    '\n' => {
                        state = State::Code;
                        chars.push((i, c));
                    }
                    _ if c == q => state = State::Code,
                    _ => {}
                },
                State::Template => match c {
                    '\\' => {
                        iter.next();
                    }
                    '`' => state = State::Code,
                    _ => {}
                },
                State::LineComment => {
                    if c == '\n' {
                        state = State::Code;
                        chars.push((i, c));
                    }
                }
                State::BlockComment => {
                    if c == '*' && matches!(iter.peek(), Some((_, '/'))) {
                        iter.next();
                        state = State::Code;
                    }
                }
            }
        }

        let ends_in_literal = matches!(state, State::Quote(_) | State::Template);
        Self {
            chars,
            comments,
            ends_in_literal,
        }
    }

    /// Code characters in order.
    pub fn chars(&self) -> &[(usize, char)] {
        &self.chars
    }

    /// Whether the source contains any comment.
    pub fn has_comments(&self) -> bool {
        self.comments > 0
    }

    /// Whether the source ends inside a string or template literal.
    pub fn ends_in_literal(&self) -> bool {
        self.ends_in_literal
    }

    /// Whether every bracket closes in order, with none left open.
    pub fn is_balanced(&self) -> bool {
        let mut stack = Vec::new();
        for &(_, c) in &self.chars {
            match c {
                '(' | '[' | '{' => stack.push(c),
                ')' | ']' | '}' => {
                    if stack.pop() != Some(opener_for(c)) {
                        return false;
                    }
                }
                _ => {}
            }
        }
        stack.is_empty()
    }

    /// Position in [`CodeMap::chars`] of the code character at byte `offset`.
    pub fn position(&self, offset: usize) -> Option<usize> {
        self.chars.binary_search_by_key(&offset, |(i, _)| *i).ok()
    }

    /// Byte offset of the bracket closing the opener at byte `open`.
    pub fn matching_close(&self, open: usize) -> Option<usize> {
        let start = self.position(open)?;
        if !matches!(self.chars[start].1, '(' | '[' | '{') {
            return None;
        }
        let mut depth = 0usize;
        for &(i, c) in &self.chars[start..] {
            match c {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

/// Opening bracket matching a closing one.
pub fn opener_for(close: char) -> char {
    match close {
        ')' => '(',
        ']' => '[',
        _ => '{',
    }
}

/// Closing bracket matching an opening one.
pub fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Whether the content carries markdown code fences.
pub fn has_code_fences(content: &str) -> bool {
    content.lines().any(|l| l.trim_start().starts_with("```"))
}

/// Whether unfenced text has any line that reads as source code.
pub fn looks_like_code(content: &str) -> bool {
    content.lines().map(str::trim).any(|line| {
        line.ends_with(';')
            || line.ends_with('{')
            || line.ends_with('}')
            || line.starts_with("//")
            || line.contains("=>")
            || line.starts_with("export ")
            || (line.starts_with("import ") && (line.contains('\'') || line.contains('"')))
            || (["const ", "let ", "var "].iter().any(|kw| line.starts_with(kw)) && line.contains('='))
    })
}

/// Apply `f` to every fenced code block body, or to the whole content when
/// there are no fences. Text outside fences is copied unchanged.
pub fn map_code_segments<F>(content: &str, mut f: F) -> anyhow::Result<String>
where
    F: FnMut(&str) -> anyhow::Result<String>,
{
    if !has_code_fences(content) {
        return f(content);
    }

    let mut out = String::with_capacity(content.len());
    let mut body = String::new();
    let mut in_block = false;

    for line in content.split_inclusive('\n') {
        let is_fence = line.trim_start().starts_with("```");
        if in_block {
            if is_fence {
                push_body(&mut out, f(&body)?);
                body.clear();
                out.push_str(line);
                in_block = false;
            } else {
                body.push_str(line);
            }
        } else {
            out.push_str(line);
            if is_fence {
                in_block = true;
            }
        }
    }

    // Unterminated fence: still process what was collected.
    if in_block && !body.is_empty() {
        out.push_str(&f(&body)?);
    }

    Ok(out)
}

fn push_body(out: &mut String, body: String) {
    if body.is_empty() {
        return;
    }
    out.push_str(&body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
}

/// Rebuild `source` from lines, keeping its trailing-newline state.
pub fn join_lines<S: AsRef<str>>(lines: &[S], source: &str) -> String {
    let mut out = lines
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join("\n");
    if source.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}
