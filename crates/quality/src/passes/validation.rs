//! Validation pass: bracket balance check and repair.

use tracing::warn;

use crate::code::{closer_for, map_code_segments, opener_for, CodeMap};
use crate::filter::{FilterContext, PostProcessingFilter, VALIDATION};

/// Bracket balance of a code segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketReport {
    /// Openers never closed, outermost first
    pub unclosed: Vec<char>,

    /// Closers with no matching opener, with their byte offsets
    pub unexpected: Vec<(usize, char)>,
}

impl BracketReport {
    /// Scan `code`, ignoring brackets inside strings and comments.
    pub fn scan(code: &str) -> Self {
        let map = CodeMap::new(code);
        let mut report = Self::default();

        for &(i, c) in map.chars() {
            match c {
                '(' | '[' | '{' => report.unclosed.push(c),
                ')' | ']' | '}' => {
                    if report.unclosed.last() == Some(&opener_for(c)) {
                        report.unclosed.pop();
                    } else {
                        report.unexpected.push((i, c));
                    }
                }
                _ => {}
            }
        }

        report
    }

    /// Whether the segment is balanced.
    pub fn is_balanced(&self) -> bool {
        self.unclosed.is_empty() && self.unexpected.is_empty()
    }

    /// Closers that would finish the segment, innermost first.
    pub fn missing_closers(&self) -> String {
        self.unclosed.iter().rev().map(|&c| closer_for(c)).collect()
    }
}

/// Append missing closing brackets on a new line. Stray closers are
/// reported but left in place.
pub fn repair_brackets(code: &str) -> String {
    let report = BracketReport::scan(code);
    if report.is_balanced() {
        return code.to_string();
    }

    if !report.unexpected.is_empty() {
        warn!(
            "Unmatched closing brackets at byte offsets {:?}",
            report.unexpected.iter().map(|(i, _)| *i).collect::<Vec<_>>()
        );
    }
    if report.unclosed.is_empty() {
        return code.to_string();
    }

    let closers = report.missing_closers();
    warn!("Closing {} unclosed brackets: {}", closers.len(), closers);

    let mut out = code.trim_end().to_string();
    out.push('\n');
    out.push_str(&closers);
    if code.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Built-in pass at priority 4.
#[derive(Debug, Default)]
pub struct ValidationFilter;

impl PostProcessingFilter for ValidationFilter {
    fn name(&self) -> &str {
        VALIDATION
    }

    fn priority(&self) -> i32 {
        4
    }

    fn apply(&self, content: &str, _context: &FilterContext) -> anyhow::Result<String> {
        map_code_segments(content, |code| Ok(repair_brackets(code)))
    }
}
