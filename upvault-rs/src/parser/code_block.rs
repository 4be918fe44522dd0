//! Code fence tracking and inline code detection.
//!
//! Fenced regions are found with a small line-oriented state machine rather
//! than a whole-document pattern, so several fences, tilde/backtick mixes and
//! fence-looking lines inside a fence are all handled the same way.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

// Optional indentation, then a run of 3+ backticks or tildes, then the rest
static FENCE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(`{3,}|~{3,})(.*)$").unwrap());

// Inline code with double backticks (can contain single backticks)
static INLINE_CODE_DOUBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"``(?:[^`]|`[^`])*``").unwrap());

// Inline code with single backticks
static INLINE_CODE_SINGLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`\n]+`").unwrap());

/// How a line relates to fenced code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// An opening or closing fence line.
    Fence,
    /// A line inside an open fence.
    Fenced,
    /// Ordinary markdown text.
    Text,
}

impl LineClass {
    /// Whether the line must be emitted untouched.
    pub fn is_protected(self) -> bool {
        !matches!(self, LineClass::Text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenFence {
    marker: char,
    len: usize,
}

/// Fence-open / fence-closed state machine fed one line at a time.
#[derive(Debug, Default, Clone)]
pub struct FenceTracker {
    open: Option<OpenFence>,
}

impl FenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a line (without or with its trailing line break) and advance.
    pub fn classify(&mut self, line: &str) -> LineClass {
        let line = line.trim_end_matches(['\n', '\r']);

        let Some(caps) = FENCE_LINE.captures(line) else {
            return if self.open.is_some() {
                LineClass::Fenced
            } else {
                LineClass::Text
            };
        };

        let run = &caps[1];
        let rest = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let marker = run.chars().next().unwrap_or('`');
        let len = run.len();

        match self.open {
            None => {
                self.open = Some(OpenFence { marker, len });
                LineClass::Fence
            }
            Some(open) => {
                if marker == open.marker && len >= open.len && rest.trim().is_empty() {
                    self.open = None;
                    LineClass::Fence
                } else {
                    LineClass::Fenced
                }
            }
        }
    }
}

/// A body line together with its fence classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedLine<'a> {
    /// Line number (1-indexed).
    pub number: usize,
    /// The line including its line break, if any.
    pub text: &'a str,
    pub class: LineClass,
}

/// Split a body into lines (keeping line breaks) and classify each one.
///
/// An unclosed fence protects everything up to the end of the body.
pub fn scan_lines(body: &str) -> Vec<ScannedLine<'_>> {
    let mut tracker = FenceTracker::new();
    body.split_inclusive('\n')
        .enumerate()
        .map(|(idx, text)| ScannedLine {
            number: idx + 1,
            text,
            class: tracker.classify(text),
        })
        .collect()
}

/// Byte ranges of inline code spans within a single line.
pub fn inline_code_ranges(line: &str) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = INLINE_CODE_DOUBLE
        .find_iter(line)
        .map(|m| m.start()..m.end())
        .collect();

    for m in INLINE_CODE_SINGLE.find_iter(line) {
        let overlaps = ranges
            .iter()
            .any(|r| m.start() < r.end && m.end() > r.start);
        if !overlaps {
            ranges.push(m.start()..m.end());
        }
    }

    ranges.sort_by_key(|r| r.start);
    ranges
}

/// Check whether a byte range overlaps any of the given ranges.
pub fn overlaps_any(span: &Range<usize>, ranges: &[Range<usize>]) -> bool {
    ranges
        .iter()
        .any(|r| span.start < r.end && span.end > r.start)
}
