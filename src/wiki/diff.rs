//! wiki::diff
//!
//! Turns a unified diff for one page into tagged display lines.
//!
//! Everything before the first `@@ -a,b +c,d @@` hunk header (the `diff
//! --git`, `index` and `---`/`+++` file lines) is dropped. After it, lines
//! are classified by their first character alone: `+` is
//! [`LineKind::Added`], `-` is [`LineKind::Removed`], anything else is
//! [`LineKind::Context`]. A page line that itself reads `---` is therefore
//! removed as `----`, never mistaken for a file header. The marker column is
//! stripped from added, removed and plain context lines; later hunk headers
//! are kept whole as context.

use std::fmt::Write as _;

use thiserror::Error;

/// Shown when a revision changed nothing in the page.
pub const NO_CHANGES: &str = "NO CHANGES";

/// A hunk header whose line ranges cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed hunk header '{header}': {reason}")]
pub struct DiffParseError {
    pub header: String,
    pub reason: String,
}

/// How a display line relates to the previous version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Added,
    Removed,
    Context,
}

impl LineKind {
    /// CSS class used by [`DiffRenderer::to_html`].
    pub fn css_class(self) -> &'static str {
        match self {
            LineKind::Added => "plus",
            LineKind::Removed => "minus",
            LineKind::Context => "comment",
        }
    }
}

/// One rendered diff line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: String,
}

impl DiffLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Unified diff to display lines.
pub struct DiffRenderer;

impl DiffRenderer {
    /// Classify the lines of `diff`.
    ///
    /// A diff without any hunk header renders as a single context line
    /// reading [`NO_CHANGES`].
    ///
    /// # Errors
    ///
    /// [`DiffParseError`] when a hunk header's ranges are malformed.
    pub fn render(diff: &str) -> Result<Vec<DiffLine>, DiffParseError> {
        let mut lines = diff.lines();

        let Some(first) = lines.by_ref().find(|line| line.starts_with("@@")) else {
            return Ok(vec![DiffLine::new(LineKind::Context, NO_CHANGES)]);
        };
        parse_hunk_header(first)?;

        let mut out = Vec::new();
        for line in lines {
            if line.starts_with("@@") {
                parse_hunk_header(line)?;
                out.push(DiffLine::new(LineKind::Context, line));
            } else if let Some(text) = line.strip_prefix('+') {
                out.push(DiffLine::new(LineKind::Added, text));
            } else if let Some(text) = line.strip_prefix('-') {
                out.push(DiffLine::new(LineKind::Removed, text));
            } else if let Some(text) = line.strip_prefix(' ') {
                out.push(DiffLine::new(LineKind::Context, text));
            } else {
                out.push(DiffLine::new(LineKind::Context, line));
            }
        }
        Ok(out)
    }

    /// Render lines as `<div class="plus|minus|comment">` blocks.
    pub fn to_html(lines: &[DiffLine]) -> String {
        let mut html = String::new();
        for line in lines {
            // Writing to a String cannot fail.
            let _ = writeln!(
                html,
                "<div class=\"{}\">{}</div>",
                line.kind.css_class(),
                html_escape(&line.text)
            );
        }
        html
    }
}

/// Validate `@@ -a[,b] +c[,d] @@[ section]`.
fn parse_hunk_header(line: &str) -> Result<(), DiffParseError> {
    let fail = |reason: &str| DiffParseError {
        header: line.to_string(),
        reason: reason.to_string(),
    };

    let rest = line
        .strip_prefix("@@ ")
        .ok_or_else(|| fail("expected '@@ ' prefix"))?;
    let (ranges, _section) = rest
        .split_once(" @@")
        .ok_or_else(|| fail("missing closing '@@'"))?;

    let mut parts = ranges.split(' ');
    let old = parts.next().ok_or_else(|| fail("missing old range"))?;
    let new = parts.next().ok_or_else(|| fail("missing new range"))?;
    if parts.next().is_some() {
        return Err(fail("unexpected text between ranges"));
    }

    let old = old
        .strip_prefix('-')
        .ok_or_else(|| fail("old range must start with '-'"))?;
    let new = new
        .strip_prefix('+')
        .ok_or_else(|| fail("new range must start with '+'"))?;
    parse_range(old).ok_or_else(|| fail("old range is not 'start[,count]'"))?;
    parse_range(new).ok_or_else(|| fail("new range is not 'start[,count]'"))?;
    Ok(())
}

fn parse_range(range: &str) -> Option<(u64, u64)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
