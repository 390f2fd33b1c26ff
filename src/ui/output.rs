//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. Results go
//! to stdout, diagnostics to stderr. When `--json` is passed, commands print
//! their result as JSON instead.

use std::fmt::Display;

use crate::core::page::Page;
use crate::wiki::{CommitSummary, DiffLine, LineKind, PendingFork};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - results only
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// A page as text: a metadata header, a blank line, then the body.
pub fn format_page(page: &Page) -> String {
    let mut out = String::new();
    for (key, value) in page.metadata() {
        out.push_str(&format!("{}: {}\n", key, value));
    }
    out.push('\n');
    out.push_str(page.body());
    out
}

/// One history line: `[offset] id author time`.
pub fn format_summary(summary: &CommitSummary) -> String {
    let created = if summary.introduces_page {
        " (created)"
    } else {
        ""
    };
    format!(
        "[{}] {} {} at {}{}",
        summary.offset,
        summary.id.short(8),
        summary.author,
        summary.authored_at,
        created
    )
}

/// Diff lines with `+`, `-` or space markers.
pub fn format_diff(lines: &[DiffLine]) -> String {
    lines
        .iter()
        .map(|line| {
            let marker = match line.kind {
                LineKind::Added => '+',
                LineKind::Removed => '-',
                LineKind::Context => ' ',
            };
            format!("{}{}", marker, line.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One pending fork line.
pub fn format_fork(fork: &PendingFork) -> String {
    format!("{} {} ({})", fork.head.short(8), fork.owner, fork.author)
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::page::{FieldSchema, Metadata};
    use crate::core::types::{BranchName, Oid, PageName};

    #[test]
    fn verbosity_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn page_header_then_body() {
        let page = Page::new(
            PageName::new("Home").unwrap(),
            BranchName::new("master").unwrap(),
            "Hello\n",
            Metadata::new(),
            &FieldSchema::default(),
        );
        let text = format_page(&page);
        assert!(text.contains("template: show\n"));
        assert!(text.ends_with("\n\nHello\n"));
    }

    #[test]
    fn summary_line() {
        let summary = CommitSummary {
            id: Oid::new("0123456789abcdef0123456789abcdef01234567").unwrap(),
            offset: 3,
            author: "alice".into(),
            authored_at: "10:00:00 on 01/02/2024".into(),
            committer: "alice".into(),
            committed_at: "10:00:00 on 01/02/2024".into(),
            introduces_page: false,
            page: PageName::new("Home").unwrap(),
        };
        assert_eq!(
            format_summary(&summary),
            "[3] 01234567 alice at 10:00:00 on 01/02/2024"
        );
    }

    #[test]
    fn diff_markers() {
        let lines = vec![
            DiffLine {
                kind: LineKind::Context,
                text: "same".into(),
            },
            DiffLine {
                kind: LineKind::Added,
                text: "new".into(),
            },
        ];
        assert_eq!(format_diff(&lines), " same\n+new");
    }

    #[test]
    fn list_with_prefix() {
        assert_eq!(format_list(&["a", "b"], "  "), "  a\n  b");
    }
}
