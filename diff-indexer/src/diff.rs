//! Unified-diff projection utilities.
//!
//! Converts raw unified diffs into inclusive 1-based source-side line
//! ranges, checks range overlap against symbol spans, and extracts the
//! ± patch slice for a symbol's line range.
//!
//! Two parsing strategies:
//! - a strict line-walking parser that validates hunk body counts against
//!   the header counters;
//! - a permissive regex fallback over `@@ -start,length +` headers, used
//!   when the strict parser rejects imprecise diffs. The fallback trusts
//!   the header numbers rather than re-validating the hunk body.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Diff parsing failures. Internal to the projector; callers only see the
/// fallback behaviour.
#[derive(Debug, Error)]
pub enum DiffParseError {
    /// Hunk header could not be parsed.
    #[error("invalid hunk header: {0}")]
    InvalidHunkHeader(String),

    /// Hunk body does not match the counters declared in its header.
    #[error("hunk body mismatch at source line {0}")]
    BodyMismatch(u32),
}

/// One parsed hunk with its classified body lines.
#[derive(Debug, Clone)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

/// A classified body line inside a hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Added(String),
    Removed(String),
    Context(String),
}

fn hunk_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^@@ -(?P<start>\d+)(?:,(?P<length>\d+))? \+").expect("static regex")
    })
}

fn parse_header(line: &str) -> Result<(u32, u32, u32, u32), DiffParseError> {
    // "@@ -a,b +c,d @@ optional text"; lengths may be omitted (default 1).
    let rest = line
        .strip_prefix("@@ ")
        .ok_or_else(|| DiffParseError::InvalidHunkHeader(line.to_string()))?;
    let mut parts = rest.split_whitespace();
    let old_part = parts
        .next()
        .and_then(|p| p.strip_prefix('-'))
        .ok_or_else(|| DiffParseError::InvalidHunkHeader(line.to_string()))?;
    let new_part = parts
        .next()
        .and_then(|p| p.strip_prefix('+'))
        .ok_or_else(|| DiffParseError::InvalidHunkHeader(line.to_string()))?;

    let split = |s: &str| -> Result<(u32, u32), DiffParseError> {
        let mut it = s.split(',');
        let start = it
            .next()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| DiffParseError::InvalidHunkHeader(line.to_string()))?;
        let len = match it.next() {
            Some(v) => v
                .parse()
                .map_err(|_| DiffParseError::InvalidHunkHeader(line.to_string()))?,
            None => 1,
        };
        Ok((start, len))
    };

    let (old_start, old_lines) = split(old_part)?;
    let (new_start, new_lines) = split(new_part)?;
    Ok((old_start, old_lines, new_start, new_lines))
}

/// Strict parser: classifies hunk bodies and validates that removed+context
/// line counts match `old_lines` and added+context counts match `new_lines`.
pub fn parse_strict(raw_diff: &str) -> Result<Vec<DiffHunk>, DiffParseError> {
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut current: Option<DiffHunk> = None;

    let validate = |hunk: &DiffHunk| -> Result<(), DiffParseError> {
        let old_seen = hunk
            .lines
            .iter()
            .filter(|l| matches!(l, DiffLine::Removed(_) | DiffLine::Context(_)))
            .count() as u32;
        let new_seen = hunk
            .lines
            .iter()
            .filter(|l| matches!(l, DiffLine::Added(_) | DiffLine::Context(_)))
            .count() as u32;
        if old_seen != hunk.old_lines || new_seen != hunk.new_lines {
            return Err(DiffParseError::BodyMismatch(hunk.old_start));
        }
        Ok(())
    };

    for line in raw_diff.lines() {
        if line.starts_with("@@ ") {
            if let Some(h) = current.take() {
                validate(&h)?;
                hunks.push(h);
            }
            let (old_start, old_lines, new_start, new_lines) = parse_header(line)?;
            current = Some(DiffHunk {
                old_start,
                old_lines,
                new_start,
                new_lines,
                lines: Vec::new(),
            });
        } else if let Some(hunk) = current.as_mut() {
            if line.starts_with("--- ") || line.starts_with("+++ ") {
                // Next file section begins; close out the current hunk.
                let h = current.take().expect("hunk present");
                validate(&h)?;
                hunks.push(h);
            } else if let Some(rest) = line.strip_prefix('+') {
                hunk.lines.push(DiffLine::Added(rest.to_string()));
            } else if let Some(rest) = line.strip_prefix('-') {
                hunk.lines.push(DiffLine::Removed(rest.to_string()));
            } else if line.starts_with('\\') {
                // "\ No newline at end of file" is not a body line.
            } else if let Some(rest) = line.strip_prefix(' ') {
                hunk.lines.push(DiffLine::Context(rest.to_string()));
            } else if line.is_empty() {
                hunk.lines.push(DiffLine::Context(String::new()));
            } else {
                // Other headers (diff --git, index, ---/+++) end the hunk.
                let h = current.take().expect("hunk present");
                validate(&h)?;
                hunks.push(h);
            }
        }
    }

    if let Some(h) = current {
        validate(&h)?;
        hunks.push(h);
    }
    Ok(hunks)
}

/// Parses a unified diff into 1-based inclusive `(start, end)` source-side
/// line ranges.
///
/// Strict parsing first; when it rejects, fall back to scanning the
/// `@@ -start,length` headers. An omitted length defaults to 1, and a
/// length of 0 still yields a single-line range.
pub fn parse_hunks(raw_diff: &str) -> Vec<(u32, u32)> {
    match parse_strict(raw_diff) {
        Ok(hunks) => hunks
            .iter()
            .map(|h| (h.old_start, h.old_start + h.old_lines.max(1) - 1))
            .collect(),
        Err(_) => hunk_header_re()
            .captures_iter(raw_diff)
            .filter_map(|cap| {
                let start: u32 = cap.name("start")?.as_str().parse().ok()?;
                let length: u32 = match cap.name("length") {
                    Some(m) => m.as_str().parse().ok()?,
                    None => 1,
                };
                Some((start, start + length.max(1) - 1))
            })
            .collect(),
    }
}

/// True when the node's line range overlaps any hunk range. Touching at a
/// single boundary line counts as overlap.
pub fn overlaps(node_start: u32, node_end: u32, hunk_ranges: &[(u32, u32)]) -> bool {
    hunk_ranges
        .iter()
        .any(|&(h_start, h_end)| node_start <= h_end && node_end >= h_start)
}

/// Returns the ± lines from `raw_diff` whose source position falls within
/// `[node_start, node_end]` (1-based, inclusive).
///
/// The source-line counter advances through removed and context lines;
/// added lines take the current source position without advancing it.
/// Context lines and `---`/`+++` file headers are never emitted.
pub fn extract_patch_text(raw_diff: &str, node_start: u32, node_end: u32) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut source_line: u32 = 0;
    let mut in_hunk = false;

    for line in raw_diff.lines() {
        if line.starts_with("@@ ") {
            match parse_header(line) {
                Ok((old_start, _, _, _)) => {
                    source_line = old_start;
                    in_hunk = true;
                }
                Err(_) => in_hunk = false,
            }
            continue;
        }
        if !in_hunk {
            continue;
        }
        if line.starts_with("--- ") || line.starts_with("+++ ") {
            in_hunk = false;
            continue;
        }
        if line.starts_with('-') {
            if node_start <= source_line && source_line <= node_end {
                out.push(line);
            }
            source_line += 1;
        } else if line.starts_with('+') {
            if node_start <= source_line && source_line <= node_end {
                out.push(line);
            }
        } else if !line.starts_with('\\') {
            source_line += 1;
        }
    }
    out.join("\n")
}

fn old_side_paths(raw_diff: &str) -> impl Iterator<Item = &str> {
    raw_diff
        .lines()
        .filter_map(|l| l.strip_prefix("--- "))
        .map(str::trim)
}

fn new_side_paths(raw_diff: &str) -> impl Iterator<Item = &str> {
    raw_diff
        .lines()
        .filter_map(|l| l.strip_prefix("+++ "))
        .map(str::trim)
}

/// True when the diff represents a newly added file (`/dev/null` on the
/// old side).
pub fn is_file_added(raw_diff: &str) -> bool {
    old_side_paths(raw_diff).any(|p| p == "/dev/null")
}

/// True when the diff represents a complete file deletion (`/dev/null` on
/// the new side).
pub fn is_file_deleted(raw_diff: &str) -> bool {
    new_side_paths(raw_diff).any(|p| p == "/dev/null")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "\
--- a/src/config.py
+++ b/src/config.py
@@ -5,3 +5,3 @@
 context_before
-TIMEOUT_SECONDS = 30
+TIMEOUT_SECONDS = 5
 context_after
";

    #[test]
    fn parse_hunks_returns_source_ranges() {
        assert_eq!(parse_hunks(SIMPLE), vec![(5, 7)]);
    }

    #[test]
    fn every_parsed_hunk_overlaps_itself() {
        let ranges = parse_hunks(SIMPLE);
        for &(start, end) in &ranges {
            assert!(overlaps(start, end, &ranges));
        }
    }

    #[test]
    fn omitted_length_defaults_to_one() {
        let diff = "--- a/x\n+++ b/x\n@@ -12 +12 @@\n-old\n+new\n";
        assert_eq!(parse_hunks(diff), vec![(12, 12)]);
    }

    #[test]
    fn imprecise_counters_fall_back_to_headers() {
        // Header claims 7 source lines but the body only carries 2:
        // strict parsing rejects, the regex fallback trusts the header.
        let diff = "--- a/x\n+++ b/x\n@@ -10,7 +10,7 @@\n-old\n+new\n";
        assert!(parse_strict(diff).is_err());
        assert_eq!(parse_hunks(diff), vec![(10, 16)]);
    }

    #[test]
    fn empty_diff_yields_no_ranges() {
        assert!(parse_hunks("").is_empty());
    }

    #[test]
    fn overlap_counts_boundary_touch() {
        let ranges = vec![(18, 19)];
        assert!(overlaps(10, 18, &ranges));
        assert!(overlaps(19, 30, &ranges));
        assert!(!overlaps(10, 17, &ranges));
        assert!(!overlaps(20, 30, &ranges));
    }

    #[test]
    fn extract_patch_text_emits_only_plus_minus_in_range() {
        let text = extract_patch_text(SIMPLE, 1, 100);
        assert_eq!(text, "-TIMEOUT_SECONDS = 30\n+TIMEOUT_SECONDS = 5");
        // No context, no file headers.
        assert!(!text.contains("context_before"));
        assert!(!text.contains("---"));
        assert!(!text.contains("+++"));
    }

    #[test]
    fn extract_patch_text_respects_node_range() {
        let diff = "\
--- a/x
+++ b/x
@@ -5,2 +5,2 @@
-alpha
+ALPHA
@@ -40,2 +40,2 @@
-omega
+OMEGA
";
        let text = extract_patch_text(diff, 1, 10);
        assert!(text.contains("-alpha"));
        assert!(text.contains("+ALPHA"));
        assert!(!text.contains("omega"));
        assert!(!text.contains("OMEGA"));
    }

    #[test]
    fn file_added_and_deleted_predicates() {
        let added = "--- /dev/null\n+++ b/src/new.py\n@@ -0,0 +1,2 @@\n+a\n+b\n";
        let deleted = "--- a/src/LegacyAuth.cs\n+++ /dev/null\n@@ -1,2 +0,0 @@\n-a\n-b\n";
        assert!(is_file_added(added));
        assert!(!is_file_deleted(added));
        assert!(is_file_deleted(deleted));
        assert!(!is_file_added(deleted));
        assert!(!is_file_added(SIMPLE));
        assert!(!is_file_deleted(SIMPLE));
    }
}
