//! Best-effort three-way text merge
//!
//! Both edited versions are diffed against the common base. The local text
//! is kept as is and the server's hunks are replayed onto it, each one
//! relocated by its surrounding base context. Hunks whose context cannot be
//! found are dropped. Overlapping edits are not detected.

use thiserror::Error;

use crate::constants::{MAX_DIFF_CELLS, MAX_MERGE_CHARS, PATCH_MARGIN};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("text too large to merge ({0} characters)")]
    TooLarge(usize),
}

/// One contiguous edit against the base, positions in characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub start: usize,
    pub deleted: Vec<char>,
    pub inserted: Vec<char>,
}

impl Hunk {
    fn new(start: usize) -> Self {
        Self {
            start,
            deleted: Vec::new(),
            inserted: Vec::new(),
        }
    }

    fn end(&self) -> usize {
        self.start + self.deleted.len()
    }

    fn shift(&self) -> isize {
        self.inserted.len() as isize - self.deleted.len() as isize
    }
}

/// Merge `local` and `server`, both derived from `base`
pub fn merge(base: &str, local: &str, server: &str) -> Result<String, MergeError> {
    if local == server {
        return Ok(local.to_string());
    }
    if local == base {
        return Ok(server.to_string());
    }
    if server == base {
        return Ok(local.to_string());
    }

    let base: Vec<char> = base.chars().collect();
    let local: Vec<char> = local.chars().collect();
    let server: Vec<char> = server.chars().collect();
    for len in [base.len(), local.len(), server.len()] {
        if len > MAX_MERGE_CHARS {
            return Err(MergeError::TooLarge(len));
        }
    }

    let local_hunks = diff(&base, &local);
    let server_hunks = diff(&base, &server);

    let mut text = local;
    let mut applied_shift: isize = 0;
    for hunk in &server_hunks {
        let local_shift: isize = local_hunks
            .iter()
            .filter(|h| h.start < hunk.start || (h.start == hunk.start && h.deleted.is_empty()))
            .map(Hunk::shift)
            .sum();
        let expected = hunk.start as isize + local_shift + applied_shift;

        if let Some(at) = locate(&text, &base, hunk, expected) {
            text.splice(at..at + hunk.deleted.len(), hunk.inserted.iter().copied());
            applied_shift += hunk.shift();
        }
    }

    Ok(text.into_iter().collect())
}

/// Character diff of `other` against `base`
pub fn diff(base: &[char], other: &[char]) -> Vec<Hunk> {
    let prefix = base.iter().zip(other).take_while(|(a, b)| a == b).count();
    let max_suffix = base.len().min(other.len()) - prefix;
    let suffix = base
        .iter()
        .rev()
        .zip(other.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let a = &base[prefix..base.len() - suffix];
    let b = &other[prefix..other.len() - suffix];
    if a.is_empty() && b.is_empty() {
        return Vec::new();
    }

    if a.is_empty() || b.is_empty() || (a.len() + 1) * (b.len() + 1) > MAX_DIFF_CELLS {
        return vec![Hunk {
            start: prefix,
            deleted: a.to_vec(),
            inserted: b.to_vec(),
        }];
    }

    // lcs[i][j] = longest common subsequence of a[i..] and b[j..]
    let width = b.len() + 1;
    let mut lcs = vec![0u32; (a.len() + 1) * width];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i * width + j] = if a[i] == b[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut hunks = Vec::new();
    let mut current: Option<Hunk> = None;
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        if i < a.len() && j < b.len() && a[i] == b[j] {
            hunks.extend(current.take());
            i += 1;
            j += 1;
        } else if j == b.len() || (i < a.len() && lcs[(i + 1) * width + j] >= lcs[i * width + j + 1]) {
            current.get_or_insert_with(|| Hunk::new(prefix + i)).deleted.push(a[i]);
            i += 1;
        } else {
            current.get_or_insert_with(|| Hunk::new(prefix + i)).inserted.push(b[j]);
            j += 1;
        }
    }
    hunks.extend(current);
    hunks
}

/// Position in `text` where `hunk`'s deleted span starts, found by context
///
/// The context window shrinks from `PATCH_MARGIN` down to nothing; among
/// several matches the one closest to `expected` wins.
fn locate(text: &[char], base: &[char], hunk: &Hunk, expected: isize) -> Option<usize> {
    for margin in (0..=PATCH_MARGIN).rev() {
        let before = &base[hunk.start.saturating_sub(margin)..hunk.start];
        let after = &base[hunk.end()..(hunk.end() + margin).min(base.len())];

        let mut pattern = Vec::with_capacity(before.len() + hunk.deleted.len() + after.len());
        pattern.extend_from_slice(before);
        pattern.extend_from_slice(&hunk.deleted);
        pattern.extend_from_slice(after);

        if pattern.is_empty() {
            return Some(expected.clamp(0, text.len() as isize) as usize);
        }

        let target = expected - before.len() as isize;
        if let Some(found) = nearest_match(text, &pattern, target) {
            return Some(found + before.len());
        }
    }
    None
}

fn nearest_match(haystack: &[char], needle: &[char], target: isize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .filter(|&start| haystack[start..start + needle.len()] == *needle)
        .min_by_key(|&start| (start as isize - target).unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn diff_finds_single_insertion() {
        let hunks = diff(&chars("The quick fox"), &chars("The quick brown fox"));
        assert_eq!(
            hunks,
            vec![Hunk {
                start: 10,
                deleted: vec![],
                inserted: chars("brown "),
            }]
        );
    }

    #[test]
    fn diff_of_identical_text_is_empty() {
        assert!(diff(&chars("same"), &chars("same")).is_empty());
    }

    #[test]
    fn one_sided_edits_take_the_edited_side() {
        assert_eq!(merge("base", "base", "server").unwrap(), "server");
        assert_eq!(merge("base", "local", "base").unwrap(), "local");
        assert_eq!(merge("base", "same", "same").unwrap(), "same");
    }

    #[test]
    fn disjoint_edits_are_combined() {
        assert_eq!(
            merge("The quick fox", "The quick brown fox", "The quick fox jumps").unwrap(),
            "The quick brown fox jumps"
        );
        assert_eq!(
            merge(
                "Call Bob about the invoice",
                "Call Alice about the invoice",
                "Call Bob about the March invoice"
            )
            .unwrap(),
            "Call Alice about the March invoice"
        );
    }

    #[test]
    fn edits_on_empty_base_append_in_order() {
        let merged = merge("", "local note", "server note").unwrap();
        assert!(merged.contains("local note"));
        assert!(merged.contains("server note"));
    }

    #[test]
    fn handles_multibyte_text() {
        assert_eq!(merge("café au lait", "café au lait ☕", "grand café au lait").unwrap(), "grand café au lait ☕");
    }

    #[test]
    fn oversized_input_is_rejected() {
        let huge = "x".repeat(MAX_MERGE_CHARS + 1);
        assert_eq!(merge("a", &huge, "b"), Err(MergeError::TooLarge(MAX_MERGE_CHARS + 1)));
    }
}
