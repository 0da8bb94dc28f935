/// Number of unchanged lines shown around each change.
pub const DEFAULT_CONTEXT: usize = 3;

/// A contiguous region of changes between two texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// First line of the region in the old text (1-based)
    pub old_start: usize,
    /// Number of old lines covered by the region
    pub old_count: usize,
    /// First line of the region in the new text (1-based)
    pub new_start: usize,
    /// Number of new lines covered by the region
    pub new_count: usize,
    /// Raw lines of the hunk (prefixed with +, -, or space)
    pub lines: Vec<String>,
}

impl Hunk {
    /// `@@ -a,b +c,d @@`, with single-line ranges written without a count
    /// and empty ranges anchored on the line before them.
    pub fn header(&self) -> String {
        format!(
            "@@ -{} +{} @@",
            format_range(self.old_start, self.old_count),
            format_range(self.new_start, self.new_count)
        )
    }
}

fn format_range(start: usize, count: usize) -> String {
    match count {
        0 => format!("{},0", start - 1),
        1 => start.to_string(),
        _ => format!("{},{}", start, count),
    }
}

/// Line diff between two texts, grouped into hunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnifiedDiff {
    pub hunks: Vec<Hunk>,
    /// Lines only in the new text
    pub additions: usize,
    /// Lines only in the old text
    pub deletions: usize,
}

impl UnifiedDiff {
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Render in unified diff format. Identical texts render as "".
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut out = vec!["--- old".to_string(), "+++ new".to_string()];
        for hunk in &self.hunks {
            out.push(hunk.header());
            out.extend(hunk.lines.iter().cloned());
        }
        out.join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

#[derive(Debug)]
struct Edit<'a> {
    op: Op,
    text: &'a str,
    /// Position in the old text when this edit is applied
    old_index: usize,
    /// Position in the new text when this edit is applied
    new_index: usize,
}

/// Compute the unified diff of `old` against `new`, line by line.
///
/// Changes separated by at most `2 * context` unchanged lines share a hunk.
pub fn unified_diff(old: &str, new: &str, context: usize) -> UnifiedDiff {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let edits = edit_script(&old_lines, &new_lines);

    let changes: Vec<usize> = edits
        .iter()
        .enumerate()
        .filter(|(_, edit)| edit.op != Op::Equal)
        .map(|(idx, _)| idx)
        .collect();
    if changes.is_empty() {
        return UnifiedDiff::default();
    }

    // (first change, last change) per hunk, as indices into `edits`
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for &idx in &changes {
        match groups.last_mut() {
            Some((_, last)) if idx - *last - 1 <= 2 * context => *last = idx,
            _ => groups.push((idx, idx)),
        }
    }

    let hunks = groups
        .into_iter()
        .map(|(first, last)| {
            let lo = first.saturating_sub(context);
            let hi = (last + context + 1).min(edits.len());
            build_hunk(&edits[lo..hi])
        })
        .collect();

    UnifiedDiff {
        hunks,
        additions: edits.iter().filter(|e| e.op == Op::Insert).count(),
        deletions: edits.iter().filter(|e| e.op == Op::Delete).count(),
    }
}

fn build_hunk(edits: &[Edit<'_>]) -> Hunk {
    let old_start = edits.first().map_or(0, |e| e.old_index) + 1;
    let new_start = edits.first().map_or(0, |e| e.new_index) + 1;
    let lines = edits
        .iter()
        .map(|edit| match edit.op {
            Op::Equal => format!(" {}", edit.text),
            Op::Delete => format!("-{}", edit.text),
            Op::Insert => format!("+{}", edit.text),
        })
        .collect();

    Hunk {
        old_start,
        old_count: edits.iter().filter(|e| e.op != Op::Insert).count(),
        new_start,
        new_count: edits.iter().filter(|e| e.op != Op::Delete).count(),
        lines,
    }
}

/// Longest-common-subsequence edit script; deletions come before insertions
/// at each changed position. Only the span between the common prefix and
/// suffix goes through the LCS table.
fn edit_script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Edit<'a>> {
    let (n, m) = (old.len(), new.len());
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let (old_mid, new_mid) = (&old[prefix..n - suffix], &new[prefix..m - suffix]);
    let (mid_n, mid_m) = (old_mid.len(), new_mid.len());

    // lcs[i][j]: length of the LCS of old_mid[i..] and new_mid[j..]
    let mut lcs = vec![vec![0usize; mid_m + 1]; mid_n + 1];
    for i in (0..mid_n).rev() {
        for j in (0..mid_m).rev() {
            lcs[i][j] = if old_mid[i] == new_mid[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut edits = Vec::with_capacity(n + m);
    for k in 0..prefix {
        edits.push(Edit { op: Op::Equal, text: old[k], old_index: k, new_index: k });
    }

    let (mut i, mut j) = (0, 0);
    while i < mid_n || j < mid_m {
        let (old_index, new_index) = (prefix + i, prefix + j);
        if i < mid_n && j < mid_m && old_mid[i] == new_mid[j] {
            edits.push(Edit { op: Op::Equal, text: old_mid[i], old_index, new_index });
            i += 1;
            j += 1;
        } else if i < mid_n && (j == mid_m || lcs[i + 1][j] >= lcs[i][j + 1]) {
            edits.push(Edit { op: Op::Delete, text: old_mid[i], old_index, new_index });
            i += 1;
        } else {
            edits.push(Edit { op: Op::Insert, text: new_mid[j], old_index, new_index });
            j += 1;
        }
    }

    for k in 0..suffix {
        let (old_index, new_index) = (n - suffix + k, m - suffix + k);
        edits.push(Edit { op: Op::Equal, text: old[old_index], old_index, new_index });
    }
    edits
}

/// Split on `\n`, keeping a trailing empty line so that a trailing newline
/// counts as a difference. Empty text has no lines.
fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}
