//! Line-level diff between two text snapshots.
//!
//! Only the delta is rendered for notifications: inserted lines are prefixed
//! with `+`, deleted lines with `-`, and unchanged lines are left out.

pub mod myers;

pub use myers::MyersDiff;

/// How a line relates the old snapshot to the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffTag {
    Equal,
    Insert,
    Delete,
}

/// A single tagged line of an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOp<'a> {
    pub tag: DiffTag,
    /// Line content, including its trailing newline when it had one
    pub line: &'a str,
}

impl<'a> DiffOp<'a> {
    pub fn equal(line: &'a str) -> Self {
        Self {
            tag: DiffTag::Equal,
            line,
        }
    }

    pub fn insert(line: &'a str) -> Self {
        Self {
            tag: DiffTag::Insert,
            line,
        }
    }

    pub fn delete(line: &'a str) -> Self {
        Self {
            tag: DiffTag::Delete,
            line,
        }
    }
}

/// Computes an ordered edit script between two line sequences.
///
/// Implementations need not be globally minimal, but must never tag a line
/// present on both sides of a matched pair as changed, or a changed line as
/// equal.
pub trait LineDiff: Send + Sync {
    fn diff<'a>(&self, old: &[&'a str], new: &[&'a str]) -> Vec<DiffOp<'a>>;
}

/// Edit script between two snapshots.
#[derive(Debug, Clone, Default)]
pub struct DiffResult<'a> {
    pub ops: Vec<DiffOp<'a>>,
}

impl<'a> DiffResult<'a> {
    /// Diff two texts line by line.
    pub fn compute(differ: &dyn LineDiff, old: &'a str, new: &'a str) -> Self {
        let old_lines = split_lines(old);
        let new_lines = split_lines(new);
        Self {
            ops: differ.diff(&old_lines, &new_lines),
        }
    }

    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        self.ops.iter().any(|op| op.tag != DiffTag::Equal)
    }

    /// Get the number of inserted plus deleted lines.
    pub fn change_count(&self) -> usize {
        self.ops.iter().filter(|op| op.tag != DiffTag::Equal).count()
    }

    /// Render changed lines only, in edit-script order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for op in &self.ops {
            let prefix = match op.tag {
                DiffTag::Equal => continue,
                DiffTag::Insert => '+',
                DiffTag::Delete => '-',
            };
            out.push(prefix);
            out.push_str(op.line);
            if !op.line.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}

/// Split text into lines that keep their trailing newline.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Cut `text` to at most `max_chars` characters, appending `suffix` when
/// anything was removed. Counting is by code point, never by byte.
pub fn truncate(text: &str, max_chars: usize, suffix: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + suffix.len());
            out.push_str(&text[..cut]);
            out.push_str(suffix);
            out
        }
        None => text.to_string(),
    }
}

/// Diff two snapshots with the default differ and render the delta.
pub fn render_diff(old: &str, new: &str) -> String {
    DiffResult::compute(&MyersDiff::new(), old, new).render()
}
