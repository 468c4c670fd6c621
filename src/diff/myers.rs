//! Myers' O((N+M)D) shortest edit script over token sequences.
//!
//! Lines are interned to `u32` tokens first, so the search compares integers
//! instead of strings and the edit script is mapped back to full lines.

use std::collections::HashMap;

use super::{DiffOp, LineDiff};

/// Edit distance after which the search stops and the remaining middle
/// section is reported as a plain delete + insert.
pub const DEFAULT_MAX_EDIT_COST: usize = 1024;

/// Line differ based on Myers' greedy algorithm.
#[derive(Debug, Clone)]
pub struct MyersDiff {
    max_edit_cost: usize,
}

impl MyersDiff {
    pub fn new() -> Self {
        Self::with_max_edit_cost(DEFAULT_MAX_EDIT_COST)
    }

    /// Bound the search effort; the memory kept for backtracking grows with
    /// the square of the edit distance.
    pub fn with_max_edit_cost(max_edit_cost: usize) -> Self {
        Self { max_edit_cost }
    }
}

impl Default for MyersDiff {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDiff for MyersDiff {
    fn diff<'a>(&self, old: &[&'a str], new: &[&'a str]) -> Vec<DiffOp<'a>> {
        let (old_tokens, new_tokens) = intern(old, new);

        let prefix = old_tokens
            .iter()
            .zip(&new_tokens)
            .take_while(|(a, b)| a == b)
            .count();
        let suffix = old_tokens[prefix..]
            .iter()
            .rev()
            .zip(new_tokens[prefix..].iter().rev())
            .take_while(|(a, b)| a == b)
            .count();

        let a = &old_tokens[prefix..old_tokens.len() - suffix];
        let b = &new_tokens[prefix..new_tokens.len() - suffix];

        let mut ops = Vec::with_capacity(old.len().max(new.len()));
        ops.extend(old[..prefix].iter().copied().map(DiffOp::equal));

        for edit in shortest_edit(a, b, self.max_edit_cost) {
            ops.push(match edit {
                Edit::Equal(i, _) => DiffOp::equal(old[prefix + i]),
                Edit::Delete(i) => DiffOp::delete(old[prefix + i]),
                Edit::Insert(j) => DiffOp::insert(new[prefix + j]),
            });
        }

        ops.extend(old[old.len() - suffix..].iter().copied().map(DiffOp::equal));
        ops
    }
}

/// Map each distinct line to a single token shared by both sides.
fn intern(old: &[&str], new: &[&str]) -> (Vec<u32>, Vec<u32>) {
    let mut table: HashMap<&str, u32> = HashMap::new();
    let mut token = |line| {
        let next = table.len() as u32;
        *table.entry(line).or_insert(next)
    };
    let a = old.iter().map(|line| token(*line)).collect();
    let b = new.iter().map(|line| token(*line)).collect();
    (a, b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// Furthest-reaching x on diagonal `k`, stored for `k` in `-d..=d`.
struct Frontier {
    d: isize,
    xs: Vec<isize>,
}

impl Frontier {
    fn get(&self, k: isize) -> isize {
        self.xs[(k + self.d) as usize]
    }
}

fn shortest_edit(a: &[u32], b: &[u32], max_cost: usize) -> Vec<Edit> {
    let n = a.len() as isize;
    let m = b.len() as isize;

    if n == 0 {
        return (0..b.len()).map(Edit::Insert).collect();
    }
    if m == 0 {
        return (0..a.len()).map(Edit::Delete).collect();
    }

    let max = (n + m) as usize;
    let limit = max.min(max_cost.max(1)) as isize;
    let offset = max as isize + 1;
    let mut v = vec![0isize; 2 * max + 3];
    let mut trace: Vec<Frontier> = Vec::new();

    for d in 0..=limit {
        for k in (-d..=d).step_by(2) {
            let down = k == -d
                || (k != d && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize]);
            let mut x = if down {
                v[(k + 1 + offset) as usize]
            } else {
                v[(k - 1 + offset) as usize] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[(k + offset) as usize] = x;

            if x >= n && y >= m {
                trace.push(snapshot(&v, d, offset));
                return backtrack(a, b, &trace);
            }
        }
        trace.push(snapshot(&v, d, offset));
    }

    log::debug!(
        "Edit distance exceeded {} ({} x {} lines), reporting middle section as replaced",
        limit,
        n,
        m
    );
    (0..a.len())
        .map(Edit::Delete)
        .chain((0..b.len()).map(Edit::Insert))
        .collect()
}

fn snapshot(v: &[isize], d: isize, offset: isize) -> Frontier {
    let start = (offset - d) as usize;
    let end = (offset + d) as usize;
    Frontier {
        d,
        xs: v[start..=end].to_vec(),
    }
}

/// Walk the recorded frontiers from the end point back to the origin.
fn backtrack(a: &[u32], b: &[u32], trace: &[Frontier]) -> Vec<Edit> {
    let mut x = a.len() as isize;
    let mut y = b.len() as isize;
    let mut edits = Vec::new();

    for d in (0..trace.len()).rev() {
        let d = d as isize;
        let k = x - y;

        let (prev_x, prev_y) = if d == 0 {
            (0, 0)
        } else {
            let prev = &trace[(d - 1) as usize];
            let down = k == -d || (k != d && prev.get(k - 1) < prev.get(k + 1));
            let prev_k = if down { k + 1 } else { k - 1 };
            let prev_x = prev.get(prev_k);
            (prev_x, prev_x - prev_k)
        };

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            edits.push(Edit::Equal(x as usize, y as usize));
        }

        if d > 0 {
            if x == prev_x {
                y -= 1;
                edits.push(Edit::Insert(y as usize));
            } else {
                x -= 1;
                edits.push(Edit::Delete(x as usize));
            }
        }

        debug_assert_eq!((x, y), (prev_x, prev_y));
    }

    edits.reverse();
    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffTag;

    fn script(a: &[u32], b: &[u32]) -> Vec<Edit> {
        shortest_edit(a, b, DEFAULT_MAX_EDIT_COST)
    }

    fn cost(edits: &[Edit]) -> usize {
        edits
            .iter()
            .filter(|e| !matches!(e, Edit::Equal(..)))
            .count()
    }

    /// Rebuild the new sequence from the old one and the edit script.
    fn apply(a: &[u32], b: &[u32], edits: &[Edit]) -> Vec<u32> {
        edits
            .iter()
            .filter_map(|e| match *e {
                Edit::Equal(i, _) => Some(a[i]),
                Edit::Insert(j) => Some(b[j]),
                Edit::Delete(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_identical() {
        let a = [1, 2, 3];
        let edits = script(&a, &a);
        assert_eq!(cost(&edits), 0);
        assert_eq!(edits.len(), 3);
    }

    #[test]
    fn test_classic_example() {
        // ABCABBA -> CBABAC has an edit distance of 5.
        let a = [1, 2, 3, 1, 2, 2, 1];
        let b = [3, 2, 1, 2, 1, 3];
        let edits = script(&a, &b);
        assert_eq!(cost(&edits), 5);
        assert_eq!(apply(&a, &b, &edits), b);
    }

    #[test]
    fn test_one_side_empty() {
        assert_eq!(script(&[], &[7, 8]), vec![Edit::Insert(0), Edit::Insert(1)]);
        assert_eq!(script(&[7], &[]), vec![Edit::Delete(0)]);
    }

    #[test]
    fn test_replacement_deletes_before_inserting() {
        let edits = script(&[1, 2], &[1, 3]);
        assert_eq!(
            edits,
            vec![Edit::Equal(0, 0), Edit::Delete(1), Edit::Insert(1)]
        );
    }

    #[test]
    fn test_cost_cap_falls_back_to_replace() {
        let a = [1, 2, 3, 4];
        let b = [5, 6, 7, 8];
        let edits = shortest_edit(&a, &b, 2);
        assert_eq!(cost(&edits), 8);
        assert_eq!(apply(&a, &b, &edits), b);
    }

    #[test]
    fn test_interning_shares_tokens() {
        let (a, b) = intern(&["x", "y", "x"], &["y", "z"]);
        assert_eq!(a, vec![0, 1, 0]);
        assert_eq!(b, vec![1, 2]);
    }

    #[test]
    fn test_trims_common_prefix_and_suffix() {
        let old = ["head", "old", "tail"];
        let new = ["head", "new", "tail"];
        let ops = MyersDiff::new().diff(&old, &new);
        let tags: Vec<DiffTag> = ops.iter().map(|op| op.tag).collect();
        assert_eq!(
            tags,
            vec![
                DiffTag::Equal,
                DiffTag::Delete,
                DiffTag::Insert,
                DiffTag::Equal
            ]
        );
    }
}
