//! Sequence Differencer.
//!
//! Longest-common-subsequence over frozen items. Two items are the same item
//! when their canonical serializations are identical, so a record that only
//! moved shows up as one deletion plus one insertion.
//!
//! # Algorithm
//!
//! 1. Freeze every item on both sides
//! 2. Fill the (m+1)x(n+1) LCS length table
//! 3. Backtrack from (m, n); on a score tie keep the new position and step
//!    back on the old side
//! 4. `diff` reports the indices each side has outside the LCS

use serde::Serialize;

use crate::value::freeze;

/// An item both sequences share, with its position on each side.
#[derive(Debug, Clone, PartialEq)]
pub struct Common<T> {
    pub item: T,
    pub old_index: usize,
    pub new_index: usize,
}

/// An item present on one side only.
#[derive(Debug, Clone, PartialEq)]
pub struct Change<T> {
    pub item: T,
    pub index: usize,
}

/// Deletions from `old` and insertions into `new`, both in index order.
#[derive(Debug, Clone, PartialEq)]
pub struct Diff<T> {
    pub minus: Vec<Change<T>>,
    pub plus: Vec<Change<T>>,
}

impl<T> Diff<T> {
    pub fn is_empty(&self) -> bool {
        self.minus.is_empty() && self.plus.is_empty()
    }
}

/// Longest common subsequence of `old` and `new`, in order.
pub fn lcs<T: Serialize + Clone>(old: &[T], new: &[T]) -> Vec<Common<T>> {
    let a: Vec<String> = old.iter().map(freeze).collect();
    let b: Vec<String> = new.iter().map(freeze).collect();
    let (m, n) = (a.len(), b.len());

    // table[i][j] = LCS length of a[..i] and b[..j]
    let mut table = vec![vec![0usize; n + 1]; m + 1];
    for i in 0..m {
        for j in 0..n {
            table[i + 1][j + 1] = if a[i] == b[j] {
                table[i][j] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut common = Vec::with_capacity(table[m][n]);
    let (mut i, mut j) = (m, n);
    while i > 0 && j > 0 {
        if a[i - 1] == b[j - 1] {
            common.push(Common {
                item: old[i - 1].clone(),
                old_index: i - 1,
                new_index: j - 1,
            });
            i -= 1;
            j -= 1;
        } else if table[i][j - 1] > table[i - 1][j] {
            j -= 1;
        } else {
            i -= 1;
        }
    }
    common.reverse();
    common
}

/// Indices of `old` and `new` not covered by their LCS.
pub fn diff<T: Serialize + Clone>(old: &[T], new: &[T]) -> Diff<T> {
    let common = lcs(old, new);
    let mut kept_old = vec![false; old.len()];
    let mut kept_new = vec![false; new.len()];
    for c in &common {
        kept_old[c.old_index] = true;
        kept_new[c.new_index] = true;
    }

    let outside = |items: &[T], kept: &[bool]| -> Vec<Change<T>> {
        items
            .iter()
            .enumerate()
            .filter(|(index, _)| !kept[*index])
            .map(|(index, item)| Change {
                item: item.clone(),
                index,
            })
            .collect()
    };

    Diff {
        minus: outside(old, &kept_old),
        plus: outside(new, &kept_new),
    }
}
