//! Normalized dissimilarity between two document contents
//!
//! Similarity is the Ratcliff/Obershelp ratio `2·M / (|a| + |b|)`, where `M`
//! is the number of characters covered by recursively chosen longest common
//! blocks. The delta is `1 − similarity`.

use std::collections::HashMap;

/// Similarity of `a` and `b` in [0, 1]; two empty strings are identical (1.0)
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = matching_characters(&a, &b);
    (2 * matched) as f64 / total as f64
}

/// Change between two versions: 0.0 for identical content (including two
/// empty documents), approaching 1.0 for a total rewrite.
///
/// # Example
///
/// ```
/// use roundtable_domain::document_delta;
///
/// assert_eq!(document_delta("", ""), 0.0);
/// assert_eq!(document_delta("same", "same"), 0.0);
/// assert_eq!(document_delta("abc", ""), 1.0);
/// ```
pub fn document_delta(previous: &str, current: &str) -> f64 {
    (1.0 - similarity_ratio(previous, current)).clamp(0.0, 1.0)
}

/// Total length of the matching blocks between `a` and `b`
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        positions.entry(*c).or_default().push(j);
    }
    let mut runs = RunTable::new(b.len());

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = runs.longest_match(a, &positions, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Run lengths of matches ending at each position of `b`, for the previous
/// and the current row of `a`
///
/// Slot `j + 1` holds the run ending at `b[j]`, so slot 0 is always zero.
/// Only touched slots are reset between rows, which keeps a row proportional
/// to the occurrences of its character in `b`.
struct RunTable {
    previous: Vec<usize>,
    current: Vec<usize>,
    previous_touched: Vec<usize>,
    current_touched: Vec<usize>,
}

impl RunTable {
    fn new(b_len: usize) -> Self {
        Self {
            previous: vec![0; b_len + 1],
            current: vec![0; b_len + 1],
            previous_touched: Vec::new(),
            current_touched: Vec::new(),
        }
    }

    /// Longest block `a[i..i+size] == b[j..j+size]` within the given windows;
    /// ties resolve to the earliest position in `a`, then in `b`.
    fn longest_match(
        &mut self,
        a: &[char],
        positions: &HashMap<char, Vec<usize>>,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

        for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
            if let Some(indices) = positions.get(c) {
                let first = indices.partition_point(|&j| j < blo);
                for &j in indices[first..].iter().take_while(|&&j| j < bhi) {
                    // a run may not start before `blo`
                    let run = if j > blo { self.previous[j] + 1 } else { 1 };
                    self.current[j + 1] = run;
                    self.current_touched.push(j + 1);
                    if run > best_size {
                        best_i = i + 1 - run;
                        best_j = j + 1 - run;
                        best_size = run;
                    }
                }
            }
            self.advance_row();
        }
        self.advance_row();

        (best_i, best_j, best_size)
    }

    /// Make the current row the previous one and clear the new current row
    fn advance_row(&mut self) {
        for &slot in &self.previous_touched {
            self.previous[slot] = 0;
        }
        self.previous_touched.clear();
        std::mem::swap(&mut self.previous, &mut self.current);
        std::mem::swap(&mut self.previous_touched, &mut self.current_touched);
    }
}
