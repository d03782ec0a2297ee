//! Matching-blocks similarity ratio used by the fuzzy listing fallback.
//!
//! `ratio = 2 * M / T` where `T` is the combined length of both strings and
//! `M` is the number of characters in the matching blocks found by
//! repeatedly taking the longest common substring and recursing on both
//! sides of it (Ratcliff/Obershelp).
//!
//! When the second string has at least 200 characters, characters making up
//! more than 1% of it are "popular": a block may not start on them, though
//! it can grow across them at either end.

use std::collections::{HashMap, HashSet};

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;

const POPULAR_MIN_LEN: usize = 200;

pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_characters(&a, &b);
    2.0 * matches as f64 / total as f64
}

fn popular_characters(b: &[char]) -> HashSet<char> {
    if b.len() < POPULAR_MIN_LEN {
        return HashSet::new();
    }
    let limit = b.len() / 100 + 1;
    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in b {
        *counts.entry(*c).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > limit)
        .map(|(c, _)| c)
        .collect()
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let popular = popular_characters(b);
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, &popular, (alo, ahi), (blo, bhi));
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

/// Longest common block in `a[alo..ahi]` and `b[blo..bhi]` that contains a
/// non-popular character, extended over equal neighbours on both sides.
/// Ties go to the earliest start in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    popular: &HashSet<char>,
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let width = bhi - blo;
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let k = j - blo + 1;
            if a[i] == b[j] && !popular.contains(&b[j]) {
                current[k] = previous[k - 1] + 1;
                let size = current[k];
                if size > best_size {
                    best_i = i + 1 - size;
                    best_j = j + 1 - size;
                    best_size = size;
                }
            } else {
                current[k] = 0;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
        best_i -= 1;
        best_j -= 1;
        best_size += 1;
    }
    while best_i + best_size < ahi
        && best_j + best_size < bhi
        && a[best_i + best_size] == b[best_j + best_size]
    {
        best_size += 1;
    }

    (best_i, best_j, best_size)
}

/// Average ratio of each `(stored, wanted)` pair. A missing stored value
/// scores zero.
pub fn average_ratio<'a, I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (Option<&'a str>, &'a str)>,
{
    let mut total = 0.0;
    let mut count = 0usize;
    for (stored, wanted) in pairs {
        total += stored.map(|value| ratio(value, wanted)).unwrap_or(0.0);
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}
