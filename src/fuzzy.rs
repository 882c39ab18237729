//! Case-insensitive subsequence matching with a relevance score.
//!
//! Every pattern character has to appear in the candidate, in order. Matches
//! at the start of the candidate, right after a separator or on a camelCase
//! boundary, and runs of adjacent matches score higher; unmatched characters,
//! leading ones especially, lower the score.

const FIRST_CHAR_BONUS: i32 = 10;
const SEPARATOR_BONUS: i32 = 20;
const CAMEL_CASE_BONUS: i32 = 20;
const ADJACENT_BONUS: i32 = 5;
const LEADING_PENALTY: i32 = -5;
const MAX_LEADING_PENALTY: i32 = -15;
const UNMATCHED_PENALTY: i32 = -1;

const SEPARATORS: &[char] = &['/', '-', '_', ' ', '.', '\\', ':', '@'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Position of the candidate in the searched list
    pub index: usize,
    pub score: i32,
    /// Char positions of the matched pattern characters
    pub matched: Vec<usize>,
}

/// Scores one candidate, `None` when the pattern is not a subsequence of it.
///
/// Among all the ways the pattern can be laid over the candidate the best
/// scoring one wins, the leftmost on ties.
pub fn score(pattern: &str, candidate: &str) -> Option<(i32, Vec<usize>)> {
    let pattern: Vec<char> = pattern.chars().flat_map(char::to_lowercase).collect();
    let chars: Vec<char> = candidate.chars().collect();
    if pattern.is_empty() || pattern.len() > chars.len() {
        return None;
    }

    // best[i]: score of the pattern so far with its last char matched at i
    let mut best: Vec<Option<i32>> = chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            same(c, pattern[0]).then(|| {
                position_bonus(&chars, i) + (LEADING_PENALTY * i as i32).max(MAX_LEADING_PENALTY)
            })
        })
        .collect();
    // back[j][i]: where pattern[j] sat when pattern[j + 1] matched at i
    let mut back: Vec<Vec<usize>> = Vec::with_capacity(pattern.len() - 1);

    for &wanted in &pattern[1..] {
        let mut next = vec![None; chars.len()];
        let mut from = vec![0; chars.len()];
        let mut distant: Option<(i32, usize)> = None;

        for i in 1..chars.len() {
            if let Some(earlier) = i.checked_sub(2).and_then(|k| best[k].map(|s| (s, k))) {
                if distant.map_or(true, |(d, _)| earlier.0 > d) {
                    distant = Some(earlier);
                }
            }
            if !same(chars[i], wanted) {
                continue;
            }

            let adjacent = best[i - 1].map(|s| (s + ADJACENT_BONUS, i - 1));
            let choice = match (distant, adjacent) {
                (Some(d), Some(a)) if a.0 > d.0 => Some(a),
                (Some(d), _) => Some(d),
                (None, a) => a,
            };
            if let Some((s, k)) = choice {
                next[i] = Some(s + position_bonus(&chars, i));
                from[i] = k;
            }
        }

        best = next;
        back.push(from);
    }

    let (end, total) = best
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.map(|s| (i, s)))
        .fold(None, |acc: Option<(usize, i32)>, (i, s)| match acc {
            Some((_, b)) if b >= s => acc,
            _ => Some((i, s)),
        })?;

    let mut matched = vec![end];
    for row in back.iter().rev() {
        let last = matched[matched.len() - 1];
        matched.push(row[last]);
    }
    matched.reverse();

    let unmatched = (chars.len() - matched.len()) as i32;
    Some((total + UNMATCHED_PENALTY * unmatched, matched))
}

fn same(c: char, wanted: char) -> bool {
    c.to_lowercase().eq(std::iter::once(wanted))
}

fn position_bonus(chars: &[char], i: usize) -> i32 {
    if i == 0 {
        return FIRST_CHAR_BONUS;
    }

    let (prev, c) = (chars[i - 1], chars[i]);
    if SEPARATORS.contains(&prev) {
        SEPARATOR_BONUS
    } else if prev.is_lowercase() && c.is_uppercase() {
        CAMEL_CASE_BONUS
    } else {
        0
    }
}

/// Matches `pattern` against every candidate, best score first.
///
/// Equal scores keep the candidates' order.
pub fn find<S: AsRef<str>>(pattern: &str, candidates: &[S]) -> Vec<Match> {
    let mut matches: Vec<Match> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            score(pattern, candidate.as_ref()).map(|(score, matched)| Match {
                index,
                score,
                matched,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches
}
