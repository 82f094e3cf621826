//! Scoring engine: grid path verification and word adjudication.
//!
//! A word is "in the grid" when its letters can be traced over the board
//! with King's-move steps, never revisiting a cell, with multi-letter
//! tiles ("Qu") consumed atomically. Only existence of a path matters;
//! the first one found is reported back for highlighting.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::constants::word_score;
use crate::session::PlayerId;
use crate::words::Board;

/// One grid cell, `(row, col)`.
pub type Cell = (usize, usize);

/// Adjudication result for one submitted word.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ScoredWord {
    pub word: String,
    /// Length-based value; zero when the word is off-grid or duplicated.
    pub score: u32,
    pub in_grid: bool,
    /// Submitted verbatim by two or more players; scores zero for all.
    pub duplicate: bool,
    /// Present in the configured word list, or approved by the manager.
    pub dictionary_valid: bool,
    /// Longest counting word for its submitter (ties all flagged).
    pub longest_bonus: bool,
    /// A witnessing path over the grid, if one exists.
    pub path: Option<Vec<Cell>>,
}

impl ScoredWord {
    /// The score that counts toward a player's round total. Words still in
    /// the dictionary-invalid bucket are pending manager adjudication and
    /// contribute nothing until approved.
    #[must_use]
    pub fn counted_score(&self) -> u32 {
        if self.dictionary_valid { self.score } else { 0 }
    }
}

/// Scored submissions for one player, in submission order.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerScore {
    pub player: PlayerId,
    pub words: Vec<ScoredWord>,
}

impl PlayerScore {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.words.iter().map(ScoredWord::counted_score).sum()
    }
}

/// Find a path spelling `word` on `board`, if any.
///
/// Depth-first backtracking over cells whose tile text matches the next
/// prefix of the word. Case-insensitive; the word is normalized by the
/// caller.
#[must_use]
pub fn find_path(board: &Board, word: &str) -> Option<Vec<Cell>> {
    if word.is_empty() {
        return None;
    }
    let mut visited = vec![false; board.rows * board.cols];
    let mut path = Vec::new();
    for row in 0..board.rows {
        for col in 0..board.cols {
            if search(board, word, (row, col), &mut visited, &mut path) {
                return Some(path);
            }
        }
    }
    None
}

fn search(
    board: &Board,
    rest: &str,
    cell: Cell,
    visited: &mut [bool],
    path: &mut Vec<Cell>,
) -> bool {
    let (row, col) = cell;
    let idx = row * board.cols + col;
    if visited[idx] {
        return false;
    }
    let tile = board.tile(row, col);
    let Some(remaining) = strip_tile(rest, tile) else {
        return false;
    };

    visited[idx] = true;
    path.push(cell);
    if remaining.is_empty() {
        return true;
    }
    for (dr, dc) in [
        (-1, -1),
        (-1, 0),
        (-1, 1),
        (0, -1),
        (0, 1),
        (1, -1),
        (1, 0),
        (1, 1),
    ] {
        let next_row = row as isize + dr;
        let next_col = col as isize + dc;
        if next_row < 0
            || next_col < 0
            || next_row as usize >= board.rows
            || next_col as usize >= board.cols
        {
            continue;
        }
        if search(
            board,
            remaining,
            (next_row as usize, next_col as usize),
            visited,
            path,
        ) {
            return true;
        }
    }
    visited[idx] = false;
    path.pop();
    false
}

/// Strip a tile's text off the front of the word, consuming multi-letter
/// tiles atomically. Both sides are compared uppercased. Tiles are ASCII,
/// so a word leading with a multi-byte character never matches; `get`
/// keeps the slice on a char boundary.
fn strip_tile<'a>(word: &'a str, tile: &str) -> Option<&'a str> {
    let head = word.get(..tile.len())?;
    if head.eq_ignore_ascii_case(tile) {
        Some(&word[tile.len()..])
    } else {
        None
    }
}

/// Adjudicate every submission of a round.
///
/// Duplicate detection runs across players and precedes dictionary
/// validity. An empty dictionary means no word list was configured, so
/// every in-grid word counts.
#[must_use]
pub fn score_round(
    board: &Board,
    submissions: &[(PlayerId, Vec<String>)],
    dictionary: &HashSet<String>,
) -> Vec<PlayerScore> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (_, words) in submissions {
        // A player repeating their own word doesn't make it a duplicate.
        let distinct: HashSet<String> = words.iter().map(|w| w.to_uppercase()).collect();
        for word in distinct {
            *seen.entry(word).or_default() += 1;
        }
    }

    let mut scores: Vec<PlayerScore> = submissions
        .iter()
        .map(|(player, words)| {
            let words = words
                .iter()
                .map(|raw| {
                    let word = raw.to_uppercase();
                    let path = find_path(board, &word);
                    let in_grid = path.is_some();
                    let duplicate = seen.get(&word).copied().unwrap_or(0) >= 2;
                    let dictionary_valid =
                        dictionary.is_empty() || dictionary.contains(&word);
                    let score = if in_grid && !duplicate {
                        word_score(word.len())
                    } else {
                        0
                    };
                    ScoredWord {
                        word,
                        score,
                        in_grid,
                        duplicate,
                        dictionary_valid,
                        longest_bonus: false,
                        path,
                    }
                })
                .collect();
            PlayerScore {
                player: *player,
                words,
            }
        })
        .collect();

    for player in &mut scores {
        flag_longest(&mut player.words);
    }
    scores
}

/// Re-derive the per-player longest-word flags. A word counts toward the
/// bonus when it is in-grid, non-duplicate and dictionary-valid.
pub fn flag_longest(words: &mut [ScoredWord]) {
    let longest = words
        .iter()
        .filter(|w| w.in_grid && !w.duplicate && w.dictionary_valid)
        .map(|w| w.word.len())
        .max();
    for word in words.iter_mut() {
        word.longest_bonus = word.in_grid
            && !word.duplicate
            && word.dictionary_valid
            && Some(word.word.len()) == longest;
    }
}
