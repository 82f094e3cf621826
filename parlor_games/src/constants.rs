//! Game constants shared across the engines.

/// Number of firework colours in a standard deck.
pub const COLOUR_COUNT: usize = 5;

/// Hint tokens available at the start of a game (and the hard cap).
pub const MAX_HINT_TOKENS: u8 = 8;

/// Mistakes allowed before the show fails.
pub const MAX_FUSES: u8 = 3;

/// Card values dealt per colour. Ten cards per colour, fifty in total.
pub const VALUES_PER_COLOUR: [u8; 10] = [1, 1, 1, 2, 2, 3, 3, 4, 4, 5];

/// Height a firework pile must reach to be complete.
pub const PILE_COMPLETE: u8 = 5;

/// Hand size by player count: five cards for 2-3 players, four for 4-5.
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 5;

#[must_use]
pub const fn hand_size(player_count: usize) -> usize {
    if player_count <= 3 { 5 } else { 4 }
}

/// Display names are truncated to this length on join.
pub const MAX_NAME_LENGTH: usize = 250;

/// Seconds between the round-start announcement and the round actually
/// starting, unless the manager overrides it.
pub const DEFAULT_COUNTDOWN_SECS: i64 = 15;

/// Default length of a word-game round.
pub const DEFAULT_ROUND_SECS: i64 = 180;

/// Word score by letter count. Words shorter than three letters score
/// nothing; everything from eight letters up scores the table maximum.
pub const WORD_SCORES: [(usize, u32); 6] = [(3, 1), (4, 1), (5, 2), (6, 3), (7, 5), (8, 11)];

#[must_use]
pub fn word_score(len: usize) -> u32 {
    let mut score = 0;
    for (min_len, value) in WORD_SCORES {
        if len >= min_len {
            score = value;
        }
    }
    score
}

/// The classic sixteen-die set for a 4x4 board. One face per die is rolled
/// per round; note the two-letter "Qu" face.
pub const DEFAULT_DICE: [[&str; 6]; 16] = [
    ["A", "A", "E", "E", "G", "N"],
    ["A", "B", "B", "J", "O", "O"],
    ["A", "C", "H", "O", "P", "S"],
    ["A", "F", "F", "K", "P", "S"],
    ["A", "O", "O", "T", "T", "W"],
    ["C", "I", "M", "O", "T", "U"],
    ["D", "E", "I", "L", "R", "X"],
    ["D", "E", "L", "R", "V", "Y"],
    ["D", "I", "S", "T", "T", "Y"],
    ["E", "E", "G", "H", "N", "W"],
    ["E", "E", "I", "N", "S", "U"],
    ["E", "H", "R", "T", "V", "W"],
    ["E", "I", "O", "S", "S", "T"],
    ["E", "L", "R", "T", "T", "Y"],
    ["H", "I", "M", "N", "U", "QU"],
    ["H", "L", "N", "N", "R", "Z"],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_scores_are_monotonic() {
        let mut last = 0;
        for len in 0..12 {
            let score = word_score(len);
            assert!(score >= last);
            last = score;
        }
        assert_eq!(word_score(2), 0);
        assert_eq!(word_score(3), 1);
        assert_eq!(word_score(5), 2);
        assert_eq!(word_score(8), 11);
        assert_eq!(word_score(20), 11);
    }

    #[test]
    fn deck_has_fifty_cards() {
        assert_eq!(COLOUR_COUNT * VALUES_PER_COLOUR.len(), 50);
    }

    #[test]
    fn hand_sizes() {
        assert_eq!(hand_size(2), 5);
        assert_eq!(hand_size(3), 5);
        assert_eq!(hand_size(4), 4);
        assert_eq!(hand_size(5), 4);
    }
}
