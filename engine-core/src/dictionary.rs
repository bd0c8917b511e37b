//! In-memory word lookup with Czech diacritic folding (spec.md §4.8, §9).
//!
//! Grounded on `original_source/flask-server/app/socketio_events/
//! word_chain_events.py::load_dictionary`/`remove_diacritics`: a flat
//! newline-separated word list where each line may carry a `/flags` suffix
//! (Hunspell-style `.dic` format) to be stripped. If the asset fails to
//! load, the original degrades to accepting every word; this is kept as an
//! intentional, documented degradation (spec.md §9) rather than treated as
//! a startup error.

use std::collections::HashSet;

const INVALID_ENDING_LETTERS: [char; 5] = ['q', 'w', 'x', 'y', 'ů'];

/// Explicit Czech diacritic fold used for the word-chain "next letter" rule.
/// Deliberately not Unicode NFKD normalization: `ů -> ú` is a linguistic
/// rule specific to this game, not a canonical decomposition.
pub fn fold_diacritics(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'ě' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ý' => 'y',
            'ň' => 'n',
            'ť' => 't',
            'ď' => 'd',
            'ů' => 'ú',
            other => other,
        })
        .collect()
}

/// Permissive-by-default dictionary: `None` means the asset failed to load
/// at startup and every word is accepted.
pub struct Dictionary {
    words: Option<HashSet<String>>,
}

impl Dictionary {
    /// Parses a Hunspell-style `.dic` word list.
    pub fn load(contents: &str) -> Self {
        let words = contents
            .lines()
            .filter_map(|line| {
                let word = line.trim().split('/').next().unwrap_or("").to_lowercase();
                (!word.is_empty()).then_some(word)
            })
            .collect();
        Dictionary { words: Some(words) }
    }

    /// The degraded, permissive mode used when the asset is missing.
    pub fn permissive() -> Self {
        Dictionary { words: None }
    }

    pub fn is_permissive(&self) -> bool {
        self.words.is_none()
    }

    /// Pure lookup: same input always yields the same result.
    pub fn contains(&self, word: &str) -> bool {
        match &self.words {
            None => true,
            Some(words) => words.contains(&word.to_lowercase()),
        }
    }

    pub fn len(&self) -> usize {
        self.words.as_ref().map(HashSet::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The folded last letter of `word`, or a uniformly random letter outside
/// the invalid set when the natural last letter can't start a word.
pub fn next_chain_letter(word: &str, mut random_letter: impl FnMut() -> char) -> char {
    let folded = fold_diacritics(&word.to_lowercase());
    let last = folded.chars().last().unwrap_or('a');
    if INVALID_ENDING_LETTERS.contains(&last) {
        random_letter()
    } else {
        last
    }
}

/// Whether `letter` may legally start a word-chain turn.
pub fn is_valid_chain_letter(letter: char) -> bool {
    !INVALID_ENDING_LETTERS.contains(&letter.to_ascii_lowercase())
}

/// Whether `word` starts with `letter`, accepting either the raw or the
/// diacritic-folded form (spec.md §4.8 "matching either with diacritics or
/// folded").
pub fn starts_with_letter(word: &str, letter: char) -> bool {
    let word = word.to_lowercase();
    let letter = letter.to_lowercase().next().unwrap_or(letter);
    word.starts_with(letter) || fold_diacritics(&word).starts_with(letter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_explicit_czech_map() {
        assert_eq!(fold_diacritics("sůl"), "súl");
        assert_eq!(fold_diacritics("žár"), "žar");
        assert_eq!(fold_diacritics("měsíc"), "mesic");
    }

    #[test]
    fn lookup_is_pure() {
        let dict = Dictionary::load("pes/flag1\nkocka\n");
        assert!(dict.contains("pes"));
        assert!(dict.contains("PES"));
        assert!(dict.contains("kocka"));
        assert!(!dict.contains("slon"));
        // Same input, same result.
        assert_eq!(dict.contains("pes"), dict.contains("pes"));
    }

    #[test]
    fn permissive_mode_accepts_everything() {
        let dict = Dictionary::permissive();
        assert!(dict.is_permissive());
        assert!(dict.contains("anything"));
    }

    #[test]
    fn invalid_ending_letter_falls_back_to_random() {
        let letter = next_chain_letter("ahoy", || 'z');
        assert_eq!(letter, 'z');
    }

    #[test]
    fn valid_ending_letter_is_kept() {
        let letter = next_chain_letter("pes", || 'z');
        assert_eq!(letter, 's');
    }

    #[test]
    fn folded_ending_becomes_the_next_letter() {
        // "sůl" folds to "súl" whose last letter is 'l', a valid letter.
        let letter = next_chain_letter("sůl", || 'z');
        assert_eq!(letter, 'l');
    }

    #[test]
    fn accepts_raw_or_folded_start() {
        assert!(starts_with_letter("úl", 'ú'));
        assert!(starts_with_letter("ul", 'ú'));
    }
}
