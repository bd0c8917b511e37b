//! Scoring helpers shared by the per-type handlers (spec.md §4.9).
//!
//! Grounded in `original_source/flask-server/app/socketio_events/
//! open_answer_events.py::analyze_answer` for the similarity feedback
//! thresholds, and in spec.md's speed-bonus and placement formulas for
//! everything timing-related. Kept as free functions rather than methods on
//! `Session`, the way the teacher keeps its scoring math in standalone
//! functions games call into rather than on `BackEndArchitecture` itself.

/// Linear speed bonus: full `max_points` at `elapsed_ms == 0`, decaying to
/// zero at `length_ms`, never going negative for a late answer.
pub fn speed_bonus(max_points: i64, elapsed_ms: u64, length_ms: u64) -> i64 {
    if length_ms == 0 {
        return 0;
    }
    let elapsed = elapsed_ms.min(length_ms) as f64;
    let length = length_ms as f64;
    let fraction = (length - elapsed) / length;
    (max_points as f64 * fraction).round() as i64
}

/// Math-quiz correct-answer points: half-life decay rather than linear,
/// `round(base * (1 - 0.5 * min(1, elapsed_ms / length_ms)))`, so a
/// last-second correct answer still keeps half the base value instead of
/// bottoming out at zero like [`speed_bonus`].
pub fn math_quiz_speed_points(base: f64, elapsed_ms: u64, length_ms: u64) -> i64 {
    if length_ms == 0 {
        return (base * 0.5).round() as i64;
    }
    let time_percent = (elapsed_ms as f64 / length_ms as f64).min(1.0);
    (base * (1.0 - 0.5 * time_percent)).round() as i64
}

/// Points for finishing in `placement` (1-indexed) out of `total` players,
/// per spec.md's guess-a-number / drawing placement bonus: first place gets
/// the full bonus, decaying by an even share per rank, floored at zero.
pub fn placement_bonus(max_points: i64, placement: usize, total: usize) -> i64 {
    if total <= 1 || placement == 0 {
        return max_points;
    }
    let share = max_points as f64 / total as f64;
    let bonus = max_points as f64 - share * (placement as f64 - 1.0);
    bonus.round().max(0.0) as i64
}

/// Proximity bonus for guess-a-number: 0 at `max_distance` or beyond, full
/// `max_points` for an exact guess.
pub fn proximity_bonus(max_points: i64, guess: f64, answer: f64, max_distance: f64) -> i64 {
    if max_distance <= 0.0 {
        return 0;
    }
    let distance = (guess - answer).abs().min(max_distance);
    let fraction = (max_distance - distance) / max_distance;
    (max_points as f64 * fraction).round() as i64
}

/// Free-for-all guess-a-number placement component: `max(10, 100 - (placement-1) * floor(100/N))`.
pub fn guess_number_placement_points(placement: usize, total: usize) -> i64 {
    use protocol::tunables::POINTS_FOR_PLACEMENT;
    if total == 0 {
        return POINTS_FOR_PLACEMENT;
    }
    let step = POINTS_FOR_PLACEMENT / total as i64;
    let raw = POINTS_FOR_PLACEMENT - (placement.saturating_sub(1) as i64) * step;
    raw.max(10)
}

/// Free-for-all guess-a-number accuracy component, from the normalized
/// distance `min(|guess - answer| / max(|answer|, eps), 1)`.
pub fn guess_number_accuracy_bonus(guess: f64, answer: f64) -> i64 {
    let denom = answer.abs().max(1e-9);
    let normalized = ((guess - answer).abs() / denom).min(1.0);
    if normalized <= f64::EPSILON {
        200
    } else if normalized <= 0.01 {
        150
    } else if normalized <= 0.05 {
        100
    } else if normalized <= 0.25 {
        50
    } else {
        0
    }
}

/// Open-answer / drawing-answer similarity classification, mirroring
/// `analyze_answer`'s length-ratio gate followed by a similarity-ratio
/// check. `similarity` is expected to come from a Ratcliff/Obershelp-style
/// comparator (see [`similarity_ratio`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerVerdict {
    Correct,
    Close,
    Incorrect,
}

pub fn classify_open_answer(submitted: &str, expected: &str) -> AnswerVerdict {
    let submitted = submitted.trim().to_lowercase();
    let expected = expected.trim().to_lowercase();
    if submitted == expected {
        return AnswerVerdict::Correct;
    }
    if submitted.is_empty() || expected.is_empty() {
        return AnswerVerdict::Incorrect;
    }

    let length_ratio = submitted.chars().count() as f64 / expected.chars().count() as f64;
    if !(0.7..=1.3).contains(&length_ratio) {
        return AnswerVerdict::Incorrect;
    }

    let similarity = similarity_ratio(&submitted, &expected);
    if similarity >= 0.8 {
        AnswerVerdict::Correct
    } else if similarity >= 0.5 {
        AnswerVerdict::Close
    } else {
        AnswerVerdict::Incorrect
    }
}

/// Ratcliff/Obershelp similarity ratio: `2 * matches / (len_a + len_b)`,
/// where `matches` is the total length of the longest-common-substring
/// recursion. Mirrors Python's `difflib.SequenceMatcher.ratio()`, which
/// `analyze_answer` calls directly.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let matches = matching_blocks(&a, &b);
    2.0 * matches as f64 / (a.len() + b.len()) as f64
}

fn matching_blocks(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (len, a_start, b_start) = longest_common_substring(a, b);
    if len == 0 {
        return 0;
    }
    matching_blocks(&a[..a_start], &b[..b_start])
        + len
        + matching_blocks(&a[a_start + len..], &b[b_start + len..])
}

fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    let (mut best_len, mut best_a, mut best_b) = (0, 0, 0);
    for i in 0..a.len() {
        for j in 0..b.len() {
            if a[i] == b[j] {
                table[i + 1][j + 1] = table[i][j] + 1;
                if table[i + 1][j + 1] > best_len {
                    best_len = table[i + 1][j + 1];
                    best_a = i + 1 - best_len;
                    best_b = j + 1 - best_len;
                }
            }
        }
    }
    (best_len, best_a, best_b)
}

/// Masks `word` for progressive letter reveal, replacing every index not in
/// `revealed` with `_` and leaving whitespace untouched.
pub fn mask_word(word: &str, revealed: &std::collections::HashSet<usize>) -> String {
    word.chars()
        .enumerate()
        .map(|(i, c)| {
            if c.is_whitespace() || revealed.contains(&i) {
                c
            } else {
                '_'
            }
        })
        .collect()
}
