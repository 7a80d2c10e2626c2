//! Score arithmetic shared by sessions, results and statistics.
//!
//! Percentages are rounded half-up to whole numbers and are always in `0..=100`.
//! An empty denominator yields `0` rather than a division fault.

/// `round(100 * correct / total)`, or `0` when `total` is zero.
#[must_use]
pub fn percentage(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as u128;
    let total = total as u128;
    let rounded = (200 * correct + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

/// Rounded mean of the given scores, `0` for an empty input.
#[must_use]
pub fn average(scores: impl IntoIterator<Item = u8>) -> u8 {
    let (sum, count) = scores
        .into_iter()
        .fold((0_u64, 0_u64), |(sum, count), s| (sum + u64::from(s), count + 1));
    if count == 0 {
        return 0;
    }
    let rounded = (2 * sum + count) / (2 * count);
    u8::try_from(rounded).unwrap_or(100)
}

/// Running count of answered and correct items for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total: usize,
    pub correct: usize,
}

impl Tally {
    pub fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        percentage(self.correct, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(3, 5), 60);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(4, 0), 0);
    }

    #[test]
    fn percentage_stays_in_bounds() {
        for total in 1..=40 {
            for correct in 0..=total {
                assert!(percentage(correct, total) <= 100);
            }
        }
        assert_eq!(percentage(9, 3), 100);
    }

    #[test]
    fn average_rounds_and_handles_empty() {
        assert_eq!(average(Vec::new()), 0);
        assert_eq!(average([60, 80]), 70);
        assert_eq!(average([100, 0, 0]), 33);
        assert_eq!(average([50, 51]), 51);
    }

    #[test]
    fn tally_tracks_correct_answers() {
        let mut tally = Tally::default();
        tally.record(true);
        tally.record(false);
        tally.record(true);
        assert_eq!(tally, Tally { total: 3, correct: 2 });
        assert_eq!(tally.percentage(), 67);
    }
}
