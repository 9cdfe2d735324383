//! Delta detection against last-known values.

use crate::instrument::Instrument;
use crate::snapshot::QuoteSnapshot;
use std::collections::HashMap;

/// A value that moved at least `threshold` away from its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceMove {
    pub instrument: Instrument,
    pub previous: i64,
    pub current: i64,
}

impl PriceMove {
    pub fn delta(&self) -> i64 {
        self.current - self.previous
    }
}

/// Last-known value per instrument. Entries appear on the first non-null
/// observation and are only ever replaced by non-null values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baselines {
    values: HashMap<Instrument, i64>,
}

impl Baselines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, instrument: Instrument) -> Option<i64> {
        self.values.get(&instrument).copied()
    }

    pub fn set(&mut self, instrument: Instrument, value: i64) {
        self.values.insert(instrument, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compare `snapshot` against the baselines and return every instrument
    /// whose absolute change is `>= threshold`.
    ///
    /// The first observation of an instrument only records it. Absent entries
    /// are skipped without touching their baseline.
    pub fn detect(&mut self, snapshot: &QuoteSnapshot, threshold: i64) -> Vec<PriceMove> {
        let mut moves = Vec::new();
        for (instrument, value) in snapshot.iter() {
            let Some(current) = value else {
                continue;
            };
            match self.values.get_mut(&instrument) {
                None => {
                    self.values.insert(instrument, current);
                }
                Some(baseline) => {
                    if current.abs_diff(*baseline) >= threshold.unsigned_abs() {
                        moves.push(PriceMove {
                            instrument,
                            previous: *baseline,
                            current,
                        });
                        *baseline = current;
                    }
                }
            }
        }
        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(Instrument, Option<i64>)]) -> QuoteSnapshot {
        entries.iter().copied().collect()
    }

    #[test]
    fn first_observation_is_silent() {
        let mut baselines = Baselines::new();
        let moves = baselines.detect(&snapshot(&[(Instrument::Btc, Some(1_000_000))]), 10_000);
        assert!(moves.is_empty());
        assert_eq!(baselines.get(Instrument::Btc), Some(1_000_000));
    }

    #[test]
    fn crossing_threshold_emits_and_rebases() {
        let mut baselines = Baselines::new();
        baselines.set(Instrument::Btc, 1_000_000);

        let moves = baselines.detect(&snapshot(&[(Instrument::Btc, Some(1_015_000))]), 10_000);

        assert_eq!(
            moves,
            vec![PriceMove {
                instrument: Instrument::Btc,
                previous: 1_000_000,
                current: 1_015_000,
            }]
        );
        assert_eq!(baselines.get(Instrument::Btc), Some(1_015_000));
    }

    #[test]
    fn exact_threshold_triggers_in_both_directions() {
        let mut baselines = Baselines::new();
        baselines.set(Instrument::Usd, 500_000);

        let up = baselines.detect(&snapshot(&[(Instrument::Usd, Some(510_000))]), 10_000);
        assert_eq!(up.len(), 1);

        let down = baselines.detect(&snapshot(&[(Instrument::Usd, Some(500_000))]), 10_000);
        assert_eq!(down.len(), 1);
        assert_eq!(down[0].delta(), -10_000);
    }

    #[test]
    fn small_moves_keep_the_old_baseline() {
        let mut baselines = Baselines::new();
        baselines.set(Instrument::Usd, 500_000);

        assert!(baselines
            .detect(&snapshot(&[(Instrument::Usd, Some(509_999))]), 10_000)
            .is_empty());
        assert_eq!(baselines.get(Instrument::Usd), Some(500_000));

        // drift accumulates against the unchanged baseline
        let moves = baselines.detect(&snapshot(&[(Instrument::Usd, Some(510_500))]), 10_000);
        assert_eq!(moves.len(), 1);
    }

    #[test]
    fn null_entries_leave_baseline_untouched() {
        let mut baselines = Baselines::new();
        baselines.set(Instrument::Usd, 500_000);
        baselines.set(Instrument::Btc, 1_000_000);

        let moves = baselines.detect(
            &snapshot(&[(Instrument::Usd, None), (Instrument::Btc, Some(2_000_000))]),
            10_000,
        );

        assert_eq!(baselines.get(Instrument::Usd), Some(500_000));
        assert_eq!(baselines.get(Instrument::Btc), Some(2_000_000));
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].instrument, Instrument::Btc);
    }

    #[test]
    fn never_valued_instrument_never_gets_a_baseline() {
        let mut baselines = Baselines::new();
        for _ in 0..5 {
            let moves = baselines.detect(&snapshot(&[(Instrument::Eth, None)]), 1);
            assert!(moves.is_empty());
        }
        assert_eq!(baselines.get(Instrument::Eth), None);
        assert!(baselines.is_empty());
    }
}
