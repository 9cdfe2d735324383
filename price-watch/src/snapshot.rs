//! Immutable result of one fetch cycle.

use crate::instrument::Instrument;
use std::collections::BTreeMap;

/// Instrument values captured by one fetch cycle.
///
/// Every instrument owned by a configured source has an entry. `None` marks an
/// instrument whose source failed or whose field was malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteSnapshot {
    values: BTreeMap<Instrument, Option<i64>>,
}

impl QuoteSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instrument: Instrument, value: Option<i64>) {
        self.values.insert(instrument, value);
    }

    /// Track `instruments` as absent. Entries already present, with or
    /// without a value, are left alone.
    pub fn mark_absent(&mut self, instruments: &[Instrument]) {
        for instrument in instruments {
            self.values.entry(*instrument).or_insert(None);
        }
    }

    /// `Some(None)` means the instrument is tracked but unavailable this cycle.
    pub fn get(&self, instrument: Instrument) -> Option<Option<i64>> {
        self.values.get(&instrument).copied()
    }

    pub fn value(&self, instrument: Instrument) -> Option<i64> {
        self.values.get(&instrument).copied().flatten()
    }

    pub fn contains(&self, instrument: Instrument) -> bool {
        self.values.contains_key(&instrument)
    }

    /// Entries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (Instrument, Option<i64>)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when no entry carries a value.
    pub fn all_absent(&self) -> bool {
        self.values.values().all(Option::is_none)
    }
}

impl FromIterator<(Instrument, Option<i64>)> for QuoteSnapshot {
    fn from_iter<T: IntoIterator<Item = (Instrument, Option<i64>)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_absent_never_blanks_an_existing_value() {
        let mut snapshot: QuoteSnapshot = [(Instrument::Btc, Some(7))].into_iter().collect();

        snapshot.mark_absent(&[Instrument::Btc, Instrument::Eth]);

        assert_eq!(snapshot.get(Instrument::Btc), Some(Some(7)));
        assert_eq!(snapshot.get(Instrument::Eth), Some(None));
        assert_eq!(snapshot.get(Instrument::Usd), None);
        assert!(!snapshot.all_absent());
    }
}
