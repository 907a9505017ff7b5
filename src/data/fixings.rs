//! Historical index fixings and dividends.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

/// One historical value of a named index (or a dividend of a named equity).
#[derive(Debug, Clone, PartialEq)]
pub struct Fixing {
    pub date: NaiveDate,
    pub name: String,
    pub value: f64,
}

impl Fixing {
    pub fn new(name: impl Into<String>, date: NaiveDate, value: f64) -> Self {
        Self { date, name: name.into(), value }
    }
}

/// Fixings grouped by name, then date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixingHistory {
    series: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
}

impl FixingHistory {
    pub fn new() -> Self { Self::default() }

    pub fn from_fixings(fixings: impl IntoIterator<Item = Fixing>) -> Self {
        let mut history = Self::new();
        for fixing in fixings {
            history.insert(fixing);
        }
        history
    }

    /// Adds a fixing unless one exists for its name and date. Returns
    /// whether it was added.
    pub fn insert(&mut self, fixing: Fixing) -> bool {
        let series = self.series.entry(fixing.name).or_default();
        if series.contains_key(&fixing.date) {
            return false;
        }
        series.insert(fixing.date, fixing.value);
        true
    }

    pub fn get(&self, name: &str, date: NaiveDate) -> Option<f64> {
        self.series.get(name)?.get(&date).copied()
    }

    /// The most recent fixing on or before `date`.
    pub fn last_on_or_before(&self, name: &str, date: NaiveDate) -> Option<(NaiveDate, f64)> {
        self.series.get(name)?.range(..=date).next_back().map(|(d, v)| (*d, *v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.series.keys().map(String::as_str)
    }

    /// Number of fixings across all names.
    pub fn len(&self) -> usize {
        self.series.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool { self.series.is_empty() }
}

/// Union of two fixing sets. On a name and date present in both, the
/// first set's value is kept.
pub(crate) fn merge_fixings(first: Vec<Fixing>, second: Vec<Fixing>) -> Vec<Fixing> {
    let mut seen = HashSet::new();
    first
        .into_iter()
        .chain(second)
        .filter(|f| seen.insert((f.name.clone(), f.date)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_history_keeps_first_value_per_date() {
        let history = FixingHistory::from_fixings([
            Fixing::new("EUR-EURIBOR-6M", d(26), 0.0391),
            Fixing::new("EUR-EURIBOR-6M", d(27), 0.0389),
            Fixing::new("EUR-EURIBOR-6M", d(27), 0.5),
        ]);
        assert_eq!(history.len(), 2);
        assert_eq!(history.get("EUR-EURIBOR-6M", d(27)), Some(0.0389));
        assert_eq!(history.last_on_or_before("EUR-EURIBOR-6M", d(28)), Some((d(27), 0.0389)));
        assert_eq!(history.last_on_or_before("EUR-EURIBOR-6M", d(25)), None);
        assert_eq!(history.get("USD-SOFR", d(27)), None);
    }

    #[test]
    fn test_merge_prefers_first() {
        let merged = merge_fixings(
            vec![Fixing::new("X", d(27), 1.0)],
            vec![Fixing::new("X", d(27), 2.0), Fixing::new("Y", d(27), 3.0)],
        );
        assert_eq!(merged, vec![Fixing::new("X", d(27), 1.0), Fixing::new("Y", d(27), 3.0)]);
    }
}
