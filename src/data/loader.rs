//! Market data loaders: quote retrieval by name and date.

use super::fixings::{merge_fixings, Fixing};
use super::quote::SimpleQuote;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("no market datum for name {name} and date {date}")]
    NotFound { name: String, date: NaiveDate },
    #[error("no reference datum of type {data_type} with id {id}")]
    NoReferenceDatum { data_type: String, id: String },
    #[error("no FX quotes connect {unit_ccy} to {ccy}")]
    NoFxPath { unit_ccy: String, ccy: String },
}

/// A quote observed for one name on one date.
#[derive(Debug, Clone)]
pub struct MarketDatum {
    pub name: String,
    pub date: NaiveDate,
    pub quote: Arc<SimpleQuote>,
}

impl MarketDatum {
    pub fn value(&self) -> f64 {
        self.quote.value()
    }
}

/// Source of raw quotes. Only leaf builders call it.
pub trait Loader: Send + Sync {
    fn has(&self, name: &str, date: NaiveDate) -> bool;

    fn get(&self, name: &str, date: NaiveDate) -> Result<MarketDatum, DataError>;

    fn load_quotes(&self, date: NaiveDate) -> Vec<MarketDatum>;

    /// Historical index fixings, any date.
    fn load_fixings(&self) -> Vec<Fixing> {
        Vec::new()
    }

    /// Historical equity dividends, any date.
    fn load_dividends(&self) -> Vec<Fixing> {
        Vec::new()
    }
}

/// Loader over a fixed set of quotes, fixings and dividends held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    quotes: BTreeMap<(NaiveDate, String), MarketDatum>,
    fixings: Vec<Fixing>,
    dividends: Vec<Fixing>,
}

impl InMemoryLoader {
    pub fn new() -> Self { Self::default() }

    /// Adds (or replaces) a quote and returns the shared handle.
    pub fn add(&mut self, name: &str, date: NaiveDate, value: f64) -> Arc<SimpleQuote> {
        let quote = Arc::new(SimpleQuote::new(value));
        let datum = MarketDatum { name: name.to_string(), date, quote: quote.clone() };
        self.quotes.insert((date, name.to_string()), datum);
        quote
    }

    pub fn add_fixing(&mut self, name: &str, date: NaiveDate, value: f64) -> &mut Self {
        self.fixings.push(Fixing::new(name, date, value));
        self
    }

    pub fn add_dividend(&mut self, name: &str, date: NaiveDate, value: f64) -> &mut Self {
        self.dividends.push(Fixing::new(name, date, value));
        self
    }

    /// Number of quotes held.
    pub fn len(&self) -> usize { self.quotes.len() }

    pub fn is_empty(&self) -> bool { self.quotes.is_empty() }
}

impl Loader for InMemoryLoader {
    fn has(&self, name: &str, date: NaiveDate) -> bool {
        self.quotes.contains_key(&(date, name.to_string()))
    }

    fn get(&self, name: &str, date: NaiveDate) -> Result<MarketDatum, DataError> {
        self.quotes
            .get(&(date, name.to_string()))
            .cloned()
            .ok_or_else(|| DataError::NotFound { name: name.to_string(), date })
    }

    fn load_quotes(&self, date: NaiveDate) -> Vec<MarketDatum> {
        self.quotes
            .range((date, String::new())..)
            .take_while(|((d, _), _)| *d == date)
            .map(|(_, datum)| datum.clone())
            .collect()
    }

    fn load_fixings(&self) -> Vec<Fixing> {
        self.fixings.clone()
    }

    fn load_dividends(&self) -> Vec<Fixing> {
        self.dividends.clone()
    }
}

/// Two loaders seen as one; the first wins on quotes, fixings and
/// dividends present in both.
#[derive(Clone)]
pub struct CompositeLoader {
    first: Arc<dyn Loader>,
    second: Arc<dyn Loader>,
}

impl CompositeLoader {
    pub fn new(first: Arc<dyn Loader>, second: Arc<dyn Loader>) -> Self {
        Self { first, second }
    }
}

impl Loader for CompositeLoader {
    fn has(&self, name: &str, date: NaiveDate) -> bool {
        self.first.has(name, date) || self.second.has(name, date)
    }

    fn get(&self, name: &str, date: NaiveDate) -> Result<MarketDatum, DataError> {
        if self.first.has(name, date) {
            return self.first.get(name, date);
        }
        self.second.get(name, date)
    }

    fn load_quotes(&self, date: NaiveDate) -> Vec<MarketDatum> {
        let mut data = self.first.load_quotes(date);
        data.extend(self.second.load_quotes(date));
        data
    }

    fn load_fixings(&self) -> Vec<Fixing> {
        merge_fixings(self.first.load_fixings(), self.second.load_fixings())
    }

    fn load_dividends(&self) -> Vec<Fixing> {
        merge_fixings(self.first.load_dividends(), self.second.load_dividends())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_in_memory_lookup_is_per_date() {
        let mut l = InMemoryLoader::new();
        l.add("MM/RATE/EUR/0D/1D", d(28), 0.039);
        l.add("MM/RATE/EUR/0D/1D", d(27), 0.038);
        l.add("FX/RATE/EUR/USD", d(28), 1.08);

        assert!(l.has("FX/RATE/EUR/USD", d(28)));
        assert!(!l.has("FX/RATE/EUR/USD", d(27)));
        assert_eq!(l.get("MM/RATE/EUR/0D/1D", d(27)).unwrap().value(), 0.038);
        assert_eq!(l.load_quotes(d(28)).len(), 2);
        assert!(matches!(l.get("nope", d(28)), Err(DataError::NotFound { .. })));
    }

    #[test]
    fn test_composite_prefers_first_and_merges_quotes() {
        let mut a = InMemoryLoader::new();
        a.add("X", d(28), 1.0);
        let mut b = InMemoryLoader::new();
        b.add("X", d(28), 2.0);
        b.add("Y", d(28), 3.0);

        let c = CompositeLoader::new(Arc::new(a), Arc::new(b));
        assert_eq!(c.get("X", d(28)).unwrap().value(), 1.0);
        assert_eq!(c.get("Y", d(28)).unwrap().value(), 3.0);
        assert!(c.get("Z", d(28)).is_err());
        assert_eq!(c.load_quotes(d(28)).len(), 3);
    }

    #[test]
    fn test_composite_merges_fixings_and_dividends() {
        let mut a = InMemoryLoader::new();
        a.add_fixing("EUR-EURIBOR-6M", d(27), 0.0389).add_dividend("SP5", d(15), 1.7);
        let mut b = InMemoryLoader::new();
        b.add_fixing("EUR-EURIBOR-6M", d(27), 0.04)
            .add_fixing("EUR-EURIBOR-6M", d(26), 0.0391)
            .add_dividend("RIO", d(8), 2.25);

        let c = CompositeLoader::new(Arc::new(a), Arc::new(b));
        assert_eq!(
            c.load_fixings(),
            vec![Fixing::new("EUR-EURIBOR-6M", d(27), 0.0389), Fixing::new("EUR-EURIBOR-6M", d(26), 0.0391)]
        );
        assert_eq!(c.load_dividends().len(), 2);
        assert!(InMemoryLoader::new().load_fixings().is_empty());
    }
}
