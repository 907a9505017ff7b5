//! FX triangulation: a rate for any currency pair connected through the
//! loader's FX spot quotes.

use super::loader::{DataError, MarketDatum};
use super::quote::{QuoteLinkage, SimpleQuote};
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::sync::Arc;

const FX_SPOT_PREFIX: &str = "FX/RATE/";

/// One direction of a quoted pair.
#[derive(Debug, Clone)]
struct Leg {
    quote: Arc<SimpleQuote>,
    inverted: bool,
}

impl Leg {
    fn rate(&self) -> f64 {
        let v = self.quote.value();
        if self.inverted { 1.0 / v } else { v }
    }
}

/// Currencies as vertices and quoted pairs as an edge in each direction.
#[derive(Debug, Clone, Default)]
pub struct FxTriangulation {
    graph: DiGraph<String, Leg>,
    currencies: HashMap<String, NodeIndex>,
}

impl FxTriangulation {
    pub fn new() -> Self { Self::default() }

    /// Collects every `FX/RATE/<UnitCcy>/<Ccy>` quote among `data`. With
    /// frozen linkage the rates are snapshots taken now.
    pub fn from_quotes<'a>(data: impl IntoIterator<Item = &'a MarketDatum>, linkage: QuoteLinkage) -> Self {
        let mut fx = Self::new();
        for datum in data {
            let Some((unit_ccy, ccy)) = datum.name.strip_prefix(FX_SPOT_PREFIX).and_then(|p| p.split_once('/')) else {
                continue;
            };
            if unit_ccy.is_empty() || ccy.is_empty() || ccy.contains('/') {
                continue;
            }
            let quote = match linkage {
                QuoteLinkage::Live => datum.quote.clone(),
                QuoteLinkage::Frozen => Arc::new(SimpleQuote::new(datum.value())),
            };
            fx.add_quote(unit_ccy, ccy, quote);
        }
        fx
    }

    /// Adds the price of one `unit_ccy` in `ccy`. The first quote for a
    /// pair, in either direction, is kept.
    pub fn add_quote(&mut self, unit_ccy: &str, ccy: &str, quote: Arc<SimpleQuote>) {
        let unit = self.currency(unit_ccy);
        let other = self.currency(ccy);
        if unit == other || self.graph.find_edge(unit, other).is_some() {
            return;
        }
        self.graph.add_edge(unit, other, Leg { quote: quote.clone(), inverted: false });
        self.graph.add_edge(other, unit, Leg { quote, inverted: true });
    }

    fn currency(&mut self, ccy: &str) -> NodeIndex {
        if let Some(&id) = self.currencies.get(ccy) {
            return id;
        }
        let id = self.graph.add_node(ccy.to_string());
        self.currencies.insert(ccy.to_string(), id);
        id
    }

    /// Price of one `unit_ccy` in `ccy`, chaining quotes through the
    /// fewest intermediate currencies.
    pub fn rate(&self, unit_ccy: &str, ccy: &str) -> Result<f64, DataError> {
        if unit_ccy == ccy {
            return Ok(1.0);
        }
        let no_path = || DataError::NoFxPath { unit_ccy: unit_ccy.to_string(), ccy: ccy.to_string() };
        let (from, to) = match (self.currencies.get(unit_ccy), self.currencies.get(ccy)) {
            (Some(&from), Some(&to)) => (from, to),
            _ => return Err(no_path()),
        };
        let (_, path) = astar(&self.graph, from, |n| n == to, |_| 1u32, |_| 0u32).ok_or_else(no_path)?;
        path.windows(2).try_fold(1.0, |acc, hop| {
            let edge = self.graph.find_edge(hop[0], hop[1]).ok_or_else(no_path)?;
            Ok(acc * self.graph[edge].rate())
        })
    }

    /// Currencies with at least one quote, sorted.
    pub fn currencies(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.currencies.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }

    pub fn is_empty(&self) -> bool { self.currencies.is_empty() }
}
