//! ledger.rs
//! Records why objects could not be built, per configuration.

use crate::graph::NodeLabel;
use serde::Serialize;
use std::collections::BTreeMap;

pub use self::error::NodeFailure;
mod error {
    use crate::graph::NodeLabel;
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum NodeFailure {
        #[error("build failed: {reason}")]
        Build { reason: String },
        #[error("no builder registered for {kind}")]
        MissingBuilder { kind: String },
        #[error("unresolved dependencies: {}", references.join(", "))]
        Unresolved { references: Vec<String> },
        #[error("upstream dependency '{upstream}' failed: {source_error}")]
        Upstream { upstream: NodeLabel, source_error: Box<NodeFailure> },
    }

    impl NodeFailure {
        /// The failure at the bottom of an upstream chain.
        pub fn root_cause(&self) -> &NodeFailure {
            match self {
                NodeFailure::Upstream { source_error, .. } => source_error.root_cause(),
                other => other,
            }
        }
    }
}

/// Failures of one market, keyed by configuration and node label. A node
/// appears at most once per configuration; the first failure recorded wins.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildErrorLedger {
    #[serde(serialize_with = "serialize_entries")]
    entries: BTreeMap<String, BTreeMap<NodeLabel, NodeFailure>>,
}

fn serialize_entries<S: serde::Serializer>(
    entries: &BTreeMap<String, BTreeMap<NodeLabel, NodeFailure>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let flat: BTreeMap<&String, BTreeMap<String, String>> = entries
        .iter()
        .map(|(config, failures)| {
            (config, failures.iter().map(|(l, f)| (l.to_string(), f.to_string())).collect())
        })
        .collect();
    serde::Serialize::serialize(&flat, serializer)
}

impl BuildErrorLedger {
    pub fn new() -> Self { Self::default() }

    /// Returns false if the node already had a failure recorded.
    pub fn record(&mut self, configuration: &str, node: NodeLabel, failure: NodeFailure) -> bool {
        let failures = self.entries.entry(configuration.to_string()).or_default();
        if failures.contains_key(&node) {
            return false;
        }
        failures.insert(node, failure);
        true
    }

    pub fn get(&self, configuration: &str, node: &NodeLabel) -> Option<&NodeFailure> {
        self.entries.get(configuration)?.get(node)
    }

    /// Human-readable view of one configuration: `Kind(name)` to message.
    pub fn snapshot(&self, configuration: &str) -> BTreeMap<String, String> {
        self.entries
            .get(configuration)
            .map(|failures| failures.iter().map(|(l, f)| (l.to_string(), f.to_string())).collect())
            .unwrap_or_default()
    }

    pub fn configurations(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().filter(|(_, f)| !f.is_empty()).map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MarketObject;

    fn label(name: &str) -> NodeLabel {
        NodeLabel::new(MarketObject::DefaultCurve, name)
    }

    #[test]
    fn test_first_failure_per_node_is_kept() {
        let mut ledger = BuildErrorLedger::new();
        assert!(ledger.record("default", label("CPTY_A"), NodeFailure::Build { reason: "no quotes".into() }));
        assert!(!ledger.record("default", label("CPTY_A"), NodeFailure::Build { reason: "other".into() }));
        assert!(ledger.record("stress", label("CPTY_A"), NodeFailure::Build { reason: "other".into() }));

        assert_eq!(ledger.len(), 2);
        assert_eq!(
            ledger.snapshot("default").get("DefaultCurve(CPTY_A)").map(String::as_str),
            Some("build failed: no quotes")
        );
        assert!(ledger.snapshot("unknown").is_empty());
    }

    #[test]
    fn test_upstream_failure_keeps_root_cause() {
        let root = NodeFailure::Build { reason: "calibration diverged".into() };
        let failure = NodeFailure::Upstream {
            upstream: NodeLabel::new(MarketObject::YieldCurve, "USD-OIS"),
            source_error: Box::new(root.clone()),
        };
        assert_eq!(failure.root_cause(), &root);
        assert!(failure.to_string().contains("YieldCurve(USD-OIS)"));
        assert!(failure.to_string().contains("calibration diverged"));
    }

    #[test]
    fn test_json_is_keyed_by_configuration_then_label() {
        let mut ledger = BuildErrorLedger::new();
        ledger.record("default", label("CPTY_A"), NodeFailure::Unresolved { references: vec!["Yield/USD1D".into()] });
        let json: serde_json::Value = serde_json::from_str(&ledger.to_json().unwrap()).unwrap();
        assert_eq!(
            json["entries"]["default"]["DefaultCurve(CPTY_A)"],
            "unresolved dependencies: Yield/USD1D"
        );
    }
}
