//! Errors surfaced by the market as a whole.

use crate::compute::NodeFailure;
use crate::graph::NodeLabel;
use crate::market::MarketObject;
use crate::spec::ParseError;
use thiserror::Error;

fn join_labels(labels: &[NodeLabel]) -> String {
    labels.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(", ")
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("configuration '{configuration}', node {node}: {source}")]
    Parse { configuration: String, node: NodeLabel, source: ParseError },
    #[error("configuration '{configuration}', node {node}: unresolved dependencies {}", references.join(", "))]
    UnresolvedDependency { configuration: String, node: NodeLabel, references: Vec<String> },
    #[error("configuration '{configuration}': cyclic dependency between {}", join_labels(cycle))]
    CyclicDependency { configuration: String, cycle: Vec<NodeLabel> },
    #[error("configuration '{configuration}', node {node}: {reason}")]
    Build { configuration: String, node: NodeLabel, reason: NodeFailure },
    #[error("{kind}({name}) is not declared in configuration '{configuration}'")]
    NotFound { kind: MarketObject, name: String, configuration: String },
    #[error("unknown configuration '{0}'")]
    UnknownConfiguration(String),
    #[error("configuration '{configuration}', node {node} has not been built")]
    NotBuilt { configuration: String, node: NodeLabel },
}

impl MarketError {
    /// The error a pass reports when `failure` at `node` ends it.
    pub fn from_failure(configuration: &str, node: NodeLabel, failure: NodeFailure) -> Self {
        let configuration = configuration.to_string();
        match failure {
            NodeFailure::Unresolved { references } => MarketError::UnresolvedDependency { configuration, node, references },
            reason => MarketError::Build { configuration, node, reason },
        }
    }

    /// The node the error is about, if it concerns a single node.
    pub fn node(&self) -> Option<&NodeLabel> {
        match self {
            MarketError::Parse { node, .. }
            | MarketError::UnresolvedDependency { node, .. }
            | MarketError::Build { node, .. }
            | MarketError::NotBuilt { node, .. } => Some(node),
            _ => None,
        }
    }
}

/// Failure to load a market setup file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("invalid setup: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_failure_becomes_unresolved_dependency() {
        let node = NodeLabel::new(MarketObject::DefaultCurve, "CPTY_A");
        let err = MarketError::from_failure(
            "default",
            node.clone(),
            NodeFailure::Unresolved { references: vec!["Yield/USD1D".into()] },
        );
        assert_eq!(
            err.to_string(),
            "configuration 'default', node DefaultCurve(CPTY_A): unresolved dependencies Yield/USD1D"
        );
        assert_eq!(err.node(), Some(&node));
    }

    #[test]
    fn test_cycle_message_names_members() {
        let err = MarketError::CyclicDependency {
            configuration: "default".into(),
            cycle: vec![NodeLabel::new(MarketObject::YieldCurve, "A"), NodeLabel::new(MarketObject::YieldCurve, "B")],
        };
        assert_eq!(err.to_string(), "configuration 'default': cyclic dependency between YieldCurve(A), YieldCurve(B)");
        assert!(err.node().is_none());
    }
}
