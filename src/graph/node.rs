//! Defines the `Node` and its associated types, representing one market
//! object to build within a configuration's dependency graph.

use crate::compute::{BuilderKind, ObjectKey};
use crate::market::MarketObject;
use crate::spec::{CurveSpec, CurveSpecRef};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Build state of a node. `Built` and `Failed` are terminal within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Pending,
    Built,
    Failed,
}

/// Kind and name of a node, e.g. `DiscountCurve(EUR)`. Unique within a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeLabel {
    pub kind: MarketObject,
    pub name: String,
}

impl NodeLabel {
    pub fn new(kind: MarketObject, name: impl Into<String>) -> Self {
        Self { kind, name: name.into() }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.name)
    }
}

/// What a node needs from another node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reference {
    /// Any node building the spec with this type and curve config id.
    Spec(CurveSpecRef),
    /// The node with exactly this kind and name.
    Object { kind: MarketObject, name: String },
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Spec(r) => write!(f, "{}", r),
            Reference::Object { kind, name } => write!(f, "{}({})", kind, name),
        }
    }
}

/// A vertex of the dependency graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: MarketObject,
    /// Left-hand side of the configuration mapping.
    pub name: String,
    /// Right-hand side of the configuration mapping.
    pub mapping: String,
    /// Parsed mapping; `None` for kinds whose mapping is not a curve spec.
    pub spec: Option<CurveSpec>,
    pub status: NodeStatus,
    /// References that matched no node in the configuration or its fallback.
    pub unresolved: SmallVec<[Reference; 2]>,
}

impl Node {
    pub fn new(kind: MarketObject, name: &str, mapping: &str, spec: Option<CurveSpec>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            mapping: mapping.trim().to_string(),
            spec,
            status: NodeStatus::Pending,
            unresolved: SmallVec::new(),
        }
    }

    pub fn label(&self) -> NodeLabel {
        NodeLabel::new(self.kind, self.name.clone())
    }

    pub fn builder_kind(&self) -> BuilderKind {
        match &self.spec {
            Some(spec) => BuilderKind::Curve(spec.spec_type()),
            None => BuilderKind::SwapIndex,
        }
    }

    /// Cache key of the object this node produces. Spec-based objects are
    /// shared by every node (in any configuration) with the same spec;
    /// configuration-scoped kinds get one object per configuration.
    pub fn object_key(&self, configuration: &str) -> ObjectKey {
        match &self.spec {
            Some(spec) if !self.kind.is_configuration_scoped() => ObjectKey::shared(self.builder_kind(), spec.name()),
            _ => ObjectKey::scoped(self.builder_kind(), &self.name, configuration),
        }
    }

    pub fn provides(&self, reference: &Reference) -> bool {
        match reference {
            Reference::Spec(r) => self.spec.as_ref().map_or(false, |s| r.matches(s)),
            Reference::Object { kind, name } => self.kind == *kind && self.name == *name,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} [{:?}]", self.label(), self.mapping, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{parse_curve_spec, CurveSpecType};

    #[test]
    fn test_yield_nodes_share_object_key_across_kinds_and_configurations() {
        let spec = parse_curve_spec("Yield/EUR/EUR1D").unwrap();
        let discount = Node::new(MarketObject::DiscountCurve, "EUR", "Yield/EUR/EUR1D", Some(spec.clone()));
        let index = Node::new(MarketObject::IndexCurve, "EUR-EONIA", "Yield/EUR/EUR1D", Some(spec));
        assert_eq!(discount.object_key("default"), index.object_key("collateral"));
        assert_eq!(discount.builder_kind(), BuilderKind::Curve(CurveSpecType::Yield));
    }

    #[test]
    fn test_swap_index_key_is_configuration_scoped() {
        let node = Node::new(MarketObject::SwapIndexCurve, "EUR-CMS-30Y", "EUR-EONIA", None);
        assert_ne!(node.object_key("default"), node.object_key("collateral"));
        assert_eq!(node.builder_kind(), BuilderKind::SwapIndex);
        assert_eq!(node.to_string(), "SwapIndexCurve(EUR-CMS-30Y) = EUR-EONIA [Pending]");
    }

    #[test]
    fn test_provides() {
        let spec = parse_curve_spec("Yield/USD/USD1D").unwrap();
        let node = Node::new(MarketObject::DiscountCurve, "USD", "Yield/USD/USD1D", Some(spec));
        assert!(node.provides(&Reference::Spec(CurveSpecRef::new(CurveSpecType::Yield, "USD1D"))));
        assert!(node.provides(&Reference::Object { kind: MarketObject::DiscountCurve, name: "USD".into() }));
        assert!(!node.provides(&Reference::Object { kind: MarketObject::IndexCurve, name: "USD".into() }));
    }
}
