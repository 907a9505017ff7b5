//! Materializes the dependency graph of one configuration.

use super::dag::{DependencyGraph, NodeId};
use super::node::{Node, NodeLabel, Reference};
use crate::config::{ConfigurationSource, CurveConfigSource, DeclaredMapping};
use crate::error::MarketError;
use crate::market::MarketObject;
use crate::spec::SpecRegistry;
use serde::Serialize;
use tracing::{debug, debug_span};

pub struct GraphBuilder<'a> {
    parameters: &'a dyn ConfigurationSource,
    curve_configs: &'a dyn CurveConfigSource,
    specs: &'a mut SpecRegistry,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        parameters: &'a dyn ConfigurationSource,
        curve_configs: &'a dyn CurveConfigSource,
        specs: &'a mut SpecRegistry,
    ) -> Self {
        Self { parameters, curve_configs, specs }
    }

    /// Builds the graph for `configuration`.
    ///
    /// 1. Seed one node per declared mapping.
    /// 2. Resolve each node's references against the configuration, then
    ///    against the default configuration (pulling the matching
    ///    declaration in as a new node). Whatever is still unresolved is
    ///    recorded on the node, not raised here.
    /// 3. Reject the configuration if the edges contain a cycle.
    pub fn build(&mut self, configuration: &str) -> Result<DependencyGraph, MarketError> {
        let _span = debug_span!("dependency_graph", configuration).entered();

        if !self.parameters.has_configuration(configuration) {
            return Err(MarketError::UnknownConfiguration(configuration.to_string()));
        }

        let mut graph = DependencyGraph::new(configuration);
        for decl in self.parameters.mappings(configuration) {
            let node = self.make_node(configuration, &decl)?;
            graph.add_node(node);
        }

        let default_configuration = self.parameters.default_configuration().to_string();
        let fallback = if configuration == default_configuration {
            Vec::new()
        } else {
            self.parameters.mappings(&default_configuration)
        };

        // Fallback nodes are appended while iterating, so walk by index.
        let mut next = 0;
        while next < graph.node_count() {
            let id = NodeId::new(next);
            next += 1;

            for reference in self.references_of(graph.node(id)) {
                let required = match graph.resolve(&reference) {
                    Some(found) => Some(found),
                    None => self.pull_fallback(&mut graph, &fallback, &reference),
                };
                match required {
                    Some(required) => graph.add_dependency(required, id, reference),
                    None => {
                        debug!(node = %graph.label(id), %reference, "unresolved dependency");
                        graph.node_mut(id).unresolved.push(reference);
                    }
                }
            }
        }

        let cycles = graph.cycles();
        if let Some(cycle) = cycles.first() {
            return Err(MarketError::CyclicDependency {
                configuration: configuration.to_string(),
                cycle: cycle.iter().map(|&id| graph.label(id)).collect(),
            });
        }

        debug!(nodes = graph.node_count(), edges = graph.edge_count(), "dependency graph built");
        Ok(graph)
    }

    fn make_node(&mut self, configuration: &str, decl: &DeclaredMapping) -> Result<Node, MarketError> {
        let spec = match decl.kind.spec_type() {
            Some(_) => Some(self.specs.resolve(decl.kind, &decl.mapping).map_err(|source| {
                MarketError::Parse {
                    configuration: configuration.to_string(),
                    node: NodeLabel::new(decl.kind, decl.name.clone()),
                    source,
                }
            })?),
            None => None,
        };
        Ok(Node::new(decl.kind, &decl.name, &decl.mapping, spec))
    }

    /// The references a node needs satisfied before it can be built.
    fn references_of(&self, node: &Node) -> Vec<Reference> {
        match &node.spec {
            Some(spec) => self
                .curve_configs
                .required_curve_ids(spec)
                .into_iter()
                .map(Reference::Spec)
                .collect(),
            None => {
                // A swap index discounts on the index named by its mapping and
                // forwards on the index its conventions name.
                let mut refs = vec![Reference::Object {
                    kind: MarketObject::IndexCurve,
                    name: node.mapping.clone(),
                }];
                if let Some(fwd) = self.curve_configs.swap_index_forwarding_index(&node.name) {
                    if fwd != node.mapping {
                        refs.push(Reference::Object { kind: MarketObject::IndexCurve, name: fwd });
                    }
                }
                refs
            }
        }
    }

    /// Adds the default configuration's declaration that provides
    /// `reference`, if any. Declarations that fail to parse are skipped
    /// here; they are reported when the default configuration is built.
    fn pull_fallback(
        &mut self,
        graph: &mut DependencyGraph,
        fallback: &[DeclaredMapping],
        reference: &Reference,
    ) -> Option<NodeId> {
        for decl in fallback {
            if graph.find(decl.kind, &decl.name).is_some() {
                continue;
            }
            let Ok(node) = self.make_node(graph.configuration(), decl) else {
                continue;
            };
            if node.provides(reference) {
                debug!(node = %node.label(), %reference, "resolved from default configuration");
                return Some(graph.add_node(node));
            }
        }
        None
    }
}

/// One line of a build plan, as reported to callers outside the crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub kind: MarketObject,
    pub name: String,
    pub mapping: String,
    /// Canonical spec name; `None` for swap indices.
    pub spec: Option<String>,
}

impl From<&Node> for PlanStep {
    fn from(node: &Node) -> Self {
        Self {
            kind: node.kind,
            name: node.name.clone(),
            mapping: node.mapping.clone(),
            spec: node.spec.as_ref().map(|s| s.name()),
        }
    }
}

/// Topological build order of `configuration`, without building anything.
pub fn plan(
    parameters: &dyn ConfigurationSource,
    curve_configs: &dyn CurveConfigSource,
    configuration: &str,
) -> Result<Vec<Node>, MarketError> {
    let mut specs = SpecRegistry::new();
    let graph = GraphBuilder::new(parameters, curve_configs, &mut specs).build(configuration)?;
    let order = graph.topological_order().map_err(|cycles| MarketError::CyclicDependency {
        configuration: configuration.to_string(),
        cycle: cycles.first().map(|c| c.iter().map(|&id| graph.label(id)).collect()).unwrap_or_default(),
    })?;
    Ok(order.into_iter().map(|id| graph.node(id).clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CurveConfigs, MarketParameters, DEFAULT_CONFIGURATION};
    use crate::spec::{CurveSpecRef, CurveSpecType};

    fn yield_ref(id: &str) -> CurveSpecRef {
        CurveSpecRef::new(CurveSpecType::Yield, id)
    }

    fn build(p: &MarketParameters, cc: &CurveConfigs, configuration: &str) -> Result<DependencyGraph, MarketError> {
        let mut specs = SpecRegistry::new();
        GraphBuilder::new(p, cc, &mut specs).build(configuration)
    }

    #[test]
    fn test_chain_edges_follow_requirements() {
        let mut p = MarketParameters::new();
        p.insert_mapping(DEFAULT_CONFIGURATION, MarketObject::YieldCurve, "A", "Yield/EUR/A")
            .insert_mapping(DEFAULT_CONFIGURATION, MarketObject::YieldCurve, "B", "Yield/EUR/B")
            .insert_mapping(DEFAULT_CONFIGURATION, MarketObject::YieldCurve, "C", "Yield/EUR/C");
        let mut cc = CurveConfigs::new();
        cc.require(yield_ref("A"), yield_ref("B")).require(yield_ref("B"), yield_ref("C"));

        let g = build(&p, &cc, DEFAULT_CONFIGURATION).unwrap();
        let order: Vec<String> =
            g.topological_order().unwrap().into_iter().map(|id| g.node(id).name.clone()).collect();
        assert_eq!(order, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_cycle_is_rejected_with_members() {
        let mut p = MarketParameters::new();
        p.insert_mapping(DEFAULT_CONFIGURATION, MarketObject::YieldCurve, "A", "Yield/EUR/A")
            .insert_mapping(DEFAULT_CONFIGURATION, MarketObject::YieldCurve, "B", "Yield/EUR/B");
        let mut cc = CurveConfigs::new();
        cc.require(yield_ref("A"), yield_ref("B")).require(yield_ref("B"), yield_ref("A"));

        match build(&p, &cc, DEFAULT_CONFIGURATION) {
            Err(MarketError::CyclicDependency { cycle, .. }) => {
                assert_eq!(
                    cycle,
                    vec![NodeLabel::new(MarketObject::YieldCurve, "A"), NodeLabel::new(MarketObject::YieldCurve, "B")]
                );
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_aborts_configuration() {
        let mut p = MarketParameters::new();
        p.insert_mapping(DEFAULT_CONFIGURATION, MarketObject::DefaultCurve, "CPTY_A", "Default/usd/CPTY_A");
        let err = build(&p, &CurveConfigs::new(), DEFAULT_CONFIGURATION).unwrap_err();
        assert!(matches!(err, MarketError::Parse { .. }));
        assert!(err.to_string().contains("DefaultCurve(CPTY_A)"));
    }

    #[test]
    fn test_unresolved_reference_is_recorded_on_node() {
        let mut p = MarketParameters::new();
        p.insert_mapping(DEFAULT_CONFIGURATION, MarketObject::DefaultCurve, "CPTY_A", "Default/USD/CPTY_A");
        let mut cc = CurveConfigs::new();
        cc.require(CurveSpecRef::new(CurveSpecType::Default, "CPTY_A"), yield_ref("USD1D"));

        let g = build(&p, &cc, DEFAULT_CONFIGURATION).unwrap();
        let id = g.find(MarketObject::DefaultCurve, "CPTY_A").unwrap();
        assert_eq!(g.node(id).unresolved.as_slice(), &[Reference::Spec(yield_ref("USD1D"))]);
    }

    #[test]
    fn test_reference_falls_back_to_default_configuration() {
        let mut p = MarketParameters::new();
        p.insert_mapping(DEFAULT_CONFIGURATION, MarketObject::YieldCurve, "USD-OIS", "Yield/USD/USD1D")
            .insert_mapping("stress", MarketObject::DefaultCurve, "CPTY_A", "Default/USD/CPTY_A")
            .set_mapping_id("stress", MarketObject::YieldCurve, "unused");
        let mut cc = CurveConfigs::new();
        cc.require(CurveSpecRef::new(CurveSpecType::Default, "CPTY_A"), yield_ref("USD1D"));

        let g = build(&p, &cc, "stress").unwrap();
        assert_eq!(g.node_count(), 2);
        let cpty = g.find(MarketObject::DefaultCurve, "CPTY_A").unwrap();
        let ois = g.find(MarketObject::YieldCurve, "USD-OIS").expect("pulled from default");
        assert!(g.node(cpty).unresolved.is_empty());
        assert_eq!(g.parents(cpty).iter().map(|(p, _)| *p).collect::<Vec<_>>(), vec![ois]);
    }

    #[test]
    fn test_swap_index_depends_on_discount_and_forwarding_index() {
        let mut p = MarketParameters::new();
        p.insert_mapping(DEFAULT_CONFIGURATION, MarketObject::IndexCurve, "EUR-EONIA", "Yield/EUR/EUR1D")
            .insert_mapping(DEFAULT_CONFIGURATION, MarketObject::IndexCurve, "EUR-EURIBOR-6M", "Yield/EUR/EUR6M")
            .insert_mapping(DEFAULT_CONFIGURATION, MarketObject::SwapIndexCurve, "EUR-CMS-30Y", "EUR-EONIA");
        let mut cc = CurveConfigs::new();
        cc.set_swap_index_forwarding("EUR-CMS-30Y", "EUR-EURIBOR-6M");

        let g = build(&p, &cc, DEFAULT_CONFIGURATION).unwrap();
        let swap = g.find(MarketObject::SwapIndexCurve, "EUR-CMS-30Y").unwrap();
        assert!(g.node(swap).spec.is_none());
        assert_eq!(g.parents(swap).len(), 2);
    }

    #[test]
    fn test_unknown_configuration() {
        let p = MarketParameters::new();
        assert_eq!(
            build(&p, &CurveConfigs::new(), "nope").unwrap_err(),
            MarketError::UnknownConfiguration("nope".into())
        );
    }

    #[test]
    fn test_plan_returns_nodes_in_build_order() {
        let mut p = MarketParameters::new();
        p.insert_mapping(DEFAULT_CONFIGURATION, MarketObject::DefaultCurve, "CPTY_A", "Default/USD/CPTY_A")
            .insert_mapping(DEFAULT_CONFIGURATION, MarketObject::DiscountCurve, "USD", "Yield/USD/USD1D");
        let mut cc = CurveConfigs::new();
        cc.require(CurveSpecRef::new(CurveSpecType::Default, "CPTY_A"), yield_ref("USD1D"));

        let nodes = plan(&p, &cc, DEFAULT_CONFIGURATION).unwrap();
        let labels: Vec<String> = nodes.iter().map(|n| n.label().to_string()).collect();
        assert_eq!(labels, vec!["DiscountCurve(USD)", "DefaultCurve(CPTY_A)"]);

        let step = PlanStep::from(&nodes[1]);
        assert_eq!(step.spec.as_deref(), Some("Default/USD/CPTY_A"));
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["kind"], "DefaultCurve");
    }
}
