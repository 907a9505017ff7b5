//! Walks a dependency graph in topological order and builds each node
//! through its registered builder.

use super::builder::{BuildContext, BuildError, BuildOutput, BuildRequest, BuilderRegistry, MarketHandle, ResolvedInputs};
use super::cache::{ObjectCache, ObjectKey};
use super::calibration::CalibrationInfo;
use super::ledger::{BuildErrorLedger, NodeFailure};
use crate::error::MarketError;
use crate::graph::{DependencyGraph, NodeId, NodeStatus};
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, info_span, warn};

/// Which nodes a pass visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// Every node of the graph.
    Eager,
    /// The target and its transitive dependencies only.
    Lazy { target: NodeId },
}

/// Mutable state shared by every pass over one market.
#[derive(Debug, Clone, Default)]
pub struct BuildState {
    pub cache: ObjectCache,
    pub ledger: BuildErrorLedger,
    pub calibration: CalibrationInfo,
}

impl BuildState {
    pub fn new() -> Self { Self::default() }
}

/// Counts of what one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Objects constructed by a builder during this pass.
    pub built: usize,
    /// Nodes satisfied by an object already in the cache.
    pub cached: usize,
    pub failed: usize,
}

/// A node ready to be handed to its builder.
struct Job {
    node: NodeId,
    key: ObjectKey,
    inputs: ResolvedInputs,
}

/// Result of one node, waiting to be written back.
enum Outcome {
    Built { key: ObjectKey, output: BuildOutput },
    Cached { key: ObjectKey },
    Failed { failure: NodeFailure, memoise: Option<ObjectKey> },
}

enum Prepared {
    Job(Job),
    Done(Outcome),
}

pub struct GraphExecutor<'a> {
    builders: &'a BuilderRegistry,
    context: BuildContext<'a>,
    continue_on_error: bool,
    parallel: bool,
}

impl<'a> GraphExecutor<'a> {
    pub fn new(builders: &'a BuilderRegistry, context: BuildContext<'a>, continue_on_error: bool) -> Self {
        Self { builders, context, continue_on_error, parallel: false }
    }

    /// Builds independent nodes of one level concurrently.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Runs one build pass. Nodes already `Built` or `Failed` are left as
    /// they are, so repeated lazy passes over overlapping subgraphs only do
    /// the new work.
    ///
    /// With continue-on-error off, the first failure ends the pass and is
    /// returned as the error; everything committed before it stays cached.
    pub fn execute(
        &self,
        graph: &mut DependencyGraph,
        policy: ExecutionPolicy,
        state: &mut BuildState,
    ) -> Result<PassSummary, MarketError> {
        let configuration = graph.configuration().to_string();
        let _span = info_span!("build_pass", configuration = %configuration, ?policy).entered();

        let order = match policy {
            ExecutionPolicy::Eager => graph
                .topological_order()
                .map_err(|cycles| cycle_error(graph, cycles.into_iter().next().unwrap_or_default()))?,
            ExecutionPolicy::Lazy { target } => {
                graph.upstream_order(target).map_err(|cycle| cycle_error(graph, cycle))?
            }
        };
        let order: Vec<NodeId> =
            order.into_iter().filter(|&id| graph.node(id).status == NodeStatus::Pending).collect();

        let mut summary = PassSummary::default();
        if let Err(e) = self.run(graph, &order, state, &mut summary) {
            if let ExecutionPolicy::Lazy { .. } = policy {
                self.settle_downstream(graph, &order, state);
            }
            return Err(e);
        }

        info!(built = summary.built, cached = summary.cached, failed = summary.failed, "build pass finished");
        Ok(summary)
    }

    fn run(
        &self,
        graph: &mut DependencyGraph,
        order: &[NodeId],
        state: &mut BuildState,
        summary: &mut PassSummary,
    ) -> Result<(), MarketError> {
        if self.parallel {
            for level in graph.levels(order) {
                self.execute_level(graph, &level, state, summary)?;
            }
            return Ok(());
        }
        for &id in order {
            let outcome = match self.prepare(graph, id, state) {
                Prepared::Done(outcome) => outcome,
                Prepared::Job(job) => self.run_job(graph, job),
            };
            self.commit(graph, id, outcome, state, summary)?;
        }
        Ok(())
    }

    /// One topological level: builders run concurrently, commits happen in
    /// order. A node whose object another node of the level is already
    /// building waits and picks the result up from the cache.
    fn execute_level(
        &self,
        graph: &mut DependencyGraph,
        level: &[NodeId],
        state: &mut BuildState,
        summary: &mut PassSummary,
    ) -> Result<(), MarketError> {
        enum Slot {
            Ready(Outcome),
            Job(usize),
            Deferred,
        }

        let mut slots = Vec::with_capacity(level.len());
        let mut jobs = Vec::new();
        let mut claimed = HashSet::new();
        for &id in level {
            let slot = match self.prepare(graph, id, state) {
                Prepared::Done(outcome) => Slot::Ready(outcome),
                Prepared::Job(job) if claimed.insert(job.key.clone()) => {
                    jobs.push(job);
                    Slot::Job(jobs.len() - 1)
                }
                Prepared::Job(_) => Slot::Deferred,
            };
            slots.push(slot);
        }

        let shared: &DependencyGraph = graph;
        let mut results: Vec<Option<Outcome>> =
            jobs.into_par_iter().map(|job| Some(self.run_job(shared, job))).collect();

        for (&id, slot) in level.iter().zip(slots) {
            let outcome = match slot {
                Slot::Ready(outcome) => outcome,
                Slot::Job(index) => match results[index].take() {
                    Some(outcome) => outcome,
                    None => continue,
                },
                Slot::Deferred => match self.prepare(graph, id, state) {
                    Prepared::Done(outcome) => outcome,
                    Prepared::Job(job) => self.run_job(graph, job),
                },
            };
            self.commit(graph, id, outcome, state, summary)?;
        }
        Ok(())
    }

    /// Decides a node's outcome without calling a builder where possible.
    /// An object already in the cache wins over anything upstream.
    fn prepare(&self, graph: &DependencyGraph, id: NodeId, state: &BuildState) -> Prepared {
        let node = graph.node(id);
        let key = node.object_key(graph.configuration());
        if state.cache.contains(&key) {
            return Prepared::Done(Outcome::Cached { key });
        }

        if !node.unresolved.is_empty() {
            let references = node.unresolved.iter().map(|r| r.to_string()).collect();
            return Prepared::Done(Outcome::Failed { failure: NodeFailure::Unresolved { references }, memoise: None });
        }

        let mut inputs = ResolvedInputs::new();
        for (parent, reference) in graph.parents(id) {
            let parent_node = graph.node(parent);
            let cached = match parent_node.status {
                NodeStatus::Built => state.cache.get(&parent_node.object_key(graph.configuration())),
                _ => None,
            };
            match cached {
                Some(handle) => inputs.insert(reference.clone(), handle.clone()),
                None => {
                    let failure = upstream_failure(graph, parent, state);
                    return Prepared::Done(Outcome::Failed { failure, memoise: None });
                }
            }
        }

        if let Some(failure) = state.cache.failure(&key) {
            return Prepared::Done(Outcome::Failed { failure: failure.clone(), memoise: None });
        }
        if !self.builders.contains(node.builder_kind()) {
            let failure = NodeFailure::MissingBuilder { kind: node.builder_kind().to_string() };
            return Prepared::Done(Outcome::Failed { failure, memoise: Some(key) });
        }

        Prepared::Job(Job { node: id, key, inputs })
    }

    /// After a lazy pass aborts, fails every pending node of the closure
    /// that sits downstream of a failure, so the next query over the same
    /// closure finds the outcome already settled.
    fn settle_downstream(&self, graph: &mut DependencyGraph, order: &[NodeId], state: &mut BuildState) {
        for &id in order {
            let node = graph.node(id);
            if node.status != NodeStatus::Pending || state.cache.contains(&node.object_key(graph.configuration())) {
                continue;
            }
            let failed_parent = graph
                .parents(id)
                .into_iter()
                .map(|(parent, _)| parent)
                .find(|&parent| graph.node(parent).status == NodeStatus::Failed);
            if let Some(parent) = failed_parent {
                let failure = upstream_failure(graph, parent, state);
                let label = graph.label(id);
                debug!(node = %label, reason = %failure, "failed after abort");
                graph.node_mut(id).status = NodeStatus::Failed;
                state.ledger.record(graph.configuration(), label, failure);
            }
        }
    }

    fn run_job(&self, graph: &DependencyGraph, job: Job) -> Outcome {
        let node = graph.node(job.node);
        let request = BuildRequest {
            configuration: graph.configuration(),
            kind: node.kind,
            name: &node.name,
            mapping: &node.mapping,
            spec: node.spec.as_ref(),
        };
        let result = match self.builders.get(node.builder_kind()) {
            Some(builder) => builder.build(&request, &job.inputs, &self.context),
            None => Err(BuildError::new(format!("no builder registered for {}", node.builder_kind()))),
        };
        match result {
            Ok(output) => Outcome::Built { key: job.key, output },
            Err(e) => Outcome::Failed { failure: NodeFailure::Build { reason: e.reason }, memoise: Some(job.key) },
        }
    }

    /// Writes an outcome into the graph and the shared state.
    fn commit(
        &self,
        graph: &mut DependencyGraph,
        id: NodeId,
        outcome: Outcome,
        state: &mut BuildState,
        summary: &mut PassSummary,
    ) -> Result<(), MarketError> {
        let label = graph.label(id);
        match outcome {
            Outcome::Built { key, output } => {
                debug!(node = %label, object = %key, "built");
                if let Some(record) = output.calibration {
                    state.calibration.insert(key.qualified_name(), record);
                }
                state.cache.insert(key, output.object);
                graph.node_mut(id).status = NodeStatus::Built;
                summary.built += 1;
            }
            Outcome::Cached { key } => {
                debug!(node = %label, object = %key, "reused cached object");
                graph.node_mut(id).status = NodeStatus::Built;
                summary.cached += 1;
            }
            Outcome::Failed { failure, memoise } => {
                warn!(node = %label, reason = %failure, "build failed");
                if let Some(key) = memoise {
                    state.cache.record_failure(key, failure.clone());
                }
                graph.node_mut(id).status = NodeStatus::Failed;
                state.ledger.record(graph.configuration(), label.clone(), failure.clone());
                summary.failed += 1;
                if !self.continue_on_error {
                    return Err(MarketError::from_failure(graph.configuration(), label, failure));
                }
            }
        }
        Ok(())
    }
}

/// The failure a node inherits from `parent`, which did not build.
fn upstream_failure(graph: &DependencyGraph, parent: NodeId, state: &BuildState) -> NodeFailure {
    let upstream = graph.label(parent);
    let source_error = state
        .ledger
        .get(graph.configuration(), &upstream)
        .cloned()
        .unwrap_or_else(|| NodeFailure::Build { reason: "dependency was not built".to_string() });
    NodeFailure::Upstream { upstream, source_error: Box::new(source_error) }
}

fn cycle_error(graph: &DependencyGraph, cycle: Vec<NodeId>) -> MarketError {
    MarketError::CyclicDependency {
        configuration: graph.configuration().to_string(),
        cycle: cycle.into_iter().map(|id| graph.label(id)).collect(),
    }
}

/// The object a node produced, if the node is built.
pub fn built_object(graph: &DependencyGraph, id: NodeId, state: &BuildState) -> Option<MarketHandle> {
    let node = graph.node(id);
    if node.status != NodeStatus::Built {
        return None;
    }
    state.cache.get(&node.object_key(graph.configuration())).cloned()
}
