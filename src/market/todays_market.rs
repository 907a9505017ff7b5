//! The market for one valuation date: owns the dependency graphs, the
//! object cache and the error ledger, and answers object queries.

use super::MarketObject;
use crate::compute::{
    BuildContext, BuildErrorLedger, BuildState, BuilderRegistry, CalibrationInfo, ExecutionPolicy, GraphExecutor,
    MarketHandle, ObjectKey,
};
use crate::config::{BuildParameters, ConfigurationSource, CurveConfigSource};
use crate::data::{FixingHistory, FxTriangulation, Loader, ReferenceDataProvider};
use crate::error::MarketError;
use crate::graph::{DependencyGraph, GraphBuilder, Node, NodeId, NodeStatus};
use crate::spec::SpecRegistry;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, info_span};

/// Read access to built market objects.
///
/// Implementors only provide `require_object`; the typed accessors are
/// shorthands for the common kinds.
pub trait Market {
    fn require_object(&self, kind: MarketObject, name: &str, configuration: &str) -> Result<MarketHandle, MarketError>;

    fn discount_curve(&self, ccy: &str, configuration: &str) -> Result<MarketHandle, MarketError> {
        self.require_object(MarketObject::DiscountCurve, ccy, configuration)
    }

    fn yield_curve(&self, name: &str, configuration: &str) -> Result<MarketHandle, MarketError> {
        self.require_object(MarketObject::YieldCurve, name, configuration)
    }

    fn index_curve(&self, index: &str, configuration: &str) -> Result<MarketHandle, MarketError> {
        self.require_object(MarketObject::IndexCurve, index, configuration)
    }

    fn swap_index(&self, index: &str, configuration: &str) -> Result<MarketHandle, MarketError> {
        self.require_object(MarketObject::SwapIndexCurve, index, configuration)
    }

    fn fx_spot(&self, pair: &str, configuration: &str) -> Result<MarketHandle, MarketError> {
        self.require_object(MarketObject::FXSpot, pair, configuration)
    }

    fn default_curve(&self, name: &str, configuration: &str) -> Result<MarketHandle, MarketError> {
        self.require_object(MarketObject::DefaultCurve, name, configuration)
    }

    fn equity_curve(&self, name: &str, configuration: &str) -> Result<MarketHandle, MarketError> {
        self.require_object(MarketObject::EquityCurve, name, configuration)
    }

    fn equity_vol(&self, name: &str, configuration: &str) -> Result<MarketHandle, MarketError> {
        self.require_object(MarketObject::EquityVol, name, configuration)
    }
}

type GraphSlot = Result<DependencyGraph, MarketError>;

#[derive(Default)]
struct MarketState {
    specs: SpecRegistry,
    /// Built at most once per configuration; a failed build is kept so it
    /// is reported again rather than retried.
    graphs: BTreeMap<String, GraphSlot>,
    build: BuildState,
}

pub struct TodaysMarket {
    asof: NaiveDate,
    parameters: Arc<dyn ConfigurationSource>,
    curve_configs: Arc<dyn CurveConfigSource>,
    loader: Arc<dyn Loader>,
    reference_data: Option<Arc<dyn ReferenceDataProvider>>,
    builders: BuilderRegistry,
    build_parameters: BuildParameters,
    fx: FxTriangulation,
    fixings: FixingHistory,
    dividends: FixingHistory,
    state: Mutex<MarketState>,
}

/// Collects the optional parts of a `TodaysMarket` before building it.
pub struct TodaysMarketBuilder {
    asof: NaiveDate,
    parameters: Arc<dyn ConfigurationSource>,
    curve_configs: Arc<dyn CurveConfigSource>,
    loader: Arc<dyn Loader>,
    builders: BuilderRegistry,
    build_parameters: BuildParameters,
    reference_data: Option<Arc<dyn ReferenceDataProvider>>,
    injected: Vec<(ObjectKey, MarketHandle)>,
}

impl TodaysMarketBuilder {
    pub fn build_parameters(mut self, build_parameters: BuildParameters) -> Self {
        self.build_parameters = build_parameters;
        self
    }

    pub fn with_reference_data(mut self, provider: Arc<dyn ReferenceDataProvider>) -> Self {
        self.reference_data = Some(provider);
        self
    }

    /// Seeds the cache with an object built elsewhere. Nodes resolving to
    /// `key` use it instead of calling a builder.
    pub fn with_injected(mut self, key: ObjectKey, object: MarketHandle) -> Self {
        self.injected.push((key, object));
        self
    }

    /// Creates the market. Unless lazy build is on, every configuration's
    /// graph is built first and then every object, so a malformed
    /// configuration or (with continue-on-error off) any failing object
    /// fails construction.
    pub fn build(self) -> Result<TodaysMarket, MarketError> {
        let mut state = MarketState::default();
        for (key, object) in self.injected {
            state.build.cache.insert(key, object);
        }

        let quotes = self.loader.load_quotes(self.asof);
        let fx = FxTriangulation::from_quotes(&quotes, self.build_parameters.quote_linkage());
        let (fixings, dividends) = if self.build_parameters.load_fixings {
            (
                FixingHistory::from_fixings(self.loader.load_fixings()),
                FixingHistory::from_fixings(self.loader.load_dividends()),
            )
        } else {
            (FixingHistory::new(), FixingHistory::new())
        };
        debug!(
            currencies = fx.currencies().len(),
            fixings = fixings.len(),
            dividends = dividends.len(),
            "market data loaded"
        );

        let market = TodaysMarket {
            asof: self.asof,
            parameters: self.parameters,
            curve_configs: self.curve_configs,
            loader: self.loader,
            reference_data: self.reference_data,
            builders: self.builders,
            build_parameters: self.build_parameters,
            fx,
            fixings,
            dividends,
            state: Mutex::new(state),
        };

        if !market.build_parameters.lazy_build {
            market.initialise()?;
        }
        Ok(market)
    }
}

impl TodaysMarket {
    pub fn builder(
        asof: NaiveDate,
        parameters: Arc<dyn ConfigurationSource>,
        curve_configs: Arc<dyn CurveConfigSource>,
        loader: Arc<dyn Loader>,
        builders: BuilderRegistry,
    ) -> TodaysMarketBuilder {
        TodaysMarketBuilder {
            asof,
            parameters,
            curve_configs,
            loader,
            builders,
            build_parameters: BuildParameters::default(),
            reference_data: None,
            injected: Vec::new(),
        }
    }

    pub fn new(
        asof: NaiveDate,
        parameters: Arc<dyn ConfigurationSource>,
        curve_configs: Arc<dyn CurveConfigSource>,
        loader: Arc<dyn Loader>,
        builders: BuilderRegistry,
        build_parameters: BuildParameters,
    ) -> Result<Self, MarketError> {
        Self::builder(asof, parameters, curve_configs, loader, builders).build_parameters(build_parameters).build()
    }

    pub fn asof(&self) -> NaiveDate { self.asof }

    pub fn build_parameters(&self) -> BuildParameters { self.build_parameters }

    /// Cross rates from the valuation date's FX spot quotes.
    pub fn fx_triangulation(&self) -> &FxTriangulation { &self.fx }

    pub fn fixings(&self) -> &FixingHistory { &self.fixings }

    pub fn dividends(&self) -> &FixingHistory { &self.dividends }

    fn initialise(&self) -> Result<(), MarketError> {
        let _span = info_span!("todays_market", asof = %self.asof).entered();
        let configurations = self.parameters.configurations();

        let mut guard = self.state.lock();
        let MarketState { specs, graphs, build } = &mut *guard;

        for configuration in &configurations {
            self.graph(specs, graphs, configuration)?;
        }

        let executor = self.executor();
        for configuration in &configurations {
            let graph = self.graph(specs, graphs, configuration)?;
            executor.execute(graph, ExecutionPolicy::Eager, build)?;
        }

        info!(
            configurations = configurations.len(),
            objects = build.cache.len(),
            failures = build.ledger.len(),
            "market built"
        );
        Ok(())
    }

    fn executor(&self) -> GraphExecutor<'_> {
        let context = BuildContext {
            asof: self.asof,
            loader: self.loader.as_ref(),
            reference_data: self.reference_data.as_deref(),
            quote_linkage: self.build_parameters.quote_linkage(),
            fx: &self.fx,
            fixings: &self.fixings,
            dividends: &self.dividends,
        };
        GraphExecutor::new(&self.builders, context, self.build_parameters.continue_on_error)
            .parallel(self.build_parameters.parallel)
    }

    /// The graph of `configuration`, built on first use.
    fn graph<'s>(
        &self,
        specs: &mut SpecRegistry,
        graphs: &'s mut BTreeMap<String, GraphSlot>,
        configuration: &str,
    ) -> Result<&'s mut DependencyGraph, MarketError> {
        let slot = graphs.entry(configuration.to_string()).or_insert_with(|| {
            GraphBuilder::new(self.parameters.as_ref(), self.curve_configs.as_ref(), specs).build(configuration)
        });
        match slot {
            Ok(graph) => Ok(graph),
            Err(e) => Err(e.clone()),
        }
    }

    /// The configuration whose graph declares `kind(name)`: the requested
    /// one if it does, otherwise the default configuration.
    fn locate(
        &self,
        specs: &mut SpecRegistry,
        graphs: &mut BTreeMap<String, GraphSlot>,
        kind: MarketObject,
        name: &str,
        configuration: &str,
    ) -> Result<Option<(String, NodeId)>, MarketError> {
        let default = self.parameters.default_configuration().to_string();
        let mut candidates = vec![configuration.to_string()];
        if configuration != default {
            candidates.push(default);
        }
        for candidate in candidates {
            if !self.parameters.has_configuration(&candidate) {
                continue;
            }
            let graph = self.graph(specs, graphs, &candidate)?;
            if let Some(id) = graph.find(kind, name) {
                return Ok(Some((candidate, id)));
            }
        }
        Ok(None)
    }

    /// Failures recorded so far for `configuration`, keyed by `Kind(name)`.
    pub fn build_errors(&self, configuration: &str) -> BTreeMap<String, String> {
        self.state.lock().build.ledger.snapshot(configuration)
    }

    pub fn build_error_ledger(&self) -> BuildErrorLedger {
        self.state.lock().build.ledger.clone()
    }

    pub fn calibration_info(&self) -> CalibrationInfo {
        self.state.lock().build.calibration.clone()
    }

    /// Nodes of `configuration` in the order they are (or would be) built,
    /// with their current status.
    pub fn build_plan(&self, configuration: &str) -> Result<Vec<Node>, MarketError> {
        let mut guard = self.state.lock();
        let MarketState { specs, graphs, .. } = &mut *guard;
        let graph = self.graph(specs, graphs, configuration)?;
        let order = graph.topological_order().map_err(|cycles| MarketError::CyclicDependency {
            configuration: configuration.to_string(),
            cycle: cycles.first().map(|c| c.iter().map(|&id| graph.label(id)).collect()).unwrap_or_default(),
        })?;
        Ok(order.into_iter().map(|id| graph.node(id).clone()).collect())
    }

    pub fn node_status(&self, kind: MarketObject, name: &str, configuration: &str) -> Option<NodeStatus> {
        let mut guard = self.state.lock();
        let MarketState { specs, graphs, .. } = &mut *guard;
        let (found, id) = self.locate(specs, graphs, kind, name, configuration).ok()??;
        let graph = self.graph(specs, graphs, &found).ok()?;
        Some(graph.node(id).status)
    }

    /// Number of distinct objects built (or injected) so far.
    pub fn cached_object_count(&self) -> usize {
        self.state.lock().build.cache.len()
    }
}

impl Market for TodaysMarket {
    /// Returns the object, building it and its dependencies first in lazy
    /// mode. The lock is held for the whole build, so concurrent queries for
    /// overlapping objects wait rather than build twice.
    ///
    /// A failed object always reports its own ledger entry, so asking again
    /// gives the same answer and records nothing new.
    fn require_object(&self, kind: MarketObject, name: &str, configuration: &str) -> Result<MarketHandle, MarketError> {
        let mut guard = self.state.lock();
        let MarketState { specs, graphs, build } = &mut *guard;

        let (found, id) = self
            .locate(specs, graphs, kind, name, configuration)?
            .ok_or_else(|| MarketError::NotFound {
                kind,
                name: name.to_string(),
                configuration: configuration.to_string(),
            })?;
        let graph = self.graph(specs, graphs, &found)?;

        if graph.node(id).status == NodeStatus::Pending && self.build_parameters.lazy_build {
            debug!(node = %graph.label(id), configuration = %found, "building on demand");
            if let Err(e) = self.executor().execute(graph, ExecutionPolicy::Lazy { target: id }, build) {
                if graph.node(id).status != NodeStatus::Failed {
                    return Err(e);
                }
            }
        }

        let node = graph.node(id);
        let label = node.label();
        match node.status {
            NodeStatus::Built => build
                .cache
                .get(&node.object_key(&found))
                .cloned()
                .ok_or(MarketError::NotBuilt { configuration: found, node: label }),
            NodeStatus::Failed => match build.ledger.get(&found, &label) {
                Some(failure) => Err(MarketError::from_failure(&found, label, failure.clone())),
                None => Err(MarketError::NotBuilt { configuration: found, node: label }),
            },
            NodeStatus::Pending => Err(MarketError::NotBuilt { configuration: found, node: label }),
        }
    }
}
