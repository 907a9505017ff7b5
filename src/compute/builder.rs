//! The builder capability: the narrow interface through which the engine
//! asks kind-specific code to construct one object.

use super::calibration::CalibrationRecord;
use crate::data::{DataError, FixingHistory, FxTriangulation, Loader, QuoteLinkage, ReferenceDataProvider, SimpleQuote};
use crate::graph::Reference;
use crate::market::MarketObject;
use crate::spec::{CurveSpec, CurveSpecRef, CurveSpecType};
use chrono::NaiveDate;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Which builder handles a node: one per curve-spec family, plus swap
/// indices, which have no spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuilderKind {
    Curve(CurveSpecType),
    SwapIndex,
}

impl fmt::Display for BuilderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderKind::Curve(t) => write!(f, "{}", t),
            BuilderKind::SwapIndex => f.write_str("SwapIndex"),
        }
    }
}

/// Shared handle to a finished, immutable market object.
#[derive(Clone)]
pub struct MarketHandle {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl MarketHandle {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self { inner: value, type_name: std::any::type_name::<T>() }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }

    pub fn type_name(&self) -> &'static str { self.type_name }

    /// True when both handles point at the same object.
    pub fn ptr_eq(&self, other: &MarketHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for MarketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarketHandle({})", self.type_name)
    }
}

/// A builder's failure on valid, fully-resolved inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct BuildError {
    pub reason: String,
}

impl BuildError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl From<DataError> for BuildError {
    fn from(e: DataError) -> Self {
        Self::new(e.to_string())
    }
}

/// What to build.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub configuration: &'a str,
    pub kind: MarketObject,
    pub name: &'a str,
    pub mapping: &'a str,
    pub spec: Option<&'a CurveSpec>,
}

/// The already-built objects a node depends on, keyed by the reference
/// each one satisfies.
#[derive(Debug, Clone, Default)]
pub struct ResolvedInputs {
    inputs: Vec<(Reference, MarketHandle)>,
}

impl ResolvedInputs {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, reference: Reference, handle: MarketHandle) {
        self.inputs.push((reference, handle));
    }

    pub fn get(&self, reference: &Reference) -> Option<&MarketHandle> {
        self.inputs.iter().find(|(r, _)| r == reference).map(|(_, h)| h)
    }

    pub fn curve(&self, spec_type: CurveSpecType, curve_config_id: &str) -> Option<&MarketHandle> {
        self.get(&Reference::Spec(CurveSpecRef::new(spec_type, curve_config_id)))
    }

    pub fn object(&self, kind: MarketObject, name: &str) -> Option<&MarketHandle> {
        self.get(&Reference::Object { kind, name: name.to_string() })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Reference, &MarketHandle)> {
        self.inputs.iter().map(|(r, h)| (r, h))
    }

    pub fn len(&self) -> usize { self.inputs.len() }

    pub fn is_empty(&self) -> bool { self.inputs.is_empty() }
}

/// Everything a builder may consult besides its inputs.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub asof: NaiveDate,
    pub loader: &'a dyn Loader,
    pub reference_data: Option<&'a dyn ReferenceDataProvider>,
    pub quote_linkage: QuoteLinkage,
    /// Built once per market from every FX spot quote of the valuation date.
    pub fx: &'a FxTriangulation,
    /// Empty unless the market loads fixings.
    pub fixings: &'a FixingHistory,
    pub dividends: &'a FixingHistory,
}

impl<'a> BuildContext<'a> {
    /// The quote for `name` on the valuation date, honouring the linkage
    /// policy: a private snapshot when frozen, the loader's quote when live.
    pub fn quote(&self, name: &str) -> Result<Arc<SimpleQuote>, BuildError> {
        let datum = self.loader.get(name, self.asof)?;
        Ok(match self.quote_linkage {
            QuoteLinkage::Live => datum.quote,
            QuoteLinkage::Frozen => Arc::new(SimpleQuote::new(datum.value())),
        })
    }

    pub fn quote_value(&self, name: &str) -> Result<f64, BuildError> {
        Ok(self.loader.get(name, self.asof)?.value())
    }

    /// Price of one `unit_ccy` in `ccy`, triangulated if not quoted directly.
    pub fn fx_rate(&self, unit_ccy: &str, ccy: &str) -> Result<f64, BuildError> {
        Ok(self.fx.rate(unit_ccy, ccy)?)
    }

    pub fn reference_data(&self) -> Result<&'a dyn ReferenceDataProvider, BuildError> {
        self.reference_data
            .ok_or_else(|| BuildError::new("reference data is required but no provider was supplied"))
    }
}

/// A successful build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub object: MarketHandle,
    pub calibration: Option<CalibrationRecord>,
}

impl BuildOutput {
    pub fn new(object: MarketHandle) -> Self {
        Self { object, calibration: None }
    }

    pub fn with_calibration(mut self, record: CalibrationRecord) -> Self {
        self.calibration = Some(record);
        self
    }
}

/// Constructs objects of one kind. The engine treats all kinds uniformly
/// through this trait.
pub trait ObjectBuilder: Send + Sync {
    fn build(
        &self,
        request: &BuildRequest<'_>,
        inputs: &ResolvedInputs,
        context: &BuildContext<'_>,
    ) -> Result<BuildOutput, BuildError>;
}

/// Maps each builder kind to the builder that handles it.
#[derive(Clone, Default)]
pub struct BuilderRegistry {
    builders: HashMap<BuilderKind, Arc<dyn ObjectBuilder>>,
}

impl BuilderRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn register(&mut self, kind: BuilderKind, builder: Arc<dyn ObjectBuilder>) -> &mut Self {
        self.builders.insert(kind, builder);
        self
    }

    /// Registers one builder for several kinds.
    pub fn register_many(
        &mut self,
        kinds: impl IntoIterator<Item = BuilderKind>,
        builder: Arc<dyn ObjectBuilder>,
    ) -> &mut Self {
        for kind in kinds {
            self.builders.insert(kind, builder.clone());
        }
        self
    }

    pub fn get(&self, kind: BuilderKind) -> Option<&dyn ObjectBuilder> {
        self.builders.get(&kind).map(|b| b.as_ref())
    }

    pub fn contains(&self, kind: BuilderKind) -> bool {
        self.builders.contains_key(&kind)
    }
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.builders.keys().collect();
        kinds.sort();
        f.debug_struct("BuilderRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryLoader;

    #[derive(Debug, PartialEq)]
    struct Spot(f64);

    #[test]
    fn test_handle_downcasts_to_concrete_type() {
        let h = MarketHandle::new(Spot(1.08));
        assert_eq!(h.downcast_ref::<Spot>(), Some(&Spot(1.08)));
        assert!(h.downcast_ref::<String>().is_none());
        assert!(h.ptr_eq(&h.clone()));
        assert!(format!("{:?}", h).contains("Spot"));
    }

    #[test]
    fn test_frozen_quotes_do_not_follow_loader() {
        let asof = NaiveDate::from_ymd_opt(2024, 3, 28).unwrap();
        let mut loader = InMemoryLoader::new();
        let live = loader.add("FX/RATE/EUR/USD", asof, 1.08);

        let fx = FxTriangulation::from_quotes(&loader.load_quotes(asof), QuoteLinkage::Frozen);
        let history = FixingHistory::new();
        let frozen_ctx = BuildContext {
            asof,
            loader: &loader,
            reference_data: None,
            quote_linkage: QuoteLinkage::Frozen,
            fx: &fx,
            fixings: &history,
            dividends: &history,
        };
        let live_ctx = BuildContext { quote_linkage: QuoteLinkage::Live, ..frozen_ctx };

        let frozen = frozen_ctx.quote("FX/RATE/EUR/USD").unwrap();
        let linked = live_ctx.quote("FX/RATE/EUR/USD").unwrap();
        live.set_value(1.10);

        assert_eq!(frozen.value(), 1.08);
        assert_eq!(linked.value(), 1.10);
        assert!(frozen_ctx.quote("missing").is_err());
        assert_eq!(frozen_ctx.fx_rate("USD", "EUR").unwrap(), 1.0 / 1.08);
        assert!(frozen_ctx.fx_rate("USD", "JPY").unwrap_err().reason.contains("USD to JPY"));
        assert!(frozen_ctx.reference_data().is_err());
    }
}
