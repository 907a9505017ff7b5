//! Today's market: builds the market objects of one valuation date from a
//! declarative composition, in dependency order, with a per-object cache
//! and a ledger of what failed and why.

pub mod compute;
pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod market;
pub mod spec;

#[cfg(feature = "python")]
pub mod bindings;

pub use compute::{
    BuildContext, BuildError, BuildErrorLedger, BuildOutput, BuildRequest, BuilderKind, BuilderRegistry,
    CalibrationInfo, CalibrationRecord, MarketHandle, NodeFailure, ObjectBuilder, ObjectKey, ResolvedInputs,
};
pub use config::{BuildParameters, CurveConfigs, MarketParameters, MarketSetup};
pub use error::{ConfigError, MarketError};
pub use market::{Market, MarketObject, TodaysMarket, TodaysMarketBuilder};
pub use spec::{CurveSpec, CurveSpecType, ParseError};

// --- Python Module Definition ---
/// Defines the `_core` Python module: build planning over a TOML setup.
#[cfg(feature = "python")]
#[pyo3::pymodule]
fn _core(m: &pyo3::Bound<'_, pyo3::types::PyModule>) -> pyo3::PyResult<()> {
    bindings::python::register(m)
}
