//! Builds the objects of a dependency graph.
pub mod builder;
pub mod cache;
pub mod calibration;
pub mod executor;
pub mod ledger;

pub use builder::{
    BuildContext, BuildError, BuildOutput, BuildRequest, BuilderKind, BuilderRegistry, MarketHandle, ObjectBuilder,
    ResolvedInputs,
};
pub use cache::{ObjectCache, ObjectKey};
pub use calibration::{CalibrationInfo, CalibrationRecord};
pub use executor::{BuildState, ExecutionPolicy, GraphExecutor, PassSummary};
pub use ledger::{BuildErrorLedger, NodeFailure};
