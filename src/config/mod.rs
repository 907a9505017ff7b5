//! Declarative inputs: market composition, curve requirements, build flags and logging.
pub mod build;
pub mod curve_configs;
pub mod logging;
pub mod parameters;
pub mod setup;

pub use build::BuildParameters;
pub use curve_configs::{CurveConfigSource, CurveConfigs};
pub use logging::LoggingConfig;
pub use parameters::{ConfigurationSource, DeclaredMapping, MarketParameters, DEFAULT_CONFIGURATION};
pub use setup::MarketSetup;
