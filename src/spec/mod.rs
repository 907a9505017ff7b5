//! The curve specification registry: turns mapping strings into typed specs.
pub mod curve_spec;
pub mod parser;
pub mod registry;

pub use curve_spec::{CurveSpec, CurveSpecRef, CurveSpecType};
pub use parser::{parse_curve_spec, parse_curve_spec_as, ParseError};
pub use registry::SpecRegistry;
