//! Memoizing front-end to the spec parser.

use super::curve_spec::CurveSpec;
use super::parser::{parse_curve_spec_as, ParseError};
use crate::market::MarketObject;
use std::collections::HashMap;

/// Resolves `(kind, mapping)` pairs to curve specs, caching successful parses.
///
/// The cache only saves work; results are value-equal whether or not they
/// came from it.
#[derive(Debug, Clone, Default)]
pub struct SpecRegistry {
    cache: HashMap<(MarketObject, String), CurveSpec>,
}

impl SpecRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.cache.len() }

    pub fn is_empty(&self) -> bool { self.cache.is_empty() }

    /// Parses `mapping` as the spec family of `kind`.
    ///
    /// Fails for kinds that are not spec-based (swap indices), for strings
    /// outside the grammar, and for specs of the wrong family.
    pub fn resolve(&mut self, kind: MarketObject, mapping: &str) -> Result<CurveSpec, ParseError> {
        let key = (kind, mapping.trim().to_string());
        if let Some(spec) = self.cache.get(&key) {
            return Ok(spec.clone());
        }

        let expected = kind.spec_type().ok_or_else(|| ParseError {
            mapping: mapping.to_string(),
            message: format!("{} mappings are not curve specs", kind),
            expected: "a plain object name".to_string(),
        })?;

        let spec = parse_curve_spec_as(mapping, expected)?;
        self.cache.insert(key, spec.clone());
        Ok(spec)
    }
}
