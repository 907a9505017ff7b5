//! Flags that govern one market build.

use crate::data::QuoteLinkage;
use serde::{Deserialize, Serialize};

/// Caller-supplied build policy. Only `load_fixings` defaults to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildParameters {
    /// Record failures and keep building independent objects instead of
    /// aborting on the first failure.
    pub continue_on_error: bool,
    /// Read historical fixings and dividends from the loader when the
    /// market is created.
    pub load_fixings: bool,
    /// Build objects on first query rather than up front.
    pub lazy_build: bool,
    /// Let built objects observe later mutation of loader quotes.
    pub preserve_quote_linkage: bool,
    /// Build mutually independent objects of one topological level in parallel.
    pub parallel: bool,
}

impl Default for BuildParameters {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            load_fixings: true,
            lazy_build: false,
            preserve_quote_linkage: false,
            parallel: false,
        }
    }
}

impl BuildParameters {
    pub fn quote_linkage(&self) -> QuoteLinkage {
        if self.preserve_quote_linkage { QuoteLinkage::Live } else { QuoteLinkage::Frozen }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_freeze_quotes() {
        let p = BuildParameters::default();
        assert!(!p.continue_on_error && !p.lazy_build && !p.parallel);
        assert!(p.load_fixings);
        assert_eq!(p.quote_linkage(), QuoteLinkage::Frozen);

        let p: BuildParameters = toml::from_str("preserve_quote_linkage = true").unwrap();
        assert_eq!(p.quote_linkage(), QuoteLinkage::Live);
        assert!(p.load_fixings);

        let p: BuildParameters = toml::from_str("load_fixings = false").unwrap();
        assert!(!p.load_fixings);
    }
}
