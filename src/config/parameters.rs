//! The configuration source: which objects each named configuration declares.

use crate::market::MarketObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the configuration every other configuration falls back to.
pub const DEFAULT_CONFIGURATION: &str = "default";

/// One `name -> mapping` declaration of a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredMapping {
    pub kind: MarketObject,
    pub name: String,
    pub mapping: String,
}

/// Read access to the declarative market composition.
pub trait ConfigurationSource: Send + Sync {
    /// All configuration names, the default one included.
    fn configurations(&self) -> Vec<String>;

    fn has_configuration(&self, configuration: &str) -> bool;

    /// The declarations that make up `configuration`, in a stable order.
    fn mappings(&self, configuration: &str) -> Vec<DeclaredMapping>;

    fn default_configuration(&self) -> &str {
        DEFAULT_CONFIGURATION
    }
}

/// Market composition in the "configuration -> mapping set" layout.
///
/// A configuration names, per market object kind, the id of a mapping set;
/// the mapping sets themselves live in `market_objects`. Kinds a
/// configuration does not mention are taken from the default configuration.
///
/// ```toml
/// [configurations.default]
/// DiscountCurve = "ois"
///
/// [market_objects.DiscountCurve.ois]
/// EUR = "Yield/EUR/EUR1D"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketParameters {
    pub configurations: BTreeMap<String, BTreeMap<MarketObject, String>>,
    pub market_objects: BTreeMap<MarketObject, BTreeMap<String, BTreeMap<String, String>>>,
}

impl MarketParameters {
    pub fn new() -> Self { Self::default() }

    /// Declares `name -> mapping` for `kind` in `configuration`, using the
    /// configuration name as the mapping-set id unless one is already set.
    pub fn insert_mapping(
        &mut self,
        configuration: &str,
        kind: MarketObject,
        name: &str,
        mapping: &str,
    ) -> &mut Self {
        let id = self
            .configurations
            .entry(configuration.to_string())
            .or_default()
            .entry(kind)
            .or_insert_with(|| configuration.to_string())
            .clone();
        self.market_objects
            .entry(kind)
            .or_default()
            .entry(id)
            .or_default()
            .insert(name.to_string(), mapping.to_string());
        self
    }

    /// Points `configuration` at an existing mapping set for `kind`.
    pub fn set_mapping_id(&mut self, configuration: &str, kind: MarketObject, id: &str) -> &mut Self {
        self.configurations
            .entry(configuration.to_string())
            .or_default()
            .insert(kind, id.to_string());
        self
    }

    /// The mapping-set id used for `kind` under `configuration`, after the
    /// fallback to the default configuration.
    pub fn mapping_id(&self, configuration: &str, kind: MarketObject) -> Option<&str> {
        let lookup = |c: &str| self.configurations.get(c).and_then(|m| m.get(&kind));
        if let Some(id) = lookup(configuration).or_else(|| lookup(DEFAULT_CONFIGURATION)) {
            return Some(id.as_str());
        }
        self.market_objects
            .get(&kind)
            .filter(|sets| sets.contains_key(DEFAULT_CONFIGURATION))
            .map(|_| DEFAULT_CONFIGURATION)
    }

    pub fn mapping(&self, configuration: &str, kind: MarketObject) -> Option<&BTreeMap<String, String>> {
        let id = self.mapping_id(configuration, kind)?;
        self.market_objects.get(&kind)?.get(id)
    }
}

impl ConfigurationSource for MarketParameters {
    fn configurations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configurations.keys().cloned().collect();
        if !self.configurations.contains_key(DEFAULT_CONFIGURATION) {
            names.insert(0, DEFAULT_CONFIGURATION.to_string());
        }
        names
    }

    fn has_configuration(&self, configuration: &str) -> bool {
        configuration == DEFAULT_CONFIGURATION || self.configurations.contains_key(configuration)
    }

    fn mappings(&self, configuration: &str) -> Vec<DeclaredMapping> {
        let mut out = Vec::new();
        for kind in MarketObject::ALL {
            if let Some(set) = self.mapping(configuration, kind) {
                out.extend(set.iter().map(|(name, mapping)| DeclaredMapping {
                    kind,
                    name: name.clone(),
                    mapping: mapping.clone(),
                }));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> MarketParameters {
        let mut p = MarketParameters::new();
        p.insert_mapping(DEFAULT_CONFIGURATION, MarketObject::DiscountCurve, "EUR", "Yield/EUR/EUR1D")
            .insert_mapping(DEFAULT_CONFIGURATION, MarketObject::IndexCurve, "EUR-EURIBOR-6M", "Yield/EUR/EUR6M")
            .insert_mapping("collateral_usd", MarketObject::DiscountCurve, "EUR", "Yield/EUR/EUR-IN-USD");
        p
    }

    #[test]
    fn test_configuration_overrides_one_kind_and_inherits_the_rest() {
        let p = params();
        let decls = p.mappings("collateral_usd");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].kind, MarketObject::DiscountCurve);
        assert_eq!(decls[0].mapping, "Yield/EUR/EUR-IN-USD");
        assert_eq!(decls[1].kind, MarketObject::IndexCurve);
        assert_eq!(decls[1].mapping, "Yield/EUR/EUR6M");
    }

    #[test]
    fn test_default_always_exists() {
        let p = params();
        assert!(p.has_configuration("default"));
        assert!(p.has_configuration("collateral_usd"));
        assert!(!p.has_configuration("stress"));
        assert_eq!(p.configurations(), vec!["collateral_usd".to_string(), "default".to_string()]);
    }

    #[test]
    fn test_toml_layout() {
        let text = r#"
            [configurations.default]
            DiscountCurve = "ois"

            [market_objects.DiscountCurve.ois]
            EUR = "Yield/EUR/EUR1D"
            USD = "Yield/USD/USD1D"
        "#;
        let p: MarketParameters = toml::from_str(text).expect("valid toml");
        let decls = p.mappings(DEFAULT_CONFIGURATION);
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[1].name, "USD");
    }
}
