//! Structured curve specifications parsed from mapping strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The family of a curve spec, i.e. its leading token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CurveSpecType {
    Yield,
    FX,
    FXVolatility,
    SwaptionVolatility,
    YieldVolatility,
    CapFloorVolatility,
    Default,
    CDSVolatility,
    BaseCorrelation,
    Inflation,
    InflationCapFloorVolatility,
    Equity,
    EquityVolatility,
    Security,
    Commodity,
    CommodityVolatility,
    Correlation,
}

/// A positional component of a spec string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    /// Three-letter uppercase currency code.
    Ccy,
    /// Any non-empty identifier.
    Id,
}

impl CurveSpecType {
    pub const ALL: [CurveSpecType; 17] = [
        CurveSpecType::Yield,
        CurveSpecType::FX,
        CurveSpecType::FXVolatility,
        CurveSpecType::SwaptionVolatility,
        CurveSpecType::YieldVolatility,
        CurveSpecType::CapFloorVolatility,
        CurveSpecType::Default,
        CurveSpecType::CDSVolatility,
        CurveSpecType::BaseCorrelation,
        CurveSpecType::Inflation,
        CurveSpecType::InflationCapFloorVolatility,
        CurveSpecType::Equity,
        CurveSpecType::EquityVolatility,
        CurveSpecType::Security,
        CurveSpecType::Commodity,
        CurveSpecType::CommodityVolatility,
        CurveSpecType::Correlation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurveSpecType::Yield => "Yield",
            CurveSpecType::FX => "FX",
            CurveSpecType::FXVolatility => "FXVolatility",
            CurveSpecType::SwaptionVolatility => "SwaptionVolatility",
            CurveSpecType::YieldVolatility => "YieldVolatility",
            CurveSpecType::CapFloorVolatility => "CapFloorVolatility",
            CurveSpecType::Default => "Default",
            CurveSpecType::CDSVolatility => "CDSVolatility",
            CurveSpecType::BaseCorrelation => "BaseCorrelation",
            CurveSpecType::Inflation => "Inflation",
            CurveSpecType::InflationCapFloorVolatility => "InflationCapFloorVolatility",
            CurveSpecType::Equity => "Equity",
            CurveSpecType::EquityVolatility => "EquityVolatility",
            CurveSpecType::Security => "Security",
            CurveSpecType::Commodity => "Commodity",
            CurveSpecType::CommodityVolatility => "CommodityVolatility",
            CurveSpecType::Correlation => "Correlation",
        }
    }

    /// Human-readable grammar, used in parse errors.
    pub fn grammar(&self) -> &'static str {
        match self {
            CurveSpecType::Yield => "Yield/<Ccy>/<CurveConfigId>",
            CurveSpecType::FX => "FX/<UnitCcy>/<Ccy>",
            CurveSpecType::FXVolatility => "FXVolatility/<UnitCcy>/<Ccy>/<CurveConfigId>",
            CurveSpecType::SwaptionVolatility => "SwaptionVolatility/<Ccy>/<CurveConfigId>",
            CurveSpecType::YieldVolatility => "YieldVolatility/<Ccy>/<CurveConfigId>",
            CurveSpecType::CapFloorVolatility => "CapFloorVolatility/<Ccy>/<CurveConfigId>",
            CurveSpecType::Default => "Default/<Ccy>/<CurveConfigId>",
            CurveSpecType::CDSVolatility => "CDSVolatility/<CurveConfigId>",
            CurveSpecType::BaseCorrelation => "BaseCorrelation/<CurveConfigId>",
            CurveSpecType::Inflation => "Inflation/<Index>/<CurveConfigId>",
            CurveSpecType::InflationCapFloorVolatility => {
                "InflationCapFloorVolatility/<Index>/<CurveConfigId>"
            }
            CurveSpecType::Equity => "Equity/<Ccy>/<CurveConfigId>",
            CurveSpecType::EquityVolatility => "EquityVolatility/<Ccy>/<CurveConfigId>",
            CurveSpecType::Security => "Security/<SecurityId>",
            CurveSpecType::Commodity => "Commodity/<Ccy>/<CurveConfigId>",
            CurveSpecType::CommodityVolatility => "CommodityVolatility/<Ccy>/<CurveConfigId>",
            CurveSpecType::Correlation => "Correlation/<CurveConfigId>",
        }
    }

    pub(crate) fn fields(&self) -> &'static [Field] {
        use Field::*;
        match self {
            CurveSpecType::FX => &[Ccy, Ccy],
            CurveSpecType::FXVolatility => &[Ccy, Ccy, Id],
            CurveSpecType::CDSVolatility
            | CurveSpecType::BaseCorrelation
            | CurveSpecType::Security
            | CurveSpecType::Correlation => &[Id],
            CurveSpecType::Inflation | CurveSpecType::InflationCapFloorVolatility => &[Id, Id],
            CurveSpecType::Yield
            | CurveSpecType::SwaptionVolatility
            | CurveSpecType::YieldVolatility
            | CurveSpecType::CapFloorVolatility
            | CurveSpecType::Default
            | CurveSpecType::Equity
            | CurveSpecType::EquityVolatility
            | CurveSpecType::Commodity
            | CurveSpecType::CommodityVolatility => &[Ccy, Id],
        }
    }
}

impl fmt::Display for CurveSpecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurveSpecType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurveSpecType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown curve spec type '{}'", s))
    }
}

/// A parsed mapping. Equality is by value, so two parses of the same string
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveSpec {
    Yield { ccy: String, curve_config_id: String },
    FX { unit_ccy: String, ccy: String },
    FXVolatility { unit_ccy: String, ccy: String, curve_config_id: String },
    SwaptionVolatility { ccy: String, curve_config_id: String },
    YieldVolatility { ccy: String, curve_config_id: String },
    CapFloorVolatility { ccy: String, curve_config_id: String },
    Default { ccy: String, curve_config_id: String },
    CDSVolatility { curve_config_id: String },
    BaseCorrelation { curve_config_id: String },
    Inflation { index: String, curve_config_id: String },
    InflationCapFloorVolatility { index: String, curve_config_id: String },
    Equity { ccy: String, curve_config_id: String },
    EquityVolatility { ccy: String, curve_config_id: String },
    Security { security_id: String },
    Commodity { ccy: String, curve_config_id: String },
    CommodityVolatility { ccy: String, curve_config_id: String },
    Correlation { curve_config_id: String },
}

impl CurveSpec {
    pub fn spec_type(&self) -> CurveSpecType {
        match self {
            CurveSpec::Yield { .. } => CurveSpecType::Yield,
            CurveSpec::FX { .. } => CurveSpecType::FX,
            CurveSpec::FXVolatility { .. } => CurveSpecType::FXVolatility,
            CurveSpec::SwaptionVolatility { .. } => CurveSpecType::SwaptionVolatility,
            CurveSpec::YieldVolatility { .. } => CurveSpecType::YieldVolatility,
            CurveSpec::CapFloorVolatility { .. } => CurveSpecType::CapFloorVolatility,
            CurveSpec::Default { .. } => CurveSpecType::Default,
            CurveSpec::CDSVolatility { .. } => CurveSpecType::CDSVolatility,
            CurveSpec::BaseCorrelation { .. } => CurveSpecType::BaseCorrelation,
            CurveSpec::Inflation { .. } => CurveSpecType::Inflation,
            CurveSpec::InflationCapFloorVolatility { .. } => {
                CurveSpecType::InflationCapFloorVolatility
            }
            CurveSpec::Equity { .. } => CurveSpecType::Equity,
            CurveSpec::EquityVolatility { .. } => CurveSpecType::EquityVolatility,
            CurveSpec::Security { .. } => CurveSpecType::Security,
            CurveSpec::Commodity { .. } => CurveSpecType::Commodity,
            CurveSpec::CommodityVolatility { .. } => CurveSpecType::CommodityVolatility,
            CurveSpec::Correlation { .. } => CurveSpecType::Correlation,
        }
    }

    /// The id of the curve configuration this spec is built from. FX spots
    /// have no configuration of their own and use the concatenated pair.
    pub fn curve_config_id(&self) -> String {
        match self {
            CurveSpec::FX { unit_ccy, ccy } => format!("{}{}", unit_ccy, ccy),
            CurveSpec::Security { security_id } => security_id.clone(),
            CurveSpec::Yield { curve_config_id, .. }
            | CurveSpec::FXVolatility { curve_config_id, .. }
            | CurveSpec::SwaptionVolatility { curve_config_id, .. }
            | CurveSpec::YieldVolatility { curve_config_id, .. }
            | CurveSpec::CapFloorVolatility { curve_config_id, .. }
            | CurveSpec::Default { curve_config_id, .. }
            | CurveSpec::CDSVolatility { curve_config_id }
            | CurveSpec::BaseCorrelation { curve_config_id }
            | CurveSpec::Inflation { curve_config_id, .. }
            | CurveSpec::InflationCapFloorVolatility { curve_config_id, .. }
            | CurveSpec::Equity { curve_config_id, .. }
            | CurveSpec::EquityVolatility { curve_config_id, .. }
            | CurveSpec::Commodity { curve_config_id, .. }
            | CurveSpec::CommodityVolatility { curve_config_id, .. }
            | CurveSpec::Correlation { curve_config_id } => curve_config_id.clone(),
        }
    }

    /// Canonical string form, also the object-cache key for the built object.
    pub fn name(&self) -> String {
        self.to_string()
    }

    pub fn as_ref_key(&self) -> CurveSpecRef {
        CurveSpecRef { spec_type: self.spec_type(), curve_config_id: self.curve_config_id() }
    }

    fn components(&self) -> Vec<&str> {
        match self {
            CurveSpec::FX { unit_ccy, ccy } => vec![unit_ccy, ccy],
            CurveSpec::FXVolatility { unit_ccy, ccy, curve_config_id } => {
                vec![unit_ccy, ccy, curve_config_id]
            }
            CurveSpec::CDSVolatility { curve_config_id }
            | CurveSpec::BaseCorrelation { curve_config_id }
            | CurveSpec::Correlation { curve_config_id } => vec![curve_config_id],
            CurveSpec::Security { security_id } => vec![security_id],
            CurveSpec::Inflation { index, curve_config_id }
            | CurveSpec::InflationCapFloorVolatility { index, curve_config_id } => {
                vec![index, curve_config_id]
            }
            CurveSpec::Yield { ccy, curve_config_id }
            | CurveSpec::SwaptionVolatility { ccy, curve_config_id }
            | CurveSpec::YieldVolatility { ccy, curve_config_id }
            | CurveSpec::CapFloorVolatility { ccy, curve_config_id }
            | CurveSpec::Default { ccy, curve_config_id }
            | CurveSpec::Equity { ccy, curve_config_id }
            | CurveSpec::EquityVolatility { ccy, curve_config_id }
            | CurveSpec::Commodity { ccy, curve_config_id }
            | CurveSpec::CommodityVolatility { ccy, curve_config_id } => vec![ccy, curve_config_id],
        }
    }
}

impl fmt::Display for CurveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec_type())?;
        for c in self.components() {
            write!(f, "/{}", c)?;
        }
        Ok(())
    }
}

/// A reference to "whatever node in this configuration builds the spec of
/// this type with this curve config id". Textual form: `Type/ConfigId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurveSpecRef {
    pub spec_type: CurveSpecType,
    pub curve_config_id: String,
}

impl CurveSpecRef {
    pub fn new(spec_type: CurveSpecType, curve_config_id: impl Into<String>) -> Self {
        Self { spec_type, curve_config_id: curve_config_id.into() }
    }

    pub fn matches(&self, spec: &CurveSpec) -> bool {
        spec.spec_type() == self.spec_type && spec.curve_config_id() == self.curve_config_id
    }
}

impl fmt::Display for CurveSpecRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.spec_type, self.curve_config_id)
    }
}

impl FromStr for CurveSpecRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (t, id) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("expected '<Type>/<CurveConfigId>', found '{}'", s))?;
        if id.is_empty() {
            return Err(format!("empty curve config id in '{}'", s));
        }
        Ok(Self { spec_type: t.parse()?, curve_config_id: id.to_string() })
    }
}

impl TryFrom<String> for CurveSpecRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurveSpecRef> for String {
    fn from(value: CurveSpecRef) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fx_config_id_is_concatenated_pair() {
        let spec = CurveSpec::FX { unit_ccy: "EUR".into(), ccy: "USD".into() };
        assert_eq!(spec.curve_config_id(), "EURUSD");
        assert_eq!(spec.name(), "FX/EUR/USD");
    }

    #[test]
    fn test_spec_ref_parse_and_match() {
        let r: CurveSpecRef = "Yield/USD1D".parse().unwrap();
        assert_eq!(r, CurveSpecRef::new(CurveSpecType::Yield, "USD1D"));
        let spec = CurveSpec::Yield { ccy: "USD".into(), curve_config_id: "USD1D".into() };
        assert!(r.matches(&spec));
        assert!("Yield".parse::<CurveSpecRef>().is_err());
        assert!("Curve/X".parse::<CurveSpecRef>().is_err());
    }
}
