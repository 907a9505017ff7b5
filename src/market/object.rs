//! Defines `MarketObject`, the closed set of object kinds a market can hold.

use crate::spec::CurveSpecType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The category of a market object, i.e. the left-hand side "type" of a
/// configuration mapping.
///
/// Several kinds share one curve-spec family (discount, yield and index
/// curves are all `Yield/...` specs). The kind decides how the built object
/// is registered and queried, the spec decides how it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MarketObject {
    DiscountCurve,
    YieldCurve,
    IndexCurve,
    SwapIndexCurve,
    FXSpot,
    FXVol,
    SwaptionVol,
    YieldVol,
    DefaultCurve,
    CDSVol,
    BaseCorrelation,
    CapFloorVol,
    ZeroInflationCurve,
    YoYInflationCurve,
    ZeroInflationCapFloorVol,
    YoYInflationCapFloorVol,
    EquityCurve,
    EquityVol,
    Security,
    CommodityCurve,
    CommodityVolatility,
    Correlation,
}

impl MarketObject {
    pub const ALL: [MarketObject; 22] = [
        MarketObject::DiscountCurve,
        MarketObject::YieldCurve,
        MarketObject::IndexCurve,
        MarketObject::SwapIndexCurve,
        MarketObject::FXSpot,
        MarketObject::FXVol,
        MarketObject::SwaptionVol,
        MarketObject::YieldVol,
        MarketObject::DefaultCurve,
        MarketObject::CDSVol,
        MarketObject::BaseCorrelation,
        MarketObject::CapFloorVol,
        MarketObject::ZeroInflationCurve,
        MarketObject::YoYInflationCurve,
        MarketObject::ZeroInflationCapFloorVol,
        MarketObject::YoYInflationCapFloorVol,
        MarketObject::EquityCurve,
        MarketObject::EquityVol,
        MarketObject::Security,
        MarketObject::CommodityCurve,
        MarketObject::CommodityVolatility,
        MarketObject::Correlation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketObject::DiscountCurve => "DiscountCurve",
            MarketObject::YieldCurve => "YieldCurve",
            MarketObject::IndexCurve => "IndexCurve",
            MarketObject::SwapIndexCurve => "SwapIndexCurve",
            MarketObject::FXSpot => "FXSpot",
            MarketObject::FXVol => "FXVol",
            MarketObject::SwaptionVol => "SwaptionVol",
            MarketObject::YieldVol => "YieldVol",
            MarketObject::DefaultCurve => "DefaultCurve",
            MarketObject::CDSVol => "CDSVol",
            MarketObject::BaseCorrelation => "BaseCorrelation",
            MarketObject::CapFloorVol => "CapFloorVol",
            MarketObject::ZeroInflationCurve => "ZeroInflationCurve",
            MarketObject::YoYInflationCurve => "YoYInflationCurve",
            MarketObject::ZeroInflationCapFloorVol => "ZeroInflationCapFloorVol",
            MarketObject::YoYInflationCapFloorVol => "YoYInflationCapFloorVol",
            MarketObject::EquityCurve => "EquityCurve",
            MarketObject::EquityVol => "EquityVol",
            MarketObject::Security => "Security",
            MarketObject::CommodityCurve => "CommodityCurve",
            MarketObject::CommodityVolatility => "CommodityVolatility",
            MarketObject::Correlation => "Correlation",
        }
    }

    /// The curve-spec family a mapping of this kind must parse to.
    ///
    /// `None` for kinds whose mapping is a plain name rather than a spec
    /// (swap indices map to the name of their discounting index).
    pub fn spec_type(&self) -> Option<CurveSpecType> {
        let t = match self {
            MarketObject::DiscountCurve | MarketObject::YieldCurve | MarketObject::IndexCurve => {
                CurveSpecType::Yield
            }
            MarketObject::SwapIndexCurve => return None,
            MarketObject::FXSpot => CurveSpecType::FX,
            MarketObject::FXVol => CurveSpecType::FXVolatility,
            MarketObject::SwaptionVol => CurveSpecType::SwaptionVolatility,
            MarketObject::YieldVol => CurveSpecType::YieldVolatility,
            MarketObject::DefaultCurve => CurveSpecType::Default,
            MarketObject::CDSVol => CurveSpecType::CDSVolatility,
            MarketObject::BaseCorrelation => CurveSpecType::BaseCorrelation,
            MarketObject::CapFloorVol => CurveSpecType::CapFloorVolatility,
            MarketObject::ZeroInflationCurve | MarketObject::YoYInflationCurve => {
                CurveSpecType::Inflation
            }
            MarketObject::ZeroInflationCapFloorVol | MarketObject::YoYInflationCapFloorVol => {
                CurveSpecType::InflationCapFloorVolatility
            }
            MarketObject::EquityCurve => CurveSpecType::Equity,
            MarketObject::EquityVol => CurveSpecType::EquityVolatility,
            MarketObject::Security => CurveSpecType::Security,
            MarketObject::CommodityCurve => CurveSpecType::Commodity,
            MarketObject::CommodityVolatility => CurveSpecType::CommodityVolatility,
            MarketObject::Correlation => CurveSpecType::Correlation,
        };
        Some(t)
    }

    /// Swap indices resolve differently per configuration, so their cache
    /// entries are partitioned by configuration name.
    pub fn is_configuration_scoped(&self) -> bool {
        matches!(self, MarketObject::SwapIndexCurve)
    }
}

impl fmt::Display for MarketObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketObject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MarketObject::ALL
            .iter()
            .find(|o| o.as_str() == s.trim())
            .copied()
            .ok_or_else(|| format!("unknown market object '{}'", s))
    }
}

impl TryFrom<String> for MarketObject {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MarketObject> for String {
    fn from(value: MarketObject) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for kind in MarketObject::ALL {
            assert_eq!(kind.as_str().parse::<MarketObject>(), Ok(kind));
        }
        assert!("Curve".parse::<MarketObject>().is_err());
    }

    #[test]
    fn test_yield_family_shares_spec_type() {
        assert_eq!(MarketObject::DiscountCurve.spec_type(), Some(CurveSpecType::Yield));
        assert_eq!(MarketObject::IndexCurve.spec_type(), Some(CurveSpecType::Yield));
        assert_eq!(MarketObject::SwapIndexCurve.spec_type(), None);
        assert!(MarketObject::SwapIndexCurve.is_configuration_scoped());
        assert!(!MarketObject::DiscountCurve.is_configuration_scoped());
    }
}
