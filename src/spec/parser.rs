//! Parses mapping strings such as `Yield/EUR/EUR1D` into `CurveSpec`s.

use super::curve_spec::{CurveSpec, CurveSpecType, Field};
use thiserror::Error;

/// A mapping string that does not match the grammar of its kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse mapping '{mapping}': {message} (expected {expected})")]
pub struct ParseError {
    pub mapping: String,
    pub message: String,
    pub expected: String,
}

impl ParseError {
    fn new(mapping: &str, message: impl Into<String>, expected: impl Into<String>) -> Self {
        Self { mapping: mapping.to_string(), message: message.into(), expected: expected.into() }
    }
}

/// Parses a spec string without regard to which market object it is for.
pub fn parse_curve_spec(mapping: &str) -> Result<CurveSpec, ParseError> {
    let trimmed = mapping.trim();
    let tokens: Vec<&str> = trimmed.split('/').map(str::trim).collect();

    let spec_type: CurveSpecType = tokens[0]
        .parse()
        .map_err(|e: String| ParseError::new(mapping, e, "<Type>/<Component>/..."))?;

    let fields = spec_type.fields();
    let args = &tokens[1..];
    if args.len() != fields.len() {
        return Err(ParseError::new(
            mapping,
            format!("{} components after '{}', found {}", fields.len(), spec_type, args.len()),
            spec_type.grammar(),
        ));
    }

    for (pos, (field, token)) in fields.iter().zip(args).enumerate() {
        if token.is_empty() {
            return Err(ParseError::new(
                mapping,
                format!("component {} is empty", pos + 1),
                spec_type.grammar(),
            ));
        }
        if *field == Field::Ccy && !is_currency(token) {
            return Err(ParseError::new(
                mapping,
                format!("'{}' is not a currency code", token),
                spec_type.grammar(),
            ));
        }
    }

    let s = |i: usize| args[i].to_string();
    let spec = match spec_type {
        CurveSpecType::Yield => CurveSpec::Yield { ccy: s(0), curve_config_id: s(1) },
        CurveSpecType::FX => CurveSpec::FX { unit_ccy: s(0), ccy: s(1) },
        CurveSpecType::FXVolatility => {
            CurveSpec::FXVolatility { unit_ccy: s(0), ccy: s(1), curve_config_id: s(2) }
        }
        CurveSpecType::SwaptionVolatility => {
            CurveSpec::SwaptionVolatility { ccy: s(0), curve_config_id: s(1) }
        }
        CurveSpecType::YieldVolatility => {
            CurveSpec::YieldVolatility { ccy: s(0), curve_config_id: s(1) }
        }
        CurveSpecType::CapFloorVolatility => {
            CurveSpec::CapFloorVolatility { ccy: s(0), curve_config_id: s(1) }
        }
        CurveSpecType::Default => CurveSpec::Default { ccy: s(0), curve_config_id: s(1) },
        CurveSpecType::CDSVolatility => CurveSpec::CDSVolatility { curve_config_id: s(0) },
        CurveSpecType::BaseCorrelation => CurveSpec::BaseCorrelation { curve_config_id: s(0) },
        CurveSpecType::Inflation => CurveSpec::Inflation { index: s(0), curve_config_id: s(1) },
        CurveSpecType::InflationCapFloorVolatility => {
            CurveSpec::InflationCapFloorVolatility { index: s(0), curve_config_id: s(1) }
        }
        CurveSpecType::Equity => CurveSpec::Equity { ccy: s(0), curve_config_id: s(1) },
        CurveSpecType::EquityVolatility => {
            CurveSpec::EquityVolatility { ccy: s(0), curve_config_id: s(1) }
        }
        CurveSpecType::Security => CurveSpec::Security { security_id: s(0) },
        CurveSpecType::Commodity => CurveSpec::Commodity { ccy: s(0), curve_config_id: s(1) },
        CurveSpecType::CommodityVolatility => {
            CurveSpec::CommodityVolatility { ccy: s(0), curve_config_id: s(1) }
        }
        CurveSpecType::Correlation => CurveSpec::Correlation { curve_config_id: s(0) },
    };
    Ok(spec)
}

/// Parses a spec and checks it belongs to the `expected` family.
pub fn parse_curve_spec_as(mapping: &str, expected: CurveSpecType) -> Result<CurveSpec, ParseError> {
    let spec = parse_curve_spec(mapping).map_err(|mut e| {
        if !mapping.trim().starts_with(expected.as_str()) {
            e.expected = expected.grammar().to_string();
        }
        e
    })?;
    if spec.spec_type() != expected {
        return Err(ParseError::new(
            mapping,
            format!("found a {} spec", spec.spec_type()),
            expected.grammar(),
        ));
    }
    Ok(spec)
}

fn is_currency(token: &str) -> bool {
    token.len() == 3 && token.chars().all(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Yield/EUR/EUR1D", CurveSpecType::Yield, "EUR1D")]
    #[case(" Default/USD/CPTY_A ", CurveSpecType::Default, "CPTY_A")]
    #[case("FXVolatility/EUR/USD/EURUSD", CurveSpecType::FXVolatility, "EURUSD")]
    #[case("CDSVolatility/CDX_IG", CurveSpecType::CDSVolatility, "CDX_IG")]
    #[case("Inflation/EUHICPXT/EUHICPXT_ZC_Swaps", CurveSpecType::Inflation, "EUHICPXT_ZC_Swaps")]
    #[case("Security/BOND_1", CurveSpecType::Security, "BOND_1")]
    fn test_parse_valid(#[case] input: &str, #[case] t: CurveSpecType, #[case] id: &str) {
        let spec = parse_curve_spec(input).expect("should parse");
        assert_eq!(spec.spec_type(), t);
        assert_eq!(spec.curve_config_id(), id);
        assert_eq!(spec.name(), input.trim());
    }

    #[rstest]
    #[case("")]
    #[case("Curve/EUR/EUR1D")]
    #[case("Yield/EUR")]
    #[case("Yield/EUR/EUR1D/extra")]
    #[case("Yield/eur/EUR1D")]
    #[case("Yield/EUR/")]
    #[case("FX/EUR/US")]
    fn test_parse_invalid(#[case] input: &str) {
        assert!(parse_curve_spec(input).is_err(), "Should fail: '{}'", input);
    }

    #[test]
    fn test_error_names_mapping_and_grammar() {
        let err = parse_curve_spec("Yield/EUR").unwrap_err();
        assert_eq!(err.mapping, "Yield/EUR");
        assert_eq!(err.expected, "Yield/<Ccy>/<CurveConfigId>");
        assert!(err.to_string().contains("Yield/EUR"));
    }

    #[test]
    fn test_parse_as_rejects_other_family() {
        let err = parse_curve_spec_as("Default/USD/CPTY_A", CurveSpecType::Yield).unwrap_err();
        assert_eq!(err.expected, CurveSpecType::Yield.grammar());
        let err = parse_curve_spec_as("garbage", CurveSpecType::Equity).unwrap_err();
        assert_eq!(err.expected, CurveSpecType::Equity.grammar());
    }
}
