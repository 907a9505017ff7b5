//! A single TOML document bundling everything needed to set up a market.

use super::{BuildParameters, CurveConfigs, LoggingConfig, MarketParameters};
use crate::error::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSetup {
    pub asof: Option<NaiveDate>,
    pub build: BuildParameters,
    pub logging: LoggingConfig,
    pub parameters: MarketParameters,
    pub curve_configs: CurveConfigs,
}

impl MarketSetup {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationSource;
    use std::io::Write;

    const SETUP: &str = r#"
        asof = "2024-03-28"

        [build]
        continue_on_error = true

        [logging]
        level = "debug"

        [parameters.configurations.default]
        DiscountCurve = "ois"
        DefaultCurve = "credit"

        [parameters.market_objects.DiscountCurve.ois]
        USD = "Yield/USD/USD1D"

        [parameters.market_objects.DefaultCurve.credit]
        CPTY_A = "Default/USD/CPTY_A"

        [curve_configs.requirements]
        "Default/CPTY_A" = ["Yield/USD1D"]
    "#;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SETUP.as_bytes()).unwrap();

        let setup = MarketSetup::from_file(file.path()).expect("valid setup");
        assert_eq!(setup.asof, NaiveDate::from_ymd_opt(2024, 3, 28));
        assert!(setup.build.continue_on_error);
        assert!(!setup.build.lazy_build);
        assert_eq!(setup.logging.level, "debug");
        assert_eq!(setup.logging.format, "pretty");
        assert_eq!(setup.parameters.mappings("default").len(), 2);
        assert_eq!(setup.curve_configs.requirements.len(), 1);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = MarketSetup::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }

    #[test]
    fn test_bad_object_kind_is_rejected() {
        let err = MarketSetup::from_toml_str("[parameters.configurations.default]\nCurve = \"x\"");
        assert!(err.is_err());
    }
}
