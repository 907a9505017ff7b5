use crate::config::{ConfigurationSource, MarketSetup};
use crate::graph::{plan, PlanStep};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn load(setup: &str) -> PyResult<MarketSetup> {
    MarketSetup::from_toml_str(setup).map_err(|e| PyValueError::new_err(e.to_string()))
}

fn steps(setup: &MarketSetup, configuration: &str) -> PyResult<Vec<PlanStep>> {
    let nodes = plan(&setup.parameters, &setup.curve_configs, configuration)
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
    Ok(nodes.iter().map(PlanStep::from).collect())
}

#[pyfunction]
fn rust_core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Configuration names declared by a TOML setup, the default one included.
#[pyfunction]
fn configurations(setup: &str) -> PyResult<Vec<String>> {
    Ok(load(setup)?.parameters.configurations())
}

/// `Kind(name)` labels of a configuration in build order.
#[pyfunction]
#[pyo3(signature = (setup, configuration = "default"))]
fn build_order(setup: &str, configuration: &str) -> PyResult<Vec<String>> {
    let setup = load(setup)?;
    Ok(steps(&setup, configuration)?
        .into_iter()
        .map(|s| format!("{}({})", s.kind, s.name))
        .collect())
}

/// The build plan of a configuration as a JSON array.
#[pyfunction]
#[pyo3(signature = (setup, configuration = "default"))]
fn build_plan_json(setup: &str, configuration: &str) -> PyResult<String> {
    let setup = load(setup)?;
    let steps = steps(&setup, configuration)?;
    serde_json::to_string_pretty(&steps).map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(rust_core_version, m)?)?;
    m.add_function(wrap_pyfunction!(configurations, m)?)?;
    m.add_function(wrap_pyfunction!(build_order, m)?)?;
    m.add_function(wrap_pyfunction!(build_plan_json, m)?)?;
    Ok(())
}
