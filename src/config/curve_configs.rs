//! What each curve configuration needs built before it.

use crate::spec::{CurveSpec, CurveSpecRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The slice of the curve-configuration layer the dependency graph needs.
pub trait CurveConfigSource: Send + Sync {
    /// Specs that must be built before `spec` can be built.
    fn required_curve_ids(&self, spec: &CurveSpec) -> Vec<CurveSpecRef>;

    /// The ibor/overnight index a swap index projects its floating leg on.
    fn swap_index_forwarding_index(&self, swap_index: &str) -> Option<String>;
}

/// Static requirements table, keyed by `Type/CurveConfigId`.
///
/// ```toml
/// [curve_configs.requirements]
/// "Default/CPTY_A" = ["Yield/USD1D"]
///
/// [curve_configs.swap_index_forwarding]
/// EUR-CMS-30Y = "EUR-EURIBOR-6M"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfigs {
    pub requirements: BTreeMap<CurveSpecRef, Vec<CurveSpecRef>>,
    pub swap_index_forwarding: BTreeMap<String, String>,
}

impl CurveConfigs {
    pub fn new() -> Self { Self::default() }

    pub fn require(&mut self, dependent: CurveSpecRef, required: CurveSpecRef) -> &mut Self {
        self.requirements.entry(dependent).or_default().push(required);
        self
    }

    pub fn set_swap_index_forwarding(&mut self, swap_index: &str, index: &str) -> &mut Self {
        self.swap_index_forwarding.insert(swap_index.to_string(), index.to_string());
        self
    }
}

impl CurveConfigSource for CurveConfigs {
    fn required_curve_ids(&self, spec: &CurveSpec) -> Vec<CurveSpecRef> {
        self.requirements.get(&spec.as_ref_key()).cloned().unwrap_or_default()
    }

    fn swap_index_forwarding_index(&self, swap_index: &str) -> Option<String> {
        self.swap_index_forwarding.get(swap_index).cloned()
    }
}
