//! Optional reference data (bond terms and the like) for builders that need it.

use super::loader::DataError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDatum {
    pub data_type: String,
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

pub trait ReferenceDataProvider: Send + Sync {
    fn has_data(&self, data_type: &str, id: &str) -> bool;

    fn get_data(&self, data_type: &str, id: &str) -> Result<ReferenceDatum, DataError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceData {
    data: BTreeMap<(String, String), ReferenceDatum>,
}

impl InMemoryReferenceData {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, datum: ReferenceDatum) {
        self.data.insert((datum.data_type.clone(), datum.id.clone()), datum);
    }
}

impl ReferenceDataProvider for InMemoryReferenceData {
    fn has_data(&self, data_type: &str, id: &str) -> bool {
        self.data.contains_key(&(data_type.to_string(), id.to_string()))
    }

    fn get_data(&self, data_type: &str, id: &str) -> Result<ReferenceDatum, DataError> {
        self.data
            .get(&(data_type.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| DataError::NoReferenceDatum {
                data_type: data_type.to_string(),
                id: id.to_string(),
            })
    }
}
