//! Label encoding for categorical columns
//!
//! Classes are the sorted distinct values; a missing cell is the class "nan"
//! so training and prediction agree on how gaps are coded.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::TrainingError;

/// Class name used for missing categorical values
pub const MISSING_CLASS: &str = "nan";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut classes: Vec<String> = values
            .into_iter()
            .map(|v| v.unwrap_or(MISSING_CLASS).to_string())
            .collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Code for a known class
    pub fn transform(&self, value: Option<&str>) -> Option<usize> {
        let value = value.unwrap_or(MISSING_CLASS);
        self.classes.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }

    /// Code for a value, unseen classes map to 0
    pub fn transform_or_zero(&self, value: Option<&str>) -> usize {
        self.transform(value).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Encoders keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoders(pub BTreeMap<String, LabelEncoder>);

impl LabelEncoders {
    pub fn get(&self, column: &str) -> Option<&LabelEncoder> {
        self.0.get(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, encoder: LabelEncoder) {
        self.0.insert(column.into(), encoder);
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TrainingError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrainingError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
