//! Feature Vectorization
//!
//! Turns a named feature map into the fixed column order the booster was
//! trained with.

use std::collections::BTreeMap;

use super::booster::Booster;

/// Column layout of the production denial-risk model, used when a checkpoint
/// carries no feature names. Order matters.
pub const EXPECTED_FEATURES: [&str; 25] = [
    "Provider Organization Name (Legal Business Name)_complete",
    "Employer Identification Number (EIN)_complete",
    "Provider First Line Business Practice Location Address_complete",
    "Provider Business Practice Location Address City Name_complete",
    "Provider Business Practice Location Address State Name_complete",
    "Provider Business Practice Location Address Postal Code_complete",
    "Provider Business Practice Location Address Telephone Number_complete",
    "Healthcare Provider Taxonomy Code_1_complete",
    "Provider License Number_1_complete",
    "Provider License Number State Code_1_complete",
    "data_completeness_score",
    "data_completeness_score.1",
    "missing_critical_fields",
    "num_taxonomy_codes",
    "hospital_type",
    "num_licenses",
    "has_primary_license",
    "license_state_match",
    "days_since_enumeration",
    "days_since_update",
    "recently_updated",
    "is_subpart",
    "has_parent_org",
    "state",
    "region",
];

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVectorizer {
    names: Vec<String>,
}

impl FeatureVectorizer {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Use the booster's own names, falling back to the production layout
    pub fn for_booster(booster: &Booster) -> Self {
        if booster.feature_names().is_empty() {
            Self::new(EXPECTED_FEATURES.iter().map(|s| s.to_string()).collect())
        } else {
            Self::new(booster.feature_names().to_vec())
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Absent features default to 0.0
    pub fn vectorize(&self, features: &BTreeMap<String, f64>) -> Vec<f32> {
        self.names
            .iter()
            .map(|name| features.get(name).copied().unwrap_or(0.0) as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectorize_fills_missing_with_zero() {
        let v = FeatureVectorizer::new(vec!["a".into(), "b".into(), "c".into()]);
        let mut features = BTreeMap::new();
        features.insert("c".to_string(), 3.0);
        features.insert("a".to_string(), 1.5);
        features.insert("unused".to_string(), 9.0);

        assert_eq!(v.vectorize(&features), vec![1.5, 0.0, 3.0]);
    }

    #[test]
    fn test_fallback_layout() {
        let fixture = include_str!("fixtures/denial_model.json");
        let unnamed = fixture.replace(
            "\"feature_names\": [\"data_completeness_score\", \"num_licenses\", \"days_since_update\"],",
            "",
        );
        let booster = Booster::from_json_str(&unnamed).unwrap();
        let v = FeatureVectorizer::for_booster(&booster);
        assert_eq!(v.len(), 25);
        assert_eq!(v.names()[10], "data_completeness_score");
    }
}
