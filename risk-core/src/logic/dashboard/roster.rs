//! Provider roster
//!
//! A static mock roster ships with the crate; a JSON file with the same shape
//! can replace it at startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;

use super::provider::Provider;
use super::DashboardError;

struct MockProvider {
    key: &'static str,
    name: &'static str,
    city: &'static str,
    specialty: &'static str,
    risk_score: f64,
    historical: f64,
    predicted: f64,
    /// data_completeness_score, num_licenses, days_since_update, num_taxonomy_codes
    features: [f64; 4],
}

const MOCK: [MockProvider; 8] = [
    MockProvider {
        key: "1588667638",
        name: "St. Mary's Regional Medical Center",
        city: "Reno",
        specialty: "General Acute Care Hospital",
        risk_score: 86.0,
        historical: 0.062,
        predicted: 0.058,
        features: [0.95, 3.0, 120.0, 2.0],
    },
    MockProvider {
        key: "1487659014",
        name: "Lakeside Community Hospital",
        city: "Chicago",
        specialty: "Critical Access Hospital",
        risk_score: 72.0,
        historical: 0.094,
        predicted: 0.101,
        features: [0.85, 1.0, 410.0, 1.0],
    },
    MockProvider {
        key: "1346291850",
        name: "Valley Rehabilitation Institute",
        city: "Phoenix",
        specialty: "Rehabilitation Hospital",
        risk_score: 44.0,
        historical: 0.138,
        predicted: 0.171,
        features: [0.6, 0.0, 980.0, 1.0],
    },
    MockProvider {
        key: "1093718520",
        name: "Northshore Children's Hospital",
        city: "Boston",
        specialty: "Children's Hospital",
        risk_score: 91.0,
        historical: 0.041,
        predicted: 0.037,
        features: [1.0, 4.0, 45.0, 3.0],
    },
    MockProvider {
        key: "1972583016",
        name: "Riverbend Psychiatric Center",
        city: "Memphis",
        specialty: "Psychiatric Hospital",
        risk_score: 38.0,
        historical: 0.152,
        predicted: 0.168,
        features: [0.5, 1.0, 1460.0, 1.0],
    },
    MockProvider {
        key: "1225034817",
        name: "Summit Orthopedic Specialty Hospital",
        city: "Denver",
        specialty: "Specialty Hospital",
        risk_score: 63.0,
        historical: 0.088,
        predicted: 0.114,
        features: [0.8, 2.0, 300.0, 2.0],
    },
    MockProvider {
        key: "1760492285",
        name: "Gulf Coast Long Term Care",
        city: "Houston",
        specialty: "Long Term Care Hospital",
        risk_score: 55.0,
        historical: 0.117,
        predicted: 0.109,
        features: [0.7, 1.0, 620.0, 1.0],
    },
    MockProvider {
        key: "1649371102",
        name: "Pinecrest General Hospital",
        city: "Portland",
        specialty: "General Acute Care Hospital",
        risk_score: 81.0,
        historical: 0.071,
        predicted: 0.074,
        features: [0.9, 2.0, 200.0, 2.0],
    },
];

static MOCK_ROSTER: Lazy<Vec<Provider>> = Lazy::new(|| MOCK.iter().map(to_provider).collect());

fn to_provider(m: &MockProvider) -> Provider {
    let [completeness, licenses, days_since_update, taxonomy] = m.features;
    let features = BTreeMap::from([
        ("data_completeness_score".to_string(), completeness),
        ("num_licenses".to_string(), licenses),
        ("days_since_update".to_string(), days_since_update),
        ("num_taxonomy_codes".to_string(), taxonomy),
        ("recently_updated".to_string(), if days_since_update < 365.0 { 1.0 } else { 0.0 }),
        ("missing_critical_fields".to_string(), if completeness < 0.8 { 1.0 } else { 0.0 }),
    ]);

    Provider {
        key: m.key.to_string(),
        name: m.name.to_string(),
        city: m.city.to_string(),
        specialty: m.specialty.to_string(),
        risk_score: m.risk_score,
        historical_denial_rate: m.historical,
        predicted_denial_rate: m.predicted,
        features,
    }
}

/// Built-in roster used when no roster file is configured
pub fn mock_roster() -> Vec<Provider> {
    MOCK_ROSTER.clone()
}

/// Load a JSON array of providers, validating each entry
pub fn load_roster(path: impl AsRef<Path>) -> Result<Vec<Provider>, DashboardError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let providers: Vec<Provider> = serde_json::from_str(&content)?;

    for p in &providers {
        p.validate()?;
    }

    log::info!("Loaded {} providers from {}", providers.len(), path.display());
    Ok(providers)
}
