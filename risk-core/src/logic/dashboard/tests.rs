use std::collections::BTreeMap;

use proptest::prelude::*;

use super::*;

fn provider(key: &str, name: &str, city: &str, specialty: &str, score: f64) -> Provider {
    Provider {
        key: key.to_string(),
        name: name.to_string(),
        city: city.to_string(),
        specialty: specialty.to_string(),
        risk_score: score,
        historical_denial_rate: 0.1,
        predicted_denial_rate: 0.1,
        features: BTreeMap::new(),
    }
}

#[test]
fn test_bucket_boundaries() {
    assert_eq!(RiskLevel::from_score(100.0), RiskLevel::Low);
    assert_eq!(RiskLevel::from_score(80.0), RiskLevel::Low);
    assert_eq!(RiskLevel::from_score(79.999), RiskLevel::Moderate);
    assert_eq!(RiskLevel::from_score(50.0), RiskLevel::Moderate);
    assert_eq!(RiskLevel::from_score(49.9), RiskLevel::High);
    assert_eq!(RiskLevel::from_score(0.0), RiskLevel::High);
    assert_eq!(RiskLevel::Moderate.to_string(), "Moderate");
}

#[test]
fn test_probability_to_score() {
    assert_eq!(probability_to_score(0.0), 99.0);
    assert_eq!(probability_to_score(1.0), 1.0);
    assert!((probability_to_score(0.25) - 75.0).abs() < 1e-9);
    assert_eq!(probability_to_score(-3.0), 99.0);
    assert_eq!(probability_to_score(7.0), 1.0);
    assert_eq!(probability_to_score(f64::NAN), 50.0);
    assert_eq!(probability_to_score(f64::INFINITY), 50.0);
}

#[test]
fn test_filter_case_insensitive() {
    let roster = mock_roster();

    let reno = filter_providers(&roster, "RENO");
    assert_eq!(reno.len(), 1);
    assert_eq!(reno[0].key, "1588667638");

    let general = filter_providers(&roster, "general acute");
    assert_eq!(general.len(), 2);

    assert_eq!(filter_providers(&roster, "").len(), roster.len());
    assert!(filter_providers(&roster, "no such hospital").is_empty());
}

#[test]
fn test_filter_preserves_order() {
    let roster = vec![
        provider("b", "Beta Hospital", "Austin", "Rehab", 70.0),
        provider("a", "Alpha Hospital", "Austin", "Rehab", 70.0),
        provider("c", "Gamma Clinic", "Dallas", "Rehab", 70.0),
    ];
    let keys: Vec<_> = filter_providers(&roster, "hospital")
        .iter()
        .map(|p| p.key.as_str())
        .collect();
    assert_eq!(keys, vec!["b", "a"]);
}

#[test]
fn test_high_risk_toggle() {
    let roster = mock_roster();
    let query = ProviderQuery {
        query: None,
        high_risk_only: true,
    };
    let high = query.apply(&roster);
    assert_eq!(high.len(), 2);
    assert!(high.iter().all(|p| p.risk_level() == RiskLevel::High));

    let query = ProviderQuery {
        query: Some("memphis".to_string()),
        high_risk_only: true,
    };
    assert_eq!(query.apply(&roster).len(), 1);
}

#[test]
fn test_summary_of_mock_roster() {
    let roster = mock_roster();
    let summary = DashboardSummary::compute(&roster, &AlertConfig::default());

    assert_eq!(summary.provider_count, 8);
    assert_eq!(summary.buckets.low, 3);
    assert_eq!(summary.buckets.moderate, 3);
    assert_eq!(summary.buckets.high, 2);
    assert_eq!(summary.buckets.total(), 8);
    assert_eq!(summary.alert_count, 4);

    let expected_avg = roster.iter().map(|p| p.risk_score).sum::<f64>() / 8.0;
    assert!((summary.average_risk_score - expected_avg).abs() < 1e-9);
}

#[test]
fn test_summary_empty() {
    let summary = DashboardSummary::compute(&[], &AlertConfig::default());
    assert_eq!(summary.provider_count, 0);
    assert_eq!(summary.average_risk_score, 0.0);
    assert_eq!(summary.average_predicted_denial_rate, 0.0);
    assert_eq!(summary.alert_count, 0);
}

#[test]
fn test_forecast_trend() {
    let mut p = provider("k", "Test", "City", "Spec", 70.0);
    p.historical_denial_rate = 0.10;

    p.predicted_denial_rate = 0.125;
    assert_eq!(p.forecast().trend, Trend::Rising);

    p.predicted_denial_rate = 0.105;
    assert_eq!(p.forecast().trend, Trend::Stable);

    p.predicted_denial_rate = 0.08;
    let f = p.forecast();
    assert_eq!(f.trend, Trend::Falling);
    assert!((f.delta + 0.02).abs() < 1e-9);
}

#[test]
fn test_alerts_sorted_by_severity_then_key() {
    let roster = mock_roster();
    let list = alerts(&roster, &AlertConfig::default());

    let summary: Vec<_> = list
        .iter()
        .map(|a| (a.severity, a.kind, a.provider_key.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (AlertSeverity::Critical, AlertKind::HighRisk, "1346291850"),
            (AlertSeverity::Critical, AlertKind::HighRisk, "1972583016"),
            (AlertSeverity::Warning, AlertKind::RisingDenials, "1225034817"),
            (AlertSeverity::Warning, AlertKind::RisingDenials, "1346291850"),
        ]
    );
}

#[test]
fn test_alert_threshold_is_configurable() {
    let roster = mock_roster();
    let strict = AlertConfig {
        trend_threshold: 0.01,
    };
    let rising = alerts(&roster, &strict)
        .into_iter()
        .filter(|a| a.kind == AlertKind::RisingDenials)
        .count();
    // Riverbend (+1.6 pp) joins Valley and Summit
    assert_eq!(rising, 3);
}

#[test]
fn test_load_roster_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("providers.json");
    let roster = vec![provider("x1", "Test Hospital", "Omaha", "Rehab", 42.0)];
    std::fs::write(&path, serde_json::to_string(&roster).unwrap()).unwrap();

    let loaded = load_roster(&path).unwrap();
    assert_eq!(loaded, roster);
}

#[test]
fn test_load_roster_rejects_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("providers.json");
    let roster = vec![provider("x1", "Test Hospital", "Omaha", "Rehab", 142.0)];
    std::fs::write(&path, serde_json::to_string(&roster).unwrap()).unwrap();

    match load_roster(&path) {
        Err(DashboardError::InvalidProvider { key, .. }) => assert_eq!(key, "x1"),
        other => panic!("Expected InvalidProvider, got {:?}", other),
    }

    assert!(matches!(
        load_roster(dir.path().join("missing.json")),
        Err(DashboardError::Io(_))
    ));
}

#[test]
fn test_features_default_when_absent() {
    let json = r#"[{"key":"k","name":"n","city":"c","specialty":"s",
        "risk_score":60,"historical_denial_rate":0.1,"predicted_denial_rate":0.2}]"#;
    let providers: Vec<Provider> = serde_json::from_str(json).unwrap();
    assert!(providers[0].features.is_empty());
}

fn arb_provider() -> impl Strategy<Value = Provider> {
    ("[a-zA-Z ]{0,12}", "[a-zA-Z ]{0,8}", "[a-zA-Z ]{0,10}", 0.0f64..=100.0).prop_map(
        |(name, city, specialty, score)| provider("k", &name, &city, &specialty, score),
    )
}

proptest! {
    #[test]
    fn prop_filter_is_exact_subset(
        roster in prop::collection::vec(arb_provider(), 0..12),
        query in "[a-zA-Z ]{0,3}",
    ) {
        let needle = query.to_lowercase();
        let result = filter_providers(&roster, &query);
        let expected: Vec<&Provider> = roster
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.city.to_lowercase().contains(&needle)
                    || p.specialty.to_lowercase().contains(&needle)
            })
            .collect();
        prop_assert_eq!(result, expected);
    }

    #[test]
    fn prop_score_monotonic(a in -0.5f64..1.5, b in -0.5f64..1.5) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(probability_to_score(lo) >= probability_to_score(hi));
        let s = probability_to_score(a);
        prop_assert!((risk::MIN_SCORE..=risk::MAX_SCORE).contains(&s));
    }

    #[test]
    fn prop_buckets_partition(roster in prop::collection::vec(arb_provider(), 0..20)) {
        let summary = DashboardSummary::compute(&roster, &AlertConfig::default());
        prop_assert_eq!(summary.buckets.total(), roster.len());
        let high = roster.iter().filter(|p| p.risk_score < 50.0).count();
        prop_assert_eq!(summary.buckets.high, high);
    }
}
