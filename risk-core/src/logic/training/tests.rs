use std::fs;
use std::time::{Duration, SystemTime};

use tempfile::tempdir;

use super::artifacts::{artifact_timestamp, ENCODERS_PREFIX, METADATA_PREFIX};
use super::metrics::{average_precision, roc_auc};
use super::params::scale_pos_weight;
use super::predict::encode_rows;
use super::prepare::median;
use super::split::{stratified_split, take_labels, take_rows};
use super::*;
use crate::logic::dataset::Table;
use crate::logic::model::{BandConfig, Booster, RiskBand};

const FIXTURE: &str = include_str!("../model/fixtures/denial_model.json");

fn booster() -> Booster {
    Booster::from_json_str(FIXTURE).unwrap()
}

fn table(csv: &str) -> Table {
    Table::from_reader(csv.as_bytes(), None).unwrap()
}

const FEATURES: &str = "\
NPI,state,days_since_update,is_deactivated,likely_denied
1000000001,TX,10,0,0
1000000002,,,1,1
1000000003,CA,30,0,0
";

// ============================================================================
// Encoding / preparation
// ============================================================================

#[test]
fn test_label_encoder_sorted_with_missing_class() {
    let encoder = LabelEncoder::fit([Some("TX"), None, Some("CA"), Some("TX")]);
    assert_eq!(encoder.classes, vec!["CA", "TX", "nan"]);
    assert_eq!(encoder.transform(Some("TX")), Some(1));
    assert_eq!(encoder.transform(None), Some(2));
    assert_eq!(encoder.transform(Some("NY")), None);
    assert_eq!(encoder.transform_or_zero(Some("NY")), 0);
}

#[test]
fn test_label_encoders_persist() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("encoders.json");

    let mut encoders = LabelEncoders::default();
    encoders.insert("region", LabelEncoder::fit([Some("West"), Some("South")]));
    encoders.save(&path).unwrap();

    let loaded = LabelEncoders::load(&path).unwrap();
    assert_eq!(loaded, encoders);
    assert_eq!(loaded.columns().collect::<Vec<_>>(), vec!["region"]);

    // plain column -> classes map on disk
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["region"]["classes"][0], "South");
}

#[test]
fn test_median() {
    assert_eq!(median([3.0, 1.0, 2.0]), Some(2.0));
    assert_eq!(median([4.0, 1.0, 3.0, 2.0]), Some(2.5));
    assert_eq!(median([f64::NAN, 5.0]), Some(5.0));
    assert_eq!(median(Vec::<f64>::new()), None);
}

#[test]
fn test_prepare_data_excludes_encodes_and_imputes() {
    let prepared = prepare_data(&table(FEATURES)).unwrap();

    assert_eq!(prepared.feature_columns, vec!["state", "days_since_update"]);
    assert_eq!(prepared.target, vec![0, 1, 0]);
    assert_eq!(prepared.features.dim(), (3, 2));

    // state: CA=0, TX=1, nan=2
    assert_eq!(prepared.features[[0, 0]], 1.0);
    assert_eq!(prepared.features[[1, 0]], 2.0);
    assert_eq!(prepared.features[[2, 0]], 0.0);

    // median of 10 and 30
    assert_eq!(prepared.features[[1, 1]], 20.0);
    assert_eq!(prepared.medians["days_since_update"], 20.0);

    assert!(prepared.encoders.get("state").is_some());
    assert!(prepared.encoders.get("days_since_update").is_none());
    assert_eq!(prepared.positives(), 1);
    assert!((prepared.positive_rate() - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_feature_columns_skip_claims_outcomes() {
    let merged = table(
        "NPI,total_claims,total_denials,denial_rate,claim_date_min,claim_date_max,\
         most_common_denial_reason,avg_claim_amount,claim_denial_risk,likely_denied\n",
    );
    assert_eq!(
        prepare::feature_columns(&merged),
        vec!["total_claims", "avg_claim_amount"]
    );
}

#[test]
fn test_prepare_data_all_missing_numeric_is_zero() {
    let prepared = prepare_data(&table("score,likely_denied\n,0\n,1\n")).unwrap();
    // no present cells -> treated as numeric with fill 0
    assert_eq!(prepared.features.column(0).to_vec(), vec![0.0, 0.0]);
}

#[test]
fn test_prepare_data_rejects_bad_target() {
    let err = prepare_data(&table("a,likely_denied\n1,0\n2,yes\n")).unwrap_err();
    assert!(matches!(err, TrainingError::InvalidTarget { row: 1 }));

    let err = prepare_data(&table("a\n1\n")).unwrap_err();
    assert!(matches!(err, TrainingError::Dataset(_)));
}

// ============================================================================
// Splits / params
// ============================================================================

fn imbalanced_labels() -> Vec<u8> {
    // 90 negatives, 10 positives
    (0..100).map(|i| u8::from(i % 10 == 0)).collect()
}

#[test]
fn test_splits_are_stratified_and_disjoint() {
    let labels = imbalanced_labels();
    let splits = Splits::new(&labels, split::DEFAULT_SEED);

    assert_eq!(splits.test.len(), 20);
    assert_eq!(splits.validation.len(), 16);
    assert_eq!(splits.train.len(), 64);

    let positives = |idx: &[usize]| idx.iter().filter(|&&i| labels[i] == 1).count();
    assert_eq!(positives(&splits.test), 2);
    assert_eq!(positives(&splits.validation), 2);
    assert_eq!(positives(&splits.train), 6);

    let mut all: Vec<usize> = splits
        .train
        .iter()
        .chain(&splits.validation)
        .chain(&splits.test)
        .copied()
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..100).collect::<Vec<_>>());
}

#[test]
fn test_splits_reproducible_for_seed() {
    let labels = imbalanced_labels();
    assert_eq!(Splits::new(&labels, 42), Splits::new(&labels, 42));
    assert_ne!(Splits::new(&labels, 42).test, Splits::new(&labels, 7).test);
}

#[test]
fn test_stratified_split_sorted_output() {
    use rand::SeedableRng;
    let labels = vec![0, 1, 0, 1, 0, 1, 0, 1, 0, 1];
    let all: Vec<usize> = (0..10).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    let (kept, held) = stratified_split(&all, &labels, 0.2, &mut rng);
    assert_eq!(held.len(), 2);
    assert_eq!(kept.len(), 8);
    assert!(held.windows(2).all(|w| w[0] < w[1]));
    assert!(kept.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_take_rows_and_labels() {
    let x = ndarray::array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]];
    let picked = take_rows(&x, &[2, 0]);
    assert_eq!(picked, ndarray::array![[5.0f32, 6.0], [1.0, 2.0]]);
    assert_eq!(take_labels(&[0, 1, 1], &[2, 0]), vec![1, 0]);
}

#[test]
fn test_scale_pos_weight() {
    let labels = imbalanced_labels();
    assert_eq!(scale_pos_weight(&labels, true, false), 9.0);
    assert_eq!(scale_pos_weight(&labels, false, false), 1.0);
    assert!((scale_pos_weight(&labels, true, true) - 1.8).abs() < 1e-12);
    assert_eq!(scale_pos_weight(&[0, 0, 0], true, false), 1.0);
}

#[test]
fn test_training_params_serialize_for_trainer() {
    let params = TrainingParams::for_labels(&imbalanced_labels(), true, false);
    assert_eq!(params.scale_pos_weight, 9.0);
    assert_eq!(params.smote_ratio, None);

    let json = serde_json::to_value(&params).unwrap();
    assert_eq!(json["max_depth"], 6);
    assert_eq!(json["objective"], "binary:logistic");
    assert_eq!(json["random_state"], 42);
}

// ============================================================================
// Metrics / evaluation
// ============================================================================

#[test]
fn test_confusion_matrix_layout() {
    let cm = ConfusionMatrix::from_predictions(&[0, 0, 1, 1, 1], &[0, 1, 1, 0, 1]);
    assert_eq!(cm.as_rows(), [[1, 1], [1, 2]]);
    assert_eq!(cm.total(), 5);
}

#[test]
fn test_ranking_metrics() {
    let labels = [0, 0, 1, 1];
    let scores = [0.1, 0.4, 0.35, 0.8];
    assert!((roc_auc(&labels, &scores).unwrap() - 0.75).abs() < 1e-12);
    assert!((average_precision(&labels, &scores).unwrap() - 5.0 / 6.0).abs() < 1e-12);

    // all tied -> chance
    assert_eq!(roc_auc(&labels, &[0.5; 4]), Some(0.5));

    assert_eq!(roc_auc(&[1, 1], &[0.2, 0.9]), None);
    assert_eq!(average_precision(&[0, 0], &[0.2, 0.9]), None);
}

#[test]
fn test_classification_metrics_zero_division() {
    let metrics = ClassificationMetrics::compute(&[0, 1, 0], &[0.1, 0.2, 0.3], 0.5);
    assert_eq!(metrics.precision, 0.0);
    assert_eq!(metrics.recall, 0.0);
    assert_eq!(metrics.f1, 0.0);
    assert!((metrics.accuracy - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_classification_metrics_threshold_is_exclusive() {
    let metrics = ClassificationMetrics::compute(&[1, 0], &[0.5, 0.2], 0.5);
    assert_eq!(metrics.recall, 0.0);
    assert_eq!(metrics.roc_auc, Some(1.0));
}

/// completeness, licenses, days_since_update
fn design() -> (ndarray::Array2<f32>, Vec<u8>) {
    let x = ndarray::array![
        [0.5f32, 0.0, 100.0], // margin 0.9
        [0.9, 2.0, 100.0],    // margin -0.5
        [0.95, 0.0, 400.0],   // margin 0.5
        [0.9, 3.0, 30.0],     // margin -0.5
    ];
    (x, vec![1, 0, 1, 0])
}

#[test]
fn test_evaluate_fixture_checkpoint() {
    let (x, y) = design();
    let columns: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
    let report = evaluate(
        &booster(),
        EvaluationSet { features: &x, labels: &y },
        EvaluationSet { features: &x, labels: &y },
        &columns,
        0.5,
    )
    .unwrap();

    assert_eq!(report.metrics.test.accuracy, 1.0);
    assert_eq!(report.metrics.test.roc_auc, Some(1.0));
    assert_eq!(report.test_confusion_matrix.as_rows(), [[2, 0], [0, 2]]);
    assert_eq!(report.best_iteration, Some(1));
    assert_eq!(report.best_score, Some(0.91));

    // checkpoint carries names, so those win over `columns`
    assert_eq!(report.feature_importance[0].feature, "data_completeness_score");
    let total: f64 = report.feature_importance.iter().map(|f| f.importance).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn test_evaluate_maps_unnamed_features() {
    let unnamed = FIXTURE.replace(
        r#""feature_names": ["data_completeness_score", "num_licenses", "days_since_update"],"#,
        "",
    );
    let booster = Booster::from_json_str(&unnamed).unwrap();
    let (x, y) = design();
    let columns: Vec<String> = vec!["comp".into(), "lic".into(), "days".into()];

    let report = evaluate(
        &booster,
        EvaluationSet { features: &x, labels: &y },
        EvaluationSet { features: &x, labels: &y },
        &columns,
        0.5,
    )
    .unwrap();
    assert_eq!(report.feature_importance[0].feature, "comp");
}

#[test]
fn test_evaluate_rejects_narrow_matrix() {
    let x = ndarray::array![[0.5f32, 1.0]];
    let err = evaluate(
        &booster(),
        EvaluationSet { features: &x, labels: &[1] },
        EvaluationSet { features: &x, labels: &[1] },
        &[],
        0.5,
    )
    .unwrap_err();
    assert!(matches!(err, TrainingError::Shape(_)));
}

// ============================================================================
// Artifacts
// ============================================================================

fn metadata(timestamp: &str) -> ModelMetadata {
    let (x, y) = design();
    let report = evaluate(
        &booster(),
        EvaluationSet { features: &x, labels: &y },
        EvaluationSet { features: &x, labels: &y },
        &[],
        0.5,
    )
    .unwrap();
    let mut meta = ModelMetadata::new(
        vec!["data_completeness_score".into(), "num_licenses".into()],
        report.metrics,
        report.best_iteration,
        report.best_score,
    );
    meta.timestamp = timestamp.to_string();
    meta
}

fn touch(path: &std::path::Path, age: Duration) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

#[test]
fn test_save_artifacts_names_and_contents() {
    let dir = tempdir().unwrap();
    let meta = metadata("20260101_120000");
    let saved = save_artifacts(dir.path(), &LabelEncoders::default(), &meta).unwrap();

    assert!(saved.encoders.ends_with("label_encoders_20260101_120000.json"));
    assert!(saved.metadata.ends_with("model_metadata_20260101_120000.json"));

    let loaded = ModelMetadata::load(&saved.metadata).unwrap();
    assert_eq!(loaded, meta);
    assert_eq!(loaded.n_features, 2);
    assert_eq!(loaded.model_type, "XGBoost");
}

#[test]
fn test_timestamp_format() {
    let ts = artifacts::timestamp();
    assert_eq!(ts.len(), 15);
    assert_eq!(&ts[8..9], "_");
    assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
}

#[test]
fn test_latest_artifact_by_mtime() {
    let dir = tempdir().unwrap();
    let older = dir.path().join("model_metadata_20990101_000000.json");
    let newer = dir.path().join("model_metadata_20200101_000000.json");
    fs::write(&older, "{}").unwrap();
    fs::write(&newer, "{}").unwrap();
    fs::write(dir.path().join("model_metadata_notes.txt"), "").unwrap();
    touch(&older, Duration::from_secs(3600));
    touch(&newer, Duration::from_secs(60));

    // modification time wins over the name
    assert_eq!(latest_artifact(dir.path(), METADATA_PREFIX), Some(newer.clone()));
    assert_eq!(latest_artifact(dir.path(), ENCODERS_PREFIX), None);
    assert_eq!(
        artifact_timestamp(&newer, METADATA_PREFIX).as_deref(),
        Some("20200101_000000")
    );
    assert_eq!(latest_artifact(dir.path().join("missing"), METADATA_PREFIX), None);
}

#[test]
fn test_load_latest_encoders_pairs_with_metadata() {
    let dir = tempdir().unwrap();

    let mut first = LabelEncoders::default();
    first.insert("state", LabelEncoder::fit([Some("TX")]));
    let a = save_artifacts(dir.path(), &first, &metadata("20260101_000000")).unwrap();

    let mut second = LabelEncoders::default();
    second.insert("state", LabelEncoder::fit([Some("CA"), Some("TX")]));
    let b = save_artifacts(dir.path(), &second, &metadata("20260201_000000")).unwrap();

    touch(&a.encoders, Duration::from_secs(600));
    touch(&a.metadata, Duration::from_secs(600));
    touch(&b.metadata, Duration::from_secs(60));
    // stray encoders newer than every metadata file
    touch(&b.encoders, Duration::from_secs(60));
    let stray = dir.path().join("label_encoders_stray.json");
    LabelEncoders::default().save(&stray).unwrap();

    assert_eq!(load_latest_encoders(dir.path()).unwrap(), second);
    let meta = load_latest_metadata(dir.path()).unwrap().unwrap();
    assert_eq!(meta.timestamp, "20260201_000000");
}

#[test]
fn test_load_latest_encoders_empty_dir() {
    let dir = tempdir().unwrap();
    assert!(load_latest_encoders(dir.path()).unwrap().0.is_empty());
    assert!(load_latest_metadata(dir.path()).unwrap().is_none());
}

// ============================================================================
// NPI prediction
// ============================================================================

const NPI_TABLE: &str = "\
NPI,data_completeness_score,num_licenses,days_since_update
1111111111,0.5,0,100
2222222222.0,0.9,2,100
3333333333,0.95,,400
4444444444,0.1,9,1
";

fn npis(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_predict_npis_bands_and_imputes() {
    let booster = booster();
    let columns = prediction_columns(&booster, None);
    let predictions = predict_npis(
        &table(NPI_TABLE),
        &npis(&["1111111111", "2222222222", "3333333333.0", "9999999999"]),
        &booster,
        &columns,
        &LabelEncoders::default(),
        &BandConfig::default(),
    )
    .unwrap();

    assert_eq!(predictions.len(), 3);
    let by_npi: Vec<&str> = predictions.iter().map(|p| p.npi.as_str()).collect();
    assert_eq!(by_npi, vec!["1111111111", "2222222222", "3333333333"]);

    // margin 0.9
    // p = 0.7109495, reported to four decimals
    assert_eq!(predictions[0].predicted_risk, 0.7109);
    assert_eq!(predictions[0].risk_level, RiskBand::High);
    assert_eq!(predictions[0].predicted_class, 1);

    // margin -0.5
    assert_eq!(predictions[1].risk_level, RiskBand::Medium);
    assert_eq!(predictions[1].predicted_class, 0);

    // licenses imputed with the median of the selected rows (0, 2) = 1 -> margin 0.1
    assert_eq!(predictions[2].predicted_risk, 0.525);
    assert_eq!(predictions[2].predicted_class, 1);
    assert_eq!(
        predictions[2].interpretation,
        "Medium risk provider. Probability of issues: 52.5%"
    );
}

#[test]
fn test_npi_index_normalizes_and_keeps_first_row() {
    let t = table("NPI,x\n1111111111,1\n2222222222.0,2\n1111111111,3\n,4\n");
    let index = NpiIndex::build(&t).unwrap();

    assert_eq!(index.len(), 2);
    assert_eq!(index.get("1111111111"), Some(0));
    assert_eq!(index.get("2222222222"), Some(1));
    assert_eq!(index.get(" 2222222222.0 "), Some(1));
    assert_eq!(index.get("3333333333"), None);

    let no_npi = table("id,x\n1,2\n");
    assert!(matches!(
        NpiIndex::build(&no_npi),
        Err(TrainingError::Dataset(_))
    ));
}

#[test]
fn test_feature_table_matches_one_off_prediction() {
    let booster = booster();
    let columns = prediction_columns(&booster, None);
    let requested = npis(&["4444444444", "1111111111", "4444444444"]);

    let features = FeatureTable::new(table(NPI_TABLE)).unwrap();
    assert_eq!(features.index().len(), 4);
    let indexed = features
        .predict(
            &requested,
            &booster,
            &columns,
            &LabelEncoders::default(),
            &BandConfig::default(),
        )
        .unwrap();
    let one_off = predict_npis(
        features.table(),
        &requested,
        &booster,
        &columns,
        &LabelEncoders::default(),
        &BandConfig::default(),
    )
    .unwrap();

    assert_eq!(indexed, one_off);
    // duplicates collapse, request order kept
    let order: Vec<&str> = indexed.iter().map(|p| p.npi.as_str()).collect();
    assert_eq!(order, vec!["4444444444", "1111111111"]);
}

#[test]
fn test_predict_npis_none_found() {
    let booster = booster();
    let err = predict_npis(
        &table(NPI_TABLE),
        &npis(&["123"]),
        &booster,
        &prediction_columns(&booster, None),
        &LabelEncoders::default(),
        &BandConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, TrainingError::NoMatchingNpis));
}

#[test]
fn test_encode_rows_uses_saved_encoders() {
    let t = table("NPI,state,extra\n1,TX,5\n2,ZZ,\n");
    let mut encoders = LabelEncoders::default();
    encoders.insert("state", LabelEncoder::fit([Some("CA"), Some("TX")]));
    let columns = npis(&["state", "missing", "extra"]);

    let x = encode_rows(&t, &[0, 1], &columns, &encoders);
    // TX=1, unseen ZZ -> 0
    assert_eq!(x.column(0).to_vec(), vec![1.0, 0.0]);
    assert_eq!(x.column(1).to_vec(), vec![0.0, 0.0]);
    assert_eq!(x.column(2).to_vec(), vec![5.0, 5.0]);
}

#[test]
fn test_prediction_columns_fallbacks() {
    let unnamed = Booster::from_json_str(&FIXTURE.replace(
        r#""feature_names": ["data_completeness_score", "num_licenses", "days_since_update"],"#,
        "",
    ))
    .unwrap();

    let meta = metadata("20260101_000000");
    assert_eq!(
        prediction_columns(&unnamed, Some(&meta)),
        vec!["data_completeness_score", "num_licenses"]
    );
    assert_eq!(
        prediction_columns(&unnamed, None).len(),
        crate::logic::model::EXPECTED_FEATURES.len()
    );
    assert_eq!(prediction_columns(&booster(), Some(&meta)).len(), 3);
}

#[test]
fn test_write_predictions_csv() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out").join(PREDICTIONS_FILE);
    let booster = booster();
    let predictions = predict_npis(
        &table(NPI_TABLE),
        &npis(&["1111111111"]),
        &booster,
        &prediction_columns(&booster, None),
        &LabelEncoders::default(),
        &BandConfig::default(),
    )
    .unwrap();

    write_predictions(&path, &predictions).unwrap();
    let written = table(&fs::read_to_string(&path).unwrap());
    assert_eq!(
        written.headers(),
        &["npi", "predicted_risk", "predicted_class", "risk_level", "interpretation"]
    );
    assert_eq!(written.get(0, "risk_level"), Some("High"));
    assert_eq!(written.get(0, "npi"), Some("1111111111"));
}
