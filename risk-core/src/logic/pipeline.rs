//! Pipeline - Batch stages over NPPES data
//!
//! process -> features -> [claims | uhc] -> prepare -> (external fit) ->
//! evaluate -> predict. Every stage reads the previous stage's file so stages
//! can be rerun alone.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::constants;
use crate::logic::dataset::table::format_number;
use crate::logic::dataset::{self, DatasetError, ProcessSummary, Table, PROCESSED_FILE};
use crate::logic::enrich::{
    self, column_mean, ClaimsSummary, EnrichError, UhcSummary, CLAIMS_FILE, UHC_FILE,
};
use crate::logic::features::{self, FeatureError, TargetSource, FEATURES_FILE, TARGET_COLUMN};
use crate::logic::model::{BandConfig, Booster, ModelError};
use crate::logic::training::{
    self, checkpoint_path, prepare_data, EvaluationReport, EvaluationSet, ModelMetadata,
    NpiPrediction, PreparedData, SavedArtifacts, Splits, TrainingError, TrainingParams,
};

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Features(#[from] FeatureError),

    #[error(transparent)]
    Enrich(#[from] EnrichError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No checkpoint at {0}; run the trainer on the prepared splits first")]
    CheckpointMissing(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

// ============================================================================
// PATHS
// ============================================================================

pub const TRAINING_DIR: &str = "training";
pub const PARAMS_FILE: &str = "training_params.json";
pub const EVALUATION_FILE: &str = "evaluation.json";
const SPLIT_NAMES: [&str; 3] = ["train", "validation", "test"];

#[derive(Debug, Clone)]
pub struct PipelinePaths {
    /// Raw NPPES dissemination file
    pub raw_file: PathBuf,
    pub data_dir: PathBuf,
    pub models_dir: PathBuf,
    /// Table to train and score from instead of the plain feature file,
    /// e.g. the claims-merged output
    pub training_table: Option<PathBuf>,
}

impl PipelinePaths {
    pub fn new(
        raw_file: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        models_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            raw_file: raw_file.into(),
            data_dir: data_dir.into(),
            models_dir: models_dir.into(),
            training_table: None,
        }
    }

    pub fn with_training_table(mut self, path: Option<PathBuf>) -> Self {
        self.training_table = path;
        self
    }

    pub fn from_env() -> Self {
        Self::new(
            Path::new(&constants::get_nppes_data_path()).join(constants::get_npi_file()),
            constants::get_data_dir(),
            constants::get_models_dir(),
        )
    }

    pub fn processed(&self) -> PathBuf {
        self.data_dir.join(PROCESSED_FILE)
    }

    pub fn features(&self) -> PathBuf {
        self.data_dir.join(FEATURES_FILE)
    }

    pub fn claims(&self) -> PathBuf {
        self.data_dir.join(CLAIMS_FILE)
    }

    pub fn uhc(&self) -> PathBuf {
        self.data_dir.join(UHC_FILE)
    }

    /// Input of prepare, evaluate and predict
    pub fn training_input(&self) -> PathBuf {
        self.training_table.clone().unwrap_or_else(|| self.features())
    }

    pub fn training_dir(&self) -> PathBuf {
        self.data_dir.join(TRAINING_DIR)
    }

    pub fn split_file(&self, split: &str) -> PathBuf {
        self.training_dir().join(format!("{}.csv", split))
    }

    pub fn params(&self) -> PathBuf {
        self.training_dir().join(PARAMS_FILE)
    }

    pub fn evaluation(&self) -> PathBuf {
        self.training_dir().join(EVALUATION_FILE)
    }

    pub fn checkpoint(&self) -> PathBuf {
        checkpoint_path(&self.models_dir)
    }

    pub fn predictions(&self) -> PathBuf {
        self.data_dir.join(training::PREDICTIONS_FILE)
    }
}

// ============================================================================
// STAGES
// ============================================================================

/// Raw registry file -> `hospitals_processed.csv`
pub fn process(paths: &PipelinePaths, sample_size: Option<usize>) -> PipelineResult<ProcessSummary> {
    log::info!("Loading NPPES data from {}", paths.raw_file.display());
    let mut table = Table::read_csv(&paths.raw_file, sample_size)?;
    let summary = dataset::nppes::process(&mut table)?;
    table.write_csv(paths.processed())?;

    log::info!(
        "Processed {} rows: {} organizations, {} hospitals by taxonomy",
        summary.rows_read,
        summary.organizations,
        summary.hospitals_by_taxonomy
    );
    Ok(summary)
}

/// `hospitals_processed.csv` -> `hospitals_features.csv`
pub fn engineer(paths: &PipelinePaths, today: NaiveDate) -> PipelineResult<TargetSource> {
    let table = Table::read_csv(paths.processed(), None)?;
    let engineered = features::engineer(table, today)?;
    engineered.table.write_csv(paths.features())?;
    log::info!("Saved features to {}", paths.features().display());
    Ok(engineered.target)
}

/// Feature table if the features stage has run
fn existing_features(paths: &PipelinePaths) -> PipelineResult<Option<Table>> {
    let path = paths.features();
    if !path.exists() {
        log::warn!(
            "No feature table at {}; writing provider aggregates only",
            path.display()
        );
        return Ok(None);
    }
    Ok(Some(Table::read_csv(path, None)?))
}

/// Claims CSV -> `hospitals_with_claims.csv` with the observed-denial target
pub fn merge_claims(paths: &PipelinePaths, claims_file: &Path) -> PipelineResult<ClaimsSummary> {
    let claims = enrich::load_claims(claims_file)?;
    let provider_claims = enrich::aggregate_claims(&claims)?;
    let average_denial_rate = column_mean(&provider_claims, features::target::DENIAL_RATE);
    log::info!(
        "{} providers with claims, average denial rate {:.2}%",
        provider_claims.len(),
        average_denial_rate * 100.0
    );

    let mut summary = ClaimsSummary {
        claims: claims.len(),
        providers: provider_claims.len(),
        average_denial_rate,
        merged: None,
        positive_rate: None,
    };

    fs::create_dir_all(&paths.data_dir)?;
    let output = match existing_features(paths)? {
        Some(features) => {
            let merged = enrich::merge_claims(&features, &provider_claims)?;
            summary.merged = Some(merged.len());
            summary.positive_rate = Some(column_mean(&merged, TARGET_COLUMN));
            merged
        }
        None => provider_claims,
    };
    output.write_csv(paths.claims())?;
    log::info!("Saved claims data to {}", paths.claims().display());
    Ok(summary)
}

/// Local UHC rate file -> `hospitals_with_uhc.csv` with `uhc_*` columns
pub fn merge_uhc(paths: &PipelinePaths, rates_file: &Path) -> PipelineResult<UhcSummary> {
    let rates = enrich::load_rates(rates_file)?;
    let provider_rates = enrich::aggregate_rates(&rates);

    let mut summary = UhcSummary {
        rate_records: rates.records.len(),
        providers: provider_rates.len(),
        merged: None,
        in_network: None,
    };

    fs::create_dir_all(&paths.data_dir)?;
    let output = match existing_features(paths)? {
        Some(features) => {
            let merged = enrich::merge_uhc(&features, &provider_rates)?;
            summary.merged = Some(merged.len());
            summary.in_network = Some(
                merged
                    .numeric_column(enrich::uhc::IN_NETWORK)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|v| *v == Some(1.0))
                    .count(),
            );
            merged
        }
        None => provider_rates,
    };
    output.write_csv(paths.uhc())?;
    log::info!("Saved UHC data to {}", paths.uhc().display());
    Ok(summary)
}

#[derive(Debug, Clone, Serialize)]
pub struct PrepareSummary {
    pub rows: usize,
    pub features: usize,
    pub positive_rate: f64,
    pub train: usize,
    pub validation: usize,
    pub test: usize,
    pub params: TrainingParams,
}

fn load_prepared(paths: &PipelinePaths) -> PipelineResult<(PreparedData, Splits)> {
    let input = paths.training_input();
    log::info!("Loading training table {}", input.display());
    let table = Table::read_csv(input, None)?;
    let prepared = prepare_data(&table)?;
    let splits = Splits::new(&prepared.target, training::split::DEFAULT_SEED);
    Ok((prepared, splits))
}

/// Design matrix rows plus the label column
fn split_table(prepared: &PreparedData, rows: &[usize]) -> Table {
    let mut headers = prepared.feature_columns.clone();
    headers.push(TARGET_COLUMN.to_string());

    let mut table = Table::new(headers);
    for &i in rows {
        let mut cells: Vec<Option<String>> = prepared
            .features
            .row(i)
            .iter()
            .map(|v| Some(format_number(f64::from(*v))))
            .collect();
        cells.push(Some(prepared.target[i].to_string()));
        table.push_row(cells);
    }
    table
}

/// Features -> encoded train/validation/test CSVs and trainer parameters
pub fn prepare(
    paths: &PipelinePaths,
    use_class_weights: bool,
    use_smote: bool,
) -> PipelineResult<PrepareSummary> {
    let (prepared, splits) = load_prepared(paths)?;
    fs::create_dir_all(paths.training_dir())?;

    for (name, rows) in SPLIT_NAMES
        .iter()
        .zip([&splits.train, &splits.validation, &splits.test])
    {
        split_table(&prepared, rows).write_csv(paths.split_file(name))?;
    }

    let train_labels = training::split::take_labels(&prepared.target, &splits.train);
    let params = TrainingParams::for_labels(&train_labels, use_class_weights, use_smote);
    fs::write(paths.params(), serde_json::to_string_pretty(&params)?)?;
    log::info!(
        "Wrote splits and parameters to {} (scale_pos_weight {:.2})",
        paths.training_dir().display(),
        params.scale_pos_weight
    );

    Ok(PrepareSummary {
        rows: prepared.target.len(),
        features: prepared.feature_columns.len(),
        positive_rate: prepared.positive_rate(),
        train: splits.train.len(),
        validation: splits.validation.len(),
        test: splits.test.len(),
        params,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationOutcome {
    pub report: EvaluationReport,
    pub artifacts: SavedArtifacts,
}

/// Score the trainer's checkpoint on the same splits and record artifacts
pub fn evaluate(paths: &PipelinePaths, threshold: f64) -> PipelineResult<EvaluationOutcome> {
    let checkpoint = paths.checkpoint();
    if !checkpoint.exists() {
        return Err(PipelineError::CheckpointMissing(checkpoint.display().to_string()));
    }
    let booster = Booster::load(&checkpoint)?;
    let (prepared, splits) = load_prepared(paths)?;

    let x_train = training::split::take_rows(&prepared.features, &splits.train);
    let y_train = training::split::take_labels(&prepared.target, &splits.train);
    let x_test = training::split::take_rows(&prepared.features, &splits.test);
    let y_test = training::split::take_labels(&prepared.target, &splits.test);

    let report = training::evaluate(
        &booster,
        EvaluationSet {
            features: &x_train,
            labels: &y_train,
        },
        EvaluationSet {
            features: &x_test,
            labels: &y_test,
        },
        &prepared.feature_columns,
        threshold,
    )?;

    fs::create_dir_all(paths.training_dir())?;
    fs::write(paths.evaluation(), serde_json::to_string_pretty(&report)?)?;

    let metadata = ModelMetadata::new(
        prepared.feature_columns.clone(),
        report.metrics.clone(),
        report.best_iteration,
        report.best_score,
    );
    let artifacts = training::save_artifacts(&paths.models_dir, &prepared.encoders, &metadata)?;

    Ok(EvaluationOutcome { report, artifacts })
}

/// Score the given NPIs from the feature table with the current checkpoint
pub fn predict(
    paths: &PipelinePaths,
    npis: &[String],
    output: Option<&Path>,
) -> PipelineResult<Vec<NpiPrediction>> {
    let checkpoint = paths.checkpoint();
    if !checkpoint.exists() {
        return Err(PipelineError::CheckpointMissing(checkpoint.display().to_string()));
    }
    let booster = Booster::load(&checkpoint)?;
    let metadata = training::load_latest_metadata(&paths.models_dir)?;
    let encoders = training::load_latest_encoders(&paths.models_dir)?;
    let columns = training::prediction_columns(&booster, metadata.as_ref());

    let table = Table::read_csv(paths.training_input(), None)?;
    let predictions = training::predict_npis(
        &table,
        npis,
        &booster,
        &columns,
        &encoders,
        &BandConfig::default(),
    )?;

    let output = output.map(Path::to_path_buf).unwrap_or_else(|| paths.predictions());
    training::write_predictions(&output, &predictions)?;
    Ok(predictions)
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub processed: ProcessSummary,
    pub target: String,
    pub prepared: PrepareSummary,
    /// Present when a checkpoint was already available
    pub evaluation: Option<EvaluationReport>,
}

/// Every stage in order. Evaluation runs only when a checkpoint exists.
pub fn run(paths: &PipelinePaths, sample_size: Option<usize>) -> PipelineResult<RunSummary> {
    log::info!("[1/4] Processing NPPES data");
    let processed = process(paths, sample_size)?;

    log::info!("[2/4] Engineering features");
    let target = engineer(paths, Local::now().date_naive())?;

    log::info!("[3/4] Preparing training data");
    let prepared = prepare(paths, true, true)?;

    log::info!("[4/4] Evaluating checkpoint");
    let evaluation = match evaluate(paths, BandConfig::default().decision_threshold) {
        Ok(outcome) => Some(outcome.report),
        Err(PipelineError::CheckpointMissing(path)) => {
            log::warn!(
                "No checkpoint at {}; fit the model on {} and rerun evaluate",
                path,
                paths.training_dir().display()
            );
            None
        }
        Err(e) => return Err(e),
    };

    Ok(RunSummary {
        processed,
        target: target.to_string(),
        prepared,
        evaluation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const RAW: &str = "\
NPI,Entity Type Code,Provider Organization Name (Legal Business Name),Healthcare Provider Taxonomy Code_1,Provider Business Practice Location Address State Name,Provider Enumeration Date,Last Update Date
1000000001,1,,207Q00000X,TX,05/23/2005,07/08/2007
1000000002,2,GENERAL HOSPITAL,282N00000X,TX,05/23/2005,01/15/2024
1000000003,2,VALLEY CLINIC,261QM0801X,CA,2010-03-01,
1000000004,2,,,NY,06/01/2012,
1000000005,2,LAKE HOSPITAL,282N00000X,IL,01/01/2015,03/03/2025
1000000006,2,,,,01/01/2016,
";

    const MODEL: &str = include_str!("model/fixtures/denial_model.json");

    fn workspace() -> (tempfile::TempDir, PipelinePaths) {
        let dir = tempdir().unwrap();
        let raw = dir.path().join("npidata.csv");
        fs::write(&raw, RAW).unwrap();
        let paths = PipelinePaths::new(raw, dir.path().join("data"), dir.path().join("models"));
        (dir, paths)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 8).unwrap()
    }

    #[test]
    fn test_process_then_engineer() {
        let (_dir, paths) = workspace();
        let summary = process(&paths, None).unwrap();
        assert_eq!(summary.rows_read, 6);
        assert_eq!(summary.organizations, 5);
        assert_eq!(summary.hospitals_by_taxonomy, 2);
        assert!(paths.processed().exists());

        let target = engineer(&paths, today()).unwrap();
        assert_eq!(target, TargetSource::MissingCriticalFields);

        let features = Table::read_csv(paths.features(), None).unwrap();
        assert_eq!(features.len(), 5);
        assert!(features.has_column(TARGET_COLUMN));
    }

    #[test]
    fn test_process_missing_raw_file() {
        let (_dir, mut paths) = workspace();
        paths.raw_file = paths.data_dir.join("absent.csv");
        let err = process(&paths, None).unwrap_err();
        assert!(matches!(err, PipelineError::Dataset(DatasetError::NotFound(_))));
    }

    #[test]
    fn test_prepare_writes_splits_and_params() {
        let (_dir, paths) = workspace();
        process(&paths, None).unwrap();
        engineer(&paths, today()).unwrap();

        let summary = prepare(&paths, true, false).unwrap();
        assert_eq!(summary.rows, 5);
        assert_eq!(summary.train + summary.validation + summary.test, 5);

        for name in SPLIT_NAMES {
            let split = Table::read_csv(paths.split_file(name), None).unwrap();
            assert_eq!(split.headers().last().map(String::as_str), Some(TARGET_COLUMN));
            assert_eq!(split.headers().len(), summary.features + 1);
        }
        let params: TrainingParams =
            serde_json::from_str(&fs::read_to_string(paths.params()).unwrap()).unwrap();
        assert_eq!(params, summary.params);
    }

    #[test]
    fn test_evaluate_requires_checkpoint() {
        let (_dir, paths) = workspace();
        let err = evaluate(&paths, 0.5).unwrap_err();
        assert!(matches!(err, PipelineError::CheckpointMissing(_)));
    }

    #[test]
    fn test_run_without_checkpoint_stops_before_evaluation() {
        let (_dir, paths) = workspace();
        let summary = run(&paths, None).unwrap();
        assert_eq!(summary.processed.organizations, 5);
        assert!(summary.evaluation.is_none());
        assert!(paths.params().exists());
    }

    const CLAIMS: &str = "\
NPI,claim_id,claim_amount,denial_status,denial_reason
1000000002,c1,100,denied,CO-16
1000000002,c2,300,approved,
1000000003,c3,50,approved,
1000000003,c4,50,approved,
1000000099,c5,10,denied,CO-97
";

    #[test]
    fn test_merge_claims_onto_features() {
        let (dir, paths) = workspace();
        process(&paths, None).unwrap();
        engineer(&paths, today()).unwrap();
        let claims = dir.path().join("claims.csv");
        fs::write(&claims, CLAIMS).unwrap();

        let summary = merge_claims(&paths, &claims).unwrap();
        assert_eq!(summary.claims, 5);
        assert_eq!(summary.providers, 3);
        // (0.5 + 0 + 1) / 3
        assert!((summary.average_denial_rate - 0.5).abs() < 1e-12);
        // 1000000099 is not a feature row
        assert_eq!(summary.merged, Some(2));
        assert_eq!(summary.positive_rate, Some(0.5));

        let merged = Table::read_csv(paths.claims(), None).unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged.has_column(enrich::claims::CLAIM_DENIAL_RISK));

        // the merged table feeds prepare when selected
        let claims_table = paths.claims();
        let paths = paths.with_training_table(Some(claims_table));
        let prepared = prepare(&paths, false, false).unwrap();
        assert_eq!(prepared.rows, 2);
        assert_eq!(prepared.positive_rate, 0.5);
    }

    #[test]
    fn test_merge_claims_without_features_writes_aggregates() {
        let (dir, paths) = workspace();
        let claims = dir.path().join("claims.csv");
        fs::write(&claims, CLAIMS).unwrap();

        let summary = merge_claims(&paths, &claims).unwrap();
        assert_eq!(summary.merged, None);
        assert_eq!(summary.positive_rate, None);

        let aggregates = Table::read_csv(paths.claims(), None).unwrap();
        assert_eq!(aggregates.len(), 3);
        assert!(!aggregates.has_column(TARGET_COLUMN));
    }

    #[test]
    fn test_merge_claims_bad_file() {
        let (dir, paths) = workspace();
        let claims = dir.path().join("claims.csv");
        fs::write(&claims, "NPI,amount\n1,2\n").unwrap();
        let err = merge_claims(&paths, &claims).unwrap_err();
        assert!(matches!(err, PipelineError::Enrich(EnrichError::MissingColumns(_))));
    }

    #[test]
    fn test_merge_uhc_onto_features() {
        let (dir, paths) = workspace();
        process(&paths, None).unwrap();
        engineer(&paths, today()).unwrap();
        let rates = dir.path().join("rates.csv");
        fs::write(
            &rates,
            "NPI,service_code,negotiated_rate\n\
             1000000002,99213,100\n\
             1000000002,99214,300\n\
             1000000005,99213,150\n",
        )
        .unwrap();

        let summary = merge_uhc(&paths, &rates).unwrap();
        assert_eq!(summary.rate_records, 3);
        assert_eq!(summary.providers, 2);
        assert_eq!(summary.merged, Some(5));
        assert_eq!(summary.in_network, Some(2));

        let merged = Table::read_csv(paths.uhc(), None).unwrap();
        assert!(merged.has_column(enrich::uhc::INCOMPLETE_DATA));
        assert!(merged.has_column(enrich::uhc::UNUSUAL_PRICING));
        // every feature row has a value after the zero fill
        assert!(merged
            .numeric_column(enrich::uhc::TOTAL_RATES)
            .unwrap()
            .iter()
            .all(Option::is_some));
    }

    #[test]
    fn test_predict_with_checkpoint() {
        let (_dir, paths) = workspace();
        fs::create_dir_all(paths.checkpoint().parent().unwrap()).unwrap();
        fs::write(paths.checkpoint(), MODEL).unwrap();

        fs::create_dir_all(&paths.data_dir).unwrap();
        fs::write(
            paths.features(),
            "NPI,data_completeness_score,num_licenses,days_since_update\n1000000002,0.5,0,100\n",
        )
        .unwrap();

        let predictions = predict(&paths, &["1000000002".to_string()], None).unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].risk_level, crate::logic::model::RiskBand::High);
        assert!(paths.predictions().exists());
    }
}
