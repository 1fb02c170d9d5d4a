//! Seeded stratified splits

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

pub const DEFAULT_SEED: u64 = 42;
pub const TEST_FRACTION: f64 = 0.2;
pub const VALIDATION_FRACTION: f64 = 0.2;

/// Split `indices` so each class keeps its share in the held-out part.
/// Returns (kept, held_out), each sorted ascending.
pub fn stratified_split(
    indices: &[usize],
    labels: &[u8],
    held_out_fraction: f64,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let mut kept = Vec::new();
    let mut held_out = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| labels[i] == class)
            .collect();
        members.shuffle(rng);

        let n_held = (members.len() as f64 * held_out_fraction).round() as usize;
        held_out.extend_from_slice(&members[..n_held]);
        kept.extend_from_slice(&members[n_held..]);
    }

    kept.sort_unstable();
    held_out.sort_unstable();
    (kept, held_out)
}

/// Row indices for train / validation / test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Splits {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

impl Splits {
    /// Test first, then validation out of what is left
    pub fn new(labels: &[u8], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let all: Vec<usize> = (0..labels.len()).collect();
        let (rest, test) = stratified_split(&all, labels, TEST_FRACTION, &mut rng);
        let (train, validation) = stratified_split(&rest, labels, VALIDATION_FRACTION, &mut rng);

        log::info!(
            "Split {} rows: train {}, validation {}, test {}",
            labels.len(),
            train.len(),
            validation.len(),
            test.len()
        );
        Self {
            train,
            validation,
            test,
        }
    }
}

pub fn take_rows(x: &Array2<f32>, indices: &[usize]) -> Array2<f32> {
    x.select(Axis(0), indices)
}

pub fn take_labels(labels: &[u8], indices: &[usize]) -> Vec<u8> {
    indices.iter().map(|&i| labels[i]).collect()
}
