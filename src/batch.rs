//! Processing many spectra at once.
//!
//! A failing input never stops the batch: it is recorded in
//! [`BatchReport::failures`] and the remaining inputs are processed. Rows
//! keep the order of the input paths, also when spread over threads.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;

use crate::data::loader::is_supported;
use crate::data::model::{FeatureTable, FeatureVector};
use crate::error::LoadError;
use crate::features::FeatureExtractor;

/// An input that could not be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a batch: the rows that succeeded and the inputs that did not.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub table: FeatureTable,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    /// Number of warnings attached to successful rows.
    pub fn warning_count(&self) -> usize {
        self.table.rows.iter().map(|r| r.warnings.len()).sum()
    }
}

/// Extract features from every path.
///
/// `jobs` is the number of worker threads; `0` or `1` runs on the calling
/// thread.
pub fn process_paths(paths: &[PathBuf], extractor: &FeatureExtractor, jobs: usize) -> Result<BatchReport> {
    let results: Vec<Result<FeatureVector, LoadError>> = if jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("building worker pool")?;
        pool.install(|| {
            paths
                .par_iter()
                .map(|p| extractor.process_file(p))
                .collect()
        })
    } else {
        paths.iter().map(|p| extractor.process_file(p)).collect()
    };

    let mut report = BatchReport {
        table: FeatureTable::new(extractor.column_names()),
        failures: Vec::new(),
    };

    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(vector) => report.table.rows.push(vector),
            Err(e) => {
                warn!("Failed for file {}: {e}", path.display());
                report.failures.push(BatchFailure {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "processed {} spectra: {} ok, {} failed",
        paths.len(),
        report.table.len(),
        report.failures.len()
    );
    Ok(report)
}

/// The `index`-th chunk of `size` paths; empty past the end.
pub fn select_batch(paths: &[PathBuf], index: usize, size: usize) -> &[PathBuf] {
    let start = index.saturating_mul(size).min(paths.len());
    let end = start.saturating_add(size).min(paths.len());
    &paths[start..end]
}

/// Supported spectrum files directly inside `dir`, sorted by path.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_supported(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Expand directories into their spectrum files; plain files pass through.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            paths.extend(discover(input)?);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}
