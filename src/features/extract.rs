use std::ops::Range;
use std::path::Path;

use log::{debug, warn};

use super::numeric::{fit_line, nan_mean, nan_sum, trapezoid};
use super::smoothing::{roughness, NARROW_WIDTH, WIDE_WIDTH};
use super::spec::{ColourIndex, FeatureKind, FeatureSpec, FeatureWindow};
use crate::config::{ExtractorConfig, FLANK_POINTS};
use crate::data::filter::{clean_with_band, ARTIFACT_BAND};
use crate::data::loader;
use crate::data::model::{
    trailing_columns, FeatureVector, Spectrum, DIAGNOSTIC_COLUMNS, SNR_KEYWORDS, TOTAL_COUNTS_COLUMN,
};
use crate::error::{ConfigError, FeatureWarning, LoadError};

// ---------------------------------------------------------------------------
// FeatureExtractor – full per-spectrum pipeline
// ---------------------------------------------------------------------------

/// Computes the feature vector of a raw spectrum:
/// smoothing diagnostics on the raw flux, then cleaning, then the window
/// features and colour indices on the cleaned flux.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    spec: FeatureSpec,
    colour_indices: Vec<ColourIndex>,
    narrow_width: usize,
    wide_width: usize,
    flank_points: usize,
    artifact_band: (f64, f64),
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        FeatureExtractor {
            spec: FeatureSpec::lamost_default(),
            colour_indices: super::spec::lamost_colour_indices(),
            narrow_width: NARROW_WIDTH,
            wide_width: WIDE_WIDTH,
            flank_points: FLANK_POINTS,
            artifact_band: ARTIFACT_BAND,
        }
    }
}

impl FeatureExtractor {
    /// Extractor over `spec` with default smoothing and no colour indices.
    pub fn new(spec: FeatureSpec) -> Self {
        FeatureExtractor {
            spec,
            colour_indices: Vec::new(),
            ..Default::default()
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(FeatureExtractor {
            spec: config.feature_spec()?,
            colour_indices: config.colour_index_list(),
            narrow_width: config.narrow_width,
            wide_width: config.wide_width,
            flank_points: config.flank_points,
            artifact_band: config.artifact_band(),
        })
    }

    pub fn with_colour_indices(mut self, indices: Vec<ColourIndex>) -> Result<Self, ConfigError> {
        for index in &indices {
            index.check(&self.spec)?;
        }
        self.colour_indices = indices;
        Ok(self)
    }

    /// Numeric output columns: features, `d1..d3`, colour indices,
    /// `totalCounts`, then the header SNRs.
    pub fn column_names(&self) -> Vec<String> {
        self.spec
            .names()
            .into_iter()
            .chain(DIAGNOSTIC_COLUMNS.iter().map(|c| c.to_string()))
            .chain(self.colour_indices.iter().map(ColourIndex::name))
            .chain(trailing_columns())
            .collect()
    }

    /// Load a file and compute its features.
    pub fn process_file(&self, path: &Path) -> Result<FeatureVector, LoadError> {
        let spectrum = loader::load(path)?;
        Ok(self.process(&spectrum))
    }

    /// Compute every feature of a raw (uncleaned) spectrum.
    pub fn process(&self, raw: &Spectrum) -> FeatureVector {
        let cleaned = clean_with_band(raw, self.artifact_band);
        let diagnostics = roughness(&raw.flux, &cleaned.flux, self.narrow_width, self.wide_width);

        let mut vector = measure(&cleaned, &self.spec, self.flank_points);

        for (slot, (name, value)) in DIAGNOSTIC_COLUMNS
            .iter()
            .zip(diagnostics.as_array())
            .enumerate()
        {
            vector.diagnostics[slot] = checked(name, value, raw.identifier(), &mut vector.warnings);
        }

        vector.colour_indices = self
            .colour_indices
            .iter()
            .map(|index| {
                let blue = lookup(&vector.features, &index.blue);
                let red = lookup(&vector.features, &index.red);
                let value = match (blue, red) {
                    (Some(b), Some(r)) => Some(b - r),
                    _ => None,
                };
                (index.name(), value)
            })
            .collect();

        debug!(
            "{}: {} features, {} warnings",
            raw.identifier(),
            vector.features.len(),
            vector.warnings.len()
        );
        vector
    }
}

fn lookup(values: &[(String, Option<f64>)], name: &str) -> Option<f64> {
    values.iter().find(|(n, _)| n == name).and_then(|(_, v)| *v)
}

// ---------------------------------------------------------------------------
// Window features
// ---------------------------------------------------------------------------

/// Window features, total counts and header SNRs of an already cleaned
/// spectrum, with the default number of baseline points. Diagnostics and
/// colour indices are left empty; use [`FeatureExtractor::process`] for the
/// full vector.
pub fn extract_features(spectrum: &Spectrum, spec: &FeatureSpec) -> FeatureVector {
    measure(spectrum, spec, FLANK_POINTS)
}

fn measure(spectrum: &Spectrum, spec: &FeatureSpec, flank_points: usize) -> FeatureVector {
    let id = spectrum.identifier();
    let mut warnings = Vec::new();

    let features = spec
        .iter()
        .map(|window| {
            let value = measure_window(spectrum, window, flank_points, id, &mut warnings);
            (window.name.clone(), value)
        })
        .collect();

    let total_counts = checked(TOTAL_COUNTS_COLUMN, nan_sum(&spectrum.flux), id, &mut warnings);
    let snr = SNR_KEYWORDS.map(|key| {
        spectrum
            .metadata
            .snr
            .get(key)
            .copied()
            .filter(|v| v.is_finite())
    });

    FeatureVector {
        features,
        diagnostics: [None; 3],
        colour_indices: Vec::new(),
        total_counts,
        snr,
        metadata: spectrum.metadata.clone(),
        warnings,
    }
}

fn measure_window(
    spectrum: &Spectrum,
    window: &FeatureWindow,
    flank_points: usize,
    id: &str,
    warnings: &mut Vec<FeatureWarning>,
) -> Option<f64> {
    let sel = select_window(&spectrum.wavelength, window.low, window.high);
    if sel.is_empty() {
        let warning = FeatureWarning::EmptyWindow {
            feature: window.name.clone(),
            low: window.low,
            high: window.high,
        };
        warn!("{id}: {warning}");
        warnings.push(warning);
        return None;
    }

    let value = match window.kind {
        FeatureKind::Continuum => continuum_magnitude(&spectrum.flux[sel]),
        FeatureKind::Line => {
            match equivalent_width(&spectrum.wavelength, &spectrum.flux, sel, flank_points) {
                Ok(ew) => ew,
                Err(points) => {
                    let warning = FeatureWarning::InsufficientBaseline {
                        feature: window.name.clone(),
                        points,
                    };
                    warn!("{id}: {warning}");
                    warnings.push(warning);
                    return None;
                }
            }
        }
    };

    checked(&window.name, value, id, warnings)
}

/// Keep finite values; anything else becomes `None` plus a warning.
fn checked(name: &str, value: f64, id: &str, warnings: &mut Vec<FeatureWarning>) -> Option<f64> {
    if value.is_finite() {
        return Some(value);
    }
    let warning = FeatureWarning::InvalidValue {
        feature: name.to_string(),
        value,
    };
    warn!("{id}: {warning}");
    warnings.push(warning);
    None
}

/// Indices with `low < λ < high` on a strictly increasing axis.
pub fn select_window(wavelength: &[f64], low: f64, high: f64) -> Range<usize> {
    let start = wavelength.partition_point(|&w| w <= low);
    let end = wavelength.partition_point(|&w| w < high);
    start..end.max(start)
}

/// `-2.5 log10` of the NaN-ignoring mean flux.
pub fn continuum_magnitude(flux: &[f64]) -> f64 {
    -2.5 * nan_mean(flux).log10()
}

/// Equivalent width of the line covering `sel`.
///
/// A straight continuum is fitted through up to `flank_points` samples on
/// each side of the window (NaN flux dropped). The width is
/// `(continuumArea − lineArea) / continuumArea × (λ_last − λ_first)`, so
/// absorption lines are positive.
///
/// Fails with the number of usable baseline points when fewer than two remain.
/// An empty or out-of-range selection yields NaN.
pub fn equivalent_width(
    wavelength: &[f64],
    flux: &[f64],
    sel: Range<usize>,
    flank_points: usize,
) -> Result<f64, usize> {
    let n = wavelength.len().min(flux.len());
    if sel.is_empty() || sel.end > n {
        return Ok(f64::NAN);
    }
    // Flanks stop short of the window on both sides; the last selected
    // sample belongs to the line, not the baseline.
    let left = sel.start.saturating_sub(flank_points)..sel.start;
    let right = sel.end..(sel.end + flank_points).min(n);

    let (base_w, base_f): (Vec<f64>, Vec<f64>) = left
        .chain(right)
        .map(|i| (wavelength[i], flux[i]))
        .filter(|(_, f)| !f.is_nan())
        .unzip();

    let (slope, intercept) = fit_line(&base_w, &base_f).ok_or(base_w.len())?;

    let w = &wavelength[sel.clone()];
    let first = w[0];
    let last = w[w.len() - 1];
    let width = last - first;

    let line_area = trapezoid(&flux[sel], w);
    let continuum_area = (slope * (first + last) + 2.0 * intercept) * width / 2.0;

    Ok((continuum_area - line_area) / continuum_area * width)
}
