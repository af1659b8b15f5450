use std::collections::BTreeMap;
use std::fmt;

use crate::error::{FeatureWarning, LoadError};

// ---------------------------------------------------------------------------
// HeaderValue – a single header card value
// ---------------------------------------------------------------------------

/// A dynamically-typed header value mirroring the FITS card value types.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::String(s) => write!(f, "{s}"),
            HeaderValue::Integer(i) => write!(f, "{i}"),
            HeaderValue::Float(v) => write!(f, "{v}"),
            HeaderValue::Bool(b) => write!(f, "{b}"),
            HeaderValue::Null => write!(f, "<null>"),
        }
    }
}

impl HeaderValue {
    /// Interpret the value as an `f64`. Integers widen; strings do not parse.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(v) => Some(*v),
            HeaderValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Render the value as a label. Numbers are accepted as well because
    /// some surveys write numeric designations.
    pub fn as_label(&self) -> Option<String> {
        match self {
            HeaderValue::String(s) => Some(s.clone()),
            HeaderValue::Integer(i) => Some(i.to_string()),
            HeaderValue::Float(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SpectrumMetadata – scalar header fields carried through to the output
// ---------------------------------------------------------------------------

/// Header keywords holding per-band signal-to-noise ratios.
pub const SNR_KEYWORDS: [&str; 5] = ["SN_U", "SN_G", "SN_R", "SN_I", "SN_Z"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrumMetadata {
    /// Object designation with the survey prefix removed.
    pub designation: String,
    /// Original file name as recorded by the pipeline (`FILENAME`/`FNAME`).
    pub filename: String,
    /// Pipeline classification (`CLASS`).
    pub spectral_class: String,
    /// Path the spectrum was read from, if it came from disk.
    pub source: Option<String>,
    /// Signal-to-noise ratio per photometric band, when present.
    pub snr: BTreeMap<String, f64>,
    /// Every parsed header card.
    pub header: BTreeMap<String, HeaderValue>,
}

impl SpectrumMetadata {
    /// Identifier used in logs and failure reports.
    pub fn identifier(&self) -> &str {
        if !self.designation.is_empty() {
            &self.designation
        } else if !self.filename.is_empty() {
            &self.filename
        } else {
            self.source.as_deref().unwrap_or("<unnamed>")
        }
    }
}

// ---------------------------------------------------------------------------
// Spectrum – one input file
// ---------------------------------------------------------------------------

/// A single spectrum: flux sampled on a log-linear wavelength grid.
#[derive(Debug, Clone)]
pub struct Spectrum {
    /// Wavelength axis in Ångström, strictly increasing.
    pub wavelength: Vec<f64>,
    /// Flux samples – same length as `wavelength`.
    pub flux: Vec<f64>,
    pub metadata: SpectrumMetadata,
}

impl Spectrum {
    /// Pair an explicit wavelength axis with flux samples.
    pub fn new(
        wavelength: Vec<f64>,
        flux: Vec<f64>,
        metadata: SpectrumMetadata,
    ) -> Result<Self, LoadError> {
        if wavelength.len() != flux.len() {
            return Err(LoadError::LengthMismatch {
                flux: flux.len(),
                wavelength: wavelength.len(),
            });
        }
        Ok(Spectrum {
            wavelength,
            flux,
            metadata,
        })
    }

    /// Build the wavelength axis from the dispersion coefficients
    /// `COEFF0` (`init`) and `COEFF1` (`disp`).
    pub fn from_dispersion(
        flux: Vec<f64>,
        init: f64,
        disp: f64,
        metadata: SpectrumMetadata,
    ) -> Result<Self, LoadError> {
        if !init.is_finite() || !disp.is_finite() || disp <= 0.0 {
            return Err(LoadError::InvalidDispersion { init, disp });
        }
        let wavelength = log_linear_wavelength(init, disp, flux.len());
        // A step below the float resolution of `init` collapses the axis.
        if wavelength.windows(2).any(|w| w[1] <= w[0]) {
            return Err(LoadError::InvalidDispersion { init, disp });
        }
        Spectrum::new(wavelength, flux, metadata)
    }

    pub fn len(&self) -> usize {
        self.flux.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flux.is_empty()
    }

    pub fn identifier(&self) -> &str {
        self.metadata.identifier()
    }
}

/// `wavelength[i] = 10^(init + disp * i)` for `i` in `0..n`.
pub fn log_linear_wavelength(init: f64, disp: f64, n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 10f64.powf(init + disp * i as f64))
        .collect()
}

// ---------------------------------------------------------------------------
// FeatureVector – the computed features of one spectrum
// ---------------------------------------------------------------------------

/// Metadata columns appended after the numeric columns of every row.
pub const METADATA_COLUMNS: [&str; 3] = ["FILENAME", "designation", "CLASS"];

/// Names of the smoothing diagnostics columns.
pub const DIAGNOSTIC_COLUMNS: [&str; 3] = ["d1", "d2", "d3"];

/// NaN-ignoring sum of the cleaned flux.
pub const TOTAL_COUNTS_COLUMN: &str = "totalCounts";

/// Collapse an optional value to the dense-table contract: anything that
/// could not be computed, or is not finite, becomes exactly `0`.
pub fn sentinel(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Features of one spectrum. `None` marks a value that could not be computed;
/// every `Some` holds a finite number.
#[derive(Debug, Clone, Default)]
pub struct FeatureVector {
    /// Window features in feature-spec order.
    pub features: Vec<(String, Option<f64>)>,
    /// Smoothing roughness diagnostics `d1`, `d2`, `d3`.
    pub diagnostics: [Option<f64>; 3],
    /// Colour indices (difference of two continuum magnitudes).
    pub colour_indices: Vec<(String, Option<f64>)>,
    pub total_counts: Option<f64>,
    /// Header signal-to-noise ratios in [`SNR_KEYWORDS`] order.
    pub snr: [Option<f64>; 5],
    pub metadata: SpectrumMetadata,
    pub warnings: Vec<FeatureWarning>,
}

impl FeatureVector {
    /// Look up any numeric column by name, as its dense value.
    pub fn get(&self, name: &str) -> Option<f64> {
        if let Some(pos) = DIAGNOSTIC_COLUMNS.iter().position(|c| *c == name) {
            return Some(sentinel(self.diagnostics[pos]));
        }
        if name == TOTAL_COUNTS_COLUMN {
            return Some(sentinel(self.total_counts));
        }
        if let Some(pos) = SNR_KEYWORDS.iter().position(|k| *k == name) {
            return Some(sentinel(self.snr[pos]));
        }
        self.features
            .iter()
            .chain(self.colour_indices.iter())
            .find(|(n, _)| n == name)
            .map(|(_, v)| sentinel(*v))
    }

    /// Numeric column names in output order.
    pub fn column_names(&self) -> Vec<String> {
        self.features
            .iter()
            .map(|(n, _)| n.clone())
            .chain(DIAGNOSTIC_COLUMNS.iter().map(|c| c.to_string()))
            .chain(self.colour_indices.iter().map(|(n, _)| n.clone()))
            .chain(trailing_columns())
            .collect()
    }

    /// Numeric values in output order with the sentinel rule applied.
    pub fn dense(&self) -> Vec<f64> {
        self.features
            .iter()
            .map(|(_, v)| sentinel(*v))
            .chain(self.diagnostics.iter().map(|v| sentinel(*v)))
            .chain(self.colour_indices.iter().map(|(_, v)| sentinel(*v)))
            .chain(std::iter::once(sentinel(self.total_counts)))
            .chain(self.snr.iter().map(|v| sentinel(*v)))
            .collect()
    }

    /// Metadata cells in [`METADATA_COLUMNS`] order.
    pub fn metadata_cells(&self) -> [&str; 3] {
        [
            &self.metadata.filename,
            &self.metadata.designation,
            &self.metadata.spectral_class,
        ]
    }
}

/// Columns that follow the colour indices in every row.
pub fn trailing_columns() -> impl Iterator<Item = String> {
    std::iter::once(TOTAL_COUNTS_COLUMN)
        .chain(SNR_KEYWORDS)
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// FeatureTable – rows ready for serialisation
// ---------------------------------------------------------------------------

/// Feature vectors of many spectra sharing one column layout.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    /// Numeric column names (metadata columns are implied).
    pub columns: Vec<String>,
    /// One row per successfully processed spectrum, in input order.
    pub rows: Vec<FeatureVector>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>) -> Self {
        FeatureTable {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from vectors produced by the same extractor.
    pub fn from_vectors(columns: Vec<String>, rows: Vec<FeatureVector>) -> Self {
        FeatureTable { columns, rows }
    }

    /// All column headers, numeric first then metadata.
    pub fn headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .cloned()
            .chain(METADATA_COLUMNS.iter().map(|c| c.to_string()))
            .collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
