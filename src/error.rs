use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while decoding a FITS primary HDU.
#[derive(Debug, Error)]
pub enum FitsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid FITS format: {0}")]
    InvalidFormat(String),

    #[error("unsupported BITPIX: {0}")]
    UnsupportedBitpix(i64),

    #[error("missing required keyword: {0}")]
    MissingKeyword(String),
}

/// A spectrum could not be turned into a [`Spectrum`](crate::data::model::Spectrum).
///
/// Batch drivers treat every variant as "skip this input and carry on".
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decoding FITS data: {0}")]
    Fits(#[from] FitsError),

    #[error("decoding JSON spectrum: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("header is missing required keyword '{0}'")]
    MissingKeyword(String),

    #[error("file carries no flux samples")]
    NoData,

    #[error("invalid dispersion: COEFF0={init}, COEFF1={disp}")]
    InvalidDispersion { init: f64, disp: f64 },

    #[error("flux has {flux} samples but wavelength has {wavelength}")]
    LengthMismatch { flux: usize, wavelength: usize },
}

/// Configuration could not be read or is internally inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Non-fatal conditions met while computing one spectrum's features.
///
/// The affected value is written as the sentinel `0` in dense output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureWarning {
    #[error("feature '{feature}': window [{low}, {high}] selects no samples")]
    EmptyWindow { feature: String, low: f64, high: f64 },

    #[error("feature '{feature}': computed value {value} is not finite")]
    InvalidValue { feature: String, value: f64 },

    #[error("feature '{feature}': only {points} usable baseline points")]
    InsufficientBaseline { feature: String, points: usize },
}

impl FeatureWarning {
    /// Name of the feature the warning refers to.
    pub fn feature(&self) -> &str {
        match self {
            FeatureWarning::EmptyWindow { feature, .. }
            | FeatureWarning::InvalidValue { feature, .. }
            | FeatureWarning::InsufficientBaseline { feature, .. } => feature,
        }
    }
}
