//! Feature extraction for FITS stellar spectra.
//!
//! Each spectrum is loaded, cleaned, and reduced to a fixed set of numbers
//! (continuum magnitudes, line equivalent widths, colour indices and
//! smoothing diagnostics) ready for an external modelling step.

pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod output;

pub use config::ExtractorConfig;
pub use data::filter::clean;
pub use data::loader::load;
pub use data::model::{FeatureTable, FeatureVector, Spectrum, SpectrumMetadata};
pub use error::{ConfigError, FeatureWarning, FitsError, LoadError};
pub use features::{extract_features, smoothing_diagnostics, FeatureExtractor, FeatureSpec};
