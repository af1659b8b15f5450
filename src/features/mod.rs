//! Feature computation over cleaned spectra.
//!
//! ```text
//!   raw Spectrum ──► smoothing (d1, d2, d3) ──► clean ──► extract
//!                                                          │
//!                         continuum magnitudes ◄───────────┤
//!                         line equivalent widths ◄─────────┤
//!                         colour indices ◄─────────────────┘
//! ```

pub mod extract;
pub mod numeric;
pub mod smoothing;
pub mod spec;

pub use extract::{extract_features, FeatureExtractor};
pub use smoothing::{smoothing_diagnostics, SmoothingDiagnostics};
pub use spec::{ColourIndex, FeatureKind, FeatureSpec, FeatureWindow};
