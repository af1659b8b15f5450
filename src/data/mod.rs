//! Data layer: core types, loading, and cleaning.
//!
//! Architecture:
//! ```text
//!  .fits / .fit / .json
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file (via fits) → Spectrum
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Spectrum  │  wavelength, flux, header metadata
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  mask negative flux and the overlap band → NaN
//!   └──────────┘
//! ```

pub mod filter;
pub mod fits;
pub mod loader;
pub mod model;
