//! Boxcar smoothing and the roughness diagnostics `d1`, `d2`, `d3`.
//!
//! Two smoothed copies of the raw flux (narrow and wide box) are compared
//! against the cleaned flux and against each other. Larger values mean more
//! small-scale structure relative to a smooth continuum.

use log::debug;

use super::numeric::nan_mean;
use crate::data::filter::{mask_flux, ARTIFACT_BAND};
use crate::data::model::Spectrum;

/// Default narrow box width in samples.
pub const NARROW_WIDTH: usize = 10;
/// Default wide box width in samples; also the number of samples trimmed
/// from each end before comparing.
pub const WIDE_WIDTH: usize = 100;

/// Roughness of one spectrum, each normalised by its mean cleaned flux.
/// Values may be NaN or infinite when they cannot be computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingDiagnostics {
    /// mean |cleaned − narrow| / mean flux
    pub d1: f64,
    /// mean |cleaned − wide| / mean flux
    pub d2: f64,
    /// mean |narrow − wide| / mean flux
    pub d3: f64,
}

impl SmoothingDiagnostics {
    pub fn as_array(&self) -> [f64; 3] {
        [self.d1, self.d2, self.d3]
    }
}

/// Weights of a centred box of exact width `width` samples.
///
/// Odd widths give `width` equal taps. Even widths give `width + 1` taps
/// with half weight on both ends, so the box stays centred on a sample.
/// Weights are left unnormalised.
pub fn boxcar_kernel(width: usize) -> Vec<f64> {
    let width = width.max(1);
    if width % 2 == 1 {
        vec![1.0; width]
    } else {
        let mut kernel = vec![1.0; width + 1];
        kernel[0] = 0.5;
        kernel[width] = 0.5;
        kernel
    }
}

/// Moving average of `signal` with a centred box of `width` samples.
///
/// NaN samples are skipped and the remaining weights renormalised. Positions
/// beyond either end count as zero-valued samples.
pub fn boxcar_smooth(signal: &[f64], width: usize) -> Vec<f64> {
    let kernel = boxcar_kernel(width);
    let half = kernel.len() / 2;
    let n = signal.len();

    (0..n)
        .map(|i| {
            // Accumulate offsets from the centre sample so flat regions
            // reproduce exactly.
            let anchor = if signal[i].is_finite() { signal[i] } else { 0.0 };
            let mut acc = 0.0;
            let mut weight = 0.0;
            for (k, &w) in kernel.iter().enumerate() {
                let value = match (i + k).checked_sub(half) {
                    Some(j) if j < n => signal[j],
                    _ => 0.0,
                };
                if value.is_nan() {
                    continue;
                }
                acc += w * (value - anchor);
                weight += w;
            }
            if weight > 0.0 {
                anchor + acc / weight
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Roughness diagnostics with the default artifact band.
///
/// Smoothing runs on the raw flux, including negative and artifact-band
/// samples; the comparisons and the normalising mean use the cleaned flux.
pub fn smoothing_diagnostics(spectrum: &Spectrum, narrow_width: usize, wide_width: usize) -> SmoothingDiagnostics {
    let cleaned = mask_flux(&spectrum.wavelength, &spectrum.flux, ARTIFACT_BAND);
    roughness(&spectrum.flux, &cleaned, narrow_width, wide_width)
}

/// Core of [`smoothing_diagnostics`] for an already cleaned copy of `raw`.
///
/// All three series are trimmed by `wide_width` samples on both ends; a
/// spectrum with no samples left yields NaN for every diagnostic.
pub fn roughness(raw: &[f64], cleaned: &[f64], narrow_width: usize, wide_width: usize) -> SmoothingDiagnostics {
    let narrow = boxcar_smooth(raw, narrow_width);
    let wide = boxcar_smooth(raw, wide_width);

    let n = raw.len().min(cleaned.len());
    let trimmed = if n > 2 * wide_width {
        wide_width..n - wide_width
    } else {
        debug!("spectrum of {n} samples is too short to trim {wide_width} from each end");
        0..0
    };

    let cleaned_t = &cleaned[trimmed.clone()];
    let narrow_t = &narrow[trimmed.clone()];
    let wide_t = &wide[trimmed];

    let total = nan_mean(cleaned);

    SmoothingDiagnostics {
        d1: mean_abs_diff(cleaned_t, narrow_t) / total,
        d2: mean_abs_diff(cleaned_t, wide_t) / total,
        d3: mean_abs_diff(narrow_t, wide_t) / total,
    }
}

fn mean_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    nan_mean(a.iter().zip(b).map(|(x, y)| (x - y).abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{log_linear_wavelength, SpectrumMetadata};
    use proptest::prelude::*;

    fn spectrum(flux: Vec<f64>) -> Spectrum {
        let wavelength = log_linear_wavelength(3.6, 1e-4, flux.len());
        Spectrum::new(wavelength, flux, SpectrumMetadata::default()).unwrap()
    }

    #[test]
    fn test_kernel_shapes() {
        assert_eq!(boxcar_kernel(3), vec![1.0, 1.0, 1.0]);
        assert_eq!(boxcar_kernel(4), vec![0.5, 1.0, 1.0, 1.0, 0.5]);
        assert_eq!(boxcar_kernel(0), vec![1.0]);
        assert_eq!(boxcar_kernel(10).iter().sum::<f64>(), 10.0);
    }

    #[test]
    fn test_smooth_ramp_is_unchanged_in_interior() {
        let ramp: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let smoothed = boxcar_smooth(&ramp, 4);
        for i in 2..48 {
            assert!((smoothed[i] - ramp[i]).abs() < 1e-12, "index {i}");
        }
        // zero fill past the end pulls the last sample down
        assert!(smoothed[49] < ramp[49]);
    }

    #[test]
    fn test_smooth_skips_nan() {
        let smoothed = boxcar_smooth(&[2.0, f64::NAN, 2.0, 2.0, 2.0], 3);
        assert_eq!(smoothed[2], 2.0);
        assert_eq!(smoothed[1], 2.0);
    }

    #[test]
    fn test_constant_flux_has_zero_roughness() {
        let d = smoothing_diagnostics(&spectrum(vec![100.0; 1000]), NARROW_WIDTH, WIDE_WIDTH);
        assert_eq!(d.as_array(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_short_spectrum_is_nan() {
        let d = smoothing_diagnostics(&spectrum(vec![1.0; 150]), NARROW_WIDTH, WIDE_WIDTH);
        assert!(d.d1.is_nan() && d.d2.is_nan() && d.d3.is_nan());
    }

    #[test]
    fn test_smoothing_sees_raw_negative_samples() {
        // A negative spike is masked in the cleaned flux but still drags the
        // smoothed curves down, so the diagnostics become non-zero.
        let mut flux = vec![100.0; 1000];
        flux[500] = -500.0;
        let d = smoothing_diagnostics(&spectrum(flux), NARROW_WIDTH, WIDE_WIDTH);
        assert!(d.d1 > 0.0);
        assert!(d.d2 > 0.0);
        assert!(d.d3 > 0.0);
    }

    #[test]
    fn test_structure_increases_roughness() {
        let flat: Vec<f64> = (0..1000).map(|i| 100.0 + 0.01 * i as f64).collect();
        let mut bumpy = flat.clone();
        for (i, v) in bumpy.iter_mut().enumerate() {
            if i % 7 == 0 {
                *v += 30.0;
            }
        }
        let a = smoothing_diagnostics(&spectrum(flat), NARROW_WIDTH, WIDE_WIDTH);
        let b = smoothing_diagnostics(&spectrum(bumpy), NARROW_WIDTH, WIDE_WIDTH);
        assert!(b.d1 > a.d1);
        assert!(b.d2 > a.d2);
    }

    proptest! {
        #[test]
        fn prop_constant_flux_is_smooth(level in 0.1f64..1.0e4, n in 201usize..1500) {
            let d = smoothing_diagnostics(&spectrum(vec![level; n]), NARROW_WIDTH, WIDE_WIDTH);
            prop_assert_eq!(d.as_array(), [0.0, 0.0, 0.0]);
        }
    }
}
