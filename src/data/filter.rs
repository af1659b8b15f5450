use super::model::Spectrum;

// ---------------------------------------------------------------------------
// Flux cleaning: which samples are unusable
// ---------------------------------------------------------------------------

/// Wavelength band (Å, exclusive bounds) where the two spectrograph arms
/// overlap and flux is unreliable.
pub const ARTIFACT_BAND: (f64, f64) = (5570.0, 5590.0);

/// Return a copy of `spectrum` with unusable flux replaced by NaN, using the
/// default [`ARTIFACT_BAND`].
pub fn clean(spectrum: &Spectrum) -> Spectrum {
    clean_with_band(spectrum, ARTIFACT_BAND)
}

/// Same as [`clean`] with an explicit artifact band.
pub fn clean_with_band(spectrum: &Spectrum, band: (f64, f64)) -> Spectrum {
    Spectrum {
        wavelength: spectrum.wavelength.clone(),
        flux: mask_flux(&spectrum.wavelength, &spectrum.flux, band),
        metadata: spectrum.metadata.clone(),
    }
}

/// A sample is masked when:
/// * its flux is negative, or
/// * its wavelength lies strictly inside `band`.
///
/// NaN input stays NaN; everything else passes through unchanged.
pub fn mask_flux(wavelength: &[f64], flux: &[f64], band: (f64, f64)) -> Vec<f64> {
    let (low, high) = band;
    wavelength
        .iter()
        .zip(flux)
        .map(|(&w, &f)| {
            if f < 0.0 || (w > low && w < high) {
                f64::NAN
            } else {
                f
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{log_linear_wavelength, SpectrumMetadata};
    use proptest::prelude::*;

    fn spectrum(wavelength: Vec<f64>, flux: Vec<f64>) -> Spectrum {
        Spectrum::new(wavelength, flux, SpectrumMetadata::default()).unwrap()
    }

    #[test]
    fn test_masks_negative_and_artifact_band() {
        let sp = spectrum(
            vec![5560.0, 5570.0, 5575.0, 5589.9, 5590.0, 5600.0],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, -6.0],
        );
        let cleaned = clean(&sp);
        assert_eq!(cleaned.flux[0], 1.0);
        // band bounds are exclusive
        assert_eq!(cleaned.flux[1], 2.0);
        assert!(cleaned.flux[2].is_nan());
        assert!(cleaned.flux[3].is_nan());
        assert_eq!(cleaned.flux[4], 5.0);
        assert!(cleaned.flux[5].is_nan());
        // the input is untouched
        assert_eq!(sp.flux[5], -6.0);
    }

    #[test]
    fn test_clean_all_negative_does_not_fail() {
        let sp = spectrum(vec![4000.0, 4001.0], vec![-1.0, -2.0]);
        let cleaned = clean(&sp);
        assert!(cleaned.flux.iter().all(|f| f.is_nan()));
    }

    #[test]
    fn test_custom_band() {
        let sp = spectrum(vec![4000.0, 5000.0, 6000.0], vec![1.0, 1.0, 1.0]);
        let cleaned = clean_with_band(&sp, (4500.0, 5500.0));
        assert!(cleaned.flux[1].is_nan());
        assert_eq!(cleaned.flux[0], 1.0);
        assert_eq!(cleaned.flux[2], 1.0);
    }

    proptest! {
        #[test]
        fn prop_cleaned_flux_has_no_negatives_or_band_samples(
            flux in prop::collection::vec(-50.0f64..50.0, 2000)
        ) {
            let wavelength = log_linear_wavelength(3.6, 1e-4, flux.len());
            let cleaned = clean(&spectrum(wavelength.clone(), flux));
            prop_assert_eq!(cleaned.flux.len(), wavelength.len());
            for (w, f) in wavelength.iter().zip(&cleaned.flux) {
                if f.is_nan() {
                    continue;
                }
                prop_assert!(*f >= 0.0);
                prop_assert!(!(*w > 5570.0 && *w < 5590.0));
            }
        }
    }
}
