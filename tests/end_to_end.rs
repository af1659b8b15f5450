use spectral_features::data::model::{log_linear_wavelength, Spectrum, SpectrumMetadata};
use spectral_features::features::spec::FeatureSpec;
use spectral_features::{clean, extract_features, smoothing_diagnostics, FeatureExtractor};

const N: usize = 1000;

fn metadata(name: &str) -> SpectrumMetadata {
    SpectrumMetadata {
        designation: format!("J{name}"),
        filename: format!("{name}.fits"),
        spectral_class: "STAR".into(),
        ..Default::default()
    }
}

/// 1000 samples log-spaced from 4000 Å to 9000 Å.
fn optical_grid(flux: impl Fn(f64) -> f64) -> Spectrum {
    let init = 4000f64.log10();
    let disp = (9000f64.log10() - init) / (N - 1) as f64;
    let wavelength = log_linear_wavelength(init, disp, N);
    let values = wavelength.iter().map(|&w| flux(w)).collect();
    Spectrum::from_dispersion(values, init, disp, metadata("halpha")).unwrap()
}

fn halpha_dip(w: f64) -> f64 {
    let sigma = 5.0;
    100.0 - 20.0 * (-(w - 6565.0).powi(2) / (2.0 * sigma * sigma)).exp()
}

#[test]
fn test_wavelength_axis_matches_flux() {
    let sp = optical_grid(|_| 1.0);
    assert_eq!(sp.wavelength.len(), sp.flux.len());
    assert!(sp.wavelength.windows(2).all(|w| w[0] < w[1]));
    assert!((sp.wavelength[0] - 4000.0).abs() < 1e-6);
    assert!((sp.wavelength[N - 1] - 9000.0).abs() < 1e-6);
}

#[test]
fn test_gaussian_halpha_dip() {
    let cleaned = clean(&optical_grid(halpha_dip));
    let spec = FeatureSpec::new()
        .with("lHa", 6555.0, 6575.0)
        .and_then(|s| s.with("cB", 3980.0, 4920.0))
        .unwrap();

    let fv = extract_features(&cleaned, &spec);
    let ew = fv.get("lHa").unwrap();
    assert!(ew > 0.0, "absorption line must have positive width, got {ew}");
    assert_eq!(fv.get("cB").unwrap(), -2.5 * 100f64.log10());
    assert!(fv.warnings.is_empty());
}

#[test]
fn test_deeper_line_has_larger_width() {
    let spec = FeatureSpec::new().with("lHa", 6555.0, 6575.0).unwrap();
    let shallow = extract_features(&clean(&optical_grid(halpha_dip)), &spec);
    let deep = extract_features(
        &clean(&optical_grid(|w| {
            100.0 - 60.0 * (-(w - 6565.0).powi(2) / 50.0).exp()
        })),
        &spec,
    );
    assert!(deep.get("lHa").unwrap() > shallow.get("lHa").unwrap());
}

#[test]
fn test_constant_flux_is_perfectly_smooth() {
    let sp = optical_grid(|_| 42.0);
    let d = smoothing_diagnostics(&sp, 10, 100);
    assert_eq!(d.as_array(), [0.0, 0.0, 0.0]);

    let fv = FeatureExtractor::default().process(&sp);
    assert_eq!(fv.get("d1"), Some(0.0));
    assert_eq!(fv.get("d2"), Some(0.0));
    assert_eq!(fv.get("d3"), Some(0.0));
}

#[test]
fn test_window_outside_coverage_is_zero() {
    let cleaned = clean(&optical_grid(halpha_dip));
    // The LAMOST lK window lies blueward of 4000 Å.
    let fv = extract_features(&cleaned, &FeatureSpec::lamost_default());
    assert_eq!(fv.get("lK"), Some(0.0));
    assert_eq!(fv.get("lHe"), Some(0.0));
    assert!(fv.warnings.iter().any(|w| w.feature() == "lK"));
}

#[test]
fn test_cleaning_masks_negative_and_artifact_samples() {
    let sp = optical_grid(|w| if w > 8000.0 { -1.0 } else { 10.0 });
    let cleaned = clean(&sp);
    for (w, f) in cleaned.wavelength.iter().zip(&cleaned.flux) {
        if *w > 8000.0 || (*w > 5570.0 && *w < 5590.0) {
            assert!(f.is_nan(), "sample at {w} should be masked");
        } else {
            assert_eq!(*f, 10.0);
        }
    }
}

#[test]
fn test_full_vector_is_dense_and_finite() {
    let fv = FeatureExtractor::default().process(&optical_grid(|w| 50.0 + 0.01 * w));
    let dense = fv.dense();
    assert_eq!(dense.len(), FeatureExtractor::default().column_names().len());
    assert!(dense.iter().all(|v| v.is_finite()));
    assert_eq!(fv.metadata_cells(), ["halpha.fits", "Jhalpha", "STAR"]);
}
