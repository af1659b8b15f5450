use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value as JsonValue;

use super::fits::read_fits;
use super::model::{HeaderValue, Spectrum, SpectrumMetadata, SNR_KEYWORDS};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// File extensions [`load`] understands.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["fits", "fit", "fts", "json"];

/// Load one spectrum from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.fits` / `.fit` / `.fts` – primary array holding the flux (first row of
///   a 2-D array, or the whole 1-D array) plus header keywords
/// * `.json` – `{ "flux": [...], "header": { "CLASS": ..., ... } }`
///
/// Required header keywords: `CLASS`, `FILENAME` (or `FNAME`), `DESIG`,
/// `COEFF0`, `COEFF1`.
pub fn load(path: &Path) -> Result<Spectrum, LoadError> {
    let ext = extension(path);

    let (flux, header) = match ext.as_str() {
        "fits" | "fit" | "fts" => read_fits_source(path)?,
        "json" => read_json_source(path)?,
        other => return Err(LoadError::UnsupportedExtension(other.to_string())),
    };

    let mut spectrum = spectrum_from_parts(flux, header)?;
    spectrum.metadata.source = Some(path.display().to_string());
    Ok(spectrum)
}

/// Whether [`load`] would attempt to read this path.
pub fn is_supported(path: &Path) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension(path).as_str())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Turn raw flux samples and a header into a [`Spectrum`].
///
/// This is the seam for other container formats: anything that yields
/// `(flux, header)` can be fed through here.
pub fn spectrum_from_parts(
    flux: Vec<f64>,
    header: BTreeMap<String, HeaderValue>,
) -> Result<Spectrum, LoadError> {
    if flux.is_empty() {
        return Err(LoadError::NoData);
    }

    let spectral_class = required_label(&header, &["CLASS"])?;
    let filename = required_label(&header, &["FILENAME", "FNAME"])?;
    let designation = strip_survey_prefix(&required_label(&header, &["DESIG"])?);
    let init = required_f64(&header, "COEFF0")?;
    let disp = required_f64(&header, "COEFF1")?;

    let snr = SNR_KEYWORDS
        .iter()
        .filter_map(|key| {
            header
                .get(*key)
                .and_then(HeaderValue::as_f64)
                .map(|v| (key.to_string(), v))
        })
        .collect();

    let metadata = SpectrumMetadata {
        designation,
        filename,
        spectral_class,
        source: None,
        snr,
        header,
    };

    Spectrum::from_dispersion(flux, init, disp, metadata)
}

fn required_label(header: &BTreeMap<String, HeaderValue>, keys: &[&str]) -> Result<String, LoadError> {
    keys.iter()
        .find_map(|k| header.get(*k).and_then(HeaderValue::as_label))
        .ok_or_else(|| LoadError::MissingKeyword(keys.join("/")))
}

fn required_f64(header: &BTreeMap<String, HeaderValue>, key: &str) -> Result<f64, LoadError> {
    header
        .get(key)
        .and_then(HeaderValue::as_f64)
        .ok_or_else(|| LoadError::MissingKeyword(key.to_string()))
}

/// LAMOST designations read `LAMOST J034523.12+123456.7`; keep the `J…` part.
fn strip_survey_prefix(designation: &str) -> String {
    designation
        .strip_prefix("LAMOST")
        .unwrap_or(designation)
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// FITS source
// ---------------------------------------------------------------------------

fn read_fits_source(path: &Path) -> Result<(Vec<f64>, BTreeMap<String, HeaderValue>), LoadError> {
    let hdu = read_fits(path)?;
    let flux = hdu.first_row().to_vec();
    Ok((flux, hdu.header.into_map()))
}

// ---------------------------------------------------------------------------
// JSON source
// ---------------------------------------------------------------------------

/// Expected JSON schema:
///
/// ```json
/// {
///   "flux": [12.5, 13.0, null, ...],
///   "header": { "CLASS": "STAR", "FILENAME": "spec-1.fits", "DESIG": "LAMOST J...",
///               "COEFF0": 3.5682, "COEFF1": 0.0001 }
/// }
/// ```
///
/// `null` flux entries become NaN.
fn read_json_source(path: &Path) -> Result<(Vec<f64>, BTreeMap<String, HeaderValue>), LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let flux = root
        .get("flux")
        .and_then(JsonValue::as_array)
        .ok_or(LoadError::NoData)?
        .iter()
        .map(|v| match v {
            JsonValue::Null => Ok(f64::NAN),
            other => other
                .as_f64()
                .ok_or_else(|| LoadError::MissingKeyword(format!("flux value {other}"))),
        })
        .collect::<Result<Vec<f64>, LoadError>>()?;

    let header = root
        .get("header")
        .and_then(JsonValue::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.to_ascii_uppercase(), json_to_header(v)))
                .collect()
        })
        .unwrap_or_default();

    Ok((flux, header))
}

fn json_to_header(val: &JsonValue) -> HeaderValue {
    match val {
        JsonValue::String(s) => HeaderValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                HeaderValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                HeaderValue::Float(f)
            } else {
                HeaderValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => HeaderValue::Bool(*b),
        JsonValue::Null => HeaderValue::Null,
        other => HeaderValue::String(other.to_string()),
    }
}
