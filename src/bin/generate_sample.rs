use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use spectral_features::data::fits::{write_fits, FitsHeader};
use spectral_features::data::model::{HeaderValue, SNR_KEYWORDS};

/// LAMOST wavelength grid: log10(λ) = COEFF0 + COEFF1 · i
const COEFF0: f64 = 3.5670;
const COEFF1: f64 = 1e-4;
const SAMPLES: usize = 3909;

/// Balmer lines as (centre, sigma, relative depth).
const BALMER: [(f64, f64, f64); 4] = [
    (6564.6, 6.0, 0.35),
    (4862.7, 5.0, 0.30),
    (4341.7, 4.5, 0.25),
    (4102.9, 4.0, 0.20),
];

const CLASSES: [&str; 3] = ["STAR", "STAR", "QSO"];

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Planck curve in wavelength, normalised to 1 at 5500 Å.
fn planck(wavelength: f64, temperature: f64) -> f64 {
    const HC_K: f64 = 1.438_776_9e8; // h·c/k in Å·K
    let b = |w: f64| 1.0 / (w.powi(5) * ((HC_K / (w * temperature)).exp() - 1.0));
    b(wavelength) / b(5500.0)
}

fn generate_flux(wavelength: &[f64], temperature: f64, level: f64, noise: f64, rng: &mut NoiseSource) -> Vec<f64> {
    wavelength
        .iter()
        .map(|&w| {
            let continuum = level * planck(w, temperature);
            let absorption: f64 = BALMER
                .iter()
                .map(|&(mu, sigma, depth)| gaussian(w, mu, sigma, depth))
                .sum();
            continuum * (1.0 - absorption.min(0.95)) + rng.gauss(0.0, noise)
        })
        .collect()
}

/// Seeded SplitMix64 stream; the same seed always writes the same files.
struct NoiseSource {
    state: u64,
    spare: Option<f64>,
}

impl NoiseSource {
    fn seeded(seed: u64) -> Self {
        NoiseSource { state: seed, spare: None }
    }

    fn next_bits(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)` from the top 53 bits.
    fn unit(&mut self) -> f64 {
        (self.next_bits() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.unit()
    }

    /// Normal deviate via the Marsaglia polar method; pairs are cached.
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        if let Some(z) = self.spare.take() {
            return mean + std_dev * z;
        }
        loop {
            let u = 2.0 * self.unit() - 1.0;
            let v = 2.0 * self.unit() - 1.0;
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                let factor = (-2.0 * s.ln() / s).sqrt();
                self.spare = Some(v * factor);
                return mean + std_dev * u * factor;
            }
        }
    }
}

fn header_for(index: usize, rng: &mut NoiseSource) -> (String, FitsHeader) {
    let filename = format!("spec-55859-sample_sp01-{index:03}.fits");
    let ra = rng.uniform(0.0, 24.0);
    let dec = rng.uniform(-10.0, 60.0);

    let mut header = FitsHeader::new();
    header.set("FILENAME", HeaderValue::String(filename.clone()));
    header.set("CLASS", HeaderValue::String(CLASSES[index % CLASSES.len()].to_string()));
    header.set(
        "DESIG",
        HeaderValue::String(format!("LAMOST J{:06.2}{:+08.3}", ra * 10_000.0 / 24.0, dec)),
    );
    header.set("COEFF0", HeaderValue::Float(COEFF0));
    header.set("COEFF1", HeaderValue::Float(COEFF1));
    for key in SNR_KEYWORDS {
        header.set(key, HeaderValue::Float((rng.uniform(2.0, 80.0) * 100.0).round() / 100.0));
    }
    (filename, header)
}

fn write_malformed(dir: &Path) -> Result<Vec<PathBuf>> {
    // valid FITS, but no wavelength solution
    let missing = dir.join("spec-broken-nocoeff.fits");
    let mut header = FitsHeader::new();
    header.set("FILENAME", HeaderValue::String("spec-broken-nocoeff.fits".into()));
    header.set("CLASS", HeaderValue::String("STAR".into()));
    header.set("DESIG", HeaderValue::String("LAMOST J000000.00+000000.0".into()));
    header.set("COEFF1", HeaderValue::Float(COEFF1));
    write_fits(&missing, &header, &[16, 1], &[1.0; 16])
        .with_context(|| format!("writing {}", missing.display()))?;

    let garbage = dir.join("spec-broken-garbage.fits");
    std::fs::write(&garbage, b"this is not a FITS file\n")
        .with_context(|| format!("writing {}", garbage.display()))?;

    Ok(vec![missing, garbage])
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "sample_spectra".to_string()));
    let count: usize = match args.next() {
        Some(n) => n.parse().with_context(|| format!("invalid count '{n}'"))?,
        None => 8,
    };

    std::fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = NoiseSource::seeded(42);
    let wavelength: Vec<f64> = (0..SAMPLES)
        .map(|i| 10f64.powf(COEFF0 + COEFF1 * i as f64))
        .collect();

    for index in 0..count {
        let temperature = rng.uniform(4500.0, 9500.0);
        let level = rng.uniform(50.0, 500.0);
        let flux = generate_flux(&wavelength, temperature, level, 0.02 * level, &mut rng);

        let (filename, header) = header_for(index, &mut rng);
        let path = out_dir.join(&filename);
        // LAMOST stores flux as the first row of a 2-D array
        write_fits(&path, &header, &[SAMPLES, 1], &flux)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let broken = write_malformed(&out_dir)?;

    println!(
        "Wrote {count} spectra ({SAMPLES} samples each) and {} malformed files to {}",
        broken.len(),
        out_dir.display()
    );
    Ok(())
}
