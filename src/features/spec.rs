use crate::error::ConfigError;

/// The 14 windows used for LAMOST DR1 spectra: broad continuum bands
/// (`c…`) and narrow absorption lines (`l…`), in Ångström.
pub const LAMOST_FEATURES: [(&str, f64, f64); 14] = [
    ("cAll", 0.0, 9000.0),
    ("cB", 3980.0, 4920.0),
    ("cV", 5070.0, 5950.0),
    ("cR", 5890.0, 7270.0),
    ("cI", 7310.0, 8810.0),
    ("lHa", 6555.0, 6575.0),
    ("lHb", 4855.0, 4870.0),
    ("lHg", 4320.0, 4370.0),
    ("lHd", 4093.0, 4113.0),
    ("lHe", 3960.0, 3980.0),
    ("lNa", 5885.0, 5905.0),
    ("lMg", 5167.0, 5187.0),
    ("lK", 3925.0, 3945.0),
    ("lG", 4240.0, 4260.0),
];

/// Colour indices over the photometric bands of [`LAMOST_FEATURES`].
pub const LAMOST_COLOURS: [(&str, &str); 6] = [
    ("cB", "cV"),
    ("cB", "cR"),
    ("cB", "cI"),
    ("cV", "cR"),
    ("cV", "cI"),
    ("cR", "cI"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Astronomical magnitude of the mean flux over a broad band.
    Continuum,
    /// Equivalent width of a narrow spectral line.
    Line,
}

impl FeatureKind {
    /// Kind encoded by the first letter of a feature name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.chars().next() {
            Some('c') => Some(FeatureKind::Continuum),
            Some('l') => Some(FeatureKind::Line),
            _ => None,
        }
    }
}

/// One named wavelength window; samples with `low < λ < high` are selected.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow {
    pub name: String,
    pub kind: FeatureKind,
    pub low: f64,
    pub high: f64,
}

/// Ordered set of feature windows. Iteration order is output column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSpec {
    windows: Vec<FeatureWindow>,
}

impl FeatureSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// The LAMOST feature set.
    pub fn lamost_default() -> Self {
        let windows = LAMOST_FEATURES
            .iter()
            .map(|&(name, low, high)| FeatureWindow {
                name: name.to_string(),
                kind: FeatureKind::from_name(name).unwrap_or(FeatureKind::Continuum),
                low,
                high,
            })
            .collect();
        FeatureSpec { windows }
    }

    /// Append a window. The name must start with `c` or `l`, be unique, and
    /// the bounds must be finite with `low < high`.
    pub fn push(&mut self, name: &str, low: f64, high: f64) -> Result<(), ConfigError> {
        let kind = FeatureKind::from_name(name).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "feature '{name}' must start with 'c' (continuum) or 'l' (line)"
            ))
        })?;
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(ConfigError::Invalid(format!(
                "feature '{name}' has an invalid window [{low}, {high}]"
            )));
        }
        if self.get(name).is_some() {
            return Err(ConfigError::Invalid(format!("feature '{name}' is defined twice")));
        }
        self.windows.push(FeatureWindow {
            name: name.to_string(),
            kind,
            low,
            high,
        });
        Ok(())
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, name: &str, low: f64, high: f64) -> Result<Self, ConfigError> {
        self.push(name, low, high)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&FeatureWindow> {
        self.windows.iter().find(|w| w.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureWindow> {
        self.windows.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.windows.iter().map(|w| w.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Difference of two continuum magnitudes, e.g. B − V.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColourIndex {
    pub blue: String,
    pub red: String,
}

impl ColourIndex {
    pub fn new(blue: &str, red: &str) -> Self {
        ColourIndex {
            blue: blue.to_string(),
            red: red.to_string(),
        }
    }

    /// Column name, `blue-red`.
    pub fn name(&self) -> String {
        format!("{}-{}", self.blue, self.red)
    }

    /// Both sides must be continuum features of `spec`.
    pub fn check(&self, spec: &FeatureSpec) -> Result<(), ConfigError> {
        for side in [&self.blue, &self.red] {
            match spec.get(side) {
                Some(w) if w.kind == FeatureKind::Continuum => {}
                Some(_) => {
                    return Err(ConfigError::Invalid(format!(
                        "colour index {} uses line feature '{side}'",
                        self.name()
                    )))
                }
                None => {
                    return Err(ConfigError::Invalid(format!(
                        "colour index {} uses unknown feature '{side}'",
                        self.name()
                    )))
                }
            }
        }
        Ok(())
    }
}

/// The LAMOST colour index set.
pub fn lamost_colour_indices() -> Vec<ColourIndex> {
    LAMOST_COLOURS
        .iter()
        .map(|(b, r)| ColourIndex::new(b, r))
        .collect()
}
