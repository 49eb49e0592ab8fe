//! Numeric coercion for loosely typed status fields.
//!
//! Gateways report every counter as text, and any of them may be missing or
//! carry something that is not a number. Coercion is total: it always yields
//! a value that can be summed.

use serde::{Serialize, Serializer};

/// Coerce optional text to a number.
///
/// Absent, empty and non-numeric text all become `0.0`. Surrounding
/// whitespace is ignored. Non-finite spellings such as `inf` or `NaN` are
/// treated as non-numeric.
pub fn coerce_numeric(raw: Option<&str>) -> f64 {
    raw.map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// A numeric leaf of the status document, kept as reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metric(Option<String>);

impl Metric {
    pub fn new(raw: Option<String>) -> Self {
        Self(raw)
    }

    /// The text as reported by the gateway, if the field was present.
    pub fn raw(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn value(&self) -> f64 {
        coerce_numeric(self.raw())
    }
}

impl From<&str> for Metric {
    fn from(s: &str) -> Self {
        Self(Some(s.to_string()))
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

/// Rate averages reported in `inbound`/`outbound`, e.g. `"0.50,0.25,0.10"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Load(Option<String>);

impl Load {
    pub fn new(raw: Option<String>) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Exactly three display cells, padded with `-`.
    pub fn averages(&self) -> [String; 3] {
        let mut cells = [String::from("-"), String::from("-"), String::from("-")];
        if let Some(raw) = self.raw().filter(|s| !s.trim().is_empty()) {
            for (cell, part) in cells.iter_mut().zip(raw.split(',')) {
                *cell = part.trim().to_string();
            }
        }
        cells
    }

    /// The most recent average as a number; a bare number is its own first average.
    pub fn value(&self) -> f64 {
        coerce_numeric(self.raw().and_then(|s| s.split(',').next()))
    }
}

impl From<&str> for Load {
    fn from(s: &str) -> Self {
        Self(Some(s.to_string()))
    }
}

impl Serialize for Load {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.raw() {
            Some(raw) => serializer.serialize_str(raw),
            None => serializer.serialize_none(),
        }
    }
}
