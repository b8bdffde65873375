//! Classification records and the fixed brightness decision table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Object labels produced by the heuristic. The serialized form is the
/// human-readable label used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectClass {
    #[serde(rename = "Highly Reflective Object (Metal)")]
    HighlyReflective,
    #[serde(rename = "Moderately Dense Object")]
    ModeratelyDense,
    #[serde(rename = "Dense or Unknown Object")]
    DenseOrUnknown,
}

impl ObjectClass {
    /// First match wins; both comparisons are strict.
    pub fn from_brightness(brightness: f64) -> Self {
        if brightness > 200.0 {
            ObjectClass::HighlyReflective
        } else if brightness > 100.0 {
            ObjectClass::ModeratelyDense
        } else {
            ObjectClass::DenseOrUnknown
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ObjectClass::HighlyReflective => "Highly Reflective Object (Metal)",
            ObjectClass::ModeratelyDense => "Moderately Dense Object",
            ObjectClass::DenseOrUnknown => "Dense or Unknown Object",
        }
    }

    pub fn threat_score(self) -> f64 {
        match self {
            ObjectClass::HighlyReflective => 0.10,
            ObjectClass::ModeratelyDense => 0.40,
            ObjectClass::DenseOrUnknown => 0.75,
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Image statistics computed from the luma plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    /// Laplacian variance / 1000, rounded to 2 decimals.
    pub sharpness: f64,
    /// Mean luma, 0..=255.
    pub brightness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub sharpness: f64,
    /// Not part of the service response; `None` for remote results.
    #[serde(skip)]
    pub brightness: Option<f64>,
    pub object: ObjectClass,
    pub threat_score: f64,
}

impl ClassificationResult {
    pub fn from_metrics(m: ClassificationMetrics) -> Self {
        let object = ObjectClass::from_brightness(m.brightness);
        Self {
            sharpness: m.sharpness,
            brightness: Some(m.brightness),
            object,
            threat_score: object.threat_score(),
        }
    }

    pub fn advisory(&self) -> &'static str {
        advisory(self.threat_score)
    }
}

/// Body of the classification service: `{"heuristic": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub heuristic: ClassificationResult,
}

/// Operator caption for a threat score.
pub fn advisory(threat_score: f64) -> &'static str {
    if threat_score < 0.3 {
        "Likely unharmful object, no further inspection needed."
    } else if threat_score < 0.7 {
        "Caution advised. Object moderately dense."
    } else {
        "Potentially harmful object detected. Further inspection advised."
    }
}
