//! Ontology class data and the sources that provide it.

mod hierarchy;

pub use hierarchy::ClassHierarchy;

use crate::api::ApiError;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Attributes of one ontology class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassDetails {
    /// Declared direct superclasses
    #[serde(default)]
    pub superclass: Vec<String>,
    #[serde(rename = "unitMeasure", default, skip_serializing_if = "Option::is_none")]
    pub unit_measure: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
}

impl ClassDetails {
    /// Draw a plausible reading for a sensor of this class.
    ///
    /// Needs both `min` and `max`. Values are normally distributed around
    /// `mean` (or the midpoint) with a sixth of the range as standard
    /// deviation, clamped to the range and rounded to two decimals.
    pub fn sample_value<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<f64> {
        let (min, max) = (self.min?, self.max?);
        let mean = self.mean.unwrap_or((min + max) / 2.0);
        let normal = Normal::new(mean, ((max - min) / 6.0).abs()).ok()?;

        let value = normal.sample(rng).clamp(min.min(max), max.max(min));
        Some((value * 100.0).round() / 100.0)
    }
}

/// A class with its transitive neighbourhood, as shown in the viewer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    #[serde(default)]
    pub name: String,
    pub details: ClassDetails,
    #[serde(default)]
    pub superclasses: Vec<String>,
    #[serde(default)]
    pub subclasses: Vec<String>,
}

impl ClassInfo {
    /// Sensor types a device of this class accepts: the class itself plus
    /// its transitive super- and subclasses, sorted
    pub fn compatible_sensors(&self) -> Vec<String> {
        let mut all: BTreeSet<&str> = BTreeSet::new();
        all.insert(&self.name);
        all.extend(self.superclasses.iter().map(String::as_str));
        all.extend(self.subclasses.iter().map(String::as_str));
        all.into_iter().map(str::to_string).collect()
    }

    pub fn accepts_sensor(&self, sensor_type: &str) -> bool {
        sensor_type == self.name
            || self.superclasses.iter().any(|c| c == sensor_type)
            || self.subclasses.iter().any(|c| c == sensor_type)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OntologyError {
    #[error("failed to read class hierarchy: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse class hierarchy: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("class '{0}' not found in ontology")]
    UnknownClass(String),
}

/// Failure of any ontology source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Ontology(#[from] OntologyError),
}

/// Read access to ontology classes
pub trait OntologySource: Send + Sync {
    fn root_classes(&self) -> Result<Vec<String>, SourceError>;

    fn all_classes(&self) -> Result<Vec<String>, SourceError>;

    fn class_info(&self, name: &str) -> Result<ClassInfo, SourceError>;

    /// Short human-readable description for status lines
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ranged(min: f64, max: f64, mean: Option<f64>) -> ClassDetails {
        ClassDetails {
            min: Some(min),
            max: Some(max),
            mean,
            ..ClassDetails::default()
        }
    }

    #[test]
    fn test_sample_spreads_around_mean() {
        let mut rng = StdRng::seed_from_u64(5);
        let details = ranged(0.0, 60.0, Some(30.0));
        let samples: Vec<f64> = (0..2000).map(|_| details.sample_value(&mut rng).unwrap()).collect();

        let avg = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((avg - 30.0).abs() < 1.0, "average {}", avg);
        assert!(samples.iter().all(|v| (0.0..=60.0).contains(v)));
        assert!(samples.iter().any(|v| *v != samples[0]));
    }

    #[test]
    fn test_sample_degenerate_ranges() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(ranged(7.0, 7.0, None).sample_value(&mut rng), Some(7.0));

        let v = ranged(10.0, 0.0, None).sample_value(&mut rng).unwrap();
        assert!((0.0..=10.0).contains(&v));
    }

    #[test]
    fn test_compatibility_from_class_info() {
        let info = ClassInfo {
            name: "Temp".into(),
            details: ClassDetails::default(),
            superclasses: vec!["Sensor".into()],
            subclasses: vec!["Indoor".into(), "Sensor".into()],
        };
        assert_eq!(info.compatible_sensors(), vec!["Indoor", "Sensor", "Temp"]);
        assert!(info.accepts_sensor("Temp"));
        assert!(!info.accepts_sensor("Humidity"));
    }
}
