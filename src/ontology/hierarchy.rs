//! Local class hierarchy loaded from `class_hierarchy.json`.

use super::{ClassDetails, ClassInfo, OntologyError, OntologySource, SourceError};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// Class hierarchy with an inverse (superclass -> subclasses) index
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    classes: BTreeMap<String, ClassDetails>,
    subclass_index: HashMap<String, Vec<String>>,
}

impl ClassHierarchy {
    pub fn new(classes: BTreeMap<String, ClassDetails>) -> Self {
        let mut subclass_index: HashMap<String, Vec<String>> = HashMap::new();
        for (name, details) in &classes {
            for sup in &details.superclass {
                subclass_index.entry(sup.clone()).or_default().push(name.clone());
            }
        }
        Self {
            classes,
            subclass_index,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, OntologyError> {
        let classes: BTreeMap<String, ClassDetails> = serde_json::from_str(json)?;
        Ok(Self::new(classes))
    }

    pub fn load(path: &Path) -> Result<Self, OntologyError> {
        let contents = std::fs::read_to_string(path)?;
        let hierarchy = Self::from_json(&contents)?;
        tracing::info!(path = %path.display(), classes = hierarchy.len(), "Loaded class hierarchy");
        Ok(hierarchy)
    }

    pub(crate) fn len(&self) -> usize {
        self.classes.len()
    }

    /// All class names, sorted
    pub fn class_names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }

    /// Classes without a superclass, sorted
    pub fn root_class_names(&self) -> Vec<String> {
        self.classes
            .iter()
            .filter(|(_, d)| d.superclass.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Direct subclasses in hierarchy order
    pub fn subclasses(&self, name: &str) -> &[String] {
        self.subclass_index.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct superclasses as declared
    pub fn superclasses(&self, name: &str) -> &[String] {
        self.classes.get(name).map(|d| d.superclass.as_slice()).unwrap_or(&[])
    }

    /// Transitive subclasses, sorted and without duplicates
    pub fn all_subclasses(&self, name: &str) -> Vec<String> {
        self.closure(name, |n| self.subclasses(n))
    }

    /// Transitive superclasses, sorted and without duplicates
    pub fn all_superclasses(&self, name: &str) -> Vec<String> {
        if !self.classes.contains_key(name) {
            return Vec::new();
        }
        self.closure(name, |n| self.superclasses(n))
    }

    fn closure<'a, F>(&'a self, start: &str, next: F) -> Vec<String>
    where
        F: Fn(&str) -> &'a [String],
    {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut stack: Vec<&str> = next(start).iter().map(String::as_str).collect();

        while let Some(name) = stack.pop() {
            if name == start || !seen.insert(name.to_string()) {
                continue;
            }
            stack.extend(next(name).iter().map(String::as_str));
        }

        seen.into_iter().collect()
    }
}

impl OntologySource for ClassHierarchy {
    fn root_classes(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.root_class_names())
    }

    fn all_classes(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.class_names())
    }

    fn class_info(&self, name: &str) -> Result<ClassInfo, SourceError> {
        let details = self
            .classes
            .get(name)
            .cloned()
            .ok_or_else(|| OntologyError::UnknownClass(name.to_string()))?;

        Ok(ClassInfo {
            name: name.to_string(),
            details,
            superclasses: self.all_superclasses(name),
            subclasses: self.all_subclasses(name),
        })
    }

    fn describe(&self) -> String {
        format!("Local hierarchy ({} classes)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "Sensor": {"superclass": []},
        "EnvironmentalSensor": {"superclass": ["Sensor"]},
        "TemperatureSensor": {
            "superclass": ["EnvironmentalSensor"],
            "unitMeasure": ["Celsius", "Fahrenheit"],
            "min": -40, "max": 85, "mean": 20
        },
        "HumiditySensor": {"superclass": ["EnvironmentalSensor"], "min": 0, "max": 100},
        "IndoorTemperatureSensor": {"superclass": ["TemperatureSensor"]},
        "Actuator": {}
    }"#;

    fn sample() -> ClassHierarchy {
        ClassHierarchy::from_json(SAMPLE).unwrap()
    }

    #[test]
    fn test_root_classes() {
        assert_eq!(sample().root_class_names(), vec!["Actuator", "Sensor"]);
    }

    #[test]
    fn test_direct_subclasses() {
        let h = sample();
        assert_eq!(h.subclasses("EnvironmentalSensor"), ["HumiditySensor", "TemperatureSensor"]);
        assert!(h.subclasses("Actuator").is_empty());
    }

    #[test]
    fn test_transitive_closures() {
        let h = sample();
        assert_eq!(
            h.all_subclasses("Sensor"),
            vec!["EnvironmentalSensor", "HumiditySensor", "IndoorTemperatureSensor", "TemperatureSensor"]
        );
        assert_eq!(
            h.all_superclasses("IndoorTemperatureSensor"),
            vec!["EnvironmentalSensor", "Sensor", "TemperatureSensor"]
        );
        assert!(h.all_superclasses("Nope").is_empty());
    }

    #[test]
    fn test_cycles_terminate() {
        let h = ClassHierarchy::from_json(r#"{"A": {"superclass": ["B"]}, "B": {"superclass": ["A"]}}"#).unwrap();
        assert_eq!(h.all_superclasses("A"), vec!["B"]);
        assert_eq!(h.all_subclasses("A"), vec!["B"]);
    }

    #[test]
    fn test_sensor_compatibility() {
        let h = sample();
        let temp = h.class_info("TemperatureSensor").unwrap();
        assert!(temp.accepts_sensor("TemperatureSensor"));
        assert!(temp.accepts_sensor("Sensor"));
        assert!(temp.accepts_sensor("IndoorTemperatureSensor"));
        assert!(!temp.accepts_sensor("HumiditySensor"));

        assert_eq!(
            h.class_info("EnvironmentalSensor").unwrap().compatible_sensors(),
            vec![
                "EnvironmentalSensor",
                "HumiditySensor",
                "IndoorTemperatureSensor",
                "Sensor",
                "TemperatureSensor"
            ]
        );
    }

    #[test]
    fn test_class_info_and_unknown_class() {
        let h = sample();
        let info = h.class_info("TemperatureSensor").unwrap();
        assert_eq!(info.superclasses, vec!["EnvironmentalSensor", "Sensor"]);
        assert_eq!(info.subclasses, vec!["IndoorTemperatureSensor"]);
        assert_eq!(info.details.unit_measure.as_deref(), Some(&["Celsius".to_string(), "Fahrenheit".to_string()][..]));
        assert_eq!(info.details.min, Some(-40.0));

        assert!(matches!(
            h.class_info("Missing"),
            Err(SourceError::Ontology(OntologyError::UnknownClass(name))) if name == "Missing"
        ));
    }

    #[test]
    fn test_sample_value_within_range() {
        let h = sample();
        let mut rng = StdRng::seed_from_u64(17);
        let temp = h.class_info("TemperatureSensor").unwrap().details;
        for _ in 0..200 {
            let v = temp.sample_value(&mut rng).unwrap();
            assert!((-40.0..=85.0).contains(&v));
            assert_eq!((v * 100.0).round() / 100.0, v);
        }
        let humidity = h.class_info("HumiditySensor").unwrap().details;
        assert!(humidity.sample_value(&mut rng).is_some());
        let sensor = h.class_info("Sensor").unwrap().details;
        assert!(sensor.sample_value(&mut rng).is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let h = ClassHierarchy::load(file.path()).unwrap();
        assert_eq!(h.len(), 6);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not json").unwrap();
        assert!(matches!(ClassHierarchy::load(file.path()), Err(OntologyError::Parse(_))));
    }
}
