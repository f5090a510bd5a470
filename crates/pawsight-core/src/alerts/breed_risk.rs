//! Breed-risk reference table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigResult};

/// Minimum Jaro-Winkler similarity for a misspelled breed to still match.
const FUZZY_BREED_THRESHOLD: f64 = 0.92;

/// Inclusive age range in years.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AgeRange {
    pub min: f64,
    pub max: f64,
}

impl AgeRange {
    pub fn contains(&self, age: f64) -> bool {
        age >= self.min && age <= self.max
    }
}

/// A condition a breed is predisposed to at a given age.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreedRisk {
    pub condition: String,
    pub age_range: AgeRange,
    /// Severity label (low, moderate, high, critical)
    pub severity: String,
    pub description: String,
}

/// Lookup seam for breed predispositions.
///
/// Unknown breeds return an empty list, never an error.
pub trait BreedRiskTable {
    fn lookup(&self, breed: &str) -> Vec<BreedRisk>;
}

/// In-memory breed table, keyed by lower-cased breed name.
#[derive(Debug, Clone, Default)]
pub struct BuiltinBreedRisks {
    breeds: BTreeMap<String, Vec<BreedRisk>>,
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default)]
    breeds: Vec<BreedEntry>,
}

#[derive(Debug, Deserialize)]
struct BreedEntry {
    name: String,
    #[serde(default)]
    risks: Vec<RiskEntry>,
}

#[derive(Debug, Deserialize)]
struct RiskEntry {
    condition: String,
    min_age: f64,
    max_age: f64,
    severity: String,
    #[serde(default)]
    description: String,
}

/// (breed, condition, min age, max age, severity, description)
const BUILTIN: &[(&str, &str, f64, f64, &str, &str)] = &[
    ("Labrador Retriever", "Hip Dysplasia", 1.0, 6.0, "high", "Abnormal hip joint development causing pain and lameness."),
    ("Labrador Retriever", "Elbow Dysplasia", 0.5, 3.0, "moderate", "Developmental elbow disease; watch for forelimb lameness."),
    ("Labrador Retriever", "Obesity", 3.0, 12.0, "moderate", "Labradors are prone to weight gain; monitor body condition."),
    ("Golden Retriever", "Hip Dysplasia", 1.0, 6.0, "high", "Abnormal hip joint development causing pain and lameness."),
    ("Golden Retriever", "Hypothyroidism", 4.0, 10.0, "moderate", "Low thyroid function; signs include weight gain and lethargy."),
    ("Golden Retriever", "Hemangiosarcoma", 6.0, 14.0, "critical", "Aggressive blood-vessel cancer; sudden weakness is an emergency."),
    ("German Shepherd", "Hip Dysplasia", 1.0, 7.0, "high", "Abnormal hip joint development causing pain and lameness."),
    ("German Shepherd", "Degenerative Myelopathy", 8.0, 14.0, "high", "Progressive spinal cord disease causing hind-limb weakness."),
    ("Dachshund", "Intervertebral Disc Disease", 3.0, 7.0, "high", "Disc herniation; back pain or wobbliness needs prompt care."),
    ("French Bulldog", "Brachycephalic Airway Syndrome", 0.0, 14.0, "high", "Obstructed airways; avoid heat and strenuous exercise."),
    ("Bulldog", "Brachycephalic Airway Syndrome", 0.0, 14.0, "high", "Obstructed airways; avoid heat and strenuous exercise."),
    ("Cavalier King Charles Spaniel", "Mitral Valve Disease", 5.0, 14.0, "high", "Degenerative heart valve disease; watch for coughing."),
    ("Beagle", "Epilepsy", 1.0, 5.0, "moderate", "Idiopathic seizures commonly begin in young adults."),
    ("Beagle", "Hypothyroidism", 4.0, 10.0, "low", "Low thyroid function; signs include weight gain and lethargy."),
    ("Boxer", "Dilated Cardiomyopathy", 5.0, 10.0, "high", "Heart muscle disease; fainting or exercise intolerance."),
    ("Boxer", "Mast Cell Tumors", 6.0, 12.0, "moderate", "Common skin tumors; have new lumps checked."),
    ("Poodle", "Addison's Disease", 3.0, 7.0, "moderate", "Adrenal insufficiency with vague, waxing-waning signs."),
    ("Yorkshire Terrier", "Tracheal Collapse", 4.0, 14.0, "moderate", "Weak tracheal rings causing a honking cough."),
    ("Yorkshire Terrier", "Dental Disease", 3.0, 12.0, "low", "Crowded teeth predispose to periodontal disease."),
];

impl BuiltinBreedRisks {
    /// The curated table shipped with the library.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (breed, condition, min, max, severity, description) in BUILTIN {
            table.insert(
                breed,
                BreedRisk {
                    condition: condition.to_string(),
                    age_range: AgeRange { min: *min, max: *max },
                    severity: severity.to_string(),
                    description: description.to_string(),
                },
            );
        }
        table
    }

    /// Parse a table from TOML (`[[breeds]]` with nested `[[breeds.risks]]`).
    pub fn from_toml(source: &str) -> ConfigResult<Self> {
        let file: TableFile = toml::from_str(source)?;
        let mut table = Self::default();
        for breed in file.breeds {
            for risk in breed.risks {
                if risk.min_age > risk.max_age {
                    return Err(ConfigError::Invalid(format!(
                        "{} / {}: min_age exceeds max_age",
                        breed.name, risk.condition
                    )));
                }
                table.insert(
                    &breed.name,
                    BreedRisk {
                        condition: risk.condition,
                        age_range: AgeRange {
                            min: risk.min_age,
                            max: risk.max_age,
                        },
                        severity: risk.severity,
                        description: risk.description,
                    },
                );
            }
        }
        Ok(table)
    }

    /// Add a risk for a breed.
    pub fn insert(&mut self, breed: &str, risk: BreedRisk) {
        self.breeds
            .entry(canonical_breed(breed))
            .or_default()
            .push(risk);
    }

    pub fn breed_count(&self) -> usize {
        self.breeds.len()
    }

    fn closest_breed(&self, breed: &str) -> Option<&Vec<BreedRisk>> {
        self.breeds
            .iter()
            .map(|(name, risks)| (strsim::jaro_winkler(name, breed), risks))
            .filter(|(score, _)| *score >= FUZZY_BREED_THRESHOLD)
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, risks)| risks)
    }
}

impl BreedRiskTable for BuiltinBreedRisks {
    fn lookup(&self, breed: &str) -> Vec<BreedRisk> {
        let breed = canonical_breed(breed);
        if breed.is_empty() {
            return Vec::new();
        }
        self.breeds
            .get(&breed)
            .or_else(|| self.closest_breed(&breed))
            .cloned()
            .unwrap_or_default()
    }
}

fn canonical_breed(breed: &str) -> String {
    breed.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_case_insensitive() {
        let table = BuiltinBreedRisks::builtin();
        let risks = table.lookup("labrador  RETRIEVER");
        assert!(risks.iter().any(|r| r.condition == "Hip Dysplasia"));

        let hip = risks.iter().find(|r| r.condition == "Hip Dysplasia").unwrap();
        assert!(hip.age_range.contains(4.0));
        assert!(!hip.age_range.contains(7.0));
    }

    #[test]
    fn test_misspelled_breed_fuzzy_match() {
        let table = BuiltinBreedRisks::builtin();
        assert!(!table.lookup("Labrador Retreiver").is_empty());
    }

    #[test]
    fn test_unknown_breed_is_empty() {
        let table = BuiltinBreedRisks::builtin();
        assert!(table.lookup("Xoloitzcuintli").is_empty());
        assert!(table.lookup("").is_empty());
    }

    #[test]
    fn test_from_toml() {
        let source = r#"
            [[breeds]]
            name = "Greyhound"

            [[breeds.risks]]
            condition = "Osteosarcoma"
            min_age = 7
            max_age = 12
            severity = "high"
            description = "Bone cancer of the limbs."
        "#;

        let table = BuiltinBreedRisks::from_toml(source).unwrap();
        assert_eq!(table.breed_count(), 1);
        let risks = table.lookup("greyhound");
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].age_range, AgeRange { min: 7.0, max: 12.0 });
    }

    #[test]
    fn test_from_toml_rejects_inverted_range() {
        let source = r#"
            [[breeds]]
            name = "Greyhound"
            [[breeds.risks]]
            condition = "Osteosarcoma"
            min_age = 12.0
            max_age = 7.0
            severity = "high"
        "#;
        assert!(matches!(
            BuiltinBreedRisks::from_toml(source),
            Err(ConfigError::Invalid(_))
        ));
    }
}
