//! Dog profile models (owned by the host application, read-only here).

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A dog profile as supplied by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DogProfile {
    /// Dog identifier (scopes every fact, alert and analysis)
    pub id: String,
    /// Display name
    pub name: String,
    /// Breed name as entered by the owner
    pub breed: Option<String>,
    /// Explicit age in years
    pub age: Option<f64>,
    /// Alternate explicit age field in years
    pub age_years: Option<f64>,
    /// Date of birth
    pub date_of_birth: Option<NaiveDate>,
    /// Known medications
    pub medications: Vec<String>,
    /// Known allergies
    pub allergies: Vec<String>,
    /// Known chronic conditions
    pub conditions: Vec<String>,
    /// Vaccination schedule
    pub vaccinations: Vec<Vaccination>,
}

/// A single vaccination entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vaccination {
    /// Vaccine name (e.g., "Rabies", "DHPP")
    pub name: String,
    /// Next due date, if scheduled
    #[serde(default)]
    pub next_due: Option<NaiveDate>,
}

impl DogProfile {
    /// Create a profile with only the required fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Resolve the dog's age in years.
    ///
    /// Explicit `age` wins, then `age_years`, then whole years elapsed since
    /// `date_of_birth`. A birth date after `today` yields `None`.
    pub fn resolve_age(&self, today: NaiveDate) -> Option<f64> {
        if let Some(age) = self.age.filter(|a| a.is_finite() && *a >= 0.0) {
            return Some(age);
        }
        if let Some(age) = self.age_years.filter(|a| a.is_finite() && *a >= 0.0) {
            return Some(age);
        }
        let dob = self.date_of_birth?;
        if dob > today {
            return None;
        }
        let mut years = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            years -= 1;
        }
        Some(f64::from(years.max(0)))
    }

    /// Breed name trimmed, or `None` when blank.
    pub fn known_breed(&self) -> Option<&str> {
        self.breed
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }
}
