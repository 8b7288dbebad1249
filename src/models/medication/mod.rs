// Medication module
// Read-only view of a medication record as produced by the medication form

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Who owns a medication record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MedicationOwner {
    #[default]
    Guest,
    User,
}

/// A medication with its daily dosing times.
///
/// `times` holds time-of-day markers. They are usually persisted as ISO
/// timestamps whose date component is meaningless; `HH:MM` is accepted too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub dose: String,
    pub times: Vec<String>,
    #[serde(default)]
    pub owner: MedicationOwner,
    pub created_at: DateTime<Local>,
}

impl Medication {
    /// Create a new medication record.
    ///
    /// # Examples
    /// ```
    /// use medtime::models::medication::Medication;
    ///
    /// let med = Medication::new("m1", "Paracetamol", "500 mg", ["08:00", "20:00"]).unwrap();
    /// assert_eq!(med.times.len(), 2);
    /// ```
    pub fn new<I, S>(
        id: impl Into<String>,
        name: impl Into<String>,
        dose: impl Into<String>,
        times: I,
    ) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let medication = Self {
            id: id.into(),
            name: name.into(),
            dose: dose.into(),
            times: times.into_iter().map(Into::into).collect(),
            owner: MedicationOwner::Guest,
            created_at: Local::now(),
        };
        medication.validate()?;
        Ok(medication)
    }

    /// Validate the identifying fields. Individual times are validated when
    /// they are scheduled, so one bad slot never rejects the whole record.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Medication id cannot be empty".to_string());
        }

        // Underscores delimit schedule identifiers at the platform boundary
        if self.id.contains('_') {
            return Err("Medication id cannot contain '_'".to_string());
        }

        if self.name.trim().is_empty() {
            return Err("Medication name cannot be empty".to_string());
        }

        Ok(())
    }

    /// Short display label, e.g. `Paracetamol (500 mg)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.dose)
    }

    pub fn with_owner(mut self, owner: MedicationOwner) -> Self {
        self.owner = owner;
        self
    }
}
