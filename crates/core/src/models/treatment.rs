//! Treatment types, booked treatments and the treatment status sequence.

use crate::{MmsError, MmsResult};
use chrono::NaiveDateTime;
use mms_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Progress of a treatment, in the order the front ends present it.
///
/// The engine does not restrict moves between states; see
/// [`LifecycleEngine::update_treatment_status`](crate::LifecycleEngine::update_treatment_status).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TreatmentStatus {
    New,
    Assessed,
    BillGenerated,
    Completed,
    Paid,
}

impl TreatmentStatus {
    pub const ALL: [TreatmentStatus; 5] = [
        TreatmentStatus::New,
        TreatmentStatus::Assessed,
        TreatmentStatus::BillGenerated,
        TreatmentStatus::Completed,
        TreatmentStatus::Paid,
    ];

    /// Stable code used in storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Assessed => "Assessed",
            Self::BillGenerated => "BillGenerated",
            Self::Completed => "Completed",
            Self::Paid => "Paid",
        }
    }

    /// Display label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::BillGenerated => "Bill Generated",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for TreatmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TreatmentStatus {
    type Err = MmsError;

    /// Accepts the storage code or the display label, ignoring case, spaces, `-` and `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();

        TreatmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| MmsError::InvalidInput(format!("unknown treatment status: '{}'", s)))
    }
}

/// A bookable kind of treatment and its current price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreatmentType {
    pub id: String,
    pub name: NonEmptyText,
    pub price: f64,
}

impl TreatmentType {
    /// # Errors
    ///
    /// Returns [`MmsError::InvalidInput`] unless `price` is finite and greater than zero.
    pub fn new(id: impl Into<String>, name: NonEmptyText, price: f64) -> MmsResult<Self> {
        validate_price(price)?;
        Ok(Self {
            id: id.into(),
            name,
            price,
        })
    }
}

pub(crate) fn validate_price(price: f64) -> MmsResult<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(MmsError::InvalidInput(format!(
            "price must be greater than zero, got {}",
            price
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub treatment_id: String,
    pub patient_id: String,
    pub clinician_id: Option<String>,
    pub treatment_type_id: String,
    pub status: TreatmentStatus,
    pub created_date: NaiveDateTime,
    pub notes: String,
}

impl Treatment {
    /// A freshly booked treatment: status `New`, no clinician, no notes.
    pub fn new(
        treatment_id: impl Into<String>,
        patient_id: impl Into<String>,
        treatment_type_id: impl Into<String>,
        created_date: NaiveDateTime,
    ) -> Self {
        Self {
            treatment_id: treatment_id.into(),
            patient_id: patient_id.into(),
            clinician_id: None,
            treatment_type_id: treatment_type_id.into(),
            status: TreatmentStatus::New,
            created_date,
            notes: String::new(),
        }
    }
}
