//! Entity types owned by the registry.
//!
//! Treatments, bills and notifications refer to other entities by identifier only; nothing
//! holds a pointer back to its owner, so every entity can be written to a flat record as-is.

mod billing;
mod treatment;
mod user;

pub use billing::{Bill, Notification};
pub use treatment::{Treatment, TreatmentStatus, TreatmentType};
pub use user::{Account, Admin, Clinician, Patient, Role, User};

use chrono::{Local, NaiveDateTime, SubsecRound};
use std::fmt;

/// The kinds of entity an identifier can refer to, used when reporting a failed lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Patient,
    Clinician,
    Admin,
    /// Any of the three account kinds, used by credential lookups.
    User,
    Treatment,
    TreatmentType,
    Bill,
    Notification,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Clinician => "clinician",
            Self::Admin => "admin",
            Self::User => "user",
            Self::Treatment => "treatment",
            Self::TreatmentType => "treatment type",
            Self::Bill => "bill",
            Self::Notification => "notification",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current local time at second precision, the resolution of the on-disk date format.
pub(crate) fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}
