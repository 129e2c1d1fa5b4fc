//! Flat-file persistence.
//!
//! Each entity collection lives in its own file under the configured storage directory: a
//! header line naming the fields, then one encoded record per line. See [`StorageAdapter`]
//! for loading and the staged multi-file commit.

mod adapter;
mod codec;
mod record;

pub use adapter::{StagedCollection, StorageAdapter};
pub use record::FlatRecord;

#[cfg(test)]
pub(crate) use adapter::force_rename_failure;

use crate::constants::{
    ADMINS_FILENAME, BILLS_FILENAME, CLINICIANS_FILENAME, NOTIFICATIONS_FILENAME,
    PATIENTS_FILENAME, TREATMENTS_FILENAME, TREATMENT_TYPES_FILENAME,
};
use std::fmt;

/// One persisted collection, and so one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Patients,
    Clinicians,
    Admins,
    Treatments,
    TreatmentTypes,
    Bills,
    Notifications,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Patients,
        Collection::Clinicians,
        Collection::Admins,
        Collection::Treatments,
        Collection::TreatmentTypes,
        Collection::Bills,
        Collection::Notifications,
    ];

    pub const fn filename(self) -> &'static str {
        match self {
            Self::Patients => PATIENTS_FILENAME,
            Self::Clinicians => CLINICIANS_FILENAME,
            Self::Admins => ADMINS_FILENAME,
            Self::Treatments => TREATMENTS_FILENAME,
            Self::TreatmentTypes => TREATMENT_TYPES_FILENAME,
            Self::Bills => BILLS_FILENAME,
            Self::Notifications => NOTIFICATIONS_FILENAME,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename())
    }
}
