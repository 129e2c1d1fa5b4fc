//! Constants used throughout the MMS core crate.
//!
//! File names, the record delimiter and the on-disk date format live here so the storage
//! layout is defined in one place.

/// Default storage directory when none is configured.
pub const DEFAULT_STORAGE_DIR: &str = "storage";

/// Environment variable the binaries read (once, at startup) to override the storage directory.
pub const STORAGE_DIR_ENV: &str = "MMS_STORAGE_DIR";

/// Field delimiter used by the flat-record files.
pub const FIELD_DELIMITER: char = ',';

/// Escape character for delimiters, line breaks and itself inside a field.
pub const ESCAPE_CHAR: char = '\\';

/// `yyyy-MM-dd HH:mm:ss`
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Suffix of the staging file written before a collection is renamed into place.
pub const STAGING_SUFFIX: &str = ".tmp";

pub const PATIENTS_FILENAME: &str = "patients.csv";
pub const CLINICIANS_FILENAME: &str = "clinicians.csv";
pub const ADMINS_FILENAME: &str = "admins.csv";
pub const TREATMENTS_FILENAME: &str = "treatments.csv";
pub const TREATMENT_TYPES_FILENAME: &str = "treatment_types.csv";
pub const BILLS_FILENAME: &str = "bills.csv";
pub const NOTIFICATIONS_FILENAME: &str = "notifications.csv";

/// Identifier prefixes, one per entity kind.
pub const PATIENT_ID_PREFIX: &str = "PAT";
pub const CLINICIAN_ID_PREFIX: &str = "CLI";
pub const ADMIN_ID_PREFIX: &str = "ADM";
pub const TREATMENT_ID_PREFIX: &str = "TRE";
pub const TREATMENT_TYPE_ID_PREFIX: &str = "TRT";
pub const BILL_ID_PREFIX: &str = "BILL";
pub const NOTIFICATION_ID_PREFIX: &str = "NOT";
