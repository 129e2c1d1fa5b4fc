//! # MMS Core
//!
//! Entity lifecycle and persistence for the medical-service accounts system.
//!
//! This crate owns the data rules and the flat-file store:
//! - Patients, clinicians and admins, their registration and account flags
//! - The treatment → bill → payment lifecycle
//! - Notifications and the promotional opt-in
//! - Loading and committing the collection files under the storage directory
//!
//! Construction is explicit: a [`CoreConfig`] resolved at startup opens a
//! [`StorageAdapter`], which loads an [`EntityRegistry`], which the [`LifecycleEngine`]
//! owns and mutates. Front ends live in `mms-cli`.

pub mod config;
pub mod constants;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod notifications;
pub mod registry;
pub mod storage;

pub use config::{storage_dir_from_env_value, CoreConfig};
pub use error::{MmsError, MmsResult};
pub use lifecycle::LifecycleEngine;
pub use models::{
    Account, Admin, Bill, Clinician, EntityKind, Notification, Patient, Role, Treatment,
    TreatmentStatus, TreatmentType, User,
};
pub use notifications::{should_display, Delivery, NotificationSink, TracingSink};
pub use registry::EntityRegistry;
pub use storage::{Collection, FlatRecord, StagedCollection, StorageAdapter};
