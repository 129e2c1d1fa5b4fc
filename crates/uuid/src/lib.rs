//! UUID and timestamp identifier utilities.
//!
//! MMS identifies every entity it creates with an opaque string. New identifiers are built
//! from two parts:
//!
//! - a millisecond UTC timestamp that is strictly increasing within one generator, and
//! - a random version 4 UUID in *canonical* form (32 lowercase hex characters, no hyphens).
//!
//! ```text
//! 20261016T101500.123Z-550e8400e29b41d4a716446655440000
//! ```
//!
//! The timestamp keeps identifiers ordered by creation time; the UUID removes any chance of
//! two rapid calls producing the same value.

mod canonical;
mod timestamp;

pub use canonical::CanonicalUuid;
pub use timestamp::{TimestampId, TimestampIdGenerator};
