//! Account holders: patients, clinicians and administrators.

use mms_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fields every account kind shares.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: NonEmptyText,
    pub phone: String,
    pub email: EmailAddress,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl Account {
    pub fn new(
        id: impl Into<String>,
        name: NonEmptyText,
        phone: impl Into<String>,
        email: EmailAddress,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name,
            phone: phone.into(),
            email,
            password: password.into(),
        }
    }

    /// Exact password comparison against the stored value.
    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password == candidate
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(flatten)]
    pub account: Account,
    pub registered: bool,
    pub flagged: bool,
    pub opted_in_for_promotions: bool,
}

impl Patient {
    /// A newly registered patient: not yet upgraded, not flagged, opted in to promotions.
    pub fn new(account: Account) -> Self {
        Self {
            account,
            registered: false,
            flagged: false,
            opted_in_for_promotions: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.account.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clinician {
    #[serde(flatten)]
    pub account: Account,
    pub specialization: String,
    pub max_patients: u32,
}

impl Clinician {
    pub fn id(&self) -> &str {
        &self.account.id
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    #[serde(flatten)]
    pub account: Account,
    pub department: String,
}

impl Admin {
    pub fn id(&self) -> &str {
        &self.account.id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Clinician,
    Patient,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Clinician => "clinician",
            Role::Patient => "patient",
        })
    }
}

/// Any account holder, tagged by kind.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum User {
    Admin(Admin),
    Clinician(Clinician),
    Patient(Patient),
}

impl User {
    pub fn account(&self) -> &Account {
        match self {
            User::Admin(admin) => &admin.account,
            User::Clinician(clinician) => &clinician.account,
            User::Patient(patient) => &patient.account,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            User::Admin(_) => Role::Admin,
            User::Clinician(_) => Role::Clinician,
            User::Patient(_) => Role::Patient,
        }
    }
}
