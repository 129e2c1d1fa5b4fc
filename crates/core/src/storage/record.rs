//! Mapping between entities and flat-record fields.

use super::Collection;
use crate::constants::DATE_TIME_FORMAT;
use crate::models::{
    Account, Admin, Bill, Clinician, Notification, Patient, Treatment, TreatmentStatus,
    TreatmentType,
};
use chrono::NaiveDateTime;
use mms_types::{EmailAddress, NonEmptyText};

/// An entity that is stored as one line of a collection file.
///
/// `FIELDS` doubles as the header line. `from_fields` receives at least `FIELDS.len()`
/// values; the adapter rejects shorter records before calling it.
pub trait FlatRecord: Sized {
    const COLLECTION: Collection;
    const FIELDS: &'static [&'static str];

    fn to_fields(&self) -> Vec<String>;

    fn from_fields(fields: &[String]) -> Result<Self, String>;
}

fn text(value: &str, field: &str) -> Result<NonEmptyText, String> {
    NonEmptyText::new(value).map_err(|e| format!("{}: {}", field, e))
}

/// Non-blank text kept exactly as stored.
fn verbatim_text(value: &str, field: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err(format!("{}: must not be blank", field));
    }
    Ok(value.to_string())
}

fn email(value: &str) -> Result<EmailAddress, String> {
    EmailAddress::parse(value).map_err(|e| format!("email: {}", e))
}

fn flag(value: &str, field: &str) -> Result<bool, String> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(format!("{}: expected true or false, got '{}'", field, other)),
    }
}

fn amount(value: &str, field: &str) -> Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("{}: {}", field, e))
}

/// An amount that must be a finite number above zero.
fn positive_amount(value: &str, field: &str) -> Result<f64, String> {
    let parsed = amount(value, field)?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(format!(
            "{}: must be a finite number above zero, got '{}'",
            field,
            value.trim()
        ));
    }
    Ok(parsed)
}

fn date_time(value: &str, field: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value.trim(), DATE_TIME_FORMAT)
        .map_err(|e| format!("{}: {}", field, e))
}

fn optional_date_time(value: &str, field: &str) -> Result<Option<NaiveDateTime>, String> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    date_time(value, field).map(Some)
}

fn format_date_time(value: &NaiveDateTime) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

fn optional_id(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn account_fields(account: &Account) -> Vec<String> {
    vec![
        account.id.clone(),
        account.name.to_string(),
        account.phone.clone(),
        account.email.to_string(),
        account.password.clone(),
    ]
}

/// Reads the five leading account fields shared by every user collection.
fn account_from(fields: &[String]) -> Result<Account, String> {
    Ok(Account::new(
        text(&fields[0], "id")?.into_inner(),
        text(&fields[1], "name")?,
        fields[2].clone(),
        email(&fields[3])?,
        fields[4].clone(),
    ))
}

impl FlatRecord for Patient {
    const COLLECTION: Collection = Collection::Patients;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "phone",
        "email",
        "password",
        "isRegistered",
        "isFlagged",
        "optedInForPromotions",
    ];

    fn to_fields(&self) -> Vec<String> {
        let mut fields = account_fields(&self.account);
        fields.push(self.registered.to_string());
        fields.push(self.flagged.to_string());
        fields.push(self.opted_in_for_promotions.to_string());
        fields
    }

    fn from_fields(fields: &[String]) -> Result<Self, String> {
        Ok(Self {
            account: account_from(fields)?,
            registered: flag(&fields[5], "isRegistered")?,
            flagged: flag(&fields[6], "isFlagged")?,
            opted_in_for_promotions: flag(&fields[7], "optedInForPromotions")?,
        })
    }
}

impl FlatRecord for Clinician {
    const COLLECTION: Collection = Collection::Clinicians;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "phone",
        "email",
        "password",
        "specialization",
        "maxPatients",
    ];

    fn to_fields(&self) -> Vec<String> {
        let mut fields = account_fields(&self.account);
        fields.push(self.specialization.clone());
        fields.push(self.max_patients.to_string());
        fields
    }

    fn from_fields(fields: &[String]) -> Result<Self, String> {
        let max_patients = fields[6]
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("maxPatients: {}", e))?;

        Ok(Self {
            account: account_from(fields)?,
            specialization: fields[5].clone(),
            max_patients,
        })
    }
}

impl FlatRecord for Admin {
    const COLLECTION: Collection = Collection::Admins;
    const FIELDS: &'static [&'static str] =
        &["id", "name", "phone", "email", "password", "department"];

    fn to_fields(&self) -> Vec<String> {
        let mut fields = account_fields(&self.account);
        fields.push(self.department.clone());
        fields
    }

    fn from_fields(fields: &[String]) -> Result<Self, String> {
        Ok(Self {
            account: account_from(fields)?,
            department: fields[5].clone(),
        })
    }
}

impl FlatRecord for TreatmentType {
    const COLLECTION: Collection = Collection::TreatmentTypes;
    const FIELDS: &'static [&'static str] = &["id", "name", "price"];

    fn to_fields(&self) -> Vec<String> {
        // `{}` on f64 is the shortest text that parses back to the same value.
        vec![self.id.clone(), self.name.to_string(), self.price.to_string()]
    }

    fn from_fields(fields: &[String]) -> Result<Self, String> {
        TreatmentType::new(
            text(&fields[0], "id")?.into_inner(),
            text(&fields[1], "name")?,
            amount(&fields[2], "price")?,
        )
        .map_err(|e| e.to_string())
    }
}

impl FlatRecord for Treatment {
    const COLLECTION: Collection = Collection::Treatments;
    const FIELDS: &'static [&'static str] = &[
        "treatmentId",
        "patientId",
        "clinicianId",
        "treatmentTypeId",
        "status",
        "createdDate",
        "notes",
    ];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.treatment_id.clone(),
            self.patient_id.clone(),
            self.clinician_id.clone().unwrap_or_default(),
            self.treatment_type_id.clone(),
            self.status.as_str().to_string(),
            format_date_time(&self.created_date),
            self.notes.clone(),
        ]
    }

    fn from_fields(fields: &[String]) -> Result<Self, String> {
        let status = fields[4]
            .parse::<TreatmentStatus>()
            .map_err(|e| format!("status: {}", e))?;

        Ok(Self {
            treatment_id: text(&fields[0], "treatmentId")?.into_inner(),
            patient_id: text(&fields[1], "patientId")?.into_inner(),
            clinician_id: optional_id(&fields[2]),
            treatment_type_id: text(&fields[3], "treatmentTypeId")?.into_inner(),
            status,
            created_date: date_time(&fields[5], "createdDate")?,
            notes: fields[6].clone(),
        })
    }
}

impl FlatRecord for Bill {
    const COLLECTION: Collection = Collection::Bills;
    const FIELDS: &'static [&'static str] = &[
        "billId",
        "patientId",
        "treatmentId",
        "totalAmount",
        "isPaid",
        "createdDate",
        "paidDate",
    ];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.bill_id.clone(),
            self.patient_id.clone(),
            self.treatment_id.clone(),
            self.total_amount.to_string(),
            self.is_paid.to_string(),
            format_date_time(&self.created_date),
            self.paid_date.as_ref().map(format_date_time).unwrap_or_default(),
        ]
    }

    fn from_fields(fields: &[String]) -> Result<Self, String> {
        let is_paid = flag(&fields[4], "isPaid")?;
        let paid_date = optional_date_time(&fields[6], "paidDate")?;
        if is_paid != paid_date.is_some() {
            return Err("paidDate must be present exactly when isPaid is true".into());
        }

        Ok(Self {
            bill_id: text(&fields[0], "billId")?.into_inner(),
            patient_id: text(&fields[1], "patientId")?.into_inner(),
            treatment_id: text(&fields[2], "treatmentId")?.into_inner(),
            total_amount: positive_amount(&fields[3], "totalAmount")?,
            is_paid,
            created_date: date_time(&fields[5], "createdDate")?,
            paid_date,
        })
    }
}

impl FlatRecord for Notification {
    const COLLECTION: Collection = Collection::Notifications;
    const FIELDS: &'static [&'static str] = &[
        "notificationId",
        "patientId",
        "message",
        "timestamp",
        "isPromotional",
    ];

    fn to_fields(&self) -> Vec<String> {
        vec![
            self.notification_id.clone(),
            self.patient_id.clone(),
            self.message.clone(),
            format_date_time(&self.timestamp),
            self.is_promotional.to_string(),
        ]
    }

    fn from_fields(fields: &[String]) -> Result<Self, String> {
        Ok(Self {
            notification_id: text(&fields[0], "notificationId")?.into_inner(),
            patient_id: text(&fields[1], "patientId")?.into_inner(),
            message: verbatim_text(&fields[2], "message")?,
            timestamp: date_time(&fields[3], "timestamp")?,
            is_promotional: flag(&fields[4], "isPromotional")?,
        })
    }
}
