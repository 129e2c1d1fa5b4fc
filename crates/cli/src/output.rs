//! Human-readable and JSON rendering of command results.

use mms_core::constants::DATE_TIME_FORMAT;
use mms_core::{
    Admin, Bill, Clinician, Delivery, Notification, NotificationSink, Patient, Treatment,
    TreatmentType, User,
};
use serde::Serialize;

/// Prints `value` as pretty JSON when `json` is set, otherwise the text from `human`.
pub fn emit<T: Serialize + ?Sized>(
    json: bool,
    value: &T,
    human: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", human(value));
    }
    Ok(())
}

/// One line per item, or `empty` when there are none.
pub fn lines<T>(items: &[T], empty: &str, line: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items.iter().map(line).collect::<Vec<_>>().join("\n")
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub fn patient(p: &Patient) -> String {
    format!(
        "{}  {}  <{}>  phone: {}  registered: {}  flagged: {}  promotions: {}",
        p.id(),
        p.account.name,
        p.account.email,
        p.account.phone,
        yes_no(p.registered),
        yes_no(p.flagged),
        yes_no(p.opted_in_for_promotions)
    )
}

pub fn clinician(c: &Clinician) -> String {
    format!(
        "{}  {}  <{}>  {}  max patients: {}",
        c.id(),
        c.account.name,
        c.account.email,
        c.specialization,
        c.max_patients
    )
}

pub fn admin(a: &Admin) -> String {
    format!(
        "{}  {}  <{}>  {}",
        a.id(),
        a.account.name,
        a.account.email,
        a.department
    )
}

pub fn user(u: &User) -> String {
    format!(
        "Logged in as {} ({}, {})",
        u.account().name,
        u.role(),
        u.account().id
    )
}

pub fn treatment_type(t: &TreatmentType) -> String {
    format!("{}  {}  ${:.2}", t.id, t.name, t.price)
}

pub fn treatment(t: &Treatment) -> String {
    let mut out = format!(
        "{}  patient: {}  type: {}  clinician: {}  status: {}  created: {}",
        t.treatment_id,
        t.patient_id,
        t.treatment_type_id,
        t.clinician_id.as_deref().unwrap_or("-"),
        t.status,
        t.created_date.format(DATE_TIME_FORMAT)
    );
    if !t.notes.is_empty() {
        out.push_str(&format!("\n    notes: {}", t.notes.replace('\n', "\n           ")));
    }
    out
}

pub fn bill(b: &Bill) -> String {
    let paid = match &b.paid_date {
        Some(at) => format!("paid {}", at.format(DATE_TIME_FORMAT)),
        None => "unpaid".to_string(),
    };
    format!(
        "{}  patient: {}  treatment: {}  ${:.2}  {}  created: {}",
        b.bill_id,
        b.patient_id,
        b.treatment_id,
        b.total_amount,
        paid,
        b.created_date.format(DATE_TIME_FORMAT)
    )
}

pub fn notification(n: &Notification) -> String {
    format!(
        "{}  patient: {}  {}{}",
        n.notification_id,
        n.patient_id,
        if n.is_promotional { "[promo] " } else { "" },
        n.message
    )
}

pub fn delivery(d: &Delivery) -> String {
    if d.shown {
        format!("Sent {}", d.notification.notification_id)
    } else {
        format!(
            "Recorded {} (not shown: patient opted out of promotions)",
            d.notification.notification_id
        )
    }
}

/// Prints delivered notifications to the terminal.
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn deliver(&self, patient: &Patient, notification: &Notification) {
        println!(
            "[NOTIFICATION for {}] {}",
            patient.account.name, notification.message
        );
    }
}
