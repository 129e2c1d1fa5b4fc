//! Bills and patient notifications.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A bill raised against one treatment.
///
/// `total_amount` is copied from the treatment type when the bill is generated and is never
/// recomputed. `paid_date` is `Some` exactly when `is_paid` is true.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub bill_id: String,
    pub patient_id: String,
    pub treatment_id: String,
    pub total_amount: f64,
    pub is_paid: bool,
    pub created_date: NaiveDateTime,
    pub paid_date: Option<NaiveDateTime>,
}

impl Bill {
    pub fn new(
        bill_id: impl Into<String>,
        patient_id: impl Into<String>,
        treatment_id: impl Into<String>,
        total_amount: f64,
        created_date: NaiveDateTime,
    ) -> Self {
        Self {
            bill_id: bill_id.into(),
            patient_id: patient_id.into(),
            treatment_id: treatment_id.into(),
            total_amount,
            is_paid: false,
            created_date,
            paid_date: None,
        }
    }

    pub fn mark_paid(&mut self, at: NaiveDateTime) {
        self.is_paid = true;
        self.paid_date = Some(at);
    }
}

/// A message sent to a patient. `message` is kept exactly as given and is never blank.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: String,
    pub patient_id: String,
    pub message: String,
    pub timestamp: NaiveDateTime,
    pub is_promotional: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn new_bill_is_unpaid() {
        let bill = Bill::new("BILL1", "PAT1", "TRE1", 100.0, at(9));
        assert!(!bill.is_paid);
        assert_eq!(bill.paid_date, None);
    }

    #[test]
    fn mark_paid_sets_date() {
        let mut bill = Bill::new("BILL1", "PAT1", "TRE1", 100.0, at(9));
        bill.mark_paid(at(10));
        assert!(bill.is_paid);
        assert_eq!(bill.paid_date, Some(at(10)));
    }
}
