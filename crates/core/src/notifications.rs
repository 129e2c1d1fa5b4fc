//! Patient notifications.
//!
//! Every notification sent is recorded. Whether the patient is shown it depends on its kind:
//! promotional messages reach only patients who opted in, anything else is always shown.

use crate::constants::NOTIFICATION_ID_PREFIX;
use crate::lifecycle::LifecycleEngine;
use crate::models::{self, Notification, Patient};
use crate::storage::Collection;
use crate::{MmsError, MmsResult};
use serde::Serialize;

/// Receives the notifications a patient is shown.
pub trait NotificationSink {
    fn deliver(&self, patient: &Patient, notification: &Notification);
}

/// Default sink: emits each delivered notification as a tracing event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn deliver(&self, patient: &Patient, notification: &Notification) {
        tracing::info!(
            patient_id = %patient.id(),
            notification_id = %notification.notification_id,
            promotional = notification.is_promotional,
            message = %notification.message,
            "notification delivered"
        );
    }
}

/// Outcome of [`LifecycleEngine::send_notification`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Delivery {
    pub notification: Notification,
    /// False when a promotional message was withheld from an opted-out patient.
    pub shown: bool,
}

pub fn should_display(patient: &Patient, notification: &Notification) -> bool {
    !notification.is_promotional || patient.opted_in_for_promotions
}

impl LifecycleEngine {
    /// Records a notification for the patient and delivers it to the sink unless it is
    /// promotional and the patient opted out.
    ///
    /// # Errors
    ///
    /// - [`MmsError::NotFound`] if the patient does not exist.
    /// - [`MmsError::InvalidInput`] for a blank message. Other messages are stored verbatim.
    pub fn send_notification(
        &mut self,
        patient_id: &str,
        message: &str,
        is_promotional: bool,
    ) -> MmsResult<Delivery> {
        let patient = self.registry().patient(patient_id)?.clone();
        if message.trim().is_empty() {
            return Err(MmsError::InvalidInput(
                "notification message must not be blank".into(),
            ));
        }

        let notification = Notification {
            notification_id: self.next_id(NOTIFICATION_ID_PREFIX),
            patient_id: patient_id.to_string(),
            message: message.to_string(),
            timestamp: models::now(),
            is_promotional,
        };
        self.registry_mut().insert_notification(notification.clone());
        self.persist(&[Collection::Notifications])?;

        let shown = should_display(&patient, &notification);
        if shown {
            self.sink().deliver(&patient, &notification);
        } else {
            tracing::warn!(
                patient_id,
                notification_id = %notification.notification_id,
                "promotional notification withheld, patient opted out"
            );
        }

        Ok(Delivery {
            notification,
            shown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::MmsError;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct RecordingSink {
        delivered: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl NotificationSink for RecordingSink {
        fn deliver(&self, patient: &Patient, notification: &Notification) {
            self.delivered.borrow_mut().push((
                patient.id().to_string(),
                notification.message.clone(),
            ));
        }
    }

    fn engine(temp_dir: &TempDir, sink: RecordingSink) -> LifecycleEngine {
        let cfg = CoreConfig::new(temp_dir.path().to_path_buf()).unwrap();
        LifecycleEngine::open(Arc::new(cfg)).unwrap().with_sink(sink)
    }

    #[test]
    fn opted_out_patient_is_not_shown_promotions() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let sink = RecordingSink::default();
        let mut engine = engine(&temp_dir, sink.clone());
        engine.set_promotions_opt_in("PAT001", false).unwrap();

        let promo = engine
            .send_notification("PAT001", "20% off check-ups", true)
            .unwrap();
        let reminder = engine
            .send_notification("PAT001", "Appointment tomorrow", false)
            .unwrap();

        assert!(!promo.shown);
        assert!(reminder.shown);
        assert_eq!(
            *sink.delivered.borrow(),
            vec![("PAT001".to_string(), "Appointment tomorrow".to_string())]
        );
        assert_eq!(engine.registry().patient_notifications("PAT001").len(), 2);
    }

    #[test]
    fn opted_in_patient_sees_promotions() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let sink = RecordingSink::default();
        let mut engine = engine(&temp_dir, sink.clone());

        let delivery = engine
            .send_notification("PAT001", "New therapy sessions", true)
            .unwrap();

        assert!(delivery.shown);
        assert!(delivery.notification.notification_id.starts_with("NOT-"));
        assert_eq!(sink.delivered.borrow().len(), 1);
    }

    #[test]
    fn notifications_are_persisted() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let id = {
            let mut engine = engine(&temp_dir, RecordingSink::default());
            engine.set_promotions_opt_in("PAT001", false).unwrap();
            engine
                .send_notification("PAT001", "Spring offer, 2 for 1", true)
                .unwrap()
                .notification
                .notification_id
        };

        let engine = engine(&temp_dir, RecordingSink::default());
        let stored = engine.registry().notification(&id).unwrap();
        assert_eq!(stored.message, "Spring offer, 2 for 1");
        assert!(stored.is_promotional);
    }

    #[test]
    fn message_whitespace_is_kept() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let sink = RecordingSink::default();
        let message = "  Clinic closed Friday,\n  reopens Monday  ";
        let id = {
            let mut engine = engine(&temp_dir, sink.clone());
            let delivery = engine.send_notification("PAT001", message, false).unwrap();
            assert_eq!(delivery.notification.message, message);
            delivery.notification.notification_id
        };
        assert_eq!(sink.delivered.borrow()[0].1, message);

        let engine = engine(&temp_dir, RecordingSink::default());
        assert_eq!(engine.registry().notification(&id).unwrap().message, message);
    }

    #[test]
    fn rejects_unknown_patient_and_empty_message() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let sink = RecordingSink::default();
        let mut engine = engine(&temp_dir, sink.clone());

        assert!(matches!(
            engine.send_notification("PAT-missing", "hello", false),
            Err(MmsError::NotFound { .. })
        ));
        assert!(matches!(
            engine.send_notification("PAT001", "   ", false),
            Err(MmsError::InvalidInput(_))
        ));
        assert!(engine.registry().notifications().is_empty());
        assert!(sink.delivered.borrow().is_empty());
    }
}
