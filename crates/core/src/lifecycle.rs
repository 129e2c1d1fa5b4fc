//! Mutating operations over the registry.
//!
//! Every operation validates against the [`EntityRegistry`] first and returns without
//! touching anything when validation fails. Once validated it mutates the registry, then
//! persists the collections it changed. A storage failure at that point is returned to the
//! caller but the in-memory change is kept.

use crate::config::CoreConfig;
use crate::constants::{
    ADMIN_ID_PREFIX, BILL_ID_PREFIX, CLINICIAN_ID_PREFIX, PATIENT_ID_PREFIX,
    TREATMENT_ID_PREFIX, TREATMENT_TYPE_ID_PREFIX,
};
use crate::models::{
    self, Account, Admin, Bill, Clinician, EntityKind, Patient, Treatment, TreatmentStatus,
    TreatmentType, User,
};
use crate::notifications::{NotificationSink, TracingSink};
use crate::registry::EntityRegistry;
use crate::storage::{Collection, StorageAdapter};
use crate::{MmsError, MmsResult};
use mms_types::{EmailAddress, NonEmptyText};
use mms_uuid::TimestampIdGenerator;
use std::sync::Arc;

/// Owns the registry and its store, and is the only way to change either.
pub struct LifecycleEngine {
    storage: StorageAdapter,
    registry: EntityRegistry,
    ids: TimestampIdGenerator,
    sink: Box<dyn NotificationSink>,
}

impl LifecycleEngine {
    /// Opens the store named by `cfg`, loads (and if needed seeds) the registry, and
    /// delivers notifications through [`TracingSink`].
    ///
    /// # Errors
    ///
    /// Returns any storage error raised while creating the directory or loading.
    pub fn open(cfg: Arc<CoreConfig>) -> MmsResult<Self> {
        let seed = cfg.seed_on_empty();
        let storage = StorageAdapter::open(cfg)?;
        let registry = EntityRegistry::load(&storage, seed)?;
        Ok(Self::new(storage, registry))
    }

    pub fn new(storage: StorageAdapter, registry: EntityRegistry) -> Self {
        Self {
            storage,
            registry,
            ids: TimestampIdGenerator::new(),
            sink: Box::new(TracingSink),
        }
    }

    /// Replaces the notification receive hook.
    pub fn with_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub(crate) fn sink(&self) -> &dyn NotificationSink {
        self.sink.as_ref()
    }

    pub(crate) fn next_id(&mut self, prefix: &str) -> String {
        self.ids.next_prefixed(prefix)
    }

    /// Writes the current contents of `collections` in one commit.
    pub(crate) fn persist(&self, collections: &[Collection]) -> MmsResult<()> {
        let staged = collections
            .iter()
            .map(|c| self.registry.stage(*c))
            .collect();
        self.storage.commit(staged)
    }

    fn new_account(
        &mut self,
        prefix: &str,
        name: &str,
        phone: &str,
        email: &str,
        password: &str,
    ) -> MmsResult<Account> {
        let name = NonEmptyText::new(name)?;
        let email = EmailAddress::parse(email)?;
        if self.registry.email_in_use(email.as_str()) {
            return Err(MmsError::InvalidInput(format!(
                "email already registered: {}",
                email
            )));
        }

        Ok(Account::new(
            self.next_id(prefix),
            name,
            phone.trim(),
            email,
            password,
        ))
    }

    /// Registers a patient: not yet upgraded, not flagged, opted in to promotions.
    ///
    /// # Errors
    ///
    /// [`MmsError::InvalidInput`] for an empty name, a malformed email, or an email any
    /// account already uses.
    pub fn register_patient(
        &mut self,
        name: &str,
        phone: &str,
        email: &str,
        password: &str,
    ) -> MmsResult<Patient> {
        let account = self.new_account(PATIENT_ID_PREFIX, name, phone, email, password)?;
        let patient = Patient::new(account);
        self.registry.insert_patient(patient.clone());
        self.persist(&[Collection::Patients])?;

        tracing::info!(patient_id = %patient.id(), "patient registered");
        Ok(patient)
    }

    /// Registers a clinician. Validation as for [`register_patient`](Self::register_patient).
    pub fn register_clinician(
        &mut self,
        name: &str,
        phone: &str,
        email: &str,
        password: &str,
        specialization: &str,
        max_patients: u32,
    ) -> MmsResult<Clinician> {
        let clinician = Clinician {
            account: self.new_account(CLINICIAN_ID_PREFIX, name, phone, email, password)?,
            specialization: specialization.trim().to_string(),
            max_patients,
        };
        self.registry.insert_clinician(clinician.clone());
        self.persist(&[Collection::Clinicians])?;

        tracing::info!(clinician_id = %clinician.id(), "clinician registered");
        Ok(clinician)
    }

    /// Registers an admin. Validation as for [`register_patient`](Self::register_patient).
    pub fn register_admin(
        &mut self,
        name: &str,
        phone: &str,
        email: &str,
        password: &str,
        department: &str,
    ) -> MmsResult<Admin> {
        let admin = Admin {
            account: self.new_account(ADMIN_ID_PREFIX, name, phone, email, password)?,
            department: department.trim().to_string(),
        };
        self.registry.insert_admin(admin.clone());
        self.persist(&[Collection::Admins])?;

        tracing::info!(admin_id = %admin.id(), "admin registered");
        Ok(admin)
    }

    fn update_patient(
        &mut self,
        patient_id: &str,
        change: impl FnOnce(&mut Patient),
    ) -> MmsResult<Patient> {
        let patient = self.registry.patient_mut(patient_id)?;
        change(patient);
        let patient = patient.clone();
        self.persist(&[Collection::Patients])?;
        Ok(patient)
    }

    /// Marks the patient as registered, allowing them to book treatments. Idempotent.
    pub fn upgrade_patient(&mut self, patient_id: &str) -> MmsResult<Patient> {
        let patient = self.update_patient(patient_id, |p| p.registered = true)?;
        tracing::info!(patient_id, "patient upgraded");
        Ok(patient)
    }

    /// Idempotent.
    pub fn flag_patient(&mut self, patient_id: &str) -> MmsResult<Patient> {
        let patient = self.update_patient(patient_id, |p| p.flagged = true)?;
        tracing::info!(patient_id, "patient flagged");
        Ok(patient)
    }

    pub fn set_promotions_opt_in(
        &mut self,
        patient_id: &str,
        opted_in: bool,
    ) -> MmsResult<Patient> {
        let patient = self.update_patient(patient_id, |p| p.opted_in_for_promotions = opted_in)?;
        tracing::info!(patient_id, opted_in, "promotions preference set");
        Ok(patient)
    }

    pub fn toggle_promotions(&mut self, patient_id: &str) -> MmsResult<Patient> {
        let patient = self.update_patient(patient_id, |p| {
            p.opted_in_for_promotions = !p.opted_in_for_promotions
        })?;
        tracing::info!(
            patient_id,
            opted_in = patient.opted_in_for_promotions,
            "promotions preference toggled"
        );
        Ok(patient)
    }

    /// Books a treatment of the given type for a registered patient.
    ///
    /// # Errors
    ///
    /// - [`MmsError::NotFound`] if the patient or the treatment type does not exist.
    /// - [`MmsError::InvalidInput`] if the patient has not been upgraded to registered.
    pub fn book_treatment(
        &mut self,
        patient_id: &str,
        treatment_type_id: &str,
    ) -> MmsResult<Treatment> {
        if !self.registry.patient(patient_id)?.registered {
            return Err(MmsError::InvalidInput(format!(
                "patient {} is not registered and cannot book treatments",
                patient_id
            )));
        }
        self.registry.treatment_type(treatment_type_id)?;

        let treatment = Treatment::new(
            self.next_id(TREATMENT_ID_PREFIX),
            patient_id,
            treatment_type_id,
            models::now(),
        );
        self.registry.insert_treatment(treatment.clone());
        self.persist(&[Collection::Treatments])?;

        tracing::info!(
            treatment_id = %treatment.treatment_id,
            patient_id,
            treatment_type_id,
            "treatment booked"
        );
        Ok(treatment)
    }

    /// Sets the treatment's clinician. The status is left as it is.
    pub fn assign_clinician(
        &mut self,
        treatment_id: &str,
        clinician_id: &str,
    ) -> MmsResult<Treatment> {
        self.registry.treatment(treatment_id)?;
        self.registry.clinician(clinician_id)?;

        let treatment = self.registry.treatment_mut(treatment_id)?;
        treatment.clinician_id = Some(clinician_id.to_string());
        let treatment = treatment.clone();
        self.persist(&[Collection::Treatments])?;

        tracing::info!(treatment_id, clinician_id, "clinician assigned");
        Ok(treatment)
    }

    /// Overwrites the treatment's status with any state, including an earlier one.
    pub fn update_treatment_status(
        &mut self,
        treatment_id: &str,
        status: TreatmentStatus,
    ) -> MmsResult<Treatment> {
        let treatment = self.registry.treatment_mut(treatment_id)?;
        let previous = treatment.status;
        treatment.status = status;
        let treatment = treatment.clone();

        if status < previous {
            tracing::warn!(
                treatment_id,
                from = %previous,
                to = %status,
                "treatment status moved backwards"
            );
        }
        self.persist(&[Collection::Treatments])?;

        tracing::info!(treatment_id, from = %previous, to = %status, "treatment status updated");
        Ok(treatment)
    }

    /// Replaces the clinician's notes on a treatment.
    pub fn record_treatment_notes(
        &mut self,
        treatment_id: &str,
        notes: &str,
    ) -> MmsResult<Treatment> {
        let treatment = self.registry.treatment_mut(treatment_id)?;
        treatment.notes = notes.to_string();
        let treatment = treatment.clone();
        self.persist(&[Collection::Treatments])?;

        tracing::info!(treatment_id, "treatment notes recorded");
        Ok(treatment)
    }

    /// Raises a bill for the treatment at its type's current price and moves the treatment
    /// to `BillGenerated`. Bills and treatments are written in one commit.
    ///
    /// # Errors
    ///
    /// [`MmsError::NotFound`] if the treatment or its treatment type no longer exists.
    pub fn generate_bill(&mut self, treatment_id: &str) -> MmsResult<Bill> {
        let treatment = self.registry.treatment(treatment_id)?;
        let price = self
            .registry
            .treatment_type(&treatment.treatment_type_id)?
            .price;
        let patient_id = treatment.patient_id.clone();

        let bill = Bill::new(
            self.next_id(BILL_ID_PREFIX),
            patient_id,
            treatment_id,
            price,
            models::now(),
        );
        self.registry.insert_bill(bill.clone());
        self.registry.treatment_mut(treatment_id)?.status = TreatmentStatus::BillGenerated;
        self.persist(&[Collection::Treatments, Collection::Bills])?;

        tracing::info!(
            bill_id = %bill.bill_id,
            treatment_id,
            total_amount = bill.total_amount,
            "bill generated"
        );
        Ok(bill)
    }

    /// Settles a bill, stamping the payment time, and moves its treatment to `Paid`. Bills
    /// and treatments are written in one commit.
    ///
    /// Paying a bill again re-stamps `paid_date` and forces the treatment back to `Paid`.
    ///
    /// # Errors
    ///
    /// [`MmsError::NotFound`] for an unknown bill, or a bill whose treatment is missing.
    pub fn record_payment(&mut self, bill_id: &str) -> MmsResult<Bill> {
        let bill = self.registry.bill(bill_id)?;
        if bill.is_paid {
            tracing::warn!(bill_id, "bill already paid, re-stamping payment");
        }
        let treatment_id = bill.treatment_id.clone();
        self.registry.treatment(&treatment_id)?;

        let bill = self.registry.bill_mut(bill_id)?;
        bill.mark_paid(models::now());
        let bill = bill.clone();
        self.registry.treatment_mut(&treatment_id)?.status = TreatmentStatus::Paid;
        self.persist(&[Collection::Treatments, Collection::Bills])?;

        tracing::info!(bill_id, treatment_id = %treatment_id, "payment recorded");
        Ok(bill)
    }

    /// # Errors
    ///
    /// [`MmsError::InvalidInput`] for an empty name or a price that is not a positive,
    /// finite number.
    pub fn add_treatment_type(&mut self, name: &str, price: f64) -> MmsResult<TreatmentType> {
        let name = NonEmptyText::new(name)?;
        let treatment_type =
            TreatmentType::new(self.next_id(TREATMENT_TYPE_ID_PREFIX), name, price)?;
        self.registry.insert_treatment_type(treatment_type.clone());
        self.persist(&[Collection::TreatmentTypes])?;

        tracing::info!(treatment_type_id = %treatment_type.id, price, "treatment type added");
        Ok(treatment_type)
    }

    /// Removes a treatment type. Treatments and bills that refer to it are kept.
    pub fn remove_treatment_type(&mut self, treatment_type_id: &str) -> MmsResult<TreatmentType> {
        let removed = self.registry.remove_treatment_type(treatment_type_id)?;
        self.persist(&[Collection::TreatmentTypes])?;

        tracing::info!(treatment_type_id, "treatment type removed");
        Ok(removed)
    }

    /// Finds the account whose email and password both match exactly, searching admins,
    /// then clinicians, then patients.
    ///
    /// # Errors
    ///
    /// [`MmsError::NotFound`] with [`EntityKind::User`] when nothing matches.
    pub fn authenticate(&self, email: &str, password: &str) -> MmsResult<User> {
        match self.registry.find_by_credentials(email.trim(), password) {
            Some(user) => {
                tracing::info!(user_id = %user.account().id, role = %user.role(), "login");
                Ok(user)
            }
            None => {
                tracing::debug!(email, "login rejected");
                Err(MmsError::not_found(EntityKind::User, email.trim()))
            }
        }
    }
}
