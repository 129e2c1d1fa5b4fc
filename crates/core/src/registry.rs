//! In-memory working set of every entity collection.
//!
//! The registry is the single source of truth during a run. It is loaded once from the
//! [`StorageAdapter`], read freely through shared references, and mutated only by the
//! [`LifecycleEngine`](crate::LifecycleEngine), which persists the affected collections after
//! each change.

use crate::models::{
    Account, Admin, Bill, Clinician, EntityKind, Notification, Patient, Treatment,
    TreatmentType, User,
};
use crate::storage::{Collection, FlatRecord, StagedCollection, StorageAdapter};
use crate::{MmsError, MmsResult};
use mms_types::{EmailAddress, NonEmptyText};
use std::collections::BTreeMap;

/// Entities keyed by identifier, one map per collection.
#[derive(Clone, Debug, Default)]
pub struct EntityRegistry {
    patients: BTreeMap<String, Patient>,
    clinicians: BTreeMap<String, Clinician>,
    admins: BTreeMap<String, Admin>,
    treatments: BTreeMap<String, Treatment>,
    treatment_types: BTreeMap<String, TreatmentType>,
    bills: BTreeMap<String, Bill>,
    notifications: BTreeMap<String, Notification>,
}

trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Patient {
    fn key(&self) -> &str {
        self.id()
    }
}

impl Keyed for Clinician {
    fn key(&self) -> &str {
        self.id()
    }
}

impl Keyed for Admin {
    fn key(&self) -> &str {
        self.id()
    }
}

impl Keyed for Treatment {
    fn key(&self) -> &str {
        &self.treatment_id
    }
}

impl Keyed for TreatmentType {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Bill {
    fn key(&self) -> &str {
        &self.bill_id
    }
}

impl Keyed for Notification {
    fn key(&self) -> &str {
        &self.notification_id
    }
}

/// Loads `T`'s collection into a map. A repeated id keeps the first record.
fn load_map<T: FlatRecord + Keyed>(storage: &StorageAdapter) -> MmsResult<BTreeMap<String, T>> {
    let mut map = BTreeMap::new();
    for record in storage.load::<T>()? {
        let key = record.key().to_string();
        if map.contains_key(&key) {
            tracing::warn!(
                file = T::COLLECTION.filename(),
                id = %key,
                "duplicate id in storage, keeping the first record"
            );
            continue;
        }
        map.insert(key, record);
    }
    Ok(map)
}

fn lookup<'a, T>(map: &'a BTreeMap<String, T>, kind: EntityKind, id: &str) -> MmsResult<&'a T> {
    map.get(id).ok_or_else(|| MmsError::not_found(kind, id))
}

fn lookup_mut<'a, T>(
    map: &'a mut BTreeMap<String, T>,
    kind: EntityKind,
    id: &str,
) -> MmsResult<&'a mut T> {
    map.get_mut(id).ok_or_else(|| MmsError::not_found(kind, id))
}

impl EntityRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads all seven collections from `storage`.
    ///
    /// When `seed_on_empty` is set and there are no patients or no admins after loading, the
    /// baseline records are added and every collection is written back.
    ///
    /// # Errors
    ///
    /// Returns any storage error from loading or from persisting the seeded collections.
    pub fn load(storage: &StorageAdapter, seed_on_empty: bool) -> MmsResult<Self> {
        let mut registry = Self {
            patients: load_map(storage)?,
            clinicians: load_map(storage)?,
            admins: load_map(storage)?,
            treatments: load_map(storage)?,
            treatment_types: load_map(storage)?,
            bills: load_map(storage)?,
            notifications: load_map(storage)?,
        };

        if seed_on_empty && (registry.patients.is_empty() || registry.admins.is_empty()) {
            let added = registry.seed_baseline()?;
            storage.commit(registry.stage_all())?;
            tracing::info!(added, "seeded baseline records");
        }

        tracing::info!(
            patients = registry.patients.len(),
            clinicians = registry.clinicians.len(),
            admins = registry.admins.len(),
            treatments = registry.treatments.len(),
            treatment_types = registry.treatment_types.len(),
            bills = registry.bills.len(),
            notifications = registry.notifications.len(),
            "registry loaded"
        );
        Ok(registry)
    }

    /// Adds the first-run admin, clinician, patient and treatment types, skipping any whose
    /// id or email is already present. Returns how many records were added.
    pub(crate) fn seed_baseline(&mut self) -> MmsResult<usize> {
        let mut added = 0;

        let admin = Admin {
            account: seed_account("ADM001", "Dr. Admin", "555-0001", "admin@mms.com", "admin123")?,
            department: "Management".into(),
        };
        if self.can_seed_user(&admin.account) {
            self.insert_admin(admin);
            added += 1;
        }

        let clinician = Clinician {
            account: seed_account("CLI001", "Dr. Smith", "555-0010", "smith@mms.com", "clinic123")?,
            specialization: "Cardiology".into(),
            max_patients: 10,
        };
        if self.can_seed_user(&clinician.account) {
            self.insert_clinician(clinician);
            added += 1;
        }

        let patient = Patient::new(seed_account(
            "PAT001",
            "John Doe",
            "555-0100",
            "john@email.com",
            "john123",
        )?);
        if self.can_seed_user(&patient.account) {
            self.insert_patient(patient);
            added += 1;
        }

        for (id, name, price) in [
            ("TRT001", "Consultation", 100.0),
            ("TRT002", "Surgery", 5000.0),
            ("TRT003", "Therapy", 200.0),
        ] {
            if !self.treatment_types.contains_key(id) {
                let treatment_type = TreatmentType::new(id, NonEmptyText::new(name)?, price)?;
                self.insert_treatment_type(treatment_type);
                added += 1;
            }
        }

        Ok(added)
    }

    fn can_seed_user(&self, account: &Account) -> bool {
        !self.user_id_in_use(&account.id) && !self.email_in_use(account.email.as_str())
    }

    fn user_id_in_use(&self, id: &str) -> bool {
        self.patients.contains_key(id)
            || self.clinicians.contains_key(id)
            || self.admins.contains_key(id)
    }

    pub fn patient(&self, id: &str) -> MmsResult<&Patient> {
        lookup(&self.patients, EntityKind::Patient, id)
    }

    pub fn clinician(&self, id: &str) -> MmsResult<&Clinician> {
        lookup(&self.clinicians, EntityKind::Clinician, id)
    }

    pub fn admin(&self, id: &str) -> MmsResult<&Admin> {
        lookup(&self.admins, EntityKind::Admin, id)
    }

    pub fn treatment(&self, id: &str) -> MmsResult<&Treatment> {
        lookup(&self.treatments, EntityKind::Treatment, id)
    }

    pub fn treatment_type(&self, id: &str) -> MmsResult<&TreatmentType> {
        lookup(&self.treatment_types, EntityKind::TreatmentType, id)
    }

    pub fn bill(&self, id: &str) -> MmsResult<&Bill> {
        lookup(&self.bills, EntityKind::Bill, id)
    }

    pub fn notification(&self, id: &str) -> MmsResult<&Notification> {
        lookup(&self.notifications, EntityKind::Notification, id)
    }

    // Snapshot listings, ordered by id.

    pub fn patients(&self) -> Vec<Patient> {
        self.patients.values().cloned().collect()
    }

    pub fn clinicians(&self) -> Vec<Clinician> {
        self.clinicians.values().cloned().collect()
    }

    pub fn admins(&self) -> Vec<Admin> {
        self.admins.values().cloned().collect()
    }

    pub fn treatments(&self) -> Vec<Treatment> {
        self.treatments.values().cloned().collect()
    }

    pub fn treatment_types(&self) -> Vec<TreatmentType> {
        self.treatment_types.values().cloned().collect()
    }

    pub fn bills(&self) -> Vec<Bill> {
        self.bills.values().cloned().collect()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.values().cloned().collect()
    }

    pub fn patient_treatments(&self, patient_id: &str) -> Vec<Treatment> {
        self.treatments
            .values()
            .filter(|t| t.patient_id == patient_id)
            .cloned()
            .collect()
    }

    /// Treatments currently assigned to `clinician_id`.
    pub fn clinician_treatments(&self, clinician_id: &str) -> Vec<Treatment> {
        self.treatments
            .values()
            .filter(|t| t.clinician_id.as_deref() == Some(clinician_id))
            .cloned()
            .collect()
    }

    pub fn patient_bills(&self, patient_id: &str) -> Vec<Bill> {
        self.bills
            .values()
            .filter(|b| b.patient_id == patient_id)
            .cloned()
            .collect()
    }

    pub fn patient_notifications(&self, patient_id: &str) -> Vec<Notification> {
        self.notifications
            .values()
            .filter(|n| n.patient_id == patient_id)
            .cloned()
            .collect()
    }

    /// True if any admin, clinician or patient already uses `email`, ignoring case.
    pub fn email_in_use(&self, email: &str) -> bool {
        self.find_user_by_email(email).is_some()
    }

    /// Looks up an account of any kind by email, ignoring case. Admins are searched first,
    /// then clinicians, then patients.
    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        self.find_user(|account| account.email.matches(email))
    }

    /// The first account, in admin, clinician, patient order, whose stored email and
    /// password both equal the given values exactly.
    pub(crate) fn find_by_credentials(&self, email: &str, password: &str) -> Option<User> {
        self.find_user(|account| {
            account.email.as_str() == email && account.password_matches(password)
        })
    }

    fn find_user(&self, predicate: impl Fn(&Account) -> bool) -> Option<User> {
        if let Some(admin) = self.admins.values().find(|a| predicate(&a.account)) {
            return Some(User::Admin(admin.clone()));
        }
        if let Some(clinician) = self.clinicians.values().find(|c| predicate(&c.account)) {
            return Some(User::Clinician(clinician.clone()));
        }
        self.patients
            .values()
            .find(|p| predicate(&p.account))
            .map(|p| User::Patient(p.clone()))
    }

    pub(crate) fn insert_patient(&mut self, patient: Patient) {
        self.patients.insert(patient.id().to_string(), patient);
    }

    pub(crate) fn insert_clinician(&mut self, clinician: Clinician) {
        self.clinicians.insert(clinician.id().to_string(), clinician);
    }

    pub(crate) fn insert_admin(&mut self, admin: Admin) {
        self.admins.insert(admin.id().to_string(), admin);
    }

    pub(crate) fn insert_treatment(&mut self, treatment: Treatment) {
        self.treatments
            .insert(treatment.treatment_id.clone(), treatment);
    }

    pub(crate) fn insert_treatment_type(&mut self, treatment_type: TreatmentType) {
        self.treatment_types
            .insert(treatment_type.id.clone(), treatment_type);
    }

    pub(crate) fn insert_bill(&mut self, bill: Bill) {
        self.bills.insert(bill.bill_id.clone(), bill);
    }

    pub(crate) fn insert_notification(&mut self, notification: Notification) {
        self.notifications
            .insert(notification.notification_id.clone(), notification);
    }

    pub(crate) fn patient_mut(&mut self, id: &str) -> MmsResult<&mut Patient> {
        lookup_mut(&mut self.patients, EntityKind::Patient, id)
    }

    pub(crate) fn treatment_mut(&mut self, id: &str) -> MmsResult<&mut Treatment> {
        lookup_mut(&mut self.treatments, EntityKind::Treatment, id)
    }

    pub(crate) fn bill_mut(&mut self, id: &str) -> MmsResult<&mut Bill> {
        lookup_mut(&mut self.bills, EntityKind::Bill, id)
    }

    pub(crate) fn remove_treatment_type(&mut self, id: &str) -> MmsResult<TreatmentType> {
        self.treatment_types
            .remove(id)
            .ok_or_else(|| MmsError::not_found(EntityKind::TreatmentType, id))
    }

    /// Encodes the current contents of `collection` for a commit.
    pub fn stage(&self, collection: Collection) -> StagedCollection {
        match collection {
            Collection::Patients => StagedCollection::from_records(self.patients.values()),
            Collection::Clinicians => StagedCollection::from_records(self.clinicians.values()),
            Collection::Admins => StagedCollection::from_records(self.admins.values()),
            Collection::Treatments => StagedCollection::from_records(self.treatments.values()),
            Collection::TreatmentTypes => {
                StagedCollection::from_records(self.treatment_types.values())
            }
            Collection::Bills => StagedCollection::from_records(self.bills.values()),
            Collection::Notifications => {
                StagedCollection::from_records(self.notifications.values())
            }
        }
    }

    pub fn stage_all(&self) -> Vec<StagedCollection> {
        Collection::ALL.into_iter().map(|c| self.stage(c)).collect()
    }
}

fn seed_account(
    id: &str,
    name: &str,
    phone: &str,
    email: &str,
    password: &str,
) -> MmsResult<Account> {
    Ok(Account::new(
        id,
        NonEmptyText::new(name)?,
        phone,
        EmailAddress::parse(email)?,
        password,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::models::{Role, TreatmentStatus};
    use chrono::NaiveDate;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn storage(temp_dir: &TempDir) -> StorageAdapter {
        let cfg = CoreConfig::new(temp_dir.path().to_path_buf()).unwrap();
        StorageAdapter::open(Arc::new(cfg)).unwrap()
    }

    fn created() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn first_load_seeds_and_persists_baseline() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = storage(&temp_dir);

        let registry = EntityRegistry::load(&store, true).unwrap();

        assert_eq!(registry.admin("ADM001").unwrap().department, "Management");
        assert_eq!(registry.clinician("CLI001").unwrap().max_patients, 10);
        assert!(!registry.patient("PAT001").unwrap().registered);
        assert_eq!(registry.treatment_type("TRT002").unwrap().price, 5000.0);
        assert_eq!(registry.treatment_types().len(), 3);

        for collection in Collection::ALL {
            assert!(
                store.config().collection_path(collection).exists(),
                "{collection} should be written"
            );
        }

        let reloaded = EntityRegistry::load(&store, true).unwrap();
        assert_eq!(reloaded.patients(), registry.patients());
        assert_eq!(reloaded.treatment_types(), registry.treatment_types());
    }

    #[test]
    fn seeding_can_be_disabled() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = CoreConfig::new(temp_dir.path().to_path_buf())
            .unwrap()
            .without_seed_data();
        let seed = cfg.seed_on_empty();
        let storage = StorageAdapter::open(Arc::new(cfg)).unwrap();
        let registry = EntityRegistry::load(&storage, seed).unwrap();

        assert!(registry.patients().is_empty());
        assert!(registry.treatment_types().is_empty());
    }

    #[test]
    fn seeding_skips_existing_ids_and_emails() {
        let mut registry = EntityRegistry::new();
        registry.insert_treatment_type(
            TreatmentType::new("TRT001", NonEmptyText::new("Custom").unwrap(), 75.0).unwrap(),
        );
        registry.insert_patient(Patient::new(Account::new(
            "PAT-other",
            NonEmptyText::new("Someone").unwrap(),
            "",
            EmailAddress::parse("ADMIN@mms.com").unwrap(),
            "pw",
        )));

        let added = registry.seed_baseline().unwrap();

        assert_eq!(added, 4);
        assert!(registry.admin("ADM001").is_err());
        assert_eq!(registry.treatment_type("TRT001").unwrap().price, 75.0);
        assert_eq!(registry.treatment_types().len(), 3);
    }

    #[test]
    fn lookups_name_kind_and_id() {
        let registry = EntityRegistry::new();
        let err = registry.bill("BILL-missing").unwrap_err();
        match err {
            MmsError::NotFound { kind, id } => {
                assert_eq!(kind, EntityKind::Bill);
                assert_eq!(id, "BILL-missing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn snapshots_are_detached_copies() {
        let mut registry = EntityRegistry::new();
        registry.seed_baseline().unwrap();

        let mut snapshot = registry.patients();
        snapshot[0].flagged = true;
        assert!(!registry.patient("PAT001").unwrap().flagged);
    }

    #[test]
    fn per_patient_and_per_clinician_queries() {
        let mut registry = EntityRegistry::new();
        let mut assigned = Treatment::new("TRE1", "PAT1", "TRT001", created());
        assigned.clinician_id = Some("CLI001".into());
        registry.insert_treatment(assigned);
        registry.insert_treatment(Treatment::new("TRE2", "PAT1", "TRT001", created()));
        registry.insert_treatment(Treatment::new("TRE3", "PAT2", "TRT001", created()));
        registry.insert_bill(Bill::new("BILL1", "PAT2", "TRE3", 100.0, created()));

        assert_eq!(registry.patient_treatments("PAT1").len(), 2);
        assert_eq!(registry.clinician_treatments("CLI001").len(), 1);
        assert_eq!(
            registry.clinician_treatments("CLI001")[0].status,
            TreatmentStatus::New
        );
        assert!(registry.patient_bills("PAT1").is_empty());
        assert_eq!(registry.patient_bills("PAT2")[0].bill_id, "BILL1");
    }

    #[test]
    fn email_lookup_ignores_case_and_prefers_admins() {
        let mut registry = EntityRegistry::new();
        registry.seed_baseline().unwrap();

        assert!(registry.email_in_use("Smith@MMS.com"));
        assert!(!registry.email_in_use("nobody@mms.com"));
        assert_eq!(
            registry.find_user_by_email("admin@mms.com").map(|u| u.role()),
            Some(Role::Admin)
        );
    }

    #[test]
    fn credentials_must_match_exactly() {
        let mut registry = EntityRegistry::new();
        registry.seed_baseline().unwrap();

        let user = registry
            .find_by_credentials("john@email.com", "john123")
            .expect("seeded patient should authenticate");
        assert_eq!(user.account().id, "PAT001");
        assert!(registry.find_by_credentials("john@email.com", "JOHN123").is_none());
    }

    #[test]
    fn duplicate_ids_on_disk_keep_first() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = storage(&temp_dir);
        fs::write(
            store.config().collection_path(Collection::TreatmentTypes),
            "id,name,price\nTRT9,First,10\nTRT9,Second,20\n",
        )
        .unwrap();

        let registry = EntityRegistry::load(&store, false).unwrap();
        assert_eq!(registry.treatment_type("TRT9").unwrap().name.as_str(), "First");
    }

    #[test]
    fn remove_treatment_type_reports_missing() {
        let mut registry = EntityRegistry::new();
        registry.seed_baseline().unwrap();

        assert!(matches!(
            registry.remove_treatment_type("TRT999"),
            Err(MmsError::NotFound { .. })
        ));
        assert_eq!(registry.treatment_types().len(), 3);
        assert_eq!(registry.remove_treatment_type("TRT003").unwrap().price, 200.0);
        assert_eq!(registry.treatment_types().len(), 2);
    }
}
