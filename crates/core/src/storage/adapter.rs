//! Reading and writing collection files.
//!
//! Writes go through a staged commit: every collection in the commit is first written to a
//! sibling staging file, then each staging file is renamed over its target. If a rename
//! fails, the targets already replaced are put back to their previous contents so a
//! multi-collection commit (a bill together with its treatment, say) lands on disk entirely
//! or not at all.

use super::codec::{decode_line, encode_line};
use super::{Collection, FlatRecord};
use crate::config::CoreConfig;
use crate::constants::STAGING_SUFFIX;
use crate::{MmsError, MmsResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(test)]
use std::collections::{HashMap, HashSet};
#[cfg(test)]
use std::sync::{LazyLock, Mutex};

/// The full encoded contents of one collection file, ready to commit.
#[derive(Clone, Debug, PartialEq)]
pub struct StagedCollection {
    collection: Collection,
    contents: String,
}

impl StagedCollection {
    /// Encodes `records` beneath the header line for `T`.
    pub fn from_records<'a, T, I>(records: I) -> Self
    where
        T: FlatRecord + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut contents = encode_line(T::FIELDS);
        contents.push('\n');
        for record in records {
            contents.push_str(&encode_line(record.to_fields().as_slice()));
            contents.push('\n');
        }

        Self {
            collection: T::COLLECTION,
            contents,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }
}

/// File-backed store for the registry's collections.
#[derive(Clone, Debug)]
pub struct StorageAdapter {
    cfg: Arc<CoreConfig>,
}

impl StorageAdapter {
    /// Opens the store, creating the storage directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`MmsError::StorageDirCreation`] if the directory cannot be created.
    pub fn open(cfg: Arc<CoreConfig>) -> MmsResult<Self> {
        let dir = cfg.storage_dir();
        fs::create_dir_all(dir).map_err(|source| MmsError::StorageDirCreation {
            path: dir.to_path_buf(),
            source,
        })?;
        tracing::debug!(storage_dir = %dir.display(), "storage opened");

        Ok(Self { cfg })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Loads every record of `T`'s collection, in file order.
    ///
    /// A missing file is an empty collection. The first line is the header and is skipped,
    /// as are blank lines. Fields beyond those `T` knows about are ignored.
    ///
    /// # Errors
    ///
    /// - [`MmsError::FileRead`] if the file exists but cannot be read.
    /// - [`MmsError::MalformedRecord`] naming the file and 1-based line of the first record
    ///   that cannot be decoded, has too few fields, or holds an unparseable value.
    pub fn load<T: FlatRecord>(&self) -> MmsResult<Vec<T>> {
        let path = self.cfg.collection_path(T::COLLECTION);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(file = T::COLLECTION.filename(), "no file yet, empty collection");
                return Ok(Vec::new());
            }
            Err(source) => return Err(MmsError::FileRead { path, source }),
        };

        let file = T::COLLECTION.filename();
        let mut records = Vec::new();
        for (index, line) in contents.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }

            let line_number = index + 1;
            let malformed = |reason: String| MmsError::MalformedRecord {
                file,
                line: line_number,
                reason,
            };

            let fields = decode_line(line).map_err(malformed)?;
            if fields.len() < T::FIELDS.len() {
                return Err(malformed(format!(
                    "expected {} fields, found {}",
                    T::FIELDS.len(),
                    fields.len()
                )));
            }
            records.push(T::from_fields(&fields).map_err(malformed)?);
        }

        tracing::debug!(file, count = records.len(), "collection loaded");
        Ok(records)
    }

    /// Rewrites one collection from `records`.
    pub fn save<'a, T, I>(&self, records: I) -> MmsResult<()>
    where
        T: FlatRecord + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        self.commit(vec![StagedCollection::from_records(records)])
    }

    /// Writes all `staged` collections so that either every file is replaced or none is.
    ///
    /// # Errors
    ///
    /// - [`MmsError::FileWrite`] / [`MmsError::FileRead`] if staging fails; no target has
    ///   been touched.
    /// - [`MmsError::FileRename`] if a staging file cannot be moved into place; targets
    ///   already replaced have been restored.
    /// - [`MmsError::RollbackFailed`] if that restore also fails.
    pub fn commit(&self, staged: Vec<StagedCollection>) -> MmsResult<()> {
        if staged.is_empty() {
            return Ok(());
        }

        let mut pending: Vec<PendingFile> = Vec::with_capacity(staged.len());
        for item in &staged {
            let target = self.cfg.collection_path(item.collection);
            let staging = staging_path(&target);

            if let Err(source) = fs::write(&staging, &item.contents) {
                remove_staging_files(&pending);
                return Err(MmsError::FileWrite {
                    path: staging,
                    source,
                });
            }

            let previous = match fs::read_to_string(&target) {
                Ok(contents) => Some(contents),
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(source) => {
                    let _ = fs::remove_file(&staging);
                    remove_staging_files(&pending);
                    return Err(MmsError::FileRead {
                        path: target,
                        source,
                    });
                }
            };

            pending.push(PendingFile {
                collection: item.collection,
                target,
                staging,
                previous,
            });
        }

        for (i, file) in pending.iter().enumerate() {
            if let Err(source) = rename_into_place(file) {
                remove_staging_files(&pending[i..]);
                let commit_error = MmsError::FileRename {
                    path: file.target.clone(),
                    source,
                };
                tracing::warn!(error = %commit_error, "commit failed, restoring replaced files");

                return match restore(&pending[..i]) {
                    Ok(()) => Err(commit_error),
                    Err((path, rollback_error)) => Err(MmsError::RollbackFailed {
                        path,
                        commit_error: Box::new(commit_error),
                        rollback_error,
                    }),
                };
            }
        }

        tracing::debug!(
            files = ?pending.iter().map(|f| f.collection.filename()).collect::<Vec<_>>(),
            "commit complete"
        );
        Ok(())
    }
}

struct PendingFile {
    collection: Collection,
    target: PathBuf,
    staging: PathBuf,
    previous: Option<String>,
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

fn remove_staging_files(files: &[PendingFile]) {
    for file in files {
        let _ = fs::remove_file(&file.staging);
    }
}

/// Puts replaced targets back, newest first. Every file is attempted; the first failure is
/// reported.
fn restore(replaced: &[PendingFile]) -> Result<(), (PathBuf, io::Error)> {
    let mut first_error = None;
    for file in replaced.iter().rev() {
        if let Err(e) = restore_previous(file) {
            tracing::error!(path = %file.target.display(), error = %e, "restore failed");
            first_error.get_or_insert((file.target.clone(), e));
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn restore_previous(file: &PendingFile) -> io::Result<()> {
    #[cfg(test)]
    {
        let current_id = std::thread::current().id();
        let mut guard = FORCE_RESTORE_ERROR_FOR_THREADS
            .lock()
            .expect("FORCE_RESTORE_ERROR_FOR_THREADS mutex poisoned");

        if guard.remove(&current_id) {
            return Err(io::Error::other("forced restore failure (test hook)"));
        }
    }

    match &file.previous {
        Some(contents) => fs::write(&file.target, contents),
        None => fs::remove_file(&file.target),
    }
}

#[cfg(test)]
static FORCE_RENAME_ERROR_FOR_THREADS: LazyLock<
    Mutex<HashMap<std::thread::ThreadId, Collection>>,
> = LazyLock::new(|| Mutex::new(HashMap::new()));

#[cfg(test)]
static FORCE_RESTORE_ERROR_FOR_THREADS: LazyLock<Mutex<HashSet<std::thread::ThreadId>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Makes the next rename of `collection` on the calling thread fail.
#[cfg(test)]
pub(crate) fn force_rename_failure(collection: Collection) {
    FORCE_RENAME_ERROR_FOR_THREADS
        .lock()
        .expect("FORCE_RENAME_ERROR_FOR_THREADS mutex poisoned")
        .insert(std::thread::current().id(), collection);
}

#[cfg(test)]
pub(crate) fn force_restore_failure() {
    FORCE_RESTORE_ERROR_FOR_THREADS
        .lock()
        .expect("FORCE_RESTORE_ERROR_FOR_THREADS mutex poisoned")
        .insert(std::thread::current().id());
}

fn rename_into_place(file: &PendingFile) -> io::Result<()> {
    #[cfg(test)]
    {
        let current_id = std::thread::current().id();
        let mut guard = FORCE_RENAME_ERROR_FOR_THREADS
            .lock()
            .expect("FORCE_RENAME_ERROR_FOR_THREADS mutex poisoned");

        if guard.get(&current_id) == Some(&file.collection) {
            guard.remove(&current_id);
            return Err(io::Error::other("forced rename failure (test hook)"));
        }
    }

    fs::rename(&file.staging, &file.target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Admin, Bill, Clinician, Notification, Patient, Treatment};
    use chrono::NaiveDate;
    use mms_types::{EmailAddress, NonEmptyText};
    use tempfile::TempDir;

    fn adapter(temp_dir: &TempDir) -> StorageAdapter {
        let cfg = CoreConfig::new(temp_dir.path().join("store")).unwrap();
        StorageAdapter::open(Arc::new(cfg)).unwrap()
    }

    fn patient(id: &str, name: &str) -> Patient {
        Patient::new(Account::new(
            id,
            NonEmptyText::new(name).unwrap(),
            "555-0100",
            EmailAddress::parse(&format!("{}@example.com", id.to_lowercase())).unwrap(),
            "secret,with\\odd chars",
        ))
    }

    fn created() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap()
    }

    fn read(adapter: &StorageAdapter, collection: Collection) -> String {
        fs::read_to_string(adapter.config().collection_path(collection)).unwrap()
    }

    fn no_staging_files_left(adapter: &StorageAdapter) -> bool {
        fs::read_dir(adapter.config().storage_dir())
            .unwrap()
            .all(|entry| {
                !entry
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(STAGING_SUFFIX)
            })
    }

    #[test]
    fn open_creates_storage_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = adapter(&temp_dir);
        assert!(store.config().storage_dir().is_dir());
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = adapter(&temp_dir);
        assert!(store.load::<Patient>().unwrap().is_empty());
    }

    #[test]
    fn saved_records_load_back_in_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = adapter(&temp_dir);

        let mut second = patient("PAT2", "O'Brien, Mary");
        second.registered = true;
        second.opted_in_for_promotions = false;
        let patients = vec![patient("PAT1", "John Doe"), second];

        store.save(&patients).unwrap();

        let contents = read(&store, Collection::Patients);
        assert!(contents.starts_with(
            "id,name,phone,email,password,isRegistered,isFlagged,optedInForPromotions\n"
        ));
        assert_eq!(store.load::<Patient>().unwrap(), patients);
    }

    #[test]
    fn every_record_kind_loads_back_whole() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = adapter(&temp_dir);

        let clinicians = vec![Clinician {
            account: patient("CLI1", "Dr. Who, PhD").account,
            specialization: "Cardiology\\Vascular, adult".into(),
            max_patients: 7,
        }];
        let admins = vec![Admin {
            account: patient("ADM1", "Ops").account,
            department: String::new(),
        }];
        let mut paid = Bill::new("BILL1", "PAT1", "TRE1", 149.99, created());
        paid.mark_paid(created() + chrono::Duration::hours(2));
        let bills = vec![paid, Bill::new("BILL2", "PAT1", "TRE2", 80.0, created())];
        let notifications = vec![Notification {
            notification_id: "NOT1".into(),
            patient_id: "PAT1".into(),
            message: " Bring ID, and C:\\forms\nplease ".into(),
            timestamp: created(),
            is_promotional: true,
        }];

        store.save(&clinicians).unwrap();
        store.save(&admins).unwrap();
        store.save(&bills).unwrap();
        store.save(&notifications).unwrap();

        assert_eq!(store.load::<Clinician>().unwrap(), clinicians);
        assert_eq!(store.load::<Admin>().unwrap(), admins);
        assert_eq!(store.load::<Bill>().unwrap(), bills);
        assert_eq!(store.load::<Notification>().unwrap(), notifications);
    }

    #[test]
    fn saving_unchanged_records_is_byte_identical() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = adapter(&temp_dir);
        let mut treatment = Treatment::new("TRE1", "PAT1", "TRT1", created());
        treatment.notes = "multi\nline, notes".into();

        store.save(&[treatment]).unwrap();
        let first = read(&store, Collection::Treatments);

        let loaded = store.load::<Treatment>().unwrap();
        store.save(&loaded).unwrap();
        assert_eq!(read(&store, Collection::Treatments), first);
    }

    #[test]
    fn blank_lines_and_extra_fields_are_tolerated() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = adapter(&temp_dir);
        fs::write(
            store.config().collection_path(Collection::TreatmentTypes),
            "id,name,price\n\nTRT1,Consultation,100,legacy\n\n",
        )
        .unwrap();

        let types = store.load::<crate::models::TreatmentType>().unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].price, 100.0);
    }

    #[test]
    fn malformed_record_reports_file_and_line() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = adapter(&temp_dir);
        fs::write(
            store.config().collection_path(Collection::TreatmentTypes),
            "id,name,price\nTRT1,Consultation,100\nTRT2,Surgery\n",
        )
        .unwrap();

        let err = store
            .load::<crate::models::TreatmentType>()
            .expect_err("short record should fail");
        match err {
            MmsError::MalformedRecord { file, line, .. } => {
                assert_eq!(file, "treatment_types.csv");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unparseable_value_is_malformed() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = adapter(&temp_dir);
        fs::write(
            store.config().collection_path(Collection::TreatmentTypes),
            "id,name,price\nTRT1,Consultation,lots\n",
        )
        .unwrap();

        let err = store.load::<crate::models::TreatmentType>().unwrap_err();
        assert!(matches!(err, MmsError::MalformedRecord { line: 2, .. }));
        assert!(err.is_storage());
    }

    #[test]
    fn non_positive_bill_total_is_malformed() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = adapter(&temp_dir);
        fs::write(
            store.config().collection_path(Collection::Bills),
            "billId,patientId,treatmentId,totalAmount,isPaid,createdDate,paidDate\n\
             BILL1,PAT1,TRE1,NaN,false,2026-10-16 10:15:00,\n",
        )
        .unwrap();

        match store.load::<Bill>().unwrap_err() {
            MmsError::MalformedRecord { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("totalAmount"));
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn failed_rename_restores_earlier_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = adapter(&temp_dir);

        let treatment = Treatment::new("TRE1", "PAT1", "TRT1", created());
        store.save(&[treatment.clone()]).unwrap();
        let treatments_before = read(&store, Collection::Treatments);

        let mut billed = treatment.clone();
        billed.status = crate::models::TreatmentStatus::BillGenerated;
        let bill = Bill::new("BILL1", "PAT1", "TRE1", 100.0, created());

        force_rename_failure(Collection::Bills);
        let err = store
            .commit(vec![
                StagedCollection::from_records(&[billed]),
                StagedCollection::from_records(&[bill]),
            ])
            .expect_err("forced rename should fail the commit");

        assert!(matches!(err, MmsError::FileRename { .. }));
        assert_eq!(read(&store, Collection::Treatments), treatments_before);
        assert!(!store.config().collection_path(Collection::Bills).exists());
        assert!(no_staging_files_left(&store));
    }

    #[test]
    fn failed_restore_is_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = adapter(&temp_dir);

        force_rename_failure(Collection::Bills);
        force_restore_failure();
        let err = store
            .commit(vec![
                StagedCollection::from_records(&[patient("PAT1", "John Doe")]),
                StagedCollection::from_records(&[Bill::new(
                    "BILL1",
                    "PAT1",
                    "TRE1",
                    100.0,
                    created(),
                )]),
            ])
            .unwrap_err();

        match err {
            MmsError::RollbackFailed {
                path, commit_error, ..
            } => {
                assert_eq!(path, store.config().collection_path(Collection::Patients));
                assert!(matches!(*commit_error, MmsError::FileRename { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
