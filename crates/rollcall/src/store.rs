//! The attendance store.
//!
//! [`AttendanceStore`] owns two collections, registered users and attendance
//! records, each persisted as a single JSON array in a [`KeyValueStore`].
//! Every mutation reads the whole collection, changes it, and writes the whole
//! collection back. Records are kept newest first and capped at
//! `max_records`; inserting past the cap drops the oldest.
//!
//! Records reference users by `name` only. Deleting a user removes every
//! record carrying the same name, including records of other users who
//! happen to share it.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{AttendanceRecord, AttendanceStatus, FaceSnapshot, RegisteredUser, UserProfile};
use crate::recognition::{RandomRecognizer, Recognizer, RequestToken, RequestTracker};
use crate::storage::KeyValueStore;

/// Key holding the registered users array.
pub const USERS_KEY: &str = "face_recognition_users";

/// Key holding the attendance records array.
pub const RECORDS_KEY: &str = "face_recognition_attendance";

/// Default number of attendance records kept.
pub const DEFAULT_MAX_RECORDS: usize = 50;

/// Outcome of a tracked recognition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recognition {
    /// Token of the request that produced this outcome.
    pub token: RequestToken,
    /// The matched user, if any.
    pub user: Option<RegisteredUser>,
}

/// Full dump of both collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Export {
    /// All registered users.
    pub users: Vec<RegisteredUser>,
    /// All retained attendance records, newest first.
    pub records: Vec<AttendanceRecord>,
    /// When the dump was taken.
    pub exported_at: DateTime<Utc>,
}

/// Attendance service over a key-value backend and a recognizer.
#[derive(Debug)]
pub struct AttendanceStore<S, R = RandomRecognizer> {
    kv: S,
    recognizer: R,
    max_records: usize,
    requests: RequestTracker,
}

impl<S: KeyValueStore> AttendanceStore<S> {
    /// Create a store with the simulated recognizer and default retention.
    #[must_use]
    pub fn new(kv: S) -> Self {
        Self::with_recognizer(kv, RandomRecognizer::default())
    }
}

impl<S: KeyValueStore, R: Recognizer> AttendanceStore<S, R> {
    /// Create a store with a custom recognizer.
    #[must_use]
    pub fn with_recognizer(kv: S, recognizer: R) -> Self {
        Self {
            kv,
            recognizer,
            max_records: DEFAULT_MAX_RECORDS,
            requests: RequestTracker::new(),
        }
    }

    /// Set how many attendance records are retained (at least one).
    #[must_use]
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    /// Retention cap for attendance records.
    #[must_use]
    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// The backend this store writes to.
    #[must_use]
    pub fn backend(&self) -> &S {
        &self.kv
    }

    /// Match a snapshot against registered users.
    ///
    /// Waits for the recognizer, then returns the match or `None`. With no
    /// users registered the answer is always `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the users collection cannot be read.
    pub async fn recognize(&self, snapshot: &FaceSnapshot) -> Result<Option<RegisteredUser>> {
        Ok(self.recognize_tracked(snapshot).await?.user)
    }

    /// Like [`recognize`](Self::recognize), but tagged with a request token.
    ///
    /// Use [`is_latest`](Self::is_latest) to discard results of requests that
    /// were overtaken by a newer one.
    ///
    /// # Errors
    ///
    /// Returns an error if the users collection cannot be read.
    pub async fn recognize_tracked(&self, snapshot: &FaceSnapshot) -> Result<Recognition> {
        let token = self.requests.begin();
        let users = self.list_users()?;
        debug!(
            "Recognition #{} of snapshot {} against {} users via {}",
            token.value(),
            snapshot.fingerprint(),
            users.len(),
            self.recognizer.name()
        );

        let user = self.recognizer.identify(snapshot, &users).await;

        match &user {
            Some(user) => info!("Recognized {}", user.name),
            None => info!("Snapshot {} not recognized", snapshot.fingerprint()),
        }
        Ok(Recognition { token, user })
    }

    /// Check whether `recognition` belongs to the most recent request.
    #[must_use]
    pub fn is_latest(&self, recognition: &Recognition) -> bool {
        self.requests.is_latest(recognition.token)
    }

    /// Enroll a new user and log a `registered` record for them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProfile`](crate::Error::InvalidProfile) for a
    /// blank name, or an error if the backend cannot be written.
    pub fn register(&self, profile: UserProfile, snapshot: FaceSnapshot) -> Result<RegisteredUser> {
        let profile = profile.normalized()?;
        let mut users = self.list_users()?;

        if users.iter().any(|u| u.name == profile.name) {
            warn!(
                "A user named {:?} is already registered; their attendance records will be shared",
                profile.name
            );
        }

        let user = RegisteredUser::new(profile, snapshot);
        users.push(user.clone());
        self.save(USERS_KEY, &users)?;
        self.append_record(AttendanceRecord::new(
            user.name.clone(),
            AttendanceStatus::Registered,
        ))?;

        info!("Registered {} ({})", user.name, user.id);
        Ok(user)
    }

    /// Log a `present` record for `user`, timestamped now.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    pub fn mark_present(&self, user: &RegisteredUser) -> Result<AttendanceRecord> {
        let record = AttendanceRecord::new(user.name.clone(), AttendanceStatus::Present);
        self.append_record(record.clone())?;
        info!("Marked {} present", user.name);
        Ok(record)
    }

    /// Remove a user and every attendance record with the same name.
    ///
    /// Returns the removed user, or `None` if no user has that id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or written.
    pub fn delete_user(&self, id: Uuid) -> Result<Option<RegisteredUser>> {
        let mut users = self.list_users()?;
        let Some(index) = users.iter().position(|u| u.id == id) else {
            debug!("No user {} to delete", id);
            return Ok(None);
        };

        let removed = users.remove(index);
        self.save(USERS_KEY, &users)?;

        let mut records = self.list_records()?;
        let before = records.len();
        records.retain(|r| r.name != removed.name);
        self.save(RECORDS_KEY, &records)?;

        info!(
            "Deleted {} and {} attendance records",
            removed.name,
            before - records.len()
        );
        Ok(Some(removed))
    }

    /// Look up a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn find_user(&self, id: Uuid) -> Result<Option<RegisteredUser>> {
        Ok(self.list_users()?.into_iter().find(|u| u.id == id))
    }

    /// All registered users in enrollment order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read. Malformed stored data
    /// is not an error; it reads as an empty list.
    pub fn list_users(&self) -> Result<Vec<RegisteredUser>> {
        self.load(USERS_KEY)
    }

    /// All retained attendance records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read. Malformed stored data
    /// is not an error; it reads as an empty list.
    pub fn list_records(&self) -> Result<Vec<AttendanceRecord>> {
        self.load(RECORDS_KEY)
    }

    /// Wipe attendance history, keeping users.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    pub fn clear_records(&self) -> Result<()> {
        self.kv.delete(RECORDS_KEY)?;
        info!("Cleared attendance history");
        Ok(())
    }

    /// Wipe users and attendance history.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    pub fn clear_all(&self) -> Result<()> {
        self.kv.delete(USERS_KEY)?;
        self.kv.delete(RECORDS_KEY)?;
        info!("Cleared all users and attendance history");
        Ok(())
    }

    /// Dump both collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    pub fn snapshot(&self) -> Result<Export> {
        Ok(Export {
            users: self.list_users()?,
            records: self.list_records()?,
            exported_at: Utc::now(),
        })
    }

    fn append_record(&self, record: AttendanceRecord) -> Result<()> {
        let mut records = self.list_records()?;
        records.insert(0, record);
        if records.len() > self.max_records {
            debug!(
                "Evicting {} records past the cap of {}",
                records.len() - self.max_records,
                self.max_records
            );
            records.truncate(self.max_records);
        }
        self.save(RECORDS_KEY, &records)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let Some(raw) = self.kv.get(key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!("Ignoring malformed data under {}: {}", key, e);
                Ok(Vec::new())
            }
        }
    }

    fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        self.kv.put(key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::storage::{MemoryStore, SqliteStore};

    type TestStore = AttendanceStore<MemoryStore, RandomRecognizer>;

    fn create_test_store() -> TestStore {
        crate::logging::init_test_logging();
        AttendanceStore::with_recognizer(
            MemoryStore::new(),
            RandomRecognizer::seeded(0.7, Duration::ZERO, 7),
        )
    }

    fn always_matching_store() -> TestStore {
        AttendanceStore::with_recognizer(
            MemoryStore::new(),
            RandomRecognizer::seeded(1.0, Duration::ZERO, 7),
        )
    }

    fn face() -> FaceSnapshot {
        FaceSnapshot::new("data:image/png;base64,AAAA")
    }

    fn register(store: &TestStore, name: &str) -> RegisteredUser {
        store.register(UserProfile::named(name), face()).unwrap()
    }

    #[test]
    fn test_empty_on_first_access() {
        let store = create_test_store();
        assert!(store.list_users().unwrap().is_empty());
        assert!(store.list_records().unwrap().is_empty());
    }

    #[test]
    fn test_register_assigns_distinct_ids() {
        let store = create_test_store();
        for i in 0..10 {
            register(&store, &format!("User {i}"));
        }

        let users = store.list_users().unwrap();
        assert_eq!(users.len(), 10);
        let ids: HashSet<_> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_register_emits_registered_record() {
        let store = create_test_store();
        let user = store
            .register(
                UserProfile {
                    name: "Ann".to_string(),
                    email: "ann@example.com".to_string(),
                    department: "Ops".to_string(),
                },
                face(),
            )
            .unwrap();

        assert_eq!(user.email, "ann@example.com");
        assert_eq!(user.department, "Ops");
        assert_eq!(user.face_data, face());

        let records = store.list_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Ann");
        assert_eq!(records[0].status, AttendanceStatus::Registered);
    }

    #[test]
    fn test_register_rejects_blank_name() {
        let store = create_test_store();
        let err = store.register(UserProfile::named("  "), face()).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidProfile { .. }));
        assert!(store.list_users().unwrap().is_empty());
        assert!(store.list_records().unwrap().is_empty());
    }

    #[test]
    fn test_mark_present() {
        let store = create_test_store();
        let ann = register(&store, "Ann");
        let record = store.mark_present(&ann).unwrap();

        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(store.list_records().unwrap()[0], record);
    }

    #[test]
    fn test_retention_cap_keeps_newest_fifty() {
        let store = create_test_store();
        let ann = register(&store, "Ann");

        let mut inserted = vec![store.list_records().unwrap()[0].id];
        for _ in 0..59 {
            inserted.push(store.mark_present(&ann).unwrap().id);
        }
        assert_eq!(inserted.len(), 60);

        let records = store.list_records().unwrap();
        assert_eq!(records.len(), 50);

        let expected: Vec<_> = inserted.iter().rev().take(50).copied().collect();
        let actual: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_retention_cap_mixed_inserts() {
        let store = create_test_store();
        for i in 0..30 {
            let user = register(&store, &format!("User {i}"));
            store.mark_present(&user).unwrap();
        }
        let records = store.list_records().unwrap();
        assert_eq!(records.len(), 50);
        assert_eq!(records[0].name, "User 29");
        assert_eq!(records[0].status, AttendanceStatus::Present);
        assert_eq!(store.list_users().unwrap().len(), 30);
    }

    #[test]
    fn test_custom_retention() {
        let store = create_test_store().with_max_records(3);
        let ann = register(&store, "Ann");
        for _ in 0..5 {
            store.mark_present(&ann).unwrap();
        }
        assert_eq!(store.list_records().unwrap().len(), 3);
        assert_eq!(create_test_store().with_max_records(0).max_records(), 1);
    }

    #[test]
    fn test_delete_user_cascades_by_name() {
        let store = create_test_store();
        let ann = register(&store, "Ann");
        let bo = register(&store, "Bo");
        store.mark_present(&ann).unwrap();
        store.mark_present(&bo).unwrap();

        let removed = store.delete_user(ann.id).unwrap();
        assert_eq!(removed.map(|u| u.id), Some(ann.id));

        let users = store.list_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, bo.id);

        let records = store.list_records().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.name == "Bo"));
    }

    #[test]
    fn test_delete_user_shared_name_removes_all_matching_records() {
        let store = create_test_store();
        let first = register(&store, "Ann");
        let second = register(&store, "Ann");
        store.mark_present(&second).unwrap();

        store.delete_user(first.id).unwrap();

        let users = store.list_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, second.id);
        assert!(store.list_records().unwrap().is_empty());
    }

    #[test]
    fn test_delete_unknown_user_is_noop() {
        let store = create_test_store();
        register(&store, "Ann");

        assert!(store.delete_user(Uuid::new_v4()).unwrap().is_none());
        assert_eq!(store.list_users().unwrap().len(), 1);
        assert_eq!(store.list_records().unwrap().len(), 1);
    }

    #[test]
    fn test_find_user() {
        let store = create_test_store();
        let ann = register(&store, "Ann");
        assert_eq!(store.find_user(ann.id).unwrap(), Some(ann));
        assert!(store.find_user(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_clear_records_keeps_users() {
        let store = create_test_store();
        register(&store, "Ann");
        store.clear_records().unwrap();

        assert_eq!(store.list_users().unwrap().len(), 1);
        assert!(store.list_records().unwrap().is_empty());
    }

    #[test]
    fn test_clear_all() {
        let store = create_test_store();
        let ann = register(&store, "Ann");
        store.mark_present(&ann).unwrap();

        store.clear_all().unwrap();
        assert!(store.list_users().unwrap().is_empty());
        assert!(store.list_records().unwrap().is_empty());

        // Clearing an empty store succeeds too
        store.clear_all().unwrap();
        store.clear_records().unwrap();
    }

    #[test]
    fn test_malformed_data_reads_as_empty() {
        let store = create_test_store();
        store.backend().put(USERS_KEY, "{not json").unwrap();
        store.backend().put(RECORDS_KEY, r#"{"a": 1}"#).unwrap();

        assert!(store.list_users().unwrap().is_empty());
        assert!(store.list_records().unwrap().is_empty());

        // Writes recover the collection
        register(&store, "Ann");
        assert_eq!(store.list_users().unwrap().len(), 1);
        assert_eq!(store.list_records().unwrap().len(), 1);
    }

    #[test]
    fn test_reads_original_json_layout() {
        let store = create_test_store();
        store
            .backend()
            .put(
                USERS_KEY,
                r#"[{"id":"6f1c1b3a-6a55-4c8e-9d4e-2f7f0a1d9b11","name":"Ann","email":"","department":"","faceData":"data:image/jpeg;base64,AA","registeredAt":"2024-03-01T09:00:00.000Z"}]"#,
            )
            .unwrap();
        store
            .backend()
            .put(
                RECORDS_KEY,
                r#"[{"id":"0b0f5f7e-3c47-4f61-9f0c-4d1e2a3b4c5d","name":"Ann","timestamp":"2024-03-01T09:00:00.000Z","status":"registered"}]"#,
            )
            .unwrap();

        let users = store.list_users().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Ann");
        let records = store.list_records().unwrap();
        assert_eq!(records[0].status, AttendanceStatus::Registered);
    }

    #[tokio::test]
    async fn test_recognize_with_no_users() {
        let store = always_matching_store();
        for _ in 0..10 {
            assert!(store.recognize(&face()).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_recognize_returns_registered_user() {
        let store = always_matching_store();
        let ann = store.register(UserProfile::named("Ann"), face()).unwrap();

        let found = store.recognize(&face()).await.unwrap();
        assert_eq!(found, Some(ann));
    }

    #[tokio::test]
    async fn test_recognize_does_not_mutate() {
        let store = always_matching_store();
        store.register(UserProfile::named("Ann"), face()).unwrap();
        let _ = store.recognize(&face()).await.unwrap();
        assert_eq!(store.list_records().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tracked_recognition_staleness() {
        let store = always_matching_store();
        store.register(UserProfile::named("Ann"), face()).unwrap();

        let first = store.recognize_tracked(&face()).await.unwrap();
        assert!(store.is_latest(&first));

        let second = store.recognize_tracked(&face()).await.unwrap();
        assert!(!store.is_latest(&first));
        assert!(store.is_latest(&second));
    }

    #[test]
    fn test_ann_scenario() {
        let store = create_test_store();
        let ann = register(&store, "Ann");
        store.mark_present(&ann).unwrap();
        store.mark_present(&ann).unwrap();

        let records = store.list_records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].status, AttendanceStatus::Present);
        assert_eq!(records[1].status, AttendanceStatus::Present);
        assert_eq!(records[2].status, AttendanceStatus::Registered);
        assert!(records[0].timestamp >= records[2].timestamp);

        store.delete_user(ann.id).unwrap();
        assert!(store.list_records().unwrap().is_empty());
        assert!(store.list_users().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_export() {
        let store = create_test_store();
        let ann = register(&store, "Ann");
        store.mark_present(&ann).unwrap();

        let export = store.snapshot().unwrap();
        assert_eq!(export.users.len(), 1);
        assert_eq!(export.records.len(), 2);

        let value = serde_json::to_value(&export).unwrap();
        assert!(value.get("exportedAt").is_some());
    }

    #[test]
    fn test_sqlite_backend_persists_collections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.db");

        let ann_id = {
            let store = AttendanceStore::new(SqliteStore::open(&path).unwrap());
            let ann = store.register(UserProfile::named("Ann"), face()).unwrap();
            store.mark_present(&ann).unwrap();
            ann.id
        };

        let store = AttendanceStore::new(SqliteStore::open(&path).unwrap());
        assert_eq!(store.list_users().unwrap()[0].id, ann_id);
        assert_eq!(store.list_records().unwrap().len(), 2);
    }
}
