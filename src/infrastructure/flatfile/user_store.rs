//! Flat-file user store
//!
//! Three comma-delimited columns with a header row:
//!
//! ```text
//! username,email_id,password
//! A,a@x.com,$2b$12$...
//! ```
//!
//! Every signup rewrites the whole file. The rewrite goes to a sibling temp
//! file which is then renamed over the original, so a crash mid-write leaves
//! the previous version intact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{DomainError, DomainResult, NewUser, UserRecord, UserStore};
use crate::shared::InfraError;

pub const HEADER: [&str; 3] = ["username", "email_id", "password"];

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    username: String,
    email_id: String,
    password: String,
}

impl From<CsvRow> for UserRecord {
    fn from(row: CsvRow) -> Self {
        UserRecord {
            username: row.username,
            email: row.email_id,
            password_hash: row.password,
            created_at: None,
        }
    }
}

pub struct CsvUserStore {
    path: PathBuf,
    /// Cached file contents; the lock also serializes writers.
    records: Mutex<Option<Vec<UserRecord>>>,
}

impl CsvUserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<Vec<UserRecord>, InfraError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "User store missing, creating empty store");
            write_file(&self.path, &[])?;
            return Ok(Vec::new());
        }

        // Fields are kept verbatim, matching what `write_file` emits.
        let mut reader = ReaderBuilder::new().has_headers(true).from_path(&self.path)?;

        let mut records = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            records.push(row?.into());
        }
        debug!(path = %self.path.display(), count = records.len(), "User store loaded");
        Ok(records)
    }
}

fn write_file(path: &Path, records: &[UserRecord]) -> Result<(), InfraError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = WriterBuilder::new().has_headers(false).from_path(&tmp)?;
        writer.write_record(HEADER)?;
        for r in records {
            writer.write_record([r.username.as_str(), r.email.as_str(), r.password_hash.as_str()])?;
        }
        let mut file = writer
            .into_inner()
            .map_err(|e| InfraError::Io(e.into_error()))?;
        file.flush()?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl UserStore for CsvUserStore {
    async fn load(&self) -> DomainResult<Vec<UserRecord>> {
        let mut guard = self.records.lock().await;
        let records = self.read_file()?;
        *guard = Some(records.clone());
        Ok(records)
    }

    async fn exists_email(&self, email: &str) -> DomainResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<UserRecord>> {
        let mut guard = self.records.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file()?);
        }
        Ok(guard
            .as_ref()
            .and_then(|records| records.iter().find(|r| r.email == email).cloned()))
    }

    async fn add(&self, new_user: NewUser) -> DomainResult<UserRecord> {
        let mut guard = self.records.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file()?);
        }
        let records = guard.get_or_insert_with(Vec::new);

        if records.iter().any(|r| r.email == new_user.email) {
            return Err(DomainError::DuplicateEmail(new_user.email));
        }

        let record = UserRecord {
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: None,
        };
        records.push(record.clone());

        if let Err(e) = write_file(&self.path, records) {
            warn!(path = %self.path.display(), error = %e, "User store rewrite failed");
            records.pop();
            return Err(e.into());
        }
        Ok(record)
    }

    async fn count(&self) -> DomainResult<u64> {
        let mut guard = self.records.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file()?);
        }
        Ok(guard.as_ref().map_or(0, |r| r.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            username: name.into(),
            email: email.into(),
            password_hash: "$2b$04$hash".into(),
        }
    }

    #[tokio::test]
    async fn load_creates_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        let store = CsvUserStore::new(&path);

        assert!(store.load().await.unwrap().is_empty());
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), "username,email_id,password");
    }

    #[tokio::test]
    async fn add_rewrites_file_and_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");

        let store = CsvUserStore::new(&path);
        store.add(new_user("A", "a@x.com")).await.unwrap();
        store.add(new_user("B", "b@x.com")).await.unwrap();

        let reopened = CsvUserStore::new(&path);
        let records = reopened.load().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].username, "B");
        assert!(reopened.exists_email("a@x.com").await.unwrap());
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[tokio::test]
    async fn reads_existing_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        fs::write(&path, "username,email_id,password\nA,a@x.com,p1\n").unwrap();

        let store = CsvUserStore::new(&path);
        let found = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.username, "A");
        assert_eq!(found.password_hash, "p1");
    }

    #[tokio::test]
    async fn whitespace_in_emails_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        let store = CsvUserStore::new(&path);
        store.add(new_user("A", "a@x.com")).await.unwrap();
        store.add(new_user("B", " a@x.com")).await.unwrap();

        let reopened = CsvUserStore::new(&path);
        let users = reopened.load().await.unwrap();
        let emails: Vec<&str> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["a@x.com", " a@x.com"]);

        let spaced = reopened.find_by_email(" a@x.com").await.unwrap().unwrap();
        assert_eq!(spaced.username, "B");
        let plain = reopened.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(plain.username, "A");

        let err = reopened.add(new_user("C", " a@x.com")).await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateEmail(_)));
        assert_eq!(reopened.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_email_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvUserStore::new(dir.path().join("users.csv"));
        store.add(new_user("A", "a@x.com")).await.unwrap();

        let err = store.add(new_user("A2", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicateEmail(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_signups_for_same_email_admit_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CsvUserStore::new(dir.path().join("users.csv")));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.add(new_user(&format!("u{}", i), "same@x.com")).await
            }));
        }

        let mut ok = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
