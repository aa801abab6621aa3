//! In-memory remote store

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use backup_fs::hash_bytes;
use chrono::{DateTime, Utc};

use crate::{ExclusionRules, ObjectMeta, RemoteError, RemoteStore, Result, normalize_remote_path};

#[derive(Debug, Clone)]
struct Entry {
    content: Vec<u8>,
    changed_at: Option<DateTime<Utc>>,
}

/// A thread-safe in-memory [`RemoteStore`].
///
/// Objects carry an explicit last-change time; an object without one behaves
/// like a remote whose history cannot be queried. Paths can be marked as
/// failing to simulate transport errors, and call counters let callers assert
/// which operations ran.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Entry>>,
    failing: Mutex<Vec<String>>,
    content_fetches: AtomicUsize,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object changed "now".
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) {
        self.insert_with_time(path, content, Utc::now());
    }

    pub fn insert_with_time(
        &self,
        path: &str,
        content: impl Into<Vec<u8>>,
        changed_at: DateTime<Utc>,
    ) {
        self.lock_objects().insert(
            normalize_remote_path(path),
            Entry {
                content: content.into(),
                changed_at: Some(changed_at),
            },
        );
    }

    /// Override (or with `None`, hide) the last-change time of an object.
    pub fn set_last_change(&self, path: &str, changed_at: Option<DateTime<Utc>>) {
        if let Some(entry) = self.lock_objects().get_mut(&normalize_remote_path(path)) {
            entry.changed_at = changed_at;
        }
    }

    /// Make every call touching `path` fail with a transport error.
    pub fn fail_path(&self, path: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(normalize_remote_path(path));
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.lock_objects()
            .get(&normalize_remote_path(path))
            .map(|e| e.content.clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock_objects().contains_key(&normalize_remote_path(path))
    }

    pub fn len(&self) -> usize {
        self.lock_objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn content_fetch_count(&self) -> usize {
        self.content_fetches.load(Ordering::SeqCst)
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn lock_objects(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Entry>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, path: &str) -> Result<String> {
        let path = normalize_remote_path(path);
        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(&path) {
            return Err(RemoteError::transport(path, "simulated transport failure"));
        }
        Ok(path)
    }
}

impl RemoteStore for MemoryStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn get_object_content(&self, path: &str) -> Result<Vec<u8>> {
        let path = self.check(path)?;
        self.content_fetches.fetch_add(1, Ordering::SeqCst);
        self.lock_objects()
            .get(&path)
            .map(|e| e.content.clone())
            .ok_or_else(|| RemoteError::not_found(path))
    }

    fn get_object_meta(&self, path: &str) -> Result<ObjectMeta> {
        let path = self.check(path)?;
        let objects = self.lock_objects();
        let entry = objects
            .get(&path)
            .ok_or_else(|| RemoteError::not_found(path.clone()))?;
        Ok(ObjectMeta {
            size: entry.content.len() as u64,
            identity: hash_bytes(&entry.content).to_hex(),
            path,
        })
    }

    fn get_last_change_time(&self, path: &str) -> Result<DateTime<Utc>> {
        let path = self.check(path)?;
        self.lock_objects()
            .get(&path)
            .and_then(|e| e.changed_at)
            .ok_or_else(|| RemoteError::not_found(path))
    }

    fn put_object(&self, path: &str, content: &[u8]) -> Result<()> {
        let path = self.check(path)?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.lock_objects().insert(
            path,
            Entry {
                content: content.to_vec(),
                changed_at: Some(Utc::now()),
            },
        );
        Ok(())
    }

    fn delete_object(&self, path: &str) -> Result<()> {
        let path = self.check(path)?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        match self.lock_objects().remove(&path) {
            Some(_) => Ok(()),
            None => Err(RemoteError::not_found(path)),
        }
    }

    fn list_objects(&self, prefix: &str, rules: &ExclusionRules) -> Result<Vec<String>> {
        let prefix = self.check(prefix)?;
        let objects = self.lock_objects();
        let dir_prefix = format!("{prefix}/");
        let under: Vec<&String> = objects
            .keys()
            .filter(|key| prefix.is_empty() || **key == prefix || key.starts_with(&dir_prefix))
            .collect();
        if under.is_empty() && !prefix.is_empty() {
            return Err(RemoteError::not_found(prefix));
        }
        Ok(under
            .into_iter()
            .filter(|key| !rules.is_excluded(key))
            .cloned()
            .collect())
    }
}
