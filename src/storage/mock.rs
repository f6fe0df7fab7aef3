use super::{ListRequest, ObjectStore, RawListing, RawObject};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
}

/// In-memory store that mimics `ListObjectsV2` grouping and pagination.
///
/// Continuation tokens are the name of the last entry (key or common prefix)
/// on the previous page.
#[derive(Clone)]
pub struct MockObjectStore {
    files: Arc<Mutex<BTreeMap<String, StoredObject>>>,
    failing_keys: Arc<Mutex<HashSet<String>>>,
    put_count: Arc<Mutex<usize>>,
    delete_count: Arc<Mutex<usize>>,
    list_count: Arc<Mutex<usize>>,
}

enum Entry {
    Object(RawObject),
    Prefix(String),
}

impl Entry {
    fn name(&self) -> &str {
        match self {
            Entry::Object(obj) => &obj.key,
            Entry::Prefix(prefix) => prefix,
        }
    }
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(BTreeMap::new())),
            failing_keys: Arc::new(Mutex::new(HashSet::new())),
            put_count: Arc::new(Mutex::new(0)),
            delete_count: Arc::new(Mutex::new(0)),
            list_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_file(self, key: &str, content: Vec<u8>) -> Self {
        self.files.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data: content,
                content_type: "application/octet-stream".to_string(),
                last_modified: Utc::now(),
            },
        );
        self
    }

    /// Every operation touching `key` fails with a backend error.
    pub fn with_failing_key(self, key: &str) -> Self {
        self.failing_keys.lock().unwrap().insert(key.to_string());
        self
    }

    pub fn get_put_count(&self) -> usize {
        *self.put_count.lock().unwrap()
    }

    pub fn get_delete_count(&self) -> usize {
        *self.delete_count.lock().unwrap()
    }

    pub fn get_list_count(&self) -> usize {
        *self.list_count.lock().unwrap()
    }

    pub fn get_file(&self, key: &str) -> Option<StoredObject> {
        self.files.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    fn check_failure(&self, operation: &'static str, key: &str) -> Result<()> {
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(Error::backend(operation, key, "Mock failure"));
        }
        Ok(())
    }

    fn not_found(operation: &'static str, key: &str) -> Error {
        Error::backend(operation, key, "NoSuchKey: The specified key does not exist.")
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put_object(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        self.check_failure("put_object", key)?;
        *self.put_count.lock().unwrap() += 1;

        self.files.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        self.check_failure("get_object", key)?;
        let files = self.files.lock().unwrap();
        match files.get(key) {
            Some(obj) => Ok(obj.data.clone()),
            None => Err(Self::not_found("get_object", key)),
        }
    }

    async fn copy_object(&self, source_key: &str, target_key: &str) -> Result<()> {
        self.check_failure("copy_object", source_key)?;
        let mut files = self.files.lock().unwrap();
        let source = files
            .get(source_key)
            .cloned()
            .ok_or_else(|| Self::not_found("copy_object", source_key))?;
        files.insert(
            target_key.to_string(),
            StoredObject {
                last_modified: Utc::now(),
                ..source
            },
        );
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.check_failure("delete_object", key)?;
        *self.delete_count.lock().unwrap() += 1;
        // S3 deletes are idempotent
        self.files.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_objects_page(&self, request: &ListRequest) -> Result<RawListing> {
        *self.list_count.lock().unwrap() += 1;

        let prefix = request.prefix.as_deref().unwrap_or("");
        let delimiter = request.delimiter.as_deref().filter(|d| !d.is_empty());
        let files = self.files.lock().unwrap();

        let mut entries: Vec<Entry> = Vec::new();
        for (key, obj) in files.iter().filter(|(k, _)| k.starts_with(prefix)) {
            let rest = &key[prefix.len()..];
            match delimiter.and_then(|d| rest.find(d).map(|i| i + d.len())) {
                Some(end) => {
                    let common = format!("{}{}", prefix, &rest[..end]);
                    let seen = matches!(entries.last(), Some(Entry::Prefix(p)) if *p == common);
                    if !seen {
                        entries.push(Entry::Prefix(common));
                    }
                }
                None => entries.push(Entry::Object(RawObject {
                    key: key.clone(),
                    size: obj.data.len() as i64,
                    last_modified: Some(obj.last_modified),
                })),
            }
        }

        let token = request.continuation_token.as_deref();
        let mut remaining = entries
            .into_iter()
            .filter(|entry| token.map_or(true, |t| entry.name() > t))
            .peekable();

        let mut listing = RawListing::default();
        let mut last_name = None;
        for _ in 0..request.max_keys {
            let Some(entry) = remaining.next() else {
                break;
            };
            last_name = Some(entry.name().to_string());
            match entry {
                Entry::Object(obj) => listing.objects.push(obj),
                Entry::Prefix(p) => listing.common_prefixes.push(p),
            }
        }

        if remaining.peek().is_some() {
            listing.is_truncated = true;
            listing.next_token = last_name;
        }
        Ok(listing)
    }
}
