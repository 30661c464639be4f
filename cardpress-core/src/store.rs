//! File-backed and in-memory implementations of the collaborator contracts.
//!
//! These stand in for the admin tool's database and upload area: records come
//! from a YAML file, settings live in a small JSON document, photos are plain
//! files in a directory.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::contract::{PhotoStore, RecordSource, SettingsStore};
use crate::error::{BoxError, RecordError, SettingsError};
use crate::record::UserRecord;

/// Normalize, validate, reject duplicates, sort by `employee_id`.
pub fn prepare_records(records: Vec<UserRecord>) -> Result<Vec<UserRecord>, RecordError> {
    let mut seen = HashSet::new();
    let mut prepared = Vec::with_capacity(records.len());
    for record in records {
        let record = record.normalize();
        record.validate()?;
        if !seen.insert(record.employee_id.clone()) {
            return Err(RecordError::Duplicate(record.employee_id));
        }
        prepared.push(record);
    }
    prepared.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
    Ok(prepared)
}

pub struct MemoryRecordSource {
    records: Vec<UserRecord>,
}

impl MemoryRecordSource {
    pub fn new(records: Vec<UserRecord>) -> Result<Self, RecordError> {
        Ok(Self {
            records: prepare_records(records)?,
        })
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn list_all_records(&self) -> Result<Vec<UserRecord>, BoxError> {
        Ok(self.records.clone())
    }
}

/// Reads a YAML list of records on every call.
pub struct YamlRecordSource {
    path: PathBuf,
}

impl YamlRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Vec<UserRecord>, RecordError> {
        let content = fs::read_to_string(&self.path).map_err(|source| {
            error!(error = ?source, path = %self.path.display(), "Failed to read records file");
            RecordError::Io {
                path: self.path.clone(),
                source,
            }
        })?;
        let raw: Vec<UserRecord> = serde_yaml::from_str(&content).map_err(|source| {
            error!(error = ?source, path = %self.path.display(), "Failed to parse records file");
            RecordError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        let records = prepare_records(raw)?;
        info!(path = %self.path.display(), count = records.len(), "Loaded user records");
        Ok(records)
    }
}

#[async_trait]
impl RecordSource for YamlRecordSource {
    async fn list_all_records(&self) -> Result<Vec<UserRecord>, BoxError> {
        Ok(self.load()?)
    }
}

#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: Mutex::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BoxError> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), BoxError> {
        self.values.lock().await.extend(entries);
        Ok(())
    }
}

/// Settings persisted as a flat JSON object.
///
/// Every write rewrites the whole document through a temp file persisted over
/// the target, so readers never see a half-written file.
pub struct JsonSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, SettingsError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(SettingsError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(io_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        let json = serde_json::to_string_pretty(values)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        debug!(path = %self.path.display(), keys = values.len(), "Settings written");
        Ok(())
    }

    async fn update(&self, entries: Vec<(String, String)>) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().await;
        let mut values = self.read_all()?;
        values.extend(entries);
        self.write_all(&values)
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        Ok(self.read_all()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BoxError> {
        Ok(self
            .update(vec![(key.to_string(), value.to_string())])
            .await?)
    }

    async fn set_many(&self, entries: Vec<(String, String)>) -> Result<(), BoxError> {
        Ok(self.update(entries).await?)
    }
}

/// Photos stored as files in one directory.
pub struct DirPhotoStore {
    dir: PathBuf,
}

impl DirPhotoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PhotoStore for DirPhotoStore {
    fn read(&self, file_name: &str) -> Result<Option<Vec<u8>>, std::io::Error> {
        // Final path component only; lookups stay inside `dir`.
        let Some(name) = Path::new(file_name).file_name() else {
            return Ok(None);
        };
        match fs::read(self.dir.join(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
