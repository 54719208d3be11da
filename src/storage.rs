use crate::errors::StoreError;
use crate::models::HistoryEntry;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tracing::{error, warn};

pub const HISTORY_KEY: &str = "namjaap_history";
pub const CUSTOM_CHANTS_KEY: &str = "customChants";

/// Durable map the engine persists its snapshots into.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;
    fn set(&self, key: &str, value: Vec<u8>) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// One JSON file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        fs::write(self.path_for(key), value).await?;
        Ok(())
    }
}

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    writes: Arc<AtomicUsize>,
    reject_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.lock().insert(key.to_string(), value.into());
    }

    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().get(key).cloned()
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                message: "writes disabled".to_string(),
            });
        }
        self.insert(key, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn encode_history(entries: &[HistoryEntry]) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(entries)?)
}

pub fn encode_chants(chants: &[String]) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(chants)?)
}

/// Outcome of a fail-soft load: the value to start from and, when the store
/// itself failed, the error to surface.
#[derive(Debug)]
pub struct Loaded<T> {
    pub value: T,
    pub failure: Option<StoreError>,
}

pub async fn load_history<S: KeyValueStore>(store: &S) -> Loaded<Vec<HistoryEntry>> {
    load_json(store, HISTORY_KEY).await
}

pub async fn load_custom_chants<S: KeyValueStore>(store: &S) -> Loaded<Vec<String>> {
    load_json(store, CUSTOM_CHANTS_KEY).await
}

async fn load_json<S, T>(store: &S, key: &str) -> Loaded<Vec<T>>
where
    S: KeyValueStore,
    T: serde::de::DeserializeOwned,
{
    match store.get(key).await {
        Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(value) => Loaded {
                value,
                failure: None,
            },
            Err(err) => {
                warn!(key, "discarding unparsable snapshot: {err}");
                Loaded {
                    value: Vec::new(),
                    failure: None,
                }
            }
        },
        Ok(None) => Loaded {
            value: Vec::new(),
            failure: None,
        },
        Err(err) => {
            error!(key, "failed to read snapshot: {err}");
            Loaded {
                value: Vec::new(),
                failure: Some(err),
            }
        }
    }
}
