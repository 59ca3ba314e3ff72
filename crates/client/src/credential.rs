//! Session credential and the stores that persist it.
//!
//! A store holds at most one [`Credential`]. It is written on login, read
//! before every outbound request and cleared on logout or expiry. Stores do
//! not look inside the token.

use std::{fmt, io, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};

/// Key the token is stored under.
pub const TOKEN_KEY: &str = "token";

/// Opaque bearer token issued at login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt credential storage: {0}")]
    Corrupt(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Corrupt(value.to_string())
    }
}

/// Get/set/clear contract over the persisted session token.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self) -> Result<Option<Credential>, StorageError>;

    async fn set(&self, credential: Credential) -> Result<(), StorageError>;

    async fn clear(&self) -> Result<(), StorageError>;
}

#[async_trait]
impl<S: CredentialStore + ?Sized> CredentialStore for Arc<S> {
    async fn get(&self) -> Result<Option<Credential>, StorageError> {
        (**self).get().await
    }

    async fn set(&self, credential: Credential) -> Result<(), StorageError> {
        (**self).set(credential).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        (**self).clear().await
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: RwLock::new(Some(credential)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Result<Option<Credential>, StorageError> {
        Ok(self.slot.read().await.clone())
    }

    async fn set(&self, credential: Credential) -> Result<(), StorageError> {
        *self.slot.write().await = Some(credential);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.slot.write().await = None;
        Ok(())
    }
}

/// JSON key-value file with the token under [`TOKEN_KEY`].
///
/// Other keys found in the file are left untouched. A missing file reads as
/// "no credential".
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<Map<String, Value>, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&content)? {
            Value::Object(entries) => Ok(entries),
            other => Err(StorageError::Corrupt(format!(
                "expected a JSON object, found {other}"
            ))),
        }
    }

    async fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_string_pretty(entries)?;
        // Readers never take the lock, so they must only ever see a whole file.
        let staging = self.staging_path();
        tokio::fs::write(&staging, payload).await?;
        if let Err(err) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(err.into());
        }
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> Result<Option<Credential>, StorageError> {
        let entries = self.read_entries().await?;
        match entries.get(TOKEN_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(token)) => Ok(Some(Credential::new(token.clone()))),
            Some(_) => Err(StorageError::Corrupt(format!(
                "\"{TOKEN_KEY}\" is not a string"
            ))),
        }
    }

    async fn set(&self, credential: Credential) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.insert(TOKEN_KEY.to_string(), Value::String(credential.0));
        self.write_entries(&entries).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        if entries.remove(TOKEN_KEY).is_none() {
            return Ok(());
        }
        self.write_entries(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../target/test_state")
            .join(format!("{name}_{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn debug_never_prints_the_token() {
        let credential = Credential::new("secret-token");
        assert!(!format!("{credential:?}").contains("secret-token"));
    }

    #[tokio::test]
    async fn memory_store_lifecycle() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get().await.unwrap(), None);

        store.set(Credential::new("abc")).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(Credential::new("abc")));

        store.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_missing_file_is_unauthenticated() {
        let store = FileCredentialStore::new(temp_path("missing"));
        assert_eq!(store.get().await.unwrap(), None);
        store.clear().await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn file_store_round_trip_keeps_other_keys() {
        let path = temp_path("roundtrip");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let store = FileCredentialStore::new(&path);
        store.set(Credential::new("tok-1")).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(Credential::new("tok-1")));

        store.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert!(raw.get(TOKEN_KEY).is_none());

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn file_store_reads_never_see_a_partial_write() {
        let path = temp_path("concurrent");
        let store = Arc::new(FileCredentialStore::new(&path));
        store.set(Credential::new("tok-0")).await.unwrap();

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for n in 1..=50 {
                    let token = format!("tok-{n}-{}", "x".repeat(512));
                    store.set(Credential::new(token)).await.unwrap();
                }
            })
        };

        while !writer.is_finished() {
            let credential = store.get().await.unwrap();
            assert!(credential.is_some_and(|c| c.expose().starts_with("tok-")));
        }
        writer.await.unwrap();

        assert!(store.get().await.unwrap().unwrap().expose().starts_with("tok-50-"));
        assert!(!store.staging_path().exists());

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_content() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let store = FileCredentialStore::new(&path);
        let err = store.get().await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));

        std::fs::remove_file(&path).unwrap();
    }
}
