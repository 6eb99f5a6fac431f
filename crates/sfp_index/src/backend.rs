use crate::IndexError;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Storage seam for encoded index records, keyed by record id.
///
/// Implementations only see opaque byte payloads; encoding, compression and
/// dimension checks all happen above this trait.
pub trait IndexBackend: Send + Sync {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError>;
    fn delete(&self, key: &str) -> Result<(), IndexError>;
    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError>;
    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError>;
    fn flush(&self) -> Result<(), IndexError> {
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub enum BackendConfig {
    Redb { path: String },
    InMemory,
}

impl BackendConfig {
    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn build(&self) -> Result<Box<dyn IndexBackend>, IndexError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(IndexError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Redb {
            path: "data/sfp_index.redb".into(),
        }
    }
}

pub struct InMemoryBackend {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
        self.records
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
        let guard = self
            .records
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), IndexError> {
        self.records
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?
            .remove(key);
        Ok(())
    }

    fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        for (key, value) in entries {
            guard.insert(key, value);
        }
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
    ) -> Result<(), IndexError> {
        let guard = self
            .records
            .read()
            .map_err(|_| IndexError::backend("poisoned lock"))?;
        for value in guard.values() {
            visitor(value)?;
        }
        Ok(())
    }
}

#[cfg(feature = "backend-redb")]
mod redb_backend {
    use super::IndexBackend;
    use crate::IndexError;
    use redb::{Database, ReadableTable, TableDefinition};
    use std::path::Path;
    use std::sync::Arc;

    const VECTOR_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("stylefp_vectors");

    /// Single-file embedded store. Redb commits synchronously, so every put is
    /// durable by the time it returns and `flush` has nothing left to do.
    pub struct RedbBackend {
        db: Arc<Database>,
    }

    impl RedbBackend {
        pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
            let db = Database::create(path).map_err(IndexError::backend)?;

            // Opening the table once inside a write transaction creates it,
            // so later read transactions never see a missing table.
            let txn = db.begin_write().map_err(IndexError::backend)?;
            {
                let _table = txn.open_table(VECTOR_TABLE).map_err(IndexError::backend)?;
            }
            txn.commit().map_err(IndexError::backend)?;

            Ok(Self { db: Arc::new(db) })
        }
    }

    impl IndexBackend for RedbBackend {
        fn put(&self, key: &str, value: &[u8]) -> Result<(), IndexError> {
            let txn = self.db.begin_write().map_err(IndexError::backend)?;
            {
                let mut table = txn.open_table(VECTOR_TABLE).map_err(IndexError::backend)?;
                table.insert(key, value).map_err(IndexError::backend)?;
            }
            txn.commit().map_err(IndexError::backend)?;
            Ok(())
        }

        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, IndexError> {
            let txn = self.db.begin_read().map_err(IndexError::backend)?;
            let table = txn.open_table(VECTOR_TABLE).map_err(IndexError::backend)?;
            let value = match table.get(key).map_err(IndexError::backend)? {
                Some(value) => Some(value.value().to_vec()),
                None => None,
            };
            Ok(value)
        }

        fn delete(&self, key: &str) -> Result<(), IndexError> {
            let txn = self.db.begin_write().map_err(IndexError::backend)?;
            {
                let mut table = txn.open_table(VECTOR_TABLE).map_err(IndexError::backend)?;
                table.remove(key).map_err(IndexError::backend)?;
            }
            txn.commit().map_err(IndexError::backend)?;
            Ok(())
        }

        fn batch_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), IndexError> {
            let txn = self.db.begin_write().map_err(IndexError::backend)?;
            {
                let mut table = txn.open_table(VECTOR_TABLE).map_err(IndexError::backend)?;
                for (key, value) in entries {
                    table
                        .insert(key.as_str(), value.as_slice())
                        .map_err(IndexError::backend)?;
                }
            }
            txn.commit().map_err(IndexError::backend)?;
            Ok(())
        }

        fn scan(
            &self,
            visitor: &mut dyn FnMut(&[u8]) -> Result<(), IndexError>,
        ) -> Result<(), IndexError> {
            let txn = self.db.begin_read().map_err(IndexError::backend)?;
            let table = txn.open_table(VECTOR_TABLE).map_err(IndexError::backend)?;
            for item in table.iter().map_err(IndexError::backend)? {
                let (_, value) = item.map_err(IndexError::backend)?;
                visitor(value.value())?;
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use tempfile::NamedTempFile;

        #[test]
        fn redb_backend_roundtrip() {
            let file = NamedTempFile::new().expect("temp file");
            let backend = RedbBackend::open(file.path()).expect("open redb");

            backend.put("page-1", b"payload-1").expect("put");
            assert_eq!(
                backend.get("page-1").expect("get"),
                Some(b"payload-1".to_vec())
            );
            assert_eq!(backend.get("missing").expect("get"), None);
        }

        #[test]
        fn redb_backend_batch_and_scan() {
            let file = NamedTempFile::new().expect("temp file");
            let backend = RedbBackend::open(file.path()).expect("open redb");

            let entries = vec![
                ("page-1".to_string(), b"a".to_vec()),
                ("page-2".to_string(), b"b".to_vec()),
                ("page-3".to_string(), b"c".to_vec()),
            ];
            backend.batch_put(entries).expect("batch put");

            let mut seen = Vec::new();
            backend
                .scan(&mut |value| {
                    seen.push(value.to_vec());
                    Ok(())
                })
                .expect("scan");
            assert_eq!(seen.len(), 3);
            assert!(seen.contains(&b"b".to_vec()));
        }

        #[test]
        fn redb_backend_delete() {
            let file = NamedTempFile::new().expect("temp file");
            let backend = RedbBackend::open(file.path()).expect("open redb");

            backend.put("page-1", b"payload").expect("put");
            backend.delete("page-1").expect("delete");
            assert_eq!(backend.get("page-1").expect("get"), None);
        }
    }
}

#[cfg(feature = "backend-redb")]
pub use redb_backend::RedbBackend;
