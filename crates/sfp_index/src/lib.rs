//! Persistent storage and exact nearest-neighbour retrieval for style vectors.
//!
//! Records enter as [`IndexRecord`]s (id, source reference, `f32` vector, JSON
//! metadata), get bincode-encoded and optionally zstd-compressed, and land in a
//! pluggable [`IndexBackend`]. Two backends ship: an in-memory map for tests
//! and short-lived sessions, and a `redb` file for durable corpora (the
//! default `backend-redb` feature).
//!
//! Queries are exact: every stored record is scanned, scored by Euclidean
//! distance and ranked ascending with ties broken by id, so results never
//! depend on backend scan order. There is no approximate pre-filter.
//!
//! Two gates guard both the write path and the query path: vector width must
//! match the configured dimension, and every component must be finite.
//! Violations are fatal errors, never silent repairs.

mod backend;
mod query;

// serde_json::Value does not survive bincode's non-self-describing format,
// so metadata travels as raw JSON bytes.
mod metadata_serde {
    use serde::de::Error as DeError;
    use serde::ser::Error as SerError;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub(super) fn serialize<S>(value: &Value, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes = serde_json::to_vec(value).map_err(SerError::custom)?;
        serializer.serialize_bytes(&bytes)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        serde_json::from_slice(&bytes).map_err(DeError::custom)
    }
}

#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use backend::{BackendConfig, InMemoryBackend, IndexBackend};
pub use query::{euclidean_distance, Neighbor};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zstd::{decode_all, encode_all};

/// Bump this value whenever the stored `IndexRecord` layout changes.
pub const INDEX_SCHEMA_VERSION: u16 = 1;

/// Stored unit: one vectorized capture plus its lookup metadata.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IndexRecord {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    /// Stable record id, also the backend key. Re-inserting an id overwrites.
    pub id: String,
    /// Where the capture came from (URL or caller-chosen reference).
    pub source_ref: String,
    /// Combined vector exactly as the builder emitted it.
    pub vector: Vec<f32>,
    #[serde(with = "metadata_serde")]
    pub metadata: serde_json::Value,
    /// RFC 3339 timestamp supplied by the caller.
    pub created_at: String,
}

const fn default_schema_version() -> u16 {
    INDEX_SCHEMA_VERSION
}

/// Compression codec options
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompressionCodec {
    None,
    #[default]
    Zstd,
}

/// Compression behavior configuration
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CompressionConfig {
    #[serde(default)]
    pub codec: CompressionCodec,
    #[serde(default = "default_compression_level")]
    pub level: i32,
}

fn default_compression_level() -> i32 {
    3
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: default_compression_level(),
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(encode_all(data, self.level)?),
        }
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => Ok(decode_all(data)?),
        }
    }
}

/// Config for initializing the index.
///
/// `dimension` fixes the vector width for the index lifetime; every insert and
/// query is checked against it.
#[derive(Clone, Debug)]
pub struct IndexConfig {
    pub dimension: usize,
    pub backend: BackendConfig,
    pub compression: CompressionConfig,
}

impl IndexConfig {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            backend: BackendConfig::default(),
            compression: CompressionConfig::default(),
        }
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_compression(mut self, compression: CompressionConfig) -> Self {
        self.compression = compression;
        self
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.dimension == 0 {
            return Err(IndexError::InvalidConfig(
                "dimension must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Custom error type
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serde(#[from] bincode::Error),
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),
    #[error("invalid index config: {0}")]
    InvalidConfig(String),
    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("vector for `{id}` has a non-finite component")]
    NonFiniteVector { id: String },
    #[error("query vector has a non-finite component")]
    NonFiniteQuery,
    #[error("unsupported index schema version: {found}")]
    UnsupportedSchema { found: u16 },
}

impl IndexError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Index structure
pub struct VectorIndex {
    backend: Box<dyn IndexBackend>,
    cfg: IndexConfig,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Initialize or open an index using the configured backend.
    pub fn open(cfg: IndexConfig) -> Result<Self, IndexError> {
        cfg.validate()?;
        let backend = cfg.backend.build()?;
        Ok(Self { backend, cfg })
    }

    /// Build an index over a caller-supplied backend (e.g. a shared in-memory
    /// store in tests).
    pub fn with_backend(cfg: IndexConfig, backend: Box<dyn IndexBackend>) -> Self {
        Self { backend, cfg }
    }

    /// Vector width this index was opened with.
    pub fn dimension(&self) -> usize {
        self.cfg.dimension
    }

    /// Insert or overwrite a record. The id is the storage key, so inserting
    /// an existing id replaces the previous record.
    pub fn insert(&self, rec: &IndexRecord) -> Result<(), IndexError> {
        self.check_vector(&rec.id, &rec.vector)?;
        let payload = self.encode_record(rec)?;
        self.backend.put(&rec.id, &payload)?;
        tracing::debug!(event = "index_insert", id = %rec.id, dim = rec.vector.len());
        Ok(())
    }

    /// Insert many records in one backend batch.
    pub fn batch_insert(&self, records: &[IndexRecord]) -> Result<(), IndexError> {
        let mut entries = Vec::with_capacity(records.len());
        for rec in records {
            self.check_vector(&rec.id, &rec.vector)?;
            entries.push((rec.id.clone(), self.encode_record(rec)?));
        }
        self.backend.batch_put(entries)?;
        tracing::debug!(event = "index_batch_insert", count = records.len());
        Ok(())
    }

    /// Retrieve a record by id.
    pub fn get(&self, id: &str) -> Result<Option<IndexRecord>, IndexError> {
        if let Some(data) = self.backend.get(id)? {
            let record = self.decode_record(&data)?;
            Ok(Some(record))
        } else {
            Ok(None)
        }
    }

    /// Remove a record from the index.
    pub fn delete(&self, id: &str) -> Result<(), IndexError> {
        self.backend.delete(id)
    }

    /// Flush backend buffers if supported.
    pub fn flush(&self) -> Result<(), IndexError> {
        self.backend.flush()
    }

    fn check_vector(&self, id: &str, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.cfg.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.cfg.dimension,
                got: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(IndexError::NonFiniteVector { id: id.to_string() });
        }
        Ok(())
    }

    pub(crate) fn decode_record(&self, data: &[u8]) -> Result<IndexRecord, IndexError> {
        let decompressed = self.cfg.compression.decompress(data)?;
        let record: IndexRecord = bincode::deserialize(&decompressed)?;
        if record.schema_version != INDEX_SCHEMA_VERSION {
            return Err(IndexError::UnsupportedSchema {
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    fn encode_record(&self, rec: &IndexRecord) -> Result<Vec<u8>, IndexError> {
        let encoded = bincode::serialize(rec)?;
        self.cfg.compression.compress(&encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_config(dimension: usize) -> IndexConfig {
        IndexConfig::new(dimension).with_backend(BackendConfig::in_memory())
    }

    fn record(id: &str, vector: Vec<f32>) -> IndexRecord {
        IndexRecord {
            schema_version: INDEX_SCHEMA_VERSION,
            id: id.to_string(),
            source_ref: format!("https://example.com/{id}"),
            vector,
            metadata: json!({ "source": id }),
            created_at: "2025-04-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn in_memory_roundtrip() {
        let index = VectorIndex::open(memory_config(3)).expect("index init");

        let rec = record("page-a", vec![0.5, 0.5, 0.0]);
        index.insert(&rec).expect("insert succeeds");

        let fetched = index.get("page-a").expect("get ok").expect("record exists");
        assert_eq!(fetched.id, "page-a");
        assert_eq!(fetched.source_ref, rec.source_ref);
        assert_eq!(fetched.vector, rec.vector);
        assert_eq!(fetched.metadata, rec.metadata);
        assert_eq!(fetched.created_at, rec.created_at);
    }

    #[test]
    fn insert_overwrites_same_id() {
        let index = VectorIndex::open(memory_config(2)).expect("index init");

        index
            .insert(&record("page-a", vec![1.0, 0.0]))
            .expect("first insert");
        index
            .insert(&record("page-a", vec![0.0, 1.0]))
            .expect("second insert");

        let fetched = index.get("page-a").expect("get ok").expect("record exists");
        assert_eq!(fetched.vector, vec![0.0, 1.0]);
    }

    #[test]
    fn dimension_mismatch_is_fatal() {
        let index = VectorIndex::open(memory_config(3)).expect("index init");

        let err = index
            .insert(&record("page-a", vec![1.0, 0.0]))
            .expect_err("width 2 against a width-3 index");
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn non_finite_vector_rejected() {
        let index = VectorIndex::open(memory_config(3)).expect("index init");

        let err = index
            .insert(&record("page-a", vec![f32::NAN, 0.0, 0.0]))
            .expect_err("NaN component");
        assert!(matches!(err, IndexError::NonFiniteVector { id } if id == "page-a"));
        assert!(index.get("page-a").expect("get ok").is_none());
    }

    #[test]
    fn batch_insert_stores_all_records() {
        let index = VectorIndex::open(memory_config(2)).expect("index init");

        let records = vec![
            record("page-a", vec![1.0, 0.0]),
            record("page-b", vec![0.0, 1.0]),
            record("page-c", vec![0.5, 0.5]),
        ];
        index.batch_insert(&records).expect("batch insert");

        for rec in &records {
            let fetched = index.get(&rec.id).expect("get ok").expect("record exists");
            assert_eq!(fetched.vector, rec.vector);
        }
    }

    #[test]
    fn uncompressed_codec_roundtrips() {
        let cfg = memory_config(2)
            .with_compression(CompressionConfig::new(CompressionCodec::None, 0));
        let index = VectorIndex::open(cfg).expect("index init");

        index
            .insert(&record("page-a", vec![0.25, 0.75]))
            .expect("insert");
        let fetched = index.get("page-a").expect("get ok").expect("record exists");
        assert_eq!(fetched.vector, vec![0.25, 0.75]);
    }

    #[test]
    fn unknown_schema_version_is_rejected_on_read() {
        let index = VectorIndex::open(memory_config(2)).expect("index init");

        let mut rec = record("page-a", vec![1.0, 0.0]);
        rec.schema_version = 7;
        index.insert(&rec).expect("insert accepts raw record");

        let err = index.get("page-a").expect_err("decode gates version");
        assert!(matches!(err, IndexError::UnsupportedSchema { found: 7 }));
    }

    #[test]
    fn zero_dimension_config_rejected() {
        let err = VectorIndex::open(memory_config(0)).expect_err("invalid config");
        assert!(matches!(err, IndexError::InvalidConfig(_)));
    }

    #[test]
    fn delete_removes_record() {
        let index = VectorIndex::open(memory_config(2)).expect("index init");

        index
            .insert(&record("page-a", vec![1.0, 0.0]))
            .expect("insert");
        index.delete("page-a").expect("delete");
        assert!(index.get("page-a").expect("get ok").is_none());
    }

    #[cfg(feature = "backend-redb")]
    #[test]
    fn redb_index_survives_reopen() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let path = file.path().to_string_lossy().to_string();

        let cfg = IndexConfig::new(2).with_backend(BackendConfig::redb(path.clone()));
        let index = VectorIndex::open(cfg.clone()).expect("index init");
        index
            .insert(&record("page-a", vec![0.5, 0.5]))
            .expect("insert");
        index.flush().expect("flush");
        drop(index);

        let reopened = VectorIndex::open(cfg).expect("reopen");
        let fetched = reopened
            .get("page-a")
            .expect("get ok")
            .expect("record persisted");
        assert_eq!(fetched.vector, vec![0.5, 0.5]);
    }
}
