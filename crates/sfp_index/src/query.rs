use crate::{IndexError, VectorIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Single ranked hit from a nearest-neighbour query.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Neighbor {
    pub id: String,
    /// Euclidean distance to the query, `>= 0`, `0` for an identical vector.
    pub distance: f64,
    pub metadata: serde_json::Value,
}

/// Euclidean (L2) distance between two equal-length vectors, accumulated in
/// `f64` so 32-bit rounding never reorders near-ties.
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

impl VectorIndex {
    /// Rank every stored record by distance to `vector` and return the `top_k`
    /// closest, ascending.
    ///
    /// The scan is exhaustive, so a distance-0 hit means an identical stored
    /// vector, and recall is exact at any corpus size.
    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != self.cfg.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.cfg.dimension,
                got: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(IndexError::NonFiniteQuery);
        }

        let mut results = Vec::new();
        self.backend.scan(&mut |value| {
            let rec = self.decode_record(value)?;
            // A stored width that disagrees with the config means the file
            // was written by a differently-configured index.
            if rec.vector.len() != vector.len() {
                return Err(IndexError::DimensionMismatch {
                    expected: vector.len(),
                    got: rec.vector.len(),
                });
            }
            results.push(Neighbor {
                distance: euclidean_distance(vector, &rec.vector),
                id: rec.id,
                metadata: rec.metadata,
            });
            Ok(())
        })?;

        // Ascending distance; ties break on id so ordering never depends on
        // backend scan order.
        results.sort_unstable_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(top_k);
        tracing::debug!(event = "index_query", k = top_k, hits = results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendConfig, IndexConfig, IndexRecord, INDEX_SCHEMA_VERSION};
    use serde_json::json;

    fn seed_index(dimension: usize, records: Vec<IndexRecord>) -> VectorIndex {
        let cfg = IndexConfig::new(dimension).with_backend(BackendConfig::in_memory());
        let index = VectorIndex::open(cfg).expect("index init");
        for record in &records {
            index.insert(record).expect("seed record");
        }
        index
    }

    fn vector_record(id: &str, vector: &[f32]) -> IndexRecord {
        IndexRecord {
            schema_version: INDEX_SCHEMA_VERSION,
            id: id.to_string(),
            source_ref: format!("https://example.com/{id}"),
            vector: vector.to_vec(),
            metadata: json!({ "source": id }),
            created_at: "2025-04-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn euclidean_distance_matches_hand_computation() {
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean_distance(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn query_orders_by_ascending_distance() {
        let index = seed_index(
            3,
            vec![
                vector_record("page-c", &[-1.0, 0.0, 0.0]),
                vector_record("page-a", &[1.0, 0.0, 0.0]),
                vector_record("page-b", &[0.9, 0.1, 0.0]),
            ],
        );

        let hits = index.query(&[1.0, 0.0, 0.0], 3).expect("query");
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "page-a");
        assert_eq!(hits[1].id, "page-b");
        assert_eq!(hits[2].id, "page-c");
        assert_eq!(hits[0].distance, 0.0);
        assert!(hits[1].distance > 0.0 && hits[1].distance < hits[2].distance);
        assert_eq!(hits[2].distance, 2.0);
    }

    #[test]
    fn equal_distances_tie_break_on_id() {
        let index = seed_index(
            2,
            vec![
                vector_record("page-b", &[0.5, 0.5]),
                vector_record("page-a", &[0.5, 0.5]),
            ],
        );

        let hits = index.query(&[0.5, 0.5], 2).expect("query");
        assert_eq!(hits[0].id, "page-a");
        assert_eq!(hits[1].id, "page-b");
        assert_eq!(hits[0].distance, hits[1].distance);
    }

    #[test]
    fn query_truncates_to_top_k() {
        let index = seed_index(
            2,
            vec![
                vector_record("page-a", &[1.0, 0.0]),
                vector_record("page-b", &[0.0, 1.0]),
                vector_record("page-c", &[0.5, 0.5]),
            ],
        );

        let hits = index.query(&[1.0, 0.0], 2).expect("query");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "page-a");
    }

    #[test]
    fn zero_top_k_short_circuits() {
        let index = seed_index(2, vec![vector_record("page-a", &[1.0, 0.0])]);
        let hits = index.query(&[1.0, 0.0], 0).expect("query");
        assert!(hits.is_empty());
    }

    #[test]
    fn query_width_is_checked() {
        let index = seed_index(3, vec![vector_record("page-a", &[1.0, 0.0, 0.0])]);
        let err = index.query(&[1.0, 0.0], 5).expect_err("width 2 query");
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn non_finite_query_rejected() {
        let index = seed_index(2, vec![vector_record("page-a", &[1.0, 0.0])]);
        let err = index
            .query(&[f32::INFINITY, 0.0], 1)
            .expect_err("infinite query component");
        assert!(matches!(err, IndexError::NonFiniteQuery));
    }

    #[test]
    fn neighbors_carry_metadata() {
        let index = seed_index(2, vec![vector_record("page-a", &[1.0, 0.0])]);
        let hits = index.query(&[1.0, 0.0], 1).expect("query");
        assert_eq!(hits[0].metadata["source"], "page-a");
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let index = seed_index(2, Vec::new());
        let hits = index.query(&[1.0, 0.0], 5).expect("query");
        assert!(hits.is_empty());
    }
}
