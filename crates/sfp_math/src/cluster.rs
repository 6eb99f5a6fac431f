//! Proximity clustering.
//!
//! Two flavors back two different consumers: 1-D value clustering for
//! spacing-step snapping and axis-alignment detection, and 2-D
//! single-linkage clustering over element centroids for Gestalt grouping.

use crate::geometry::Point;

/// Cluster scalar values: after sorting, consecutive values within
/// `max_gap` of each other share a cluster.
///
/// Non-finite values are discarded. Each returned cluster is non-empty and
/// ascending; clusters themselves are ordered by their first value.
pub fn cluster_values(values: &[f64], max_gap: f64) -> Vec<Vec<f64>> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() || !(max_gap >= 0.0) {
        return Vec::new();
    }
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut clusters: Vec<Vec<f64>> = Vec::new();
    let mut current = vec![sorted[0]];
    for &v in &sorted[1..] {
        let last = *current.last().unwrap_or(&v);
        if v - last <= max_gap {
            current.push(v);
        } else {
            clusters.push(std::mem::replace(&mut current, vec![v]));
        }
    }
    clusters.push(current);
    clusters
}

/// Mean of each cluster produced by [`cluster_values`].
pub fn cluster_centers(clusters: &[Vec<f64>]) -> Vec<f64> {
    clusters.iter().map(|c| crate::stats::mean(c)).collect()
}

/// Single-linkage clustering of points: two points within `max_gap` of
/// each other (Euclidean) belong to the same cluster, transitively.
///
/// Returns index groups into `points`, deterministic in input order:
/// clusters are ordered by their smallest member index and each group is
/// ascending.
pub fn cluster_points(points: &[Point], max_gap: f64) -> Vec<Vec<usize>> {
    let n = points.len();
    if n == 0 || !(max_gap >= 0.0) {
        return Vec::new();
    }

    let mut assigned = vec![false; n];
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for start in 0..n {
        if assigned[start] {
            continue;
        }
        assigned[start] = true;
        let mut group = vec![start];
        let mut frontier = vec![start];
        while let Some(i) = frontier.pop() {
            for j in 0..n {
                if !assigned[j] && points[i].distance_to(&points[j]) <= max_gap {
                    assigned[j] = true;
                    group.push(j);
                    frontier.push(j);
                }
            }
        }
        group.sort_unstable();
        clusters.push(group);
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_split_on_gap() {
        let clusters = cluster_values(&[8.0, 9.0, 24.0, 25.0, 64.0], 4.0);
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0], vec![8.0, 9.0]);
        assert_eq!(clusters[1], vec![24.0, 25.0]);
        assert_eq!(clusters[2], vec![64.0]);
    }

    #[test]
    fn identical_values_form_one_cluster() {
        let clusters = cluster_values(&[100.0, 100.0, 100.0], 4.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let clusters = cluster_values(&[1.0, f64::NAN, 2.0, f64::INFINITY], 4.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0], vec![1.0, 2.0]);
        assert!(cluster_values(&[], 4.0).is_empty());
    }

    #[test]
    fn centers_are_cluster_means() {
        let clusters = cluster_values(&[8.0, 12.0, 40.0], 4.0);
        assert_eq!(cluster_centers(&clusters), vec![10.0, 40.0]);
    }

    #[test]
    fn points_cluster_transitively() {
        // a-b within gap, b-c within gap, d far away: {a, b, c} and {d}.
        let points = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(500.0, 500.0),
        ];
        let clusters = cluster_points(&points, 12.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0], vec![0, 1, 2]);
        assert_eq!(clusters[1], vec![3]);
    }

    #[test]
    fn singleton_points() {
        let points = [Point::new(0.0, 0.0), Point::new(100.0, 100.0)];
        let clusters = cluster_points(&points, 5.0);
        assert_eq!(clusters.len(), 2);
    }
}
