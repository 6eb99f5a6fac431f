//! Individual layout feature computations.
//!
//! Every function is pure and returns a value in `[0,1]` for any finite
//! input. Zero-guards live in the `sfp_math` primitives; these functions
//! only decide which guarded primitive applies and with which anchors.

use rayon::prelude::*;
use sfp_math::{
    clamp01, cluster_points, cluster_values, coefficient_of_variation, delta_e, lch_from_hex,
    mean, normalize_linear, normalize_log, normalize_percentile, sigmoid, BBox, Point,
};
use sfp_tokens::ColorSample;

use crate::Calibration;

/// Fraction of elements sitting in aligned columns and rows.
///
/// Each axis is clustered independently with a small tolerance. A cluster
/// only counts as an aligned column or row once it holds
/// `grid_min_cluster` elements, so two accidentally aligned boxes do not
/// register as a grid. When exactly one axis shows alignment the score is
/// damped: a single-column flow is not a grid.
pub fn grid_regularity(xs: &[f64], ys: &[f64], cal: &Calibration) -> f64 {
    if xs.is_empty() || xs.len() != ys.len() {
        return 0.0;
    }
    let aligned_x = aligned_fraction(xs, cal);
    let aligned_y = aligned_fraction(ys, cal);
    let score = (aligned_x + aligned_y) / 2.0;
    if (aligned_x == 0.0) != (aligned_y == 0.0) {
        return clamp01(score * cal.grid_single_axis_damping);
    }
    clamp01(score)
}

fn aligned_fraction(coords: &[f64], cal: &Calibration) -> f64 {
    let aligned: usize = cluster_values(coords, cal.grid_tolerance)
        .iter()
        .filter(|c| c.len() >= cal.grid_min_cluster)
        .map(Vec::len)
        .sum();
    aligned as f64 / coords.len() as f64
}

/// Consistency of vertical spacing between consecutive elements.
///
/// The CV of sorted top-edge gaps runs through a falling sigmoid instead
/// of a hard clamp: uniform spacing lands above 0.95, chaos approaches a
/// low floor asymptotically, and rank order among messy pages survives.
pub fn vertical_rhythm(ys: &[f64], cal: &Calibration) -> f64 {
    let mut sorted: Vec<f64> = ys.iter().copied().filter(|y| y.is_finite()).collect();
    if sorted.len() < 3 {
        return 0.0;
    }
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let gaps: Vec<f64> = sorted.windows(2).map(|w| w[1] - w[0]).collect();
    sigmoid(
        coefficient_of_variation(&gaps),
        cal.rhythm_steepness,
        cal.rhythm_midpoint,
    )
}

/// Spread of element sizes: CV of bbox areas against corpus anchors.
///
/// Percentile anchors come from a reference corpus, not from the current
/// page, so one page's outliers cannot stretch its own scale.
pub fn scale_variance(areas: &[f64], cal: &Calibration) -> f64 {
    if areas.len() < 2 {
        return 0.0;
    }
    normalize_percentile(
        coefficient_of_variation(areas),
        cal.area_cv_p10,
        cal.area_cv_p90,
    )
}

/// Log-normalized ratio of summed element area to viewport area.
///
/// Overlapping containers push the raw ratio well past 1 on deep pages,
/// which is why the midpoint sits high and the mapping is logarithmic.
pub fn density_score(total_element_area: f64, viewport_area: f64, cal: &Calibration) -> f64 {
    if !(viewport_area > 0.0) {
        return 0.0;
    }
    normalize_log(total_element_area / viewport_area, cal.density_midpoint)
}

/// Share of element area above the fold line, log-normalized.
pub fn above_fold_density(boxes: &[BBox], fold_y: f64, viewport_area: f64, cal: &Calibration) -> f64 {
    if !(viewport_area > 0.0) {
        return 0.0;
    }
    let above: f64 = boxes.iter().map(|b| b.area_above(fold_y)).sum();
    normalize_log(above / viewport_area, cal.above_fold_midpoint)
}

/// Mean square-root gap to each element's nearest neighbor.
///
/// The square root keeps typical web spacing (4..64px) from collapsing
/// into the bottom of the scale the way raw distances or area ratios do.
pub fn whitespace_ratio(boxes: &[BBox], cal: &Calibration, parallel: bool) -> f64 {
    if boxes.len() < 2 {
        return 0.0;
    }
    // Per-index computation is order-independent, so the parallel path is
    // bitwise identical to the serial one.
    let sqrt_gaps: Vec<f64> = if parallel {
        (0..boxes.len())
            .into_par_iter()
            .map(|i| nearest_gap(boxes, i).sqrt())
            .collect()
    } else {
        (0..boxes.len()).map(|i| nearest_gap(boxes, i).sqrt()).collect()
    };
    normalize_log(mean(&sqrt_gaps), cal.whitespace_midpoint)
}

fn nearest_gap(boxes: &[BBox], i: usize) -> f64 {
    let mut best = f64::INFINITY;
    for (j, other) in boxes.iter().enumerate() {
        if i != j {
            best = best.min(boxes[i].gap_to(other));
        }
    }
    if best.is_finite() {
        best
    } else {
        0.0
    }
}

/// `1 - CV(padding values)` against the calibrated ceiling.
///
/// Pages without padded elements read as zero signal rather than perfect
/// consistency.
pub fn padding_consistency(paddings: &[f64], cal: &Calibration) -> f64 {
    if paddings.len() < 2 {
        return 0.0;
    }
    1.0 - normalize_linear(
        coefficient_of_variation(paddings),
        0.0,
        cal.padding_cv_max,
    )
}

/// Log-normalized ratio of image area to text area.
///
/// Text-only pages score 0, image-only pages score 1, an even split
/// scores 0.5.
pub fn image_text_balance(image_area: f64, text_area: f64, cal: &Calibration) -> f64 {
    if !(image_area > 0.0) {
        return 0.0;
    }
    if !(text_area > 0.0) {
        return 1.0;
    }
    normalize_log(image_area / text_area, cal.balance_midpoint)
}

/// Total bordered-element edge length against the viewport perimeter.
pub fn border_heaviness(border_length: f64, viewport_perimeter: f64, cal: &Calibration) -> f64 {
    if !(viewport_perimeter > 0.0) {
        return 0.0;
    }
    normalize_log(border_length / viewport_perimeter, cal.border_midpoint)
}

/// Area-weighted mean of blur times opacity across shadowed elements.
pub fn shadow_depth(shadows: &[(f64, f64, f64)], cal: &Calibration) -> f64 {
    let total_area: f64 = shadows.iter().map(|(area, _, _)| area).sum();
    if !(total_area > 0.0) {
        return 0.0;
    }
    let weighted = shadows
        .iter()
        .map(|(area, blur, alpha)| area * blur * alpha)
        .sum::<f64>()
        / total_area;
    normalize_linear(weighted, 0.0, cal.shadow_depth_max)
}

/// Proximity clustering of element centroids into visual groups.
pub fn visual_groups(centers: &[Point], cal: &Calibration) -> Vec<Vec<usize>> {
    cluster_points(centers, cal.grouping_gap)
}

/// Gestalt grouping: inter-group spread against intra-group tightness.
///
/// Pages that do not break into at least two groups carry no grouping
/// signal. All-singleton groupings fall back to the clustering gap as the
/// intra scale so the ratio stays meaningful.
pub fn grouping_strength(centers: &[Point], groups: &[Vec<usize>], cal: &Calibration) -> f64 {
    if groups.len() < 2 {
        return 0.0;
    }
    let centroids: Vec<Point> = groups.iter().map(|g| centroid(centers, g)).collect();
    let inter = mean_pairwise_distance(&centroids);
    let intra = match intra_gap(centers, groups) {
        Some(gap) if gap > 0.0 => gap,
        _ => cal.grouping_gap,
    };
    normalize_log(inter / intra, cal.grouping_midpoint)
}

fn centroid(points: &[Point], indices: &[usize]) -> Point {
    // Clustering never emits empty groups.
    let n = indices.len().max(1) as f64;
    let (sx, sy) = indices
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &i| (sx + points[i].x, sy + points[i].y));
    Point::new(sx / n, sy / n)
}

fn mean_pairwise_distance(points: &[Point]) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            total += points[i].distance_to(&points[j]);
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

fn intra_gap(points: &[Point], groups: &[Vec<usize>]) -> Option<f64> {
    let per_group: Vec<f64> = groups
        .iter()
        .filter(|g| g.len() >= 2)
        .map(|g| {
            let members: Vec<Point> = g.iter().map(|&i| points[i]).collect();
            mean_pairwise_distance(&members)
        })
        .collect();
    if per_group.is_empty() {
        None
    } else {
        Some(mean(&per_group))
    }
}

/// Visual group count against the square root of element count.
pub fn compositional_complexity(group_count: usize, element_count: usize, cal: &Calibration) -> f64 {
    if element_count == 0 {
        return 0.0;
    }
    let ratio = group_count as f64 / (element_count as f64).sqrt();
    normalize_linear(ratio, 0.0, cal.complexity_max)
}

/// CV of the distinct font sizes on the page.
pub fn hierarchy_depth(font_sizes: &[f64], cal: &Calibration) -> f64 {
    let mut distinct: Vec<f64> = Vec::new();
    for &size in font_sizes {
        if size.is_finite() && size > 0.0 && !distinct.iter().any(|d| (d - size).abs() < 0.1) {
            distinct.push(size);
        }
    }
    if distinct.len() < 2 {
        return 0.0;
    }
    normalize_linear(
        coefficient_of_variation(&distinct),
        0.0,
        cal.hierarchy_cv_max,
    )
}

/// Font weight span against the full CSS weight scale.
pub fn weight_contrast(weights: &[u16], cal: &Calibration) -> f64 {
    let (Some(max), Some(min)) = (weights.iter().max(), weights.iter().min()) else {
        return 0.0;
    };
    clamp01((max - min) as f64 / cal.weight_scale_max)
}

/// Area-weighted mean chroma of the sampled palette.
pub fn saturation_energy(samples: &[ColorSample], cal: &Calibration) -> f64 {
    let total_area: f64 = samples.iter().map(|s| s.area).sum();
    if !(total_area > 0.0) {
        return 0.0;
    }
    let weighted = samples
        .iter()
        .filter_map(|s| lch_from_hex(&s.hex).map(|c| s.area * c.c))
        .sum::<f64>()
        / total_area;
    normalize_linear(weighted, 0.0, cal.chroma_energy_max)
}

/// Mean pairwise perceptual distance across the dominant colors.
pub fn role_distinction(samples: &[ColorSample], cal: &Calibration) -> f64 {
    let colors: Vec<_> = samples.iter().filter_map(|s| lch_from_hex(&s.hex)).collect();
    if colors.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut count = 0usize;
    for i in 0..colors.len() {
        for j in (i + 1)..colors.len() {
            total += delta_e(colors[i], colors[j]);
            count += 1;
        }
    }
    normalize_linear(total / count as f64, 0.0, cal.distinction_delta_e_max)
}
