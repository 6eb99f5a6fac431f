//! Page-level layout feature extraction.
//!
//! Turns a sanitized node list plus its viewport into sixteen `[0,1]`
//! features describing how a page is composed: typographic hierarchy,
//! spacing and density, shape and composition, color expression, grid
//! alignment, vertical rhythm, size spread and above-the-fold weight.
//!
//! ## Structure
//!
//! [`extract_layout`] orchestrates a single pass over the nodes to gather
//! the raw measures, then delegates each feature to a pure function in
//! [`features`]. Normalization anchors live together in [`Calibration`]
//! so recalibrating against a larger corpus never touches extraction
//! logic.
//!
//! ## Degenerate input
//!
//! A page with fewer than two valid elements produces
//! [`LayoutFeatures::neutral`] rather than an error. Downstream vector
//! assembly treats that as an all-zero layout contribution.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use sfp_ingest::{StyleNode, Viewport};
use sfp_math::{
    BBox, Point, parse_border_width, parse_box_shadow, parse_font_weight, parse_px, parse_px_list,
};
use sfp_tokens::collect_color_samples;
use thiserror::Error;
use tracing::{info, info_span};

pub mod features;

pub use features::*;

/// Supported layout config version.
pub const LAYOUT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("unsupported layout config version: {found}")]
    UnsupportedVersion { found: u32 },
    #[error("invalid layout config: {0}")]
    InvalidConfig(String),
    #[error("invalid viewport: {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
}

/// Normalization anchors and thresholds for the sixteen features.
///
/// Tuned on a small reference corpus; grouped here so they read as one
/// calibration surface instead of magic numbers scattered through the
/// extraction code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Axis-alignment tolerance for grid detection, pixels.
    pub grid_tolerance: f64,
    /// Minimum elements per cluster to count as an aligned column/row.
    pub grid_min_cluster: usize,
    /// Damping applied when only one axis shows alignment.
    pub grid_single_axis_damping: f64,
    /// Steepness of the rhythm sigmoid.
    pub rhythm_steepness: f64,
    /// Gap-CV value mapping to a 0.5 rhythm score.
    pub rhythm_midpoint: f64,
    /// Corpus 10th percentile of area CV.
    pub area_cv_p10: f64,
    /// Corpus 90th percentile of area CV.
    pub area_cv_p90: f64,
    /// Element-to-viewport area ratio mapping to 0.5 density.
    pub density_midpoint: f64,
    /// Above-fold area ratio mapping to 0.5.
    pub above_fold_midpoint: f64,
    /// Mean sqrt-gap (sqrt-pixels) mapping to 0.5 whitespace.
    pub whitespace_midpoint: f64,
    /// Padding CV mapped linearly onto [0,1] up to this ceiling.
    pub padding_cv_max: f64,
    /// Image/text area ratio mapping to 0.5 balance.
    pub balance_midpoint: f64,
    /// Border-length-to-perimeter ratio mapping to 0.5 heaviness.
    pub border_midpoint: f64,
    /// Area-weighted blur*opacity mapping to full shadow depth.
    pub shadow_depth_max: f64,
    /// Centroid distance joining two elements into one visual group.
    pub grouping_gap: f64,
    /// Inter/intra gap ratio mapping to 0.5 grouping strength.
    pub grouping_midpoint: f64,
    /// `groups / sqrt(elements)` mapping to full complexity.
    pub complexity_max: f64,
    /// Font-size CV mapping to full hierarchy depth.
    pub hierarchy_cv_max: f64,
    /// CSS font-weight scale span.
    pub weight_scale_max: f64,
    /// Area-weighted mean chroma mapping to full saturation energy.
    pub chroma_energy_max: f64,
    /// Mean pairwise deltaE mapping to full role distinction.
    pub distinction_delta_e_max: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            grid_tolerance: 4.0,
            grid_min_cluster: 3,
            grid_single_axis_damping: 0.8,
            rhythm_steepness: 3.5,
            rhythm_midpoint: 1.0,
            area_cv_p10: 0.4,
            area_cv_p90: 2.4,
            density_midpoint: 12.0,
            above_fold_midpoint: 6.0,
            whitespace_midpoint: 3.0,
            padding_cv_max: 2.5,
            balance_midpoint: 1.0,
            border_midpoint: 6.0,
            shadow_depth_max: 6.0,
            grouping_gap: 48.0,
            grouping_midpoint: 1.0,
            complexity_max: 3.0,
            hierarchy_cv_max: 0.6,
            weight_scale_max: 900.0,
            chroma_energy_max: 60.0,
            distinction_delta_e_max: 100.0,
        }
    }
}

impl Calibration {
    fn validate(&self) -> Result<(), LayoutError> {
        let positive = [
            ("rhythm_steepness", self.rhythm_steepness),
            ("rhythm_midpoint", self.rhythm_midpoint),
            ("density_midpoint", self.density_midpoint),
            ("above_fold_midpoint", self.above_fold_midpoint),
            ("whitespace_midpoint", self.whitespace_midpoint),
            ("padding_cv_max", self.padding_cv_max),
            ("balance_midpoint", self.balance_midpoint),
            ("border_midpoint", self.border_midpoint),
            ("shadow_depth_max", self.shadow_depth_max),
            ("grouping_gap", self.grouping_gap),
            ("grouping_midpoint", self.grouping_midpoint),
            ("complexity_max", self.complexity_max),
            ("hierarchy_cv_max", self.hierarchy_cv_max),
            ("weight_scale_max", self.weight_scale_max),
            ("chroma_energy_max", self.chroma_energy_max),
            ("distinction_delta_e_max", self.distinction_delta_e_max),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(LayoutError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        if !(self.grid_tolerance >= 0.0) {
            return Err(LayoutError::InvalidConfig(
                "grid_tolerance must be non-negative".into(),
            ));
        }
        if self.grid_min_cluster < 2 {
            return Err(LayoutError::InvalidConfig(
                "grid_min_cluster must be at least 2".into(),
            ));
        }
        if !(self.grid_single_axis_damping > 0.0 && self.grid_single_axis_damping <= 1.0) {
            return Err(LayoutError::InvalidConfig(
                "grid_single_axis_damping must lie in (0, 1]".into(),
            ));
        }
        if !(self.area_cv_p90 > self.area_cv_p10) || self.area_cv_p10 < 0.0 {
            return Err(LayoutError::InvalidConfig(
                "area CV anchors must satisfy 0 <= p10 < p90".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Run the quadratic whitespace scan on the rayon pool.
    #[serde(default)]
    pub use_parallel: bool,
    /// Palette sampling budget for the color-expression features.
    #[serde(default = "default_color_samples")]
    pub color_samples: usize,
    #[serde(default)]
    pub calibration: Calibration,
}

fn default_version() -> u32 {
    LAYOUT_CONFIG_VERSION
}

fn default_color_samples() -> usize {
    14
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            use_parallel: false,
            color_samples: default_color_samples(),
            calibration: Calibration::default(),
        }
    }
}

impl LayoutConfig {
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.use_parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.version != LAYOUT_CONFIG_VERSION {
            return Err(LayoutError::UnsupportedVersion {
                found: self.version,
            });
        }
        if self.color_samples == 0 {
            return Err(LayoutError::InvalidConfig(
                "color_samples must be positive".into(),
            ));
        }
        self.calibration.validate()
    }
}

/// The sixteen layout features, each in `[0,1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutFeatures {
    pub hierarchy_depth: f64,
    pub weight_contrast: f64,
    pub density_score: f64,
    pub whitespace_ratio: f64,
    pub padding_consistency: f64,
    pub image_text_balance: f64,
    pub border_heaviness: f64,
    pub shadow_depth: f64,
    pub grouping_strength: f64,
    pub compositional_complexity: f64,
    pub saturation_energy: f64,
    pub role_distinction: f64,
    pub grid_regularity: f64,
    pub vertical_rhythm: f64,
    pub scale_variance: f64,
    pub above_fold_density: f64,
}

impl LayoutFeatures {
    /// Defined defaults (all zero) for pages with fewer than two valid
    /// elements.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Field values in declaration order, for bounds checks and assembly.
    pub fn as_array(&self) -> [f64; 16] {
        [
            self.hierarchy_depth,
            self.weight_contrast,
            self.density_score,
            self.whitespace_ratio,
            self.padding_consistency,
            self.image_text_balance,
            self.border_heaviness,
            self.shadow_depth,
            self.grouping_strength,
            self.compositional_complexity,
            self.saturation_energy,
            self.role_distinction,
            self.grid_regularity,
            self.vertical_rhythm,
            self.scale_variance,
            self.above_fold_density,
        ]
    }
}

const IMAGE_TAGS: [&str; 5] = ["img", "picture", "video", "svg", "canvas"];

/// Extract all layout features from a sanitized node list.
pub fn extract_layout(
    nodes: &[StyleNode],
    viewport: &Viewport,
    config: &LayoutConfig,
) -> Result<LayoutFeatures, LayoutError> {
    config.validate()?;
    if !viewport.is_valid() {
        return Err(LayoutError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }

    let span = info_span!("extract_layout", node_count = nodes.len());
    let _guard = span.enter();
    let started = Instant::now();

    let visible: Vec<&StyleNode> = nodes.iter().filter(|n| n.bbox.is_valid()).collect();
    if visible.len() < 2 {
        info!(
            event = "layout_degenerate",
            visible = visible.len(),
            "fewer than two valid elements, returning neutral features"
        );
        return Ok(LayoutFeatures::neutral());
    }

    let cal = &config.calibration;
    let boxes: Vec<BBox> = visible.iter().map(|n| n.bbox).collect();
    let xs: Vec<f64> = boxes.iter().map(|b| b.x).collect();
    let ys: Vec<f64> = boxes.iter().map(|b| b.y).collect();
    let centers: Vec<Point> = boxes.iter().map(BBox::center).collect();
    let areas: Vec<f64> = boxes.iter().map(BBox::area).collect();
    let total_area: f64 = areas.iter().sum();

    let font_sizes: Vec<f64> = visible
        .iter()
        .filter_map(|n| n.styles.font_size.as_deref().and_then(parse_px))
        .filter(|s| *s > 0.0)
        .collect();
    let weights: Vec<u16> = visible
        .iter()
        .filter_map(|n| n.styles.font_weight.as_deref().and_then(parse_font_weight))
        .collect();
    let paddings: Vec<f64> = visible
        .iter()
        .filter_map(|n| n.styles.padding.as_deref())
        .flat_map(parse_px_list)
        .filter(|p| *p > 0.0)
        .collect();

    let image_area: f64 = visible
        .iter()
        .filter(|n| IMAGE_TAGS.contains(&n.tag.as_str()))
        .map(|n| n.bbox.area())
        .sum();
    let text_area: f64 = visible
        .iter()
        .filter(|n| n.text_content.as_deref().is_some_and(|t| !t.trim().is_empty()))
        .map(|n| n.bbox.area())
        .sum();
    let border_length: f64 = visible
        .iter()
        .filter(|n| {
            n.styles
                .border
                .as_deref()
                .and_then(parse_border_width)
                .is_some_and(|w| w > 0.0)
        })
        .map(|n| 2.0 * (n.bbox.w + n.bbox.h))
        .sum();
    let shadows: Vec<(f64, f64, f64)> = visible
        .iter()
        .filter_map(|n| {
            let shadow = n.styles.box_shadow.as_deref().and_then(parse_box_shadow)?;
            Some((n.bbox.area(), shadow.blur, shadow.alpha))
        })
        .collect();

    let samples = collect_color_samples(nodes, config.color_samples);
    let groups = visual_groups(&centers, cal);

    let features = LayoutFeatures {
        hierarchy_depth: hierarchy_depth(&font_sizes, cal),
        weight_contrast: weight_contrast(&weights, cal),
        density_score: density_score(total_area, viewport.area(), cal),
        whitespace_ratio: whitespace_ratio(&boxes, cal, config.use_parallel),
        padding_consistency: padding_consistency(&paddings, cal),
        image_text_balance: image_text_balance(image_area, text_area, cal),
        border_heaviness: border_heaviness(border_length, viewport.perimeter(), cal),
        shadow_depth: shadow_depth(&shadows, cal),
        grouping_strength: grouping_strength(&centers, &groups, cal),
        compositional_complexity: compositional_complexity(groups.len(), centers.len(), cal),
        saturation_energy: saturation_energy(&samples, cal),
        role_distinction: role_distinction(&samples, cal),
        grid_regularity: grid_regularity(&xs, &ys, cal),
        vertical_rhythm: vertical_rhythm(&ys, cal),
        scale_variance: scale_variance(&areas, cal),
        above_fold_density: above_fold_density(&boxes, viewport.height, viewport.area(), cal),
    };

    info!(
        event = "layout_extracted",
        visible = visible.len(),
        groups = groups.len(),
        elapsed_micros = started.elapsed().as_micros() as u64,
        "layout features extracted"
    );
    Ok(features)
}
