//! Feature vector assembly.
//!
//! Folds design tokens, layout features and per-component measures into
//! fixed-dimension vectors ready for the similarity index.
//!
//! ## Dimension contract
//!
//! Every vector kind has a fixed interpretable dimension and a fixed
//! feature order, declared in [`PAGE_FEATURE_NAMES`] and
//! [`COMPONENT_FEATURE_NAMES`]. The order is part of the public contract:
//! reordering or renaming a dimension invalidates every stored vector, so
//! changes here must bump the index schema.
//!
//! ## Normalization
//!
//! Interpretable values are clamped into `[0,1]` as a final defensive
//! step, then L2-normalized into the `combined` form. A degenerate page
//! produces the all-zero vector rather than an error. Page vectors append
//! a zero-filled reserved block for future visual embeddings; the block
//! is tracked in [`VectorMeta::reserved`], separate from the feature name
//! list, so dead dimensions stay distinguishable from reserved ones.
//!
//! ## Guard posture
//!
//! Token-derived measures pass through guarded normalizers that map
//! non-finite input to zero. Layout features enter the vector raw, so
//! assembly re-checks finiteness and rejects the build with
//! [`VectorError::NonFinite`] instead of persisting a poisoned vector.

use serde::{Deserialize, Serialize};
use sfp_layout::LayoutFeatures;
use sfp_math::{
    Lch, clamp01, coefficient_of_variation, lch_from_hex, mean, median, normalize_linear,
    normalize_log,
};
use sfp_tokens::{ColorSample, ComponentTokens, DesignTokens, ShadowToken};
use thiserror::Error;

/// Supported vector config version.
pub const VECTOR_CONFIG_VERSION: u32 = 1;

/// Interpretable dimensions of a page-style vector.
pub const PAGE_DIMS: usize = 64;
/// Zero-filled dimensions reserved for future visual embeddings.
pub const PAGE_RESERVED_DIMS: usize = 32;
/// Interpretable dimensions of a component vector.
pub const COMPONENT_DIMS: usize = 26;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("unsupported vector config version: {found}")]
    UnsupportedVersion { found: u32 },
    #[error("non-finite value for feature {feature}")]
    NonFinite { feature: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    VECTOR_CONFIG_VERSION
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
        }
    }
}

impl VectorConfig {
    pub fn validate(&self) -> Result<(), VectorError> {
        if self.version != VECTOR_CONFIG_VERSION {
            return Err(VectorError::UnsupportedVersion {
                found: self.version,
            });
        }
        Ok(())
    }
}

/// What a vector describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorKind {
    PageStyle,
    Component,
}

impl VectorKind {
    pub fn interpretable_dimensions(&self) -> usize {
        match self {
            VectorKind::PageStyle => PAGE_DIMS,
            VectorKind::Component => COMPONENT_DIMS,
        }
    }

    pub fn reserved_dimensions(&self) -> usize {
        match self {
            VectorKind::PageStyle => PAGE_RESERVED_DIMS,
            VectorKind::Component => 0,
        }
    }

    /// Stored vector length: interpretable plus reserved dimensions.
    pub fn combined_dimensions(&self) -> usize {
        self.interpretable_dimensions() + self.reserved_dimensions()
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        match self {
            VectorKind::PageStyle => &PAGE_FEATURE_NAMES,
            VectorKind::Component => &COMPONENT_FEATURE_NAMES,
        }
    }

    fn reserved_spans(&self) -> Vec<ReservedSpan> {
        match self {
            VectorKind::PageStyle => vec![ReservedSpan {
                offset: PAGE_DIMS,
                len: PAGE_RESERVED_DIMS,
                label: "visual_embedding".to_string(),
            }],
            VectorKind::Component => Vec::new(),
        }
    }
}

/// A zero-filled block inside `combined`, reserved for future signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedSpan {
    pub offset: usize,
    pub len: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMeta {
    /// One name per interpretable dimension, in vector order.
    pub feature_names: Vec<String>,
    /// Interpretable dimensions with a non-zero value.
    pub non_zero_count: usize,
    /// Reserved blocks in `combined`; never listed in `feature_names`.
    pub reserved: Vec<ReservedSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub kind: VectorKind,
    /// Clamped `[0,1]` feature values, one per named dimension.
    pub interpretable: Vec<f64>,
    /// L2-normalized form plus reserved zeros; what the index stores.
    pub combined: Vec<f32>,
    pub meta: VectorMeta,
}

/// Page-style dimension names, in vector order.
///
/// Appending requires a new index schema; reordering is never allowed.
pub const PAGE_FEATURE_NAMES: [&str; PAGE_DIMS] = [
    // Color tiers and palette statistics.
    "color_foundation_count",
    "color_tinted_count",
    "color_accent_count",
    "color_brand_count",
    "color_palette_size",
    "color_foundation_share",
    "color_chromatic_share",
    "color_lightness_mean",
    "color_lightness_range",
    "color_chroma_mean",
    "color_chroma_max",
    "color_hue_count",
    "color_hue_spread",
    "color_background_lightness",
    "color_neutral_tint_strength",
    "color_brand_chroma_mean",
    "color_accent_chroma_mean",
    "color_polarity",
    // Typography scale.
    "typo_family_count",
    "typo_size_count",
    "typo_size_min",
    "typo_size_max",
    "typo_size_range",
    "typo_size_median",
    "typo_scale_ratio",
    "typo_weight_count",
    "typo_weight_min",
    "typo_weight_max",
    "typo_weight_median",
    "typo_lineheight_mean",
    "typo_lineheight_count",
    "typo_hierarchy_depth",
    "typo_weight_contrast",
    // Spacing system.
    "spacing_step_count",
    "spacing_min_step",
    "spacing_max_step",
    "spacing_median_step",
    "spacing_mean_step",
    "spacing_consistency",
    "spacing_fine_share",
    "spacing_coarse_share",
    "spacing_density_score",
    "spacing_whitespace_ratio",
    "spacing_padding_consistency",
    "spacing_image_text_balance",
    // Shape and composition.
    "shape_radius_cluster_count",
    "shape_radius_min",
    "shape_radius_max",
    "shape_radius_mean",
    "shape_radius_consistency",
    "shape_rounded_share",
    "shape_shadow_cluster_count",
    "shape_shadow_opacity_mean",
    "shape_elevation_signal",
    "shape_border_heaviness",
    "shape_shadow_depth",
    "shape_grouping_strength",
    "shape_compositional_complexity",
    // Page geometry.
    "layout_grid_regularity",
    "layout_vertical_rhythm",
    "layout_scale_variance",
    "layout_above_fold_density",
    // Brand expression.
    "brand_color_saturation_energy",
    "brand_color_role_distinction",
];

/// Component dimension names, in vector order.
pub const COMPONENT_FEATURE_NAMES: [&str; COMPONENT_DIMS] = [
    "comp_bg_lightness",
    "comp_bg_chroma",
    "comp_bg_hue_cos",
    "comp_bg_hue_sin",
    "comp_fg_lightness",
    "comp_fg_chroma",
    "comp_fg_hue_cos",
    "comp_fg_hue_sin",
    "comp_contrast",
    "comp_font_size",
    "comp_font_weight",
    "comp_label_length",
    "comp_label_uppercase",
    "comp_padding_x",
    "comp_padding_y",
    "comp_width",
    "comp_height",
    "comp_aspect_ratio",
    "comp_prominence",
    "comp_radius",
    "comp_pill_shape",
    "comp_border_width",
    "comp_has_border",
    "comp_shadow_blur",
    "comp_shadow_opacity",
    "comp_elevation",
];

/// Fixed normalization anchors for token-derived dimensions.
///
/// Grouped here so recalibration is a constants change, not a logic hunt.
/// Layout features arrive already normalized and bypass these.
pub mod ranges {
    pub const TIER_COUNT_MAX: f64 = 8.0;
    pub const PALETTE_MAX: f64 = 16.0;
    pub const LIGHTNESS_MAX: f64 = 100.0;
    /// Chroma of the most vivid sRGB colors.
    pub const CHROMA_MAX: f64 = 132.0;
    pub const HUE_BUCKET_DEGREES: f64 = 30.0;
    pub const HUE_BUCKETS_MAX: f64 = 12.0;
    /// Tinted neutrals live below the accent chroma threshold.
    pub const TINT_CHROMA_MAX: f64 = 15.0;
    pub const DARK_LIGHTNESS_SPLIT: f64 = 50.0;

    pub const FAMILY_MAX: f64 = 4.0;
    pub const SIZE_COUNT_MAX: f64 = 8.0;
    pub const SIZE_MIN_LO: f64 = 6.0;
    pub const SIZE_MIN_HI: f64 = 24.0;
    pub const SIZE_MAX_LO: f64 = 12.0;
    pub const SIZE_MAX_HI: f64 = 96.0;
    pub const SIZE_SPAN_MAX: f64 = 72.0;
    pub const SIZE_MEDIAN_LO: f64 = 8.0;
    pub const SIZE_MEDIAN_HI: f64 = 32.0;
    /// Typographic scale ratios run from flat (1.0) to dramatic (2.0).
    pub const SCALE_RATIO_LO: f64 = 1.0;
    pub const SCALE_RATIO_HI: f64 = 2.0;
    pub const WEIGHT_COUNT_MAX: f64 = 5.0;
    pub const WEIGHT_MAX: f64 = 900.0;
    pub const LINEHEIGHT_LO: f64 = 12.0;
    pub const LINEHEIGHT_HI: f64 = 48.0;
    pub const LINEHEIGHT_COUNT_MAX: f64 = 6.0;

    pub const STEP_COUNT_MAX: f64 = 6.0;
    pub const STEP_MIN_MAX: f64 = 32.0;
    pub const STEP_MAX_MAX: f64 = 96.0;
    pub const STEP_MID_MAX: f64 = 64.0;
    pub const STEP_CV_MAX: f64 = 1.5;
    pub const FINE_STEP: f64 = 8.0;
    pub const COARSE_STEP: f64 = 32.0;

    pub const RADIUS_COUNT_MAX: f64 = 3.0;
    pub const RADIUS_MIN_MAX: f64 = 24.0;
    pub const RADIUS_MAX_MAX: f64 = 48.0;
    pub const RADIUS_MEAN_MAX: f64 = 32.0;
    pub const RADIUS_CV_MAX: f64 = 1.0;
    pub const ROUNDED_RADIUS: f64 = 4.0;
    pub const SHADOW_COUNT_MAX: f64 = 3.0;
    pub const ELEVATION_MAX: f64 = 6.0;

    /// Hue dims are zeroed below this chroma; grey hue angles are noise.
    pub const HUE_SIGNAL_CHROMA_MIN: f64 = 1.0;
    pub const COMP_FONT_SIZE_LO: f64 = 6.0;
    pub const COMP_FONT_SIZE_HI: f64 = 28.0;
    pub const COMP_CONTRAST_LO: f64 = 1.0;
    pub const COMP_CONTRAST_HI: f64 = 21.0;
    pub const COMP_LABEL_MAX: f64 = 40.0;
    pub const COMP_PADDING_MAX: f64 = 48.0;
    pub const COMP_WIDTH_MAX: f64 = 640.0;
    pub const COMP_HEIGHT_MAX: f64 = 160.0;
    pub const COMP_ASPECT_MAX: f64 = 8.0;
    /// Viewport share (percent) mapping to 0.5 prominence.
    pub const COMP_PROMINENCE_MIDPOINT: f64 = 1.0;
    pub const COMP_RADIUS_MAX: f64 = 32.0;
    pub const COMP_BORDER_MAX: f64 = 4.0;
    pub const COMP_SHADOW_BLUR_MAX: f64 = 24.0;
}

/// Assemble the page-style vector from tokens, palette samples and layout
/// features.
pub fn build_page(
    tokens: &DesignTokens,
    samples: &[ColorSample],
    layout: &LayoutFeatures,
    config: &VectorConfig,
) -> Result<FeatureVector, VectorError> {
    config.validate()?;

    let tiers = &tokens.colors;
    let foundation = lch_list(&tiers.foundation);
    let tinted = lch_list(&tiers.tinted_neutrals);
    let accent = lch_list(&tiers.accent_colors);
    let brand = lch_list(&tiers.brand_colors);
    let palette: Vec<Lch> = foundation
        .iter()
        .chain(&tinted)
        .chain(&accent)
        .chain(&brand)
        .copied()
        .collect();
    let chromatic: Vec<Lch> = accent.iter().chain(&brand).copied().collect();

    let lightnesses: Vec<f64> = palette.iter().map(|c| c.l).collect();
    let chromas: Vec<f64> = palette.iter().map(|c| c.c).collect();
    let background_lightness = samples
        .first()
        .and_then(|s| lch_from_hex(&s.hex))
        .map(|c| c.l)
        .unwrap_or(0.0);

    let typo = &tokens.typography;
    let weights: Vec<f64> = typo.weights.iter().map(|w| f64::from(*w)).collect();
    let steps = &tokens.spacing;
    let radii = &tokens.shape.radius_clusters;
    let shadows = &tokens.shape.shadow_clusters;
    let opacities: Vec<f64> = shadows.iter().map(|s| s.opacity).collect();

    let values: [f64; PAGE_DIMS] = [
        // Color tiers and palette statistics.
        normalize_linear(tiers.foundation.len() as f64, 0.0, ranges::TIER_COUNT_MAX),
        normalize_linear(tiers.tinted_neutrals.len() as f64, 0.0, ranges::TIER_COUNT_MAX),
        normalize_linear(tiers.accent_colors.len() as f64, 0.0, ranges::TIER_COUNT_MAX),
        normalize_linear(tiers.brand_colors.len() as f64, 0.0, ranges::TIER_COUNT_MAX),
        normalize_linear(palette.len() as f64, 0.0, ranges::PALETTE_MAX),
        share(foundation.len(), palette.len()),
        share(chromatic.len(), palette.len()),
        normalize_linear(mean(&lightnesses), 0.0, ranges::LIGHTNESS_MAX),
        normalize_linear(spread(&lightnesses), 0.0, ranges::LIGHTNESS_MAX),
        normalize_linear(mean(&chromas), 0.0, ranges::CHROMA_MAX),
        normalize_linear(max_of(&chromas), 0.0, ranges::CHROMA_MAX),
        normalize_linear(hue_bucket_count(&chromatic), 0.0, ranges::HUE_BUCKETS_MAX),
        hue_spread(&chromatic),
        normalize_linear(background_lightness, 0.0, ranges::LIGHTNESS_MAX),
        normalize_linear(mean_chroma(&tinted), 0.0, ranges::TINT_CHROMA_MAX),
        normalize_linear(mean_chroma(&brand), 0.0, ranges::CHROMA_MAX),
        normalize_linear(mean_chroma(&accent), 0.0, ranges::CHROMA_MAX),
        dark_area_share(samples),
        // Typography scale.
        normalize_linear(typo.families.len() as f64, 0.0, ranges::FAMILY_MAX),
        normalize_linear(typo.sizes.len() as f64, 0.0, ranges::SIZE_COUNT_MAX),
        normalize_linear(first_of(&typo.sizes), ranges::SIZE_MIN_LO, ranges::SIZE_MIN_HI),
        normalize_linear(last_of(&typo.sizes), ranges::SIZE_MAX_LO, ranges::SIZE_MAX_HI),
        normalize_linear(
            last_of(&typo.sizes) - first_of(&typo.sizes),
            0.0,
            ranges::SIZE_SPAN_MAX,
        ),
        normalize_linear(median(&typo.sizes), ranges::SIZE_MEDIAN_LO, ranges::SIZE_MEDIAN_HI),
        normalize_linear(scale_ratio(&typo.sizes), ranges::SCALE_RATIO_LO, ranges::SCALE_RATIO_HI),
        normalize_linear(weights.len() as f64, 0.0, ranges::WEIGHT_COUNT_MAX),
        normalize_linear(first_of(&weights), 0.0, ranges::WEIGHT_MAX),
        normalize_linear(last_of(&weights), 0.0, ranges::WEIGHT_MAX),
        normalize_linear(median(&weights), 0.0, ranges::WEIGHT_MAX),
        normalize_linear(mean(&typo.line_heights), ranges::LINEHEIGHT_LO, ranges::LINEHEIGHT_HI),
        normalize_linear(typo.line_heights.len() as f64, 0.0, ranges::LINEHEIGHT_COUNT_MAX),
        layout.hierarchy_depth,
        layout.weight_contrast,
        // Spacing system.
        normalize_linear(steps.len() as f64, 0.0, ranges::STEP_COUNT_MAX),
        normalize_linear(first_of(steps), 0.0, ranges::STEP_MIN_MAX),
        normalize_linear(last_of(steps), 0.0, ranges::STEP_MAX_MAX),
        normalize_linear(median(steps), 0.0, ranges::STEP_MID_MAX),
        normalize_linear(mean(steps), 0.0, ranges::STEP_MID_MAX),
        consistency(steps, ranges::STEP_CV_MAX),
        share_matching(steps, |s| s <= ranges::FINE_STEP),
        share_matching(steps, |s| s >= ranges::COARSE_STEP),
        layout.density_score,
        layout.whitespace_ratio,
        layout.padding_consistency,
        layout.image_text_balance,
        // Shape and composition.
        normalize_linear(radii.len() as f64, 0.0, ranges::RADIUS_COUNT_MAX),
        normalize_linear(first_of(radii), 0.0, ranges::RADIUS_MIN_MAX),
        normalize_linear(last_of(radii), 0.0, ranges::RADIUS_MAX_MAX),
        normalize_linear(mean(radii), 0.0, ranges::RADIUS_MEAN_MAX),
        consistency(radii, ranges::RADIUS_CV_MAX),
        share_matching(radii, |r| r >= ranges::ROUNDED_RADIUS),
        normalize_linear(shadows.len() as f64, 0.0, ranges::SHADOW_COUNT_MAX),
        clamp01(mean(&opacities)),
        elevation_signal(shadows),
        layout.border_heaviness,
        layout.shadow_depth,
        layout.grouping_strength,
        layout.compositional_complexity,
        // Page geometry.
        layout.grid_regularity,
        layout.vertical_rhythm,
        layout.scale_variance,
        layout.above_fold_density,
        // Brand expression.
        layout.saturation_energy,
        layout.role_distinction,
    ];
    assemble(VectorKind::PageStyle, &values)
}

/// Assemble a component vector from one element's measures.
pub fn build_component(
    component: &ComponentTokens,
    config: &VectorConfig,
) -> Result<FeatureVector, VectorError> {
    config.validate()?;

    let (bg_l, bg_c, bg_cos, bg_sin) = color_dims(component.background);
    let (fg_l, fg_c, fg_cos, fg_sin) = color_dims(component.foreground);

    let aspect = if component.height > 0.0 {
        component.width / component.height
    } else {
        0.0
    };

    let values: [f64; COMPONENT_DIMS] = [
        bg_l,
        bg_c,
        bg_cos,
        bg_sin,
        fg_l,
        fg_c,
        fg_cos,
        fg_sin,
        normalize_linear(component.contrast, ranges::COMP_CONTRAST_LO, ranges::COMP_CONTRAST_HI),
        normalize_linear(component.font_size, ranges::COMP_FONT_SIZE_LO, ranges::COMP_FONT_SIZE_HI),
        normalize_linear(component.font_weight, 0.0, ranges::WEIGHT_MAX),
        normalize_linear(component.label_chars, 0.0, ranges::COMP_LABEL_MAX),
        clamp01(component.label_uppercase_share),
        normalize_linear(component.padding_x, 0.0, ranges::COMP_PADDING_MAX),
        normalize_linear(component.padding_y, 0.0, ranges::COMP_PADDING_MAX),
        normalize_linear(component.width, 0.0, ranges::COMP_WIDTH_MAX),
        normalize_linear(component.height, 0.0, ranges::COMP_HEIGHT_MAX),
        normalize_linear(aspect, 0.0, ranges::COMP_ASPECT_MAX),
        normalize_log(component.viewport_share * 100.0, ranges::COMP_PROMINENCE_MIDPOINT),
        normalize_linear(component.radius, 0.0, ranges::COMP_RADIUS_MAX),
        if component.pill_shaped { 1.0 } else { 0.0 },
        normalize_linear(component.border_width, 0.0, ranges::COMP_BORDER_MAX),
        if component.border_width > 0.0 { 1.0 } else { 0.0 },
        normalize_linear(component.shadow_blur, 0.0, ranges::COMP_SHADOW_BLUR_MAX),
        clamp01(component.shadow_alpha),
        normalize_linear(
            component.shadow_blur * component.shadow_alpha,
            0.0,
            ranges::ELEVATION_MAX,
        ),
    ];
    assemble(VectorKind::Component, &values)
}

fn assemble(kind: VectorKind, values: &[f64]) -> Result<FeatureVector, VectorError> {
    let names = kind.feature_names();
    for (value, name) in values.iter().zip(names) {
        if !value.is_finite() {
            return Err(VectorError::NonFinite {
                feature: (*name).to_string(),
            });
        }
    }

    let interpretable: Vec<f64> = values.iter().map(|v| clamp01(*v)).collect();
    let norm = interpretable.iter().map(|v| v * v).sum::<f64>().sqrt();
    let mut combined: Vec<f32> = Vec::with_capacity(kind.combined_dimensions());
    if norm > 0.0 {
        combined.extend(interpretable.iter().map(|v| (v / norm) as f32));
    } else {
        combined.extend(std::iter::repeat(0.0f32).take(interpretable.len()));
    }
    combined.extend(std::iter::repeat(0.0f32).take(kind.reserved_dimensions()));

    let non_zero_count = interpretable.iter().filter(|v| **v != 0.0).count();
    tracing::debug!(
        kind = ?kind,
        non_zero = non_zero_count,
        norm,
        "assembled feature vector"
    );
    Ok(FeatureVector {
        kind,
        meta: VectorMeta {
            feature_names: names.iter().map(|n| (*n).to_string()).collect(),
            non_zero_count,
            reserved: kind.reserved_spans(),
        },
        interpretable,
        combined,
    })
}

fn lch_list(hexes: &[String]) -> Vec<Lch> {
    hexes.iter().filter_map(|h| lch_from_hex(h)).collect()
}

fn mean_chroma(colors: &[Lch]) -> f64 {
    let chromas: Vec<f64> = colors.iter().map(|c| c.c).collect();
    mean(&chromas)
}

fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64
}

fn share_matching(values: &[f64], pred: impl Fn(f64) -> bool) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|v| pred(**v)).count() as f64 / values.len() as f64
}

fn first_of(values: &[f64]) -> f64 {
    values.first().copied().unwrap_or(0.0)
}

fn last_of(values: &[f64]) -> f64 {
    values.last().copied().unwrap_or(0.0)
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

fn spread(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    max - min
}

/// Mean ratio between consecutive sorted font sizes.
fn scale_ratio(sorted_sizes: &[f64]) -> f64 {
    if sorted_sizes.len() < 2 {
        return 0.0;
    }
    let ratios: Vec<f64> = sorted_sizes
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0])
        .collect();
    mean(&ratios)
}

fn consistency(values: &[f64], cv_max: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    1.0 - normalize_linear(coefficient_of_variation(values), 0.0, cv_max)
}

/// Distinct 30-degree hue buckets among chromatic palette colors.
fn hue_bucket_count(chromatic: &[Lch]) -> f64 {
    let mut buckets: Vec<u8> = chromatic
        .iter()
        .map(|c| ((c.h / ranges::HUE_BUCKET_DEGREES) as u8).min(ranges::HUE_BUCKETS_MAX as u8 - 1))
        .collect();
    buckets.sort_unstable();
    buckets.dedup();
    buckets.len() as f64
}

/// Largest pairwise circular hue distance, against the 180 degree maximum.
fn hue_spread(chromatic: &[Lch]) -> f64 {
    if chromatic.len() < 2 {
        return 0.0;
    }
    let mut max_dist = 0.0f64;
    for i in 0..chromatic.len() {
        for j in (i + 1)..chromatic.len() {
            let raw = (chromatic[i].h - chromatic[j].h).abs();
            let circular = raw.min(360.0 - raw);
            max_dist = max_dist.max(circular);
        }
    }
    clamp01(max_dist / 180.0)
}

/// Area-weighted share of the palette darker than the lightness split.
fn dark_area_share(samples: &[ColorSample]) -> f64 {
    let mut dark = 0.0;
    let mut total = 0.0;
    for sample in samples {
        let Some(color) = lch_from_hex(&sample.hex) else {
            continue;
        };
        total += sample.area;
        if color.l < ranges::DARK_LIGHTNESS_SPLIT {
            dark += sample.area;
        }
    }
    if total > 0.0 {
        dark / total
    } else {
        0.0
    }
}

fn elevation_signal(shadows: &[ShadowToken]) -> f64 {
    let max = shadows
        .iter()
        .map(|s| s.blur * s.opacity)
        .fold(0.0, f64::max);
    normalize_linear(max, 0.0, ranges::ELEVATION_MAX)
}

fn color_dims(color: Option<Lch>) -> (f64, f64, f64, f64) {
    let Some(c) = color else {
        return (0.0, 0.0, 0.0, 0.0);
    };
    let l = normalize_linear(c.l, 0.0, ranges::LIGHTNESS_MAX);
    let chroma = normalize_linear(c.c, 0.0, ranges::CHROMA_MAX);
    if c.c < ranges::HUE_SIGNAL_CHROMA_MIN {
        return (l, chroma, 0.0, 0.0);
    }
    let rad = c.h.to_radians();
    (l, chroma, (rad.cos() + 1.0) / 2.0, (rad.sin() + 1.0) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfp_tokens::{ColorTiers, ShadowToken, TypographyTokens};

    fn sample_tokens() -> DesignTokens {
        DesignTokens {
            colors: ColorTiers {
                foundation: vec!["#ffffff".to_string(), "#111111".to_string()],
                tinted_neutrals: vec!["#e8e0d5".to_string()],
                accent_colors: vec!["#b08968".to_string()],
                brand_colors: vec!["#e94560".to_string(), "#2962ff".to_string()],
            },
            typography: TypographyTokens {
                families: vec!["georgia".to_string(), "inter".to_string()],
                sizes: vec![14.0, 16.0, 24.0, 40.0],
                weights: vec![400, 600, 700],
                line_heights: vec![20.0, 24.0, 48.0],
            },
            spacing: vec![8.0, 16.0, 24.0, 32.0, 48.0],
            shape: sfp_tokens::ShapeTokens {
                radius_clusters: vec![4.0, 8.0, 24.0],
                shadow_clusters: vec![
                    ShadowToken {
                        blur: 3.0,
                        opacity: 0.1,
                    },
                    ShadowToken {
                        blur: 16.0,
                        opacity: 0.25,
                    },
                ],
            },
        }
    }

    fn sample_palette() -> Vec<ColorSample> {
        vec![
            ColorSample {
                hex: "#ffffff".to_string(),
                area: 800_000.0,
            },
            ColorSample {
                hex: "#111111".to_string(),
                area: 120_000.0,
            },
            ColorSample {
                hex: "#e94560".to_string(),
                area: 40_000.0,
            },
        ]
    }

    fn sample_layout() -> LayoutFeatures {
        LayoutFeatures {
            hierarchy_depth: 0.52,
            weight_contrast: 0.33,
            density_score: 0.2,
            whitespace_ratio: 0.51,
            padding_consistency: 0.9,
            image_text_balance: 0.4,
            border_heaviness: 0.3,
            shadow_depth: 0.25,
            grouping_strength: 0.7,
            compositional_complexity: 0.27,
            saturation_energy: 0.45,
            role_distinction: 0.6,
            grid_regularity: 0.95,
            vertical_rhythm: 0.8,
            scale_variance: 0.5,
            above_fold_density: 0.35,
        }
    }

    #[test]
    fn page_vector_arity_and_names_are_fixed() {
        let vector = build_page(
            &sample_tokens(),
            &sample_palette(),
            &sample_layout(),
            &VectorConfig::default(),
        )
        .expect("build");
        assert_eq!(vector.kind, VectorKind::PageStyle);
        assert_eq!(vector.interpretable.len(), PAGE_DIMS);
        assert_eq!(vector.combined.len(), PAGE_DIMS + PAGE_RESERVED_DIMS);
        assert_eq!(vector.meta.feature_names.len(), PAGE_DIMS);
        assert_eq!(vector.meta.feature_names[0], "color_foundation_count");
        assert_eq!(vector.meta.feature_names[PAGE_DIMS - 1], "brand_color_role_distinction");
        // Reserved block is tracked separately from feature names.
        assert_eq!(vector.meta.reserved.len(), 1);
        assert_eq!(vector.meta.reserved[0].offset, PAGE_DIMS);
        assert_eq!(vector.meta.reserved[0].len, PAGE_RESERVED_DIMS);
        assert!(vector.combined[PAGE_DIMS..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn page_feature_names_are_unique() {
        let mut names: Vec<&str> = PAGE_FEATURE_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PAGE_DIMS);
    }

    #[test]
    fn interpretable_values_stay_bounded() {
        let vector = build_page(
            &sample_tokens(),
            &sample_palette(),
            &sample_layout(),
            &VectorConfig::default(),
        )
        .expect("build");
        for (name, value) in vector.meta.feature_names.iter().zip(&vector.interpretable) {
            assert!(
                (0.0..=1.0).contains(value),
                "{name} out of bounds: {value}"
            );
        }
    }

    #[test]
    fn combined_vector_is_unit_norm() {
        let vector = build_page(
            &sample_tokens(),
            &sample_palette(),
            &sample_layout(),
            &VectorConfig::default(),
        )
        .expect("build");
        let norm: f64 = vector.combined.iter().map(|v| f64::from(*v).powi(2)).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6, "norm {norm}");
    }

    #[test]
    fn degenerate_page_maps_to_zero_vector() {
        let vector = build_page(
            &DesignTokens::default(),
            &[],
            &LayoutFeatures::neutral(),
            &VectorConfig::default(),
        )
        .expect("build");
        assert_eq!(vector.meta.non_zero_count, 0);
        assert!(vector.interpretable.iter().all(|v| *v == 0.0));
        assert!(vector.combined.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn build_is_deterministic() {
        let a = build_page(
            &sample_tokens(),
            &sample_palette(),
            &sample_layout(),
            &VectorConfig::default(),
        )
        .expect("first");
        let b = build_page(
            &sample_tokens(),
            &sample_palette(),
            &sample_layout(),
            &VectorConfig::default(),
        )
        .expect("second");
        assert_eq!(a.interpretable, b.interpretable);
        for (x, y) in a.combined.iter().zip(&b.combined) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn non_finite_layout_feature_is_rejected() {
        let mut layout = sample_layout();
        layout.grid_regularity = f64::NAN;
        let err = build_page(
            &sample_tokens(),
            &sample_palette(),
            &layout,
            &VectorConfig::default(),
        )
        .expect_err("must reject NaN");
        match err {
            VectorError::NonFinite { feature } => {
                assert_eq!(feature, "layout_grid_regularity");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn component_vector_shape() {
        let component = ComponentTokens {
            background: lch_from_hex("#0066ff"),
            foreground: lch_from_hex("#ffffff"),
            contrast: 4.3,
            font_size: 16.0,
            font_weight: 600.0,
            label_chars: 11.0,
            label_uppercase_share: 1.0,
            padding_x: 24.0,
            padding_y: 12.0,
            width: 160.0,
            height: 48.0,
            viewport_share: 0.006,
            radius: 24.0,
            pill_shaped: true,
            border_width: 0.0,
            shadow_blur: 8.0,
            shadow_alpha: 0.25,
        };
        let vector = build_component(&component, &VectorConfig::default()).expect("build");
        assert_eq!(vector.kind, VectorKind::Component);
        assert_eq!(vector.interpretable.len(), COMPONENT_DIMS);
        assert_eq!(vector.combined.len(), COMPONENT_DIMS);
        assert!(vector.meta.reserved.is_empty());

        let norm: f64 = vector.combined.iter().map(|v| f64::from(*v).powi(2)).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);

        let pill_index = COMPONENT_FEATURE_NAMES
            .iter()
            .position(|n| *n == "comp_pill_shape")
            .expect("name");
        assert_eq!(vector.interpretable[pill_index], 1.0);
        let border_index = COMPONENT_FEATURE_NAMES
            .iter()
            .position(|n| *n == "comp_has_border")
            .expect("name");
        assert_eq!(vector.interpretable[border_index], 0.0);
    }

    #[test]
    fn achromatic_colors_carry_no_hue_signal() {
        let grey = ComponentTokens {
            background: lch_from_hex("#808080"),
            foreground: None,
            contrast: 1.0,
            font_size: 0.0,
            font_weight: 0.0,
            label_chars: 0.0,
            label_uppercase_share: 0.0,
            padding_x: 0.0,
            padding_y: 0.0,
            width: 100.0,
            height: 100.0,
            viewport_share: 0.01,
            radius: 0.0,
            pill_shaped: false,
            border_width: 0.0,
            shadow_blur: 0.0,
            shadow_alpha: 0.0,
        };
        let vector = build_component(&grey, &VectorConfig::default()).expect("build");
        let cos_index = COMPONENT_FEATURE_NAMES
            .iter()
            .position(|n| *n == "comp_bg_hue_cos")
            .expect("name");
        let sin_index = COMPONENT_FEATURE_NAMES
            .iter()
            .position(|n| *n == "comp_bg_hue_sin")
            .expect("name");
        assert_eq!(vector.interpretable[cos_index], 0.0);
        assert_eq!(vector.interpretable[sin_index], 0.0);
    }

    #[test]
    fn stale_config_version_is_rejected() {
        let config = VectorConfig { version: 3 };
        assert!(matches!(
            build_page(
                &DesignTokens::default(),
                &[],
                &LayoutFeatures::neutral(),
                &config
            ),
            Err(VectorError::UnsupportedVersion { found: 3 })
        ));
    }
}
