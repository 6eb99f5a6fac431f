//! Design-token aggregation.
//!
//! Reduces a sanitized node list into the compact, canonical token set the
//! vector builder consumes. The output is intentionally small and fully
//! ordered so that the same page always serializes to the same bytes.
//!
//! ## What gets extracted
//!
//! - **Colors** — distinct canonical hex values weighted by covered area,
//!   partitioned into perceptual tiers (foundation / tinted neutrals /
//!   accents / brand) by chroma and lightness thresholds. Tier membership
//!   is decided purely by the thresholds; tier lists are never truncated
//!   to a fixed count. See [`color`].
//! - **Typography** — deduplicated primary font families plus the distinct
//!   sizes, weights and resolved line-heights, each sorted ascending.
//! - **Spacing** — margin and padding lengths snapped to the spacing grid
//!   (8px by default), ranked by frequency, capped at six steps, emitted
//!   ascending.
//! - **Shape** — border-radius clusters and box-shadow clusters (at most
//!   three each), formed by proximity clustering rather than exact value
//!   matching so `7px` and `8px` corners read as one token.
//!
//! ## Determinism
//!
//! Every list in [`DesignTokens`] has a defined order, which makes the
//! SHA-256 [`digest`] a stable fingerprint of the page's style system:
//! two captures with identical tokens hash identically.

use serde::{Deserialize, Serialize};
use sfp_ingest::StyleNode;
use sfp_math::{cluster_values, parse_font_weight, parse_line_height, parse_px, parse_px_list};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub mod color;
pub mod component;

pub use color::{classify_tiers, collect_color_samples, ColorSample, ColorTiers};
pub use component::{extract_component, ComponentTokens};

/// Supported token config version.
pub const TOKEN_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("unsupported token config version: {found}")]
    UnsupportedVersion { found: u32 },
    #[error("invalid token config: {0}")]
    InvalidConfig(String),
    #[error("token serialization failed: {0}")]
    Serialization(String),
}

/// Classification thresholds and aggregation budgets.
///
/// The tier thresholds were tuned on a small reference corpus; they are
/// configuration rather than constants so a larger corpus can recalibrate
/// them without touching the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Sampling budget: how many dominant colors (by area) are classified.
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    /// Chroma below this (or extreme lightness) reads as foundation.
    #[serde(default = "default_chroma_neutral_max")]
    pub chroma_neutral_max: f64,
    /// Lightness below this reads as foundation (near-black).
    #[serde(default = "default_lightness_floor")]
    pub lightness_floor: f64,
    /// Lightness above this reads as foundation (near-white).
    #[serde(default = "default_lightness_ceiling")]
    pub lightness_ceiling: f64,
    /// Chroma above this reads as accent.
    #[serde(default = "default_chroma_accent_min")]
    pub chroma_accent_min: f64,
    /// Chroma above this reads as brand.
    #[serde(default = "default_chroma_brand_min")]
    pub chroma_brand_min: f64,
    /// Spacing snap grid in pixels.
    #[serde(default = "default_spacing_grid")]
    pub spacing_grid: f64,
    /// Maximum spacing steps kept (most frequent win).
    #[serde(default = "default_max_spacing_steps")]
    pub max_spacing_steps: usize,
    /// Maximum radius/shadow clusters kept (largest win).
    #[serde(default = "default_max_shape_clusters")]
    pub max_shape_clusters: usize,
    /// Proximity gap for radius clustering, pixels.
    #[serde(default = "default_radius_cluster_gap")]
    pub radius_cluster_gap: f64,
    /// Proximity gap for shadow-blur clustering, pixels.
    #[serde(default = "default_shadow_cluster_gap")]
    pub shadow_cluster_gap: f64,
}

fn default_version() -> u32 {
    TOKEN_CONFIG_VERSION
}

fn default_max_samples() -> usize {
    14
}

fn default_chroma_neutral_max() -> f64 {
    5.0
}

fn default_lightness_floor() -> f64 {
    5.0
}

fn default_lightness_ceiling() -> f64 {
    95.0
}

fn default_chroma_accent_min() -> f64 {
    15.0
}

fn default_chroma_brand_min() -> f64 {
    40.0
}

fn default_spacing_grid() -> f64 {
    8.0
}

fn default_max_spacing_steps() -> usize {
    6
}

fn default_max_shape_clusters() -> usize {
    3
}

fn default_radius_cluster_gap() -> f64 {
    4.0
}

fn default_shadow_cluster_gap() -> f64 {
    4.0
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            max_samples: default_max_samples(),
            chroma_neutral_max: default_chroma_neutral_max(),
            lightness_floor: default_lightness_floor(),
            lightness_ceiling: default_lightness_ceiling(),
            chroma_accent_min: default_chroma_accent_min(),
            chroma_brand_min: default_chroma_brand_min(),
            spacing_grid: default_spacing_grid(),
            max_spacing_steps: default_max_spacing_steps(),
            max_shape_clusters: default_max_shape_clusters(),
            radius_cluster_gap: default_radius_cluster_gap(),
            shadow_cluster_gap: default_shadow_cluster_gap(),
        }
    }
}

impl TokenConfig {
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn validate(&self) -> Result<(), TokenError> {
        if self.version != TOKEN_CONFIG_VERSION {
            return Err(TokenError::UnsupportedVersion {
                found: self.version,
            });
        }
        if self.max_samples == 0 {
            return Err(TokenError::InvalidConfig("max_samples must be positive".into()));
        }
        if !(self.chroma_neutral_max < self.chroma_accent_min
            && self.chroma_accent_min < self.chroma_brand_min)
        {
            return Err(TokenError::InvalidConfig(
                "chroma thresholds must be ordered neutral < accent < brand".into(),
            ));
        }
        if !(self.lightness_floor < self.lightness_ceiling) {
            return Err(TokenError::InvalidConfig(
                "lightness floor must lie below the ceiling".into(),
            ));
        }
        if !(self.spacing_grid > 0.0) {
            return Err(TokenError::InvalidConfig("spacing_grid must be positive".into()));
        }
        if self.max_spacing_steps == 0 || self.max_shape_clusters == 0 {
            return Err(TokenError::InvalidConfig(
                "spacing and shape budgets must be positive".into(),
            ));
        }
        if !(self.radius_cluster_gap >= 0.0) || !(self.shadow_cluster_gap >= 0.0) {
            return Err(TokenError::InvalidConfig("cluster gaps must be non-negative".into()));
        }
        Ok(())
    }
}

/// Distinct typography values observed on the page, each sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypographyTokens {
    pub families: Vec<String>,
    pub sizes: Vec<f64>,
    pub weights: Vec<u16>,
    pub line_heights: Vec<f64>,
}

/// One box-shadow cluster: representative blur radius and mean opacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowToken {
    pub blur: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeTokens {
    /// Representative corner radii, ascending, at most three.
    pub radius_clusters: Vec<f64>,
    /// Shadow clusters ordered by blur, at most three.
    pub shadow_clusters: Vec<ShadowToken>,
}

/// The complete token set for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignTokens {
    pub colors: ColorTiers,
    pub typography: TypographyTokens,
    pub spacing: Vec<f64>,
    pub shape: ShapeTokens,
}

/// Aggregate the full token set from a sanitized node list.
///
/// Degenerate input (no nodes, or nodes without parsable styles) yields
/// empty token lists, not an error.
pub fn aggregate(nodes: &[StyleNode], config: &TokenConfig) -> Result<DesignTokens, TokenError> {
    config.validate()?;
    let samples = collect_color_samples(nodes, config.max_samples);
    Ok(DesignTokens {
        colors: classify_tiers(&samples, config),
        typography: typography_tokens(nodes),
        spacing: spacing_steps(nodes, config),
        shape: shape_tokens(nodes, config),
    })
}

/// SHA-256 over the canonical JSON serialization of the token set.
pub fn digest(tokens: &DesignTokens) -> Result<String, TokenError> {
    let encoded =
        serde_json::to_vec(tokens).map_err(|e| TokenError::Serialization(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    Ok(hex::encode(hasher.finalize()))
}

fn typography_tokens(nodes: &[StyleNode]) -> TypographyTokens {
    let mut families: Vec<String> = Vec::new();
    let mut sizes: Vec<f64> = Vec::new();
    let mut weights: Vec<u16> = Vec::new();
    let mut line_heights: Vec<f64> = Vec::new();

    for node in nodes {
        if let Some(primary) = node.styles.font_family.as_deref().and_then(primary_family) {
            if !families.contains(&primary) {
                families.push(primary);
            }
        }
        let size = node
            .styles
            .font_size
            .as_deref()
            .and_then(parse_px)
            .filter(|s| *s > 0.0);
        if let Some(s) = size {
            push_distinct(&mut sizes, s, 0.1);
        }
        if let Some(w) = node.styles.font_weight.as_deref().and_then(parse_font_weight) {
            if !weights.contains(&w) {
                weights.push(w);
            }
        }
        if let Some(lh) = node
            .styles
            .line_height
            .as_deref()
            .and_then(|v| parse_line_height(v, size))
            .filter(|lh| *lh > 0.0)
        {
            push_distinct(&mut line_heights, lh, 0.1);
        }
    }

    families.sort_unstable();
    sizes.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    weights.sort_unstable();
    line_heights.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    TypographyTokens {
        families,
        sizes,
        weights,
        line_heights,
    }
}

/// First family of a font stack, unquoted and lowercased.
fn primary_family(stack: &str) -> Option<String> {
    let first = stack.split(',').next()?.trim().trim_matches(['"', '\'']);
    if first.is_empty() {
        return None;
    }
    Some(first.to_ascii_lowercase())
}

fn push_distinct(values: &mut Vec<f64>, value: f64, epsilon: f64) {
    if !values.iter().any(|v| (v - value).abs() < epsilon) {
        values.push(value);
    }
}

fn spacing_steps(nodes: &[StyleNode], config: &TokenConfig) -> Vec<f64> {
    use std::collections::HashMap;

    let mut counts: HashMap<i64, usize> = HashMap::new();
    for node in nodes {
        for raw in [node.styles.margin.as_deref(), node.styles.padding.as_deref()] {
            let Some(raw) = raw else { continue };
            for px in parse_px_list(raw) {
                if !(px > 0.0) {
                    continue;
                }
                let snapped = (px / config.spacing_grid).round() * config.spacing_grid;
                if snapped <= 0.0 {
                    continue;
                }
                // Centi-pixel key keeps fractional grids exact enough.
                *counts.entry((snapped * 100.0).round() as i64).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(i64, usize)> = counts.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(config.max_spacing_steps);
    let mut steps: Vec<f64> = ranked.into_iter().map(|(k, _)| k as f64 / 100.0).collect();
    steps.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    steps
}

fn shape_tokens(nodes: &[StyleNode], config: &TokenConfig) -> ShapeTokens {
    let radii: Vec<f64> = nodes.iter().filter_map(resolve_radius).collect();
    let mut radius_ranked: Vec<(usize, f64)> = cluster_values(&radii, config.radius_cluster_gap)
        .iter()
        .map(|c| (c.len(), sfp_math::mean(c)))
        .collect();
    radius_ranked.sort_unstable_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    });
    radius_ranked.truncate(config.max_shape_clusters);
    let mut radius_clusters: Vec<f64> = radius_ranked.into_iter().map(|(_, c)| c).collect();
    radius_clusters.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    ShapeTokens {
        radius_clusters,
        shadow_clusters: shadow_clusters(nodes, config),
    }
}

fn shadow_clusters(nodes: &[StyleNode], config: &TokenConfig) -> Vec<ShadowToken> {
    let mut samples: Vec<(f64, f64)> = nodes
        .iter()
        .filter_map(|n| n.styles.box_shadow.as_deref())
        .filter_map(sfp_math::parse_box_shadow)
        .map(|s| (s.blur, s.alpha))
        .collect();
    if samples.is_empty() {
        return Vec::new();
    }
    samples.sort_unstable_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut clusters: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current = vec![samples[0]];
    for &pair in &samples[1..] {
        let last = current.last().map(|p| p.0).unwrap_or(pair.0);
        if pair.0 - last <= config.shadow_cluster_gap {
            current.push(pair);
        } else {
            clusters.push(std::mem::replace(&mut current, vec![pair]));
        }
    }
    clusters.push(current);

    clusters.sort_unstable_by(|a, b| {
        b.len().cmp(&a.len()).then_with(|| {
            let ca = a.first().map(|p| p.0).unwrap_or(0.0);
            let cb = b.first().map(|p| p.0).unwrap_or(0.0);
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        })
    });
    clusters.truncate(config.max_shape_clusters);

    let mut tokens: Vec<ShadowToken> = clusters
        .into_iter()
        .map(|c| {
            let blurs: Vec<f64> = c.iter().map(|p| p.0).collect();
            let alphas: Vec<f64> = c.iter().map(|p| p.1).collect();
            ShadowToken {
                blur: sfp_math::mean(&blurs),
                opacity: sfp_math::mean(&alphas),
            }
        })
        .collect();
    tokens.sort_unstable_by(|a, b| a.blur.partial_cmp(&b.blur).unwrap_or(std::cmp::Ordering::Equal));
    tokens
}

/// Effective corner radius of a node in pixels.
///
/// Percentage radii and oversized pixel radii (`9999px` pills) are capped
/// at half the node's shorter side, which is what actually renders.
pub(crate) fn resolve_radius(node: &StyleNode) -> Option<f64> {
    let raw = node.styles.border_radius.as_deref()?;
    let first = raw.split_whitespace().next()?;
    let half_side = (node.bbox.w.min(node.bbox.h) / 2.0).max(0.0);
    if let Some(pct) = first.strip_suffix('%') {
        let p = pct.trim().parse::<f64>().ok()?;
        if !p.is_finite() || p <= 0.0 {
            return None;
        }
        return Some((p / 100.0 * 2.0 * half_side).min(half_side));
    }
    parse_px(first)
        .filter(|r| *r > 0.0)
        .map(|r| r.min(half_side))
}
