//! Area-weighted color sampling and perceptual tier classification.

use serde::{Deserialize, Serialize};
use sfp_ingest::StyleNode;
use sfp_math::{canonical_hex, lch_from_hex, parse_color};

use crate::TokenConfig;

/// A distinct canonical color and the total on-screen area covered by
/// nodes referencing it as foreground or background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSample {
    pub hex: String,
    pub area: f64,
}

/// The page palette partitioned into perceptual tiers.
///
/// Tier membership is decided by chroma/lightness thresholds alone; a
/// page with twelve brand colors keeps all twelve. Lists stay in sampled
/// order (dominant colors first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorTiers {
    pub foundation: Vec<String>,
    pub tinted_neutrals: Vec<String>,
    pub accent_colors: Vec<String>,
    pub brand_colors: Vec<String>,
}

impl ColorTiers {
    pub fn palette_size(&self) -> usize {
        self.foundation.len()
            + self.tinted_neutrals.len()
            + self.accent_colors.len()
            + self.brand_colors.len()
    }
}

/// Gather the dominant colors of a page, area-weighted.
///
/// Each node contributes its foreground and background color with its
/// full bbox area. Unparsable and fully transparent values are skipped.
/// Output is ranked area descending (ties by hex ascending) and cut to
/// `max_samples` before any classification happens.
pub fn collect_color_samples(nodes: &[StyleNode], max_samples: usize) -> Vec<ColorSample> {
    use std::collections::HashMap;

    let mut areas: HashMap<String, f64> = HashMap::new();
    for node in nodes {
        let area = node.bbox.area();
        if !(area > 0.0) {
            continue;
        }
        for raw in [node.styles.background_color.as_deref(), node.styles.color.as_deref()] {
            let Some(rgb) = raw.and_then(parse_color) else {
                continue;
            };
            *areas.entry(canonical_hex(rgb)).or_insert(0.0) += area;
        }
    }

    let mut samples: Vec<ColorSample> = areas
        .into_iter()
        .map(|(hex, area)| ColorSample { hex, area })
        .collect();
    samples.sort_unstable_by(|a, b| {
        b.area
            .partial_cmp(&a.area)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.hex.cmp(&b.hex))
    });
    samples.truncate(max_samples);
    samples
}

/// Partition sampled colors into tiers by chroma and lightness.
///
/// First matching rule wins:
/// 1. near-achromatic, near-black or near-white -> foundation
/// 2. chroma above the brand threshold -> brand
/// 3. chroma above the accent threshold -> accent
/// 4. otherwise -> tinted neutrals
pub fn classify_tiers(samples: &[ColorSample], config: &TokenConfig) -> ColorTiers {
    let mut tiers = ColorTiers::default();
    for sample in samples {
        let Some(lch) = lch_from_hex(&sample.hex) else {
            continue;
        };
        if lch.c < config.chroma_neutral_max
            || lch.l < config.lightness_floor
            || lch.l > config.lightness_ceiling
        {
            tiers.foundation.push(sample.hex.clone());
        } else if lch.c > config.chroma_brand_min {
            tiers.brand_colors.push(sample.hex.clone());
        } else if lch.c > config.chroma_accent_min {
            tiers.accent_colors.push(sample.hex.clone());
        } else {
            tiers.tinted_neutrals.push(sample.hex.clone());
        }
    }
    tiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfp_ingest::NodeStyles;
    use sfp_math::BBox;

    fn node(id: &str, area_side: f64, bg: Option<&str>, fg: Option<&str>) -> StyleNode {
        StyleNode {
            id: id.to_string(),
            tag: "div".to_string(),
            bbox: BBox::new(0.0, 0.0, area_side, area_side),
            styles: NodeStyles {
                background_color: bg.map(str::to_string),
                color: fg.map(str::to_string),
                ..NodeStyles::default()
            },
            role: None,
            class_name: None,
            text_content: None,
        }
    }

    fn sample(hex: &str) -> ColorSample {
        ColorSample {
            hex: hex.to_string(),
            area: 1.0,
        }
    }

    #[test]
    fn samples_are_area_ranked_and_deduplicated() {
        let nodes = vec![
            node("hero", 100.0, Some("#1a1a2e"), Some("#ffffff")),
            node("card", 50.0, Some("rgb(26, 26, 46)"), Some("#e94560")),
            node("badge", 10.0, Some("#e94560"), None),
        ];
        let samples = collect_color_samples(&nodes, 14);
        // #1a1a2e: 10000 + 2500, #ffffff: 10000, #e94560: 2500 + 100.
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].hex, "#1a1a2e");
        assert!((samples[0].area - 12_500.0).abs() < 1e-9);
        assert_eq!(samples[1].hex, "#ffffff");
        assert_eq!(samples[2].hex, "#e94560");
        assert!((samples[2].area - 2_600.0).abs() < 1e-9);
    }

    #[test]
    fn sampling_budget_cuts_by_area_before_classification() {
        let mut nodes = Vec::new();
        for i in 0..20 {
            // Distinct reds with strictly decreasing areas.
            let side = (40 - i) as f64;
            let hex = format!("#{:02x}0000", 120 + i * 5);
            nodes.push(node(&format!("n{i}"), side, Some(&hex), None));
        }
        let samples = collect_color_samples(&nodes, 14);
        assert_eq!(samples.len(), 14);
        assert!(samples.windows(2).all(|w| w[0].area >= w[1].area));
    }

    #[test]
    fn transparent_and_unparsable_colors_are_skipped() {
        let nodes = vec![
            node("a", 10.0, Some("rgba(0, 0, 0, 0)"), Some("transparent")),
            node("b", 10.0, Some("var(--bg)"), Some("#336699")),
        ];
        let samples = collect_color_samples(&nodes, 14);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].hex, "#336699");
    }

    #[test]
    fn first_matching_tier_rule_wins() {
        let config = TokenConfig::default();
        let samples = vec![
            sample("#ffffff"), // near-white -> foundation even at zero chroma
            sample("#0a0a0a"), // near-black -> foundation
            sample("#808080"), // gray, chroma ~0 -> foundation
            sample("#ff2d2d"), // vivid red, chroma way past 40 -> brand
            sample("#b08968"), // muted tan, chroma ~  20-40 -> accent
            sample("#e8e0d5"), // warm light gray, low but nonzero chroma -> tinted neutral
        ];
        let tiers = classify_tiers(&samples, &config);
        assert_eq!(tiers.foundation, vec!["#ffffff", "#0a0a0a", "#808080"]);
        assert_eq!(tiers.brand_colors, vec!["#ff2d2d"]);
        assert_eq!(tiers.accent_colors, vec!["#b08968"]);
        assert_eq!(tiers.tinted_neutrals, vec!["#e8e0d5"]);
    }

    #[test]
    fn tier_counts_vary_across_distinct_palettes() {
        let config = TokenConfig::default();
        let palettes: Vec<Vec<ColorSample>> = vec![
            // Monochrome.
            vec![sample("#000000"), sample("#333333"), sample("#777777"), sample("#ffffff")],
            // Saturated brand page.
            vec![sample("#ff0000"), sample("#00c853"), sample("#2962ff"), sample("#ffffff")],
            // Pastel.
            vec![sample("#ffd6e0"), sample("#d6eaff"), sample("#e2ffd6"), sample("#fffbe0")],
            // Warm editorial.
            vec![sample("#fdf6ec"), sample("#b08968"), sample("#7f5539"), sample("#2d2a26")],
            // Dark neon.
            vec![sample("#0d0d0d"), sample("#1a1a1a"), sample("#39ff14"), sample("#ff2079")],
        ];
        let counts: Vec<[usize; 4]> = palettes
            .iter()
            .map(|p| {
                let t = classify_tiers(p, &config);
                [
                    t.foundation.len(),
                    t.tinted_neutrals.len(),
                    t.accent_colors.len(),
                    t.brand_colors.len(),
                ]
            })
            .collect();
        // A classifier that truncates tiers to fixed sizes makes every
        // page look the same. Distinct palettes must produce distinct
        // tier-count signatures.
        let all_identical = counts.windows(2).all(|w| w[0] == w[1]);
        assert!(!all_identical, "tier counts collapsed across palettes: {counts:?}");
    }

    #[test]
    fn no_tier_is_capped() {
        let config = TokenConfig::default();
        // Ten vivid colors: a capped classifier would keep a fixed few.
        let samples: Vec<ColorSample> = [
            "#ff0000", "#ff8000", "#d4a000", "#00ff00", "#00ffff", "#0080ff", "#0000ff",
            "#8000ff", "#ff00ff", "#ff0080",
        ]
        .iter()
        .map(|h| sample(h))
        .collect();
        let tiers = classify_tiers(&samples, &config);
        assert_eq!(tiers.brand_colors.len(), 10);
    }
}
