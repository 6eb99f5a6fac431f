//! Per-element style measures, the raw input of a component vector.

use serde::{Deserialize, Serialize};
use sfp_ingest::{StyleNode, Viewport};
use sfp_math::{
    contrast_ratio, lch, parse_border_width, parse_box_shadow, parse_color, parse_font_weight,
    parse_px, parse_px_list, Lch,
};

use crate::resolve_radius;

/// Style measures of a single element.
///
/// Absent styles read as zero so an unstyled element contributes no
/// signal instead of failing extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentTokens {
    pub background: Option<Lch>,
    pub foreground: Option<Lch>,
    /// WCAG contrast between foreground and background; `1.0` when either
    /// color is unknown.
    pub contrast: f64,
    pub font_size: f64,
    pub font_weight: f64,
    pub label_chars: f64,
    pub label_uppercase_share: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub width: f64,
    pub height: f64,
    /// Fraction of the viewport the element covers.
    pub viewport_share: f64,
    pub radius: f64,
    pub pill_shaped: bool,
    pub border_width: f64,
    pub shadow_blur: f64,
    pub shadow_alpha: f64,
}

/// Measure one element against its viewport.
pub fn extract_component(node: &StyleNode, viewport: &Viewport) -> ComponentTokens {
    let bg_rgb = node.styles.background_color.as_deref().and_then(parse_color);
    let fg_rgb = node.styles.color.as_deref().and_then(parse_color);
    let contrast = match (fg_rgb, bg_rgb) {
        (Some(fg), Some(bg)) => contrast_ratio(fg, bg),
        _ => 1.0,
    };

    let font_size = node
        .styles
        .font_size
        .as_deref()
        .and_then(parse_px)
        .filter(|s| *s > 0.0)
        .unwrap_or(0.0);
    let font_weight = node
        .styles
        .font_weight
        .as_deref()
        .and_then(parse_font_weight)
        .map(f64::from)
        .unwrap_or(0.0);

    let (label_chars, label_uppercase_share) = label_measures(node.text_content.as_deref());
    let (padding_x, padding_y) = node
        .styles
        .padding
        .as_deref()
        .map(padding_xy)
        .unwrap_or((0.0, 0.0));

    let width = node.bbox.w.max(0.0);
    let height = node.bbox.h.max(0.0);
    let viewport_area = viewport.area();
    let viewport_share = if viewport_area > 0.0 {
        (node.bbox.area() / viewport_area).max(0.0)
    } else {
        0.0
    };

    let radius = resolve_radius(node).unwrap_or(0.0);
    let half_side = (width.min(height) / 2.0).max(0.0);
    let pill_shaped = half_side > 0.0 && radius >= half_side * 0.99;

    let border_width = node
        .styles
        .border
        .as_deref()
        .and_then(parse_border_width)
        .unwrap_or(0.0);
    let (shadow_blur, shadow_alpha) = node
        .styles
        .box_shadow
        .as_deref()
        .and_then(parse_box_shadow)
        .map(|s| (s.blur, s.alpha))
        .unwrap_or((0.0, 0.0));

    ComponentTokens {
        background: bg_rgb.map(lch),
        foreground: fg_rgb.map(lch),
        contrast,
        font_size,
        font_weight,
        label_chars,
        label_uppercase_share,
        padding_x,
        padding_y,
        width,
        height,
        viewport_share,
        radius,
        pill_shaped,
        border_width,
        shadow_blur,
        shadow_alpha,
    }
}

fn label_measures(text: Option<&str>) -> (f64, f64) {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return (0.0, 0.0);
    };
    let chars = text.chars().count() as f64;
    let alphabetic = text.chars().filter(|c| c.is_alphabetic()).count();
    if alphabetic == 0 {
        return (chars, 0.0);
    }
    let upper = text.chars().filter(|c| c.is_uppercase()).count();
    (chars, upper as f64 / alphabetic as f64)
}

/// Expand a CSS padding shorthand into `(horizontal, vertical)` pixels.
///
/// Follows the 1/2/3/4-value rules; opposing sides are averaged.
pub fn padding_xy(raw: &str) -> (f64, f64) {
    let values = parse_px_list(raw);
    match values.as_slice() {
        [] => (0.0, 0.0),
        [all] => (*all, *all),
        [vertical, horizontal] => (*horizontal, *vertical),
        [top, horizontal, bottom] => (*horizontal, (top + bottom) / 2.0),
        [top, right, bottom, left, ..] => ((right + left) / 2.0, (top + bottom) / 2.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfp_ingest::NodeStyles;
    use sfp_math::BBox;

    fn viewport() -> Viewport {
        Viewport {
            width: 1440.0,
            height: 900.0,
        }
    }

    fn button() -> StyleNode {
        StyleNode {
            id: "cta".to_string(),
            tag: "button".to_string(),
            bbox: BBox::new(640.0, 420.0, 160.0, 48.0),
            styles: NodeStyles {
                background_color: Some("#0066ff".to_string()),
                color: Some("#ffffff".to_string()),
                font_size: Some("16px".to_string()),
                font_weight: Some("600".to_string()),
                padding: Some("12px 24px".to_string()),
                border_radius: Some("24px".to_string()),
                box_shadow: Some("0px 2px 8px rgba(0, 0, 0, 0.25)".to_string()),
                ..NodeStyles::default()
            },
            role: Some("button".to_string()),
            class_name: None,
            text_content: Some("GET STARTED".to_string()),
        }
    }

    #[test]
    fn button_measures_are_extracted() {
        let tokens = extract_component(&button(), &viewport());
        assert!(tokens.background.is_some());
        assert!(tokens.foreground.is_some());
        // White on saturated blue sits in the 4..5 contrast band.
        assert!(tokens.contrast > 4.0 && tokens.contrast < 5.0);
        assert_eq!(tokens.font_size, 16.0);
        assert_eq!(tokens.font_weight, 600.0);
        assert_eq!(tokens.label_chars, 11.0);
        assert_eq!(tokens.label_uppercase_share, 1.0);
        assert_eq!(tokens.padding_x, 24.0);
        assert_eq!(tokens.padding_y, 12.0);
        assert_eq!(tokens.width, 160.0);
        assert_eq!(tokens.height, 48.0);
        assert!((tokens.viewport_share - (160.0 * 48.0) / (1440.0 * 900.0)).abs() < 1e-12);
        // 24px radius on a 48px-tall box is a full pill.
        assert_eq!(tokens.radius, 24.0);
        assert!(tokens.pill_shaped);
        assert!((tokens.shadow_blur - 8.0).abs() < 1e-9);
        assert!((tokens.shadow_alpha - 0.25).abs() < 1e-9);
    }

    #[test]
    fn unstyled_node_reads_as_zero_signal() {
        let node = StyleNode {
            id: "plain".to_string(),
            tag: "div".to_string(),
            bbox: BBox::new(0.0, 0.0, 100.0, 100.0),
            styles: NodeStyles::default(),
            role: None,
            class_name: None,
            text_content: None,
        };
        let tokens = extract_component(&node, &viewport());
        assert!(tokens.background.is_none());
        assert!(tokens.foreground.is_none());
        assert_eq!(tokens.contrast, 1.0);
        assert_eq!(tokens.font_size, 0.0);
        assert_eq!(tokens.label_chars, 0.0);
        assert_eq!(tokens.radius, 0.0);
        assert!(!tokens.pill_shaped);
        assert_eq!(tokens.shadow_blur, 0.0);
    }

    #[test]
    fn mixed_case_label_share_is_fractional() {
        let mut node = button();
        node.text_content = Some("Sign Up".to_string());
        let tokens = extract_component(&node, &viewport());
        assert_eq!(tokens.label_chars, 7.0);
        // 2 uppercase of 6 alphabetic characters.
        assert!((tokens.label_uppercase_share - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn padding_shorthand_expansion() {
        assert_eq!(padding_xy("8px"), (8.0, 8.0));
        assert_eq!(padding_xy("8px 16px"), (16.0, 8.0));
        assert_eq!(padding_xy("8px 16px 4px"), (16.0, 6.0));
        assert_eq!(padding_xy("1px 2px 3px 4px"), (3.0, 2.0));
        assert_eq!(padding_xy(""), (0.0, 0.0));
    }
}
