//! Tolerant parsers for computed-style value strings.
//!
//! Capture stages hand us whatever `getComputedStyle` produced: `"16px"`,
//! `"rgb(255, 255, 255)"`, `"rgba(0, 0, 0, 0.2) 0px 1px 3px 0px"`,
//! shorthand lists, keywords. These parsers accept the common spellings
//! and return `None` for everything else; a style value that cannot be
//! parsed simply contributes no signal.

use crate::color::Rgb;

/// Blur radius and color alpha extracted from the first shadow of a
/// `box-shadow` declaration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSample {
    pub blur: f64,
    pub alpha: f64,
}

/// Parse a CSS color: `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb()` or `rgba()`
/// with comma or space separators.
///
/// Fully transparent colors (`transparent`, alpha `0`) return `None`:
/// an invisible color carries no style signal.
pub fn parse_color(value: &str) -> Option<Rgb> {
    let v = value.trim().to_ascii_lowercase();
    if v.is_empty() || v == "transparent" || v == "none" || v == "currentcolor" {
        return None;
    }
    if let Some(hex) = v.strip_prefix('#') {
        let (rgb, alpha) = hex_with_alpha(hex)?;
        return (alpha > 0.0).then_some(rgb);
    }
    let rest = v.strip_prefix("rgba").or_else(|| v.strip_prefix("rgb"))?;
    let inner = rest.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (rgb, alpha) = rgb_components_with_alpha(inner)?;
    (alpha > 0.0).then_some(rgb)
}

/// Canonical lowercase `#rrggbb` form used as the palette key.
pub fn canonical_hex(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b)
}

fn hex_with_alpha(hex: &str) -> Option<(Rgb, f64)> {
    let nibble = |c: char| c.to_digit(16).map(|d| d as u8);
    let bytes: Vec<char> = hex.chars().collect();
    match bytes.len() {
        3 => {
            let r = nibble(bytes[0])?;
            let g = nibble(bytes[1])?;
            let b = nibble(bytes[2])?;
            Some((Rgb::new(r * 17, g * 17, b * 17), 1.0))
        }
        6 | 8 => {
            let pair = |i: usize| -> Option<u8> {
                Some(nibble(bytes[i])? * 16 + nibble(bytes[i + 1])?)
            };
            let rgb = Rgb::new(pair(0)?, pair(2)?, pair(4)?);
            let alpha = if bytes.len() == 8 {
                pair(6)? as f64 / 255.0
            } else {
                1.0
            };
            Some((rgb, alpha))
        }
        _ => None,
    }
}

fn rgb_components_with_alpha(inner: &str) -> Option<(Rgb, f64)> {
    let parts: Vec<&str> = inner
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 {
        return None;
    }
    let channel = |s: &str| -> Option<u8> {
        let v = if let Some(pct) = s.strip_suffix('%') {
            pct.trim().parse::<f64>().ok()? * 255.0 / 100.0
        } else {
            s.parse::<f64>().ok()?
        };
        v.is_finite().then(|| v.round().clamp(0.0, 255.0) as u8)
    };
    let rgb = Rgb::new(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?);
    let alpha = match parts.get(3) {
        Some(a) => {
            let v = if let Some(pct) = a.strip_suffix('%') {
                pct.trim().parse::<f64>().ok()? / 100.0
            } else {
                a.parse::<f64>().ok()?
            };
            v.clamp(0.0, 1.0)
        }
        None => 1.0,
    };
    Some((rgb, alpha))
}

/// Parse a pixel length: `"16px"` or a bare finite number.
///
/// Relative units (`em`, `%`, ...) and keywords return `None`.
pub fn parse_px(value: &str) -> Option<f64> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    let num = match v.strip_suffix("px") {
        Some(n) => n.trim(),
        None => v,
    };
    let parsed = num.parse::<f64>().ok()?;
    parsed.is_finite().then_some(parsed)
}

/// Parse a whitespace-separated shorthand (`"8px 16px"`) into the pixel
/// values that could be parsed; unparseable entries are skipped.
pub fn parse_px_list(value: &str) -> Vec<f64> {
    value.split_whitespace().filter_map(parse_px).collect()
}

/// Parse a font weight: numeric (`"700"`) or keyword.
pub fn parse_font_weight(value: &str) -> Option<u16> {
    let v = value.trim().to_ascii_lowercase();
    match v.as_str() {
        "normal" => return Some(400),
        "bold" | "bolder" => return Some(700),
        "lighter" => return Some(300),
        _ => {}
    }
    let parsed = v.parse::<f64>().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    let rounded = parsed.round();
    (1.0..=1000.0).contains(&rounded).then(|| rounded as u16)
}

/// Resolve a line-height to pixels: absolute (`"24px"`), percentage, or a
/// unitless factor against `font_size`. `"normal"` resolves to `None`.
pub fn parse_line_height(value: &str, font_size: Option<f64>) -> Option<f64> {
    let v = value.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("normal") {
        return None;
    }
    if let Some(px) = v.strip_suffix("px") {
        let parsed = px.trim().parse::<f64>().ok()?;
        return (parsed.is_finite() && parsed >= 0.0).then_some(parsed);
    }
    if let Some(pct) = v.strip_suffix('%') {
        let factor = pct.trim().parse::<f64>().ok()? / 100.0;
        return resolve_factor(factor, font_size);
    }
    let factor = v.parse::<f64>().ok()?;
    resolve_factor(factor, font_size)
}

fn resolve_factor(factor: f64, font_size: Option<f64>) -> Option<f64> {
    if !factor.is_finite() || factor < 0.0 {
        return None;
    }
    font_size.map(|fs| fs * factor)
}

/// Width of a `border` shorthand (`"1px solid rgb(0, 0, 0)"`): the first
/// pixel length found. `"none"` and empty values return `None`.
pub fn parse_border_width(value: &str) -> Option<f64> {
    let v = value.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("none") {
        return None;
    }
    v.split_whitespace()
        .filter(|tok| tok.ends_with("px"))
        .find_map(parse_px)
        .filter(|w| *w >= 0.0)
}

/// Parse the first shadow of a `box-shadow` declaration.
///
/// Accepts both orderings the engines emit (`rgba(...) 0px 1px 3px` and
/// `0px 1px 3px rgba(...)`). A declaration without at least two lengths,
/// or whose color is fully transparent, yields `None`.
pub fn parse_box_shadow(value: &str) -> Option<ShadowSample> {
    let v = value.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("none") {
        return None;
    }
    let first = first_top_level_segment(v);
    let (remaining, alpha) = split_off_color(first);
    let lengths: Vec<f64> = remaining
        .split_whitespace()
        .filter(|tok| tok.ends_with("px") || tok.parse::<f64>().is_ok())
        .filter_map(parse_px)
        .collect();
    if lengths.len() < 2 || alpha <= 0.0 {
        return None;
    }
    let blur = lengths.get(2).copied().unwrap_or(0.0).max(0.0);
    Some(ShadowSample {
        blur,
        alpha: alpha.min(1.0),
    })
}

/// Slice up to the first comma that is not inside parentheses; multi-shadow
/// declarations are sampled by their first (visually dominant) entry.
fn first_top_level_segment(value: &str) -> &str {
    let mut depth = 0usize;
    for (i, ch) in value.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return &value[..i],
            _ => {}
        }
    }
    value
}

/// Remove the color component from a shadow segment, returning the rest of
/// the segment and the color's alpha (`1.0` when no color is present).
fn split_off_color(segment: &str) -> (String, f64) {
    let lower = segment.to_ascii_lowercase();
    if let Some(start) = lower.find("rgb") {
        if let Some(open) = lower[start..].find('(').map(|i| start + i) {
            if let Some(close) = lower[open..].find(')').map(|i| open + i) {
                let alpha = rgb_components_with_alpha(&lower[open + 1..close])
                    .map(|(_, a)| a)
                    .unwrap_or(1.0);
                let mut rest = String::with_capacity(lower.len());
                rest.push_str(&lower[..start]);
                rest.push(' ');
                rest.push_str(&lower[close + 1..]);
                return (rest, alpha);
            }
        }
    }
    let mut alpha = 1.0;
    let mut rest: Vec<&str> = Vec::new();
    for tok in lower.split_whitespace() {
        match tok.strip_prefix('#').and_then(hex_with_alpha) {
            Some((_, a)) => alpha = a,
            None => rest.push(tok),
        }
    }
    (rest.join(" "), alpha)
}
