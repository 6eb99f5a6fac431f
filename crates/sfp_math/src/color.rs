//! sRGB color math in perceptual space.
//!
//! Conversion chain: sRGB bytes -> linear RGB -> XYZ (D65) -> Lab -> LCH.
//! LCH separates what the tier classifier actually reasons about:
//! lightness (`l`, 0..100), chroma (`c`, 0 for greys up to ~132 for the
//! most vivid sRGB colors) and hue angle (`h`, degrees). Perceptual
//! distance is CIE76, computed back in Lab coordinates.

use serde::{Deserialize, Serialize};

/// sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A color in LCH space. Achromatic colors carry hue `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lch {
    pub l: f64,
    pub c: f64,
    pub h: f64,
}

impl Lch {
    /// Back-projection to Lab, used for distance computation.
    fn to_lab(self) -> (f64, f64, f64) {
        let rad = self.h.to_radians();
        (self.l, self.c * rad.cos(), self.c * rad.sin())
    }
}

// Chroma below this is treated as achromatic; the hue angle of a grey is
// numerical noise, not signal.
const ACHROMATIC_CHROMA: f64 = 1e-4;

const D65_WHITE: (f64, f64, f64) = (0.95047, 1.0, 1.08883);

#[inline]
fn srgb_to_linear(channel: u8) -> f64 {
    let c = channel as f64 / 255.0;
    if c <= 0.03928 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn lab_f(t: f64) -> f64 {
    const EPSILON: f64 = 216.0 / 24389.0;
    const KAPPA: f64 = 24389.0 / 27.0;
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

/// Convert an sRGB color to LCH.
pub fn lch(rgb: Rgb) -> Lch {
    let r = srgb_to_linear(rgb.r);
    let g = srgb_to_linear(rgb.g);
    let b = srgb_to_linear(rgb.b);

    let x = 0.4124564 * r + 0.3575761 * g + 0.1804375 * b;
    let y = 0.2126729 * r + 0.7151522 * g + 0.0721750 * b;
    let z = 0.0193339 * r + 0.1191920 * g + 0.9503041 * b;

    let fx = lab_f(x / D65_WHITE.0);
    let fy = lab_f(y / D65_WHITE.1);
    let fz = lab_f(z / D65_WHITE.2);

    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let lab_b = 200.0 * (fy - fz);

    let c = a.hypot(lab_b);
    let h = if c < ACHROMATIC_CHROMA {
        0.0
    } else {
        let deg = lab_b.atan2(a).to_degrees();
        if deg < 0.0 {
            deg + 360.0
        } else {
            deg
        }
    };

    Lch { l, c, h }
}

/// Convert a CSS color string (hex or `rgb()`/`rgba()`) to LCH.
pub fn lch_from_hex(value: &str) -> Option<Lch> {
    crate::css::parse_color(value).map(lch)
}

/// CIE76 perceptual distance between two LCH colors.
///
/// Symmetric, non-negative, `0.0` iff the colors are equal.
pub fn delta_e(a: Lch, b: Lch) -> f64 {
    let (l1, a1, b1) = a.to_lab();
    let (l2, a2, b2) = b.to_lab();
    let dl = l1 - l2;
    let da = a1 - a2;
    let db = b1 - b2;
    (dl * dl + da * da + db * db).sqrt()
}

/// WCAG relative luminance of an sRGB color, `0.0` (black) to `1.0` (white).
pub fn relative_luminance(rgb: Rgb) -> f64 {
    0.2126 * srgb_to_linear(rgb.r) + 0.7152 * srgb_to_linear(rgb.g) + 0.0722 * srgb_to_linear(rgb.b)
}

/// WCAG contrast ratio between two colors, `1.0` to `21.0`.
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let la = relative_luminance(a);
    let lb = relative_luminance(b);
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}
