//! Pure math utilities shared by every stylefp stage.
//!
//! Everything in this crate is a stateless function over plain values:
//! bounding-box geometry, population statistics, the normalization
//! primitives used to squeeze raw style measurements into `[0, 1]`,
//! proximity clustering, sRGB to LCH color conversion with perceptual
//! distance, and tolerant parsers for the CSS value strings a capture
//! stage hands us.
//!
//! Every function that could divide by zero or produce a NaN carries an
//! explicit guard and returns a defined value instead. Parsers are total:
//! they return `Option` rather than erroring on the endless variety of
//! computed-style spellings.

pub mod cluster;
pub mod color;
pub mod css;
pub mod geometry;
pub mod normalize;
pub mod stats;

pub use cluster::{cluster_centers, cluster_points, cluster_values};
pub use color::{contrast_ratio, delta_e, lch, lch_from_hex, relative_luminance, Lch, Rgb};
pub use css::{
    canonical_hex, parse_border_width, parse_box_shadow, parse_color, parse_font_weight,
    parse_line_height, parse_px, parse_px_list, ShadowSample,
};
pub use geometry::{BBox, Point};
pub use normalize::{clamp01, normalize_linear, normalize_log, normalize_percentile, sigmoid};
pub use stats::{coefficient_of_variation, mean, median, std_dev};
