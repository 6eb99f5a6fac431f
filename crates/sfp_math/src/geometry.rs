//! Bounding-box and point geometry.

use serde::{Deserialize, Serialize};

/// A 2-D point, used for element centroids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned bounding box in capture pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// All coordinates finite and dimensions non-negative.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.w.is_finite()
            && self.h.is_finite()
            && self.w >= 0.0
            && self.h >= 0.0
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Shortest edge-to-edge gap to another box; `0.0` when they overlap
    /// or touch.
    pub fn gap_to(&self, other: &BBox) -> f64 {
        let dx = (other.x - self.right()).max(self.x - other.right()).max(0.0);
        let dy = (other.y - self.bottom()).max(self.y - other.bottom()).max(0.0);
        dx.hypot(dy)
    }

    /// Area of the part of this box lying above the horizontal line `y`.
    pub fn area_above(&self, y: f64) -> f64 {
        let visible = (y - self.y).clamp(0.0, self.h);
        self.w * visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_and_edges() {
        let b = BBox::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(b.area(), 5000.0);
        assert_eq!(b.right(), 110.0);
        assert_eq!(b.bottom(), 70.0);
        assert_eq!(b.center(), Point::new(60.0, 45.0));
    }

    #[test]
    fn validity_rejects_negative_and_non_finite() {
        assert!(BBox::new(0.0, 0.0, 0.0, 0.0).is_valid());
        assert!(!BBox::new(0.0, 0.0, -1.0, 5.0).is_valid());
        assert!(!BBox::new(f64::NAN, 0.0, 1.0, 1.0).is_valid());
        assert!(!BBox::new(0.0, f64::INFINITY, 1.0, 1.0).is_valid());
    }

    #[test]
    fn gap_between_separated_boxes() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(20.0, 0.0, 10.0, 10.0);
        assert_eq!(a.gap_to(&b), 10.0);
        assert_eq!(b.gap_to(&a), 10.0);
    }

    #[test]
    fn gap_is_zero_for_overlap_and_diagonal_for_corners() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.gap_to(&b), 0.0);
        let c = BBox::new(13.0, 14.0, 5.0, 5.0);
        assert_eq!(a.gap_to(&c), 5.0); // 3-4-5 triangle
    }

    #[test]
    fn area_above_clips_to_fold() {
        let b = BBox::new(0.0, 50.0, 10.0, 100.0);
        assert_eq!(b.area_above(0.0), 0.0);
        assert_eq!(b.area_above(100.0), 500.0);
        assert_eq!(b.area_above(500.0), 1000.0);
    }
}
