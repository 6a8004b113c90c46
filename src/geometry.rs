//! Page-space geometry: points, axis-aligned boxes and crop rectangles.
//!
//! All coordinates are in raster pixels with the origin at the top-left
//! corner of the page and `y` growing downwards, which is what detectors
//! report. Conversion to PDF user space (origin bottom-left) happens only in
//! [`crate::pipeline::annotate`].

use serde::{Deserialize, Serialize};

/// A 2D point in page pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box in page pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Min/max over every point of a polygon.
    ///
    /// Returns `None` for an empty slice. Rotation encoded by a skewed
    /// quadrilateral is discarded.
    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let init = Self::new(first.x, first.y, first.x, first.y);
        Some(points[1..].iter().fold(init, |b, p| Self {
            x_min: b.x_min.min(p.x),
            y_min: b.y_min.min(p.y),
            x_max: b.x_max.max(p.x),
            y_max: b.y_max.max(p.y),
        }))
    }

    pub fn width(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y_max - self.y_min).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Shrink by `margin` on all four sides. May produce an empty box.
    pub fn inset(&self, margin: f32) -> Self {
        Self {
            x_min: self.x_min + margin,
            y_min: self.y_min + margin,
            x_max: self.x_max - margin,
            y_max: self.y_max - margin,
        }
    }

    /// Integer crop rectangle clipped to a `page_width` × `page_height` raster.
    ///
    /// Coordinates are truncated towards zero, so a box spanning
    /// `10.7..110.2` crops columns `10..110`.
    pub fn crop_rect(&self, page_width: u32, page_height: u32) -> CropRect {
        let clamp_x = |v: f32| (v.max(0.0) as u32).min(page_width);
        let clamp_y = |v: f32| (v.max(0.0) as u32).min(page_height);
        let x0 = clamp_x(self.x_min);
        let y0 = clamp_y(self.y_min);
        let x1 = clamp_x(self.x_max);
        let y1 = clamp_y(self.y_max);
        CropRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

/// Pixel rectangle used to cut a region out of a page raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Signed area of a polygon (shoelace formula). Positive for clockwise
/// vertex order in a y-down coordinate system.
pub fn polygon_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f32 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn quad(coords: [(f32, f32); 4]) -> Vec<Point> {
        coords.into_iter().map(Point::from).collect()
    }

    #[test]
    fn enclosing_box_of_rotated_quad() {
        let pts = quad([(20.0, 5.0), (60.0, 15.0), (55.0, 35.0), (15.0, 25.0)]);
        let b = BoundingBox::enclosing(&pts).unwrap();
        assert_eq!(b, BoundingBox::new(15.0, 5.0, 60.0, 35.0));
        assert_eq!(b.width(), 45.0);
        assert_eq!(b.height(), 30.0);
    }

    #[test]
    fn enclosing_box_of_nothing() {
        assert!(BoundingBox::enclosing(&[]).is_none());
    }

    #[test]
    fn inset_can_collapse() {
        let b = BoundingBox::new(0.0, 0.0, 3.0, 10.0).inset(2.0);
        assert!(b.is_empty());
    }

    #[test]
    fn crop_rect_truncates_and_clips() {
        let b = BoundingBox::new(10.7, -4.0, 250.0, 30.9);
        let r = b.crop_rect(200, 100);
        assert_eq!(
            r,
            CropRect {
                x: 10,
                y: 0,
                width: 190,
                height: 30
            }
        );
    }

    #[test]
    fn crop_rect_outside_page_is_empty() {
        let b = BoundingBox::new(300.0, 10.0, 400.0, 20.0);
        assert!(b.crop_rect(200, 100).is_empty());
    }

    #[test]
    fn shoelace_area() {
        let square = quad([(10.0, 10.0), (110.0, 10.0), (110.0, 30.0), (10.0, 30.0)]);
        assert_eq!(polygon_area(&square).abs(), 2000.0);
        let line = quad([(0.0, 0.0), (5.0, 5.0), (10.0, 10.0), (5.0, 5.0)]);
        assert_eq!(polygon_area(&line), 0.0);
    }
}
