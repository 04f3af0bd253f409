//! World-space geometry of the lattice and proximity queries.
//!
//! Input layers supply tracked positions in world units. The lattice is
//! centered on the origin: cell `c` on an axis sits at
//! `(c - N/2) * cell_spacing`. [`LatticeGeometry::cells_within`] turns a
//! tracked point and an interaction radius into the candidate coordinates an
//! insertion pass should touch, scanning only the point's bounding box.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::lattice::Coordinate;

/// A position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    /// World x.
    pub x: f64,
    /// World y.
    pub y: f64,
    /// World z.
    pub z: f64,
}

impl Point3 {
    /// Build a point from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean distance to `other`.
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx.mul_add(dx, dy.mul_add(dy, dz * dz))
    }
}

/// Maps lattice coordinates to world space and back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeGeometry {
    /// Edge length `N`.
    size: u16,
    /// World distance between adjacent cell centers.
    cell_spacing: f64,
}

impl LatticeGeometry {
    /// Build the geometry for an `N`-cell edge.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `size` is zero or
    /// `cell_spacing` is not a positive finite number.
    pub fn new(size: u16, cell_spacing: f64) -> Result<Self, EngineError> {
        if size == 0 {
            return Err(EngineError::invalid_config(
                "lattice size must be at least 1",
            ));
        }
        if !(cell_spacing.is_finite() && cell_spacing > 0.0) {
            return Err(EngineError::invalid_config(format!(
                "cell spacing ({cell_spacing}) must be positive and finite"
            )));
        }
        Ok(Self { size, cell_spacing })
    }

    /// Edge length `N`.
    pub const fn size(&self) -> u16 {
        self.size
    }

    /// World distance between adjacent cell centers.
    pub const fn cell_spacing(&self) -> f64 {
        self.cell_spacing
    }

    /// World-space center of `coord`.
    pub fn cell_center(&self, coord: Coordinate) -> Point3 {
        Point3 {
            x: self.axis_position(coord.x),
            y: self.axis_position(coord.y),
            z: self.axis_position(coord.z),
        }
    }

    /// Every cell whose center lies strictly within `radius` of `point`.
    ///
    /// Returns an empty list for non-finite inputs or a non-positive radius.
    pub fn cells_within(&self, point: Point3, radius: f64) -> Vec<Coordinate> {
        if !(radius.is_finite() && radius > 0.0) {
            return Vec::new();
        }
        let (Some(xs), Some(ys), Some(zs)) = (
            self.axis_span(point.x, radius),
            self.axis_span(point.y, radius),
            self.axis_span(point.z, radius),
        ) else {
            return Vec::new();
        };

        let radius_squared = radius * radius;
        let mut hits = Vec::new();
        for z in zs.0..=zs.1 {
            for y in ys.0..=ys.1 {
                for x in xs.0..=xs.1 {
                    let coord = Coordinate::new(x, y, z);
                    if self.cell_center(coord).distance_squared(point) < radius_squared {
                        hits.push(coord);
                    }
                }
            }
        }
        hits
    }

    fn axis_position(&self, cell: u16) -> f64 {
        (f64::from(cell) - f64::from(self.size) / 2.0) * self.cell_spacing
    }

    /// Inclusive cell range on one axis covering `[position - radius,
    /// position + radius]`, clipped to the lattice. `None` if it misses.
    fn axis_span(&self, position: f64, radius: f64) -> Option<(u16, u16)> {
        let half = f64::from(self.size) / 2.0;
        let low = ((position - radius) / self.cell_spacing + half).floor();
        let high = ((position + radius) / self.cell_spacing + half).ceil();
        let last = f64::from(self.size.saturating_sub(1));
        if !(low.is_finite() && high.is_finite()) || high < 0.0 || low > last {
            return None;
        }
        // Both ends are clamped to [0, N-1], which fits in u16.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let span = (low.max(0.0) as u16, high.min(last) as u16);
        Some(span)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    /// Brute-force reference for `cells_within`.
    fn scan_all(geometry: &LatticeGeometry, point: Point3, radius: f64) -> Vec<Coordinate> {
        let n = geometry.size();
        let mut hits = Vec::new();
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    let c = Coordinate::new(x, y, z);
                    if geometry.cell_center(c).distance_squared(point) < radius * radius {
                        hits.push(c);
                    }
                }
            }
        }
        hits
    }

    #[test]
    fn lattice_is_centered_on_origin() {
        let geometry = LatticeGeometry::new(30, 0.011).unwrap();
        let center = geometry.cell_center(Coordinate::new(15, 15, 15));
        assert!(close(center.x, 0.0) && close(center.y, 0.0) && close(center.z, 0.0));

        let corner = geometry.cell_center(Coordinate::new(0, 0, 0));
        assert!(close(corner.x, -0.165));
    }

    #[test]
    fn default_radius_around_a_cell_center_hits_a_small_ball() {
        let geometry = LatticeGeometry::new(30, 0.011).unwrap();
        let point = geometry.cell_center(Coordinate::new(15, 15, 15));
        let hits = geometry.cells_within(point, 0.025);
        // Radius 0.025 / spacing 0.011 ~ 2.27 cells.
        assert!(hits.contains(&Coordinate::new(15, 15, 15)));
        assert!(hits.contains(&Coordinate::new(17, 15, 15)));
        assert!(!hits.contains(&Coordinate::new(18, 15, 15)));
        assert_eq!(hits, scan_all(&geometry, point, 0.025));
    }

    #[test]
    fn bounding_box_scan_matches_full_scan() {
        let geometry = LatticeGeometry::new(12, 0.011).unwrap();
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.013, -0.021, 0.004),
            Point3::new(-0.066, -0.066, -0.066),
            Point3::new(0.06, 0.0, -0.055),
        ];
        for point in points {
            for radius in [0.005, 0.02, 0.04] {
                assert_eq!(
                    geometry.cells_within(point, radius),
                    scan_all(&geometry, point, radius),
                    "point {point:?} radius {radius}"
                );
            }
        }
    }

    #[test]
    fn far_away_point_hits_nothing() {
        let geometry = LatticeGeometry::new(10, 0.011).unwrap();
        for x in [5.0, -5.0] {
            let far = Point3::new(x, 0.0, 0.0);
            assert!(geometry.cells_within(far, 0.025).is_empty());
        }
    }

    #[test]
    fn degenerate_inputs_hit_nothing() {
        let geometry = LatticeGeometry::new(10, 0.011).unwrap();
        let origin = Point3::default();
        assert!(geometry.cells_within(origin, 0.0).is_empty());
        assert!(geometry.cells_within(origin, f64::NAN).is_empty());
        let unbounded = Point3::new(f64::INFINITY, 0.0, 0.0);
        assert!(geometry.cells_within(unbounded, 0.1).is_empty());
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        assert!(LatticeGeometry::new(0, 0.011).is_err());
        assert!(LatticeGeometry::new(10, -1.0).is_err());
    }
}
