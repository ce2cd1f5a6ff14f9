//! Shared geometric primitives.

/// A point in 2-D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A point with an optional third coordinate.
///
/// The file format omits the Z value entirely rather than writing `0`, and a
/// written `0` means something different from an absent one (placement
/// rotation, model offsets), so presence is tracked explicitly. Equality
/// includes `z_present`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub z_present: bool,
}

impl Point3 {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            z_present: false,
        }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            z_present: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(b.distance(a), 5.0);
    }

    #[test]
    fn z_presence_is_part_of_identity() {
        assert_ne!(Point3::new(1.0, 2.0), Point3::with_z(1.0, 2.0, 0.0));
        assert_eq!(
            Point3::with_z(1.0, 2.0, 90.0),
            Point3::with_z(1.0, 2.0, 90.0)
        );
    }
}
