use std::{
    fmt,
    ops::{Add, Mul, Sub},
};

pub type Scalar = f64;
pub const EPSILON: f64 = f64::EPSILON;

/// Tolerance used when deciding whether two frequency coordinates coincide
pub const TOL: Scalar = 1.0e-6;

/// Format floats in a compact way
pub fn scalar_fmt(f: &mut fmt::Formatter<'_>, value: Scalar) -> fmt::Result {
    let value_abs = value.abs();
    if value_abs.fract() < EPSILON {
        write!(f, "{}", value.trunc() as i64)
    } else if value_abs > 9999.0 || value_abs <= 0.0001 {
        write!(f, "{:.3e}", value)
    } else {
        let ten: Scalar = 10.0;
        let round = ten.powi(6 - (value_abs.trunc() + 1.0).log10().ceil() as i32);
        write!(f, "{}", (value * round).round() / round)
    }
}

/// Value representing a 2D point or vector.
///
/// For the distributors `x` is the first-axis coordinate (grid row) and `y`
/// is the second-axis coordinate (grid column).
#[derive(Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point(pub [Scalar; 2]);

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Point([x, y]) = self;
        scalar_fmt(f, *x)?;
        write!(f, ",")?;
        scalar_fmt(f, *y)?;
        Ok(())
    }
}

impl Point {
    #[inline]
    pub fn new(x: Scalar, y: Scalar) -> Self {
        Self([x, y])
    }

    /// Get `x` component of the point
    #[inline]
    pub fn x(self) -> Scalar {
        self.0[0]
    }

    /// Get `y` component of the point
    #[inline]
    pub fn y(self) -> Scalar {
        self.0[1]
    }

    /// Cross product between two vectors
    pub fn cross(self, other: Self) -> Scalar {
        let Self([x0, y0]) = self;
        let Self([x1, y1]) = other;
        x0 * y1 - y0 * x1
    }

    /// Both coordinates are finite
    pub fn is_finite(self) -> bool {
        let Self([x, y]) = self;
        x.is_finite() && y.is_finite()
    }
}

impl From<(Scalar, Scalar)> for Point {
    #[inline]
    fn from(xy: (Scalar, Scalar)) -> Self {
        Self([xy.0, xy.1])
    }
}

impl From<[Scalar; 2]> for Point {
    #[inline]
    fn from(xy: [Scalar; 2]) -> Self {
        Self(xy)
    }
}

impl Mul<Point> for Scalar {
    type Output = Point;

    #[inline]
    fn mul(self, other: Point) -> Self::Output {
        let Point([x, y]) = other;
        Point([self * x, self * y])
    }
}

impl Add for Point {
    type Output = Point;

    #[inline]
    fn add(self, other: Point) -> Self::Output {
        let Point([x0, y0]) = self;
        let Point([x1, y1]) = other;
        Point([x0 + x1, y0 + y1])
    }
}

impl Sub for Point {
    type Output = Point;

    #[inline]
    fn sub(self, other: Point) -> Self::Output {
        let Point([x0, y0]) = self;
        let Point([x1, y1]) = other;
        Point([x0 - x1, y0 - y1])
    }
}

/// Signed double area of the triangle, positive for counter-clockwise winding
pub fn signed_area2(vertices: [Point; 3]) -> Scalar {
    let [p0, p1, p2] = vertices;
    (p1 - p0).cross(p2 - p0)
}

/// Bounding box with sides directed along the axes
#[derive(Clone, Copy, PartialEq)]
pub struct BBox {
    /// Point with minimal x and y values
    min: Point,
    /// Point with maximum x and y values
    max: Point,
}

impl BBox {
    /// Construct bounding box which includes points `p0` and `p1`
    pub fn new(p0: impl Into<Point>, p1: impl Into<Point>) -> Self {
        let Point([x0, y0]) = p0.into();
        let Point([x1, y1]) = p1.into();
        let (x0, x1) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (y0, y1) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self {
            min: Point([x0, y0]),
            max: Point([x1, y1]),
        }
    }

    /// Smallest bounding box containing all the points
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        Some(
            rest.iter()
                .fold(BBox::new(*first, *first), |bbox, point| bbox.extend(*point)),
        )
    }

    /// Point with minimum values of x and y coordinates
    #[inline]
    pub fn min(&self) -> Point {
        self.min
    }

    /// Point with maximum values of x and y coordinates
    #[inline]
    pub fn max(&self) -> Point {
        self.max
    }

    /// Extend bounding box so it would contain provided point
    pub fn extend(&self, point: Point) -> Self {
        let Point([x, y]) = point;
        let Point([x0, y0]) = self.min;
        let Point([x1, y1]) = self.max;
        Self {
            min: Point([x0.min(x), y0.min(y)]),
            max: Point([x1.max(x), y1.max(y)]),
        }
    }

    /// Overlap of two boxes, `None` if they are disjoint
    pub fn intersect(&self, other: BBox) -> Option<BBox> {
        let min = Point::new(
            self.min.x().max(other.min.x()),
            self.min.y().max(other.min.y()),
        );
        let max = Point::new(
            self.max.x().min(other.max.x()),
            self.max.y().min(other.max.y()),
        );
        (min.x() <= max.x() && min.y() <= max.y()).then_some(BBox { min, max })
    }
}

impl fmt::Debug for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BBox {:?} .. {:?}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_bbox() {
        let points = [
            Point::new(3.0, -1.0),
            Point::new(0.5, 2.0),
            Point::new(1.0, 4.5),
        ];
        let bbox = BBox::from_points(&points).unwrap();
        assert_eq!(bbox.min(), Point::new(0.5, -1.0));
        assert_eq!(bbox.max(), Point::new(3.0, 4.5));
        assert_eq!(format!("{:?}", bbox), "BBox 0.5,-1 .. 3,4.5");
        assert!(BBox::from_points(&[]).is_none());

        let clip = BBox::new((0.0, 0.0), (1.0, 3.0));
        let inter = bbox.intersect(clip).unwrap();
        assert_eq!(inter.min(), Point::new(0.5, 0.0));
        assert_eq!(inter.max(), Point::new(1.0, 3.0));

        let far = BBox::new((10.0, 10.0), (11.0, 11.0));
        assert!(bbox.intersect(far).is_none());
        let corner = bbox.intersect(BBox::new((3.0, 4.5), (5.0, 6.0))).unwrap();
        assert_eq!(corner.min(), corner.max());
    }

    #[test]
    fn test_signed_area() {
        let ccw = [
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(0.0, 2.0),
        ];
        assert_approx_eq!(signed_area2(ccw), 4.0);
        let [p0, p1, p2] = ccw;
        assert_approx_eq!(signed_area2([p0, p2, p1]), -4.0);
        assert_eq!(format!("{:?}", Point::new(1.0, 0.25)), "1,0.25");
    }
}
