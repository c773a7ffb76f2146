use crate::{
    distribute_1d,
    kernel::{bin_index, split_point, sweep, Footprint, Outcome, Side, Strip, StripSink},
    GridMut, Point, Scalar,
};

/// Triangle with uniform density over its area
///
/// Projected onto the first axis (`x`, grid rows) its density becomes the
/// triangular density of [`crate::Triangle1D`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triangle2D {
    pub vertices: [Point; 3],
    /// Total volume
    pub amplitude: Scalar,
}

impl Triangle2D {
    pub fn new(vertices: [impl Into<Point>; 3], amplitude: Scalar) -> Self {
        Self {
            vertices: vertices.map(Into::into),
            amplitude,
        }
    }

    /// Add triangle volume to the grid, see [`distribute_2d`]
    pub fn distribute(&self, grid: impl GridMut) -> Outcome {
        distribute_2d(self.vertices, self.amplitude, grid)
    }
}

/// Add triangle volume to the 2D histogram
///
/// `x` of every vertex selects a row and `y` a column. Each row receives the
/// part of the triangle that lies in the corresponding first-axis bin, spread
/// over the columns with [`distribute_1d`]. Volume outside of the grid is
/// dropped. The outcome reflects losses on both axes.
pub fn distribute_2d(vertices: [Point; 3], amplitude: Scalar, mut grid: impl GridMut) -> Outcome {
    if !amplitude.is_finite() || vertices.iter().any(|p| !p.is_finite()) {
        tracing::warn!(?vertices, amplitude, "non-finite triangle ignored");
        return Outcome::Skipped;
    }
    let rows = grid.rows();
    let ys = vertices.map(Point::y);
    let mut tally = Tally::default();
    let outcome = match Footprint::classify(vertices, |p| p.x()) {
        Footprint::Point(x) => split_point(x, rows, |row, weight| {
            if let Some(spec) = grid.row_mut(row) {
                tally.record(distribute_1d(ys, amplitude * weight, spec));
            }
        }),
        Footprint::Bin(bin) => match bin_index(bin, rows) {
            Some(row) => {
                if let Some(spec) = grid.row_mut(row) {
                    tally.record(distribute_1d(ys, amplitude, spec));
                }
                Outcome::Collapsed
            }
            None => Outcome::Skipped,
        },
        Footprint::Span(sorted) => {
            let mut columns = Columns::new(sorted, &mut grid, &mut tally);
            sweep(sorted.map(|p| p.x()), amplitude, rows, &mut columns)
        }
    };
    tally.finish(outcome)
}

/// Outcomes of the second-axis deposits
#[derive(Debug, Default)]
struct Tally {
    written: bool,
    lost: bool,
}

impl Tally {
    fn record(&mut self, outcome: Outcome) {
        self.written |= outcome.is_written();
        self.lost |= matches!(outcome, Outcome::Clipped | Outcome::Skipped);
    }

    fn finish(self, outcome: Outcome) -> Outcome {
        if outcome == Outcome::Skipped || !self.written {
            Outcome::Skipped
        } else if self.lost {
            Outcome::Clipped
        } else {
            outcome
        }
    }
}

/// Line `y = y0 + slope * (x - x0)` through a triangle edge
#[derive(Debug, Clone, Copy)]
struct Edge {
    x0: Scalar,
    y0: Scalar,
    slope: Scalar,
}

impl Edge {
    /// `p0.x() <= p1.x()`, edge of zero width gets zero slope
    fn new(p0: Point, p1: Point) -> Self {
        let dx = p1.x() - p0.x();
        let slope = if dx > 0.0 { (p1.y() - p0.y()) / dx } else { 0.0 };
        Self {
            x0: p0.x(),
            y0: p0.y(),
            slope,
        }
    }

    #[inline]
    fn at(&self, x: Scalar) -> Scalar {
        self.y0 + self.slope * (x - self.x0)
    }
}

/// Second-axis coordinates of the two active edges at a strip boundary
#[derive(Debug, Clone, Copy)]
struct Boundary {
    short: Scalar,
    long: Scalar,
    /// `|long - short|`
    gap: Scalar,
}

/// Turns first-axis strips into second-axis triangles
struct Columns<'a, G> {
    grid: &'a mut G,
    tally: &'a mut Tally,
    /// Edge between the leftmost and the rightmost vertices
    long: Edge,
    rising: Edge,
    falling: Edge,
    /// Right boundary of the previous strip
    carry: Option<Boundary>,
}

impl<'a, G: GridMut> Columns<'a, G> {
    fn new(sorted: [Point; 3], grid: &'a mut G, tally: &'a mut Tally) -> Self {
        let [p0, p1, p2] = sorted;
        Self {
            grid,
            tally,
            long: Edge::new(p0, p2),
            rising: Edge::new(p0, p1),
            falling: Edge::new(p1, p2),
            carry: None,
        }
    }

    fn short(&self, side: Side) -> Edge {
        match side {
            Side::Rising => self.rising,
            Side::Falling => self.falling,
        }
    }

    fn boundary(&self, side: Side, x: Scalar) -> Boundary {
        let short = self.short(side).at(x);
        let long = self.long.at(x);
        Boundary {
            short,
            long,
            gap: (long - short).abs(),
        }
    }

    /// Advance boundary by one bin, edges diverge on the rising side and
    /// converge on the falling one
    fn advance(&self, side: Side, boundary: Boundary) -> Boundary {
        let short = self.short(side);
        let abs_slope_diff = (self.long.slope - short.slope).abs();
        let gap = match side {
            Side::Rising => boundary.gap + abs_slope_diff,
            Side::Falling => boundary.gap - abs_slope_diff,
        };
        Boundary {
            short: boundary.short + short.slope,
            long: boundary.long + self.long.slope,
            gap,
        }
    }

    /// The strip is a trapezoid with parallel sides `lo.gap` and `hi.gap`,
    /// its diagonal splits it into two triangles with areas proportional to them.
    fn deposit(&mut self, row: usize, mass: Scalar, lo: Boundary, hi: Boundary) {
        let Some(spec) = self.grid.row_mut(row) else {
            return;
        };
        let lower = [lo.short, hi.long, hi.short];
        let upper = [lo.short, hi.long, lo.long];
        let denom = lo.gap + hi.gap;
        if denom > 0.0 {
            if hi.gap > 0.0 {
                let lower_mass = mass * hi.gap / denom;
                self.tally.record(distribute_1d(lower, lower_mass, spec));
            }
            if lo.gap > 0.0 {
                let upper_mass = mass * lo.gap / denom;
                self.tally.record(distribute_1d(upper, upper_mass, spec));
            }
        } else {
            self.tally.record(distribute_1d(lower, mass, spec));
        }
    }
}

impl<G: GridMut> StripSink for Columns<'_, G> {
    fn strip(&mut self, strip: Strip) {
        let lo = match (strip.interior, self.carry) {
            (true, Some(carry)) => carry,
            _ => self.boundary(strip.side, strip.lo),
        };
        let hi = if strip.interior {
            self.advance(strip.side, lo)
        } else {
            self.boundary(strip.side, strip.hi)
        };
        self.carry = Some(hi);
        self.deposit(strip.bin, strip.mass, lo, hi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_approx_eq, Grid, GridMutRef, GridOwned, Shape};
    use proptest::prelude::*;

    fn row_sums(grid: &GridOwned) -> Vec<Scalar> {
        (0..grid.rows())
            .map(|row| grid.row(row).unwrap().iter().sum())
            .collect()
    }

    fn col_sums(grid: &GridOwned) -> Vec<Scalar> {
        (0..grid.cols())
            .map(|col| (0..grid.rows()).filter_map(|row| grid.get(row, col)).sum())
            .collect()
    }

    fn marginal(freq: [Scalar; 3], amplitude: Scalar, bins: usize) -> Vec<Scalar> {
        let mut spec = vec![0.0; bins];
        distribute_1d(freq, amplitude, &mut spec);
        spec
    }

    fn assert_all_close(actual: &[Scalar], expected: &[Scalar], tol: Scalar) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert_approx_eq!(*a, *e, tol);
        }
    }

    #[test]
    fn test_marginals() {
        let vertices = [(0.7, 1.3), (5.2, 6.6), (3.1, 0.4)];
        let triangle = Triangle2D::new(vertices, 4.0);
        let mut grid = GridOwned::new(8, 9);
        assert_eq!(triangle.distribute(&mut grid), Outcome::Deposited);
        assert_approx_eq!(grid.sum(), 4.0, 1e-9);

        // rows hold exactly the first-axis histogram
        let xs = triangle.vertices.map(Point::x);
        assert_all_close(&row_sums(&grid), &marginal(xs, 4.0, 8), 1e-9);
        // sub-triangles tile the triangle, so columns add up to the second-axis one
        let ys = triangle.vertices.map(Point::y);
        assert_all_close(&col_sums(&grid), &marginal(ys, 4.0, 9), 1e-9);
    }

    #[test]
    fn test_long_triangle() {
        // many interior rows on both sides of the peak
        let triangle = Triangle2D::new([(1.2, 3.3), (60.7, 20.1), (30.4, 55.9)], 10.0);
        let mut grid = GridOwned::new(64, 64);
        assert_eq!(triangle.distribute(&mut grid), Outcome::Deposited);
        assert_approx_eq!(grid.sum(), 10.0, 1e-9);
        let xs = triangle.vertices.map(Point::x);
        let ys = triangle.vertices.map(Point::y);
        assert_all_close(&row_sums(&grid), &marginal(xs, 10.0, 64), 1e-9);
        assert_all_close(&col_sums(&grid), &marginal(ys, 10.0, 64), 1e-9);
        assert!(grid.iter().all(|v| v >= -1e-12));
    }

    #[test]
    fn test_peak_in_last_row() {
        // middle and right vertices share the last row
        let triangle = Triangle2D::new([(0.2, 1.0), (3.4, 5.0), (3.8, 2.0)], 2.0);
        let mut grid = GridOwned::new(4, 6);
        assert_eq!(triangle.distribute(&mut grid), Outcome::Deposited);
        assert_approx_eq!(grid.sum(), 2.0, 1e-9);
        let ys = triangle.vertices.map(Point::y);
        assert_all_close(&col_sums(&grid), &marginal(ys, 2.0, 6), 1e-9);

        // left and middle vertices share the first row
        let triangle = Triangle2D::new([(0.2, 1.0), (0.6, 5.0), (3.8, 2.0)], 2.0);
        let mut grid = GridOwned::new(4, 6);
        triangle.distribute(&mut grid);
        assert_approx_eq!(grid.sum(), 2.0, 1e-9);
        let ys = triangle.vertices.map(Point::y);
        assert_all_close(&col_sums(&grid), &marginal(ys, 2.0, 6), 1e-9);
    }

    #[test]
    fn test_vertical_edge() {
        let triangle = Triangle2D::new([(1.0, 1.0), (1.0, 5.0), (4.0, 3.0)], 3.0);
        let mut grid = GridOwned::new(6, 6);
        assert_eq!(triangle.distribute(&mut grid), Outcome::Deposited);
        assert!(grid.iter().all(|v| v.is_finite()));
        assert_approx_eq!(grid.sum(), 3.0, 1e-9);
        let ys = triangle.vertices.map(Point::y);
        assert_all_close(&col_sums(&grid), &marginal(ys, 3.0, 6), 1e-9);
    }

    #[test]
    fn test_point_rows() {
        let ys = [1.5, 4.0, 2.5];
        let mut grid = GridOwned::new(4, 6);
        let vertices = [(2.5, ys[0]), (2.5, ys[1]), (2.5, ys[2])].map(Point::from);
        let outcome = distribute_2d(vertices, 2.0, &mut grid);
        assert_eq!(outcome, Outcome::Collapsed);
        assert_all_close(grid.row(2).unwrap(), &marginal(ys, 2.0, 6), 1e-12);
        assert_approx_eq!(grid.sum(), 2.0, 1e-12);

        let mut grid = GridOwned::new(4, 6);
        let vertices = [(2.2, ys[0]), (2.2, ys[1]), (2.2, ys[2])].map(Point::from);
        distribute_2d(vertices, 2.0, &mut grid);
        assert_all_close(grid.row(1).unwrap(), &marginal(ys, 0.6, 6), 1e-9);
        assert_all_close(grid.row(2).unwrap(), &marginal(ys, 1.4, 6), 1e-9);
        assert_approx_eq!(grid.sum(), 2.0, 1e-9);
    }

    #[test]
    fn test_point_rows_at_edges() {
        let ys = [1.5, 4.0, 2.5];
        let mut grid = GridOwned::new(4, 6);
        let vertices = [(0.2, ys[0]), (0.2, ys[1]), (0.2, ys[2])].map(Point::from);
        assert_eq!(distribute_2d(vertices, 2.0, &mut grid), Outcome::Clipped);
        assert_all_close(grid.row(0).unwrap(), &marginal(ys, 1.4, 6), 1e-9);
        assert_approx_eq!(grid.sum(), 1.4, 1e-9);

        let mut grid = GridOwned::new(4, 6);
        let vertices = [(3.9, ys[0]), (3.9, ys[1]), (3.9, ys[2])].map(Point::from);
        assert_eq!(distribute_2d(vertices, 2.0, &mut grid), Outcome::Clipped);
        assert_all_close(grid.row(3).unwrap(), &marginal(ys, 1.2, 6), 1e-9);
        assert_approx_eq!(grid.sum(), 1.2, 1e-9);
    }

    #[test]
    fn test_collinear() {
        // all edges on one line, every strip has zero width on the second axis
        let vertices = [(1.25, 1.25), (3.75, 3.75), (6.25, 6.25)].map(Point::from);
        let mut grid = GridOwned::new(8, 8);
        assert_eq!(distribute_2d(vertices, 2.0, &mut grid), Outcome::Deposited);
        assert_approx_eq!(grid.sum(), 2.0, 1e-9);
        let xs = vertices.map(Point::x);
        assert_all_close(&row_sums(&grid), &marginal(xs, 2.0, 8), 1e-9);
        for row in 0..8 {
            for col in 0..8 {
                if row != col {
                    assert_eq!(grid.get(row, col), Some(0.0));
                }
            }
        }
    }

    #[test]
    fn test_single_row() {
        let vertices = [(3.1, 0.5), (3.9, 2.5), (3.5, 5.2)].map(Point::from);
        let mut grid = GridOwned::new(5, 6);
        assert_eq!(distribute_2d(vertices, 1.5, &mut grid), Outcome::Collapsed);
        assert_all_close(
            grid.row(3).unwrap(),
            &marginal(vertices.map(Point::y), 1.5, 6),
            1e-12,
        );
        assert_approx_eq!(grid.sum(), 1.5, 1e-12);
    }

    #[test]
    fn test_clipped() {
        // first axis
        let triangle = Triangle2D::new([(-1.5, 1.0), (2.5, 3.5), (6.5, 2.0)], 3.0);
        let mut grid = GridOwned::new(5, 5);
        assert_eq!(triangle.distribute(&mut grid), Outcome::Clipped);
        let xs = triangle.vertices.map(Point::x);
        let expected = marginal(xs, 3.0, 5);
        assert_all_close(&row_sums(&grid), &expected, 1e-9);
        assert!(grid.sum() < 3.0);

        // second axis only
        let triangle = Triangle2D::new([(0.5, -2.0), (2.5, 3.5), (4.5, 2.0)], 3.0);
        let mut grid = GridOwned::new(5, 5);
        assert_eq!(triangle.distribute(&mut grid), Outcome::Clipped);
        assert!(grid.sum() < 3.0);
    }

    #[test]
    fn test_skipped() {
        let mut grid = GridOwned::new(4, 4);
        let outside_rows = Triangle2D::new([(4.0, 1.0), (6.0, 2.0), (5.0, 3.0)], 1.0);
        assert_eq!(outside_rows.distribute(&mut grid), Outcome::Skipped);
        let outside_cols = Triangle2D::new([(1.0, 5.0), (3.0, 6.0), (2.0, 7.0)], 1.0);
        assert_eq!(outside_cols.distribute(&mut grid), Outcome::Skipped);
        let broken = Triangle2D::new([(1.0, Scalar::NAN), (3.0, 6.0), (2.0, 7.0)], 1.0);
        assert_eq!(broken.distribute(&mut grid), Outcome::Skipped);
        assert_eq!(grid.sum(), 0.0);
    }

    #[test]
    fn test_strided_view() {
        // writing through a window of a bigger buffer
        let mut data = vec![0.0; 6 * 8];
        let shape = Shape {
            rows: 4,
            cols: 5,
            row_stride: 8,
        };
        let grid = GridMutRef::new(shape, &mut data).unwrap();
        let triangle = Triangle2D::new([(0.6, 0.7), (3.3, 2.2), (1.9, 4.4)], 1.0);
        assert_eq!(triangle.distribute(grid), Outcome::Deposited);
        assert_approx_eq!(data.iter().sum::<Scalar>(), 1.0, 1e-9);
        for row in 0..6 {
            assert!(data[row * 8 + 5..row * 8 + 8].iter().all(|v| *v == 0.0));
        }
    }

    proptest! {
        #[test]
        fn volume_is_conserved(
            x in prop::array::uniform3(0.5..15.5f64),
            y in prop::array::uniform3(0.5..11.5f64),
            amplitude in 0.01..100.0f64,
        ) {
            let vertices = [0, 1, 2].map(|i| Point::new(x[i], y[i]));
            let mut grid = GridOwned::new(16, 12);
            distribute_2d(vertices, amplitude, &mut grid);
            prop_assert!((grid.sum() - amplitude).abs() < 1e-6 * amplitude.max(1.0));
            let xs = vertices.map(Point::x);
            for (actual, expected) in row_sums(&grid).iter().zip(marginal(xs, amplitude, 16)) {
                prop_assert!((actual - expected).abs() < 1e-6 * amplitude.max(1.0));
            }
        }
    }
}
