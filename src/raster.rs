use crate::{signed_area2, BBox, GridMut, Point, Scalar};

/// Triangle scan converted into signed coverage counts
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RasterTriangle {
    /// Vertices in grid cell units, `x` selects the row and `y` the column
    pub vertices: [Point; 3],
}

impl RasterTriangle {
    pub fn new(vertices: [impl Into<Point>; 3]) -> Self {
        Self {
            vertices: vertices.map(Into::into),
        }
    }

    /// Signed area, positive triangles are counted with `+1`
    pub fn signed_area(&self) -> Scalar {
        signed_area2(self.vertices) / 2.0
    }

    /// Bounding box of the vertices
    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.vertices)
    }

    /// Accumulate coverage into the grid, see [`rasterize`]
    pub fn rasterize(&self, grid: impl GridMut) {
        rasterize(self.vertices, grid)
    }
}

/// Linear function vanishing on the directed edge `start -> end`
///
/// `w(x, y) = a * y - b * x + c`, stepping by `-b` along `x` and by `a`
/// along `y`.
#[derive(Debug, Clone, Copy)]
struct EdgeFn {
    a: Scalar,
    b: Scalar,
    c: Scalar,
}

impl EdgeFn {
    fn new(start: Point, end: Point) -> Self {
        let Point([dx, dy]) = end - start;
        Self {
            a: dx,
            b: dy,
            c: -dx * start.y() + dy * start.x(),
        }
    }

    fn eval(&self, point: Point) -> Scalar {
        self.a * point.y() - self.b * point.x() + self.c
    }
}

/// Add signed coverage of the triangle to the grid
///
/// Point `(x, y)` addresses the cell at row `x` and column `y`. The triangle
/// bounding box is clipped to the grid and sampled at unit steps from its
/// minimum corner, one sample per cell, each tested against the three edge
/// functions truncated toward zero. A cell with all values
/// non-negative gets `+1`, with all values non-positive gets `-1`, so triangles
/// of opposite winding cancel each other.
pub fn rasterize(vertices: [Point; 3], mut grid: impl GridMut) {
    if vertices.iter().any(|v| !v.is_finite()) {
        tracing::warn!(?vertices, "non-finite triangle ignored");
        return;
    }
    let shape = grid.shape();
    if shape.is_empty() {
        return;
    }
    let bounds = BBox::new(
        (0.0, 0.0),
        ((shape.rows - 1) as Scalar, (shape.cols - 1) as Scalar),
    );
    let Some(bbox) = BBox::from_points(&vertices).and_then(|bbox| bbox.intersect(bounds)) else {
        tracing::trace!(?vertices, "triangle outside of the grid");
        return;
    };

    tracing::trace!(?bbox, "rasterizing triangle");

    let [v0, v1, v2] = vertices;
    let edges = [EdgeFn::new(v1, v2), EdgeFn::new(v2, v0), EdgeFn::new(v0, v1)];
    // clipped box is non-negative, so truncation is floor
    let (row_start, row_end) = (bbox.min().x() as usize, bbox.max().x() as usize);
    let (col_start, col_end) = (bbox.min().y() as usize, bbox.max().y() as usize);
    // cell `(row_start + i, col_start + j)` is sampled at `bbox.min() + (i, j)`
    let mut w_row = edges.map(|edge| edge.eval(bbox.min()));

    let data = grid.data_mut();
    for row in row_start..=row_end {
        let mut w = w_row;
        for col in col_start..=col_end {
            let [w0, w1, w2] = w.map(Scalar::trunc);
            let cell = &mut data[shape.offset(row, col)];
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                *cell += 1.0;
            }
            if w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0 {
                *cell -= 1.0;
            }
            for (value, edge) in w.iter_mut().zip(&edges) {
                *value += edge.a;
            }
        }
        for (value, edge) in w_row.iter_mut().zip(&edges) {
            *value -= edge.b;
        }
    }
}
