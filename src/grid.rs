//! Row-major accumulator grids
//!
//! Distributors and the rasterizer only ever add into cells, they never clear
//! or read them back, so the caller decides how a grid is allocated, shared and
//! post-processed. Views check once, on construction, that the shape fits into
//! the buffer.
use crate::Scalar;
use std::{fmt, ops::Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape {
    /// Number of rows (first-axis bins)
    pub rows: usize,
    /// Number of columns (second-axis bins)
    pub cols: usize,
    /// How many elements we need to skip to get to the next row.
    pub row_stride: usize,
}

impl Shape {
    /// Contiguous row-major shape
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_stride: cols,
        }
    }

    #[inline]
    pub fn offset(&self, row: usize, col: usize) -> usize {
        row * self.row_stride + col
    }

    /// Range of the data occupied by the row
    #[inline]
    pub fn row_range(&self, row: usize) -> Range<usize> {
        let start = self.offset(row, 0);
        start..start + self.cols
    }

    /// Minimal length of the buffer holding this shape
    pub fn len(&self) -> usize {
        if self.rows == 0 || self.cols == 0 {
            0
        } else {
            (self.rows - 1) * self.row_stride + self.cols
        }
    }

    /// Shape does not contain any cells
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Number of cells
    pub fn size(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    pub fn nth(&self, n: usize) -> Option<(usize, usize)> {
        if self.cols == 0 {
            return None;
        }
        let row = n / self.cols;
        let col = n - row * self.cols;
        (row < self.rows).then_some((row, col))
    }

    fn validate(&self, len: usize) -> Result<(), GridError> {
        if self.rows > 1 && self.row_stride < self.cols {
            return Err(GridError::InvalidStride {
                cols: self.cols,
                row_stride: self.row_stride,
            });
        }
        if self.len() > len {
            return Err(GridError::ShapeMismatch {
                required: self.len(),
                actual: len,
            });
        }
        Ok(())
    }
}

pub trait Grid {
    fn data(&self) -> &[Scalar];

    fn shape(&self) -> Shape;

    fn rows(&self) -> usize {
        self.shape().rows
    }

    fn cols(&self) -> usize {
        self.shape().cols
    }

    fn get(&self, row: usize, col: usize) -> Option<Scalar> {
        let shape = self.shape();
        if row >= shape.rows || col >= shape.cols {
            return None;
        }
        self.data().get(shape.offset(row, col)).copied()
    }

    fn row(&self, row: usize) -> Option<&[Scalar]> {
        let shape = self.shape();
        if row >= shape.rows {
            return None;
        }
        self.data().get(shape.row_range(row))
    }

    fn as_ref(&self) -> GridRef<'_> {
        GridRef {
            shape: self.shape(),
            data: self.data(),
        }
    }

    fn iter(&self) -> GridIter<'_> {
        GridIter {
            index: 0,
            shape: self.shape(),
            data: self.data(),
        }
    }

    /// Sum of all cells, i.e. the total deposited mass
    fn sum(&self) -> Scalar {
        self.iter().sum()
    }
}

pub struct GridIter<'a> {
    index: usize,
    shape: Shape,
    data: &'a [Scalar],
}

impl GridIter<'_> {
    /// Position `(row, col)` of the next cell
    pub fn position(&self) -> (usize, usize) {
        self.shape.nth(self.index).unwrap_or((self.shape.rows, 0))
    }
}

impl Iterator for GridIter<'_> {
    type Item = Scalar;

    fn next(&mut self) -> Option<Self::Item> {
        let (row, col) = self.shape.nth(self.index)?;
        self.index += 1;
        self.data.get(self.shape.offset(row, col)).copied()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let size = self.shape.size().saturating_sub(self.index);
        (size, Some(size))
    }
}

pub trait GridMut: Grid {
    fn data_mut(&mut self) -> &mut [Scalar];

    fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut Scalar> {
        let shape = self.shape();
        if row >= shape.rows || col >= shape.cols {
            return None;
        }
        self.data_mut().get_mut(shape.offset(row, col))
    }

    fn row_mut(&mut self, row: usize) -> Option<&mut [Scalar]> {
        let shape = self.shape();
        if row >= shape.rows {
            return None;
        }
        self.data_mut().get_mut(shape.row_range(row))
    }

    fn as_mut(&mut self) -> GridMutRef<'_> {
        GridMutRef {
            shape: self.shape(),
            data: self.data_mut(),
        }
    }

    fn clear(&mut self) {
        let shape = self.shape();
        let data = self.data_mut();
        for row in 0..shape.rows {
            data[shape.row_range(row)].fill(0.0);
        }
    }
}

/// Zero initialized grid owning its buffer
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GridOwned {
    shape: Shape,
    data: Vec<Scalar>,
}

impl GridOwned {
    pub fn new(rows: usize, cols: usize) -> Self {
        let shape = Shape::new(rows, cols);
        Self {
            shape,
            data: vec![0.0; shape.size()],
        }
    }

    /// Wrap existing buffer, it must hold at least `shape.len()` cells
    pub fn from_vec(shape: Shape, data: Vec<Scalar>) -> Result<Self, GridError> {
        shape.validate(data.len())?;
        Ok(Self { shape, data })
    }

    pub fn to_vec(self) -> Vec<Scalar> {
        self.data
    }

    /// Raw native-endian bytes of the underlying buffer
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Rows as nested JSON arrays
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<serde_json::Value, GridError> {
        let rows: Vec<&[Scalar]> = (0..self.shape.rows)
            .filter_map(|row| self.row(row))
            .collect();
        Ok(serde_json::to_value(rows)?)
    }
}

impl fmt::Debug for GridOwned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for row in 0..self.shape.rows {
            list.entry(&self.row(row).unwrap_or_default());
        }
        list.finish()
    }
}

impl Grid for GridOwned {
    fn shape(&self) -> Shape {
        self.shape
    }

    fn data(&self) -> &[Scalar] {
        &self.data
    }
}

impl GridMut for GridOwned {
    fn data_mut(&mut self) -> &mut [Scalar] {
        &mut self.data
    }
}

#[derive(Clone, Copy)]
pub struct GridRef<'a> {
    shape: Shape,
    data: &'a [Scalar],
}

impl<'a> GridRef<'a> {
    pub fn new(shape: Shape, data: &'a [Scalar]) -> Result<Self, GridError> {
        shape.validate(data.len())?;
        Ok(Self { shape, data })
    }
}

impl Grid for GridRef<'_> {
    fn shape(&self) -> Shape {
        self.shape
    }

    fn data(&self) -> &[Scalar] {
        self.data
    }
}

/// Mutable view over a caller owned buffer
pub struct GridMutRef<'a> {
    shape: Shape,
    data: &'a mut [Scalar],
}

impl<'a> GridMutRef<'a> {
    pub fn new(shape: Shape, data: &'a mut [Scalar]) -> Result<Self, GridError> {
        shape.validate(data.len())?;
        Ok(Self { shape, data })
    }
}

impl Grid for GridMutRef<'_> {
    fn shape(&self) -> Shape {
        self.shape
    }

    fn data(&self) -> &[Scalar] {
        self.data
    }
}

impl GridMut for GridMutRef<'_> {
    fn data_mut(&mut self) -> &mut [Scalar] {
        self.data
    }
}

impl<G> Grid for &G
where
    G: Grid + ?Sized,
{
    fn shape(&self) -> Shape {
        (**self).shape()
    }

    fn data(&self) -> &[Scalar] {
        (**self).data()
    }
}

impl<G> Grid for &mut G
where
    G: Grid + ?Sized,
{
    fn shape(&self) -> Shape {
        (**self).shape()
    }

    fn data(&self) -> &[Scalar] {
        (**self).data()
    }
}

impl<G> GridMut for &mut G
where
    G: GridMut + ?Sized,
{
    fn data_mut(&mut self) -> &mut [Scalar] {
        (**self).data_mut()
    }
}

/// Error while constructing a grid view
#[derive(Debug)]
pub enum GridError {
    /// Buffer is too short for the requested shape
    ShapeMismatch { required: usize, actual: usize },
    /// Rows would overlap
    InvalidStride { cols: usize, row_stride: usize },
    /// JSON error
    #[cfg(feature = "serde")]
    Json(serde_json::Error),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GridError::{:?}", self)
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for GridError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error)
    }
}

impl std::error::Error for GridError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_shape() {
        let shape = Shape {
            rows: 3,
            cols: 2,
            row_stride: 4,
        };
        assert_eq!(shape.len(), 10);
        assert_eq!(shape.offset(2, 1), 9);
        assert_eq!(shape.row_range(1), 4..6);
        assert_eq!(shape.nth(5), Some((2, 1)));
        assert_eq!(shape.nth(6), None);
        assert!(Shape::new(0, 5).is_empty());
        assert_eq!(Shape::new(0, 5).len(), 0);
    }

    #[test]
    fn test_view_validation() {
        let mut data = vec![0.0; 10];
        assert!(GridMutRef::new(Shape::new(2, 5), &mut data).is_ok());
        assert!(matches!(
            GridMutRef::new(Shape::new(3, 4), &mut data),
            Err(GridError::ShapeMismatch {
                required: 12,
                actual: 10
            })
        ));
        let overlapping = Shape {
            rows: 2,
            cols: 4,
            row_stride: 3,
        };
        assert!(matches!(
            GridRef::new(overlapping, &data),
            Err(GridError::InvalidStride { .. })
        ));
        assert!(GridOwned::from_vec(Shape::new(2, 2), vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_strided_view() -> Result<(), GridError> {
        // 2x2 window into a 3x3 buffer
        let mut data: Vec<Scalar> = (0..9).map(|v| v as Scalar).collect();
        let shape = Shape {
            rows: 2,
            cols: 2,
            row_stride: 3,
        };
        let mut grid = GridMutRef::new(shape, &mut data)?;
        assert_eq!(grid.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(grid.get(1, 2), None);
        assert_eq!(grid.iter().collect::<Vec<_>>(), vec![0.0, 1.0, 3.0, 4.0]);
        assert_approx_eq!(grid.sum(), 8.0);

        *grid.get_mut(0, 1).unwrap() += 10.0;
        grid.clear();
        assert_approx_eq!(grid.sum(), 0.0);
        // cells outside of the window are untouched
        assert_eq!(data, vec![0.0, 0.0, 2.0, 0.0, 0.0, 5.0, 6.0, 7.0, 8.0]);
        Ok(())
    }

    #[test]
    fn test_owned() {
        let mut grid = GridOwned::new(2, 3);
        grid.row_mut(1).unwrap()[2] = 1.5;
        assert_eq!(grid.get(1, 2), Some(1.5));
        assert!(grid.row_mut(2).is_none());
        assert_eq!(grid.as_bytes().len(), 6 * std::mem::size_of::<Scalar>());
        assert_eq!(format!("{:?}", grid), "[[0.0, 0.0, 0.0], [0.0, 0.0, 1.5]]");
        assert_eq!(grid.to_vec(), vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.5]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_to_json() -> Result<(), GridError> {
        let mut grid = GridOwned::new(2, 2);
        *grid.get_mut(0, 1).unwrap() = 0.5;
        assert_eq!(grid.to_json()?, serde_json::json!([[0.0, 0.5], [0.0, 0.0]]));
        Ok(())
    }
}
