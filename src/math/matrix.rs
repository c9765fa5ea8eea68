use std::fmt;
use std::ops::{Index, IndexMut};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NnError, Result};

/// Row and column count of a matrix, printed as `RxC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn new(rows: usize, cols: usize) -> Shape {
        Shape { rows, cols }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Dense row-major matrix that owns its buffer.
///
/// An owned matrix is always packed, so its stride equals `cols`. Borrowed,
/// possibly strided access goes through [`MatrixView`].
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Allocates a zero-filled `rows x cols` matrix.
    ///
    /// Fails with [`NnError::Allocation`] if the element count overflows or
    /// the buffer cannot be reserved.
    pub fn allocate(rows: usize, cols: usize) -> Result<Matrix> {
        let len = rows
            .checked_mul(cols)
            .ok_or(NnError::Allocation { rows, cols })?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| NnError::Allocation { rows, cols })?;
        data.resize(len, 0.0);
        Ok(Matrix { rows, cols, data })
    }

    /// Builds a matrix from nested rows. All rows must have the same length.
    pub fn from_data(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let rows = data.len();
        let cols = data.first().map_or(0, Vec::len);
        let mut res = Matrix::allocate(rows, cols)?;

        for (i, row) in data.iter().enumerate() {
            if row.len() != cols {
                return Err(NnError::shape(
                    "from_data",
                    Shape::new(1, row.len()),
                    Shape::new(1, cols),
                ));
            }
            res.data[i * cols..(i + 1) * cols].copy_from_slice(row);
        }

        Ok(res)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn stride(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self[(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self[(row, col)] = value;
    }

    /// Borrows the whole matrix as a view.
    pub fn view(&self) -> MatrixView<'_> {
        MatrixView {
            rows: self.rows,
            cols: self.cols,
            stride: self.cols,
            data: &self.data,
        }
    }

    /// Borrows row `row` as a `1 x cols` view.
    pub fn row_view(&self, row: usize) -> Result<MatrixView<'_>> {
        self.view().row_view(row)
    }

    /// Copies the matrix out as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows)
            .map(|r| self.data[r * self.cols..(r + 1) * self.cols].to_vec())
            .collect()
    }

    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Sets every element to a value drawn uniformly from `[min, max]`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R, min: f64, max: f64) -> Result<()> {
        if !(min.is_finite() && max.is_finite() && min <= max) {
            return Err(NnError::config(format!(
                "random range [{min}, {max}] is empty or not finite"
            )));
        }
        for x in &mut self.data {
            *x = rng.gen_range(min..=max);
        }
        Ok(())
    }

    /// Element-wise copy of `src` into `self`; shapes must match exactly.
    pub fn copy_from<'a>(&mut self, src: impl Into<MatrixView<'a>>) -> Result<()> {
        let src = src.into();
        if self.shape() != src.shape() {
            return Err(NnError::shape("copy", self.shape(), src.shape()));
        }
        for row in 0..self.rows {
            self.data[row * self.cols..(row + 1) * self.cols].copy_from_slice(src.row(row));
        }
        Ok(())
    }

    /// `self += other`, element-wise.
    pub fn add_in_place<'a>(&mut self, other: impl Into<MatrixView<'a>>) -> Result<()> {
        let other = other.into();
        if self.shape() != other.shape() {
            return Err(NnError::shape("add", self.shape(), other.shape()));
        }
        for row in 0..self.rows {
            let dst = &mut self.data[row * self.cols..(row + 1) * self.cols];
            for (d, s) in dst.iter_mut().zip(other.row(row)) {
                *d += s;
            }
        }
        Ok(())
    }

    pub fn add_scalar(&mut self, x: f64) {
        self.map_in_place(|v| v + x);
    }

    pub fn scale(&mut self, x: f64) {
        self.map_in_place(|v| v * x);
    }

    pub fn apply_sigmoid(&mut self) {
        self.map_in_place(|v| 1.0 / (1.0 + (-v).exp()));
    }

    pub fn map_in_place<F>(&mut self, functor: F)
    where
        F: Fn(f64) -> f64,
    {
        self.data.iter_mut().for_each(|x| *x = functor(*x));
    }

    /// `self = a * b`.
    ///
    /// Requires `a.cols == b.rows` and `self` shaped `a.rows x b.cols`.
    pub fn multiply_into<'a, 'b>(
        &mut self,
        a: impl Into<MatrixView<'a>>,
        b: impl Into<MatrixView<'b>>,
    ) -> Result<()> {
        let a = a.into();
        let b = b.into();
        if a.cols != b.rows {
            return Err(NnError::shape("multiply", a.shape(), b.shape()));
        }
        let product = Shape::new(a.rows, b.cols);
        if self.shape() != product {
            return Err(NnError::shape("multiply destination", self.shape(), product));
        }

        for i in 0..self.rows {
            for j in 0..self.cols {
                let mut sum = 0.0;
                for k in 0..a.cols {
                    sum += a.get(i, k) * b.get(k, j);
                }
                self.data[i * self.cols + j] = sum;
            }
        }

        Ok(())
    }

    /// Allocating form of [`Matrix::multiply_into`].
    pub fn multiply<'a, 'b>(
        a: impl Into<MatrixView<'a>>,
        b: impl Into<MatrixView<'b>>,
    ) -> Result<Matrix> {
        let a = a.into();
        let b = b.into();
        let mut res = Matrix::allocate(a.rows, b.cols)?;
        res.multiply_into(a, b)?;
        Ok(res)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.view(), f)
    }
}

/// Read-only, possibly strided window into a caller-owned buffer.
///
/// Element `(r, c)` lives at `data[r * stride + c]`. A view never owns its
/// storage; the borrow checker keeps the buffer alive for as long as the
/// view exists.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a> {
    rows: usize,
    cols: usize,
    stride: usize,
    data: &'a [f64],
}

impl<'a> MatrixView<'a> {
    /// Interprets `data` as a `rows x cols` matrix with the given row stride.
    pub fn new(data: &'a [f64], rows: usize, cols: usize, stride: usize) -> Result<MatrixView<'a>> {
        let invalid = NnError::InvalidView {
            rows,
            cols,
            stride,
            len: data.len(),
        };
        if stride < cols {
            return Err(invalid);
        }
        let needed = if rows == 0 || cols == 0 {
            Some(0)
        } else {
            (rows - 1).checked_mul(stride).and_then(|n| n.checked_add(cols))
        };
        match needed {
            Some(n) if n <= data.len() => Ok(MatrixView { rows, cols, stride, data }),
            _ => Err(invalid),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self[(row, col)]
    }

    /// Contiguous slice holding the `cols` elements of `row`.
    pub fn row(&self, row: usize) -> &'a [f64] {
        let start = row * self.stride;
        &self.data[start..start + self.cols]
    }

    /// Narrows the view to a single row, keeping the stride.
    pub fn row_view(&self, row: usize) -> Result<MatrixView<'a>> {
        if row >= self.rows {
            return Err(NnError::RowOutOfRange {
                row,
                rows: self.rows,
            });
        }
        Ok(MatrixView {
            rows: 1,
            cols: self.cols,
            stride: self.stride,
            data: self.row(row),
        })
    }

    /// Copies the viewed elements into a packed, owned matrix.
    pub fn to_matrix(&self) -> Result<Matrix> {
        let mut res = Matrix::allocate(self.rows, self.cols)?;
        res.copy_from(*self)?;
        Ok(res)
    }
}

impl<'a> From<&'a Matrix> for MatrixView<'a> {
    fn from(m: &'a Matrix) -> MatrixView<'a> {
        m.view()
    }
}

impl Index<(usize, usize)> for MatrixView<'_> {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.stride + col]
    }
}

impl fmt::Display for MatrixView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for row in 0..self.rows {
            write!(f, " ")?;
            for value in self.row(row) {
                write!(f, " {value:.6}")?;
            }
            writeln!(f)?;
        }
        write!(f, "]")
    }
}
