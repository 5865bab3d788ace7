//! Four-axis tensor storage
//!
//! Every tensor in the network is addressed as `(example, x, y, channel)`.
//! Weight tensors reuse the same layout with the first axis standing for the
//! filter index (convolution) or the flattened input row (fully-connected).
//!
//! Storage is one contiguous row-major buffer with `x` varying fastest:
//! `offset = ((m * Z + z) * Y + y) * X + x`.

use crate::error::{CnnError, Result};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Extent of each tensor axis: examples (or filters), width, height, depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    pub m: usize,
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Shape {
    pub const fn new(m: usize, x: usize, y: usize, z: usize) -> Self {
        Self { m, x, y, z }
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.m * self.x * self.y * self.z
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of cells belonging to a single example.
    pub fn per_example(&self) -> usize {
        self.x * self.y * self.z
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.m, self.x, self.y, self.z)
    }
}

/// A coordinate inside a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub m: usize,
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Point {
    pub const fn new(m: usize, x: usize, y: usize, z: usize) -> Self {
        Self { m, x, y, z }
    }
}

/// Fixed-shape tensor backed by a contiguous buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    shape: Shape,
    data: Vec<T>,
}

impl<T: Copy + Default> Tensor<T> {
    /// Allocate a tensor of the given shape filled with `T::default()`.
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            data: vec![T::default(); shape.len()],
        }
    }

    /// Wrap an existing buffer. The buffer length must match the shape.
    pub fn from_vec(shape: Shape, data: Vec<T>) -> Result<Self> {
        if data.len() != shape.len() {
            return Err(CnnError::InvalidConfig(format!(
                "buffer of {} cells cannot back a tensor of shape {}",
                data.len(),
                shape
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Offset of `(m, x, y, z)` in the raw buffer.
    ///
    /// # Panics
    ///
    /// Panics if any coordinate is outside the tensor's shape.
    #[inline]
    pub fn offset(&self, m: usize, x: usize, y: usize, z: usize) -> usize {
        let s = self.shape;
        assert!(
            m < s.m && x < s.x && y < s.y && z < s.z,
            "index ({}, {}, {}, {}) out of bounds for shape {}",
            m,
            x,
            y,
            z,
            s
        );
        ((m * s.z + z) * s.y + y) * s.x + x
    }

    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|cell| *cell = value);
    }

    /// Reset every cell to `T::default()`.
    pub fn zero(&mut self) {
        self.fill(T::default());
    }

    /// Overwrite this tensor's contents with `other`'s. Shapes must match.
    pub fn copy_from(&mut self, other: &Tensor<T>) -> Result<()> {
        if other.shape != self.shape {
            return Err(CnnError::ShapeMismatch {
                context: "tensor copy",
                expected: self.shape,
                actual: other.shape,
            });
        }
        self.data.copy_from_slice(&other.data);
        Ok(())
    }
}

impl<T: Copy + Default> Index<(usize, usize, usize, usize)> for Tensor<T> {
    type Output = T;

    #[inline]
    fn index(&self, (m, x, y, z): (usize, usize, usize, usize)) -> &T {
        let offset = self.offset(m, x, y, z);
        &self.data[offset]
    }
}

impl<T: Copy + Default> IndexMut<(usize, usize, usize, usize)> for Tensor<T> {
    #[inline]
    fn index_mut(&mut self, (m, x, y, z): (usize, usize, usize, usize)) -> &mut T {
        let offset = self.offset(m, x, y, z);
        &mut self.data[offset]
    }
}

impl<T: Copy + Default> Index<Point> for Tensor<T> {
    type Output = T;

    #[inline]
    fn index(&self, p: Point) -> &T {
        &self[(p.m, p.x, p.y, p.z)]
    }
}

impl<T: Copy + Default> IndexMut<Point> for Tensor<T> {
    #[inline]
    fn index_mut(&mut self, p: Point) -> &mut T {
        &mut self[(p.m, p.x, p.y, p.z)]
    }
}

// One block per (example, channel), rows along y.
impl<T: Copy + Default + fmt::Display> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.shape;
        for m in 0..s.m {
            for z in 0..s.z {
                writeln!(f, "[{}, :, :, {}]", m, z)?;
                for y in 0..s.y {
                    for x in 0..s.x {
                        if x > 0 {
                            write!(f, " ")?;
                        }
                        write!(f, "{:.6}", self[(m, x, y, z)])?;
                    }
                    writeln!(f)?;
                }
            }
        }
        Ok(())
    }
}
