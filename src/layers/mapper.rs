//! Coordinate mapping between convolution input and output space
//!
//! An output position `o` reads the input window `[o * stride, o * stride + extent - 1]`
//! on each spatial axis. Forward uses the direct direction (output → window
//! corner); backward needs the inverse (input cell → every output position
//! whose window covers it), which is `ceil((x - extent + 1) / stride)` up to
//! `floor(x / stride)`, clamped into the output grid.

use crate::tensor::Point;
use std::ops::RangeInclusive;

/// Inclusive box of output positions `(x, y, filter)`.
///
/// `min > max` on a spatial axis means no output reads the input cell (a
/// stride larger than the extent leaves gaps); iterating such a range yields
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputRange {
    pub min_x: usize,
    pub min_y: usize,
    pub min_z: usize,
    pub max_x: usize,
    pub max_y: usize,
    pub max_z: usize,
}

impl OutputRange {
    /// Output columns covering the input cell.
    pub fn xs(&self) -> RangeInclusive<usize> {
        self.min_x..=self.max_x
    }

    /// Output rows covering the input cell.
    pub fn ys(&self) -> RangeInclusive<usize> {
        self.min_y..=self.max_y
    }

    /// Filters fed by the input cell.
    pub fn zs(&self) -> RangeInclusive<usize> {
        self.min_z..=self.max_z
    }

    /// True when no output reads the input cell.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y || self.min_z > self.max_z
    }

    /// Whether output `(x, y, z)` lies inside the box.
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        self.xs().contains(&x) && self.ys().contains(&y) && self.zs().contains(&z)
    }
}

/// Geometry of a square-kernel convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceptiveField {
    stride: usize,
    extent: usize,
    out_x: usize,
    out_y: usize,
    filters: usize,
}

impl ReceptiveField {
    /// `out_x`/`out_y` are the output grid size, `filters` the number of output channels.
    pub fn new(stride: usize, extent: usize, out_x: usize, out_y: usize, filters: usize) -> Self {
        Self {
            stride,
            extent,
            out_x,
            out_y,
            filters,
        }
    }

    /// Get the step between consecutive windows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Get the window width and height.
    pub fn extent(&self) -> usize {
        self.extent
    }

    /// Top-left input corner of the window read by output position `out`.
    ///
    /// Only x and y are scaled; the channel is whatever the caller asks for,
    /// since every output channel reads all input channels.
    pub fn map_to_input(&self, out: Point, z: usize) -> Point {
        Point {
            m: out.m,
            x: out.x * self.stride,
            y: out.y * self.stride,
            z,
        }
    }

    /// Every output position whose window covers input cell `(x, y)`.
    pub fn map_to_output(&self, x: usize, y: usize) -> OutputRange {
        let a = x as f64;
        let b = y as f64;
        let extent = self.extent as f64;
        let stride = self.stride as f64;
        // no filters: min_z > max_z so the channel range is empty
        let (min_z, max_z) = match self.filters.checked_sub(1) {
            Some(last) => (0, last),
            None => (1, 0),
        };
        OutputRange {
            min_x: normalize_range((a - extent + 1.0) / stride, self.out_x, true),
            min_y: normalize_range((b - extent + 1.0) / stride, self.out_y, true),
            min_z,
            max_x: normalize_range(a / stride, self.out_x, false),
            max_y: normalize_range(b / stride, self.out_y, false),
            max_z,
        }
    }
}

/// Clamp a fractional output coordinate into `[0, size - 1]`.
///
/// Lower bounds round up and upper bounds round down so the range never
/// names an output whose window misses the input cell.
fn normalize_range(f: f64, size: usize, lower_bound: bool) -> usize {
    if f <= 0.0 {
        return 0;
    }
    let max = size.saturating_sub(1);
    if f >= max as f64 {
        return max;
    }
    if lower_bound {
        f.ceil() as usize
    } else {
        f.floor() as usize
    }
}
