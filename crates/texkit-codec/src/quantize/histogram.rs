//! Four-dimensional color moment histogram.
//!
//! Cells are addressed by `(r, g, b, a)` bin coordinates. Coordinate 0 on
//! every axis is an always-empty padding plane, so after
//! [`Histogram::accumulate`] each cell holds the moments of everything at or
//! below it on all four axes and any box sum is an inclusion-exclusion over
//! its 16 corners.

use crate::color::Color;
use std::ops::{Add, AddAssign, Sub, SubAssign};

pub(crate) const AXES: usize = 4;

/// Zeroth, first and second moments of a set of colors.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Moments {
    pub w: i64,
    pub r: i64,
    pub g: i64,
    pub b: i64,
    pub a: i64,
    pub m2: f64,
}

impl Moments {
    fn of(color: Color, count: u32) -> Self {
        let n = count as i64;
        let [r, g, b, a] = color.to_array().map(|v| v as i64);
        Self {
            w: n,
            r: r * n,
            g: g * n,
            b: b * n,
            a: a * n,
            m2: ((r * r + g * g + b * b + a * a) * n) as f64,
        }
    }

    /// `|sum|^2 / w`, the part of the second moment explained by the mean.
    pub fn spread(&self) -> f64 {
        if self.w == 0 {
            return 0.0;
        }
        let [r, g, b, a] = [self.r, self.g, self.b, self.a].map(|v| v as f64);
        (r * r + g * g + b * b + a * a) / self.w as f64
    }

    /// Weighted sum of squared distances to the mean.
    pub fn variance(&self) -> f64 {
        self.m2 - self.spread()
    }

    /// Mean color, rounded to nearest. Empty moments give transparent black.
    pub fn mean(&self) -> Color {
        if self.w == 0 {
            return Color::TRANSPARENT;
        }
        let avg = |sum: i64| ((sum + self.w / 2) / self.w).clamp(0, 255) as u8;
        Color::new(avg(self.r), avg(self.g), avg(self.b), avg(self.a))
    }
}

impl Add for Moments {
    type Output = Moments;

    fn add(mut self, rhs: Moments) -> Moments {
        self += rhs;
        self
    }
}

impl AddAssign for Moments {
    fn add_assign(&mut self, rhs: Moments) {
        self.w += rhs.w;
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
        self.a += rhs.a;
        self.m2 += rhs.m2;
    }
}

impl Sub for Moments {
    type Output = Moments;

    fn sub(mut self, rhs: Moments) -> Moments {
        self -= rhs;
        self
    }
}

impl SubAssign for Moments {
    fn sub_assign(&mut self, rhs: Moments) {
        self.w -= rhs.w;
        self.r -= rhs.r;
        self.g -= rhs.g;
        self.b -= rhs.b;
        self.a -= rhs.a;
        self.m2 -= rhs.m2;
    }
}

/// A working box of the quantizer: exclusive lower and inclusive upper bin
/// bound per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PaletteBox {
    pub lo: [usize; AXES],
    pub hi: [usize; AXES],
}

impl PaletteBox {
    /// Number of histogram cells covered.
    pub fn cells(&self) -> usize {
        self.lo.iter().zip(&self.hi).map(|(lo, hi)| hi - lo).product()
    }
}

pub(crate) struct Histogram {
    bits: [u32; AXES],
    dims: [usize; AXES],
    strides: [usize; AXES],
    cells: Vec<Moments>,
}

impl Histogram {
    pub fn new(rgb_bits: u32, alpha_bits: u32) -> Self {
        let bits = [rgb_bits, rgb_bits, rgb_bits, alpha_bits];
        let dims = bits.map(|b| (1usize << b) + 1);
        let strides = [dims[1] * dims[2] * dims[3], dims[2] * dims[3], dims[3], 1];
        Self {
            bits,
            dims,
            strides,
            cells: vec![Moments::default(); dims.iter().product()],
        }
    }

    fn bin(&self, color: Color) -> [usize; AXES] {
        let values = color.to_array();
        std::array::from_fn(|axis| match self.bits[axis] {
            0 => 1,
            bits => (values[axis] >> (8 - bits)) as usize + 1,
        })
    }

    #[inline]
    fn offset(&self, coord: [usize; AXES]) -> usize {
        coord.iter().zip(&self.strides).map(|(c, s)| c * s).sum()
    }

    pub fn add(&mut self, color: Color, count: u32) {
        let i = self.offset(self.bin(color));
        self.cells[i] += Moments::of(color, count);
    }

    /// Turn per-cell moments into cumulative moments, one axis at a time.
    pub fn accumulate(&mut self) {
        for axis in 0..AXES {
            let (stride, dim) = (self.strides[axis], self.dims[axis]);
            for i in 0..self.cells.len() {
                if (i / stride) % dim > 0 {
                    let prev = self.cells[i - stride];
                    self.cells[i] += prev;
                }
            }
        }
    }

    pub fn full_box(&self) -> PaletteBox {
        PaletteBox {
            lo: [0; AXES],
            hi: self.dims.map(|d| d - 1),
        }
    }

    /// Signed sum of cumulative moments over the corners of `cube`.
    ///
    /// With `fixed = Some((axis, pos))` that axis is pinned at `pos` and only
    /// the eight corners of the remaining axes are visited.
    fn corner_sum(&self, cube: &PaletteBox, fixed: Option<(usize, usize)>) -> Moments {
        let mut sum = Moments::default();
        for corner in 0..(1u32 << AXES) {
            let mut coord = [0usize; AXES];
            let mut lows = 0;
            let mut skip = false;
            for axis in 0..AXES {
                let upper = corner & (1 << axis) != 0;
                match fixed {
                    Some((f, pos)) if f == axis => {
                        skip |= upper;
                        coord[axis] = pos;
                    }
                    _ if upper => coord[axis] = cube.hi[axis],
                    _ => {
                        coord[axis] = cube.lo[axis];
                        lows += 1;
                    }
                }
            }
            if skip {
                continue;
            }
            let m = self.cells[self.offset(coord)];
            if lows % 2 == 0 {
                sum += m;
            } else {
                sum -= m;
            }
        }
        sum
    }

    /// Moments of everything inside `cube`.
    pub fn volume(&self, cube: &PaletteBox) -> Moments {
        self.corner_sum(cube, None)
    }

    /// Moments of `cube` restricted to bins `..=pos` on `axis`, minus those at
    /// or below the cube's lower bound. Subtracting two of these gives a slab.
    pub fn partial(&self, cube: &PaletteBox, axis: usize, pos: usize) -> Moments {
        self.corner_sum(cube, Some((axis, pos)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram(colors: &[Color]) -> Histogram {
        let mut h = Histogram::new(5, 3);
        for &c in colors {
            h.add(c, 1);
        }
        h.accumulate();
        h
    }

    #[test]
    fn test_full_volume_is_total() {
        let colors = [Color::BLACK, Color::WHITE, Color::rgb(255, 0, 0)];
        let h = histogram(&colors);
        let m = h.volume(&h.full_box());
        assert_eq!(m.w, 3);
        assert_eq!(m.r, 510);
        assert_eq!(m.g, 255);
        assert_eq!(m.a, 765);
    }

    #[test]
    fn test_sub_box_volume() {
        let colors = [Color::BLACK, Color::WHITE, Color::rgb(255, 0, 0)];
        let h = histogram(&colors);
        let mut cube = h.full_box();
        // Red bins 1..=16 hold only r < 128.
        cube.hi[0] = 16;
        let m = h.volume(&cube);
        assert_eq!(m.w, 1);
        assert_eq!(m.mean(), Color::BLACK);
    }

    #[test]
    fn test_partial_slabs_sum_to_volume() {
        let colors: Vec<_> = (0..64).map(|i| Color::rgb(i * 4, 255 - i * 4, i)).collect();
        let h = histogram(&colors);
        let cube = h.full_box();
        let whole = h.volume(&cube);
        let base = h.partial(&cube, 1, cube.lo[1]);
        let lower = h.partial(&cube, 1, 10) - base;
        let upper = h.partial(&cube, 1, cube.hi[1]) - h.partial(&cube, 1, 10);
        assert_eq!(lower.w + upper.w, whole.w);
        assert_eq!(lower.r + upper.r, whole.r);
    }

    #[test]
    fn test_variance_of_identical_colors_is_zero() {
        let h = histogram(&[Color::grey(40); 5]);
        let m = h.volume(&h.full_box());
        assert!(m.variance().abs() < 1e-6);
    }

    #[test]
    fn test_mean_rounds_to_nearest() {
        let h = histogram(&[Color::grey(0), Color::grey(1), Color::grey(2)]);
        assert_eq!(h.volume(&h.full_box()).mean(), Color::grey(1));
        let h = histogram(&[Color::grey(0), Color::grey(1)]);
        assert_eq!(h.volume(&h.full_box()).mean(), Color::grey(1));
    }

    #[test]
    fn test_zero_alpha_bits_single_plane() {
        let mut h = Histogram::new(5, 0);
        h.add(Color::new(0, 0, 0, 0), 1);
        h.add(Color::new(0, 0, 0, 255), 1);
        h.accumulate();
        let cube = h.full_box();
        assert_eq!(cube.hi[3], 1);
        assert_eq!(h.volume(&cube).w, 2);
    }
}
