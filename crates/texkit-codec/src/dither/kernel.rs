//! Error diffusion kernels.
//!
//! A kernel lists where a pixel's quantization error goes: entry
//! `(dx, dy, weight)` sends `weight / divisor` of the error to the pixel at
//! `(x + dx, y + dy)`. The ditherer reads kernels the other way round and
//! gathers, for each pixel, the weighted errors of the already processed
//! pixels at `(x - dx, y - dy)`.

/// An error diffusion kernel.
///
/// # Error Propagation
///
/// A pixel receives `sum(weight * error) / divisor` from its sources. The
/// sum is divided once, after gathering, so small errors from several
/// neighbours still add up instead of each truncating to zero. Every kernel
/// here except Atkinson has weights summing to the divisor.
///
/// # Row Dependencies
///
/// `max_dy` and [`Kernel::reach`] together describe which finished pixels a
/// pixel reads. The pipeline keeps one error row per image row and lets a
/// row start a pixel once the row directly above is `reach` pixels ahead.
/// Rows further up are then at least as far ahead, so a lag of `reach`
/// covers kernels with `max_dy == 2` as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel {
    /// `(dx, dy, weight)` entries. `dy` is never negative, and entries with
    /// `dy == 0` always have `dx > 0`.
    pub entries: &'static [(i32, i32, u8)],

    /// Weight denominator. Weights may sum to less than this (Atkinson).
    pub divisor: u8,

    /// Rows below the source pixel the kernel reaches, i.e. how many rows
    /// above itself a pixel gathers error from.
    ///
    /// Row `y` never reads error rows before `y - max_dy`.
    pub max_dy: usize,
}

impl Kernel {
    /// Pixels of the previous rows, counted from the current column, that
    /// must be finished before the current pixel can gather its error.
    ///
    /// For Floyd-Steinberg the entry `(-1, 1)` means pixel `x` of row `y`
    /// needs pixel `x + 1` of row `y - 1`, so the reach is 2.
    pub fn reach(&self) -> usize {
        self.entries
            .iter()
            .filter(|&&(_, dy, _)| dy > 0)
            .map(|&(dx, _, _)| (-dx).max(0) as usize + 1)
            .max()
            .unwrap_or(1)
    }

    /// Sum of all weights.
    pub fn weight(&self) -> u32 {
        self.entries.iter().map(|&(_, _, w)| w as u32).sum()
    }
}

/// Atkinson dithering kernel.
///
/// Sends 1/8 of the error to each of six neighbours, so only 6/8 of it is
/// propagated. The dropped quarter keeps small palettes from smearing
/// colors across flat regions, at the cost of clipping in shadows and
/// highlights. Developed by Bill Atkinson for the original Macintosh.
///
/// ```text
///        X   1   1
///    1   1   1
///        1
/// ```
pub const ATKINSON: Kernel = Kernel {
    entries: &[(1, 0, 1), (2, 0, 1), (-1, 1, 1), (0, 1, 1), (1, 1, 1), (0, 2, 1)],
    divisor: 8,
    max_dy: 2,
};

/// Floyd-Steinberg dithering kernel.
///
/// Four neighbours, full propagation. The smallest kernel with visually
/// even noise and the usual default. Published by Robert Floyd and Louis
/// Steinberg in 1976.
///
/// ```text
///        X   7
///    3   5   1
/// ```
pub const FLOYD_STEINBERG: Kernel = Kernel {
    entries: &[(1, 0, 7), (-1, 1, 3), (0, 1, 5), (1, 1, 1)],
    divisor: 16,
    max_dy: 1,
};

/// Jarvis, Judice and Ninke dithering kernel.
///
/// Twelve neighbours over two rows below, full propagation. Spreads error
/// wider than Floyd-Steinberg, which gives smoother gradients and coarser
/// grain. Its reach of 3 makes it the slowest to pipeline.
///
/// ```text
///            X   7   5
///    3   5   7   5   3
///    1   3   5   3   1
/// ```
pub const JARVIS_JUDICE_NINKE: Kernel = Kernel {
    entries: &[
        (1, 0, 7),
        (2, 0, 5),
        (-2, 1, 3),
        (-1, 1, 5),
        (0, 1, 7),
        (1, 1, 5),
        (2, 1, 3),
        (-2, 2, 1),
        (-1, 2, 3),
        (0, 2, 5),
        (1, 2, 3),
        (2, 2, 1),
    ],
    divisor: 48,
    max_dy: 2,
};

/// Sierra dithering kernel (three rows).
///
/// Frankie Sierra's reduction of Jarvis-Judice-Ninke to ten neighbours
/// with a power-of-two divisor.
///
/// ```text
///            X   5   3
///    2   4   5   4   2
///        2   3   2
/// ```
pub const SIERRA: Kernel = Kernel {
    entries: &[
        (1, 0, 5),
        (2, 0, 3),
        (-2, 1, 2),
        (-1, 1, 4),
        (0, 1, 5),
        (1, 1, 4),
        (2, 1, 2),
        (-1, 2, 2),
        (0, 2, 3),
        (1, 2, 2),
    ],
    divisor: 32,
    max_dy: 2,
};

/// Sierra two-row kernel.
///
/// Drops the second row below, so only the previous row is read.
///
/// ```text
///            X   4   3
///    1   2   3   2   1
/// ```
pub const SIERRA_TWO_ROW: Kernel = Kernel {
    entries: &[
        (1, 0, 4),
        (2, 0, 3),
        (-2, 1, 1),
        (-1, 1, 2),
        (0, 1, 3),
        (1, 1, 2),
        (2, 1, 1),
    ],
    divisor: 16,
    max_dy: 1,
};

/// Sierra lite kernel.
///
/// Three neighbours, close to Floyd-Steinberg in output and cheaper.
///
/// ```text
///    X   2
///    1   1
/// ```
pub const SIERRA_LITE: Kernel = Kernel {
    entries: &[(1, 0, 2), (-1, 1, 1), (0, 1, 1)],
    divisor: 4,
    max_dy: 1,
};

/// Stucki dithering kernel.
///
/// Same footprint as Jarvis-Judice-Ninke with weights that favour the
/// nearest neighbours. The divisor 42 is not a power of two.
///
/// ```text
///            X   8   4
///    2   4   8   4   2
///    1   2   4   2   1
/// ```
pub const STUCKI: Kernel = Kernel {
    entries: &[
        (1, 0, 8),
        (2, 0, 4),
        (-2, 1, 2),
        (-1, 1, 4),
        (0, 1, 8),
        (1, 1, 4),
        (2, 1, 2),
        (-2, 2, 1),
        (-1, 2, 2),
        (0, 2, 4),
        (1, 2, 2),
        (2, 2, 1),
    ],
    divisor: 42,
    max_dy: 2,
};

/// Burkes dithering kernel.
///
/// The first two rows of Stucki, rescaled to a divisor of 32.
///
/// ```text
///            X   8   4
///    2   4   8   4   2
/// ```
pub const BURKES: Kernel = Kernel {
    entries: &[
        (1, 0, 8),
        (2, 0, 4),
        (-2, 1, 2),
        (-1, 1, 4),
        (0, 1, 8),
        (1, 1, 4),
        (2, 1, 2),
    ],
    divisor: 32,
    max_dy: 1,
};
