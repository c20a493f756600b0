//! Greedy variance-minimizing box splitting (Wu, 1991).
//!
//! Starts from one box covering the whole histogram and repeatedly splits
//! the box with the largest variance at the plane that maximizes the
//! variance between the two halves. All box sums come from the cumulative
//! moments in [`Histogram`], so a cut costs O(bins along the axis).
//! Boxes holding a single bin or a single color are never split again.

use super::histogram::{Histogram, Moments, PaletteBox, AXES};
use tracing::trace;

/// Best cut position along `axis`, as `(score, pos)`.
///
/// The lower child covers bins `(lo, pos]`, the upper child `(pos, hi]`.
/// Positions leaving either child empty are skipped.
fn maximize(hist: &Histogram, cube: &PaletteBox, axis: usize, whole: Moments) -> Option<(f64, usize)> {
    let base = hist.partial(cube, axis, cube.lo[axis]);
    let mut best: Option<(f64, usize)> = None;
    for pos in cube.lo[axis] + 1..cube.hi[axis] {
        let lower = hist.partial(cube, axis, pos) - base;
        let upper = whole - lower;
        if lower.w == 0 || upper.w == 0 {
            continue;
        }
        let score = lower.spread() + upper.spread();
        if best.map_or(true, |(s, _)| score > s) {
            best = Some((score, pos));
        }
    }
    best
}

/// Split `cube` along the axis and plane maximizing between-box variance.
/// Ties prefer red, then green, blue and alpha.
fn cut(hist: &Histogram, cube: &PaletteBox) -> Option<(PaletteBox, PaletteBox)> {
    let whole = hist.volume(cube);
    let mut best: Option<(f64, usize, usize)> = None;
    for axis in 0..AXES {
        if let Some((score, pos)) = maximize(hist, cube, axis, whole) {
            if best.map_or(true, |(s, _, _)| score > s) {
                best = Some((score, axis, pos));
            }
        }
    }
    let (_, axis, pos) = best?;
    let mut lower = *cube;
    let mut upper = *cube;
    lower.hi[axis] = pos;
    upper.lo[axis] = pos;
    Some((lower, upper))
}

fn box_variance(hist: &Histogram, cube: &PaletteBox) -> f64 {
    if cube.cells() > 1 {
        hist.volume(cube).variance()
    } else {
        0.0
    }
}

/// Split the histogram into at most `max_colors` boxes.
///
/// Each round cuts the box chosen in the previous round, then picks the box
/// with the largest variance (lowest index on ties) for the next one. Stops
/// early once no box has positive variance.
pub(crate) fn partition(hist: &Histogram, max_colors: usize) -> Vec<PaletteBox> {
    let mut boxes = vec![hist.full_box()];
    let mut variances = vec![0.0f64];
    let mut next = 0;

    while boxes.len() < max_colors {
        match cut(hist, &boxes[next]) {
            Some((lower, upper)) => {
                variances[next] = box_variance(hist, &lower);
                variances.push(box_variance(hist, &upper));
                boxes[next] = lower;
                boxes.push(upper);
            }
            None => variances[next] = 0.0,
        }

        next = 0;
        for (i, &v) in variances.iter().enumerate().skip(1) {
            if v > variances[next] {
                next = i;
            }
        }
        if variances[next] <= 0.0 {
            trace!(boxes = boxes.len(), "no splittable box left");
            break;
        }
    }
    boxes
}
