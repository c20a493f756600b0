//! Bounded-lag line pipeline for error diffusion.
//!
//! Every image row is a [`LineTask`]. A task publishes how many of its
//! pixels are finished through an atomic progress counter and stores each
//! finished pixel's quantization error in its own cell. Row `y` may process
//! pixel `p` once row `y - 1` has published at least
//! `min(p + threshold, len)` pixels, so with a threshold no smaller than the
//! kernel reach every error a pixel gathers is already final.
//!
//! Workers claim rows in ascending order from a shared cursor. The row a
//! worker waits on was claimed earlier and is either running or done, so
//! the pipeline cannot deadlock.
//!
//! Error cells have a single writer (the worker owning the row) and are
//! read only after the progress counter covering them was loaded with
//! `Acquire`, pairing with the writer's `Release` store.

use super::DitherError;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::trace;

const SPIN_LIMIT: u32 = 64;

/// Shared cancellation flag.
///
/// Clones observe the same flag. Cancelling stops a running dither after
/// the pixel each worker is on; the dither then fails with
/// [`DitherError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

fn pack(err: [i32; 4]) -> u64 {
    err.iter().enumerate().fold(0u64, |acc, (i, &e)| {
        acc | ((e.clamp(i16::MIN as i32, i16::MAX as i32) as i16 as u16 as u64) << (16 * i))
    })
}

fn unpack(v: u64) -> [i32; 4] {
    std::array::from_fn(|i| (v >> (16 * i)) as u16 as i16 as i32)
}

/// One image row in the pipeline.
#[derive(Debug)]
pub struct LineTask {
    len: usize,
    threshold: usize,
    progress: AtomicUsize,
    errors: Vec<AtomicU64>,
}

impl LineTask {
    /// A row of `len` pixels that lags `threshold` pixels behind its
    /// predecessor. Fails when the threshold leaves nothing to overlap.
    pub fn new(len: usize, threshold: usize) -> Result<Self, DitherError> {
        if threshold >= len {
            return Err(DitherError::ThresholdTooLarge { threshold, len });
        }
        Ok(Self {
            len,
            threshold,
            progress: AtomicUsize::new(0),
            errors: (0..len).map(|_| AtomicU64::new(0)).collect(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Number of finished pixels.
    #[inline]
    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::Acquire)
    }

    #[inline]
    pub fn publish(&self, done: usize) {
        self.progress.store(done, Ordering::Release);
    }

    /// Store the RGBA error of pixel `x`. Each channel saturates to `i16`.
    #[inline]
    pub fn store_error(&self, x: usize, err: [i32; 4]) {
        self.errors[x].store(pack(err), Ordering::Relaxed);
    }

    #[inline]
    pub fn error(&self, x: usize) -> [i32; 4] {
        unpack(self.errors[x].load(Ordering::Relaxed))
    }

    /// Block until `predecessor` allows pixel `p` of this row to run.
    ///
    /// Spins briefly, then yields. Returns `false` as soon as `stop` does.
    pub fn wait_for(&self, predecessor: &LineTask, p: usize, stop: impl Fn() -> bool) -> bool {
        let needed = (p + self.threshold).min(predecessor.len);
        let mut spins = 0;
        while predecessor.progress() < needed {
            if stop() {
                return false;
            }
            if spins < SPIN_LIMIT {
                spins += 1;
                std::hint::spin_loop();
            } else {
                thread::yield_now();
            }
        }
        true
    }
}

/// Raises the abort flag if the owning worker unwinds, so rows waiting on
/// it stop spinning.
struct AbortOnPanic<'a>(&'a AtomicBool);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Relaxed);
        }
    }
}

/// Drives a per-pixel function over all rows of an image.
pub(crate) struct Pipeline<'a> {
    pub width: usize,
    pub height: usize,
    pub threads: usize,
    pub threshold: usize,
    pub cancel: Option<&'a CancelToken>,
}

impl Pipeline<'_> {
    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    /// Run `pixel(x, y, tasks)` for every pixel and collect the returned
    /// indices in row-major order.
    ///
    /// `pixel` must store the pixel's error in `tasks[y]` and may read
    /// errors of any pixel the threshold guarantees to be finished.
    pub fn run<F>(&self, pixel: F) -> Result<Vec<u16>, DitherError>
    where
        F: Fn(usize, usize, &[LineTask]) -> u16 + Sync,
    {
        let (width, height) = (self.width, self.height);
        let threshold = if self.threads > 1 { self.threshold } else { 0 };
        let tasks = (0..height)
            .map(|_| LineTask::new(width, threshold))
            .collect::<Result<Vec<_>, _>>()?;
        let abort = AtomicBool::new(false);

        if self.threads <= 1 || height < 2 {
            let mut out = Vec::with_capacity(width * height);
            for y in 0..height {
                let row = self
                    .process_row(y, &tasks, &abort, &pixel, false)
                    .ok_or(DitherError::Cancelled)?;
                out.extend(row);
            }
            return Ok(out);
        }

        let cursor = AtomicUsize::new(0);
        let workers = self.threads.min(height);
        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| s.spawn(|| self.worker(&tasks, &cursor, &abort, &pixel)))
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });

        let mut out = vec![0u16; width * height];
        let mut panicked = false;
        for result in results {
            match result {
                Ok(rows) => {
                    for (y, row) in rows {
                        out[y * width..(y + 1) * width].copy_from_slice(&row);
                    }
                }
                Err(_) => panicked = true,
            }
        }
        if panicked {
            return Err(DitherError::WorkerPanicked);
        }
        if self.cancelled() {
            return Err(DitherError::Cancelled);
        }
        Ok(out)
    }

    fn worker<F>(
        &self,
        tasks: &[LineTask],
        cursor: &AtomicUsize,
        abort: &AtomicBool,
        pixel: &F,
    ) -> Vec<(usize, Vec<u16>)>
    where
        F: Fn(usize, usize, &[LineTask]) -> u16 + Sync,
    {
        let _guard = AbortOnPanic(abort);
        let mut rows = Vec::new();
        loop {
            let y = cursor.fetch_add(1, Ordering::Relaxed);
            if y >= self.height {
                break;
            }
            match self.process_row(y, tasks, abort, pixel, true) {
                Some(row) => rows.push((y, row)),
                None => break,
            }
        }
        rows
    }

    fn process_row<F>(
        &self,
        y: usize,
        tasks: &[LineTask],
        abort: &AtomicBool,
        pixel: &F,
        wait: bool,
    ) -> Option<Vec<u16>>
    where
        F: Fn(usize, usize, &[LineTask]) -> u16 + Sync,
    {
        let stop = || self.cancelled() || abort.load(Ordering::Relaxed);
        let task = &tasks[y];
        let mut row = Vec::with_capacity(self.width);
        for x in 0..self.width {
            if stop() {
                return None;
            }
            if wait && y > 0 && !task.wait_for(&tasks[y - 1], x, stop) {
                return None;
            }
            row.push(pixel(x, y, tasks));
            task.publish(x + 1);
        }
        trace!(y, "line done");
        Some(row)
    }
}
