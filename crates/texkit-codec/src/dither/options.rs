//! Ditherer configuration.

use super::pipeline::CancelToken;

/// Configuration shared by all ditherers.
///
/// # Defaults
///
/// - `threads`: 0, meaning one worker per available CPU
/// - `threshold`: derived from the kernel's reach
/// - `spread`: 32
/// - no cancellation token
///
/// # Example
///
/// ```
/// use texkit_codec::DitherOptions;
///
/// let options = DitherOptions::new().threads(4).threshold(8);
/// assert_eq!(options.threads, 4);
/// assert_eq!(options.threshold, Some(8));
/// ```
#[derive(Debug, Clone)]
pub struct DitherOptions {
    /// Worker threads for error diffusion; 0 picks the available
    /// parallelism, 1 runs on the calling thread.
    pub threads: usize,

    /// Lag, in pixels, a line keeps behind the line above it. Must be at
    /// least the kernel reach and smaller than the image width.
    pub threshold: Option<usize>,

    /// Total range of the ordered dither offset, in 8-bit channel units.
    pub spread: i32,

    /// Shared flag that stops a running dither.
    pub cancel: Option<CancelToken>,
}

impl Default for DitherOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            threshold: None,
            spread: 32,
            cancel: None,
        }
    }
}

impl DitherOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[inline]
    pub fn threshold(mut self, threshold: usize) -> Self {
        self.threshold = Some(threshold);
        self
    }

    #[inline]
    pub fn spread(mut self, spread: i32) -> Self {
        self.spread = spread;
        self
    }

    #[inline]
    pub fn cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Worker count with 0 resolved to the available parallelism.
    pub fn worker_threads(&self) -> usize {
        match self.threads {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}
