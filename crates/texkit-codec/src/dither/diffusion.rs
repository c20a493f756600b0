//! Error diffusion on the bounded-lag pipeline.
//!
//! A pixel's error is measured from its clamped, adjusted color to the
//! chosen palette entry, so each channel stays within -255..=255 and fits
//! the 16-bit cells of a [`LineTask`].

use super::kernel::Kernel;
use super::pipeline::{LineTask, Pipeline};
use super::{check_input, Dither, DitherError, DitherOptions};
use crate::color::Color;
use crate::palette::Palette;
use tracing::debug;

/// Error diffusion ditherer for any [`Kernel`].
///
/// Rows are scanned left to right. Each pixel gathers the integer RGBA
/// errors its kernel sends to it from pixels already processed, divides the
/// weighted sum once by the kernel divisor, and picks the palette entry
/// nearest to the adjusted color. With more than one worker thread rows run
/// concurrently on a [`LineTask`] pipeline; the result is identical to a
/// single-threaded run.
#[derive(Debug, Clone)]
pub struct ErrorDiffusion {
    kernel: Kernel,
    options: DitherOptions,
}

impl ErrorDiffusion {
    pub fn new(kernel: Kernel, options: DitherOptions) -> Self {
        Self { kernel, options }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Lag between neighbouring rows.
    ///
    /// An explicit threshold below the kernel reach would read unfinished
    /// errors and is rejected. Without one the reach itself is used.
    fn threshold(&self) -> Result<usize, DitherError> {
        let reach = self.kernel.reach();
        match self.options.threshold {
            Some(threshold) if threshold < reach => {
                Err(DitherError::ThresholdBelowKernelReach { threshold, reach })
            }
            Some(threshold) => Ok(threshold),
            None => Ok(reach),
        }
    }

    fn pixel(
        &self,
        x: usize,
        y: usize,
        image: &[Color],
        width: usize,
        palette: &Palette,
        tasks: &[LineTask],
    ) -> u16 {
        let mut acc = [0i32; 4];
        for &(dx, dy, weight) in self.kernel.entries {
            let (sx, sy) = (x as i64 - dx as i64, y as i64 - dy as i64);
            if sx < 0 || sy < 0 || sx >= width as i64 {
                continue;
            }
            let err = tasks[sy as usize].error(sx as usize);
            for (a, e) in acc.iter_mut().zip(err) {
                *a += e * weight as i32;
            }
        }

        let divisor = self.kernel.divisor as i32;
        let source = image[y * width + x].to_array();
        let adjusted: [u8; 4] =
            std::array::from_fn(|c| (source[c] as i32 + acc[c] / divisor).clamp(0, 255) as u8);
        let index = palette.find_nearest(Color::from_array(adjusted));
        let chosen = palette
            .get(index as usize)
            .unwrap_or(Color::TRANSPARENT)
            .to_array();
        tasks[y].store_error(x, std::array::from_fn(|c| adjusted[c] as i32 - chosen[c] as i32));
        index
    }
}

impl Dither for ErrorDiffusion {
    fn dither(
        &self,
        image: &[Color],
        width: usize,
        height: usize,
        palette: &Palette,
    ) -> Result<Vec<u16>, DitherError> {
        check_input(image, width, height, palette)?;
        let explicit = self.options.threshold.is_some();
        let threshold = self.threshold()?;
        if image.is_empty() {
            return Ok(Vec::new());
        }

        let mut threads = self.options.worker_threads();
        if threshold >= width {
            if explicit {
                return Err(DitherError::ThresholdTooLarge {
                    threshold,
                    len: width,
                });
            }
            // Too narrow to overlap rows.
            threads = 1;
        }
        debug!(width, height, threads, threshold, "error diffusion");

        let pipeline = Pipeline {
            width,
            height,
            threads,
            threshold,
            cancel: self.options.cancel.as_ref(),
        };
        pipeline.run(|x, y, tasks| self.pixel(x, y, image, width, palette, tasks))
    }
}

#[cfg(test)]
mod tests {
    use super::super::kernel::{ATKINSON, FLOYD_STEINBERG, JARVIS_JUDICE_NINKE, SIERRA_LITE};
    use super::*;
    use crate::dither::CancelToken;
    use pretty_assertions::assert_eq;

    fn gradient(width: usize, height: usize) -> Vec<Color> {
        (0..width * height)
            .map(|i| {
                let (x, y) = (i % width, i / width);
                Color::new(
                    (x * 255 / (width - 1)) as u8,
                    (y * 255 / (height - 1)) as u8,
                    ((x + y) * 7 % 256) as u8,
                    255,
                )
            })
            .collect()
    }

    fn palette() -> Palette {
        Palette::new(vec![
            Color::BLACK,
            Color::WHITE,
            Color::rgb(255, 0, 0),
            Color::rgb(0, 255, 0),
            Color::rgb(0, 0, 255),
            Color::rgb(128, 128, 128),
        ])
        .unwrap()
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (w, h) = (64, 48);
        let image = gradient(w, h);
        for kernel in [FLOYD_STEINBERG, ATKINSON, JARVIS_JUDICE_NINKE, SIERRA_LITE] {
            let seq = ErrorDiffusion::new(kernel, DitherOptions::new().threads(1))
                .dither(&image, w, h, &palette())
                .unwrap();
            for (threads, threshold) in [(2, kernel.reach()), (4, kernel.reach() + 5), (8, 40)] {
                let par = ErrorDiffusion::new(
                    kernel,
                    DitherOptions::new().threads(threads).threshold(threshold),
                )
                .dither(&image, w, h, &palette())
                .unwrap();
                assert_eq!(par, seq, "threads={threads} threshold={threshold}");
            }
        }
    }

    #[test]
    fn test_exact_colors_stay_exact() {
        let p = palette();
        let image: Vec<_> = (0..30).map(|i| p.colors()[i % p.len()]).collect();
        let out = ErrorDiffusion::new(FLOYD_STEINBERG, DitherOptions::new().threads(1))
            .dither(&image, 6, 5, &p)
            .unwrap();
        let expected: Vec<u16> = (0..30).map(|i| (i % p.len()) as u16).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_mid_grey_mixes_black_and_white() {
        let p = Palette::new(vec![Color::BLACK, Color::WHITE]).unwrap();
        let image = vec![Color::grey(128); 64 * 64];
        let out = ErrorDiffusion::new(FLOYD_STEINBERG, DitherOptions::new())
            .dither(&image, 64, 64, &p)
            .unwrap();
        let whites = out.iter().filter(|&&i| i == 1).count();
        assert!((1900..=2200).contains(&whites), "{whites} whites");
    }

    #[test]
    fn test_error_reaches_next_pixel() {
        // 100 -> black leaves +100; the right neighbour sees 100 + 7 * 100 / 16 = 143.
        let p = Palette::new(vec![Color::BLACK, Color::WHITE]).unwrap();
        let image = vec![Color::grey(100), Color::grey(100)];
        let out = ErrorDiffusion::new(FLOYD_STEINBERG, DitherOptions::new().threads(1))
            .dither(&image, 2, 1, &p)
            .unwrap();
        assert_eq!(out, vec![0, 1]);
    }

    #[test]
    fn test_threshold_too_large() {
        let image = vec![Color::BLACK; 16];
        let err = ErrorDiffusion::new(FLOYD_STEINBERG, DitherOptions::new().threads(2).threshold(4))
            .dither(&image, 4, 4, &palette())
            .unwrap_err();
        assert_eq!(err, DitherError::ThresholdTooLarge { threshold: 4, len: 4 });
    }

    #[test]
    fn test_threshold_below_reach() {
        let image = vec![Color::BLACK; 64];
        let err = ErrorDiffusion::new(JARVIS_JUDICE_NINKE, DitherOptions::new().threshold(2))
            .dither(&image, 8, 8, &palette())
            .unwrap_err();
        assert_eq!(err, DitherError::ThresholdBelowKernelReach { threshold: 2, reach: 3 });
    }

    #[test]
    fn test_narrow_image_falls_back_to_one_thread() {
        let image = gradient(2, 20);
        let out = ErrorDiffusion::new(JARVIS_JUDICE_NINKE, DitherOptions::new().threads(4))
            .dither(&image, 2, 20, &palette())
            .unwrap();
        assert_eq!(out.len(), 40);
    }

    #[test]
    fn test_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let image = gradient(16, 16);
        let err = ErrorDiffusion::new(
            FLOYD_STEINBERG,
            DitherOptions::new().threads(4).cancel(token),
        )
        .dither(&image, 16, 16, &palette())
        .unwrap_err();
        assert_eq!(err, DitherError::Cancelled);
    }
}
