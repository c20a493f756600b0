//! Endpoint selection shared by the interpolating block encoders.

use crate::color::Color;

const POWER_ITERATIONS: usize = 8;

/// The two colors of `colors` lying furthest apart along the block's
/// principal axis, over the first `channels` channels (3 = RGB, 4 = RGBA).
///
/// The axis is the dominant eigenvector of the covariance matrix, found by
/// power iteration seeded with the highest-variance column. Returns
/// `(high, low)` by projection; a uniform block returns its color twice.
/// Floating point is only used to pick which pixels become endpoints.
pub(crate) fn principal_endpoints(colors: &[Color], channels: usize) -> (Color, Color) {
    let Some(&first) = colors.first() else {
        return (Color::BLACK, Color::BLACK);
    };
    let channels = channels.clamp(1, 4);
    let n = colors.len() as f64;

    let mut mean = [0.0f64; 4];
    for c in colors {
        let v = c.to_array();
        for ch in 0..channels {
            mean[ch] += v[ch] as f64;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);

    let mut cov = [[0.0f64; 4]; 4];
    for c in colors {
        let v = c.to_array();
        for i in 0..channels {
            let di = v[i] as f64 - mean[i];
            for j in 0..channels {
                cov[i][j] += di * (v[j] as f64 - mean[j]);
            }
        }
    }

    let seed = (0..channels)
        .max_by(|&a, &b| cov[a][a].total_cmp(&cov[b][b]).then(b.cmp(&a)))
        .unwrap_or(0);
    if cov[seed][seed] <= 0.0 {
        return (first, first);
    }

    let mut axis = [0.0f64; 4];
    axis[..channels].copy_from_slice(&cov[seed][..channels]);
    for _ in 0..POWER_ITERATIONS {
        let mut next = [0.0f64; 4];
        for i in 0..channels {
            next[i] = (0..channels).map(|j| cov[i][j] * axis[j]).sum();
        }
        let scale = next.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if scale < 1e-12 {
            break;
        }
        for v in next.iter_mut() {
            *v /= scale;
        }
        axis = next;
    }

    let project = |c: &Color| -> f64 {
        let v = c.to_array();
        (0..channels).map(|ch| (v[ch] as f64 - mean[ch]) * axis[ch]).sum()
    };

    let (mut high, mut low) = (first, first);
    let (mut t_high, mut t_low) = (project(&first), project(&first));
    for c in &colors[1..] {
        let t = project(c);
        if t > t_high {
            t_high = t;
            high = *c;
        }
        if t < t_low {
            t_low = t;
            low = *c;
        }
    }
    (high, low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_colors_become_endpoints() {
        let a = Color::rgb(10, 200, 30);
        let b = Color::rgb(240, 20, 90);
        let colors: Vec<_> = (0..16).map(|i| if i % 3 == 0 { a } else { b }).collect();
        let (hi, lo) = principal_endpoints(&colors, 3);
        assert!((hi, lo) == (a, b) || (hi, lo) == (b, a));
    }

    #[test]
    fn test_anticorrelated_axis_found() {
        // Red rises while green falls; (1, 1, 1) is orthogonal to this axis.
        let colors: Vec<_> = (0..16)
            .map(|i| Color::rgb(i * 16, 255 - i * 16, 128))
            .collect();
        let (hi, lo) = principal_endpoints(&colors, 3);
        let ends = [hi, lo];
        assert!(ends.contains(&colors[0]));
        assert!(ends.contains(&colors[15]));
    }

    #[test]
    fn test_uniform_block() {
        let c = Color::rgb(1, 2, 3);
        assert_eq!(principal_endpoints(&[c; 16], 4), (c, c));
    }

    #[test]
    fn test_alpha_axis_with_four_channels() {
        let colors: Vec<_> = (0..16).map(|i| Color::new(50, 50, 50, i * 17)).collect();
        let (hi, lo) = principal_endpoints(&colors, 4);
        assert_eq!([hi.a.max(lo.a), hi.a.min(lo.a)], [255, 0]);
    }
}
