use nalgebra::DMatrix;
use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::{
    DataProcessingError,
    Result,
};

/// Smoothing applied to curves right before they are compared.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SmoothingMethod {
    /// `out[k] = (x[k] + x[k - 1]) / 2`, with `x[-1] = 0`.
    MovingAverage,
    SavitzkyGolay { window: usize, polyorder: usize },
}

impl SmoothingMethod {
    /// Default window length for Savitzky-Golay smoothing.
    pub const DEFAULT_SG_WINDOW: usize = 5;
    /// Default polynomial order for Savitzky-Golay smoothing.
    pub const DEFAULT_SG_POLYORDER: usize = 3;

    pub fn default_savitzky_golay() -> Self {
        Self::SavitzkyGolay {
            window: Self::DEFAULT_SG_WINDOW,
            polyorder: Self::DEFAULT_SG_POLYORDER,
        }
    }

    pub fn from_flag(use_savgol: bool, window: usize, polyorder: usize) -> Self {
        if use_savgol {
            Self::SavitzkyGolay { window, polyorder }
        } else {
            Self::MovingAverage
        }
    }
}

impl Default for SmoothingMethod {
    fn default() -> Self {
        Self::default_savitzky_golay()
    }
}

pub fn smooth_curve(curve: &[f64], method: &SmoothingMethod) -> Result<Vec<f64>> {
    match method {
        SmoothingMethod::MovingAverage => Ok(moving_average(curve)),
        SmoothingMethod::SavitzkyGolay { window, polyorder } => {
            savitzky_golay(curve, *window, *polyorder)
        }
    }
}

pub fn moving_average(curve: &[f64]) -> Vec<f64> {
    let mut previous = 0.0;
    curve
        .iter()
        .map(|&x| {
            let out = (x + previous) / 2.0;
            previous = x;
            out
        })
        .collect()
}

/// Least-squares projection onto polynomials of degree `polyorder` over a
/// window of `window` points centered at zero.
///
/// Row `r` holds the weights that evaluate the fitted polynomial at
/// window position `r`.
fn savitzky_golay_projection(window: usize, polyorder: usize) -> Result<DMatrix<f64>> {
    let half = (window / 2) as f64;
    let vandermonde = DMatrix::from_fn(window, polyorder + 1, |row, col| {
        (row as f64 - half).powi(col as i32)
    });
    let pseudo_inverse = vandermonde.clone().pseudo_inverse(1e-12).map_err(|_| {
        DataProcessingError::InvalidSmoothing {
            window,
            polyorder,
            length: 0,
        }
    })?;
    Ok(vandermonde * pseudo_inverse)
}

/// Savitzky-Golay filter.
///
/// Interior points use the centered least-squares fit. The first and last
/// `window / 2` points are taken from the polynomial fitted to the first and
/// last full window. `window` must be odd, larger than `polyorder`, and no
/// longer than the curve.
pub fn savitzky_golay(curve: &[f64], window: usize, polyorder: usize) -> Result<Vec<f64>> {
    let n = curve.len();
    if window.is_multiple_of(2) || polyorder >= window || window > n {
        return Err(DataProcessingError::InvalidSmoothing {
            window,
            polyorder,
            length: n,
        }
        .into());
    }

    let projection = savitzky_golay_projection(window, polyorder)?;
    let half = window / 2;
    let apply = |row: usize, offset: usize| -> f64 {
        (0..window)
            .map(|k| projection[(row, k)] * curve[offset + k])
            .sum()
    };

    let mut out = Vec::with_capacity(n);
    for i in 0..half {
        out.push(apply(i, 0));
    }
    for i in half..(n - half) {
        out.push(apply(half, i - half));
    }
    for i in (n - half)..n {
        out.push(apply(i - (n - window), n - window));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_moving_average() {
        assert_eq!(moving_average(&[2.0, 4.0, 6.0]), vec![1.0, 3.0, 5.0]);
        assert!(moving_average(&[]).is_empty());
    }

    #[test]
    fn test_savgol_keeps_polynomials() {
        // A cubic is reproduced exactly, edges included.
        let curve: Vec<f64> = (0..12)
            .map(|x| {
                let x = x as f64;
                0.5 * x.powi(3) - 2.0 * x * x + x - 7.0
            })
            .collect();
        let smoothed = savitzky_golay(&curve, 5, 3).unwrap();
        assert_close(&smoothed, &curve);
    }

    #[test]
    fn test_savgol_matches_known_coefficients() {
        // Classic 5 point quadratic kernel: (-3, 12, 17, 12, -3) / 35.
        let curve = [0.0, 0.0, 35.0, 0.0, 0.0, 0.0, 0.0];
        let smoothed = savitzky_golay(&curve, 5, 2).unwrap();
        assert!((smoothed[2] - 17.0).abs() < 1e-9);
        assert!((smoothed[3] - 12.0).abs() < 1e-9);
        assert!((smoothed[4] + 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_savgol_rejects_bad_parameters() {
        let curve = vec![1.0; 10];
        assert!(savitzky_golay(&curve, 4, 2).is_err());
        assert!(savitzky_golay(&curve, 5, 5).is_err());
        assert!(savitzky_golay(&curve[..3], 5, 3).is_err());
        assert!(savitzky_golay(&curve, 5, 3).is_ok());
    }

    #[test]
    fn test_method_from_flag() {
        assert_eq!(SmoothingMethod::from_flag(false, 5, 3), SmoothingMethod::MovingAverage);
        assert_eq!(SmoothingMethod::from_flag(true, 7, 2), SmoothingMethod::SavitzkyGolay {
            window: 7,
            polyorder: 2
        });
    }
}
