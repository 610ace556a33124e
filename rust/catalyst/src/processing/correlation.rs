use crate::errors::{
    DataProcessingError,
    Result,
};

/// Pearson correlation coefficient of two curves of the same length.
///
/// Returns 0 when either curve is flat, since the coefficient is undefined there.
///
/// # Example
///
/// ```
/// use catalyst::processing::pearson_correlation;
///
/// let a = vec![1.0, 2.0, 3.0];
/// let b = vec![2.0, 4.0, 6.0];
/// assert!((pearson_correlation(&a, &b).unwrap() - 1.0).abs() < 1e-12);
/// assert_eq!(pearson_correlation(&a, &[5.0, 5.0, 5.0]).unwrap(), 0.0);
/// ```
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(DataProcessingError::ExpectedSlicesSameLength {
            expected: a.len(),
            other: b.len(),
            context: "pearson_correlation".to_string(),
        }
        .into());
    }
    if a.is_empty() {
        return Err(DataProcessingError::ExpectedNonEmptyData {
            context: "pearson_correlation".to_string(),
        }
        .into());
    }

    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut sum_sq_a = 0.0;
    let mut sum_sq_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        numerator += da * db;
        sum_sq_a += da * da;
        sum_sq_b += db * db;
    }

    let denominator = (sum_sq_a * sum_sq_b).sqrt();
    if denominator == 0.0 {
        return Ok(0.0);
    }
    Ok(numerator / denominator)
}
