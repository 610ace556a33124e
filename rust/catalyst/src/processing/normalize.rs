/// Divides every sample by the curve maximum.
///
/// Flat curves (zero standard deviation) and empty curves are returned
/// unchanged, as are curves whose maximum is zero.
///
/// ```
/// use catalyst::processing::normalize_curve;
///
/// assert_eq!(normalize_curve(&[0.0, 2.0, 4.0]), vec![0.0, 0.5, 1.0]);
/// assert_eq!(normalize_curve(&[3.0, 3.0]), vec![3.0, 3.0]);
/// ```
pub fn normalize_curve(curve: &[f64]) -> Vec<f64> {
    if curve.is_empty() || std_dev(curve) == 0.0 {
        return curve.to_vec();
    }
    let max = curve.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == 0.0 {
        return curve.to_vec();
    }
    curve.iter().map(|x| x / max).collect()
}

/// Population standard deviation.
pub fn std_dev(curve: &[f64]) -> f64 {
    if curve.is_empty() {
        return 0.0;
    }
    let n = curve.len() as f64;
    let mean = curve.iter().sum::<f64>() / n;
    (curve.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Largest value over all curves, `None` when every curve is empty.
pub fn global_max(curves: &[Vec<f64>]) -> Option<f64> {
    curves
        .iter()
        .flat_map(|c| c.iter().copied())
        .reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_empty_and_flat() {
        assert!(normalize_curve(&[]).is_empty());
        assert_eq!(normalize_curve(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_normalize_range() {
        let out = normalize_curve(&[1.0, 5.0, 10.0]);
        assert_eq!(out, vec![0.1, 0.5, 1.0]);
    }

    #[test]
    fn test_global_max() {
        assert_eq!(global_max(&[vec![1.0, 3.0], vec![], vec![2.0]]), Some(3.0));
        assert_eq!(global_max(&[vec![], vec![]]), None);
    }
}
