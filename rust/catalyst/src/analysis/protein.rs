use serde::{
    Deserialize,
    Serialize,
};

use crate::aggregation::TimelineAggregator;
use crate::errors::{
    CatalystError,
    Result,
};
use crate::models::Timeline;

/// Where the protein reference curve is read from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProteinTarget {
    pub mz: f64,
    pub charge_state: i64,
    pub function: u32,
    pub sampling_range: f64,
    /// Charge states summed into the reference on each side of
    /// `charge_state`. `0` reads the protein m/z alone.
    pub averaging_window: i64,
}

impl ProteinTarget {
    /// m/z values summed into the reference curve.
    ///
    /// ```
    /// use catalyst::analysis::ProteinTarget;
    ///
    /// let target = ProteinTarget {
    ///     mz: 500.0,
    ///     charge_state: 4,
    ///     function: 2,
    ///     sampling_range: 4.0,
    ///     averaging_window: 2,
    /// };
    /// assert_eq!(target.reference_mzs(), vec![2000.0 / 3.0, 500.0, 400.0]);
    /// ```
    pub fn reference_mzs(&self) -> Vec<f64> {
        if self.averaging_window <= 0 {
            return vec![self.mz];
        }
        let mass = self.mz * self.charge_state as f64;
        let span = self.averaging_window - 1;
        (-span..=span)
            .map(|offset| self.charge_state + offset)
            .filter(|charge| *charge > 0)
            .map(|charge| mass / charge as f64)
            .collect()
    }
}

/// Elementwise sum, shorter curves padded with zeros.
pub fn sum_padded(curves: &[Timeline]) -> Timeline {
    let len = curves.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = vec![0.0; len];
    for curve in curves {
        for (acc, v) in out.iter_mut().zip(curve.iter()) {
            *acc += v;
        }
    }
    out
}

/// Zero-pads or truncates `curve` to `len` samples.
pub fn pad_or_truncate(mut curve: Timeline, len: usize) -> Timeline {
    curve.resize(len, 0.0);
    curve
}

/// Only failures tied to a single m/z are skipped; file level failures
/// would hit every other m/z too.
pub(super) fn is_item_local(err: &CatalystError) -> bool {
    matches!(err, CatalystError::DataProcessing(_))
}

/// Reads and sums the protein curves of every reference m/z.
///
/// An m/z without data is reported and left out of the sum.
pub fn build_protein_curve(
    aggregator: &mut TimelineAggregator<'_>,
    target: &ProteinTarget,
    use_cache: bool,
) -> Result<Timeline> {
    let mzs = target.reference_mzs();
    let single = mzs.len() <= 1;
    let mut curves = Vec::with_capacity(mzs.len());
    for mz in mzs {
        match aggregator.get_intensity_timeline(mz, target.sampling_range, target.function, use_cache) {
            Ok(curve) => curves.push(curve),
            Err(e) if is_item_local(&e) => {
                let progress = aggregator.progress();
                if single {
                    progress.surface(&e.to_string());
                } else {
                    progress.log(&format!("{} Protein charge state is ignored.", e));
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(sum_padded(&curves))
}
