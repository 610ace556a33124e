use serde::{
    Deserialize,
    Serialize,
};
use std::time::Instant;
use tracing::warn;

use crate::errors::{
    DataProcessingError,
    Result,
};
use crate::models::SimilarityResult;
use crate::processing::{
    SmoothingMethod,
    centered_dtw_distance,
    pearson_correlation,
    smooth_curve,
};
use crate::progress::ProgressSink;
use crate::utils::parallel::{
    clamp_workers,
    parallel_map,
};

/// Batches smaller than this are always compared on the calling thread.
pub const MIN_PARALLEL_BATCH: usize = 100;
/// Candidates handed to a worker at a time.
pub const PARALLEL_CHUNK_SIZE: usize = 20;
/// Cores kept free when comparing in parallel.
const RESERVED_COMPARISON_CORES: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub dtw_threshold: f64,
    pub pearson_threshold: f64,
    pub window: usize,
    pub polyorder: usize,
    /// Savitzky-Golay smoothing of candidates, moving average otherwise.
    /// The reference is always Savitzky-Golay smoothed.
    pub use_savgol: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            dtw_threshold: 10.0,
            pearson_threshold: 0.87,
            window: SmoothingMethod::DEFAULT_SG_WINDOW,
            polyorder: SmoothingMethod::DEFAULT_SG_POLYORDER,
            use_savgol: true,
        }
    }
}

impl DetectorConfig {
    fn candidate_smoothing(&self) -> SmoothingMethod {
        SmoothingMethod::from_flag(self.use_savgol, self.window, self.polyorder)
    }

    fn reference_smoothing(&self) -> SmoothingMethod {
        SmoothingMethod::SavitzkyGolay {
            window: self.window,
            polyorder: self.polyorder,
        }
    }
}

/// Compares candidate curves against a smoothed reference curve.
///
/// A candidate is similar when its DTW distance to the reference is below
/// `dtw_threshold` and its Pearson correlation is above `pearson_threshold`.
/// Outside of tracked mode the DTW step is skipped for candidates whose
/// correlation is already below the threshold.
pub struct CurveSimilarityDetector<'a> {
    reference: Option<Vec<f64>>,
    config: DetectorConfig,
    progress: &'a dyn ProgressSink,
}

impl<'a> CurveSimilarityDetector<'a> {
    pub fn new(config: DetectorConfig, progress: &'a dyn ProgressSink) -> Self {
        Self {
            reference: None,
            config,
            progress,
        }
    }

    pub fn with_reference(
        reference: &[f64],
        config: DetectorConfig,
        progress: &'a dyn ProgressSink,
    ) -> Result<Self> {
        let mut detector = Self::new(config, progress);
        detector.set_reference(reference)?;
        Ok(detector)
    }

    /// Smooths and stores the reference curve.
    pub fn set_reference(&mut self, reference: &[f64]) -> Result<()> {
        self.reference = Some(smooth_curve(reference, &self.config.reference_smoothing())?);
        Ok(())
    }

    /// The smoothed reference curve.
    pub fn reference(&self) -> Option<&[f64]> {
        self.reference.as_deref()
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn try_compare(&self, reference: &[f64], candidate: &[f64], tracked: bool) -> Result<SimilarityResult> {
        let smoothed = smooth_curve(candidate, &self.config.candidate_smoothing())?;
        let pearson = pearson_correlation(reference, &smoothed)?;
        if pearson < self.config.pearson_threshold && !tracked {
            return Ok(SimilarityResult::rejected(pearson));
        }
        let dtw = centered_dtw_distance(reference, &smoothed).ok_or_else(|| {
            DataProcessingError::ExpectedNonEmptyData {
                context: "dtw distance".to_string(),
            }
        })?;
        Ok(SimilarityResult {
            is_similar: dtw < self.config.dtw_threshold && pearson > self.config.pearson_threshold,
            dtw: Some(dtw),
            pearson: Some(pearson),
        })
    }

    fn compare_with(&self, reference: &[f64], candidate: &[f64], tracked: bool) -> SimilarityResult {
        match self.try_compare(reference, candidate, tracked) {
            Ok(result) => result,
            Err(e) => {
                warn!("Comparison failed: {}", e);
                self.progress
                    .log(&format!("An error occurred while comparing curves: {}", e));
                SimilarityResult::failed()
            }
        }
    }

    /// Compares one candidate. Numeric failures give an all-`None` result;
    /// only a missing reference is an error.
    pub fn compare(&self, candidate: &[f64], tracked: bool) -> Result<SimilarityResult> {
        let reference = self
            .reference
            .as_deref()
            .ok_or(DataProcessingError::MissingReference)?;
        Ok(self.compare_with(reference, candidate, tracked))
    }

    /// Compares every candidate, in input order.
    ///
    /// Small batches or a single worker run sequentially. Otherwise a pool of
    /// `min(num_workers, cpu_count - 1)` threads is used.
    pub fn compare_all(
        &self,
        candidates: &[Vec<f64>],
        tracked: bool,
        num_workers: usize,
    ) -> Result<Vec<SimilarityResult>> {
        let reference = self
            .reference
            .as_deref()
            .ok_or(DataProcessingError::MissingReference)?;
        let start = Instant::now();
        let num_workers = clamp_workers(num_workers, RESERVED_COMPARISON_CORES);
        let num_workers = if candidates.len() < MIN_PARALLEL_BATCH {
            1
        } else {
            num_workers
        };

        let results = parallel_map(
            candidates,
            |candidate| self.compare_with(reference, candidate, tracked),
            num_workers,
            PARALLEL_CHUNK_SIZE,
        )?;

        self.progress.log(&format!(
            "Compared {} curves on {} worker(s) in {:.2} seconds.",
            candidates.len(),
            num_workers,
            start.elapsed().as_secs_f64()
        ));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::CollectingSink;

    fn gaussian(len: usize, center: f64, width: f64, height: f64) -> Vec<f64> {
        (0..len)
            .map(|i| height * (-((i as f64 - center) / width).powi(2)).exp())
            .collect()
    }

    fn config() -> DetectorConfig {
        DetectorConfig {
            dtw_threshold: 10.0,
            pearson_threshold: 0.87,
            window: 5,
            polyorder: 3,
            use_savgol: true,
        }
    }

    #[test]
    fn test_missing_reference() {
        let sink = CollectingSink::new();
        let detector = CurveSimilarityDetector::new(config(), &sink);
        assert!(detector.compare(&[1.0, 2.0], false).is_err());
        assert!(detector.compare_all(&[vec![1.0]], false, 1).is_err());
    }

    #[test]
    fn test_coeluting_curve_is_similar() {
        let sink = CollectingSink::new();
        let protein = gaussian(60, 30.0, 6.0, 1.0);
        let detector = CurveSimilarityDetector::with_reference(&protein, config(), &sink).unwrap();
        let ligand = gaussian(60, 30.5, 6.0, 1.0);
        let result = detector.compare(&ligand, false).unwrap();
        assert!(result.is_similar, "{:?}", result);
        assert!(result.pearson.unwrap() > 0.95);
    }

    #[test]
    fn test_fast_reject_skips_dtw() {
        let sink = CollectingSink::new();
        let protein = gaussian(60, 15.0, 4.0, 1.0);
        let detector = CurveSimilarityDetector::with_reference(&protein, config(), &sink).unwrap();
        let unrelated = gaussian(60, 45.0, 4.0, 1.0);

        let fast = detector.compare(&unrelated, false).unwrap();
        assert!(!fast.is_similar);
        assert!(fast.dtw.is_none());
        assert!(fast.pearson.unwrap() < 0.87);

        let tracked = detector.compare(&unrelated, true).unwrap();
        assert!(!tracked.is_similar);
        assert!(tracked.dtw.is_some());
        assert_eq!(tracked.pearson, fast.pearson);
    }

    #[test]
    fn test_length_mismatch_gives_failed_result() {
        let sink = CollectingSink::new();
        let protein = gaussian(60, 30.0, 6.0, 1.0);
        let detector = CurveSimilarityDetector::with_reference(&protein, config(), &sink).unwrap();
        let result = detector.compare(&gaussian(40, 20.0, 6.0, 1.0), true).unwrap();
        assert_eq!(result, SimilarityResult::failed());
        // Too short to smooth.
        let result = detector.compare(&[1.0, 2.0], true).unwrap();
        assert_eq!(result, SimilarityResult::failed());
    }

    #[test]
    fn test_batch_preserves_order() {
        let sink = CollectingSink::new();
        let protein = gaussian(50, 25.0, 5.0, 1.0);
        let detector = CurveSimilarityDetector::with_reference(&protein, config(), &sink).unwrap();
        let candidates: Vec<Vec<f64>> = (0..250)
            .map(|i| gaussian(50, (i % 50) as f64, 5.0, 1.0))
            .collect();
        let parallel = detector.compare_all(&candidates, false, 4).unwrap();
        let sequential: Vec<SimilarityResult> = candidates
            .iter()
            .map(|c| detector.compare(c, false).unwrap())
            .collect();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_moving_average_candidates() {
        let sink = CollectingSink::new();
        let mut cfg = config();
        cfg.use_savgol = false;
        let protein = gaussian(60, 30.0, 6.0, 1.0);
        let detector = CurveSimilarityDetector::with_reference(&protein, cfg, &sink).unwrap();
        let reference_len = detector.reference().unwrap().len();
        assert_eq!(reference_len, 60);
        let result = detector.compare(&gaussian(60, 30.0, 6.0, 1.0), true).unwrap();
        assert!(result.pearson.unwrap() > 0.9);
    }
}
