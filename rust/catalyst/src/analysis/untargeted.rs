use serde::{
    Deserialize,
    Serialize,
};
use std::time::Instant;
use tracing::instrument;

use super::protein::{
    ProteinTarget,
    build_protein_curve,
    pad_or_truncate,
};
use super::{
    AnalysisWindow,
    apply_normalization,
    slice_curve,
};
use crate::aggregation::TimelineAggregator;
use crate::errors::Result;
use crate::models::{
    AnalysisResult,
    Candidate,
    NormalizationMode,
    Timeline,
};
use crate::processing::normalize_curve;
use crate::scoring::{
    CurveSimilarityDetector,
    DetectorConfig,
    ProteinExclusion,
    group_and_filter,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UntargetedParams {
    /// Bins with centers in `[start_mz, end_mz)` are candidates.
    pub start_mz: f64,
    pub end_mz: f64,
    pub ligand_function: u32,
    pub ligand_sampling_range: f64,
    pub protein: ProteinTarget,
    pub detector: DetectorConfig,
    pub window: Option<AnalysisWindow>,
    pub normalization: NormalizationMode,
    /// Width of the m/z groups reduced to a single representative.
    pub group_range: f64,
    pub protein_exclusion_window: f64,
    /// Protein charge states excluded on each side of the protein charge.
    pub charge_state_radius: i64,
    pub parse_workers: usize,
    pub analysis_workers: usize,
    pub use_cache: bool,
}

impl UntargetedParams {
    pub fn exclusion(&self) -> ProteinExclusion {
        ProteinExclusion::new(
            self.protein.mz,
            self.protein.charge_state,
            self.charge_state_radius,
            self.protein_exclusion_window,
        )
    }
}

/// Screens every m/z bin of the range against the protein.
///
/// Candidates below the correlation threshold are rejected early. The
/// survivors are grouped by m/z and only the best of each group is
/// returned. An empty result means nothing survived grouping.
#[instrument(skip_all, fields(start_mz = params.start_mz, end_mz = params.end_mz))]
pub fn analyze_untargeted(
    aggregator: &mut TimelineAggregator<'_>,
    params: &UntargetedParams,
) -> Result<AnalysisResult> {
    let progress = aggregator.progress();
    let all_timelines = aggregator.get_all_intensity_timelines(
        params.ligand_sampling_range,
        params.start_mz,
        params.end_mz,
        params.ligand_function,
        params.parse_workers,
        params.use_cache,
    )?;

    let protein = build_protein_curve(aggregator, &params.protein, params.use_cache)?;
    let protein = match all_timelines.values().next() {
        Some(first) => pad_or_truncate(protein, first.len()),
        None => protein,
    };

    // Cached maps may cover a wider range than requested.
    let (mz_values, bin_curves): (Vec<f64>, Vec<Timeline>) = all_timelines
        .iter()
        .filter(|(center, _)| params.start_mz <= center.mz() && center.mz() < params.end_mz)
        .map(|(center, timeline)| (center.mz(), slice_curve(timeline, params.window)))
        .unzip();
    let protein = slice_curve(&protein, params.window);
    let normalized: Vec<Timeline> = bin_curves.iter().map(|c| normalize_curve(c)).collect();

    let detector =
        CurveSimilarityDetector::with_reference(&normalize_curve(&protein), params.detector, progress)?;
    let start = Instant::now();
    let similarities = detector.compare_all(&normalized, false, params.analysis_workers)?;
    progress.log(&format!(
        "Time taken to compare the bin curves: {:.2} seconds.",
        start.elapsed().as_secs_f64()
    ));

    let candidates: Vec<Candidate> = mz_values
        .into_iter()
        .zip(bin_curves)
        .zip(similarities)
        .map(|((mz, curve), result)| Candidate { mz, curve, result })
        .collect();
    let grouped = match group_and_filter(candidates, params.group_range, &params.exclusion()) {
        Some(grouped) => grouped,
        None => {
            progress.surface("No similar curves found.");
            Vec::new()
        }
    };

    let mut mz_values = Vec::with_capacity(grouped.len());
    let mut raw_curves = Vec::with_capacity(grouped.len());
    let mut similarities = Vec::with_capacity(grouped.len());
    for candidate in grouped {
        mz_values.push(candidate.mz);
        raw_curves.push(candidate.curve);
        similarities.push(candidate.result);
    }

    let display = apply_normalization(params.normalization, &raw_curves, &protein);
    Ok(AnalysisResult {
        mz_values,
        curves: display.curves,
        raw_curves,
        similarities,
        protein_curve: display.protein,
        creation_date: aggregator.creation_date().map(str::to_string),
    })
}
