use serde::{
    Deserialize,
    Serialize,
};
use std::time::Instant;
use tracing::instrument;

use super::protein::{
    ProteinTarget,
    build_protein_curve,
    is_item_local,
    pad_or_truncate,
};
use super::{
    AnalysisWindow,
    apply_normalization,
    slice_curve,
};
use crate::aggregation::TimelineAggregator;
use crate::errors::{
    DataProcessingError,
    Result,
};
use crate::models::{
    AnalysisResult,
    NormalizationMode,
    Timeline,
};
use crate::processing::normalize_curve;
use crate::scoring::{
    CurveSimilarityDetector,
    DetectorConfig,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetedParams {
    pub ligand_mzs: Vec<f64>,
    pub ligand_function: u32,
    pub ligand_sampling_range: f64,
    pub protein: ProteinTarget,
    pub detector: DetectorConfig,
    pub window: Option<AnalysisWindow>,
    pub normalization: NormalizationMode,
    pub use_cache: bool,
}

/// Compares a fixed list of ligand m/z values against the protein.
///
/// Every ligand is scored (tracked mode, no fast reject) and kept in the
/// output in input order. A ligand without data gets an empty curve and a
/// failed comparison.
#[instrument(skip_all, fields(num_ligands = params.ligand_mzs.len()))]
pub fn analyze_targeted(
    aggregator: &mut TimelineAggregator<'_>,
    params: &TargetedParams,
) -> Result<AnalysisResult> {
    if params.ligand_mzs.is_empty() {
        return Err(DataProcessingError::ExpectedNonEmptyData {
            context: "ligand m/z values".to_string(),
        }
        .into());
    }
    let progress = aggregator.progress();

    let start = Instant::now();
    let mut timelines: Vec<Timeline> = Vec::with_capacity(params.ligand_mzs.len());
    for &mz in &params.ligand_mzs {
        match aggregator.get_intensity_timeline(
            mz,
            params.ligand_sampling_range,
            params.ligand_function,
            params.use_cache,
        ) {
            Ok(timeline) => timelines.push(timeline),
            Err(e) if is_item_local(&e) => {
                progress.surface(&format!("{} Ligand is ignored.", e));
                timelines.push(Vec::new());
            }
            Err(e) => return Err(e),
        }
    }
    progress.log(&format!(
        "Time taken to get the intensity data: {:.2} seconds.",
        start.elapsed().as_secs_f64()
    ));

    let protein = build_protein_curve(aggregator, &params.protein, params.use_cache)?;
    let protein = match timelines.iter().find(|t| !t.is_empty()) {
        Some(first) => pad_or_truncate(protein, first.len()),
        None => protein,
    };

    let ligand_curves: Vec<Timeline> = timelines
        .iter()
        .map(|t| slice_curve(t, params.window))
        .collect();
    let protein = slice_curve(&protein, params.window);
    let normalized: Vec<Timeline> = ligand_curves.iter().map(|c| normalize_curve(c)).collect();

    let detector =
        CurveSimilarityDetector::with_reference(&normalize_curve(&protein), params.detector, progress)?;
    let similarities = detector.compare_all(&normalized, true, 1)?;

    let display = apply_normalization(params.normalization, &ligand_curves, &protein);
    Ok(AnalysisResult {
        mz_values: params.ligand_mzs.clone(),
        curves: display.curves,
        raw_curves: ligand_curves,
        similarities,
        protein_curve: display.protein,
        creation_date: aggregator.creation_date().map(str::to_string),
    })
}
