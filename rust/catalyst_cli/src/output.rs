use catalyst::AnalysisResult;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{
    Path,
    PathBuf,
};
use tracing::info;

use crate::errors::CliError;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// File name friendly form of the acquisition date.
pub fn date_tag(creation_date: Option<&str>) -> String {
    match creation_date {
        Some(date) if !date.trim().is_empty() => date
            .trim()
            .chars()
            .map(|c| match c {
                ' ' => '_',
                ':' | '/' | '\\' => '-',
                c => c,
            })
            .collect(),
        _ => "unknown".to_string(),
    }
}

/// Creates `Scan_<date>` under `root`, adding ` (n)` when it already exists.
pub fn create_output_directory(root: &Path, tag: &str) -> Result<PathBuf, CliError> {
    std::fs::create_dir_all(root)?;
    let base = format!("Scan_{}", tag);
    let mut candidate = root.join(&base);
    let mut n = 1;
    while candidate.exists() {
        candidate = root.join(format!("{} ({})", base, n));
        n += 1;
    }
    std::fs::create_dir(&candidate)?;
    Ok(candidate)
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    #[serde(rename = "Ligand Number")]
    ligand_number: usize,
    #[serde(rename = "m/z")]
    mz: f64,
    #[serde(rename = "Pearson similarity")]
    pearson_pct: Option<f64>,
    #[serde(rename = "DTW score")]
    dtw: Option<f64>,
    #[serde(rename = "EIC intensity")]
    eic_intensity: Option<f64>,
}

#[derive(Debug, Serialize)]
struct IntensityRow {
    #[serde(rename = "Scan Number")]
    scan_number: usize,
    #[serde(rename = "Intensity")]
    intensity: f64,
}

/// One row per ligand. Pearson is a percentage, the EIC intensity is the
/// maximum of the raw curve. Missing scores are left empty.
pub fn write_summary_csv(path: &Path, result: &AnalysisResult) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_path(path)?;
    for (idx, mz) in result.mz_values.iter().enumerate() {
        let similarity = result.similarities.get(idx);
        let eic_intensity = result
            .raw_curves
            .get(idx)
            .and_then(|c| c.iter().copied().reduce(f64::max));
        writer.serialize(SummaryRow {
            ligand_number: idx + 1,
            mz: *mz,
            pearson_pct: similarity.and_then(|s| s.pearson).map(|p| round2(p * 100.0)),
            dtw: similarity.and_then(|s| s.dtw).map(round2),
            eic_intensity: eic_intensity.map(round2),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// `Scan Number, Intensity` rows, numbered from `start_scan`.
pub fn write_intensity_csv(path: &Path, curve: &[f64], start_scan: usize) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_path(path)?;
    for (idx, intensity) in curve.iter().enumerate() {
        writer.serialize(IntensityRow {
            scan_number: start_scan + idx,
            intensity: *intensity,
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_results_json(path: &Path, result: &AnalysisResult) -> Result<(), CliError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, result)?;
    Ok(())
}

pub struct ReportOptions {
    pub protein_mz: f64,
    /// Scan number of the first sample of every curve.
    pub start_scan: usize,
    pub csv_files: bool,
}

/// Writes every output file of a run into `dir` and returns their paths.
pub fn write_report(
    dir: &Path,
    result: &AnalysisResult,
    options: &ReportOptions,
) -> Result<Vec<PathBuf>, CliError> {
    let tag = date_tag(result.creation_date.as_deref());
    let mut written = Vec::new();

    let json_path = dir.join("results.json");
    write_results_json(&json_path, result)?;
    written.push(json_path);

    if options.csv_files {
        let summary_path = dir.join(format!("scan_{}_all_ligands.csv", tag));
        write_summary_csv(&summary_path, result)?;
        written.push(summary_path);

        for (idx, (curve, mz)) in result.curves.iter().zip(&result.mz_values).enumerate() {
            let path = dir.join(format!("scan_{}_ligand{}_mz_{:.2}.csv", tag, idx + 1, mz));
            write_intensity_csv(&path, curve, options.start_scan)?;
            written.push(path);
        }
        let protein_path = dir.join(format!("scan_{}_protein_mz_{:.2}.csv", tag, options.protein_mz));
        write_intensity_csv(&protein_path, &result.protein_curve, options.start_scan)?;
        written.push(protein_path);
    }

    info!("Wrote {} output files to {}", written.len(), dir.display());
    Ok(written)
}
