use catalyst::{
    AnalysisResult,
    DiskTimelineCache,
    NoCache,
    ProgressSink,
    ScanFileReader,
    Severity,
    TimelineAggregator,
    TimelineCache,
    TracingSink,
    analyze_targeted,
    analyze_untargeted,
};
use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use std::path::{
    Path,
    PathBuf,
};
use std::time::{
    Duration,
    Instant,
};
use tracing::{
    info,
    instrument,
    warn,
};

use crate::cli::{
    ClearCacheArgs,
    RunArgs,
    ScanInfoArgs,
    TargetedArgs,
    WriteTemplateArgs,
};
use crate::errors::{
    CliError,
    SettingsError,
};
use crate::ligands::read_ligand_list;
use crate::output::{
    ReportOptions,
    create_output_directory,
    date_tag,
    write_report,
};
use crate::settings::{
    AnalysisMode,
    Settings,
};

/// Shows the latest message on a spinner and forwards everything to `tracing`.
struct SpinnerSink {
    bar: ProgressBar,
}

impl SpinnerSink {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for SpinnerSink {
    fn report(&self, message: &str, severity: Severity) {
        TracingSink.report(message, severity);
        self.bar.set_message(message.to_string());
    }
}

fn load_run_settings(args: &RunArgs) -> Result<Settings, CliError> {
    let mut settings = match &args.settings {
        Some(path) => {
            info!("Import settings from '{}'.", path.display());
            let loaded = Settings::load(path)?;
            for warning in &loaded.warnings {
                warn!("{}", warning);
            }
            loaded.settings
        }
        None => Settings::default(),
    };
    if let Some(path) = &args.data_path {
        settings.general.data_path = Some(path.clone());
    }
    if let Some(path) = &args.output_folder {
        settings.output.output_folder = Some(path.clone());
    }
    if let Some(mz) = args.protein_mz {
        settings.general.protein_mz = Some(mz);
    }
    if let Some(charge) = args.protein_charge_state {
        settings.general.protein_charge_state = Some(charge);
    }
    if args.no_cache {
        settings.advanced.use_cache = false;
    }
    Ok(settings)
}

fn open_cache(settings: &Settings, cache_dir: &Path) -> Result<Box<dyn TimelineCache>, CliError> {
    if !settings.advanced.use_cache {
        return Ok(Box::new(NoCache));
    }
    let cache = DiskTimelineCache::with_size_gb(cache_dir, settings.advanced.cache_size)?;
    info!(
        "Using timeline cache at {} ({} entries, {} bytes)",
        cache_dir.display(),
        cache.len(),
        cache.total_size()
    );
    Ok(Box::new(cache))
}

enum RunKind {
    Targeted(Vec<f64>),
    Untargeted,
}

/// Runs one analysis and writes its report. Returns the output directory.
fn run_analysis(settings: &Settings, cache_dir: &Path, kind: RunKind) -> Result<PathBuf, CliError> {
    let data_path = settings
        .general
        .data_path
        .clone()
        .ok_or(SettingsError::Missing("data_path"))?;
    let output_root = settings
        .output
        .output_folder
        .clone()
        .ok_or(SettingsError::Missing("output_folder"))?;
    let protein = settings.protein_target()?;

    let cache = open_cache(settings, cache_dir)?;
    let sink = SpinnerSink::new();
    let reader = ScanFileReader::new(data_path)?;
    let mut aggregator = TimelineAggregator::new(reader, cache.as_ref(), &sink);

    let start = Instant::now();
    let outcome: Result<AnalysisResult, CliError> = match kind {
        RunKind::Targeted(ligand_mzs) => {
            let params = settings.targeted_params(ligand_mzs)?;
            analyze_targeted(&mut aggregator, &params).map_err(CliError::from)
        }
        RunKind::Untargeted => {
            let params = settings.untargeted_params()?;
            analyze_untargeted(&mut aggregator, &params).map_err(CliError::from)
        }
    };
    sink.finish();
    let result = outcome?;
    info!(
        "Analysis of {} curves finished in {:.2} seconds, {} similar to the protein",
        result.len(),
        start.elapsed().as_secs_f64(),
        result.num_similar()
    );

    let dir = create_output_directory(&output_root, &date_tag(result.creation_date.as_deref()))?;
    let options = ReportOptions {
        protein_mz: protein.mz,
        start_scan: settings.analysis_window().map_or(0, |w| w.start),
        csv_files: settings.output.csv_files,
    };
    write_report(&dir, &result, &options)?;
    settings.save(&dir.join("catalyst_settings.txt"))?;
    Ok(dir)
}

/// Main function for the 'targeted' subcommand.
#[instrument]
pub fn main_targeted(args: TargetedArgs) -> Result<(), CliError> {
    let mut settings = load_run_settings(&args.run)?;
    settings.general.analysis_mode = AnalysisMode::Targeted;
    if let Some(path) = args.ligands_path {
        settings.targeted.ligands_path = Some(path);
    }
    let ligands_path = settings
        .targeted
        .ligands_path
        .clone()
        .ok_or(SettingsError::Missing("ligands_path"))?;
    let ligand_mzs = read_ligand_list(&ligands_path)?;
    info!("Read {} ligands from {}", ligand_mzs.len(), ligands_path.display());

    let dir = run_analysis(&settings, &args.run.cache_dir, RunKind::Targeted(ligand_mzs))?;
    println!("Results written to {}", dir.display());
    Ok(())
}

/// Main function for the 'untargeted' subcommand.
#[instrument]
pub fn main_untargeted(args: RunArgs) -> Result<(), CliError> {
    let mut settings = load_run_settings(&args)?;
    settings.general.analysis_mode = AnalysisMode::Untargeted;
    let dir = run_analysis(&settings, &args.cache_dir, RunKind::Untargeted)?;
    println!("Results written to {}", dir.display());
    Ok(())
}

/// Main function for the 'scan-info' subcommand.
pub fn main_scan_info(args: ScanInfoArgs) -> Result<(), CliError> {
    let reader = ScanFileReader::new(&args.data_path)?;
    let num_scans = reader.count_scans()?;
    let bounds = reader.mz_bounds(&TracingSink)?;
    println!("File: {}", args.data_path.display());
    println!("Scans: {}", num_scans);
    println!("m/z range: {} - {}", bounds.min_mz, bounds.max_mz);
    Ok(())
}

/// Main function for the 'write-template' subcommand.
pub fn main_write_template(args: WriteTemplateArgs) -> Result<(), CliError> {
    let target_dir = args.output_path;
    std::fs::create_dir_all(&target_dir)?;

    let text_path = target_dir.join("catalyst_settings.txt");
    let json_path = target_dir.join("catalyst_settings.json");
    let defaults = Settings::default();
    defaults.save(&text_path)?;
    defaults.save(&json_path)?;
    println!(
        "Wrote settings templates to:\n- {}\n- {}",
        text_path.display(),
        json_path.display()
    );
    Ok(())
}

/// Main function for the 'clear-cache' subcommand.
pub fn main_clear_cache(args: ClearCacheArgs) -> Result<(), CliError> {
    let cache = DiskTimelineCache::open(&args.cache_dir, 0)?;
    let removed = cache.len();
    cache.clear()?;
    println!(
        "Removed {} cached entries from {}",
        removed,
        cache.root().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    fn write_run(dir: &Path) -> PathBuf {
        let mut text = String::from("H\tCreationDate\t06-May-2024 10:15:00\n");
        for scan in 1..=40usize {
            let x = scan as f64 - 20.0;
            let peak = (-(x / 4.0).powi(2)).exp();
            writeln!(text, "S\t{scan}\t{scan}").unwrap();
            writeln!(text, "I\tfunction=2\tscan={scan}").unwrap();
            writeln!(text, "250.0000 {:.4}", 1.0 + 90.0 * peak).unwrap();
            writeln!(text, "800.0000 {:.4}", 1.0 + 900.0 * peak).unwrap();
        }
        let path = dir.join("run.txt");
        std::fs::write(&path, text).unwrap();
        path
    }

    fn settings(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.data_path = Some(write_run(dir));
        settings.general.protein_mz = Some(800.0);
        settings.general.protein_charge_state = Some(5);
        settings.general.analysis_start = 0;
        settings.output.output_folder = Some(dir.join("out"));
        settings.untargeted.start_mz = 200.0;
        settings.untargeted.end_mz = 300.0;
        settings
    }

    #[test]
    fn test_targeted_run_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let out = run_analysis(
            &settings,
            &dir.path().join("cache"),
            RunKind::Targeted(vec![250.0]),
        )
        .unwrap();

        assert!(out.ends_with("Scan_06-May-2024_10-15-00"));
        assert!(out.join("results.json").exists());
        assert!(out.join("catalyst_settings.txt").exists());
        let summary =
            std::fs::read_to_string(out.join("scan_06-May-2024_10-15-00_all_ligands.csv")).unwrap();
        assert_eq!(summary.lines().count(), 2);
        assert!(
            out.join("scan_06-May-2024_10-15-00_ligand1_mz_250.00.csv")
                .exists()
        );

        let saved = Settings::load(&out.join("catalyst_settings.txt")).unwrap();
        assert_eq!(saved.settings, settings);
    }

    #[test]
    fn test_untargeted_run_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let cache_dir = dir.path().join("cache");
        let first = run_analysis(&settings, &cache_dir, RunKind::Untargeted).unwrap();
        let second = run_analysis(&settings, &cache_dir, RunKind::Untargeted).unwrap();
        assert_ne!(first, second);
        assert!(!DiskTimelineCache::open(&cache_dir, 0).unwrap().is_empty());

        let a = std::fs::read_to_string(first.join("results.json")).unwrap();
        let b = std::fs::read_to_string(second.join("results.json")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_protein_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.general.protein_mz = None;
        let err = run_analysis(&settings, &dir.path().join("cache"), RunKind::Untargeted).unwrap_err();
        assert!(matches!(
            err,
            CliError::Settings(SettingsError::Missing("protein_mz"))
        ));
    }

    #[test]
    fn test_overrides_apply() {
        let args = RunArgs {
            settings: None,
            data_path: Some(PathBuf::from("run.txt")),
            output_folder: None,
            protein_mz: Some(1200.0),
            protein_charge_state: Some(8),
            cache_dir: PathBuf::from("cache"),
            no_cache: true,
        };
        let settings = load_run_settings(&args).unwrap();
        assert_eq!(settings.general.data_path, Some(PathBuf::from("run.txt")));
        assert_eq!(settings.general.protein_mz, Some(1200.0));
        assert_eq!(settings.general.protein_charge_state, Some(8));
        assert!(!settings.advanced.use_cache);
    }
}
