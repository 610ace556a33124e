use clap::{
    Parser,
    Subcommand,
};
use std::path::PathBuf;

pub const DEFAULT_CACHE_DIR: &str = ".catalyst/cache";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare a list of ligand m/z values against the protein.
    Targeted(TargetedArgs),
    /// Screen every m/z bin of a range against the protein.
    Untargeted(RunArgs),
    /// Print the scan count and m/z range of a scan file.
    ScanInfo(ScanInfoArgs),
    /// Write settings files with the default values.
    WriteTemplate(WriteTemplateArgs),
    /// Remove every cached timeline.
    ClearCache(ClearCacheArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Settings file (CATALYST text format, or JSON with a .json extension).
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Scan file to analyze (over-writes the settings file).
    #[arg(short, long)]
    pub data_path: Option<PathBuf>,

    /// Folder the results folder is created in (over-writes the settings file).
    #[arg(short, long)]
    pub output_folder: Option<PathBuf>,

    /// Protein m/z (over-writes the settings file).
    #[arg(long)]
    pub protein_mz: Option<f64>,

    /// Protein charge state (over-writes the settings file).
    #[arg(long)]
    pub protein_charge_state: Option<i64>,

    /// Directory of the timeline cache.
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Do not read or write cached timelines.
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct TargetedArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// File with one ligand m/z per line (over-writes the settings file).
    #[arg(short, long)]
    pub ligands_path: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ScanInfoArgs {
    /// The scan file to inspect.
    #[arg(short, long)]
    pub data_path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct WriteTemplateArgs {
    /// The directory to write the templates to.
    #[arg(short, long)]
    pub output_path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ClearCacheArgs {
    /// Directory of the timeline cache.
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,
}
