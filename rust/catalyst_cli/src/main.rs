mod cli;
mod commands;
mod errors;
mod ligands;
mod output;
mod settings;

use clap::Parser;
use tracing::subscriber::set_global_default;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

use crate::cli::{
    Args,
    Commands,
};
use crate::commands::{
    main_clear_cache,
    main_scan_info,
    main_targeted,
    main_untargeted,
    main_write_template,
};
use crate::errors::CliError;

// Without mimalloc the many small allocations of the parser are very slow
// on windows.
#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<(), CliError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE));

    set_global_default(subscriber).expect("Setting default subscriber failed");
    let args = Args::parse();

    match args.command {
        Some(Commands::Targeted(args)) => main_targeted(args)?,
        Some(Commands::Untargeted(args)) => main_untargeted(args)?,
        Some(Commands::ScanInfo(args)) => main_scan_info(args)?,
        Some(Commands::WriteTemplate(args)) => main_write_template(args)?,
        Some(Commands::ClearCache(args)) => main_clear_cache(args)?,
        None => {
            println!("No command provided");
        }
    }
    Ok(())
}
