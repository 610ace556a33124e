use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings file does not match the CATALYST settings v{expected} format (first line: '{found}')")]
    WrongVersion { expected: &'static str, found: String },

    #[error("Line {line_number} is not a 'name=value' pair: '{line}'")]
    MalformedLine { line_number: usize, line: String },

    #[error("Line {line_number} appears before any settings category: '{line}'")]
    OutsideCategory { line_number: usize, line: String },

    #[error("Invalid value '{value}' for setting '{name}'")]
    InvalidValue { name: String, value: String },

    #[error("Setting '{0}' is required for this analysis")]
    Missing(&'static str),
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Catalyst(#[from] catalyst::CatalystError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Not all ligand masses in {path} are convertible to float (line {line_number}: '{line}')")]
    LigandList {
        path: PathBuf,
        line_number: usize,
        line: String,
    },
}
