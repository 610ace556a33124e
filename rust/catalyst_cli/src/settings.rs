//! User settings, stored either as the CATALYST text format or as JSON.
//!
//! The text format is line based:
//!
//! ```text
//! CATALYST settings v1.2
//! # General settings
//! protein_mz=1000.0
//! data_path=None
//! ...
//! ```

use catalyst::analysis::{
    AnalysisWindow,
    ProteinTarget,
    TargetedParams,
    UntargetedParams,
};
use catalyst::{
    DetectorConfig,
    NormalizationMode,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt::Display;
use std::path::{
    Path,
    PathBuf,
};
use std::str::FromStr;

use crate::errors::{
    CliError,
    SettingsError,
};

pub const SETTINGS_VERSION: &str = "1.2";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisMode {
    #[default]
    Targeted,
    Untargeted,
}

impl FromStr for AnalysisMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Targeted" => Ok(Self::Targeted),
            "Untargeted" => Ok(Self::Untargeted),
            _ => Err(()),
        }
    }
}

impl Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Targeted => write!(f, "Targeted"),
            Self::Untargeted => write!(f, "Untargeted"),
        }
    }
}

/// Normalization modes are stored by their label ("No", "Individual", "Together").
mod normalization_label {
    use catalyst::NormalizationMode;
    use serde::{
        Deserialize,
        Deserializer,
        Serializer,
    };

    pub fn serialize<S: Serializer>(mode: &NormalizationMode, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(mode.label())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NormalizationMode, D::Error> {
        let label = String::deserialize(d)?;
        NormalizationMode::from_label(&label).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown normalization mode '{}'", label))
        })
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T, SettingsError> {
    value.parse().map_err(|_| SettingsError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_optional<T: FromStr>(name: &str, value: &str) -> Result<Option<T>, SettingsError> {
    if value == "None" {
        Ok(None)
    } else {
        parse(name, value).map(Some)
    }
}

fn parse_bool(value: &str) -> bool {
    value == "True"
}

fn parse_normalization(name: &str, value: &str) -> Result<NormalizationMode, SettingsError> {
    NormalizationMode::from_label(value).ok_or_else(|| SettingsError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn fmt_float(value: f64) -> String {
    format!("{:?}", value)
}

fn fmt_optional<T, F: Fn(&T) -> String>(value: &Option<T>, f: F) -> String {
    match value {
        Some(v) => f(v),
        None => "None".to_string(),
    }
}

fn fmt_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    pub data_path: Option<PathBuf>,
    pub protein_mz: Option<f64>,
    pub protein_charge_state: Option<i64>,
    pub function_protein: u32,
    pub function_ligand: u32,
    pub protein_sampling_range: f64,
    pub ligand_sampling_range: f64,
    pub dtw_threshold: f64,
    pub pearson_threshold: f64,
    pub analysis_start: usize,
    pub analysis_end: usize,
    pub analysis_mode: AnalysisMode,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_path: None,
            protein_mz: None,
            protein_charge_state: None,
            function_protein: 2,
            function_ligand: 2,
            protein_sampling_range: 4.0,
            ligand_sampling_range: 0.04,
            dtw_threshold: 10.0,
            pearson_threshold: 0.87,
            analysis_start: 1,
            analysis_end: 100,
            analysis_mode: AnalysisMode::Targeted,
        }
    }
}

impl GeneralSettings {
    fn assign(&mut self, name: &str, value: &str) -> Result<bool, SettingsError> {
        match name {
            "data_path" => self.data_path = parse_optional(name, value)?,
            "protein_mz" => self.protein_mz = parse_optional(name, value)?,
            "protein_charge_state" => self.protein_charge_state = parse_optional(name, value)?,
            "function_protein" => self.function_protein = parse(name, value)?,
            "function_ligand" => self.function_ligand = parse(name, value)?,
            "protein_sampling_range" => self.protein_sampling_range = parse(name, value)?,
            "ligand_sampling_range" => self.ligand_sampling_range = parse(name, value)?,
            "dtw_threshold" => self.dtw_threshold = parse(name, value)?,
            "pearson_threshold" => self.pearson_threshold = parse(name, value)?,
            "analysis_start" => self.analysis_start = parse(name, value)?,
            "analysis_end" => self.analysis_end = parse(name, value)?,
            "analysis_mode" => self.analysis_mode = parse(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("data_path", fmt_optional(&self.data_path, |p| p.display().to_string())),
            ("protein_mz", fmt_optional(&self.protein_mz, |v| fmt_float(*v))),
            ("protein_charge_state", fmt_optional(&self.protein_charge_state, |v| v.to_string())),
            ("function_protein", self.function_protein.to_string()),
            ("function_ligand", self.function_ligand.to_string()),
            ("protein_sampling_range", fmt_float(self.protein_sampling_range)),
            ("ligand_sampling_range", fmt_float(self.ligand_sampling_range)),
            ("dtw_threshold", fmt_float(self.dtw_threshold)),
            ("pearson_threshold", fmt_float(self.pearson_threshold)),
            ("analysis_start", self.analysis_start.to_string()),
            ("analysis_end", self.analysis_end.to_string()),
            ("analysis_mode", self.analysis_mode.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetedSettings {
    pub ligands_path: Option<PathBuf>,
}

impl TargetedSettings {
    fn assign(&mut self, name: &str, value: &str) -> Result<bool, SettingsError> {
        match name {
            "ligands_path" => self.ligands_path = parse_optional(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        vec![(
            "ligands_path",
            fmt_optional(&self.ligands_path, |p| p.display().to_string()),
        )]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UntargetedSettings {
    pub charge_state_exclusion: i64,
    pub start_mz: f64,
    pub end_mz: f64,
    pub ligand_group_range: f64,
    pub protein_exclusion_window: f64,
}

impl Default for UntargetedSettings {
    fn default() -> Self {
        Self {
            charge_state_exclusion: 3,
            start_mz: 50.0,
            end_mz: 8000.0,
            ligand_group_range: 1.0,
            protein_exclusion_window: 5.0,
        }
    }
}

impl UntargetedSettings {
    fn assign(&mut self, name: &str, value: &str) -> Result<bool, SettingsError> {
        match name {
            "charge_state_exclusion" => self.charge_state_exclusion = parse(name, value)?,
            "start_mz" => self.start_mz = parse(name, value)?,
            "end_mz" => self.end_mz = parse(name, value)?,
            "ligand_group_range" => self.ligand_group_range = parse(name, value)?,
            "protein_exclusion_window" => self.protein_exclusion_window = parse(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("charge_state_exclusion", self.charge_state_exclusion.to_string()),
            ("start_mz", fmt_float(self.start_mz)),
            ("end_mz", fmt_float(self.end_mz)),
            ("ligand_group_range", fmt_float(self.ligand_group_range)),
            ("protein_exclusion_window", fmt_float(self.protein_exclusion_window)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub output_folder: Option<PathBuf>,
    #[serde(with = "normalization_label")]
    pub normalization_mode: NormalizationMode,
    /// Kept for compatibility with settings files written by the plotting
    /// front end. Not used when writing tables.
    pub graph_combination: String,
    pub csv_files: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            output_folder: None,
            normalization_mode: NormalizationMode::Individual,
            graph_combination: "One plot".to_string(),
            csv_files: true,
        }
    }
}

impl OutputSettings {
    fn assign(&mut self, name: &str, value: &str) -> Result<bool, SettingsError> {
        match name {
            "output_folder" => self.output_folder = parse_optional(name, value)?,
            "normalization_mode" => self.normalization_mode = parse_normalization(name, value)?,
            "graph_combination" => self.graph_combination = value.to_string(),
            "csv_files" => self.csv_files = parse_bool(value),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("output_folder", fmt_optional(&self.output_folder, |p| p.display().to_string())),
            ("normalization_mode", self.normalization_mode.label().to_string()),
            ("graph_combination", self.graph_combination.clone()),
            ("csv_files", fmt_bool(self.csv_files).to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    pub charge_state_sum: i64,
    pub filter_window: usize,
    pub filter_polyorder: usize,
    pub parse_processes: usize,
    pub analysis_processes: usize,
    /// Cache size limit in GB.
    pub cache_size: f64,
    pub use_cache: bool,
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            charge_state_sum: 0,
            filter_window: 5,
            filter_polyorder: 3,
            parse_processes: 1,
            analysis_processes: 4,
            cache_size: 2.0,
            use_cache: true,
        }
    }
}

impl AdvancedSettings {
    fn assign(&mut self, name: &str, value: &str) -> Result<bool, SettingsError> {
        match name {
            "charge_state_sum" => self.charge_state_sum = parse(name, value)?,
            "filter_window" => self.filter_window = parse(name, value)?,
            "filter_polyorder" => self.filter_polyorder = parse(name, value)?,
            "parse_processes" => self.parse_processes = parse(name, value)?,
            "analysis_processes" => self.analysis_processes = parse(name, value)?,
            "cache_size" => self.cache_size = parse(name, value)?,
            "use_cache" => self.use_cache = parse_bool(value),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("charge_state_sum", self.charge_state_sum.to_string()),
            ("filter_window", self.filter_window.to_string()),
            ("filter_polyorder", self.filter_polyorder.to_string()),
            ("parse_processes", self.parse_processes.to_string()),
            ("analysis_processes", self.analysis_processes.to_string()),
            ("cache_size", fmt_float(self.cache_size)),
            ("use_cache", fmt_bool(self.use_cache).to_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    General,
    Targeted,
    Untargeted,
    Output,
    Advanced,
}

impl Category {
    const ALL: [Category; 5] = [
        Category::General,
        Category::Targeted,
        Category::Untargeted,
        Category::Output,
        Category::Advanced,
    ];

    fn header(&self) -> &'static str {
        match self {
            Self::General => "General settings",
            Self::Targeted => "Targeted settings",
            Self::Untargeted => "Untargeted settings",
            Self::Output => "Output settings",
            Self::Advanced => "Advanced settings",
        }
    }

    fn from_header(header: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.header() == header)
    }
}

enum Section {
    Start,
    Known(Category),
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub targeted: TargetedSettings,
    pub untargeted: UntargetedSettings,
    pub output: OutputSettings,
    pub advanced: AdvancedSettings,
}

/// Settings read from a file together with the lines that were skipped.
#[derive(Debug)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub warnings: Vec<String>,
}

impl Settings {
    fn assign(&mut self, category: Category, name: &str, value: &str) -> Result<bool, SettingsError> {
        match category {
            Category::General => self.general.assign(name, value),
            Category::Targeted => self.targeted.assign(name, value),
            Category::Untargeted => self.untargeted.assign(name, value),
            Category::Output => self.output.assign(name, value),
            Category::Advanced => self.advanced.assign(name, value),
        }
    }

    fn entries(&self, category: Category) -> Vec<(&'static str, String)> {
        match category {
            Category::General => self.general.entries(),
            Category::Targeted => self.targeted.entries(),
            Category::Untargeted => self.untargeted.entries(),
            Category::Output => self.output.entries(),
            Category::Advanced => self.advanced.entries(),
        }
    }

    /// Parses the text format. Unknown categories and names are skipped and
    /// reported as warnings; invalid values and a wrong version line fail.
    pub fn from_text(text: &str) -> Result<LoadedSettings, SettingsError> {
        let mut lines = text.lines();
        let first = lines.next().unwrap_or_default();
        let version_tag = format!("CATALYST settings v{}", SETTINGS_VERSION);
        if !first.contains(&version_tag) {
            return Err(SettingsError::WrongVersion {
                expected: SETTINGS_VERSION,
                found: first.to_string(),
            });
        }

        let mut settings = Settings::default();
        let mut warnings = Vec::new();
        let mut section = Section::Start;
        for (idx, raw) in lines.enumerate() {
            let line = raw.trim();
            let line_number = idx + 2;
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('#') {
                let header = header.trim();
                section = match Category::from_header(header) {
                    Some(category) => Section::Known(category),
                    None => {
                        warnings.push(format!("Unknown settings category '{}'.", header));
                        Section::Unknown
                    }
                };
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                return Err(SettingsError::MalformedLine {
                    line_number,
                    line: line.to_string(),
                });
            };
            match section {
                Section::Start => {
                    return Err(SettingsError::OutsideCategory {
                        line_number,
                        line: line.to_string(),
                    });
                }
                Section::Unknown => {}
                Section::Known(category) => {
                    if !settings.assign(category, name.trim(), value.trim())? {
                        warnings.push(format!(
                            "Wrong setting '{}' in category '{}'.",
                            line,
                            category.header()
                        ));
                    }
                }
            }
        }
        Ok(LoadedSettings { settings, warnings })
    }

    pub fn to_text(&self) -> String {
        let mut out = format!("CATALYST settings v{}\n", SETTINGS_VERSION);
        for category in Category::ALL {
            out.push_str(&format!("# {}\n", category.header()));
            for (name, value) in self.entries(category) {
                out.push_str(&format!("{}={}\n", name, value));
            }
        }
        out
    }

    /// Reads a `.json` file with serde, anything else as the text format.
    pub fn load(path: &Path) -> Result<LoadedSettings, CliError> {
        let text = std::fs::read_to_string(path)?;
        if is_json(path) {
            let settings = serde_json::from_str(&text)?;
            return Ok(LoadedSettings {
                settings,
                warnings: Vec::new(),
            });
        }
        Ok(Self::from_text(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        let text = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            self.to_text()
        };
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Scan window from `analysis_start`/`analysis_end`. A zero bound
    /// disables it.
    pub fn analysis_window(&self) -> Option<AnalysisWindow> {
        AnalysisWindow::from_bounds(self.general.analysis_start, self.general.analysis_end)
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            dtw_threshold: self.general.dtw_threshold,
            pearson_threshold: self.general.pearson_threshold,
            window: self.advanced.filter_window,
            polyorder: self.advanced.filter_polyorder,
            use_savgol: true,
        }
    }

    pub fn protein_target(&self) -> Result<ProteinTarget, SettingsError> {
        Ok(ProteinTarget {
            mz: self
                .general
                .protein_mz
                .ok_or(SettingsError::Missing("protein_mz"))?,
            charge_state: self
                .general
                .protein_charge_state
                .ok_or(SettingsError::Missing("protein_charge_state"))?,
            function: self.general.function_protein,
            sampling_range: self.general.protein_sampling_range,
            averaging_window: self.advanced.charge_state_sum,
        })
    }

    pub fn targeted_params(&self, ligand_mzs: Vec<f64>) -> Result<TargetedParams, SettingsError> {
        Ok(TargetedParams {
            ligand_mzs,
            ligand_function: self.general.function_ligand,
            ligand_sampling_range: self.general.ligand_sampling_range,
            protein: self.protein_target()?,
            detector: self.detector_config(),
            window: self.analysis_window(),
            normalization: self.output.normalization_mode,
            use_cache: self.advanced.use_cache,
        })
    }

    pub fn untargeted_params(&self) -> Result<UntargetedParams, SettingsError> {
        Ok(UntargetedParams {
            start_mz: self.untargeted.start_mz,
            end_mz: self.untargeted.end_mz,
            ligand_function: self.general.function_ligand,
            ligand_sampling_range: self.general.ligand_sampling_range,
            protein: self.protein_target()?,
            detector: self.detector_config(),
            window: self.analysis_window(),
            normalization: self.output.normalization_mode,
            group_range: self.untargeted.ligand_group_range,
            protein_exclusion_window: self.untargeted.protein_exclusion_window,
            charge_state_radius: self.untargeted.charge_state_exclusion,
            parse_workers: self.advanced.parse_processes,
            analysis_workers: self.advanced.analysis_processes,
            use_cache: self.advanced.use_cache,
        })
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_text_round_trip() {
        let text = Settings::default().to_text();
        assert!(text.starts_with("CATALYST settings v1.2\n# General settings\n"));
        assert!(text.contains("ligand_sampling_range=0.04\n"));
        assert!(text.contains("end_mz=8000.0\n"));
        assert!(text.contains("normalization_mode=Individual\n"));
        assert!(text.contains("use_cache=True\n"));
        assert!(text.contains("data_path=None\n"));

        let loaded = Settings::from_text(&text).unwrap();
        assert_eq!(loaded.settings, Settings::default());
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_values_and_unknown_names() {
        let text = "# CATALYST settings v1.2\n\
# General settings\n\
protein_mz = 1500.5\n\
protein_charge_state=12\n\
analysis_mode=Untargeted\n\
colour=blue\n\
# Output settings\n\
normalization_mode=No\n\
csv_files=False\n\
# Plot settings\n\
dpi=300\n";
        let loaded = Settings::from_text(text).unwrap();
        let s = loaded.settings;
        assert_eq!(s.general.protein_mz, Some(1500.5));
        assert_eq!(s.general.protein_charge_state, Some(12));
        assert_eq!(s.general.analysis_mode, AnalysisMode::Untargeted);
        assert_eq!(s.output.normalization_mode, NormalizationMode::Raw);
        assert!(!s.output.csv_files);
        assert_eq!(loaded.warnings.len(), 2);
        assert!(loaded.warnings[0].contains("colour=blue"));
        assert!(loaded.warnings[1].contains("Plot settings"));
    }

    #[test]
    fn test_wrong_version_and_bad_values() {
        let err = Settings::from_text("CATALYST settings v1.1\n").unwrap_err();
        assert!(matches!(err, SettingsError::WrongVersion { .. }));
        assert!(Settings::from_text("").is_err());

        let err = Settings::from_text("CATALYST settings v1.2\n# General settings\nfunction_ligand=two\n")
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));

        let err = Settings::from_text("CATALYST settings v1.2\nprotein_mz=3\n").unwrap_err();
        assert!(matches!(err, SettingsError::OutsideCategory { line_number: 2, .. }));
    }

    #[test]
    fn test_params_need_protein() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.untargeted_params(),
            Err(SettingsError::Missing("protein_mz"))
        ));
        settings.general.protein_mz = Some(800.0);
        settings.general.protein_charge_state = Some(15);
        settings.advanced.charge_state_sum = 2;

        let params = settings.untargeted_params().unwrap();
        assert_eq!(params.protein.averaging_window, 2);
        assert_eq!(params.charge_state_radius, 3);
        assert_eq!(params.window, Some(AnalysisWindow { start: 1, end: 100 }));

        settings.general.analysis_start = 0;
        let params = settings.targeted_params(vec![300.0]).unwrap();
        assert_eq!(params.window, None);
        assert_eq!(params.normalization, NormalizationMode::Individual);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.output.normalization_mode = NormalizationMode::Together;
        settings.save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"Together\""));
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.settings, settings);
    }
}
