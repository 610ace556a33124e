use serde::{
    Deserialize,
    Serialize,
};

use super::{
    SimilarityResult,
    Timeline,
};

/// How the curves handed back to the caller are scaled.
///
/// Only the returned curves are affected; comparisons always run on
/// max-normalized curves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizationMode {
    /// Code 0. Not selectable from settings labels.
    Unscaled,
    /// Code 1, "No".
    Raw,
    /// Code 2, "Individual".
    #[default]
    Individual,
    /// Code 3, "Together".
    Together,
}

impl NormalizationMode {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unscaled),
            1 => Some(Self::Raw),
            2 => Some(Self::Individual),
            3 => Some(Self::Together),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Unscaled => 0,
            Self::Raw => 1,
            Self::Individual => 2,
            Self::Together => 3,
        }
    }

    /// Maps the settings label to a mode. Labels only reach codes 1 to 3.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "No" => Some(Self::Raw),
            "Individual" => Some(Self::Individual),
            "Together" => Some(Self::Together),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unscaled => "Unscaled",
            Self::Raw => "No",
            Self::Individual => "Individual",
            Self::Together => "Together",
        }
    }
}

/// Output of a targeted or untargeted run.
///
/// Field order is part of the contract with report writers, see
/// [`AnalysisResult::into_tuple`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub mz_values: Vec<f64>,
    pub curves: Vec<Timeline>,
    pub raw_curves: Vec<Timeline>,
    pub similarities: Vec<SimilarityResult>,
    pub protein_curve: Timeline,
    pub creation_date: Option<String>,
}

pub type AnalysisTuple = (
    Vec<f64>,
    Vec<Timeline>,
    Vec<Timeline>,
    Vec<SimilarityResult>,
    Timeline,
    Option<String>,
);

impl AnalysisResult {
    pub fn len(&self) -> usize {
        self.mz_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz_values.is_empty()
    }

    pub fn num_similar(&self) -> usize {
        self.similarities.iter().filter(|s| s.is_similar).count()
    }

    pub fn into_tuple(self) -> AnalysisTuple {
        (
            self.mz_values,
            self.curves,
            self.raw_curves,
            self.similarities,
            self.protein_curve,
            self.creation_date,
        )
    }
}
