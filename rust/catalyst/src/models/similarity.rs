use serde::{
    Deserialize,
    Serialize,
};

/// Outcome of comparing one candidate curve against the reference.
///
/// `None` in either score means the comparison failed for that candidate
/// (or, for `dtw`, that it was skipped by the fast-reject shortcut).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub is_similar: bool,
    pub dtw: Option<f64>,
    pub pearson: Option<f64>,
}

impl SimilarityResult {
    pub fn failed() -> Self {
        Self {
            is_similar: false,
            dtw: None,
            pearson: None,
        }
    }

    pub fn rejected(pearson: f64) -> Self {
        Self {
            is_similar: false,
            dtw: None,
            pearson: Some(pearson),
        }
    }

    /// Both scores present.
    pub fn is_complete(&self) -> bool {
        self.dtw.is_some() && self.pearson.is_some()
    }

    /// Ranking key within a group: highest correlation, then lowest distance.
    pub fn rank_key(&self) -> Option<(f64, f64)> {
        match (self.pearson, self.dtw) {
            (Some(p), Some(d)) => Some((p, -d)),
            _ => None,
        }
    }
}

/// One m/z bin (or ligand) with its curve and comparison outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub mz: f64,
    pub curve: Vec<f64>,
    pub result: SimilarityResult,
}
