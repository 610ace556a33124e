//! End to end runs: read timelines, build the protein reference, compare
//! and shape the result for reporting.

pub mod normalization;
pub mod protein;
mod targeted;
mod untargeted;

use serde::{
    Deserialize,
    Serialize,
};

use crate::models::Timeline;

pub use normalization::{
    DisplayCurves,
    apply_normalization,
};
pub use protein::{
    ProteinTarget,
    build_protein_curve,
};
pub use targeted::{
    TargetedParams,
    analyze_targeted,
};
pub use untargeted::{
    UntargetedParams,
    analyze_untargeted,
};

/// Scan index range `[start, end)` the comparison is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: usize,
    pub end: usize,
}

impl AnalysisWindow {
    /// A zero bound disables the window.
    ///
    /// ```
    /// use catalyst::analysis::AnalysisWindow;
    ///
    /// assert!(AnalysisWindow::from_bounds(0, 100).is_none());
    /// let window = AnalysisWindow::from_bounds(1, 3).unwrap();
    /// assert_eq!(window.slice(&[0.0, 1.0, 2.0, 3.0]), &[1.0, 2.0]);
    /// ```
    pub fn from_bounds(start: usize, end: usize) -> Option<Self> {
        if start == 0 || end == 0 {
            None
        } else {
            Some(Self { start, end })
        }
    }

    /// Bounds past the end of the curve are clamped.
    pub fn slice<'c>(&self, curve: &'c [f64]) -> &'c [f64] {
        let end = self.end.min(curve.len());
        let start = self.start.min(end);
        &curve[start..end]
    }
}

fn slice_curve(curve: &[f64], window: Option<AnalysisWindow>) -> Timeline {
    match window {
        Some(w) => w.slice(curve).to_vec(),
        None => curve.to_vec(),
    }
}
