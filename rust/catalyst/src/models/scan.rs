use serde::{
    Deserialize,
    Serialize,
};
use std::collections::BTreeMap;

use super::BinCenter;

/// One intensity per scan, in scan-number order.
pub type Timeline = Vec<f64>;

/// Timelines for every bin of a full-spectrum aggregation.
pub type TimelineMap = BTreeMap<BinCenter, Timeline>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub mz: f64,
    pub intensity: f64,
}

impl Reading {
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

impl From<(f64, f64)> for Reading {
    fn from((mz, intensity): (f64, f64)) -> Self {
        Self { mz, intensity }
    }
}

/// Parsed readings of a single function channel.
///
/// Readings within a scan are kept in file order, which the format
/// guarantees to be ascending in m/z.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanContent {
    pub function: u32,
    pub scans: BTreeMap<u32, Vec<Reading>>,
    pub creation_date: Option<String>,
}

impl ScanContent {
    pub fn num_scans(&self) -> usize {
        self.scans.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MzBounds {
    pub min_mz: f64,
    pub max_mz: f64,
}

impl MzBounds {
    /// Whether `mz` lies within the bounds widened by `radius` on both sides.
    pub fn contains_with_margin(&self, mz: f64, radius: f64) -> bool {
        self.min_mz - radius <= mz && mz <= self.max_mz + radius
    }

    /// Whether `[start, end]` intersects the bounds widened by `radius`.
    pub fn overlaps_with_margin(&self, start: f64, end: f64, radius: f64) -> bool {
        !(self.max_mz < start - radius || self.min_mz > end + radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_checks() {
        let bounds = MzBounds {
            min_mz: 100.0,
            max_mz: 200.0,
        };
        assert!(bounds.contains_with_margin(99.99, 0.02));
        assert!(!bounds.contains_with_margin(99.9, 0.02));
        assert!(bounds.overlaps_with_margin(200.01, 300.0, 0.02));
        assert!(!bounds.overlaps_with_margin(10.0, 99.0, 0.02));
    }
}
