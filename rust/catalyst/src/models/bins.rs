use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

/// Smallest accepted bin half-width, in m/z units.
pub const MIN_RADIUS: f64 = 0.005;

/// Bin membership is decided on m/z values rounded to four decimals, the
/// precision of the scan files.
const MZ_UNITS_PER_DA: f64 = 10_000.0;

fn mz_units(mz: f64) -> i64 {
    (mz * MZ_UNITS_PER_DA).round() as i64
}

/// Half-open window `[mz - radius, mz + radius)`.
///
/// Both the single m/z and the full-spectrum aggregation decide membership
/// through this type, so a reading on an edge lands in the same bin on
/// either path. Windows of adjacent bins on a two-decimal grid share their
/// edge exactly.
///
/// ```
/// use catalyst::models::BinWindow;
///
/// let window = BinWindow::around(100.0, 0.05);
/// assert!(window.contains(99.95));
/// assert!(!window.contains(100.05));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinWindow {
    lo: i64,
    hi: i64,
}

impl BinWindow {
    pub fn around(mz: f64, radius: f64) -> Self {
        let center = mz_units(mz);
        let radius = mz_units(radius);
        Self {
            lo: center - radius,
            hi: center + radius,
        }
    }

    pub fn contains(&self, mz: f64) -> bool {
        let units = mz_units(mz);
        self.lo <= units && units < self.hi
    }

    /// `mz` is below the lower edge.
    pub fn starts_after(&self, mz: f64) -> bool {
        mz_units(mz) < self.lo
    }

    /// `mz` is below the upper edge.
    pub fn ends_after(&self, mz: f64) -> bool {
        mz_units(mz) < self.hi
    }
}

/// Center of an m/z bin, stored as an integer number of hundredths.
///
/// Bin centers are rounded to two decimals when they are computed, so
/// keeping them as integers makes them exact map keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BinCenter(i64);

impl BinCenter {
    /// Rounds `mz` to two decimals (ties to even).
    pub fn from_mz(mz: f64) -> Self {
        Self((mz * 100.0).round_ties_even() as i64)
    }

    pub fn hundredths(&self) -> i64 {
        self.0
    }

    pub fn mz(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for BinCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.mz())
    }
}

/// Binning grid for a full-spectrum aggregation.
///
/// Bins are centered at `start + 2 * i * radius` and accepted only when
/// the (rounded) center falls in `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinSpec {
    pub radius: f64,
    pub start: f64,
    pub end: f64,
}

impl BinSpec {
    pub fn new(area_range: f64, start: f64, end: f64) -> Self {
        Self {
            radius: radius_from_area(area_range),
            start,
            end,
        }
    }

    /// The bin a reading at `mz` falls in, if it is inside the grid.
    ///
    /// ```
    /// use catalyst::models::{BinCenter, BinSpec};
    ///
    /// let spec = BinSpec::new(0.1, 100.0, 101.0);
    /// assert_eq!(spec.bin_for(100.04), Some(BinCenter::from_mz(100.0)));
    /// assert_eq!(spec.bin_for(100.06), Some(BinCenter::from_mz(100.1)));
    /// assert_eq!(spec.bin_for(101.0), None);
    /// ```
    pub fn bin_for(&self, mz: f64) -> Option<BinCenter> {
        let radius_units = mz_units(self.radius);
        let offset = mz_units(mz) - mz_units(self.start) + radius_units;
        let guess = offset.div_euclid(2 * radius_units);
        // Centers are rounded to two decimals, so the grid index is only a
        // first guess; the window decides.
        let center = [guess, guess - 1, guess + 1]
            .into_iter()
            .map(|index| self.center_at(index))
            .find(|center| self.window(*center).contains(mz))
            .unwrap_or_else(|| self.center_at(guess));
        let center_mz = center.mz();
        if self.start <= center_mz && center_mz < self.end {
            Some(center)
        } else {
            None
        }
    }

    pub fn window(&self, center: BinCenter) -> BinWindow {
        BinWindow::around(center.mz(), self.radius)
    }

    fn center_at(&self, index: i64) -> BinCenter {
        BinCenter::from_mz(self.start + index as f64 * 2.0 * self.radius)
    }
}

/// Half-width of a bin for a given total width, floor-clamped to [`MIN_RADIUS`].
pub fn radius_from_area(area_range: f64) -> f64 {
    (area_range / 2.0).max(MIN_RADIUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_is_clamped() {
        assert_eq!(BinSpec::new(0.0, 0.0, 1.0).radius, MIN_RADIUS);
        assert_eq!(BinSpec::new(0.004, 0.0, 1.0).radius, MIN_RADIUS);
        assert!((BinSpec::new(0.1, 0.0, 1.0).radius - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_bin_center_display_and_order() {
        let a = BinCenter::from_mz(100.004);
        let b = BinCenter::from_mz(100.01);
        assert_eq!(a.to_string(), "100.00");
        assert!(a < b);
        assert_eq!(b.hundredths(), 10001);
    }

    #[test]
    fn test_bin_for_respects_half_open_range() {
        let spec = BinSpec::new(0.02, 50.0, 50.1);
        assert_eq!(spec.bin_for(49.995), Some(BinCenter::from_mz(50.0)));
        assert_eq!(spec.bin_for(49.98), None);
        assert_eq!(spec.bin_for(50.085), Some(BinCenter::from_mz(50.08)));
        assert_eq!(spec.bin_for(50.1), None);
    }

    #[test]
    fn test_edges_go_to_the_upper_bin() {
        let spec = BinSpec::new(0.1, 100.0, 101.0);
        assert_eq!(spec.bin_for(100.05), Some(BinCenter::from_mz(100.1)));
        assert_eq!(spec.bin_for(100.0499), Some(BinCenter::from_mz(100.0)));
        let spec = BinSpec::new(0.04, 50.0, 52.0);
        assert_eq!(spec.bin_for(50.02), Some(BinCenter::from_mz(50.04)));
        assert_eq!(spec.bin_for(50.06), Some(BinCenter::from_mz(50.08)));
        assert_eq!(spec.bin_for(50.1), Some(BinCenter::from_mz(50.12)));
    }

    #[test]
    fn test_adjacent_windows_share_edges() {
        let spec = BinSpec::new(0.02, 300.0, 301.0);
        for i in 0..100 {
            let center = BinCenter::from_mz(300.0 + i as f64 * 0.02);
            let next = BinCenter::from_mz(300.0 + (i + 1) as f64 * 0.02);
            let edge = center.mz() + 0.01;
            assert!(!spec.window(center).contains(edge), "{}", center);
            assert!(spec.window(next).contains(edge), "{}", next);
        }
    }
}
