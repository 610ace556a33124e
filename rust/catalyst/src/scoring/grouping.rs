use crate::models::Candidate;

/// The protein's own charge-state signals, removed before grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct ProteinExclusion {
    excluded_mzs: Vec<f64>,
    mz_window: f64,
}

/// m/z values of the protein at `charge +/- radius` charge states.
///
/// ```
/// use catalyst::scoring::protein_charge_state_mzs;
///
/// let mzs = protein_charge_state_mzs(500.0, 2, 1);
/// assert_eq!(mzs.len(), 3);
/// assert_eq!(mzs[0], 1000.0);
/// assert_eq!(mzs[1], 500.0);
/// assert!((mzs[2] - 333.333).abs() < 1e-3);
/// ```
pub fn protein_charge_state_mzs(protein_mz: f64, charge: i64, radius: i64) -> Vec<f64> {
    if radius <= 0 {
        return vec![protein_mz];
    }
    ((charge - radius)..=(charge + radius))
        .filter(|k| *k > 0)
        .map(|k| protein_mz * charge as f64 / k as f64)
        .collect()
}

impl ProteinExclusion {
    /// Excludes candidates within `mz_window` of the protein at every charge
    /// state in `charge +/- charge_radius`.
    pub fn new(protein_mz: f64, charge: i64, charge_radius: i64, mz_window: f64) -> Self {
        Self {
            excluded_mzs: protein_charge_state_mzs(protein_mz, charge, charge_radius),
            mz_window,
        }
    }

    pub fn excluded_mzs(&self) -> &[f64] {
        &self.excluded_mzs
    }

    pub fn excludes(&self, mz: f64) -> bool {
        self.excluded_mzs
            .iter()
            .any(|p| p - self.mz_window <= mz && mz <= p + self.mz_window)
    }
}

fn group_key(mz: f64, range_threshold: f64) -> i64 {
    (mz / range_threshold).round_ties_even() as i64
}

/// Drops protein artifacts and failed comparisons, then keeps one candidate
/// per `round(mz / range_threshold)` group.
///
/// The representative of a group has the highest Pearson correlation, the
/// lowest DTW distance breaking ties. With `range_threshold <= 0` the input
/// is returned untouched. `None` means nothing survived.
pub fn group_and_filter(
    candidates: Vec<Candidate>,
    range_threshold: f64,
    exclusion: &ProteinExclusion,
) -> Option<Vec<Candidate>> {
    if range_threshold <= 0.0 {
        return Some(candidates);
    }

    let mut valid: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.result.is_complete() && !exclusion.excludes(c.mz))
        .collect();
    valid.sort_by(|a, b| a.mz.total_cmp(&b.mz));

    let mut grouped: Vec<Candidate> = Vec::new();
    let mut current_key: Option<i64> = None;
    for candidate in valid {
        let key = group_key(candidate.mz, range_threshold);
        if current_key != Some(key) {
            current_key = Some(key);
            grouped.push(candidate);
            continue;
        }
        if let Some(best) = grouped.last_mut() {
            if candidate.result.rank_key() > best.result.rank_key() {
                *best = candidate;
            }
        }
    }

    if grouped.is_empty() {
        None
    } else {
        Some(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SimilarityResult;

    fn candidate(mz: f64, pearson: Option<f64>, dtw: Option<f64>) -> Candidate {
        Candidate {
            mz,
            curve: vec![mz],
            result: SimilarityResult {
                is_similar: false,
                dtw,
                pearson,
            },
        }
    }

    fn exclusion() -> ProteinExclusion {
        ProteinExclusion::new(500.0, 2, 1, 4.0)
    }

    #[test]
    fn test_protein_charge_states() {
        assert_eq!(protein_charge_state_mzs(800.0, 3, 0), vec![800.0]);
        // Non-positive charge states are skipped.
        assert_eq!(protein_charge_state_mzs(100.0, 1, 2), vec![100.0, 50.0, 100.0 / 3.0]);
    }

    #[test]
    fn test_exclusion_windows() {
        let exclusion = exclusion();
        assert_eq!(exclusion.excluded_mzs().len(), 3);
        assert!(exclusion.excludes(504.0));
        assert!(exclusion.excludes(996.0));
        assert!(exclusion.excludes(330.0));
        assert!(!exclusion.excludes(504.1));
        assert!(!exclusion.excludes(700.0));
    }

    #[test]
    fn test_protein_artifact_is_dropped() {
        let out = group_and_filter(
            vec![
                candidate(500.5, Some(0.99), Some(1.0)),
                candidate(700.0, Some(0.9), Some(2.0)),
                candidate(996.5, Some(0.99), Some(1.0)),
                candidate(337.0, Some(0.99), Some(1.0)),
            ],
            1.0,
            &exclusion(),
        )
        .unwrap();
        let mzs: Vec<f64> = out.iter().map(|c| c.mz).collect();
        assert_eq!(mzs, vec![700.0]);
    }

    #[test]
    fn test_incomplete_results_are_dropped() {
        let out = group_and_filter(
            vec![
                candidate(100.0, Some(0.9), None),
                candidate(200.0, None, None),
            ],
            1.0,
            &exclusion(),
        );
        assert!(out.is_none());
    }

    #[test]
    fn test_best_of_group_is_kept() {
        let out = group_and_filter(
            vec![
                candidate(100.2, Some(0.90), Some(3.0)),
                candidate(100.4, Some(0.95), Some(5.0)),
                candidate(99.8, Some(0.95), Some(4.0)),
                candidate(110.0, Some(0.5), Some(1.0)),
            ],
            1.0,
            &exclusion(),
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].mz, 99.8);
        assert_eq!(out[1].mz, 110.0);
    }

    #[test]
    fn test_grouping_ignores_input_order() {
        let mut input = vec![
            candidate(100.2, Some(0.90), Some(3.0)),
            candidate(100.4, Some(0.95), Some(5.0)),
            candidate(99.8, Some(0.95), Some(4.0)),
            candidate(250.1, Some(0.7), Some(1.0)),
            candidate(249.9, Some(0.7), Some(0.5)),
            candidate(610.0, Some(0.99), Some(9.0)),
        ];
        let forward = group_and_filter(input.clone(), 1.0, &exclusion()).unwrap();
        input.reverse();
        let backward = group_and_filter(input.clone(), 1.0, &exclusion()).unwrap();
        input.swap(0, 3);
        let shuffled = group_and_filter(input, 1.0, &exclusion()).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn test_quantization_boundary_splits_neighbours() {
        // 100.49 and 100.51 are 0.02 apart but round to different groups.
        let out = group_and_filter(
            vec![
                candidate(100.49, Some(0.9), Some(1.0)),
                candidate(100.51, Some(0.8), Some(1.0)),
            ],
            1.0,
            &exclusion(),
        )
        .unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_non_positive_threshold_returns_input() {
        let input = vec![
            candidate(500.0, None, None),
            candidate(100.0, Some(0.9), Some(1.0)),
        ];
        let out = group_and_filter(input.clone(), 0.0, &exclusion()).unwrap();
        assert_eq!(out, input);
    }
}
