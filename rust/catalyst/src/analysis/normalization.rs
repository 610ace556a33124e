use crate::models::{
    NormalizationMode,
    Timeline,
};
use crate::processing::normalize::global_max;
use crate::processing::normalize_curve;

/// Curves as handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayCurves {
    pub curves: Vec<Timeline>,
    pub protein: Timeline,
}

/// Scales the returned curves according to `mode`.
///
/// `Together` divides every ligand curve by the largest value over all of
/// them. When that maximum is missing or zero the curves are returned raw.
pub fn apply_normalization(
    mode: NormalizationMode,
    curves: &[Timeline],
    protein: &[f64],
) -> DisplayCurves {
    match mode {
        NormalizationMode::Unscaled | NormalizationMode::Raw => DisplayCurves {
            curves: curves.to_vec(),
            protein: protein.to_vec(),
        },
        NormalizationMode::Individual => DisplayCurves {
            curves: curves.iter().map(|c| normalize_curve(c)).collect(),
            protein: normalize_curve(protein),
        },
        NormalizationMode::Together => {
            let curves = match global_max(curves) {
                Some(max) if max != 0.0 => curves
                    .iter()
                    .map(|c| c.iter().map(|v| v / max).collect())
                    .collect(),
                _ => curves.to_vec(),
            };
            DisplayCurves {
                curves,
                protein: normalize_curve(protein),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ligands() -> Vec<Timeline> {
        vec![vec![0.0, 2.0, 4.0], vec![0.0, 5.0, 10.0]]
    }

    #[test]
    fn test_individual_mode() {
        let out = apply_normalization(NormalizationMode::Individual, &ligands(), &[1.0, 4.0]);
        assert_eq!(out.curves, vec![vec![0.0, 0.5, 1.0], vec![0.0, 0.5, 1.0]]);
        assert_eq!(out.protein, vec![0.25, 1.0]);
    }

    #[test]
    fn test_together_mode() {
        let out = apply_normalization(NormalizationMode::Together, &ligands(), &[1.0, 4.0]);
        assert_eq!(out.curves, vec![vec![0.0, 0.2, 0.4], vec![0.0, 0.5, 1.0]]);
        assert_eq!(out.protein, vec![0.25, 1.0]);

        let zeros = vec![vec![0.0, 0.0]];
        let out = apply_normalization(NormalizationMode::Together, &zeros, &[]);
        assert_eq!(out.curves, zeros);
        let out = apply_normalization(NormalizationMode::Together, &[], &[]);
        assert!(out.curves.is_empty());
    }

    #[test]
    fn test_raw_modes_keep_values() {
        for mode in [NormalizationMode::Unscaled, NormalizationMode::Raw] {
            let out = apply_normalization(mode, &ligands(), &[1.0, 4.0]);
            assert_eq!(out.curves, ligands());
            assert_eq!(out.protein, vec![1.0, 4.0]);
        }
    }
}
