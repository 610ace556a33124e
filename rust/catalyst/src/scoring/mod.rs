mod detector;
mod grouping;

pub use detector::{
    CurveSimilarityDetector,
    DetectorConfig,
    MIN_PARALLEL_BATCH,
    PARALLEL_CHUNK_SIZE,
};
pub use grouping::{
    ProteinExclusion,
    group_and_filter,
    protein_charge_state_mzs,
};
