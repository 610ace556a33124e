mod bins;
mod results;
mod scan;
mod similarity;

pub use bins::{
    BinCenter,
    BinSpec,
    BinWindow,
    MIN_RADIUS,
    radius_from_area,
};
pub use results::{
    AnalysisResult,
    AnalysisTuple,
    NormalizationMode,
};
pub use scan::{
    MzBounds,
    Reading,
    ScanContent,
    Timeline,
    TimelineMap,
};
pub use similarity::{
    Candidate,
    SimilarityResult,
};
