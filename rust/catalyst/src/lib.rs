#![doc = include_str!("../README.md")]

// Re-export main structures
pub use crate::aggregation::TimelineAggregator;
pub use crate::analysis::{
    AnalysisWindow,
    ProteinTarget,
    TargetedParams,
    UntargetedParams,
    analyze_targeted,
    analyze_untargeted,
};
pub use crate::cache::{
    DiskTimelineCache,
    MemoryTimelineCache,
    NoCache,
    TimelineCache,
};
pub use crate::models::{
    AnalysisResult,
    BinCenter,
    NormalizationMode,
    SimilarityResult,
    Timeline,
    TimelineMap,
};
pub use crate::progress::{
    ProgressSink,
    Severity,
    TracingSink,
};
pub use crate::reader::ScanFileReader;
pub use crate::scoring::{
    CurveSimilarityDetector,
    DetectorConfig,
};

// Declare modules
pub mod aggregation;
pub mod analysis;
pub mod cache;
pub mod errors;
pub mod models;
pub mod processing;
pub mod progress;
pub mod reader;
pub mod scoring;
pub mod utils;

// Re-export errors
pub use crate::errors::{
    CacheError,
    CatalystError,
    DataProcessingError,
    DataReadingError,
};
