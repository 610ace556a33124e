//! Curve conditioning and comparison kernels.

pub mod correlation;
pub mod dtw;
pub mod normalize;
pub mod smoothing;

pub use correlation::pearson_correlation;
pub use dtw::{
    centered_dtw_distance,
    fast_dtw,
};
pub use normalize::normalize_curve;
pub use smoothing::{
    SmoothingMethod,
    smooth_curve,
};
