pub mod config;
pub mod detect;
pub mod domain;
pub mod features;
pub mod loader;
pub mod model;
pub mod observability;
pub mod pipeline;
pub mod retrofit;

pub use pipeline::{
    evaluate_retrofits, scan_building, AnalysisError, BuildingScan, RetrofitEvaluation,
    UnderperformerReport,
};
