// src/lib.rs
//
// saferoute: a deterministic four-stage pipeline that scores candidate
// driving routes for safety and recommends one. Structural decomposition,
// intelligence enrichment, weighted scoring, comparative selection. The
// hosting application supplies pre-computed routes and a service
// credential; everything else is this library.

pub mod config;
pub mod decision;
pub mod error;
pub mod intelligence;
pub mod llm_client;
pub mod pipeline;
pub mod polyline;
pub mod scorer;
pub mod segmenter;
pub mod types;

pub use config::{AppConfig, PipelineConfig};
pub use error::{IntelligenceError, PipelineError};
pub use pipeline::{BatchOutcome, SafetyPipeline};
pub use scorer::{CategoryThresholds, ScoringWeights};
pub use types::{
    DecisionResult, IntelligenceFlags, Route, RouteAnalysis, SafetyCategory, ScoringResult,
    TravelTime,
};
