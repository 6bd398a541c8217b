pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use models::{Candidate, Mode, RankedRecommendation, RecoContext};
pub use services::{
    InferredProfile, ProfileInference, RankingEngine, RecommendationPipeline, TelemetryStore,
};
