pub mod diversity;
pub mod exploration;
pub mod pipeline;
pub mod profile_builder;
pub mod ranking;
pub mod telemetry;

pub use diversity::DiversityLayer;
pub use exploration::{EpsilonGreedy, Strategy};
pub use pipeline::RecommendationPipeline;
pub use profile_builder::{InferredProfile, ProfileInference};
pub use ranking::RankingEngine;
pub use telemetry::TelemetryStore;
