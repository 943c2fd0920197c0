pub mod config;
pub mod content_ranker;
pub mod distractor_generator;
pub mod engine;
pub mod errors;
pub mod llm_providers;
pub mod logging;
pub mod models;
pub mod pattern_extractor;
pub mod provider_gateway;
pub mod quota_manager;
pub mod sm2_scheduler;
pub mod storage;

pub use config::EngineConfig;
pub use content_ranker::ContentRanker;
pub use distractor_generator::DistractorGenerator;
pub use engine::StudyEngine;
pub use errors::ProviderError;
pub use llm_providers::{JsonResponseParser, LlmProvider, LlmProviderType, ProviderFactory};
pub use models::*;
pub use pattern_extractor::PatternExtractor;
pub use provider_gateway::ProviderGateway;
pub use quota_manager::QuotaManager;
pub use sm2_scheduler::Sm2Scheduler;
pub use storage::{JsonFileStorage, MemoryStorage, Storage};
