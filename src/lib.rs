// gemstudio - Cost-tracked, cacheable request orchestration for Gemini generation APIs
// Author: kelexine (https://github.com/kelexine)

pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod gemini;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod usage;
pub mod utils;
