// Cost and usage tracking module
// Author: kelexine (https://github.com/kelexine)

mod models;
mod pricing;
mod tracker;

pub use models::{SessionMetrics, UsageRecord};
pub use pricing::{calculate_cost, pricing_for, CharHeuristicEstimator, ModelPricing, TokenEstimator};
pub use tracker::UsageTracker;
