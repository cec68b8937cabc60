// Model pricing table and token estimation
// Author: kelexine (https://github.com/kelexine)

/// Estimates token counts from raw text.
///
/// The default heuristic is `ceil(chars / 4)`. This is a documented
/// approximation, not exact billing data: no ground-truth tokenizer is
/// available here, so the estimator is a swappable seam rather than a fact.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> u64;
}

/// The chars/4 heuristic used throughout the studio.
pub struct CharHeuristicEstimator;

impl TokenEstimator for CharHeuristicEstimator {
    fn estimate(&self, text: &str) -> u64 {
        (text.len() as u64).div_ceil(4)
    }
}

/// Per-model pricing in USD per 1M tokens. Approximate, hand-maintained.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub input_per_1m: f64,
    pub output_per_1m: f64,
}

impl ModelPricing {
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1_000_000.0) * self.input_per_1m
            + (output_tokens as f64 / 1_000_000.0) * self.output_per_1m
    }
}

/// Price tier applied to models missing from the table.
pub const DEFAULT_PRICING: ModelPricing = ModelPricing {
    input_per_1m: 0.50,
    output_per_1m: 5.00,
};

static MODEL_PRICING: phf::Map<&'static str, ModelPricing> = phf::phf_map! {
    "gemini-2.5-flash-image-preview" => ModelPricing { input_per_1m: 0.30, output_per_1m: 30.00 },
    "gemini-2.5-flash" => ModelPricing { input_per_1m: 0.30, output_per_1m: 2.50 },
    "gemini-2.5-pro" => ModelPricing { input_per_1m: 1.25, output_per_1m: 10.00 },
    "gemini-2.5-flash-lite" => ModelPricing { input_per_1m: 0.10, output_per_1m: 0.40 },
};

/// Pricing for a model, falling back to the default tier rather than erroring.
pub fn pricing_for(model: &str) -> &'static ModelPricing {
    MODEL_PRICING.get(model).unwrap_or(&DEFAULT_PRICING)
}

/// Estimated cost of one request against the price table.
pub fn calculate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    pricing_for(model).cost(input_tokens, output_tokens)
}
