//! Static per-model pricing and cost accounting.

use crate::transport::Usage;

/// Per-million-token prices in USD.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

/// Model aliases accepted from callers. Unknown aliases resolve to haiku.
const MODELS: &[(&str, &str)] = &[
    ("haiku", "claude-haiku-4-5-20251001"),
    ("sonnet", "claude-sonnet-4-5-20250929"),
];

/// $/MTok pricing table. Extend by adding rows.
const PRICING: &[(&str, ModelPricing)] = &[
    (
        "claude-haiku-4-5-20251001",
        ModelPricing {
            input_per_mtok: 0.80,
            output_per_mtok: 4.00,
        },
    ),
    (
        "claude-sonnet-4-5-20250929",
        ModelPricing {
            input_per_mtok: 3.00,
            output_per_mtok: 15.00,
        },
    ),
];

pub const DEFAULT_MODEL_ID: &str = "claude-haiku-4-5-20251001";

/// Resolves a caller-facing alias ("haiku" | "sonnet") to a full model id.
pub fn resolve_model(choice: &str) -> &'static str {
    MODELS
        .iter()
        .find(|(alias, _)| *alias == choice)
        .map(|(_, id)| *id)
        .unwrap_or(DEFAULT_MODEL_ID)
}

/// Looks up pricing for a model id, falling back to the default model's entry.
pub fn pricing_for(model_id: &str) -> ModelPricing {
    PRICING
        .iter()
        .find(|(id, _)| *id == model_id)
        .or_else(|| PRICING.iter().find(|(id, _)| *id == DEFAULT_MODEL_ID))
        .map(|(_, p)| *p)
        .expect("pricing table contains the default model")
}

/// Cost of one call in USD, rounded to 6 decimal places.
pub fn cost_usd(usage: &Usage, model_id: &str) -> f64 {
    let p = pricing_for(model_id);
    let input_cost = (usage.input_tokens as f64 / 1_000_000.0) * p.input_per_mtok;
    let output_cost = (usage.output_tokens as f64 / 1_000_000.0) * p.output_per_mtok;
    round6(input_cost + output_cost)
}

fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_aliases() {
        assert_eq!(resolve_model("haiku"), "claude-haiku-4-5-20251001");
        assert_eq!(resolve_model("sonnet"), "claude-sonnet-4-5-20250929");
    }

    #[test]
    fn test_resolve_unknown_alias_falls_back() {
        assert_eq!(resolve_model("opus"), DEFAULT_MODEL_ID);
        assert_eq!(resolve_model(""), DEFAULT_MODEL_ID);
    }

    #[test]
    fn test_one_million_each_equals_rate_sum() {
        let usage = Usage {
            input_tokens: 1_000_000,
            output_tokens: 1_000_000,
        };
        assert_eq!(cost_usd(&usage, "claude-haiku-4-5-20251001"), 0.80 + 4.00);
    }

    #[test]
    fn test_unknown_model_uses_default_pricing() {
        let usage = Usage {
            input_tokens: 500_000,
            output_tokens: 0,
        };
        assert_eq!(cost_usd(&usage, "claude-nonexistent"), 0.40);
    }

    #[test]
    fn test_rounds_to_six_decimals() {
        let usage = Usage {
            input_tokens: 1,
            output_tokens: 1,
        };
        // 0.8e-6 + 4.0e-6 = 4.8e-6 → 0.000005 after rounding
        assert_eq!(cost_usd(&usage, "claude-haiku-4-5-20251001"), 0.000005);
    }

    #[test]
    fn test_zero_usage_costs_nothing() {
        let usage = Usage {
            input_tokens: 0,
            output_tokens: 0,
        };
        assert_eq!(cost_usd(&usage, "claude-sonnet-4-5-20250929"), 0.0);
    }
}
