use serde::Serialize;

use crate::catalog::ModelDescriptor;
use crate::provider::StreamTotals;

/// Final per-model metrics attached to a `complete` event.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    /// Milliseconds from call issuance to the first generated fragment.
    /// Zero when the run produced no text at all.
    pub ttft: u64,
    /// Total elapsed milliseconds for the call.
    pub total_time: u64,
    /// Input token count as reported by the provider.
    pub input_tokens: u64,
    /// Output token count as reported by the provider.
    pub output_tokens: u64,
    /// Output tokens per second, rounded to one decimal place.
    pub tokens_per_second: f64,
    /// Dollar cost derived from the model's per-million-token prices.
    pub cost: f64,
}

/// Derives the final metrics for one model run.
///
/// Pure function of the accumulated stream totals and the model's price
/// table; calling it twice on the same inputs yields identical results.
pub fn compute(totals: &StreamTotals, model: &ModelDescriptor) -> RunMetrics {
    let tokens_per_second = if totals.total_ms > 0 {
        let raw = totals.output_tokens as f64 / (totals.total_ms as f64 / 1000.0);
        (raw * 10.0).round() / 10.0
    } else {
        0.0
    };
    let cost = totals.input_tokens as f64 * model.input_cost_per_1m / 1_000_000.0
        + totals.output_tokens as f64 * model.output_cost_per_1m / 1_000_000.0;

    RunMetrics {
        ttft: totals.ttft_ms,
        total_time: totals.total_ms,
        input_tokens: totals.input_tokens,
        output_tokens: totals.output_tokens,
        tokens_per_second,
        cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProviderFamily;

    fn model(input_cost: f64, output_cost: f64) -> ModelDescriptor {
        ModelDescriptor {
            id: "model-a".to_string(),
            name: "Model A".to_string(),
            provider: ProviderFamily::Anthropic,
            input_cost_per_1m: input_cost,
            output_cost_per_1m: output_cost,
            no_temperature: false,
        }
    }

    #[test]
    fn cost_combines_input_and_output_prices() {
        let totals = StreamTotals {
            ttft_ms: 120,
            total_ms: 1000,
            input_tokens: 1000,
            output_tokens: 2000,
            output: String::new(),
        };
        let metrics = compute(&totals, &model(3.0, 15.0));
        assert!((metrics.cost - 0.033).abs() < 1e-12);
    }

    #[test]
    fn tokens_per_second_rounds_to_one_decimal() {
        let totals = StreamTotals {
            ttft_ms: 40,
            total_ms: 3000,
            input_tokens: 10,
            output_tokens: 100,
            output: String::new(),
        };
        // 100 tokens / 3s = 33.33..., rounded to 33.3.
        assert_eq!(compute(&totals, &model(1.0, 1.0)).tokens_per_second, 33.3);
    }

    #[test]
    fn zero_total_time_yields_zero_tokens_per_second() {
        let totals = StreamTotals {
            output_tokens: 500,
            ..StreamTotals::default()
        };
        assert_eq!(compute(&totals, &model(1.0, 1.0)).tokens_per_second, 0.0);
    }

    #[test]
    fn compute_is_idempotent() {
        let totals = StreamTotals {
            ttft_ms: 7,
            total_ms: 2500,
            input_tokens: 42,
            output_tokens: 150,
            output: "text".to_string(),
        };
        let model = model(0.25, 2.0);
        assert_eq!(compute(&totals, &model), compute(&totals, &model));
    }
}
