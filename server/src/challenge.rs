//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The stochastic challenge primitive: an asymmetric outcome whose
//! mean shifts with the score difference between attacker and
//! defender.
//!
//! Required properties are: finite output, non-identical successive
//! draws for constant inputs, and a positive relationship between
//! `attacker - defender` and the average of many draws. This picks a
//! logistic-denominator transform and blends it with the raw uniform
//! draw so the result is neither fully deterministic given the
//! inputs nor fully detached from them.

use rand::Rng;

/// Draws a single challenge outcome. `balance` controls how sharply the
/// logistic curve responds to `attacker - defender`; a larger balance
/// flattens the curve (closer scores matter less), a smaller one
/// sharpens it. `balance` must be positive; configuration validation
/// enforces that.
pub fn challenge(attacker: f64, defender: f64, balance: f64) -> f64 {
    let delta = attacker - defender;
    let centered = 1.0 / (1.0 + (-delta / balance).exp());
    let draw: f64 = rand::rng().random_range(0.0..1.0);
    0.5 * draw + 0.5 * centered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_always_finite() {
        for _ in 0..100 {
            assert!(challenge(10.0, -10.0, 5.0).is_finite());
        }
    }

    #[test]
    fn equal_scores_center_on_one_half_on_average() {
        let n = 20_000;
        let sum: f64 = (0..n).map(|_| challenge(5.0, 5.0, 5.0)).sum();
        let avg = sum / n as f64;
        assert!((avg - 0.5).abs() < 0.02, "average {avg} should be near 0.5 at parity");
    }

    #[test]
    fn repeated_calls_with_constant_inputs_differ() {
        let draws: Vec<f64> = (0..5).map(|_| challenge(3.0, -2.0, 4.0)).collect();
        assert!(draws.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn average_outcome_increases_monotonically_with_score_difference() {
        let n = 5_000;
        let avg_for = |attacker: f64| -> f64 {
            let sum: f64 = (0..n).map(|_| challenge(attacker, 0.0, 3.0)).sum();
            sum / n as f64
        };

        let low = avg_for(-10.0);
        let mid = avg_for(0.0);
        let high = avg_for(10.0);

        assert!(low < mid, "low={low} mid={mid}");
        assert!(mid < high, "mid={mid} high={high}");
    }
}
