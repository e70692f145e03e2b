//! Random outcome generation for simulated trades.
//!
//! A trade multiplies the requested amount by a profit/loss ratio sampled
//! uniformly from a closed range. The sampled ratio is rounded to 2 decimal
//! places before the multiplication; wallet amounts render to 4 decimal
//! places. Both are fixed display/compute policies the API exposes.

use rand::Rng;

/// Closed range the outcome ratio is sampled from.
#[derive(Debug, Clone, Copy)]
pub struct OutcomeBounds {
    pub lower: f64,
    pub upper: f64,
}

impl Default for OutcomeBounds {
    fn default() -> Self {
        Self {
            lower: -0.30,
            upper: 0.80,
        }
    }
}

/// Sample a profit/loss ratio from the closed `[lower, upper]` range.
///
/// Pure in its random source: a seeded rng reproduces the same sequence.
/// The raw sample is rounded to 2 decimal places, then clamped back into
/// the range for bounds that are not 2-dp aligned.
pub fn sample_ratio<R: Rng + ?Sized>(rng: &mut R, bounds: &OutcomeBounds) -> f64 {
    let raw = rng.gen_range(bounds.lower..=bounds.upper);
    round_ratio(raw).clamp(bounds.lower, bounds.upper)
}

/// Round a ratio to 2 decimal places.
pub fn round_ratio(ratio: f64) -> f64 {
    (ratio * 100.0).round() / 100.0
}

/// Render a wallet amount in the fixed 4-decimal display format.
pub fn format_amount(amount: f64) -> String {
    format!("{:.4}", amount)
}

/// Human-readable profit/loss line for the trade response.
pub fn trade_message(result_amount: f64) -> String {
    if result_amount >= 0.0 {
        format!("Trade successful: profit of {}", format_amount(result_amount))
    } else {
        format!("Trade successful: loss of {}", format_amount(result_amount.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn samples_stay_within_default_bounds() {
        let bounds = OutcomeBounds::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let ratio = sample_ratio(&mut rng, &bounds);
            assert!(
                (-0.30..=0.80).contains(&ratio),
                "ratio {} escaped bounds",
                ratio
            );
        }
    }

    #[test]
    fn samples_are_rounded_to_two_decimals() {
        let bounds = OutcomeBounds::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let ratio = sample_ratio(&mut rng, &bounds);
            let scaled = ratio * 100.0;
            assert!(
                (scaled - scaled.round()).abs() < 1e-9,
                "ratio {} not 2-dp rounded",
                ratio
            );
        }
    }

    #[test]
    fn seeded_source_is_deterministic() {
        let bounds = OutcomeBounds::default();
        let a: Vec<f64> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..16).map(|_| sample_ratio(&mut rng, &bounds)).collect()
        };
        let b: Vec<f64> = {
            let mut rng = StdRng::seed_from_u64(99);
            (0..16).map(|_| sample_ratio(&mut rng, &bounds)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn custom_bounds_are_honored() {
        let bounds = OutcomeBounds {
            lower: -0.05,
            upper: 0.05,
        };
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1_000 {
            let ratio = sample_ratio(&mut rng, &bounds);
            assert!((-0.05..=0.05).contains(&ratio));
        }
    }

    #[test]
    fn round_ratio_policy() {
        assert_eq!(round_ratio(0.204), 0.20);
        assert_eq!(round_ratio(0.205), 0.21);
        assert_eq!(round_ratio(-0.296), -0.30);
        assert_eq!(round_ratio(0.80), 0.80);
    }

    #[test]
    fn wallet_renders_four_decimals() {
        assert_eq!(format_amount(110.0), "110.0000");
        assert_eq!(format_amount(0.0), "0.0000");
        assert_eq!(format_amount(-3.25), "-3.2500");
        assert_eq!(format_amount(99.123456), "99.1235");
    }

    #[test]
    fn trade_message_states_profit_or_loss() {
        assert_eq!(
            trade_message(10.0),
            "Trade successful: profit of 10.0000"
        );
        assert_eq!(trade_message(-5.0), "Trade successful: loss of 5.0000");
        // Zero result still reads as (zero) profit, not loss.
        assert_eq!(trade_message(0.0), "Trade successful: profit of 0.0000");
    }

    #[test]
    fn documented_scenario_holds() {
        // Requested amount 50 at a sampled ratio of 0.20 yields a profit
        // of exactly 10.0000 on a 100.0000 wallet.
        let ratio = round_ratio(0.20);
        let result = 50.0 * ratio;
        assert_eq!(result, 10.0);
        assert_eq!(format_amount(100.0 + result), "110.0000");
    }
}
