use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::policy::CommissionPolicy;

/// Daily return range, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiBand {
    pub min_pct: Decimal,
    pub max_pct: Decimal,
}

/// Resolution of sampled rates: thousandths of a percent.
const RATE_STEPS_PER_PCT: i64 = 1_000;

/// Band for a principal. Lower edges are inclusive, upper edges exclusive,
/// the last band is open-ended. `None` below the investment floor.
pub fn band_for_amount(policy: &CommissionPolicy, amount: Decimal) -> Option<RoiBand> {
    if amount < policy.min_investment {
        return None;
    }

    policy
        .roi_bands
        .iter()
        .take_while(|rule| rule.from <= amount)
        .last()
        .map(|rule| rule.band)
}

/// Sample a uniform daily rate inside the band, as a fraction (2.5% → 0.025).
pub fn sample_daily_rate<R: Rng + ?Sized>(band: &RoiBand, rng: &mut R) -> Decimal {
    let lo = (band.min_pct * Decimal::from(RATE_STEPS_PER_PCT))
        .to_i64()
        .unwrap_or(0);
    let hi = (band.max_pct * Decimal::from(RATE_STEPS_PER_PCT))
        .to_i64()
        .unwrap_or(lo)
        .max(lo);

    let steps = rng.gen_range(lo..=hi);
    // steps / 1000 percent / 100 = steps * 10^-5
    Decimal::new(steps, 5)
}

/// Exclusive upper bound on a single money amount (10^18): a `NUMERIC(20,2)`
/// column holds 18 integer digits.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

/// Round a money amount to cents.
pub fn to_cents(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn band(min: i64, max: i64) -> Option<RoiBand> {
        Some(RoiBand {
            min_pct: Decimal::from(min),
            max_pct: Decimal::from(max),
        })
    }

    #[test]
    fn test_investment_floor() {
        let policy = CommissionPolicy::default();
        assert_eq!(band_for_amount(&policy, Decimal::new(2999, 2)), None);
        assert_eq!(band_for_amount(&policy, Decimal::from(30)), band(1, 3));
    }

    #[test]
    fn test_band_edges_have_no_gap_or_overlap() {
        let policy = CommissionPolicy::default();
        let cases = [
            (Decimal::new(499_999, 2), band(1, 3)),
            (Decimal::from(5_000), band(3, 5)),
            (Decimal::new(999_999, 2), band(3, 5)),
            (Decimal::from(10_000), band(5, 7)),
            (Decimal::new(1_499_999, 2), band(5, 7)),
            (Decimal::from(15_000), band(7, 10)),
            (Decimal::from(1_000_000), band(7, 10)),
        ];

        for (amount, expected) in cases {
            assert_eq!(band_for_amount(&policy, amount), expected, "amount {amount}");
        }
    }

    #[test]
    fn test_sampled_rate_stays_inside_band() {
        let mut rng = StdRng::seed_from_u64(7);
        let band = band(3, 5).unwrap();

        for _ in 0..1_000 {
            let rate = sample_daily_rate(&band, &mut rng);
            assert!(rate >= Decimal::new(3, 2) && rate <= Decimal::new(5, 2), "rate {rate}");
        }
    }

    #[test]
    fn test_degenerate_band_yields_its_only_rate() {
        let mut rng = StdRng::seed_from_u64(1);
        let band = band(2, 2).unwrap();
        assert_eq!(sample_daily_rate(&band, &mut rng), Decimal::new(2, 2));
    }

    #[test]
    fn test_to_cents() {
        assert_eq!(to_cents(Decimal::new(21_049, 4)), Decimal::new(210, 2));
        assert_eq!(to_cents(Decimal::new(3, 3)), Decimal::ZERO);
    }

    #[test]
    fn test_max_amount_is_ten_to_the_eighteenth() {
        assert_eq!(MAX_AMOUNT, Decimal::from(1_000_000_000_000_000_000i64));
    }
}
