use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::roi_band::RoiBand;

/// Number of upline hops that receive level income.
pub const LEVEL_DEPTH: usize = 7;

/// A tier is paid when the measured count is at least `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub threshold: u64,
    pub amount: Decimal,
}

/// An ROI band applies to principals in `[from, next band's from)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandRule {
    pub from: Decimal,
    pub band: RoiBand,
}

/// Every rate and tier table the ledger pays by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionPolicy {
    /// Smallest accepted principal (inclusive).
    pub min_investment: Decimal,
    /// Ascending by `from`; the last band is open-ended.
    pub roi_bands: Vec<BandRule>,
    /// Paid to the direct referrer on every investment (default 5%).
    pub direct_referral_rate: Decimal,
    /// Fraction of the daily ROI paid to upline hop k (1-indexed).
    pub level_rates: [Decimal; LEVEL_DEPTH],
    /// Charged on top of every withdrawal (default 5%).
    pub withdrawal_fee_rate: Decimal,
    /// Weekly bonus by direct referral count, any order.
    pub weekly_bonus_tiers: Vec<Tier>,
    /// Monthly salary by full team size, any order.
    pub monthly_salary_tiers: Vec<Tier>,
    /// Credited at registration when positive.
    pub registration_bonus: Decimal,
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self {
            min_investment: Decimal::from(30),
            roi_bands: vec![
                band(30, 1, 3),
                band(5_000, 3, 5),
                band(10_000, 5, 7),
                band(15_000, 7, 10),
            ],
            direct_referral_rate: Decimal::new(5, 2), // 0.05
            level_rates: [
                Decimal::new(7, 2),
                Decimal::new(5, 2),
                Decimal::new(3, 2),
                Decimal::new(2, 2),
                Decimal::new(1, 2),
                Decimal::new(1, 2),
                Decimal::new(1, 2),
            ],
            withdrawal_fee_rate: Decimal::new(5, 2), // 0.05
            weekly_bonus_tiers: tiers(&[
                (7, 6_000),
                (6, 2_000),
                (5, 700),
                (4, 250),
                (3, 100),
                (2, 40),
                (1, 15),
            ]),
            monthly_salary_tiers: tiers(&[
                (30_000, 50_000),
                (10_000, 20_000),
                (5_000, 8_000),
                (1_000, 4_000),
                (500, 2_500),
                (300, 800),
                (200, 550),
                (100, 300),
                (50, 150),
                (30, 90),
                (20, 60),
                (10, 25),
                (5, 11),
            ]),
            registration_bonus: Decimal::ZERO,
        }
    }
}

impl CommissionPolicy {
    pub fn with_registration_bonus(mut self, amount: Decimal) -> Self {
        self.registration_bonus = amount.max(Decimal::ZERO);
        self
    }

    /// Weekly bonus for a direct referral count, `None` below the lowest tier.
    pub fn weekly_bonus_for(&self, direct_referrals: u64) -> Option<Decimal> {
        highest_tier_met(&self.weekly_bonus_tiers, direct_referrals)
    }

    /// Monthly salary for a team size, `None` below the lowest tier.
    pub fn monthly_salary_for(&self, team_size: u64) -> Option<Decimal> {
        highest_tier_met(&self.monthly_salary_tiers, team_size)
    }
}

/// Pick the tier with the highest threshold that `count` reaches.
pub fn highest_tier_met(tiers: &[Tier], count: u64) -> Option<Decimal> {
    tiers
        .iter()
        .filter(|t| count >= t.threshold)
        .max_by_key(|t| t.threshold)
        .map(|t| t.amount)
}

fn band(from: i64, min_pct: i64, max_pct: i64) -> BandRule {
    BandRule {
        from: Decimal::from(from),
        band: RoiBand {
            min_pct: Decimal::from(min_pct),
            max_pct: Decimal::from(max_pct),
        },
    }
}

fn tiers(table: &[(u64, i64)]) -> Vec<Tier> {
    table
        .iter()
        .map(|&(threshold, amount)| Tier {
            threshold,
            amount: Decimal::from(amount),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekly_bonus_picks_highest_tier() {
        let policy = CommissionPolicy::default();
        assert_eq!(policy.weekly_bonus_for(0), None);
        assert_eq!(policy.weekly_bonus_for(1), Some(Decimal::from(15)));
        assert_eq!(policy.weekly_bonus_for(3), Some(Decimal::from(100)));
        assert_eq!(policy.weekly_bonus_for(6), Some(Decimal::from(2_000)));
        assert_eq!(policy.weekly_bonus_for(7), Some(Decimal::from(6_000)));
        assert_eq!(policy.weekly_bonus_for(40), Some(Decimal::from(6_000)));
    }

    #[test]
    fn test_monthly_salary_picks_highest_threshold_met() {
        let policy = CommissionPolicy::default();
        assert_eq!(policy.monthly_salary_for(4), None);
        assert_eq!(policy.monthly_salary_for(5), Some(Decimal::from(11)));
        assert_eq!(policy.monthly_salary_for(999), Some(Decimal::from(2_500)));
        assert_eq!(policy.monthly_salary_for(1_000), Some(Decimal::from(4_000)));
        assert_eq!(policy.monthly_salary_for(29_999), Some(Decimal::from(20_000)));
        assert_eq!(policy.monthly_salary_for(30_000), Some(Decimal::from(50_000)));
    }

    #[test]
    fn test_tier_order_does_not_matter() {
        let mut shuffled = CommissionPolicy::default().weekly_bonus_tiers;
        shuffled.reverse();
        assert_eq!(highest_tier_met(&shuffled, 5), Some(Decimal::from(700)));
    }

    #[test]
    fn test_level_rates_sum_to_twenty_percent() {
        let total: Decimal = CommissionPolicy::default().level_rates.iter().copied().sum();
        assert_eq!(total, Decimal::new(20, 2));
    }

    #[test]
    fn test_registration_bonus_never_negative() {
        let policy = CommissionPolicy::default().with_registration_bonus(Decimal::from(-5));
        assert_eq!(policy.registration_bonus, Decimal::ZERO);
    }
}
