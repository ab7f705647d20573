use chrono::{FixedOffset, NaiveTime, Weekday};
use rust_decimal::Decimal;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub log_format: String,
    /// Bearer token for `/api` routes; empty disables auth.
    pub api_token: String,

    // Scheduled payout jobs
    pub jobs_enabled: bool,
    /// Canonical local timezone for job triggers, week starts and period keys.
    pub job_utc_offset_minutes: i32,
    pub daily_job_time: NaiveTime,
    pub weekly_job_day: Weekday,
    pub weekly_job_time: NaiveTime,
    pub monthly_job_day: u32,
    pub monthly_job_time: NaiveTime,

    // Ledger
    pub registration_bonus: Decimal,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            api_token: env::var("API_TOKEN").unwrap_or_default(),

            jobs_enabled: env::var("JOBS_ENABLED")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
            job_utc_offset_minutes: env::var("JOB_UTC_OFFSET_MINUTES")
                .unwrap_or_else(|_| "0".into())
                .parse()?,
            daily_job_time: parse_time(&env::var("DAILY_JOB_TIME").unwrap_or_else(|_| "00:00".into()))?,
            weekly_job_day: weekday_from_sunday(
                env::var("WEEKLY_JOB_DAY")
                    .unwrap_or_else(|_| "0".into())
                    .parse()?,
            )?,
            weekly_job_time: parse_time(&env::var("WEEKLY_JOB_TIME").unwrap_or_else(|_| "00:05".into()))?,
            monthly_job_day: env::var("MONTHLY_JOB_DAY")
                .unwrap_or_else(|_| "1".into())
                .parse()?,
            monthly_job_time: parse_time(&env::var("MONTHLY_JOB_TIME").unwrap_or_else(|_| "00:10".into()))?,

            registration_bonus: env::var("REGISTRATION_BONUS")
                .unwrap_or_else(|_| "0".into())
                .parse()
                .unwrap_or(Decimal::ZERO),
        })
    }

    pub fn job_offset(&self) -> anyhow::Result<FixedOffset> {
        FixedOffset::east_opt(self.job_utc_offset_minutes * 60).ok_or_else(|| {
            anyhow::anyhow!(
                "JOB_UTC_OFFSET_MINUTES out of range: {}",
                self.job_utc_offset_minutes
            )
        })
    }
}

fn parse_time(raw: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| anyhow::anyhow!("invalid time {raw:?} (expected HH:MM): {e}"))
}

/// 0 = Sunday, 6 = Saturday.
fn weekday_from_sunday(day: u8) -> anyhow::Result<Weekday> {
    Ok(match day {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        6 => Weekday::Sat,
        _ => anyhow::bail!("WEEKLY_JOB_DAY must be 0..=6, got {day}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("03:30").unwrap(), NaiveTime::from_hms_opt(3, 30, 0).unwrap());
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("noon").is_err());
    }

    #[test]
    fn test_weekday_from_sunday() {
        assert_eq!(weekday_from_sunday(0).unwrap(), Weekday::Sun);
        assert_eq!(weekday_from_sunday(6).unwrap(), Weekday::Sat);
        assert!(weekday_from_sunday(7).is_err());
    }
}
