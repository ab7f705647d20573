use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::JobSummary;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// When a job fires, in the scheduler's local offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Daily { at: NaiveTime },
    Weekly { day: Weekday, at: NaiveTime },
    /// Days past the end of a short month fire on its last day.
    Monthly { day: u32, at: NaiveTime },
}

impl Trigger {
    /// First fire instant strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>, offset: FixedOffset) -> Option<DateTime<Utc>> {
        let today = after.with_timezone(&offset).date_naive();

        match *self {
            Trigger::Daily { at } => {
                let candidate = to_utc(today.and_time(at), offset);
                if candidate > after {
                    Some(candidate)
                } else {
                    Some(candidate + Duration::days(1))
                }
            }
            Trigger::Weekly { day, at } => {
                let ahead = (7 + day.num_days_from_sunday() - today.weekday().num_days_from_sunday()) % 7;
                let candidate = to_utc((today + Duration::days(i64::from(ahead))).and_time(at), offset);
                if candidate > after {
                    Some(candidate)
                } else {
                    Some(candidate + Duration::days(7))
                }
            }
            Trigger::Monthly { day, at } => {
                let (mut year, mut month) = (today.year(), today.month());
                for _ in 0..2 {
                    let candidate = to_utc(clamped_day(year, month, day)?.and_time(at), offset);
                    if candidate > after {
                        return Some(candidate);
                    }
                    (year, month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
                }
                None
            }
        }
    }
}

fn to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    (local - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

fn clamped_day(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = first_of_next.pred_opt()?.day();
    NaiveDate::from_ymd_opt(year, month, day.clamp(1, last))
}

/// A job body: receives the scheduled fire instant as its `now`.
pub type JobFn = Arc<dyn Fn(DateTime<Utc>) -> BoxFuture<'static, anyhow::Result<JobSummary>> + Send + Sync>;

struct ScheduledJob {
    name: String,
    trigger: Trigger,
    job: JobFn,
}

/// Runs each registered job on its own task at its trigger times.
pub struct JobScheduler {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    jobs: Vec<ScheduledJob>,
}

impl JobScheduler {
    pub fn new(clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self {
            clock,
            offset,
            jobs: Vec::new(),
        }
    }

    pub fn schedule(&mut self, name: impl Into<String>, trigger: Trigger, job: JobFn) -> &mut Self {
        self.jobs.push(ScheduledJob {
            name: name.into(),
            trigger,
            job,
        });
        self
    }

    /// Spawn one loop per job. A failed run is logged and the loop waits for
    /// the next trigger.
    pub fn start(self) -> Vec<JoinHandle<()>> {
        let offset = self.offset;

        self.jobs
            .into_iter()
            .map(|scheduled| {
                let clock = Arc::clone(&self.clock);
                tokio::spawn(run_loop(scheduled, clock, offset))
            })
            .collect()
    }
}

async fn run_loop(scheduled: ScheduledJob, clock: Arc<dyn Clock>, offset: FixedOffset) {
    let ScheduledJob { name, trigger, job } = scheduled;
    let mut after = clock.now();

    loop {
        let Some(next) = trigger.next_after(after, offset) else {
            tracing::error!(job = %name, trigger = ?trigger, "No next fire time, scheduler loop stopped");
            return;
        };

        tracing::info!(job = %name, next = %next, "Next scheduled run");
        let wait = (next - clock.now()).to_std().unwrap_or_default();
        sleep(wait).await;

        match job(next).await {
            Ok(summary) => tracing::info!(
                job = %name,
                period = %summary.period,
                payouts = summary.payouts,
                skipped = summary.skipped,
                "Scheduled run completed"
            ),
            Err(e) => tracing::error!(job = %name, error = %e, "Scheduled run failed"),
        }

        after = next;
    }
}
