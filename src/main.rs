use std::sync::Arc;

use referral_ledger::api::router::create_router;
use referral_ledger::config::AppConfig;
use referral_ledger::jobs::{JobKind, JobScheduler, SystemClock, Trigger};
use referral_ledger::{db, metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(&config.log_format);
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Connecting to database...");
    let db = db::init_pool(&config.database_url).await?;
    db::run_migrations(&db).await?;
    tracing::info!("Database connected, migrations applied");

    let metrics_handle = metrics::init_metrics()?;
    let state = AppState::new(db, config, metrics_handle)?;

    // --- Scheduled payout jobs ---
    if state.config.jobs_enabled {
        let cfg = &state.config;
        let mut scheduler = JobScheduler::new(Arc::new(SystemClock), state.jobs.offset);
        scheduler
            .schedule(
                JobKind::DailyRoi.as_str(),
                Trigger::Daily { at: cfg.daily_job_time },
                state.jobs.job_fn(JobKind::DailyRoi),
            )
            .schedule(
                JobKind::WeeklyBonus.as_str(),
                Trigger::Weekly {
                    day: cfg.weekly_job_day,
                    at: cfg.weekly_job_time,
                },
                state.jobs.job_fn(JobKind::WeeklyBonus),
            )
            .schedule(
                JobKind::MonthlySalary.as_str(),
                Trigger::Monthly {
                    day: cfg.monthly_job_day,
                    at: cfg.monthly_job_time,
                },
                state.jobs.job_fn(JobKind::MonthlySalary),
            );

        let handles = scheduler.start();
        tracing::info!(
            jobs = handles.len(),
            utc_offset_minutes = cfg.job_utc_offset_minutes,
            "Payout scheduler started"
        );
    } else {
        tracing::info!("Payout scheduler disabled (JOBS_ENABLED=false)");
    }

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing(format: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
