use std::sync::OnceLock;

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use referral_ledger::db::user_repo;
use referral_ledger::finance::{create_investment, CommissionPolicy};
use referral_ledger::models::{Role, User};
use referral_ledger::referral::register_user;

/// Connect to the test database and run all migrations.
/// Returns `None` (and the test should return early) when
/// `TEST_DATABASE_URL` is not set.
#[allow(dead_code)]
pub async fn setup_test_db() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Jobs act on every user, so database tests in one binary take turns.
#[allow(dead_code)]
pub async fn db_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().await
}

/// Empty every ledger table.
#[allow(dead_code)]
pub async fn reset_db(pool: &PgPool) {
    sqlx::query(
        "TRUNCATE payout_runs, weekly_bonus_tracking, transactions, investments, users CASCADE",
    )
    .execute(pool)
    .await
    .expect("Failed to reset tables");
}

/// Lock, connect and reset in one go.
#[allow(dead_code)]
pub async fn fresh_db() -> Option<(PgPool, MutexGuard<'static, ()>)> {
    let guard = db_lock().await;
    let pool = setup_test_db().await?;
    reset_db(&pool).await;
    Some((pool, guard))
}

/// Register a user with a unique email, optionally under `referrer`.
#[allow(dead_code)]
pub async fn seed_user(pool: &PgPool, referrer: Option<&User>) -> User {
    let email = format!("user-{}@example.test", Uuid::new_v4());
    register_user(
        pool,
        &CommissionPolicy::default(),
        &email,
        "argon2:test",
        referrer.map(|r| r.referral_code.as_str()),
    )
    .await
    .expect("Failed to seed user")
}

/// A straight referral line: users[0] is the root, users[i] refers users[i + 1].
#[allow(dead_code)]
pub async fn seed_chain(pool: &PgPool, len: usize) -> Vec<User> {
    let mut users: Vec<User> = Vec::with_capacity(len);
    for _ in 0..len {
        let user = seed_user(pool, users.last()).await;
        users.push(user);
    }
    users
}

/// An admin account, outside every team.
#[allow(dead_code)]
pub async fn seed_admin(pool: &PgPool) -> User {
    let code: String = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    user_repo::insert_user(
        pool,
        &format!("admin-{}@example.test", Uuid::new_v4()),
        "argon2:test",
        Role::Admin,
        &code,
        None,
    )
    .await
    .expect("Failed to seed admin")
}

/// Give a user wallet balance the way production does: by investing.
#[allow(dead_code)]
pub async fn invest(pool: &PgPool, user: &User, amount: i64) {
    create_investment(pool, &CommissionPolicy::default(), user.id, Decimal::from(amount))
        .await
        .expect("Failed to seed investment");
}

#[allow(dead_code)]
pub async fn balance(pool: &PgPool, user_id: Uuid) -> Decimal {
    user_repo::get_user(pool, user_id)
        .await
        .expect("Failed to load user")
        .expect("user exists")
        .wallet_balance
}
