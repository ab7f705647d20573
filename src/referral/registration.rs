use chrono::Utc;
use metrics::counter;
use rand::Rng;
use sqlx::PgPool;

use crate::db::{transaction_repo, user_repo};
use crate::errors::{LedgerError, LedgerResult};
use crate::finance::policy::CommissionPolicy;
use crate::models::{NewTransaction, RelatedEntity, Role, TransactionType, User};

const REFERRAL_CODE_LEN: usize = 8;
/// No 0/O or 1/I, so codes survive being read aloud.
const REFERRAL_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERRAL_CODE_ATTEMPTS: usize = 5;

/// Register a user and attach them under the owner of `referral_code`.
///
/// The referrer is resolved before the new row exists, so the new user can
/// never be their own ancestor. Runs as one unit of work: the optional
/// registration bonus is written together with the user or not at all.
pub async fn register_user(
    pool: &PgPool,
    policy: &CommissionPolicy,
    email: &str,
    credential_hash: &str,
    referral_code: Option<&str>,
) -> LedgerResult<User> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(LedgerError::Validation("a valid email is required".into()));
    }
    if credential_hash.is_empty() {
        return Err(LedgerError::Validation("credential hash is required".into()));
    }

    let mut tx = pool.begin().await?;

    if user_repo::email_exists(&mut *tx, &email).await? {
        tracing::warn!(email = %email, "Registration rejected: email already registered");
        return Err(LedgerError::Validation("email already registered".into()));
    }

    let referrer = match referral_code.map(normalize_code).filter(|c| !c.is_empty()) {
        Some(code) => Some(
            user_repo::find_by_referral_code(&mut *tx, &code)
                .await?
                .ok_or_else(|| {
                    tracing::warn!(email = %email, code = %code, "Registration rejected: unknown referral code");
                    LedgerError::Validation(format!("unknown referral code {code}"))
                })?,
        ),
        None => None,
    };

    let code = unused_referral_code(&mut tx).await?;

    let mut user = user_repo::insert_user(
        &mut *tx,
        &email,
        credential_hash,
        Role::User,
        &code,
        referrer.as_ref().map(|r| r.id),
    )
    .await
    .map_err(|e| {
        if unique_constraint(&e) == Some("users_email_key") {
            LedgerError::Validation("email already registered".into())
        } else {
            LedgerError::OperationFailed(e)
        }
    })?;

    if policy.registration_bonus > rust_decimal::Decimal::ZERO {
        let bonus = NewTransaction::credit(
            user.id,
            TransactionType::RegistrationBonus,
            policy.registration_bonus,
            Some(RelatedEntity::User(user.id)),
        );
        transaction_repo::insert_transaction(&mut *tx, &bonus, Utc::now()).await?;
        if let Some(balance) =
            user_repo::increment_balance(&mut *tx, user.id, policy.registration_bonus).await?
        {
            user.wallet_balance = balance;
        }
    }

    tx.commit().await?;

    counter!("users_registered").increment(1);
    tracing::info!(
        user_id = %user.id,
        referral_code = %user.referral_code,
        referred_by = ?user.referred_by,
        "User registered"
    );

    Ok(user)
}

fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn random_referral_code() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERRAL_CODE_LEN)
        .map(|_| REFERRAL_CODE_ALPHABET[rng.gen_range(0..REFERRAL_CODE_ALPHABET.len())] as char)
        .collect()
}

async fn unused_referral_code(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> LedgerResult<String> {
    for _ in 0..REFERRAL_CODE_ATTEMPTS {
        let code = random_referral_code();
        if user_repo::find_by_referral_code(&mut **tx, &code).await?.is_none() {
            return Ok(code);
        }
    }

    Err(LedgerError::StateConflict(
        "could not allocate a unique referral code".into(),
    ))
}

fn unique_constraint(e: &sqlx::Error) -> Option<&str> {
    e.as_database_error()
        .filter(|db| db.is_unique_violation())
        .and_then(|db| db.constraint())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referral_code_shape() {
        for _ in 0..100 {
            let code = random_referral_code();
            assert_eq!(code.len(), REFERRAL_CODE_LEN);
            assert!(code.bytes().all(|b| REFERRAL_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_codes_are_matched_case_insensitively() {
        assert_eq!(normalize_code("  ab3kq9zz "), "AB3KQ9ZZ");
    }
}
