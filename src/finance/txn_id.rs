use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::TransactionType;

/// Human-auditable ledger id: `PREFIX-YYYYMMDD-XXXXXXXXXXXX`.
pub fn generate_txn_id(txn_type: TransactionType, at: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string().to_uppercase();
    format!(
        "{}-{}-{}",
        txn_type.id_prefix(),
        at.format("%Y%m%d"),
        &random[..12]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_txn_id_is_type_prefixed_and_date_stamped() {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap();
        let id = generate_txn_id(TransactionType::LevelIncome, at);

        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "LVL");
        assert_eq!(parts[1], "20261017");
        assert_eq!(parts[2].len(), 12);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_txn_ids_do_not_repeat() {
        let at = Utc::now();
        let a = generate_txn_id(TransactionType::Deposit, at);
        let b = generate_txn_id(TransactionType::Deposit, at);
        assert_ne!(a, b);
    }
}
