pub mod investment;
pub mod ledger;
pub mod policy;
pub mod roi_band;
pub mod txn_id;
pub mod withdrawal;

pub use investment::{create_investment, InvestmentReceipt};
pub use ledger::{reconcile_user, Reconciliation};
pub use policy::CommissionPolicy;
pub use roi_band::RoiBand;
pub use withdrawal::{
    approve_withdrawal, quote_withdrawal, raise_withdrawal, reject_withdrawal, WithdrawalQuote,
    WithdrawalReceipt,
};
