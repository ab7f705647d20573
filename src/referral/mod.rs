pub mod graph;
pub mod registration;
pub mod traversal;

pub use graph::{GraphSnapshot, ReferralGraph};
pub use registration::register_user;
pub use traversal::{
    all_downline_users, direct_referral_count, max_downline_depth, team_summary, upline, TeamSummary,
};
