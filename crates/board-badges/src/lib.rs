//! Achievement evaluation: keeps per-group activity counters consistent and
//! turns criteria into badges exactly once.

pub mod activity;
pub mod counter;
pub mod ledger;
pub mod streak;
pub mod sweeper;

pub use activity::{Activity, LikeRecorded, PostCreated};
pub use counter::{Delta, adjust_count};
pub use ledger::{AwardOutcome, BadgeLedger};
pub use streak::StreakEvaluator;
pub use sweeper::{SweepReport, Sweeper};
