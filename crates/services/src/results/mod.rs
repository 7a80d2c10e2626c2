mod ledger;
mod stats;

pub use crate::error::LedgerError;
pub use ledger::ResultsLedger;
pub use stats::{BucketStat, RECENT_RESULTS, ResultAggregates};
